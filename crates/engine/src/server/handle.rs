// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Client-side handle to a running agent server.
//!
//! The handle owns the admission bookkeeping: a shared depth counter
//! bounds pending plus in-flight signals, so `cast` can reject overflow
//! synchronously and the rejection is never silent (the server still
//! emits `queue.overflow`).

use crate::error::ServerError;
use crate::events::ServerEvent;
use crate::server::Lifecycle;
use jido_core::{
    Agent, AgentId, Error, Signal, SignalId, StopReason, StrategySnapshot, TimeoutDiagnostic,
};
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, oneshot, watch};

pub(crate) type CallReply = Result<Value, ServerError>;

/// Messages accepted by the server task.
pub(crate) enum Msg {
    /// An admitted signal; `reply` is present for `call`.
    Signal { signal: Signal, reply: Option<oneshot::Sender<CallReply>> },
    /// Timer-delivered signal; admission happens server-side.
    Scheduled { signal: Signal },
    /// A handle rejected a signal; the server emits the overflow event.
    Overflowed { ty: String, id: SignalId },
    /// A monitored child's server terminated.
    ChildDown { tag: String },
    Attach,
    Detach,
    Touch,
    RecentEvents { limit: usize, reply: oneshot::Sender<Vec<ServerEvent>> },
    Snapshot { reply: oneshot::Sender<StrategySnapshot> },
    Stop { reason: StopReason, hibernate: bool },
}

/// Shared status snapshot the server keeps current for diagnostics.
#[derive(Debug, Clone)]
pub(crate) struct Diag {
    pub status: Lifecycle,
    pub drain_iteration: u64,
}

impl Default for Diag {
    fn default() -> Self {
        Self { status: Lifecycle::Starting, drain_iteration: 0 }
    }
}

/// Cheap-to-clone handle to one agent server.
#[derive(Clone)]
pub struct AgentHandle {
    pub(crate) id: AgentId,
    pub(crate) tx: mpsc::UnboundedSender<Msg>,
    pub(crate) depth: Arc<AtomicUsize>,
    pub(crate) max_queue_size: usize,
    pub(crate) diag: Arc<Mutex<Diag>>,
    pub(crate) state_rx: watch::Receiver<Arc<Agent>>,
}

impl AgentHandle {
    pub fn id(&self) -> &AgentId {
        &self.id
    }

    /// Synchronous state snapshot; never blocked by queue processing.
    /// Reflects the state as of the last completed drain.
    pub fn state(&self) -> Arc<Agent> {
        self.state_rx.borrow().clone()
    }

    /// Current lifecycle state.
    pub fn status(&self) -> Lifecycle {
        self.diag.lock().status
    }

    /// Pending plus in-flight signal count.
    pub fn queue_len(&self) -> usize {
        self.depth.load(Ordering::Acquire)
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    /// Resolves when the server task has fully terminated.
    pub async fn closed(&self) {
        self.tx.closed().await;
    }

    /// Enqueue a signal and return immediately with its id.
    pub fn cast(&self, signal: Signal) -> Result<SignalId, ServerError> {
        let id = signal.id.clone();
        self.admit(&signal)?;
        if self.tx.send(Msg::Signal { signal, reply: None }).is_err() {
            self.depth.fetch_sub(1, Ordering::AcqRel);
            return Err(ServerError::NotRunning);
        }
        Ok(id)
    }

    /// Enqueue a signal and await the reply, bounded by `timeout`.
    ///
    /// Never panics: returns `{ok, result}` or `{error, reason}`. On
    /// expiry the error carries a diagnostic and the server is left
    /// untouched; a late reply is discarded.
    pub async fn call(&self, signal: Signal, timeout: Duration) -> Result<Value, ServerError> {
        self.admit(&signal)?;
        let (reply_tx, reply_rx) = oneshot::channel();
        let started = Instant::now();
        if self.tx.send(Msg::Signal { signal, reply: Some(reply_tx) }).is_err() {
            self.depth.fetch_sub(1, Ordering::AcqRel);
            return Err(ServerError::NotRunning);
        }

        match tokio::time::timeout(timeout, reply_rx).await {
            Ok(Ok(reply)) => reply,
            Ok(Err(_)) => {
                Err(Error::Shutdown("server dropped the reply".to_string()).into())
            }
            Err(_) => {
                let diag = self.diag.lock().clone();
                Err(Error::Timeout(TimeoutDiagnostic {
                    server_status: diag.status.to_string(),
                    queue_len: self.queue_len(),
                    drain_iteration: diag.drain_iteration,
                    elapsed_ms: started.elapsed().as_millis() as u64,
                })
                .into())
            }
        }
    }

    /// Reference-count a keep-alive holder; the idle timer is disarmed
    /// while any holder is attached.
    pub fn attach(&self) -> Result<(), ServerError> {
        self.send_ctl(Msg::Attach)
    }

    pub fn detach(&self) -> Result<(), ServerError> {
        self.send_ctl(Msg::Detach)
    }

    /// Reset the idle timer.
    pub fn touch(&self) -> Result<(), ServerError> {
        self.send_ctl(Msg::Touch)
    }

    /// Best-effort ring of recent lifecycle events (development aid).
    pub async fn recent_events(&self, limit: usize) -> Result<Vec<ServerEvent>, ServerError> {
        let (tx, rx) = oneshot::channel();
        self.send_ctl(Msg::RecentEvents { limit, reply: tx })?;
        rx.await.map_err(|_| ServerError::NotRunning)
    }

    /// The strategy's view of the agent's progress.
    pub async fn snapshot(&self) -> Result<StrategySnapshot, ServerError> {
        let (tx, rx) = oneshot::channel();
        self.send_ctl(Msg::Snapshot { reply: tx })?;
        rx.await.map_err(|_| ServerError::NotRunning)
    }

    /// Request termination and wait for the server to finish. With
    /// `hibernate` the agent is persisted first (when storage is bound).
    pub async fn stop(&self, reason: StopReason, hibernate: bool) -> Result<(), ServerError> {
        self.send_ctl(Msg::Stop { reason, hibernate })?;
        self.closed().await;
        Ok(())
    }

    /// Whether two handles address the same server task.
    pub fn same_server(&self, other: &AgentHandle) -> bool {
        self.tx.same_channel(&other.tx)
    }

    fn send_ctl(&self, msg: Msg) -> Result<(), ServerError> {
        self.tx.send(msg).map_err(|_| ServerError::NotRunning)
    }

    /// Reserve a queue slot or reject with `queue_overflow`. The server
    /// releases the slot after the signal finishes processing.
    fn admit(&self, signal: &Signal) -> Result<(), ServerError> {
        let mut current = self.depth.load(Ordering::Acquire);
        loop {
            if current >= self.max_queue_size {
                let _ = self.tx.send(Msg::Overflowed {
                    ty: signal.ty.clone(),
                    id: signal.id.clone(),
                });
                return Err(Error::QueueOverflow.into());
            }
            match self.depth.compare_exchange(
                current,
                current + 1,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return Ok(()),
                Err(observed) => current = observed,
            }
        }
    }
}

impl std::fmt::Debug for AgentHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentHandle")
            .field("id", &self.id)
            .field("queue_len", &self.queue_len())
            .field("closed", &self.is_closed())
            .finish()
    }
}
