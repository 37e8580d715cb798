// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! AgentServer: one task per agent, single-threaded with respect to its
//! own state.
//!
//! Signals arrive through an inbox, are routed to actions, run through
//! the strategy, and the resulting directives drain through the
//! interpreter. Synchronous callers are fulfilled at most once per
//! signal id, and every reply is mirrored as a `jido.agent.out.*` signal
//! carrying the originating id.

pub(crate) mod handle;

use crate::actions::{self, builtin_actions};
use crate::error::ServerError;
use crate::exec::{DirectiveExec, Step};
use crate::fsm::FsmStrategy;
use handle::{CallReply, Diag, Msg};
use jido_core::signal_types;
use jido_core::{
    Agent, Clock, Directive, Error, Instruction, Route, Router, RoutingError, Settings, Signal,
    SignalId, StopReason, Strategy, StrategyCtx,
};
use jido_adapters::DispatchRegistry;
use jido_storage::{hibernate, AgentKind, CheckpointKey, StorageAdapter};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};

pub use handle::AgentHandle;

/// Observable server lifecycle, distinct from any strategy state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Starting,
    Idle,
    Processing,
    Stopping,
    Stopped,
}

impl Lifecycle {
    pub fn as_str(&self) -> &'static str {
        match self {
            Lifecycle::Starting => "starting",
            Lifecycle::Idle => "idle",
            Lifecycle::Processing => "processing",
            Lifecycle::Stopping => "stopping",
            Lifecycle::Stopped => "stopped",
        }
    }
}

impl fmt::Display for Lifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Where and how this agent persists on hibernate.
#[derive(Clone)]
pub struct StorageBinding {
    pub adapter: Arc<dyn StorageAdapter>,
    pub kind: Arc<dyn AgentKind>,
    pub key: CheckpointKey,
}

/// Everything needed to start one agent server.
pub struct ServerConfig {
    pub agent: Agent,
    pub settings: Settings,
    pub routes: Vec<Route>,
    pub strategy: Arc<dyn Strategy>,
    pub actions: Vec<Arc<dyn jido_core::Action>>,
    pub dispatch: Arc<DispatchRegistry>,
    pub storage: Option<StorageBinding>,
}

impl ServerConfig {
    pub fn new(agent: Agent) -> Self {
        Self {
            agent,
            settings: Settings::default(),
            routes: Vec::new(),
            strategy: Arc::new(FsmStrategy::default()),
            actions: Vec::new(),
            dispatch: Arc::new(DispatchRegistry::standard()),
            storage: None,
        }
    }

    pub fn with_settings(mut self, settings: Settings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_routes(mut self, routes: Vec<Route>) -> Self {
        self.routes = routes;
        self
    }

    pub fn with_route(mut self, route: Route) -> Self {
        self.routes.push(route);
        self
    }

    pub fn with_strategy(mut self, strategy: Arc<dyn Strategy>) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_action(mut self, action: Arc<dyn jido_core::Action>) -> Self {
        self.actions.push(action);
        self
    }

    pub fn with_dispatch(mut self, dispatch: Arc<DispatchRegistry>) -> Self {
        self.dispatch = dispatch;
        self
    }

    pub fn with_storage(mut self, storage: StorageBinding) -> Self {
        self.storage = Some(storage);
        self
    }
}

/// Spawns agent server tasks.
pub struct AgentServer;

impl AgentServer {
    /// Start a server task for the configured agent and return its
    /// handle. The task runs until stopped, idle-timed-out, or dropped.
    pub fn spawn<C: Clock>(config: ServerConfig, clock: C) -> AgentHandle {
        let (tx, rx) = mpsc::unbounded_channel();
        let depth = Arc::new(AtomicUsize::new(0));
        let diag = Arc::new(Mutex::new(Diag::default()));
        let (state_tx, state_rx) = watch::channel(Arc::new(config.agent.clone()));

        let handle = AgentHandle {
            id: config.agent.id.clone(),
            tx: tx.clone(),
            depth: Arc::clone(&depth),
            max_queue_size: config.settings.max_queue_size,
            diag: Arc::clone(&diag),
            state_rx,
        };

        let exec = DirectiveExec::new(
            Arc::clone(&config.dispatch),
            &config.settings,
            tx.clone(),
            clock.clone(),
            Arc::clone(&config.strategy),
        );

        let task = ServerTask {
            agent: config.agent,
            settings: config.settings,
            router: build_router(config.routes),
            strategy_router: Router::empty(),
            strategy: config.strategy,
            startup_actions: config.actions,
            storage: config.storage,
            exec,
            clock,
            rx,
            pending: VecDeque::new(),
            replies: HashMap::new(),
            status: Lifecycle::Starting,
            attach_count: 0,
            idle_since: tokio::time::Instant::now(),
            depth,
            diag,
            state_tx,
        };
        tokio::spawn(task.run());
        handle
    }
}

// Routes given to a ServerConfig were built via Route constructors, so
// re-validation cannot fail in practice; a failure must not panic the
// spawn path.
fn build_router(routes: Vec<Route>) -> Router {
    match Router::new(routes) {
        Ok(router) => router,
        Err(e) => {
            tracing::error!(error = %e, "invalid server routes, starting with none");
            Router::empty()
        }
    }
}

struct PendingSignal {
    signal: Signal,
    wants_reply: bool,
}

/// Result of draining one signal's directives.
#[derive(Default)]
struct DrainResult {
    stop: Option<StopReason>,
    ran_instructions: u64,
}

struct ServerTask<C: Clock> {
    agent: Agent,
    settings: Settings,
    router: Router,
    strategy_router: Router,
    strategy: Arc<dyn Strategy>,
    startup_actions: Vec<Arc<dyn jido_core::Action>>,
    storage: Option<StorageBinding>,
    exec: DirectiveExec<C>,
    clock: C,
    rx: mpsc::UnboundedReceiver<Msg>,
    pending: VecDeque<PendingSignal>,
    replies: HashMap<SignalId, oneshot::Sender<CallReply>>,
    status: Lifecycle,
    attach_count: usize,
    idle_since: tokio::time::Instant,
    depth: Arc<AtomicUsize>,
    diag: Arc<Mutex<Diag>>,
    state_tx: watch::Sender<Arc<Agent>>,
}

impl<C: Clock> ServerTask<C> {
    async fn run(mut self) {
        tracing::info!(agent_id = %self.agent.id, "agent server starting");

        // built-ins first so strategies and user actions can shadow them
        for action in builtin_actions() {
            self.agent.actions.register(action);
        }
        for action in std::mem::take(&mut self.startup_actions) {
            self.agent.actions.register(action);
        }

        let ctx = self.strategy_ctx();
        let init_directives = self.strategy.init(&mut self.agent, &ctx);
        self.strategy_router = build_router(self.strategy.signal_routes(&ctx));
        let init = self.drain(init_directives).await;
        // init failures are server-level; don't bleed into the first reply
        let _ = self.exec.take_signal_error();

        self.emit_lifecycle(signal_types::EVENT_STARTED, json!({"agent_id": self.agent.id.as_str()}));
        self.set_status(Lifecycle::Idle);

        let mut stop: Option<(StopReason, bool)> =
            init.stop.map(|reason| (reason, false));

        while stop.is_none() {
            self.publish_state();

            if self.pending.is_empty() {
                let idle_at = self.idle_deadline();
                tokio::select! {
                    maybe = self.rx.recv() => match maybe {
                        Some(msg) => stop = self.handle_msg(msg),
                        None => stop = Some((StopReason::Normal, false)),
                    },
                    _ = sleep_until_opt(idle_at) => {
                        tracing::info!(agent_id = %self.agent.id, "idle timeout");
                        stop = Some((StopReason::IdleTimeout, true));
                    }
                }
            }

            // absorb whatever else is already queued before processing
            while stop.is_none() {
                match self.rx.try_recv() {
                    Ok(msg) => stop = self.handle_msg(msg),
                    Err(_) => break,
                }
            }
            if stop.is_some() {
                break;
            }

            if !self.pending.is_empty() {
                self.set_status(Lifecycle::Processing);
                for _ in 0..self.settings.batch_size.max(1) {
                    let Some(pending) = self.pending.pop_front() else { break };
                    if let Some(s) = self.process_signal(pending).await {
                        stop = Some(s);
                        break;
                    }
                }
                if stop.is_none() && self.pending.is_empty() {
                    self.set_status(Lifecycle::Idle);
                }
            }
        }

        let (reason, persist) = match stop {
            Some(stop) => stop,
            None => (StopReason::Normal, false),
        };
        self.shutdown(reason, persist).await;
    }

    fn strategy_ctx(&self) -> StrategyCtx {
        StrategyCtx { now_ms: self.clock.epoch_ms() }
    }

    fn idle_deadline(&self) -> Option<tokio::time::Instant> {
        if self.attach_count > 0 {
            return None;
        }
        let timeout = self.settings.idle_timeout()?;
        Some(self.idle_since + timeout)
    }

    fn touch_idle(&mut self) {
        self.idle_since = tokio::time::Instant::now();
    }

    /// Handle one inbox message; `Some` means begin shutdown.
    fn handle_msg(&mut self, msg: Msg) -> Option<(StopReason, bool)> {
        match msg {
            Msg::Signal { signal, reply } => {
                let wants_reply = reply.is_some();
                if let Some(reply) = reply {
                    self.replies.insert(signal.id.clone(), reply);
                }
                self.pending.push_back(PendingSignal { signal, wants_reply });
                None
            }
            Msg::Scheduled { signal } => {
                // timers bypass the handle, so admission happens here
                if self.depth.load(Ordering::Acquire) >= self.settings.max_queue_size {
                    tracing::warn!(
                        agent_id = %self.agent.id,
                        signal = %signal.log_summary(),
                        "scheduled signal dropped on overflow"
                    );
                    self.emit_overflow(&signal.ty, &signal.id);
                } else {
                    self.depth.fetch_add(1, Ordering::AcqRel);
                    self.pending.push_back(PendingSignal { signal, wants_reply: false });
                }
                None
            }
            Msg::Overflowed { ty, id } => {
                self.emit_overflow(&ty, &id);
                None
            }
            Msg::ChildDown { tag } => {
                if let Some(entry) = self.exec.children.remove(&tag) {
                    self.exec.emit(
                        Signal::new(
                            signal_types::EVENT_PROCESS_TERMINATED,
                            json!({
                                "tag": tag,
                                "agent_id": entry.handle.id().as_str(),
                                "meta": entry.meta,
                            }),
                        ),
                        None,
                    );
                }
                None
            }
            Msg::Attach => {
                self.attach_count += 1;
                None
            }
            Msg::Detach => {
                self.attach_count = self.attach_count.saturating_sub(1);
                if self.attach_count == 0 {
                    self.touch_idle();
                }
                None
            }
            Msg::Touch => {
                self.touch_idle();
                None
            }
            Msg::RecentEvents { limit, reply } => {
                let _ = reply.send(self.exec.events.recent(limit));
                None
            }
            Msg::Snapshot { reply } => {
                let ctx = self.strategy_ctx();
                let _ = reply.send(self.strategy.snapshot(&self.agent, &ctx));
                None
            }
            Msg::Stop { reason, hibernate } => Some((reason, hibernate)),
        }
    }

    /// Process one pending signal end to end: route, run through the
    /// strategy, drain directives, reply, emit the `out.*` mirror.
    async fn process_signal(&mut self, pending: PendingSignal) -> Option<(StopReason, bool)> {
        let PendingSignal { signal, wants_reply } = pending;
        tracing::debug!(agent_id = %self.agent.id, signal = %signal.log_summary(), "processing");

        let mut instructions: Vec<Instruction> = Vec::new();
        let mut dispatched = false;
        let mut routed = false;
        let mut drain = DrainResult::default();

        let targets = {
            let strategy_targets = self.strategy_router.route(&signal);
            if strategy_targets.is_empty() {
                self.router.route(&signal)
            } else {
                strategy_targets
            }
        };
        for target in targets {
            routed = true;
            match target {
                jido_core::RouteTarget::Action(name) => {
                    instructions.push(instruction_for(&signal, name));
                }
                jido_core::RouteTarget::Dispatch(configs) => {
                    self.exec.dispatch_async(&signal, configs);
                    dispatched = true;
                }
            }
        }

        if !routed {
            match self.default_plan(&signal) {
                DefaultPlan::Instructions(batch) => {
                    routed = true;
                    instructions = batch;
                }
                DefaultPlan::Directives(directives) => {
                    routed = true;
                    drain = self.drain(directives).await;
                }
                DefaultPlan::None => {}
            }
        }

        if !instructions.is_empty() {
            let ctx = self.strategy_ctx();
            let directives = self.strategy.cmd(&mut self.agent, instructions, &ctx);
            drain = self.drain(directives).await;
        }

        // reply: at most once, keyed by the originating signal id
        let error = self.exec.take_signal_error().or_else(|| {
            (!routed && !dispatched)
                .then(|| Error::Routing(RoutingError::UnknownPath(signal.ty.clone())))
        });
        let reply_sent = self.fulfil_reply(&signal.id, wants_reply, &error);
        if reply_sent {
            self.emit_out_signal(&signal, drain.ran_instructions > 0, &error);
        }

        self.depth.fetch_sub(1, Ordering::AcqRel);
        self.touch_idle();
        self.update_diag();
        drain.stop.map(|reason| (reason, false))
    }

    /// Drain a directive queue, splicing `RunInstruction` results ahead
    /// of later siblings. Stops early on a `Stop` step or a fatal error
    /// policy verdict.
    async fn drain(&mut self, directives: Vec<Directive>) -> DrainResult {
        let mut queue: VecDeque<Directive> = directives.into();
        let mut result = DrainResult::default();

        while let Some(directive) = queue.pop_front() {
            {
                let mut diag = self.diag.lock();
                diag.drain_iteration += 1;
            }
            let was_run = matches!(&directive, Directive::RunInstruction { .. });
            match self.exec.execute(directive, &mut self.agent).await {
                Ok(Step::Continue) => {}
                Ok(Step::Splice(spliced)) => {
                    if was_run {
                        result.ran_instructions += 1;
                    }
                    for directive in spliced.into_iter().rev() {
                        queue.push_front(directive);
                    }
                }
                Ok(Step::Stop(reason)) => {
                    result.stop = Some(reason);
                    break;
                }
                Err(error) => {
                    self.exec.note_error(&error);
                    let execution_error = match &error {
                        Error::Execution(e) => e.clone(),
                        other => jido_core::ExecutionError::new(other.to_string()),
                    };
                    if let Some(reason) = self.exec.apply_error_policy(&execution_error) {
                        result.stop = Some(reason);
                        break;
                    }
                }
            }
        }
        result
    }

    /// Send the caller's reply, if any. Returns whether a reply went out.
    fn fulfil_reply(&mut self, id: &SignalId, wants_reply: bool, error: &Option<Error>) -> bool {
        if !wants_reply {
            return false;
        }
        let Some(reply) = self.replies.remove(id) else {
            return false;
        };
        let payload: CallReply = match error {
            Some(error) => Err(ServerError::Core(error.clone())),
            None => Ok(self.agent.result.clone().unwrap_or(Value::Null)),
        };
        // the caller may be gone (timeout); dropped replies are fine
        let _ = reply.send(payload);
        true
    }

    /// Mirror the reply as an `out.*` signal reusing the originating id.
    fn emit_out_signal(&mut self, origin: &Signal, ran_instructions: bool, error: &Option<Error>) {
        let ty = if ran_instructions {
            signal_types::OUT_INSTRUCTION_RESULT
        } else {
            signal_types::OUT_SIGNAL_RESULT
        };
        let data = match error {
            Some(error) => json!({"status": "error", "reason": error.to_string()}),
            None => json!({
                "status": "ok",
                "result": self.agent.result.clone().unwrap_or(Value::Null),
            }),
        };
        let signal = Signal::new(ty, data)
            .with_id(origin.id.clone())
            .with_source(format!("jido://agent/{}", self.agent.id));
        self.exec.emit(signal, None);
    }

    /// Built-in handling for `jido.agent.cmd.*` and `jido.agent.stop`
    /// when no route matched.
    fn default_plan(&mut self, signal: &Signal) -> DefaultPlan {
        let data = signal.data_map();
        match signal.ty.as_str() {
            signal_types::CMD_STATE => {
                DefaultPlan::Instructions(vec![Instruction::new(actions::STATE_ACTION)])
            }
            signal_types::CMD_QUEUE_SIZE => {
                DefaultPlan::Instructions(vec![Instruction::new(actions::QUEUE_SIZE_ACTION)])
            }
            signal_types::CMD_SET => DefaultPlan::Instructions(vec![
                Instruction::new(actions::SET_ACTION).with_params(data),
            ]),
            signal_types::CMD_VALIDATE => DefaultPlan::Instructions(vec![
                Instruction::new(actions::VALIDATE_ACTION).with_params(data),
            ]),
            signal_types::CMD_PLAN => DefaultPlan::Instructions(vec![
                Instruction::new(actions::PLAN_ACTION).with_params(data),
            ]),
            signal_types::CMD_RUN => {
                let drained = self.agent.drain_pending();
                DefaultPlan::Instructions(drained)
            }
            signal_types::CMD_CMD => {
                let mut batch = match actions::parse_instructions(&data) {
                    Ok(batch) => batch,
                    Err(e) => {
                        self.exec.note_error(&e);
                        Vec::new()
                    }
                };
                batch.extend(self.agent.drain_pending());
                DefaultPlan::Instructions(batch)
            }
            signal_types::AGENT_STOP => {
                let reason = data
                    .get("reason")
                    .and_then(Value::as_str)
                    .unwrap_or("stop signal")
                    .to_string();
                DefaultPlan::Directives(vec![Directive::Stop {
                    reason: StopReason::Requested(reason),
                }])
            }
            _ => DefaultPlan::None,
        }
    }

    fn emit_overflow(&mut self, ty: &str, id: &SignalId) {
        tracing::warn!(
            agent_id = %self.agent.id,
            signal_type = ty,
            signal_id = %id,
            "pending queue overflow"
        );
        self.exec.emit(
            Signal::new(
                signal_types::EVENT_QUEUE_OVERFLOW,
                json!({
                    "agent_id": self.agent.id.as_str(),
                    "rejected_type": ty,
                    "rejected_id": id.as_str(),
                    "max_queue_size": self.settings.max_queue_size,
                }),
            ),
            None,
        );
    }

    fn emit_lifecycle(&mut self, ty: &str, data: Value) {
        self.exec.emit(
            Signal::new(ty, data).with_source(format!("jido://agent/{}", self.agent.id)),
            None,
        );
    }

    fn set_status(&mut self, next: Lifecycle) {
        if self.status == next {
            return;
        }
        let from = self.status;
        self.status = next;
        self.update_diag();
        self.emit_lifecycle(
            signal_types::EVENT_TRANSITION_SUCCEEDED,
            json!({
                "agent_id": self.agent.id.as_str(),
                "from": from.as_str(),
                "to": next.as_str(),
                "scope": "lifecycle",
            }),
        );
    }

    fn update_diag(&self) {
        let mut diag = self.diag.lock();
        diag.status = self.status;
    }

    fn publish_state(&self) {
        let _ = self.state_tx.send(Arc::new(self.agent.clone()));
    }

    /// Graceful teardown: stop children, abort timers, optionally
    /// hibernate, fail outstanding callers, announce the stop.
    async fn shutdown(mut self, reason: StopReason, persist: bool) {
        tracing::info!(agent_id = %self.agent.id, reason = %reason, "agent server stopping");
        self.set_status(Lifecycle::Stopping);

        // schedule timers are best-effort; cleared on hibernate/stop
        self.exec.timers.abort_all();

        for (tag, entry) in self.exec.children.drain() {
            let signal = Signal::new(signal_types::AGENT_STOP, json!({"reason": "parent stopping"}));
            if entry.handle.cast(signal).is_err() {
                tracing::debug!(tag = %tag, "child already gone at shutdown");
            }
        }

        if persist {
            if let Some(binding) = &self.storage {
                match hibernate(&*binding.adapter, &*binding.kind, &binding.key, &self.agent).await
                {
                    Ok(_) => {}
                    Err(e) => {
                        tracing::error!(agent_id = %self.agent.id, error = %e, "hibernate failed")
                    }
                }
            }
        }

        for (_, reply) in self.replies.drain() {
            let _ = reply.send(Err(ServerError::Core(Error::Shutdown(reason.to_string()))));
        }

        self.emit_lifecycle(
            signal_types::EVENT_STOPPED,
            json!({"agent_id": self.agent.id.as_str(), "reason": reason.to_string()}),
        );
        self.set_status(Lifecycle::Stopped);
        self.publish_state();
        tracing::info!(agent_id = %self.agent.id, "agent server stopped");
    }
}

enum DefaultPlan {
    Instructions(Vec<Instruction>),
    Directives(Vec<Directive>),
    None,
}

/// Build the instruction a routed signal executes.
fn instruction_for(signal: &Signal, action: String) -> Instruction {
    Instruction::new(action).with_params(signal.data_map())
}

async fn sleep_until_opt(deadline: Option<tokio::time::Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(at).await,
        None => std::future::pending::<()>().await,
    }
}

#[cfg(test)]
#[path = "server_tests.rs"]
mod tests;
