// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! One-shot schedule timers owned by a server.
//!
//! Timers are in-memory only: hibernate and shutdown abort whatever is
//! outstanding. Agents that need durable delay persist a task signal
//! instead.

use tokio::task::JoinHandle;

#[derive(Debug, Default)]
pub(crate) struct TimerSet {
    tasks: Vec<JoinHandle<()>>,
}

impl TimerSet {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Track a spawned timer task, dropping finished handles as we go.
    pub(crate) fn track(&mut self, handle: JoinHandle<()>) {
        self.tasks.retain(|t| !t.is_finished());
        self.tasks.push(handle);
    }

    pub(crate) fn outstanding(&self) -> usize {
        self.tasks.iter().filter(|t| !t.is_finished()).count()
    }

    /// Best-effort cancellation of every outstanding timer.
    pub(crate) fn abort_all(&mut self) {
        for task in self.tasks.drain(..) {
            task.abort();
        }
    }
}

impl Drop for TimerSet {
    fn drop(&mut self) {
        self.abort_all();
    }
}
