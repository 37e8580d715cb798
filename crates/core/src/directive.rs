// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Directives: declarative side-effect descriptors returned from `cmd`
//! and enacted by the agent server.
//!
//! The set is closed; the interpreter matches exhaustively. Directives
//! are in-memory values — signals and checkpoints serialize, directives
//! do not (`RegisterAction` carries a live action object).

use crate::action::Action;
use crate::agent::AgentId;
use crate::error::ExecutionError;
use crate::instruction::Instruction;
use crate::signal::{DispatchConfig, Signal};
use crate::state::StateOp;
use crate::strategy::Strategy;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Why an agent server is terminating.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    Normal,
    IdleTimeout,
    AgentError(String),
    Requested(String),
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::Normal => write!(f, "normal"),
            StopReason::IdleTimeout => write!(f, "idle_timeout"),
            StopReason::AgentError(e) => write!(f, "agent_error: {}", e),
            StopReason::Requested(r) => write!(f, "requested: {}", r),
        }
    }
}

/// Payload of a `Schedule` directive: either a ready signal or an
/// arbitrary value the server wraps into a `jido.scheduled` signal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScheduleMessage {
    Signal(Box<Signal>),
    Value(Value),
}

/// Blueprint for a child agent started by `SpawnAgent`.
///
/// Deliberately minimal: dispatch registry, clock, and settings are
/// inherited from the spawning server.
#[derive(Clone, Default)]
pub struct ChildSpec {
    /// Child agent id; generated from the tag when empty.
    pub id: Option<AgentId>,
    pub initial_state: Map<String, Value>,
    /// Actions registered on the child before its strategy initializes.
    pub actions: Vec<Arc<dyn Action>>,
    /// Route specs for the child's router: `(pattern, action, priority)`.
    pub routes: Vec<(String, String, i32)>,
    /// Strategy override; the spawning server's default applies when
    /// absent.
    pub strategy: Option<Arc<dyn Strategy>>,
}

impl ChildSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(AgentId::new(id));
        self
    }

    pub fn with_state(mut self, state: Map<String, Value>) -> Self {
        self.initial_state = state;
        self
    }

    pub fn with_action(mut self, action: Arc<dyn Action>) -> Self {
        self.actions.push(action);
        self
    }

    pub fn with_route(
        mut self,
        pattern: impl Into<String>,
        action: impl Into<String>,
        priority: i32,
    ) -> Self {
        self.routes.push((pattern.into(), action.into(), priority));
        self
    }

    pub fn with_strategy(mut self, strategy: Arc<dyn Strategy>) -> Self {
        self.strategy = Some(strategy);
        self
    }
}

impl fmt::Debug for ChildSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChildSpec")
            .field("id", &self.id)
            .field("actions", &self.actions.len())
            .field("routes", &self.routes.len())
            .finish()
    }
}

/// Effects the server must enact, applied left to right within a single
/// `cmd` result.
#[derive(Clone)]
pub enum Directive {
    /// Publish a signal asynchronously; never blocks the server.
    Emit {
        signal: Signal,
        /// Overrides the signal's own hint and the server default.
        dispatch: Option<Vec<DispatchConfig>>,
    },

    /// Push an instruction onto the agent's pending queue (FIFO).
    Enqueue { instruction: Instruction },

    /// Execute an instruction outside the strategy, then route its
    /// outcome back through the drain via `result_action`.
    RunInstruction {
        instruction: Instruction,
        /// Registry name of the action that receives the outcome payload
        /// `{status, result, reason, effects, instruction, meta}`.
        result_action: String,
        meta: Map<String, Value>,
    },

    /// Deliver a message to this agent after the delay.
    Schedule { delay: Duration, message: ScheduleMessage },

    /// Create a child agent, register it under `tag`, and monitor it.
    SpawnAgent { spec: ChildSpec, tag: String, meta: Map<String, Value> },

    /// Gracefully shut down the child registered under `tag`.
    StopChild { tag: String, reason: Option<String> },

    /// Terminate this agent after in-flight directives complete.
    Stop { reason: StopReason },

    /// Record a failure; server policy decides whether to continue,
    /// count, or stop.
    Error { error: ExecutionError, context: Map<String, Value> },

    /// Apply a structural update to the agent state.
    StateModify { op: StateOp, path: Vec<String>, value: Value },

    /// Add an action to the agent's registry.
    RegisterAction { action: Arc<dyn Action> },

    /// Remove an action from the agent's registry.
    DeregisterAction { name: String },
}

impl Directive {
    /// Directive name for log spans (e.g. "run_instruction", "emit").
    pub fn name(&self) -> &'static str {
        match self {
            Directive::Emit { .. } => "emit",
            Directive::Enqueue { .. } => "enqueue",
            Directive::RunInstruction { .. } => "run_instruction",
            Directive::Schedule { .. } => "schedule",
            Directive::SpawnAgent { .. } => "spawn_agent",
            Directive::StopChild { .. } => "stop_child",
            Directive::Stop { .. } => "stop",
            Directive::Error { .. } => "error",
            Directive::StateModify { .. } => "state_modify",
            Directive::RegisterAction { .. } => "register_action",
            Directive::DeregisterAction { .. } => "deregister_action",
        }
    }

    /// Key-value pairs for structured logging
    pub fn fields(&self) -> Vec<(&'static str, String)> {
        match self {
            Directive::Emit { signal, .. } => vec![("signal", signal.log_summary())],
            Directive::Enqueue { instruction } => vec![("action", instruction.action.clone())],
            Directive::RunInstruction { instruction, result_action, .. } => vec![
                ("action", instruction.action.clone()),
                ("result_action", result_action.clone()),
            ],
            Directive::Schedule { delay, .. } => {
                vec![("delay_ms", delay.as_millis().to_string())]
            }
            Directive::SpawnAgent { tag, .. } => vec![("tag", tag.clone())],
            Directive::StopChild { tag, reason } => {
                let mut fields = vec![("tag", tag.clone())];
                if let Some(reason) = reason {
                    fields.push(("reason", reason.clone()));
                }
                fields
            }
            Directive::Stop { reason } => vec![("reason", reason.to_string())],
            Directive::Error { error, .. } => vec![("error", error.message.clone())],
            Directive::StateModify { op, path, .. } => {
                vec![("op", op.as_str().to_string()), ("path", path.join("."))]
            }
            Directive::RegisterAction { action } => {
                vec![("action", action.name().to_string())]
            }
            Directive::DeregisterAction { name } => vec![("action", name.clone())],
        }
    }

    /// Whether to log 'started' and 'completed' or just a single line,
    /// to control the verbosity for frequent directives.
    pub fn verbose(&self) -> bool {
        !matches!(self, Directive::Emit { .. } | Directive::Schedule { .. })
    }
}

impl fmt::Debug for Directive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct(self.name());
        for (key, value) in self.fields() {
            s.field(key, &value);
        }
        s.finish()
    }
}

#[cfg(test)]
#[path = "directive_tests.rs"]
mod tests;
