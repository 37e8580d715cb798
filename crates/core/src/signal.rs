// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Signal envelope: the typed event wrapper every agent input and output
//! travels in.
//!
//! A signal's `type` is a dotted path (e.g. `jido.agent.cmd.state`) that
//! the router matches against. Result signals reuse the originating
//! signal's id verbatim so synchronous callers can correlate replies,
//! which is why [`SignalId`] is an open string newtype rather than a
//! fixed-size generated id.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::borrow::Borrow;
use std::fmt;

/// Default `source` for signals created inside the runtime.
pub const DEFAULT_SOURCE: &str = "jido://runtime";

/// Unique identifier for a signal.
///
/// Producers may supply their own ids of any shape; ids generated by the
/// runtime are `sig-` plus a 19-character nanoid.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SignalId(pub String);

impl SignalId {
    /// Wrap an existing id value.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a new random signal id.
    pub fn generate() -> Self {
        Self(format!("sig-{}", nanoid::nanoid!(19)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SignalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for SignalId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for SignalId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl PartialEq<str> for SignalId {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for SignalId {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

impl Borrow<str> for SignalId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Dispatch adapter configuration: adapter name plus adapter-specific
/// options. A list of configs fans out to every adapter in order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatchConfig {
    pub adapter: String,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub opts: Map<String, Value>,
}

impl DispatchConfig {
    pub fn new(adapter: impl Into<String>) -> Self {
        Self { adapter: adapter.into(), opts: Map::new() }
    }

    pub fn with_opt(mut self, key: impl Into<String>, value: Value) -> Self {
        self.opts.insert(key.into(), value);
        self
    }
}

/// Typed event envelope. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub id: SignalId,
    #[serde(default = "default_source")]
    pub source: String,
    #[serde(rename = "type")]
    pub ty: String,
    #[serde(default)]
    pub data: Value,
    /// Optional target hint consumed by the dispatch layer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dispatch: Option<Vec<DispatchConfig>>,
}

fn default_source() -> String {
    DEFAULT_SOURCE.to_string()
}

impl Signal {
    /// Create a signal with a generated id and the runtime source.
    pub fn new(ty: impl Into<String>, data: Value) -> Self {
        Self {
            id: SignalId::generate(),
            source: default_source(),
            ty: ty.into(),
            data,
            dispatch: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<SignalId>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    pub fn with_dispatch(mut self, dispatch: Vec<DispatchConfig>) -> Self {
        self.dispatch = Some(dispatch);
        self
    }

    /// The signal data as a JSON object, or an empty map for non-object data.
    pub fn data_map(&self) -> Map<String, Value> {
        match &self.data {
            Value::Object(map) => map.clone(),
            _ => Map::new(),
        }
    }

    /// Short form for log lines: `{type} id={id}`.
    pub fn log_summary(&self) -> String {
        format!("{} id={}", self.ty, self.id)
    }
}

/// The bit-stable signal type taxonomy consumed by external tooling.
pub mod signal_types {
    // -- control --
    pub const CMD_STATE: &str = "jido.agent.cmd.state";
    pub const CMD_QUEUE_SIZE: &str = "jido.agent.cmd.queuesize";
    pub const CMD_SET: &str = "jido.agent.cmd.set";
    pub const CMD_VALIDATE: &str = "jido.agent.cmd.validate";
    pub const CMD_PLAN: &str = "jido.agent.cmd.plan";
    pub const CMD_RUN: &str = "jido.agent.cmd.run";
    pub const CMD_CMD: &str = "jido.agent.cmd.cmd";

    // -- lifecycle --
    pub const EVENT_STARTED: &str = "jido.agent.event.started";
    pub const EVENT_STOPPED: &str = "jido.agent.event.stopped";
    pub const EVENT_TRANSITION_SUCCEEDED: &str = "jido.agent.event.transition.succeeded";
    pub const EVENT_TRANSITION_FAILED: &str = "jido.agent.event.transition.failed";
    pub const EVENT_QUEUE_OVERFLOW: &str = "jido.agent.event.queue.overflow";
    pub const EVENT_QUEUE_CLEARED: &str = "jido.agent.event.queue.cleared";
    pub const EVENT_PROCESS_STARTED: &str = "jido.agent.event.process.started";
    pub const EVENT_PROCESS_RESTARTED: &str = "jido.agent.event.process.restarted";
    pub const EVENT_PROCESS_TERMINATED: &str = "jido.agent.event.process.terminated";
    pub const EVENT_PROCESS_FAILED: &str = "jido.agent.event.process.failed";

    // -- error surface --
    pub const ERR_EXECUTION_ERROR: &str = "jido.agent.err.execution.error";

    // -- reply surface --
    pub const OUT_INSTRUCTION_RESULT: &str = "jido.agent.out.instruction.result";
    pub const OUT_SIGNAL_RESULT: &str = "jido.agent.out.signal.result";

    // -- misc --
    pub const AGENT_STOP: &str = "jido.agent.stop";
    pub const SCHEDULED: &str = "jido.scheduled";
}

#[cfg(test)]
#[path = "signal_tests.rs"]
mod tests;
