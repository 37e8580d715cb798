// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Agent value: the immutable-per-step state owned by an agent server.
//!
//! AgentId is an open string newtype: ids arrive from manager keys and
//! checkpoints and are stable for the agent's whole life. The state map
//! reserves two keys for cooperating components — `__strategy__` (owned
//! by the strategy) and `__thread__` (the lazily attached event journal).

use crate::action::ActionRegistry;
use crate::error::Error;
use crate::instruction::Instruction;
use crate::thread::Thread;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::borrow::Borrow;
use std::collections::VecDeque;
use std::fmt;

/// Reserved state key for the strategy's private slice.
pub const STRATEGY_KEY: &str = "__strategy__";
/// Reserved state key for the attached thread journal.
pub const THREAD_KEY: &str = "__thread__";

/// Unique identifier for an agent. Non-empty and stable once assigned.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AgentId(pub String);

impl AgentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for AgentId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for AgentId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl PartialEq<str> for AgentId {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for AgentId {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

impl Borrow<str> for AgentId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// The stateful unit an agent server executes.
#[derive(Debug, Clone, Default)]
pub struct Agent {
    pub id: AgentId,
    /// User state plus the reserved `__strategy__` / `__thread__` slices.
    pub state: Map<String, Value>,
    /// Pending instruction queue, FIFO.
    pub pending: VecDeque<Instruction>,
    /// Actions this agent may execute.
    pub actions: ActionRegistry,
    /// Last execution result slot.
    pub result: Option<Value>,
}

impl Agent {
    pub fn new(id: impl Into<String>) -> Result<Self, Error> {
        let id = AgentId::new(id);
        if id.is_empty() {
            return Err(Error::MissingAgentId);
        }
        Ok(Self { id, ..Self::default() })
    }

    pub fn with_state(mut self, state: Map<String, Value>) -> Self {
        self.state = state;
        self
    }

    pub fn enqueue(&mut self, instruction: Instruction) {
        self.pending.push_back(instruction);
    }

    pub fn dequeue(&mut self) -> Option<Instruction> {
        self.pending.pop_front()
    }

    /// Drain the whole pending queue in FIFO order.
    pub fn drain_pending(&mut self) -> Vec<Instruction> {
        self.pending.drain(..).collect()
    }

    pub fn queue_len(&self) -> usize {
        self.pending.len()
    }

    /// The attached thread journal, if any.
    ///
    /// A present but malformed `__thread__` slice is an invariant
    /// violation and surfaces as `InvalidAgent`.
    pub fn thread(&self) -> Result<Option<Thread>, Error> {
        match self.state.get(THREAD_KEY) {
            None => Ok(None),
            Some(value) => serde_json::from_value(value.clone())
                .map(Some)
                .map_err(|e| Error::InvalidAgent(format!("malformed {}: {}", THREAD_KEY, e))),
        }
    }

    pub fn set_thread(&mut self, thread: &Thread) -> Result<(), Error> {
        let value = serde_json::to_value(thread)
            .map_err(|e| Error::InvalidAgent(format!("unserializable thread: {}", e)))?;
        self.state.insert(THREAD_KEY.to_string(), value);
        Ok(())
    }

    /// Remove and return the attached thread.
    pub fn take_thread(&mut self) -> Result<Option<Thread>, Error> {
        let thread = self.thread()?;
        self.state.remove(THREAD_KEY);
        Ok(thread)
    }

    pub fn strategy_slice(&self) -> Option<&Value> {
        self.state.get(STRATEGY_KEY)
    }

    pub fn set_strategy_slice(&mut self, slice: Value) {
        self.state.insert(STRATEGY_KEY.to_string(), slice);
    }

    /// The state map as a JSON value (for injection into action contexts).
    pub fn state_value(&self) -> Value {
        Value::Object(self.state.clone())
    }
}

#[cfg(test)]
#[path = "agent_tests.rs"]
mod tests;
