// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Instructions: the unit of work a strategy schedules.
//!
//! An instruction addresses its action by registry name rather than by
//! reference so the whole value stays serializable — strategies park
//! instruction batches inside their state slice, and checkpoints carry
//! them across hibernate/thaw.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Reserved context key carrying the agent state injected before execution.
pub const CONTEXT_STATE_KEY: &str = "state";

/// An action reference plus parameters.
///
/// Dequeued exactly once, executed exactly once unless an error path
/// retries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instruction {
    /// Registry name of the action to execute.
    pub action: String,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub params: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub context: Map<String, Value>,
}

impl Instruction {
    pub fn new(action: impl Into<String>) -> Self {
        Self { action: action.into(), params: Map::new(), context: Map::new() }
    }

    pub fn with_params(mut self, params: Map<String, Value>) -> Self {
        self.params = params;
        self
    }

    pub fn with_param(mut self, key: impl Into<String>, value: Value) -> Self {
        self.params.insert(key.into(), value);
        self
    }

    pub fn with_context(mut self, context: Map<String, Value>) -> Self {
        self.context = context;
        self
    }

    /// Parse an instruction from a loose JSON value: either a bare action
    /// name string or an object `{action, params?, context?}`.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(name) if !name.is_empty() => Some(Self::new(name)),
            Value::Object(_) => serde_json::from_value(value.clone()).ok(),
            _ => None,
        }
    }
}

#[cfg(test)]
#[path = "instruction_tests.rs"]
mod tests;
