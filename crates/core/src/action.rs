// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Action interface: the pluggable unit of work an instruction executes.

use crate::agent::AgentId;
use crate::directive::Directive;
use crate::error::Error;
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Execution context handed to [`Action::run`].
///
/// `state` is the agent's current state map, injected by the server
/// immediately before execution. `meta` carries server-provided extras
/// (agent id, queue size) that some built-in actions need.
#[derive(Debug, Clone, Default)]
pub struct ActionContext {
    pub agent_id: AgentId,
    pub state: Map<String, Value>,
    pub meta: Map<String, Value>,
}

impl ActionContext {
    pub fn new(agent_id: AgentId, state: Map<String, Value>) -> Self {
        Self { agent_id, state, meta: Map::new() }
    }

    pub fn with_meta(mut self, key: impl Into<String>, value: Value) -> Self {
        self.meta.insert(key.into(), value);
        self
    }
}

/// Normalized result of an action run: a result value plus follow-up
/// directives. A bare value yields no directives.
#[derive(Debug, Clone, Default)]
pub struct ActionOutput {
    pub result: Value,
    pub directives: Vec<Directive>,
}

impl ActionOutput {
    pub fn value(result: Value) -> Self {
        Self { result, directives: Vec::new() }
    }

    pub fn with_directives(result: Value, directives: Vec<Directive>) -> Self {
        Self { result, directives }
    }
}

impl From<Value> for ActionOutput {
    fn from(result: Value) -> Self {
        Self::value(result)
    }
}

/// The unit of work an agent can execute.
///
/// Implementations must be side-effect-free with respect to the agent:
/// all agent-visible effects flow through the returned directives so the
/// server can order, retry, and observe them uniformly.
#[async_trait]
pub trait Action: Send + Sync {
    /// Registry name; instructions address actions by this string.
    fn name(&self) -> &str;

    async fn run(
        &self,
        params: &Map<String, Value>,
        ctx: &ActionContext,
    ) -> Result<ActionOutput, Error>;
}

/// Name-keyed registry of the actions an agent may execute.
#[derive(Clone, Default)]
pub struct ActionRegistry {
    actions: HashMap<String, Arc<dyn Action>>,
}

impl ActionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an action under its own name, replacing any previous
    /// registration.
    pub fn register(&mut self, action: Arc<dyn Action>) {
        self.actions.insert(action.name().to_string(), action);
    }

    pub fn deregister(&mut self, name: &str) -> bool {
        self.actions.remove(name).is_some()
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Action>> {
        self.actions.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.actions.contains_key(name)
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.actions.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

impl fmt::Debug for ActionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionRegistry").field("actions", &self.names()).finish()
    }
}

#[cfg(test)]
#[path = "action_tests.rs"]
mod tests;
