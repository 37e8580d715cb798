// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Checkpoint document: the serialized snapshot used for hibernate/thaw.
//!
//! The state sub-document is self-contained and never embeds the full
//! thread — only a `{id, rev}` pointer.

use jido_core::{Thread, ThreadPointer, THREAD_KEY};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Current checkpoint document version.
pub const CURRENT_CHECKPOINT_VERSION: u32 = 1;

/// Storage key for a checkpoint: `{agent_module, scope}`.
///
/// Keyed pools scope their raw keys under the manager name so two
/// managers sharing one storage table never alias:
/// `CheckpointKey::scoped("counter", "pool-a", "k")` and
/// `CheckpointKey::scoped("counter", "pool-b", "k")` are distinct.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CheckpointKey {
    pub module: String,
    pub scope: String,
}

impl CheckpointKey {
    pub fn new(module: impl Into<String>, scope: impl Into<String>) -> Self {
        Self { module: module.into(), scope: scope.into() }
    }

    /// Key namespaced under a manager name: `{module, "{manager}/{key}"}`.
    pub fn scoped(
        module: impl Into<String>,
        manager: impl fmt::Display,
        key: impl fmt::Display,
    ) -> Self {
        Self { module: module.into(), scope: format!("{}/{}", manager, key) }
    }
}

impl fmt::Display for CheckpointKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.module, self.scope)
    }
}

/// On-the-wire checkpoint shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub version: u32,
    /// Identity of the agent type to reconstruct on thaw.
    pub agent_module: String,
    pub id: String,
    /// Agent state with `__thread__` stripped.
    pub state: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thread: Option<ThreadPointer>,
}

impl Checkpoint {
    pub fn new(agent_module: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            version: CURRENT_CHECKPOINT_VERSION,
            agent_module: agent_module.into(),
            id: id.into(),
            state: Map::new(),
            thread: None,
        }
    }

    /// Enforce the externalization invariants regardless of who built the
    /// document: strip the embedded thread, set the pointer.
    pub fn externalize_thread(&mut self, thread: Option<&Thread>) {
        self.state.remove(THREAD_KEY);
        self.thread = thread.map(Thread::pointer);
    }
}

#[cfg(test)]
#[path = "checkpoint_tests.rs"]
mod tests;
