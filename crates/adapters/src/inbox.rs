// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Inbox adapter: delivers signals straight into a registered agent
//! inbox (the `pid` adapter of the source design).
//!
//! Servers register a named sender on startup and unregister on
//! shutdown; dispatch configs address them with `{"target": name}`.

use crate::dispatch::{DispatchAdapter, DispatchError};
use async_trait::async_trait;
use jido_core::Signal;
use parking_lot::Mutex;
use serde_json::{Map, Value};
use std::collections::HashMap;
use tokio::sync::mpsc;

#[derive(Debug, Default)]
pub struct InboxAdapter {
    targets: Mutex<HashMap<String, mpsc::UnboundedSender<Signal>>>,
}

impl InboxAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a named inbox, replacing any previous sender.
    pub fn register(&self, name: impl Into<String>, tx: mpsc::UnboundedSender<Signal>) {
        self.targets.lock().insert(name.into(), tx);
    }

    pub fn unregister(&self, name: &str) {
        self.targets.lock().remove(name);
    }

    pub fn targets(&self) -> Vec<String> {
        let mut names: Vec<String> = self.targets.lock().keys().cloned().collect();
        names.sort();
        names
    }
}

#[async_trait]
impl DispatchAdapter for InboxAdapter {
    fn name(&self) -> &str {
        "inbox"
    }

    async fn deliver(
        &self,
        signal: &Signal,
        opts: &Map<String, Value>,
    ) -> Result<(), DispatchError> {
        let target = opts
            .get("target")
            .and_then(Value::as_str)
            .ok_or_else(|| DispatchError::Delivery("inbox requires a target opt".to_string()))?;

        let tx = self
            .targets
            .lock()
            .get(target)
            .cloned()
            .ok_or_else(|| DispatchError::UnknownTarget(target.to_string()))?;

        tx.send(signal.clone())
            .map_err(|_| DispatchError::Delivery(format!("inbox {} is closed", target)))
    }
}

#[cfg(test)]
#[path = "inbox_tests.rs"]
mod tests;
