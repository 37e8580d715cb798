// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Console adapter: prints signals to stdout, one JSON line each.

use crate::dispatch::{DispatchAdapter, DispatchError};
use async_trait::async_trait;
use jido_core::Signal;
use serde_json::{Map, Value};

#[derive(Debug, Clone, Default)]
pub struct ConsoleAdapter;

#[async_trait]
impl DispatchAdapter for ConsoleAdapter {
    fn name(&self) -> &str {
        "console"
    }

    async fn deliver(
        &self,
        signal: &Signal,
        _opts: &Map<String, Value>,
    ) -> Result<(), DispatchError> {
        let line = serde_json::to_string(signal)
            .map_err(|e| DispatchError::Delivery(e.to_string()))?;
        println!("{line}");
        Ok(())
    }
}
