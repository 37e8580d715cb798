// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Logger adapter: emits signals as structured tracing events. The
//! universal fallback when nothing else is configured.

use crate::dispatch::{DispatchAdapter, DispatchError};
use async_trait::async_trait;
use jido_core::Signal;
use serde_json::{Map, Value};

#[derive(Debug, Clone, Default)]
pub struct LoggerAdapter;

#[async_trait]
impl DispatchAdapter for LoggerAdapter {
    fn name(&self) -> &str {
        "logger"
    }

    async fn deliver(
        &self,
        signal: &Signal,
        opts: &Map<String, Value>,
    ) -> Result<(), DispatchError> {
        let level = opts.get("level").and_then(Value::as_str).unwrap_or("info");
        match level {
            "debug" => tracing::debug!(
                id = %signal.id,
                source = %signal.source,
                data = %signal.data,
                "signal {}", signal.ty
            ),
            "warn" => tracing::warn!(
                id = %signal.id,
                source = %signal.source,
                data = %signal.data,
                "signal {}", signal.ty
            ),
            _ => tracing::info!(
                id = %signal.id,
                source = %signal.source,
                data = %signal.data,
                "signal {}", signal.ty
            ),
        }
        Ok(())
    }
}
