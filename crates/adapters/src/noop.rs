// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Noop adapter: swallows signals. Useful to mute a default dispatch.

use crate::dispatch::{DispatchAdapter, DispatchError};
use async_trait::async_trait;
use jido_core::Signal;
use serde_json::{Map, Value};

#[derive(Debug, Clone, Default)]
pub struct NoopAdapter;

#[async_trait]
impl DispatchAdapter for NoopAdapter {
    fn name(&self) -> &str {
        "noop"
    }

    async fn deliver(
        &self,
        _signal: &Signal,
        _opts: &Map<String, Value>,
    ) -> Result<(), DispatchError> {
        Ok(())
    }
}
