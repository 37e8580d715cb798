// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Recording adapter for tests: captures every delivered signal.

use crate::dispatch::{DispatchAdapter, DispatchError};
use async_trait::async_trait;
use jido_core::Signal;
use parking_lot::Mutex;
use serde_json::{Map, Value};
use std::sync::Arc;

#[derive(Debug, Clone, Default)]
pub struct RecordingAdapter {
    captured: Arc<Mutex<Vec<Signal>>>,
}

impl RecordingAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn captured(&self) -> Vec<Signal> {
        self.captured.lock().clone()
    }

    /// Captured signals of one type, in delivery order.
    pub fn of_type(&self, ty: &str) -> Vec<Signal> {
        self.captured.lock().iter().filter(|s| s.ty == ty).cloned().collect()
    }

    pub fn clear(&self) {
        self.captured.lock().clear();
    }
}

#[async_trait]
impl DispatchAdapter for RecordingAdapter {
    fn name(&self) -> &str {
        "record"
    }

    async fn deliver(
        &self,
        signal: &Signal,
        _opts: &Map<String, Value>,
    ) -> Result<(), DispatchError> {
        self.captured.lock().push(signal.clone());
        Ok(())
    }
}
