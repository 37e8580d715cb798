// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Engine error type wrapping the per-crate failures beneath it.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Core(#[from] jido_core::Error),

    #[error(transparent)]
    Storage(#[from] jido_storage::StorageError),

    #[error(transparent)]
    Dispatch(#[from] jido_adapters::DispatchError),

    #[error("agent server is not running")]
    NotRunning,

    #[error("instance not found: {0}")]
    NotFound(String),
}

impl ServerError {
    /// Flatten to the core error when possible (reply payloads).
    pub fn message(&self) -> String {
        self.to_string()
    }
}
