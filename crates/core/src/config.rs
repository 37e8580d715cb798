// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Runtime settings for agent servers.
//!
//! Deliberately a plain serde struct (no env/CLI layer): embedders load
//! it from whatever format they use and hand it to the server builder.

use crate::signal::DispatchConfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// What the server does when a directive records an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorPolicy {
    /// Log and continue.
    LogOnly,
    /// Stop the server on the first error.
    StopOnError,
    /// Count errors, stop when the count reaches the bound.
    MaxErrors(u32),
}

impl Default for ErrorPolicy {
    fn default() -> Self {
        Self::LogOnly
    }
}

/// Per-server settings. Field names are the stable configuration keys.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Idle time before hibernate, in milliseconds. `None` disables the
    /// idle timer.
    pub idle_timeout_ms: Option<u64>,
    /// Bound on pending plus in-flight signals.
    pub max_queue_size: usize,
    /// Signals processed per loop turn.
    pub batch_size: usize,
    pub error_policy: ErrorPolicy,
    /// Fallback dispatch for emitted signals with no hint of their own.
    pub default_dispatch: Option<Vec<DispatchConfig>>,
    /// Suggested tracing filter; applied by the embedder, not the server.
    pub log_level: Option<String>,
    /// Capacity of the recent-events ring buffer.
    pub debug_max_events: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            idle_timeout_ms: None,
            max_queue_size: 10_000,
            batch_size: 1,
            error_policy: ErrorPolicy::default(),
            default_dispatch: None,
            log_level: None,
            debug_max_events: 64,
        }
    }
}

impl Settings {
    pub fn idle_timeout(&self) -> Option<Duration> {
        self.idle_timeout_ms.map(Duration::from_millis)
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
