// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error taxonomy for the agent runtime core.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Router construction or match failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[serde(rename_all = "snake_case")]
pub enum RoutingError {
    /// Empty path segment (leading, trailing, or doubled dot).
    #[error("route pattern has consecutive dots")]
    ConsecutiveDots,
    /// A `**` segment neighboring another wildcard is ambiguous.
    #[error("'**' must not neighbor another wildcard")]
    DoubleStarNotAlone,
    #[error("route pattern contains invalid characters: {0}")]
    InvalidCharacters(String),
    #[error("route priority out of range [-100, 100]: {0}")]
    InvalidPriority(i32),
    /// Kept for wire compatibility: match functions are arity-checked by
    /// the type system here and this kind is never produced.
    #[error("route match function has invalid arity")]
    InvalidMatchArity,
    #[error("route target is invalid")]
    InvalidTarget,
    #[error("no route matches path: {0}")]
    UnknownPath(String),
}

/// Action or directive execution failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[error("execution error: {message}")]
pub struct ExecutionError {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cause: Option<String>,
}

impl ExecutionError {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into(), cause: None }
    }

    pub fn with_cause(message: impl Into<String>, cause: impl Into<String>) -> Self {
        Self { message: message.into(), cause: Some(cause.into()) }
    }
}

/// Caller-side timeout diagnostic. Always non-empty: the handle fills it
/// from the server's shared status snapshot at expiry time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeoutDiagnostic {
    /// Lifecycle state of the server when the deadline expired.
    pub server_status: String,
    pub queue_len: usize,
    pub drain_iteration: u64,
    pub elapsed_ms: u64,
}

/// Core runtime errors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    #[error("validation error: {message}")]
    Validation { message: String, details: Option<Value> },

    #[error(transparent)]
    Routing(#[from] RoutingError),

    #[error(transparent)]
    Execution(#[from] ExecutionError),

    #[error("call timed out after {}ms (status {}, {} queued)",
        .0.elapsed_ms, .0.server_status, .0.queue_len)]
    Timeout(TimeoutDiagnostic),

    #[error("pending queue overflow")]
    QueueOverflow,

    #[error("invalid agent: {0}")]
    InvalidAgent(String),

    #[error("agent id must not be empty")]
    MissingAgentId,

    #[error("invalid storage configuration: {0}")]
    InvalidStorage(String),

    #[error("invalid signal: {0}")]
    InvalidSignal(String),

    #[error("server shut down: {0}")]
    Shutdown(String),
}

impl Error {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation { message: message.into(), details: None }
    }

    pub fn validation_with(message: impl Into<String>, details: Value) -> Self {
        Self::Validation { message: message.into(), details: Some(details) }
    }

    pub fn execution(message: impl Into<String>) -> Self {
        Self::Execution(ExecutionError::new(message))
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
