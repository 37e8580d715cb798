// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Storage adapter contract.
//!
//! Adapters must provide: durability of `put_checkpoint` before return,
//! atomicity of a single `append_thread` call, and visibility of prior
//! writes to subsequent reads from the same process. Concurrent thread
//! writers are serialized through the `expected_rev` compare-and-set.

use crate::checkpoint::{Checkpoint, CheckpointKey};
use async_trait::async_trait;
use jido_core::{Clock, Thread, ThreadEntry, ThreadId};
use serde_json::{Map, Value};
use thiserror::Error;

/// Storage failures, including the thread-journal invariant violations
/// surfaced by the persistence layer.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    /// Another writer raced an `append_thread` compare-and-set.
    #[error("thread append conflict: {thread_id} expected rev {expected}, stored {stored}")]
    Conflict { thread_id: ThreadId, expected: u64, stored: u64 },

    #[error("invalid thread revision: {thread_id} rev {rev} != {len} entries")]
    InvalidThreadRevision { thread_id: ThreadId, rev: u64, len: u64 },

    #[error("thread revision regression: {thread_id} stored rev {stored} > local rev {local}")]
    ThreadRevRegression { thread_id: ThreadId, stored: u64, local: u64 },

    #[error("thread history truncated: {thread_id} stored rev {stored} > {len} local entries")]
    ThreadHistoryTruncated { thread_id: ThreadId, stored: u64, len: u64 },

    #[error("thread mismatch: {thread_id} checkpoint rev {expected}, stored rev {stored}")]
    ThreadMismatch { thread_id: ThreadId, expected: u64, stored: u64 },

    #[error("missing thread: {0}")]
    MissingThread(ThreadId),

    #[error("invalid agent: {0}")]
    InvalidAgent(String),

    #[error("storage io error: {0}")]
    Io(String),

    #[error("storage serialization error: {0}")]
    Serde(String),
}

impl From<jido_core::Error> for StorageError {
    fn from(e: jido_core::Error) -> Self {
        StorageError::InvalidAgent(e.to_string())
    }
}

/// Options for `append_thread`.
#[derive(Debug, Clone, Default)]
pub struct AppendOpts {
    /// Compare-and-set: the append fails with `Conflict` unless the
    /// stored revision equals this value.
    pub expected_rev: Option<u64>,
    /// Thread metadata, applied only when the thread is first created.
    pub metadata: Option<Map<String, Value>>,
}

impl AppendOpts {
    pub fn at_rev(rev: u64) -> Self {
        Self { expected_rev: Some(rev), metadata: None }
    }

    pub fn with_metadata(mut self, metadata: Map<String, Value>) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// Normalize entries before append: generate missing ids, stamp missing
/// timestamps, default the kind, and assign sequential seqs from `base`.
pub fn normalize_entries(
    entries: Vec<ThreadEntry>,
    base: u64,
    clock: &impl Clock,
) -> Vec<ThreadEntry> {
    let now_ms = clock.epoch_ms();
    entries
        .into_iter()
        .enumerate()
        .map(|(i, entry)| entry.normalize(base + i as u64, now_ms))
        .collect()
}

/// Pluggable persistence backend for checkpoints and thread journals.
#[async_trait]
pub trait StorageAdapter: Send + Sync {
    async fn get_checkpoint(&self, key: &CheckpointKey) -> Result<Checkpoint, StorageError>;

    /// Durable before return.
    async fn put_checkpoint(
        &self,
        key: &CheckpointKey,
        checkpoint: &Checkpoint,
    ) -> Result<(), StorageError>;

    async fn get_thread(&self, id: &ThreadId) -> Result<Thread, StorageError>;

    /// Atomically append entries, honoring `opts.expected_rev`. Returns
    /// the updated thread.
    async fn append_thread(
        &self,
        id: &ThreadId,
        entries: Vec<ThreadEntry>,
        opts: AppendOpts,
    ) -> Result<Thread, StorageError>;
}
