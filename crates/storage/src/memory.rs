// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory storage adapter: the default for tests and ephemeral pools.

use crate::adapter::{normalize_entries, AppendOpts, StorageAdapter, StorageError};
use crate::checkpoint::{Checkpoint, CheckpointKey};
use async_trait::async_trait;
use jido_core::{SystemClock, Thread, ThreadEntry, ThreadId};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Default)]
struct Tables {
    checkpoints: HashMap<CheckpointKey, Checkpoint>,
    threads: HashMap<ThreadId, Thread>,
}

/// Process-local storage over a pair of hash tables. Cloning shares the
/// underlying tables, so one instance can back several managers.
#[derive(Clone, Default)]
pub struct MemoryStorage {
    tables: Arc<Mutex<Tables>>,
    clock: SystemClock,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored checkpoints (test/diagnostic aid).
    pub fn checkpoint_count(&self) -> usize {
        self.tables.lock().checkpoints.len()
    }
}

#[async_trait]
impl StorageAdapter for MemoryStorage {
    async fn get_checkpoint(&self, key: &CheckpointKey) -> Result<Checkpoint, StorageError> {
        self.tables.lock().checkpoints.get(key).cloned().ok_or(StorageError::NotFound)
    }

    async fn put_checkpoint(
        &self,
        key: &CheckpointKey,
        checkpoint: &Checkpoint,
    ) -> Result<(), StorageError> {
        self.tables.lock().checkpoints.insert(key.clone(), checkpoint.clone());
        Ok(())
    }

    async fn get_thread(&self, id: &ThreadId) -> Result<Thread, StorageError> {
        self.tables.lock().threads.get(id).cloned().ok_or(StorageError::NotFound)
    }

    async fn append_thread(
        &self,
        id: &ThreadId,
        entries: Vec<ThreadEntry>,
        opts: AppendOpts,
    ) -> Result<Thread, StorageError> {
        let mut tables = self.tables.lock();
        let stored_rev = tables.threads.get(id).map(|t| t.rev).unwrap_or(0);
        if let Some(expected) = opts.expected_rev {
            if stored_rev != expected {
                return Err(StorageError::Conflict {
                    thread_id: *id,
                    expected,
                    stored: stored_rev,
                });
            }
        }

        let thread = tables.threads.entry(*id).or_insert_with(|| {
            Thread::with_id(*id, opts.metadata.clone().unwrap_or_default())
        });

        let normalized = normalize_entries(entries, thread.rev, &self.clock);
        thread.rev += normalized.len() as u64;
        thread.entries.extend(normalized);
        Ok(thread.clone())
    }
}

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;
