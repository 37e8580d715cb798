// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! File-backed storage adapter.
//!
//! One JSON document per checkpoint and per thread:
//! `{root}/checkpoints/{module}/{scope}.json` and
//! `{root}/threads/{id}.json`. Writes go to a temp file in the target
//! directory and are renamed into place, then the file is fsynced, so a
//! crash leaves either the old or the new document.
//!
//! Path components are percent-style encoded (injectively), so distinct
//! manager scopes can never collide on disk.

use crate::adapter::{normalize_entries, AppendOpts, StorageAdapter, StorageError};
use crate::checkpoint::{Checkpoint, CheckpointKey};
use async_trait::async_trait;
use jido_core::{SystemClock, Thread, ThreadEntry, ThreadId};
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// JSON-file storage rooted at a directory.
#[derive(Clone)]
pub struct FileStorage {
    root: PathBuf,
    /// Serializes append read-modify-write cycles within this process.
    append_lock: Arc<Mutex<()>>,
    clock: SystemClock,
}

impl FileStorage {
    /// Open (and create) a storage root.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let root = root.into();
        fs::create_dir_all(root.join("checkpoints")).map_err(io_err)?;
        fs::create_dir_all(root.join("threads")).map_err(io_err)?;
        Ok(Self { root, append_lock: Arc::new(Mutex::new(())), clock: SystemClock })
    }

    fn checkpoint_path(&self, key: &CheckpointKey) -> PathBuf {
        self.root
            .join("checkpoints")
            .join(encode_component(&key.module))
            .join(format!("{}.json", encode_component(&key.scope)))
    }

    fn thread_path(&self, id: &ThreadId) -> PathBuf {
        self.root.join("threads").join(format!("{}.json", encode_component(id.as_str())))
    }
}

fn io_err(e: std::io::Error) -> StorageError {
    StorageError::Io(e.to_string())
}

/// Injective encoding for one path component: ASCII alphanumerics plus
/// `.`, `_`, `-` pass through, everything else becomes `%XX` per byte.
fn encode_component(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for b in s.bytes() {
        match b {
            b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' | b'.' | b'_' | b'-' => out.push(b as char),
            other => out.push_str(&format!("%{:02X}", other)),
        }
    }
    out
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, StorageError> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(StorageError::NotFound)
        }
        Err(e) => return Err(io_err(e)),
    };
    serde_json::from_slice(&bytes).map_err(|e| StorageError::Serde(e.to_string()))
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), StorageError> {
    let parent = path.parent().ok_or_else(|| StorageError::Io("no parent dir".to_string()))?;
    fs::create_dir_all(parent).map_err(io_err)?;

    let bytes = serde_json::to_vec_pretty(value).map_err(|e| StorageError::Serde(e.to_string()))?;
    let tmp = parent.join(format!(".tmp-{}", nanoid::nanoid!(8)));
    {
        let mut file = fs::File::create(&tmp).map_err(io_err)?;
        file.write_all(&bytes).map_err(io_err)?;
        file.sync_all().map_err(io_err)?;
    }
    fs::rename(&tmp, path).map_err(io_err)
}

#[async_trait]
impl StorageAdapter for FileStorage {
    async fn get_checkpoint(&self, key: &CheckpointKey) -> Result<Checkpoint, StorageError> {
        read_json(&self.checkpoint_path(key))
    }

    async fn put_checkpoint(
        &self,
        key: &CheckpointKey,
        checkpoint: &Checkpoint,
    ) -> Result<(), StorageError> {
        write_json(&self.checkpoint_path(key), checkpoint)
    }

    async fn get_thread(&self, id: &ThreadId) -> Result<Thread, StorageError> {
        read_json(&self.thread_path(id))
    }

    async fn append_thread(
        &self,
        id: &ThreadId,
        entries: Vec<ThreadEntry>,
        opts: AppendOpts,
    ) -> Result<Thread, StorageError> {
        let _guard = self.append_lock.lock();
        let path = self.thread_path(id);

        let mut thread = match read_json::<Thread>(&path) {
            Ok(thread) => thread,
            Err(StorageError::NotFound) => {
                Thread::with_id(*id, opts.metadata.clone().unwrap_or_default())
            }
            Err(e) => return Err(e),
        };

        if let Some(expected) = opts.expected_rev {
            if thread.rev != expected {
                return Err(StorageError::Conflict {
                    thread_id: *id,
                    expected,
                    stored: thread.rev,
                });
            }
        }

        let normalized = normalize_entries(entries, thread.rev, &self.clock);
        thread.rev += normalized.len() as u64;
        thread.entries.extend(normalized);
        write_json(&path, &thread)?;
        Ok(thread)
    }
}

#[cfg(test)]
#[path = "file_tests.rs"]
mod tests;
