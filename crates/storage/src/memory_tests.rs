// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::checkpoint::Checkpoint;
use serde_json::{json, Map};

fn entry(n: i64) -> ThreadEntry {
    ThreadEntry::note(json!({"n": n}))
}

#[tokio::test]
async fn checkpoint_roundtrip() {
    let storage = MemoryStorage::new();
    let key = CheckpointKey::new("counter", "k1");
    assert_eq!(storage.get_checkpoint(&key).await, Err(StorageError::NotFound));

    let checkpoint = Checkpoint::new("counter", "a1");
    storage.put_checkpoint(&key, &checkpoint).await.unwrap();
    assert_eq!(storage.get_checkpoint(&key).await.unwrap(), checkpoint);
}

#[tokio::test]
async fn append_assigns_seqs_and_bumps_rev() {
    let storage = MemoryStorage::new();
    let id = ThreadId::new();

    let thread =
        storage.append_thread(&id, vec![entry(0), entry(1)], AppendOpts::default()).await.unwrap();
    assert_eq!(thread.rev, 2);
    assert_eq!(thread.entries[1].seq, 1);

    let thread =
        storage.append_thread(&id, vec![entry(2)], AppendOpts::at_rev(2)).await.unwrap();
    assert_eq!(thread.rev, 3);
    assert_eq!(thread.entries[2].seq, 2);
}

#[tokio::test]
async fn append_cas_conflicts_on_stale_rev() {
    let storage = MemoryStorage::new();
    let id = ThreadId::new();
    storage.append_thread(&id, vec![entry(0)], AppendOpts::default()).await.unwrap();

    let err = storage.append_thread(&id, vec![entry(1)], AppendOpts::at_rev(0)).await.unwrap_err();
    assert!(matches!(err, StorageError::Conflict { stored: 1, expected: 0, .. }));

    // a failed CAS must not create or mutate the thread
    assert_eq!(storage.get_thread(&id).await.unwrap().rev, 1);
}

#[tokio::test]
async fn metadata_applies_only_on_first_append() {
    let storage = MemoryStorage::new();
    let id = ThreadId::new();

    let mut metadata = Map::new();
    metadata.insert("topic".to_string(), json!("orders"));
    storage
        .append_thread(&id, vec![entry(0)], AppendOpts::at_rev(0).with_metadata(metadata))
        .await
        .unwrap();

    let mut other = Map::new();
    other.insert("topic".to_string(), json!("changed"));
    let thread = storage
        .append_thread(&id, vec![entry(1)], AppendOpts::at_rev(1).with_metadata(other))
        .await
        .unwrap();
    assert_eq!(thread.metadata.get("topic"), Some(&json!("orders")));
}

#[tokio::test]
async fn clones_share_tables() {
    let storage = MemoryStorage::new();
    let other = storage.clone();
    let key = CheckpointKey::new("m", "k");
    storage.put_checkpoint(&key, &Checkpoint::new("m", "a1")).await.unwrap();
    assert!(other.get_checkpoint(&key).await.is_ok());
    assert_eq!(other.checkpoint_count(), 1);
}
