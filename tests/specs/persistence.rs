// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Hibernate/thaw specs over the file-backed adapter: full round-trip,
//! idempotence, and manager namespacing.

use crate::prelude::*;
use jido_core::{Signal, SystemClock, Thread, THREAD_KEY};
use jido_engine::{GetOpts, InstanceManager, ManagerConfig};
use jido_storage::{DefaultAgentKind, FileStorage, StorageAdapter};
use serde_json::json;
use std::sync::Arc;

fn manager_on(storage: FileStorage, name: &str) -> InstanceManager<SystemClock> {
    let config = ManagerConfig::new(
        name,
        Arc::new(storage),
        Arc::new(DefaultAgentKind::new("spec-agent")),
    )
    .with_routes(vec![route("note", "note"), route("append", "append")])
    .with_action(Arc::new(NoteAction))
    .with_action(Arc::new(AppendAction));
    InstanceManager::new(config, SystemClock)
}

fn thread_of(state: &serde_json::Map<String, serde_json::Value>) -> Thread {
    serde_json::from_value(state.get(THREAD_KEY).cloned().unwrap_or_default())
        .unwrap_or_else(|e| panic!("thread slice: {e}"))
}

#[tokio::test]
async fn hibernate_thaw_round_trip_preserves_state_and_thread() {
    let dir = tempfile::tempdir().unwrap();
    let storage = FileStorage::open(dir.path()).unwrap();
    let manager = manager_on(storage.clone(), "pool");

    let server = manager
        .get("k1", GetOpts::default().with_state(obj(json!({"counter": 7}))))
        .await
        .unwrap();
    for n in 0..3 {
        server
            .call(Signal::new("note", json!({"payload": {"n": n}})), CALL_TIMEOUT)
            .await
            .unwrap();
    }
    let before = thread_of(&server.state().state);
    assert_eq!(before.rev, 3);

    // hibernate + kill, then thaw
    manager.stop("k1").await.unwrap();
    let server = manager.get("k1", GetOpts::default()).await.unwrap();

    let state = server.state();
    assert_eq!(state.state.get("counter"), Some(&json!(7)));
    let after = thread_of(&state.state);
    assert_eq!(after.id, before.id);
    assert_eq!(after.rev, 3);
    assert_eq!(after.entries, before.entries);

    // a second hibernate appends zero new entries
    manager.stop("k1").await.unwrap();
    let stored = storage.get_thread(&before.id).await.unwrap();
    assert_eq!(stored.rev, 3);
    assert_eq!(stored.entries.len(), 3);
}

#[tokio::test]
async fn consecutive_hibernates_are_byte_equivalent() {
    let dir = tempfile::tempdir().unwrap();
    let storage = FileStorage::open(dir.path()).unwrap();
    let manager = manager_on(storage.clone(), "pool");

    let server = manager
        .get("k2", GetOpts::default().with_state(obj(json!({"counter": 1}))))
        .await
        .unwrap();
    server.call(Signal::new("note", json!({"payload": {}})), CALL_TIMEOUT).await.unwrap();
    manager.stop("k2").await.unwrap();

    let key = manager.key_for("k2");
    let first = storage.get_checkpoint(&key).await.unwrap();

    // thaw then hibernate with no mutations
    let _server = manager.get("k2", GetOpts::default()).await.unwrap();
    manager.stop("k2").await.unwrap();
    let second = storage.get_checkpoint(&key).await.unwrap();

    assert_eq!(
        serde_json::to_vec(&first).unwrap(),
        serde_json::to_vec(&second).unwrap()
    );
}

#[tokio::test]
async fn two_managers_on_one_store_do_not_alias() {
    let dir = tempfile::tempdir().unwrap();
    let storage = FileStorage::open(dir.path()).unwrap();
    let m1 = manager_on(storage.clone(), "m1");
    let m2 = manager_on(storage.clone(), "m2");

    let s1 = m1
        .get("k", GetOpts::default().with_state(obj(json!({"owner": "m1"}))))
        .await
        .unwrap();
    let s2 = m2
        .get("k", GetOpts::default().with_state(obj(json!({"owner": "m2"}))))
        .await
        .unwrap();
    s1.call(Signal::new("append", json!({"msg": "from-m1"})), CALL_TIMEOUT).await.unwrap();
    s2.call(Signal::new("append", json!({"msg": "from-m2"})), CALL_TIMEOUT).await.unwrap();

    m1.stop("k").await.unwrap();
    m2.stop("k").await.unwrap();

    let c1 = storage.get_checkpoint(&m1.key_for("k")).await.unwrap();
    let c2 = storage.get_checkpoint(&m2.key_for("k")).await.unwrap();
    assert_eq!(c1.state.get("owner"), Some(&json!("m1")));
    assert_eq!(c2.state.get("owner"), Some(&json!("m2")));
    assert_eq!(c1.state.get("log"), Some(&json!(["from-m1"])));
    assert_eq!(c2.state.get("log"), Some(&json!(["from-m2"])));
}

#[tokio::test]
async fn thaw_survives_a_process_restart_shape() {
    // reopen the storage root as a fresh adapter, as a restarted process
    // would, and thaw from it
    let dir = tempfile::tempdir().unwrap();
    {
        let storage = FileStorage::open(dir.path()).unwrap();
        let manager = manager_on(storage, "pool");
        let server = manager
            .get("k3", GetOpts::default().with_state(obj(json!({"counter": 42}))))
            .await
            .unwrap();
        server
            .call(Signal::new("note", json!({"payload": {"boot": 1}})), CALL_TIMEOUT)
            .await
            .unwrap();
        manager.stop("k3").await.unwrap();
    }

    let storage = FileStorage::open(dir.path()).unwrap();
    let manager = manager_on(storage, "pool");
    let server = manager.get("k3", GetOpts::default()).await.unwrap();
    let state = server.state();
    assert_eq!(state.state.get("counter"), Some(&json!(42)));
    assert_eq!(thread_of(&state.state).rev, 1);
}
