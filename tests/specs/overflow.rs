// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Backpressure specs: the pending queue bound rejects loudly.

use crate::prelude::*;
use jido_core::{Settings, Signal};
use serde_json::json;

#[tokio::test]
async fn fourth_rapid_cast_overflows_and_first_three_complete_in_order() {
    let (dispatch, recorder) = recording_dispatch();
    let settings = Settings { max_queue_size: 3, ..recorded_settings() };
    let server = spec_server("overflow-agent", settings, dispatch);

    // single-threaded test runtime: the server cannot drain between
    // these four sends, so the bound is hit deterministically
    let mut results = Vec::new();
    for n in 0..4 {
        results.push(server.cast(Signal::new("append", json!({"msg": n}))));
    }

    assert!(results[0].is_ok());
    assert!(results[1].is_ok());
    assert!(results[2].is_ok());
    let err = results[3].as_ref().map(|_| ()).unwrap_err();
    assert!(
        matches!(
            err,
            jido_engine::ServerError::Core(jido_core::Error::QueueOverflow)
        ),
        "expected queue_overflow, got {err:?}"
    );

    // the rejection is never silent
    wait_until(|| !recorder.of_type(signal_types::EVENT_QUEUE_OVERFLOW).is_empty()).await;
    let overflow = recorder.of_type(signal_types::EVENT_QUEUE_OVERFLOW);
    assert_eq!(overflow[0].data["rejected_type"], "append");
    assert_eq!(overflow[0].data["max_queue_size"], 3);

    // the admitted three complete, in order
    wait_until(|| {
        server.state().state.get("log").and_then(|v| v.as_array()).map(Vec::len) == Some(3)
    })
    .await;
    assert_eq!(server.state().state.get("log"), Some(&json!([0, 1, 2])));
}

#[tokio::test]
async fn queue_drains_and_accepts_again_after_overflow() {
    let (dispatch, _recorder) = recording_dispatch();
    let settings = Settings { max_queue_size: 2, ..recorded_settings() };
    let server = spec_server("refill-agent", settings, dispatch);

    server.cast(Signal::new("append", json!({"msg": "a"}))).unwrap();
    server.cast(Signal::new("append", json!({"msg": "b"}))).unwrap();
    assert!(server.cast(Signal::new("append", json!({"msg": "c"}))).is_err());

    wait_until(|| server.queue_len() == 0).await;
    server.cast(Signal::new("append", json!({"msg": "d"}))).unwrap();
    wait_until(|| {
        server.state().state.get("log").and_then(|v| v.as_array()).map(Vec::len) == Some(3)
    })
    .await;
    assert_eq!(server.state().state.get("log"), Some(&json!(["a", "b", "d"])));
}
