// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Synchronous call specs: reply correlation, FIFO casts, timeout
//! diagnostics.

use crate::prelude::*;
use jido_core::Signal;
use serde_json::json;
use std::time::Duration;

#[tokio::test]
async fn echo_call_round_trip() {
    let (dispatch, recorder) = recording_dispatch();
    let server = spec_server("echo-agent", recorded_settings(), dispatch);

    let result = server
        .call(
            Signal::new("echo.hello", json!({"msg": "hi"})).with_id("s1"),
            CALL_TIMEOUT,
        )
        .await
        .unwrap();
    assert_eq!(result, json!({"echo": "hi"}));

    // the reply is mirrored as an out signal reusing the caller's id
    wait_until(|| !recorder.of_type(signal_types::OUT_INSTRUCTION_RESULT).is_empty()).await;
    let out = recorder.of_type(signal_types::OUT_INSTRUCTION_RESULT);
    assert_eq!(out[0].id, "s1");
    assert_eq!(out[0].data["result"], json!({"echo": "hi"}));
}

#[tokio::test]
async fn casts_from_one_producer_process_in_fifo_order() {
    let (dispatch, _recorder) = recording_dispatch();
    let server = spec_server("fifo-agent", recorded_settings(), dispatch);

    for n in 0..10 {
        server.cast(Signal::new("append", json!({"msg": n}))).unwrap();
    }

    wait_until(|| {
        server.state().state.get("log").and_then(|v| v.as_array()).map(Vec::len) == Some(10)
    })
    .await;
    let log = server.state().state.get("log").cloned().unwrap_or_default();
    assert_eq!(log, json!([0, 1, 2, 3, 4, 5, 6, 7, 8, 9]));
}

#[tokio::test]
async fn timed_out_call_carries_a_diagnostic_and_leaves_the_server_working() {
    let (dispatch, _recorder) = recording_dispatch();
    let server = spec_server("slow-agent", recorded_settings(), dispatch);

    let err = server
        .call(
            Signal::new("slow", json!({"delay_ms": 500})),
            Duration::from_millis(100),
        )
        .await
        .unwrap_err();

    let jido_engine::ServerError::Core(jido_core::Error::Timeout(diag)) = err else {
        panic!("expected timeout, got {err:?}");
    };
    assert!(diag.elapsed_ms >= 100);
    assert!(matches!(diag.server_status.as_str(), "idle" | "processing"));

    // the action still completes; a later state call reflects its effect
    wait_until(|| server.state().state.get("slow_done") == Some(&json!(true))).await;
    let state = server
        .call(Signal::new(signal_types::CMD_STATE, json!({})), CALL_TIMEOUT)
        .await
        .unwrap();
    assert_eq!(state["slow_done"], json!(true));
}

#[tokio::test]
async fn call_on_an_unrouted_type_returns_an_error_not_a_panic() {
    let (dispatch, _recorder) = recording_dispatch();
    let server = spec_server("routing-agent", recorded_settings(), dispatch);

    let err = server
        .call(Signal::new("nobody.home", json!({})), CALL_TIMEOUT)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("no route"));
}
