// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! FSM strategy batch specs: one transition out, N chained instructions,
//! one transition back.

use crate::prelude::*;
use jido_core::Signal;
use serde_json::json;

fn strategy_transitions(
    recorder: &jido_adapters::RecordingAdapter,
) -> Vec<(String, String)> {
    recorder
        .of_type(signal_types::EVENT_TRANSITION_SUCCEEDED)
        .into_iter()
        .filter(|s| s.data["scope"] == "strategy")
        .map(|s| {
            (
                s.data["from"].as_str().unwrap_or_default().to_string(),
                s.data["to"].as_str().unwrap_or_default().to_string(),
            )
        })
        .collect()
}

#[tokio::test]
async fn batch_of_three_runs_in_order_with_one_transition_each_way() {
    let (dispatch, recorder) = recording_dispatch();
    let server = spec_server("fsm-agent", recorded_settings(), dispatch);

    let result = server
        .call(
            Signal::new(
                signal_types::CMD_CMD,
                json!({"instructions": [
                    {"action": "append", "params": {"msg": 1}},
                    {"action": "append", "params": {"msg": 2}},
                    {"action": "append", "params": {"msg": 3}},
                ]}),
            ),
            CALL_TIMEOUT,
        )
        .await
        .unwrap();
    // the reply carries the last instruction's result
    assert_eq!(result, json!({"appended": 3}));

    // three instructions completed in order
    assert_eq!(server.state().state.get("log"), Some(&json!([1, 2, 3])));

    // exactly one idle -> processing and one processing -> idle event
    wait_until(|| strategy_transitions(&recorder).len() >= 2).await;
    let transitions = strategy_transitions(&recorder);
    assert_eq!(
        transitions,
        vec![
            ("idle".to_string(), "processing".to_string()),
            ("processing".to_string(), "idle".to_string()),
        ]
    );

    // the strategy recorded the batch
    let snapshot = server.snapshot().await.unwrap();
    assert_eq!(snapshot.status, "idle");
    assert!(snapshot.done);
    assert_eq!(snapshot.details.get("processed_count"), Some(&json!(3)));
    assert_eq!(snapshot.result, Some(json!({"appended": 3})));
}

#[tokio::test]
async fn sequential_batches_reuse_the_machine() {
    let (dispatch, recorder) = recording_dispatch();
    let server = spec_server("fsm-again", recorded_settings(), dispatch);

    for n in 0..2 {
        server
            .call(
                Signal::new(
                    signal_types::CMD_CMD,
                    json!({"instructions": [{"action": "append", "params": {"msg": n}}]}),
                ),
                CALL_TIMEOUT,
            )
            .await
            .unwrap();
    }

    assert_eq!(server.state().state.get("log"), Some(&json!([0, 1])));
    wait_until(|| strategy_transitions(&recorder).len() >= 4).await;
    let snapshot = server.snapshot().await.unwrap();
    assert_eq!(snapshot.details.get("processed_count"), Some(&json!(2)));
}
