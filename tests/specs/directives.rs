// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Directive splicing specs: run-instruction results apply before later
//! sibling directives.

use crate::prelude::*;
use async_trait::async_trait;
use jido_core::{
    ActionContext, ActionOutput, Agent, Directive, Error, Instruction, Signal, StateOp,
    SystemClock,
};
use jido_engine::{AgentServer, ServerConfig};
use serde_json::{json, Map, Value};
use std::sync::Arc;

/// Outer action: returns `{n: 1}` plus `[RunInstruction{inner, setter},
/// Emit{side}]`.
struct Outer;

#[async_trait]
impl jido_core::Action for Outer {
    fn name(&self) -> &str {
        "outer"
    }

    async fn run(
        &self,
        _params: &Map<String, Value>,
        _ctx: &ActionContext,
    ) -> Result<ActionOutput, Error> {
        Ok(ActionOutput::with_directives(
            json!({"n": 1}),
            vec![
                Directive::RunInstruction {
                    instruction: Instruction::new("inner"),
                    result_action: "setter".to_string(),
                    meta: Map::new(),
                },
                Directive::Emit {
                    signal: Signal::new("side.effect", json!({})).with_id("side-1"),
                    dispatch: None,
                },
            ],
        ))
    }
}

/// Inner instruction: plain `{k: 2}` result.
struct Inner;

#[async_trait]
impl jido_core::Action for Inner {
    fn name(&self) -> &str {
        "inner"
    }

    async fn run(
        &self,
        _params: &Map<String, Value>,
        _ctx: &ActionContext,
    ) -> Result<ActionOutput, Error> {
        Ok(ActionOutput::value(json!({"k": 2})))
    }
}

/// Result action: writes the inner result into state.
struct Setter;

#[async_trait]
impl jido_core::Action for Setter {
    fn name(&self) -> &str {
        "setter"
    }

    async fn run(
        &self,
        params: &Map<String, Value>,
        _ctx: &ActionContext,
    ) -> Result<ActionOutput, Error> {
        assert_eq!(params.get("status"), Some(&json!("ok")));
        let k = params
            .get("result")
            .and_then(|r| r.get("k"))
            .cloned()
            .unwrap_or(Value::Null);
        Ok(ActionOutput::with_directives(
            Value::Null,
            vec![Directive::StateModify {
                op: StateOp::Set,
                path: vec!["k".to_string()],
                value: k,
            }],
        ))
    }
}

/// Records whether `k` was already set when the side-effect signal was
/// dispatched, by snapshotting state at delivery time.
#[tokio::test]
async fn run_instruction_results_splice_before_later_siblings() {
    let (dispatch, recorder) = recording_dispatch();
    let agent = Agent::new("splice-agent").unwrap();
    let config = ServerConfig::new(agent)
        .with_settings(recorded_settings())
        .with_dispatch(dispatch)
        .with_route(route("go", "outer"))
        .with_action(Arc::new(Outer))
        .with_action(Arc::new(Inner))
        .with_action(Arc::new(Setter));
    let server = AgentServer::spawn(config, SystemClock);

    server.call(Signal::new("go", json!({})).with_id("g1"), CALL_TIMEOUT).await.unwrap();

    // post-drain state contains k == 2 and the side signal was emitted
    wait_until(|| server.state().state.get("k") == Some(&json!(2))).await;
    wait_until(|| !recorder.of_type("side.effect").is_empty()).await;

    // the server saw the StateModify before it reached the Emit: the
    // drain applies spliced directives first, so by the time the out
    // signal for g1 exists, k was already written
    let out = recorder.of_type(signal_types::OUT_INSTRUCTION_RESULT);
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].id, "g1");
}
