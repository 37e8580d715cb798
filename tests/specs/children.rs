// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Parent/child lifecycle specs: spawn under a tag, observe the child,
//! stop it gracefully.

use crate::prelude::*;
use async_trait::async_trait;
use jido_core::{
    ActionContext, ActionOutput, Agent, ChildSpec, Directive, Error, Signal, SystemClock,
};
use jido_engine::{AgentServer, ServerConfig};
use serde_json::{json, Map, Value};
use std::sync::Arc;

/// Spawns a child that carries the spec-suite append action.
struct Supervisor;

#[async_trait]
impl jido_core::Action for Supervisor {
    fn name(&self) -> &str {
        "supervise"
    }

    async fn run(
        &self,
        params: &Map<String, Value>,
        _ctx: &ActionContext,
    ) -> Result<ActionOutput, Error> {
        let tag = params.get("tag").and_then(Value::as_str).unwrap_or("worker").to_string();
        let directive = match params.get("op").and_then(Value::as_str) {
            Some("stop") => Directive::StopChild { tag, reason: Some("done".to_string()) },
            _ => Directive::SpawnAgent {
                spec: ChildSpec::new()
                    .with_route("append", "append", 0)
                    .with_action(Arc::new(AppendAction)),
                tag,
                meta: Map::new(),
            },
        };
        Ok(ActionOutput::with_directives(Value::Null, vec![directive]))
    }
}

fn parent(dispatch: Arc<jido_adapters::DispatchRegistry>) -> jido_engine::AgentHandle {
    let agent = Agent::new("parent").unwrap();
    let config = ServerConfig::new(agent)
        .with_settings(recorded_settings())
        .with_dispatch(dispatch)
        .with_route(route("supervise", "supervise"))
        .with_action(Arc::new(Supervisor));
    AgentServer::spawn(config, SystemClock)
}

#[tokio::test]
async fn spawned_child_is_registered_then_removed_on_stop() {
    let (dispatch, recorder) = recording_dispatch();
    let server = parent(dispatch);

    server
        .call(Signal::new("supervise", json!({"tag": "worker"})), CALL_TIMEOUT)
        .await
        .unwrap();
    wait_until(|| !recorder.of_type(signal_types::EVENT_PROCESS_STARTED).is_empty()).await;
    let started = recorder.of_type(signal_types::EVENT_PROCESS_STARTED);
    assert_eq!(started[0].data["tag"], "worker");

    server
        .call(
            Signal::new("supervise", json!({"tag": "worker", "op": "stop"})),
            CALL_TIMEOUT,
        )
        .await
        .unwrap();

    // graceful stop: the child handles jido.agent.stop itself, exits,
    // and the parent observes termination
    wait_until(|| !recorder.of_type(signal_types::EVENT_PROCESS_TERMINATED).is_empty()).await;
    let terminated = recorder.of_type(signal_types::EVENT_PROCESS_TERMINATED);
    assert_eq!(terminated[0].data["tag"], "worker");
    assert_eq!(terminated[0].data["agent_id"], "parent/worker");
}

#[tokio::test]
async fn stopping_an_unknown_tag_is_ok() {
    let (dispatch, _recorder) = recording_dispatch();
    let server = parent(dispatch);

    let result = server
        .call(
            Signal::new("supervise", json!({"tag": "ghost", "op": "stop"})),
            CALL_TIMEOUT,
        )
        .await;
    assert!(result.is_ok());
}

#[tokio::test]
async fn parent_shutdown_stops_children() {
    let (dispatch, recorder) = recording_dispatch();
    let server = parent(dispatch);

    server
        .call(Signal::new("supervise", json!({"tag": "worker"})), CALL_TIMEOUT)
        .await
        .unwrap();
    wait_until(|| !recorder.of_type(signal_types::EVENT_PROCESS_STARTED).is_empty()).await;

    server.cast(Signal::new(signal_types::AGENT_STOP, json!({}))).unwrap();
    server.closed().await;

    // the child received the stop signal and wound down on its own
    wait_until(|| {
        recorder
            .of_type(signal_types::EVENT_STOPPED)
            .iter()
            .any(|s| s.data["agent_id"] == "parent/worker")
    })
    .await;
}
