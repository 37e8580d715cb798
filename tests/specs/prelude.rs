// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared helpers for the spec suite.

use async_trait::async_trait;
use jido_adapters::{DispatchRegistry, RecordingAdapter};
use jido_core::{
    ActionContext, ActionOutput, Agent, DispatchConfig, Error, Route, Settings, SystemClock,
    Thread, ThreadEntry, THREAD_KEY,
};
use jido_engine::{AgentHandle, AgentServer, ServerConfig};
use serde_json::{json, Map, Value};
use std::sync::Arc;
use std::time::Duration;

pub const CALL_TIMEOUT: Duration = Duration::from_secs(2);

pub fn obj(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        other => panic!("expected object, got {other:?}"),
    }
}

/// Dispatch registry with a recording adapter wired in.
pub fn recording_dispatch() -> (Arc<DispatchRegistry>, RecordingAdapter) {
    let recorder = RecordingAdapter::new();
    let mut registry = DispatchRegistry::standard();
    registry.register(Arc::new(recorder.clone()));
    (Arc::new(registry), recorder)
}

/// Settings routing every emitted signal to the recording adapter.
pub fn recorded_settings() -> Settings {
    Settings {
        default_dispatch: Some(vec![DispatchConfig::new("record")]),
        ..Settings::default()
    }
}

/// Poll until `cond` holds (2s bound).
pub async fn wait_until(mut cond: impl FnMut() -> bool) {
    for _ in 0..400 {
        if cond() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition not met within 2s");
}

/// `EchoAction.run(%{msg: m}, _) -> {ok, %{echo: m}}`
pub struct EchoAction;

#[async_trait]
impl jido_core::Action for EchoAction {
    fn name(&self) -> &str {
        "echo"
    }

    async fn run(
        &self,
        params: &Map<String, Value>,
        _ctx: &ActionContext,
    ) -> Result<ActionOutput, Error> {
        Ok(ActionOutput::value(json!({"echo": params.get("msg").cloned()})))
    }
}

/// Appends its `msg` param to the `log` list in agent state, recording
/// execution order.
pub struct AppendAction;

#[async_trait]
impl jido_core::Action for AppendAction {
    fn name(&self) -> &str {
        "append"
    }

    async fn run(
        &self,
        params: &Map<String, Value>,
        ctx: &ActionContext,
    ) -> Result<ActionOutput, Error> {
        let mut log = ctx
            .state
            .get("log")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        log.push(params.get("msg").cloned().unwrap_or(Value::Null));
        Ok(ActionOutput::with_directives(
            json!({"appended": log.len()}),
            vec![jido_core::Directive::StateModify {
                op: jido_core::StateOp::Set,
                path: vec!["log".to_string()],
                value: Value::Array(log),
            }],
        ))
    }
}

/// Sleeps for `delay_ms`, then writes `slow_done` into state.
pub struct SlowAction;

#[async_trait]
impl jido_core::Action for SlowAction {
    fn name(&self) -> &str {
        "slow"
    }

    async fn run(
        &self,
        params: &Map<String, Value>,
        _ctx: &ActionContext,
    ) -> Result<ActionOutput, Error> {
        let delay = params.get("delay_ms").and_then(Value::as_u64).unwrap_or(500);
        tokio::time::sleep(Duration::from_millis(delay)).await;
        Ok(ActionOutput::with_directives(
            json!({"slept_ms": delay}),
            vec![jido_core::Directive::StateModify {
                op: jido_core::StateOp::Set,
                path: vec!["slow_done".to_string()],
                value: json!(true),
            }],
        ))
    }
}

/// Appends a journal entry to the agent's thread slice.
pub struct NoteAction;

#[async_trait]
impl jido_core::Action for NoteAction {
    fn name(&self) -> &str {
        "note"
    }

    async fn run(
        &self,
        params: &Map<String, Value>,
        ctx: &ActionContext,
    ) -> Result<ActionOutput, Error> {
        let mut thread = match ctx.state.get(THREAD_KEY) {
            Some(value) => serde_json::from_value(value.clone())
                .map_err(|e| Error::validation(format!("malformed thread: {e}")))?,
            None => Thread::new(Map::new()),
        };
        let payload = params.get("payload").cloned().unwrap_or(json!({}));
        thread.append(ThreadEntry::note(payload), &SystemClock);
        let rev = thread.rev;
        let value = serde_json::to_value(&thread)
            .map_err(|e| Error::validation(format!("unserializable thread: {e}")))?;
        Ok(ActionOutput::with_directives(
            json!({"rev": rev}),
            vec![jido_core::Directive::StateModify {
                op: jido_core::StateOp::Set,
                path: vec![THREAD_KEY.to_string()],
                value,
            }],
        ))
    }
}

/// A server with the standard spec-suite actions and routes registered.
pub fn spec_server(
    id: &str,
    settings: Settings,
    dispatch: Arc<DispatchRegistry>,
) -> AgentHandle {
    let agent = Agent::new(id).unwrap_or_else(|e| panic!("agent: {e}"));
    let config = ServerConfig::new(agent)
        .with_settings(settings)
        .with_dispatch(dispatch)
        .with_route(route("echo.*", "echo"))
        .with_route(route("append", "append"))
        .with_route(route("slow", "slow"))
        .with_route(route("note", "note"))
        .with_action(Arc::new(EchoAction))
        .with_action(Arc::new(AppendAction))
        .with_action(Arc::new(SlowAction))
        .with_action(Arc::new(NoteAction));
    AgentServer::spawn(config, SystemClock)
}

pub fn route(pattern: &str, action: &str) -> Route {
    Route::agent(pattern, action).unwrap_or_else(|e| panic!("route {pattern}: {e}"))
}

pub use jido_core::signal_types;
