// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Built-in actions backing the default `jido.agent.cmd.*` routes.
//!
//! Registered on every server before the strategy initializes. The
//! server injects `queue_size` and the registered action names into the
//! context meta for the actions that need them.

use async_trait::async_trait;
use jido_core::{
    Action, ActionContext, ActionOutput, Directive, Error, Instruction, StateOp, StopReason,
};
use serde_json::{json, Map, Value};
use std::sync::Arc;

/// Names the default routes resolve to.
pub const STATE_ACTION: &str = "jido.core.state";
pub const QUEUE_SIZE_ACTION: &str = "jido.core.queuesize";
pub const SET_ACTION: &str = "jido.core.set";
pub const VALIDATE_ACTION: &str = "jido.core.validate";
pub const PLAN_ACTION: &str = "jido.core.plan";
pub const STOP_ACTION: &str = "jido.core.stop";

/// Context meta key carrying the pending-queue length.
pub const META_QUEUE_SIZE: &str = "queue_size";
/// Context meta key carrying the registered action names.
pub const META_ACTIONS: &str = "actions";

/// Every built-in, ready to register on a fresh agent.
pub fn builtin_actions() -> Vec<Arc<dyn Action>> {
    vec![
        Arc::new(StateAction),
        Arc::new(QueueSizeAction),
        Arc::new(SetAction),
        Arc::new(ValidateAction),
        Arc::new(PlanAction),
        Arc::new(StopAction),
    ]
}

/// Returns the current agent state map.
pub struct StateAction;

#[async_trait]
impl Action for StateAction {
    fn name(&self) -> &str {
        STATE_ACTION
    }

    async fn run(
        &self,
        _params: &Map<String, Value>,
        ctx: &ActionContext,
    ) -> Result<ActionOutput, Error> {
        Ok(ActionOutput::value(Value::Object(ctx.state.clone())))
    }
}

/// Returns `{size}` for the pending instruction queue.
pub struct QueueSizeAction;

#[async_trait]
impl Action for QueueSizeAction {
    fn name(&self) -> &str {
        QUEUE_SIZE_ACTION
    }

    async fn run(
        &self,
        _params: &Map<String, Value>,
        ctx: &ActionContext,
    ) -> Result<ActionOutput, Error> {
        let size = ctx.meta.get(META_QUEUE_SIZE).cloned().unwrap_or(json!(0));
        Ok(ActionOutput::value(json!({ "size": size })))
    }
}

/// Writes each `{key: value}` of its params into the state map.
pub struct SetAction;

#[async_trait]
impl Action for SetAction {
    fn name(&self) -> &str {
        SET_ACTION
    }

    async fn run(
        &self,
        params: &Map<String, Value>,
        _ctx: &ActionContext,
    ) -> Result<ActionOutput, Error> {
        let directives: Vec<Directive> = params
            .iter()
            .map(|(key, value)| Directive::StateModify {
                op: StateOp::Set,
                path: vec![key.clone()],
                value: value.clone(),
            })
            .collect();
        Ok(ActionOutput::with_directives(json!({"set": params.len()}), directives))
    }
}

/// Checks that `params.instruction` parses and names a registered action.
pub struct ValidateAction;

#[async_trait]
impl Action for ValidateAction {
    fn name(&self) -> &str {
        VALIDATE_ACTION
    }

    async fn run(
        &self,
        params: &Map<String, Value>,
        ctx: &ActionContext,
    ) -> Result<ActionOutput, Error> {
        let value = params
            .get("instruction")
            .ok_or_else(|| Error::validation("validate requires an instruction"))?;
        let instruction = Instruction::from_value(value)
            .ok_or_else(|| Error::validation_with("malformed instruction", value.clone()))?;

        let registered = ctx
            .meta
            .get(META_ACTIONS)
            .and_then(Value::as_array)
            .map(|names| names.iter().any(|n| n.as_str() == Some(instruction.action.as_str())))
            .unwrap_or(false);
        if !registered {
            return Err(Error::validation(format!(
                "action not registered: {}",
                instruction.action
            )));
        }
        Ok(ActionOutput::value(json!({"valid": true, "action": instruction.action})))
    }
}

/// Enqueues `params.instructions` (or a single `params.instruction`) onto
/// the agent's pending queue.
pub struct PlanAction;

#[async_trait]
impl Action for PlanAction {
    fn name(&self) -> &str {
        PLAN_ACTION
    }

    async fn run(
        &self,
        params: &Map<String, Value>,
        _ctx: &ActionContext,
    ) -> Result<ActionOutput, Error> {
        let instructions = parse_instructions(params)?;
        if instructions.is_empty() {
            return Err(Error::validation("plan requires at least one instruction"));
        }
        let planned = instructions.len();
        let directives =
            instructions.into_iter().map(|instruction| Directive::Enqueue { instruction }).collect();
        Ok(ActionOutput::with_directives(json!({"planned": planned}), directives))
    }
}

/// Sets the agent's terminal status by returning a `Stop` directive; the
/// default handler for `jido.agent.stop` (used by `StopChild`).
pub struct StopAction;

#[async_trait]
impl Action for StopAction {
    fn name(&self) -> &str {
        STOP_ACTION
    }

    async fn run(
        &self,
        params: &Map<String, Value>,
        _ctx: &ActionContext,
    ) -> Result<ActionOutput, Error> {
        let reason = params
            .get("reason")
            .and_then(Value::as_str)
            .unwrap_or("stop signal")
            .to_string();
        Ok(ActionOutput::with_directives(
            Value::Null,
            vec![Directive::Stop { reason: StopReason::Requested(reason) }],
        ))
    }
}

/// Parse `{instructions: [...]}` or `{instruction: ...}` params.
pub(crate) fn parse_instructions(params: &Map<String, Value>) -> Result<Vec<Instruction>, Error> {
    if let Some(list) = params.get("instructions").and_then(Value::as_array) {
        return list
            .iter()
            .map(|v| {
                Instruction::from_value(v)
                    .ok_or_else(|| Error::validation_with("malformed instruction", v.clone()))
            })
            .collect();
    }
    if let Some(value) = params.get("instruction") {
        let instruction = Instruction::from_value(value)
            .ok_or_else(|| Error::validation_with("malformed instruction", value.clone()))?;
        return Ok(vec![instruction]);
    }
    Ok(Vec::new())
}

#[cfg(test)]
#[path = "actions_tests.rs"]
mod tests;
