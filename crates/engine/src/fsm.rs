// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The default finite-state-machine strategy.
//!
//! Holds a state name and a `transitions: name -> [name]` map in its
//! slice. A batch parks all but the first instruction in the slice queue
//! and dispatches one instruction at a time through `RunInstruction`,
//! routing each outcome back through a private result action. When the
//! batch runs dry the machine transitions back to its initial state.

use jido_core::signal_types;
use jido_core::{
    Action, ActionContext, ActionOutput, Agent, Directive, Error, ExecutionError, Instruction,
    Signal, StateOp, Strategy, StrategyCtx, StrategySnapshot, STRATEGY_KEY,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::sync::Arc;

/// Registry name of the FSM's private instruction-result marker.
pub const FSM_RESULT_ACTION: &str = "jido.strategy.fsm.result";

/// Shared FSM configuration (strategy and its result action see the same
/// transition table).
#[derive(Debug)]
struct FsmConfig {
    initial_state: String,
    busy_state: String,
    transitions: HashMap<String, Vec<String>>,
}

impl FsmConfig {
    fn allows(&self, from: &str, to: &str) -> bool {
        self.transitions.get(from).is_some_and(|targets| targets.iter().any(|t| t == to))
    }
}

/// The strategy's state slice at `state.__strategy__`.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct FsmSlice {
    state: String,
    /// Instructions waiting behind the in-flight one.
    #[serde(default)]
    queue: Vec<Instruction>,
    /// True while an instruction chain is running.
    #[serde(default)]
    inflight: bool,
    #[serde(default)]
    processed_count: u64,
    #[serde(default)]
    last_result: Value,
    #[serde(default)]
    last_error: Value,
}

impl FsmSlice {
    fn initial(state: &str) -> Self {
        Self {
            state: state.to_string(),
            queue: Vec::new(),
            inflight: false,
            processed_count: 0,
            last_result: Value::Null,
            last_error: Value::Null,
        }
    }
}

fn read_slice(state: Option<&Value>, initial: &str) -> FsmSlice {
    state
        .and_then(|v| serde_json::from_value(v.clone()).ok())
        .unwrap_or_else(|| FsmSlice::initial(initial))
}

fn slice_value(slice: &FsmSlice) -> Value {
    serde_json::to_value(slice).unwrap_or(Value::Null)
}

fn transition_signal(ty: &str, from: &str, to: &str) -> Directive {
    Directive::Emit {
        signal: Signal::new(ty, json!({"from": from, "to": to, "scope": "strategy"})),
        dispatch: None,
    }
}

/// FSM strategy over named states.
#[derive(Clone)]
pub struct FsmStrategy {
    config: Arc<FsmConfig>,
}

impl FsmStrategy {
    /// A machine with explicit states. `busy_state` is where the machine
    /// sits while a batch runs; it must be reachable from
    /// `initial_state` in `transitions`.
    pub fn new(
        initial_state: impl Into<String>,
        busy_state: impl Into<String>,
        transitions: HashMap<String, Vec<String>>,
    ) -> Self {
        Self {
            config: Arc::new(FsmConfig {
                initial_state: initial_state.into(),
                busy_state: busy_state.into(),
                transitions,
            }),
        }
    }

    /// The canonical two-state machine: `idle ⇄ processing`.
    pub fn idle_processing() -> Self {
        let transitions = HashMap::from([
            ("idle".to_string(), vec!["processing".to_string()]),
            ("processing".to_string(), vec!["idle".to_string()]),
        ]);
        Self::new("idle", "processing", transitions)
    }

    /// The private result action paired with this strategy.
    fn result_action(&self) -> Arc<dyn Action> {
        Arc::new(FsmResultAction { config: Arc::clone(&self.config) })
    }
}

impl Default for FsmStrategy {
    fn default() -> Self {
        Self::idle_processing()
    }
}

impl Strategy for FsmStrategy {
    fn init(&self, agent: &mut Agent, _ctx: &StrategyCtx) -> Vec<Directive> {
        if agent.strategy_slice().is_none() {
            agent.set_strategy_slice(slice_value(&FsmSlice::initial(&self.config.initial_state)));
        }
        vec![Directive::RegisterAction { action: self.result_action() }]
    }

    fn cmd(
        &self,
        agent: &mut Agent,
        batch: Vec<Instruction>,
        _ctx: &StrategyCtx,
    ) -> Vec<Directive> {
        if batch.is_empty() {
            return Vec::new();
        }
        let mut slice = read_slice(agent.strategy_slice(), &self.config.initial_state);

        if slice.inflight {
            // a chain is running; the result action picks these up
            slice.queue.extend(batch);
            agent.set_strategy_slice(slice_value(&slice));
            return Vec::new();
        }

        let from = slice.state.clone();
        let to = self.config.busy_state.clone();
        if !self.config.allows(&from, &to) {
            return vec![
                transition_signal(signal_types::EVENT_TRANSITION_FAILED, &from, &to),
                Directive::Error {
                    error: ExecutionError::new(format!("invalid transition {} -> {}", from, to)),
                    context: Map::new(),
                },
            ];
        }

        let mut batch = batch;
        let first = batch.remove(0);
        slice.state = to.clone();
        slice.inflight = true;
        slice.queue.extend(batch);
        agent.set_strategy_slice(slice_value(&slice));

        vec![
            transition_signal(signal_types::EVENT_TRANSITION_SUCCEEDED, &from, &to),
            Directive::RunInstruction {
                instruction: first,
                result_action: FSM_RESULT_ACTION.to_string(),
                meta: Map::new(),
            },
        ]
    }

    fn snapshot(&self, agent: &Agent, _ctx: &StrategyCtx) -> StrategySnapshot {
        let slice = read_slice(agent.strategy_slice(), &self.config.initial_state);
        let mut details = Map::new();
        details.insert("processed_count".to_string(), json!(slice.processed_count));
        details.insert("queued".to_string(), json!(slice.queue.len()));
        StrategySnapshot {
            status: slice.state,
            done: !slice.inflight && slice.queue.is_empty(),
            result: (!slice.last_result.is_null()).then(|| slice.last_result.clone()),
            details,
        }
    }
}

/// Applies one instruction outcome to the slice, then dispatches the next
/// queued instruction or winds the machine back to its initial state.
struct FsmResultAction {
    config: Arc<FsmConfig>,
}

#[async_trait]
impl Action for FsmResultAction {
    fn name(&self) -> &str {
        FSM_RESULT_ACTION
    }

    async fn run(
        &self,
        params: &Map<String, Value>,
        ctx: &ActionContext,
    ) -> Result<ActionOutput, Error> {
        let mut slice =
            read_slice(ctx.state.get(STRATEGY_KEY), &self.config.initial_state);

        slice.processed_count += 1;
        let ok = params.get("status").and_then(Value::as_str) == Some("ok");
        if ok {
            slice.last_result = params.get("result").cloned().unwrap_or(Value::Null);
        } else {
            slice.last_error = params.get("reason").cloned().unwrap_or(Value::Null);
        }

        let mut directives = Vec::new();
        if slice.queue.is_empty() {
            let from = slice.state.clone();
            let to = self.config.initial_state.clone();
            slice.state = to.clone();
            slice.inflight = false;
            directives.push(write_slice(&slice));
            directives.push(transition_signal(signal_types::EVENT_TRANSITION_SUCCEEDED, &from, &to));
        } else {
            let next = slice.queue.remove(0);
            directives.push(write_slice(&slice));
            directives.push(Directive::RunInstruction {
                instruction: next,
                result_action: FSM_RESULT_ACTION.to_string(),
                meta: Map::new(),
            });
        }
        Ok(ActionOutput::with_directives(Value::Null, directives))
    }
}

fn write_slice(slice: &FsmSlice) -> Directive {
    Directive::StateModify {
        op: StateOp::Set,
        path: vec![STRATEGY_KEY.to_string()],
        value: slice_value(slice),
    }
}

#[cfg(test)]
#[path = "fsm_tests.rs"]
mod tests;
