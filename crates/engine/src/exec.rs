// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Directive interpreter.
//!
//! Executes one directive at a time against the server's runtime state
//! (children, timers, dispatch, error policy) plus the live agent.
//! Atomicity is per-directive, not per-batch: a failure mid-drain leaves
//! the directives already applied in place.

use crate::events::{EventRing, ServerEvent};
use crate::server::handle::Msg;
use crate::server::{AgentServer, ServerConfig};
use crate::timers::TimerSet;
use jido_core::signal_types;
use jido_core::{
    state, ActionContext, ActionOutput, Agent, AgentId, ChildSpec, Clock, Directive,
    DispatchConfig, Error, ErrorPolicy, ExecutionError, Instruction, Route, RouteTarget,
    ScheduleMessage, Settings, Signal, StopReason, Strategy,
};
use jido_adapters::DispatchRegistry;
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

/// Control flow out of a single directive execution.
#[derive(Debug)]
pub(crate) enum Step {
    Continue,
    /// Directives to process before the rest of the drain queue.
    Splice(Vec<Directive>),
    Stop(StopReason),
}

/// A monitored child registered under its tag.
pub(crate) struct ChildEntry {
    pub handle: crate::server::AgentHandle,
    pub meta: Map<String, Value>,
}

/// Owns the mutable runtime state directives act on, besides the agent.
pub(crate) struct DirectiveExec<C: Clock> {
    pub(crate) dispatch: Arc<DispatchRegistry>,
    pub(crate) default_dispatch: Option<Vec<DispatchConfig>>,
    pub(crate) error_policy: ErrorPolicy,
    pub(crate) error_count: u32,
    pub(crate) children: HashMap<String, ChildEntry>,
    pub(crate) timers: TimerSet,
    pub(crate) events: EventRing,
    pub(crate) self_tx: mpsc::UnboundedSender<Msg>,
    pub(crate) clock: C,
    /// Settings template for spawned children.
    pub(crate) child_settings: Settings,
    /// Strategy for spawned children without an override.
    pub(crate) child_strategy: Arc<dyn Strategy>,
    /// First execution error recorded while draining one signal; the
    /// server takes it when building the reply.
    signal_error: Option<Error>,
}

impl<C: Clock> DirectiveExec<C> {
    pub(crate) fn new(
        dispatch: Arc<DispatchRegistry>,
        settings: &Settings,
        self_tx: mpsc::UnboundedSender<Msg>,
        clock: C,
        child_strategy: Arc<dyn Strategy>,
    ) -> Self {
        Self {
            dispatch,
            default_dispatch: settings.default_dispatch.clone(),
            error_policy: settings.error_policy.clone(),
            error_count: 0,
            children: HashMap::new(),
            timers: TimerSet::new(),
            events: EventRing::new(settings.debug_max_events),
            self_tx,
            clock,
            child_settings: Settings { idle_timeout_ms: None, ..settings.clone() },
            child_strategy,
            signal_error: None,
        }
    }

    /// Execute a single directive with tracing.
    pub(crate) async fn execute(
        &mut self,
        directive: Directive,
        agent: &mut Agent,
    ) -> Result<Step, Error> {
        let info: String = directive
            .fields()
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join(" ");
        let op = directive.name();
        let verbose = directive.verbose();
        if verbose {
            tracing::debug!(agent_id = %agent.id, "executing directive={} {}", op, info);
        }

        let start = Instant::now();
        let result = self.execute_inner(directive, agent).await;
        let elapsed_ms = start.elapsed().as_millis() as u64;
        match &result {
            Ok(_) if verbose => tracing::debug!(elapsed_ms, "completed"),
            Ok(_) => tracing::trace!(elapsed_ms, "directive={} {}", op, info),
            Err(e) => {
                tracing::error!(error = %e, elapsed_ms, "error directive={} {}", op, info)
            }
        }
        result
    }

    /// Inner execution logic — dispatches each directive to its handler.
    async fn execute_inner(
        &mut self,
        directive: Directive,
        agent: &mut Agent,
    ) -> Result<Step, Error> {
        match directive {
            Directive::Emit { signal, dispatch } => {
                self.emit(signal, dispatch);
                Ok(Step::Continue)
            }
            Directive::Enqueue { instruction } => {
                agent.enqueue(instruction);
                Ok(Step::Continue)
            }
            Directive::RunInstruction { instruction, result_action, meta } => {
                self.run_instruction(agent, instruction, result_action, meta).await
            }
            Directive::Schedule { delay, message } => {
                self.schedule(agent, delay, message);
                Ok(Step::Continue)
            }
            Directive::SpawnAgent { spec, tag, meta } => {
                self.spawn_child(agent, spec, tag, meta);
                Ok(Step::Continue)
            }
            Directive::StopChild { tag, reason } => {
                self.stop_child(&tag, reason);
                Ok(Step::Continue)
            }
            Directive::Stop { reason } => Ok(Step::Stop(reason)),
            Directive::Error { error, context } => {
                let context_value = Value::Object(context.clone());
                tracing::warn!(
                    agent_id = %agent.id,
                    error = %error,
                    context = %context_value,
                    "error directive recorded"
                );
                self.emit(
                    Signal::new(
                        signal_types::ERR_EXECUTION_ERROR,
                        json!({"error": error.clone(), "context": context}),
                    ),
                    None,
                );
                self.note_error(&Error::Execution(error.clone()));
                match self.apply_error_policy(&error) {
                    Some(reason) => Ok(Step::Stop(reason)),
                    None => Ok(Step::Continue),
                }
            }
            Directive::StateModify { op, path, value } => {
                state::modify(&mut agent.state, op, &path, value)?;
                Ok(Step::Continue)
            }
            Directive::RegisterAction { action } => {
                agent.actions.register(action);
                Ok(Step::Continue)
            }
            Directive::DeregisterAction { name } => {
                agent.actions.deregister(&name);
                Ok(Step::Continue)
            }
        }
    }

    /// Record a signal-scoped error (first one wins) for the reply path.
    pub(crate) fn note_error(&mut self, error: &Error) {
        if self.signal_error.is_none() {
            self.signal_error = Some(error.clone());
        }
    }

    pub(crate) fn take_signal_error(&mut self) -> Option<Error> {
        self.signal_error.take()
    }

    /// Apply the configured error policy; `Some` means stop the server.
    pub(crate) fn apply_error_policy(&mut self, error: &ExecutionError) -> Option<StopReason> {
        match self.error_policy {
            ErrorPolicy::LogOnly => None,
            ErrorPolicy::StopOnError => Some(StopReason::AgentError(error.message.clone())),
            ErrorPolicy::MaxErrors(bound) => {
                self.error_count += 1;
                if self.error_count >= bound {
                    Some(StopReason::AgentError(format!(
                        "error bound reached ({}): {}",
                        bound, error.message
                    )))
                } else {
                    None
                }
            }
        }
    }

    /// Publish a signal asynchronously. Resolution order for the target:
    /// directive override, then the signal's own hint, then the server
    /// default, then the logger fallback. Never blocks the server.
    pub(crate) fn emit(&mut self, signal: Signal, dispatch: Option<Vec<DispatchConfig>>) {
        self.events.push(ServerEvent {
            at_ms: self.clock.epoch_ms(),
            ty: signal.ty.clone(),
            summary: signal.log_summary(),
        });
        let configs = dispatch
            .or_else(|| signal.dispatch.clone())
            .or_else(|| self.default_dispatch.clone());
        let registry = Arc::clone(&self.dispatch);
        tokio::spawn(async move {
            registry.dispatch_or_log(&signal, configs.as_deref()).await;
        });
    }

    /// Execute an instruction's action with the agent state injected.
    /// Panics are caught and converted to execution errors.
    pub(crate) async fn run_action(
        &self,
        agent: &Agent,
        instruction: &Instruction,
    ) -> Result<ActionOutput, Error> {
        let Some(action) = agent.actions.get(&instruction.action) else {
            return Err(Error::Execution(ExecutionError::new(format!(
                "action not registered: {}",
                instruction.action
            ))));
        };

        let mut ctx = ActionContext::new(agent.id.clone(), agent.state.clone());
        ctx.meta.insert(
            crate::actions::META_QUEUE_SIZE.to_string(),
            json!(agent.queue_len()),
        );
        ctx.meta
            .insert(crate::actions::META_ACTIONS.to_string(), json!(agent.actions.names()));
        for (key, value) in &instruction.context {
            ctx.meta.insert(key.clone(), value.clone());
        }

        let params = instruction.params.clone();
        let task = tokio::spawn(async move { action.run(&params, &ctx).await });
        match task.await {
            Ok(result) => result,
            Err(join_error) => Err(Error::Execution(ExecutionError::with_cause(
                "action crashed",
                join_error.to_string(),
            ))),
        }
    }

    /// `RunInstruction`: run the action, translate the outcome, run the
    /// result action with the payload, and splice both directive sets at
    /// the head of the drain.
    async fn run_instruction(
        &mut self,
        agent: &mut Agent,
        instruction: Instruction,
        result_action: String,
        meta: Map<String, Value>,
    ) -> Result<Step, Error> {
        let (status, result, reason, inner_directives) =
            match self.run_action(agent, &instruction).await {
                Ok(output) => {
                    agent.result = Some(output.result.clone());
                    ("ok", output.result, Value::Null, output.directives)
                }
                Err(error) => {
                    self.note_error(&error);
                    ("error", Value::Null, json!(error.to_string()), Vec::new())
                }
            };

        let effects: Vec<&str> = inner_directives.iter().map(Directive::name).collect();
        let instruction_value = serde_json::to_value(&instruction)
            .map_err(|e| Error::execution(format!("unserializable instruction: {e}")))?;
        let payload = json!({
            "status": status,
            "result": result,
            "reason": reason,
            "effects": effects,
            "instruction": instruction_value,
            "meta": Value::Object(meta),
        });
        let Value::Object(params) = payload else {
            return Err(Error::execution("result payload must be an object"));
        };

        let marker = Instruction::new(result_action).with_params(params);
        let output = self.run_action(agent, &marker).await?;

        let mut spliced = output.directives;
        spliced.extend(inner_directives);
        Ok(Step::Splice(spliced))
    }

    /// Arm a one-shot timer delivering back to this server's inbox.
    fn schedule(&mut self, agent: &Agent, delay: Duration, message: ScheduleMessage) {
        let signal = match message {
            ScheduleMessage::Signal(signal) => *signal,
            ScheduleMessage::Value(value) => Signal::new(
                signal_types::SCHEDULED,
                json!({"message": value}),
            )
            .with_source(format!("jido://agent/{}", agent.id)),
        };
        let tx = self.self_tx.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(Msg::Scheduled { signal });
        });
        self.timers.track(handle);
    }

    /// Start a child server, monitor it, register it under `tag`.
    /// Fail-soft: a child that cannot be built leaves state unchanged.
    fn spawn_child(
        &mut self,
        agent: &Agent,
        spec: ChildSpec,
        tag: String,
        meta: Map<String, Value>,
    ) {
        let id = spec
            .id
            .clone()
            .unwrap_or_else(|| AgentId::new(format!("{}/{}", agent.id, tag)));
        let child_agent = match Agent::new(id.as_str()) {
            Ok(child) => child.with_state(spec.initial_state.clone()),
            Err(e) => {
                tracing::warn!(tag = %tag, error = %e, "child spawn failed");
                self.emit(
                    Signal::new(
                        signal_types::EVENT_PROCESS_FAILED,
                        json!({"tag": tag, "reason": e.to_string()}),
                    ),
                    None,
                );
                return;
            }
        };

        let mut routes = Vec::new();
        for (pattern, action, priority) in &spec.routes {
            match Route::with_priority(pattern, RouteTarget::Action(action.clone()), *priority) {
                Ok(route) => routes.push(route),
                Err(e) => {
                    tracing::warn!(tag = %tag, pattern = %pattern, error = %e, "child route invalid");
                    self.emit(
                        Signal::new(
                            signal_types::EVENT_PROCESS_FAILED,
                            json!({"tag": tag, "reason": e.to_string()}),
                        ),
                        None,
                    );
                    return;
                }
            }
        }

        let mut config = ServerConfig::new(child_agent)
            .with_settings(self.child_settings.clone())
            .with_routes(routes)
            .with_dispatch(Arc::clone(&self.dispatch))
            .with_strategy(
                spec.strategy.clone().unwrap_or_else(|| Arc::clone(&self.child_strategy)),
            );
        for action in &spec.actions {
            config = config.with_action(Arc::clone(action));
        }

        let handle = AgentServer::spawn(config, self.clock.clone());

        // monitor: report termination back into our own inbox
        let tx = self.self_tx.clone();
        let monitored = handle.clone();
        let monitor_tag = tag.clone();
        tokio::spawn(async move {
            monitored.closed().await;
            let _ = tx.send(Msg::ChildDown { tag: monitor_tag });
        });

        self.emit(
            Signal::new(
                signal_types::EVENT_PROCESS_STARTED,
                json!({"tag": tag, "agent_id": id.as_str()}),
            ),
            None,
        );
        self.children.insert(tag, ChildEntry { handle, meta });
    }

    /// Send the graceful stop signal to a child; unknown tags are ok.
    fn stop_child(&mut self, tag: &str, reason: Option<String>) {
        let Some(entry) = self.children.get(tag) else {
            tracing::debug!(tag = %tag, "stop_child: unknown tag, ignoring");
            return;
        };
        let data = match reason {
            Some(reason) => json!({"reason": reason}),
            None => json!({}),
        };
        let signal = Signal::new(signal_types::AGENT_STOP, data);
        if let Err(e) = entry.handle.cast(signal) {
            tracing::warn!(tag = %tag, error = %e, "stop_child delivery failed");
        }
    }

    /// Forward a signal to dispatch targets resolved by the router.
    pub(crate) fn dispatch_async(&mut self, signal: &Signal, configs: Vec<DispatchConfig>) {
        let registry = Arc::clone(&self.dispatch);
        let signal = signal.clone();
        tokio::spawn(async move {
            registry.dispatch_all(&signal, &configs).await;
        });
    }
}

#[cfg(test)]
#[path = "exec_tests.rs"]
mod tests;
