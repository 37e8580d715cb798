// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Strategy seam: the pluggable decision component owning how a batch of
//! instructions becomes directives.
//!
//! Strategies are pure with respect to their input: the same agent value
//! and batch produce the same outputs modulo the strategy's declared
//! slice at `state.__strategy__`. No side effects — all effects flow
//! through the returned directives so the server can order, retry, and
//! observe them uniformly.

use crate::agent::Agent;
use crate::directive::Directive;
use crate::instruction::Instruction;
use crate::router::Route;
use serde_json::{Map, Value};

/// Context handed to strategy callbacks.
#[derive(Debug, Clone, Default)]
pub struct StrategyCtx {
    /// Epoch milliseconds at the time of the call.
    pub now_ms: u64,
}

/// Point-in-time view of a strategy's progress.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StrategySnapshot {
    pub status: String,
    pub done: bool,
    pub result: Option<Value>,
    pub details: Map<String, Value>,
}

/// The pluggable "what to do with this batch of instructions" module.
pub trait Strategy: Send + Sync {
    /// Called once when the owning server starts, after built-in actions
    /// are registered and before any signal is processed.
    fn init(&self, agent: &mut Agent, ctx: &StrategyCtx) -> Vec<Directive>;

    /// Turn a batch of instructions into directives, updating the agent's
    /// strategy slice in place.
    fn cmd(&self, agent: &mut Agent, batch: Vec<Instruction>, ctx: &StrategyCtx)
        -> Vec<Directive>;

    /// Routes consulted before the agent's own router.
    fn signal_routes(&self, _ctx: &StrategyCtx) -> Vec<Route> {
        Vec::new()
    }

    fn snapshot(&self, agent: &Agent, _ctx: &StrategyCtx) -> StrategySnapshot {
        StrategySnapshot {
            status: String::new(),
            done: true,
            result: agent.result.clone(),
            details: Map::new(),
        }
    }
}
