// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! jido-engine: the per-agent server loop, directive interpreter,
//! strategies, and the keyed instance pool.

pub mod actions;
mod error;
mod events;
mod exec;
pub mod fsm;
mod manager;
mod server;
mod timers;

pub use error::ServerError;
pub use events::ServerEvent;
pub use fsm::{FsmStrategy, FSM_RESULT_ACTION};
pub use manager::{GetOpts, InstanceManager, ManagerConfig};
pub use server::{AgentHandle, AgentServer, Lifecycle, ServerConfig, StorageBinding};

// The strategy seam lives in jido-core so child specs can carry one;
// re-exported here because the engine is where strategies plug in.
pub use jido_core::strategy::{Strategy, StrategyCtx, StrategySnapshot};
