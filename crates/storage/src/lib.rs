// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! jido-storage: checkpoint/thread persistence for the Jido agent runtime

mod adapter;
mod checkpoint;
mod file;
mod memory;
mod persist;

pub use adapter::{normalize_entries, AppendOpts, StorageAdapter, StorageError};
pub use checkpoint::{Checkpoint, CheckpointKey, CURRENT_CHECKPOINT_VERSION};
pub use file::FileStorage;
pub use memory::MemoryStorage;
pub use persist::{hibernate, thaw, AgentKind, DefaultAgentKind};
