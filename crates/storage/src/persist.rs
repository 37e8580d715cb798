// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Hibernate/thaw invariant enforcement.
//!
//! Hibernate flushes the thread journal suffix (compare-and-set on the
//! stored revision), then writes a checkpoint with the thread
//! externalized to a `{id, rev}` pointer. Thaw rebuilds the agent and
//! re-attaches the stored thread. Both halves are idempotent: hibernate
//! with no new entries appends nothing and rewrites an identical
//! checkpoint; thaw followed by hibernate with no mutations produces an
//! equivalent document.

use crate::adapter::{AppendOpts, StorageAdapter, StorageError};
use crate::checkpoint::{Checkpoint, CheckpointKey, CURRENT_CHECKPOINT_VERSION};
use jido_core::{Agent, Thread, THREAD_KEY};

/// Per-agent-type persistence hooks.
///
/// Types may override how their checkpoint is built and how an agent is
/// reconstructed; the enforced invariants (thread stripped from state,
/// pointer set, version stamped) are applied after the hook returns, so
/// implementations need not know about the externalization rule.
pub trait AgentKind: Send + Sync {
    /// Identity written into checkpoints and used to key storage.
    fn module(&self) -> &str;

    fn checkpoint(&self, agent: &Agent) -> Result<Checkpoint, StorageError> {
        let mut checkpoint = Checkpoint::new(self.module(), agent.id.as_str());
        checkpoint.state = agent.state.clone();
        Ok(checkpoint)
    }

    fn restore(&self, checkpoint: &Checkpoint) -> Result<Agent, StorageError> {
        let agent = Agent::new(checkpoint.id.as_str())?;
        Ok(agent.with_state(checkpoint.state.clone()))
    }
}

/// The default kind: checkpoint is the agent's id plus state, restore is
/// `Agent::new` with the state merged back.
#[derive(Debug, Clone)]
pub struct DefaultAgentKind {
    module: String,
}

impl DefaultAgentKind {
    pub fn new(module: impl Into<String>) -> Self {
        Self { module: module.into() }
    }
}

impl AgentKind for DefaultAgentKind {
    fn module(&self) -> &str {
        &self.module
    }
}

/// Flush the thread suffix to storage, honoring the journal invariants.
///
/// Returns the stored revision after the flush. A `Conflict` from the
/// adapter is re-checked: if another writer already flushed at least as
/// far as we have, it counts as success.
async fn flush_journal(
    storage: &dyn StorageAdapter,
    thread: &Thread,
) -> Result<u64, StorageError> {
    let local_len = thread.entries.len() as u64;
    if thread.rev != local_len {
        return Err(StorageError::InvalidThreadRevision {
            thread_id: thread.id,
            rev: thread.rev,
            len: local_len,
        });
    }

    let stored_rev = match storage.get_thread(&thread.id).await {
        Ok(stored) => stored.rev,
        Err(StorageError::NotFound) => 0,
        Err(e) => return Err(e),
    };

    if stored_rev > thread.rev {
        return Err(StorageError::ThreadRevRegression {
            thread_id: thread.id,
            stored: stored_rev,
            local: thread.rev,
        });
    }
    if stored_rev > local_len {
        return Err(StorageError::ThreadHistoryTruncated {
            thread_id: thread.id,
            stored: stored_rev,
            len: local_len,
        });
    }

    let suffix = thread.entries_from(stored_rev);
    if suffix.is_empty() {
        return Ok(stored_rev);
    }

    let opts = AppendOpts::at_rev(stored_rev).with_metadata(thread.metadata.clone());
    match storage.append_thread(&thread.id, suffix.to_vec(), opts).await {
        Ok(stored) => Ok(stored.rev),
        Err(StorageError::Conflict { .. }) => {
            // Re-read: a racing writer that got at least as far as our
            // local journal means the suffix is already flushed.
            let stored = storage.get_thread(&thread.id).await?;
            if stored.rev >= thread.rev {
                Ok(stored.rev)
            } else {
                Err(StorageError::Conflict {
                    thread_id: thread.id,
                    expected: stored_rev,
                    stored: stored.rev,
                })
            }
        }
        Err(e) => Err(e),
    }
}

/// Persist an agent: flush its journal, then write its checkpoint at
/// `key`. The agent value is not mutated; the caller typically evicts it
/// right after.
pub async fn hibernate(
    storage: &dyn StorageAdapter,
    kind: &dyn AgentKind,
    key: &CheckpointKey,
    agent: &Agent,
) -> Result<Checkpoint, StorageError> {
    let thread = agent.thread()?;

    if let Some(ref thread) = thread {
        let flushed_rev = flush_journal(storage, thread).await?;
        tracing::debug!(
            agent_id = %agent.id,
            thread_id = %thread.id,
            rev = flushed_rev,
            "thread journal flushed"
        );
    }

    let mut checkpoint = kind.checkpoint(agent)?;
    // Enforce invariants after the type's hook returns.
    checkpoint.version = CURRENT_CHECKPOINT_VERSION;
    checkpoint.agent_module = kind.module().to_string();
    checkpoint.externalize_thread(thread.as_ref());

    storage.put_checkpoint(key, &checkpoint).await?;
    tracing::info!(agent_id = %agent.id, key = %key, "agent hibernated");
    Ok(checkpoint)
}

/// Restore an agent from its checkpoint at `key`, re-attaching the
/// thread named by the checkpoint pointer.
pub async fn thaw(
    storage: &dyn StorageAdapter,
    kind: &dyn AgentKind,
    key: &CheckpointKey,
) -> Result<Agent, StorageError> {
    let checkpoint = storage.get_checkpoint(key).await?;

    let mut agent = kind.restore(&checkpoint)?;
    // The checkpoint state never embeds a thread, but a restore hook
    // could have left one behind.
    agent.state.remove(THREAD_KEY);

    if let Some(pointer) = &checkpoint.thread {
        let stored = match storage.get_thread(&pointer.id).await {
            Ok(stored) => stored,
            Err(StorageError::NotFound) => {
                return Err(StorageError::MissingThread(pointer.id))
            }
            Err(e) => return Err(e),
        };
        if stored.rev != pointer.rev {
            return Err(StorageError::ThreadMismatch {
                thread_id: pointer.id,
                expected: pointer.rev,
                stored: stored.rev,
            });
        }
        agent.set_thread(&stored)?;
    }

    tracing::info!(agent_id = %agent.id, key = %key, "agent thawed");
    Ok(agent)
}

#[cfg(test)]
#[path = "persist_tests.rs"]
mod tests;
