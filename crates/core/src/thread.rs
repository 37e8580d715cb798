// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Thread: an append-only, monotonically-numbered event journal bound to
//! an agent.
//!
//! Invariants: `rev == entries.len()`, entry seqs are exactly `0..rev`,
//! and `rev` never decreases locally. Storage may hold a newer prefix
//! but never a divergent one; the persistence layer enforces that on
//! flush.

use crate::clock::Clock;
use crate::id::{EntryId, ThreadId};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Default entry kind applied during normalization.
pub const DEFAULT_ENTRY_KIND: &str = "note";

/// One journal entry. `seq` is assigned on append and never reused.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreadEntry {
    #[serde(default)]
    pub id: EntryId,
    #[serde(default)]
    pub seq: u64,
    /// Epoch milliseconds; zero means "not yet stamped".
    #[serde(default)]
    pub at: u64,
    #[serde(default = "default_kind")]
    pub kind: String,
    #[serde(default)]
    pub payload: Value,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub refs: Map<String, Value>,
}

fn default_kind() -> String {
    DEFAULT_ENTRY_KIND.to_string()
}

impl ThreadEntry {
    /// A draft entry; id/seq/at are filled in on append.
    pub fn new(kind: impl Into<String>, payload: Value) -> Self {
        Self {
            id: EntryId(crate::id::IdBuf::empty()),
            seq: 0,
            at: 0,
            kind: kind.into(),
            payload,
            refs: Map::new(),
        }
    }

    /// A draft entry with the default `note` kind.
    pub fn note(payload: Value) -> Self {
        Self::new(DEFAULT_ENTRY_KIND, payload)
    }

    pub fn with_refs(mut self, refs: Map<String, Value>) -> Self {
        self.refs = refs;
        self
    }

    /// Fill in generated/defaulted fields: id when empty, `at` when
    /// unstamped, empty kind to `note`. `seq` is always assigned.
    pub fn normalize(mut self, seq: u64, now_ms: u64) -> Self {
        if self.id.is_empty() {
            self.id = EntryId::new();
        }
        self.seq = seq;
        if self.at == 0 {
            self.at = now_ms;
        }
        if self.kind.is_empty() {
            self.kind = default_kind();
        }
        if self.payload.is_null() {
            self.payload = Value::Object(Map::new());
        }
        self
    }
}

impl Default for ThreadEntry {
    fn default() -> Self {
        Self::note(Value::Null)
    }
}

/// Pointer to a stored thread prefix: `{id, rev}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadPointer {
    pub id: ThreadId,
    pub rev: u64,
}

/// Append-only event journal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Thread {
    pub id: ThreadId,
    /// Revision: equals `entries.len()` at all times.
    pub rev: u64,
    pub entries: Vec<ThreadEntry>,
    /// Set once at creation; adapters persist it on first append.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub metadata: Map<String, Value>,
}

impl Thread {
    pub fn new(metadata: Map<String, Value>) -> Self {
        Self { id: ThreadId::new(), rev: 0, entries: Vec::new(), metadata }
    }

    pub fn with_id(id: ThreadId, metadata: Map<String, Value>) -> Self {
        Self { id, rev: 0, entries: Vec::new(), metadata }
    }

    /// Append an entry, normalizing it with the next seq and a timestamp
    /// from the clock. Returns the assigned seq.
    pub fn append(&mut self, entry: ThreadEntry, clock: &impl Clock) -> u64 {
        let seq = self.rev;
        self.entries.push(entry.normalize(seq, clock.epoch_ms()));
        self.rev += 1;
        seq
    }

    /// The unflushed suffix: entries with `seq >= rev`.
    pub fn entries_from(&self, rev: u64) -> &[ThreadEntry] {
        let start = (rev as usize).min(self.entries.len());
        &self.entries[start..]
    }

    pub fn pointer(&self) -> ThreadPointer {
        ThreadPointer { id: self.id, rev: self.rev }
    }

    /// Whether the local invariants hold: `rev == len(entries)` and seqs
    /// are exactly `0..rev`.
    pub fn is_consistent(&self) -> bool {
        self.rev == self.entries.len() as u64
            && self.entries.iter().enumerate().all(|(i, e)| e.seq == i as u64)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
#[path = "thread_tests.rs"]
mod tests;
