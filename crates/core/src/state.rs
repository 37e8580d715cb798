// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Structural updates over the agent state map.

use crate::error::Error;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Operation kind for a `StateModify` directive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StateOp {
    /// Write the value at the path, creating missing intermediate maps.
    Set,
    /// Remove the value at the path; missing paths are a no-op.
    Delete,
    /// Overwrite the value at an existing path. With an empty path the
    /// whole state map is replaced (value must be an object).
    Replace,
}

impl StateOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            StateOp::Set => "set",
            StateOp::Delete => "delete",
            StateOp::Replace => "replace",
        }
    }
}

/// Apply a structural update to a state map.
///
/// `Set` descends the path, creating intermediate objects as needed and
/// overwriting non-object intermediates. `Delete` removes the final key,
/// tolerating missing paths. `Replace` requires the parent path to exist;
/// with an empty path it swaps the entire map.
pub fn modify(
    state: &mut Map<String, Value>,
    op: StateOp,
    path: &[String],
    value: Value,
) -> Result<(), Error> {
    match op {
        StateOp::Set => {
            let Some((last, parents)) = path.split_last() else {
                return Err(Error::validation("set requires a non-empty path"));
            };
            let target = descend_creating(state, parents);
            target.insert(last.clone(), value);
            Ok(())
        }
        StateOp::Delete => {
            let Some((last, parents)) = path.split_last() else {
                return Err(Error::validation("delete requires a non-empty path"));
            };
            if let Some(target) = descend(state, parents) {
                target.remove(last.as_str());
            }
            Ok(())
        }
        StateOp::Replace => {
            let Some((last, parents)) = path.split_last() else {
                return match value {
                    Value::Object(map) => {
                        *state = map;
                        Ok(())
                    }
                    other => Err(Error::validation_with(
                        "replace with an empty path requires an object",
                        other,
                    )),
                };
            };
            match descend(state, parents) {
                Some(target) => {
                    target.insert(last.clone(), value);
                    Ok(())
                }
                None => Err(Error::validation(format!(
                    "replace path not found: {}",
                    path.join(".")
                ))),
            }
        }
    }
}

/// Walk `path` creating empty objects for missing or non-object segments.
fn descend_creating<'a>(
    state: &'a mut Map<String, Value>,
    path: &[String],
) -> &'a mut Map<String, Value> {
    let mut current = state;
    for segment in path {
        let slot = current
            .entry(segment.clone())
            .or_insert_with(|| Value::Object(Map::new()));
        if !slot.is_object() {
            *slot = Value::Object(Map::new());
        }
        match slot.as_object_mut() {
            Some(map) => current = map,
            None => unreachable!("slot was just made an object"),
        }
    }
    current
}

/// Walk `path` read-for-write; `None` when a segment is missing or not an
/// object.
fn descend<'a>(
    state: &'a mut Map<String, Value>,
    path: &[String],
) -> Option<&'a mut Map<String, Value>> {
    let mut current = state;
    for segment in path {
        current = current.get_mut(segment.as_str())?.as_object_mut()?;
    }
    Some(current)
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
