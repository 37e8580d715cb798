// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serde_json::json;

#[test]
fn builder_sets_fields() {
    let instruction = Instruction::new("math.add")
        .with_param("a", json!(1))
        .with_param("b", json!(2));
    assert_eq!(instruction.action, "math.add");
    assert_eq!(instruction.params.get("a"), Some(&json!(1)));
    assert!(instruction.context.is_empty());
}

#[test]
fn serde_roundtrip() {
    let instruction = Instruction::new("echo").with_param("msg", json!("hi"));
    let json = serde_json::to_string(&instruction).unwrap();
    let parsed: Instruction = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, instruction);
}

#[yare::parameterized(
    bare_name = { json!("echo"), Some("echo") },
    object = { json!({"action": "echo", "params": {"msg": "hi"}}), Some("echo") },
    empty_name = { json!(""), None },
    number = { json!(42), None },
    object_without_action = { json!({"params": {}}), None },
)]
fn from_value(value: serde_json::Value, expected_action: Option<&str>) {
    let parsed = Instruction::from_value(&value);
    assert_eq!(parsed.map(|i| i.action), expected_action.map(str::to_string));
}
