// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serde_json::json;

struct Doubler;

#[async_trait]
impl Action for Doubler {
    fn name(&self) -> &str {
        "math.double"
    }

    async fn run(
        &self,
        params: &Map<String, Value>,
        _ctx: &ActionContext,
    ) -> Result<ActionOutput, Error> {
        let n = params
            .get("n")
            .and_then(Value::as_i64)
            .ok_or_else(|| Error::validation("n must be an integer"))?;
        Ok(ActionOutput::value(json!({"n": n * 2})))
    }
}

#[tokio::test]
async fn run_returns_normalized_output() {
    let action = Doubler;
    let mut params = Map::new();
    params.insert("n".to_string(), json!(4));
    let out = action.run(&params, &ActionContext::default()).await.unwrap();
    assert_eq!(out.result, json!({"n": 8}));
    assert!(out.directives.is_empty());
}

#[tokio::test]
async fn bad_params_surface_as_validation_error() {
    let action = Doubler;
    let err = action.run(&Map::new(), &ActionContext::default()).await.unwrap_err();
    assert!(matches!(err, Error::Validation { .. }));
}

#[test]
fn output_from_value_has_no_directives() {
    let out: ActionOutput = json!(1).into();
    assert_eq!(out.result, json!(1));
    assert!(out.directives.is_empty());
}

#[test]
fn registry_register_get_deregister() {
    let mut registry = ActionRegistry::new();
    assert!(registry.is_empty());

    registry.register(Arc::new(Doubler));
    assert!(registry.contains("math.double"));
    assert!(registry.get("math.double").is_some());
    assert_eq!(registry.names(), vec!["math.double"]);

    assert!(registry.deregister("math.double"));
    assert!(!registry.deregister("math.double"));
    assert!(registry.is_empty());
}

#[test]
fn register_replaces_same_name() {
    struct Other;

    #[async_trait]
    impl Action for Other {
        fn name(&self) -> &str {
            "math.double"
        }

        async fn run(
            &self,
            _params: &Map<String, Value>,
            _ctx: &ActionContext,
        ) -> Result<ActionOutput, Error> {
            Ok(ActionOutput::value(json!("other")))
        }
    }

    let mut registry = ActionRegistry::new();
    registry.register(Arc::new(Doubler));
    registry.register(Arc::new(Other));
    assert_eq!(registry.len(), 1);
}
