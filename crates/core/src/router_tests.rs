// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serde_json::{json, Value};
use std::sync::Arc;

fn signal(ty: &str) -> Signal {
    Signal::new(ty, json!({}))
}

fn action_names(targets: &[RouteTarget]) -> Vec<String> {
    targets
        .iter()
        .map(|t| match t {
            RouteTarget::Action(name) => name.clone(),
            RouteTarget::Dispatch(_) => "<dispatch>".to_string(),
        })
        .collect()
}

#[yare::parameterized(
    literal = { "jido.agent.cmd.state", Ok(()) },
    single_wildcard = { "echo.*", Ok(()) },
    double_star = { "jido.**", Ok(()) },
    star_between_literals = { "a.*.c", Ok(()) },
    star_star_star = { "a.*.**", Err(RoutingError::DoubleStarNotAlone) },
    adjacent_double_stars = { "**.**", Err(RoutingError::DoubleStarNotAlone) },
    double_star_then_star = { "**.*", Err(RoutingError::DoubleStarNotAlone) },
    star_then_star = { "a.*.*", Ok(()) },
    consecutive_dots = { "a..b", Err(RoutingError::ConsecutiveDots) },
    leading_dot = { ".a", Err(RoutingError::ConsecutiveDots) },
    trailing_dot = { "a.", Err(RoutingError::ConsecutiveDots) },
    bad_chars = { "a.b!c", Err(RoutingError::InvalidCharacters("a.b!c".to_string())) },
    space = { "a. b", Err(RoutingError::InvalidCharacters("a. b".to_string())) },
)]
fn pattern_validation(raw: &str, expected: Result<(), RoutingError>) {
    let result = RoutePattern::parse(raw).map(|_| ());
    assert_eq!(result, expected);
}

#[yare::parameterized(
    exact = { "a.b.c", "a.b.c", true },
    exact_miss = { "a.b.c", "a.b.d", false },
    length_miss = { "a.b.c", "a.b", false },
    star_matches_one = { "a.*.c", "a.x.c", true },
    star_needs_exactly_one = { "a.*.c", "a.c", false },
    star_not_two = { "a.*.c", "a.x.y.c", false },
    rest_matches_zero = { "a.**", "a", true },
    rest_matches_many = { "a.**", "a.b.c.d", true },
    rest_in_middle = { "a.**.z", "a.b.c.z", true },
    rest_in_middle_zero = { "a.**.z", "a.z", true },
    rest_miss = { "a.**.z", "a.b.c", false },
    trailing_star = { "echo.*", "echo.hello", true },
    trailing_star_depth = { "echo.*", "echo.a.b", false },
)]
fn pattern_matching(pattern: &str, path: &str, expected: bool) {
    let pattern = RoutePattern::parse(pattern).unwrap();
    assert_eq!(pattern.matches(path), expected, "{pattern} vs {path}");
}

#[test]
fn priority_out_of_range_is_rejected() {
    let err = Route::with_priority("a.b", RouteTarget::Action("x".into()), 101).unwrap_err();
    assert_eq!(err, RoutingError::InvalidPriority(101));
    let err = Route::with_priority("a.b", RouteTarget::Action("x".into()), -101).unwrap_err();
    assert_eq!(err, RoutingError::InvalidPriority(-101));
}

#[test]
fn empty_dispatch_target_is_rejected() {
    let err = Route::new("a.b", RouteTarget::Dispatch(vec![])).unwrap_err();
    assert_eq!(err, RoutingError::InvalidTarget);
}

#[test]
fn higher_priority_wins() {
    let router = Router::new(vec![
        Route::new("a.b", RouteTarget::Action("low".into())).unwrap(),
        Route::with_priority("a.b", RouteTarget::Action("high".into()), 50).unwrap(),
    ])
    .unwrap();

    assert_eq!(action_names(&router.route(&signal("a.b"))), vec!["high", "low"]);
}

#[test]
fn specificity_breaks_priority_ties() {
    let router = Router::new(vec![
        Route::new("a.**", RouteTarget::Action("broad".into())).unwrap(),
        Route::new("a.b.c", RouteTarget::Action("exact".into())).unwrap(),
        Route::new("a.*.c", RouteTarget::Action("starred".into())).unwrap(),
    ])
    .unwrap();

    assert_eq!(
        action_names(&router.route(&signal("a.b.c"))),
        vec!["exact", "starred", "broad"]
    );
}

#[test]
fn insertion_order_breaks_full_ties() {
    let router = Router::new(vec![
        Route::new("a.b", RouteTarget::Action("first".into())).unwrap(),
        Route::new("a.b", RouteTarget::Action("second".into())).unwrap(),
    ])
    .unwrap();

    // duplicate routes coexist; stable sort preserves insertion order
    assert_eq!(action_names(&router.route(&signal("a.b"))), vec!["first", "second"]);
}

#[test]
fn route_order_is_deterministic() {
    let router = Router::new(vec![
        Route::with_priority("jido.**", RouteTarget::Action("wild".into()), -10).unwrap(),
        Route::new("jido.agent.cmd.*", RouteTarget::Action("cmd".into())).unwrap(),
        Route::with_priority("jido.agent.cmd.state", RouteTarget::Action("state".into()), 50)
            .unwrap(),
    ])
    .unwrap();

    let first = action_names(&router.route(&signal("jido.agent.cmd.state")));
    for _ in 0..10 {
        assert_eq!(action_names(&router.route(&signal("jido.agent.cmd.state"))), first);
    }
    assert_eq!(first, vec!["state", "cmd", "wild"]);
}

#[test]
fn match_fn_filters_on_signal_data() {
    let only_big: MatchFn =
        Arc::new(|s: &Signal| s.data.get("n").and_then(Value::as_i64).unwrap_or(0) > 10);
    let router = Router::new(vec![
        Route::new("m.*", RouteTarget::Action("big".into())).unwrap().with_match_fn(only_big),
        Route::new("m.*", RouteTarget::Action("any".into())).unwrap(),
    ])
    .unwrap();

    let matched = router.route(&Signal::new("m.x", json!({"n": 3})));
    assert_eq!(action_names(&matched), vec!["any"]);

    let matched = router.route(&Signal::new("m.x", json!({"n": 30})));
    assert_eq!(action_names(&matched), vec!["big", "any"]);
}

#[test]
fn add_remove_merge_return_new_routers() {
    let base = Router::new(vec![
        Route::new("a.b", RouteTarget::Action("one".into())).unwrap(),
    ])
    .unwrap();

    let extended = base.add(Route::new("c.d", RouteTarget::Action("two".into())).unwrap());
    assert_eq!(base.len(), 1);
    assert_eq!(extended.len(), 2);

    let removed = extended.remove("a.b");
    assert_eq!(removed.len(), 1);
    assert!(removed.route(&signal("a.b")).is_empty());

    let merged = base.merge(&removed);
    assert_eq!(merged.len(), 2);
}

#[test]
fn layering_constructors_set_priorities() {
    assert_eq!(Route::strategy("a.b", "x").unwrap().priority, PRIORITY_STRATEGY);
    assert_eq!(Route::agent("a.b", "x").unwrap().priority, PRIORITY_AGENT);
    assert_eq!(Route::plugin("a.b", "x").unwrap().priority, PRIORITY_PLUGIN);
    assert_eq!(Route::scheduled("a.b", "x").unwrap().priority, PRIORITY_SCHEDULED);
}
