// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Signal router: maps a signal type to zero or more targets.
//!
//! Patterns are dotted paths whose segments are literal tokens, `*` (any
//! single segment), or `**` (zero or more segments). Matches are ordered
//! by (priority desc, specificity desc, insertion order); specificity is
//! the count of literal segments, ties broken toward fewer wildcards.

use crate::error::RoutingError;
use crate::signal::{DispatchConfig, Signal};
use std::fmt;
use std::sync::Arc;

/// Priority bounds accepted for a route.
pub const MIN_PRIORITY: i32 = -100;
pub const MAX_PRIORITY: i32 = 100;

/// Default priority layering used by higher layers.
pub const PRIORITY_STRATEGY: i32 = 50;
pub const PRIORITY_AGENT: i32 = 0;
pub const PRIORITY_PLUGIN: i32 = -10;
pub const PRIORITY_SCHEDULED: i32 = -20;

/// Predicate over the whole signal, applied after the pattern matches.
pub type MatchFn = Arc<dyn Fn(&Signal) -> bool + Send + Sync>;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    /// `*`: exactly one segment.
    Any,
    /// `**`: zero or more segments.
    Rest,
}

/// A parsed, validated route pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutePattern {
    raw: String,
    segments: Vec<Segment>,
}

impl RoutePattern {
    pub fn parse(raw: &str) -> Result<Self, RoutingError> {
        if raw.is_empty() {
            return Err(RoutingError::InvalidCharacters(raw.to_string()));
        }
        let mut segments = Vec::new();
        for part in raw.split('.') {
            let segment = match part {
                "" => return Err(RoutingError::ConsecutiveDots),
                "*" => Segment::Any,
                "**" => Segment::Rest,
                literal => {
                    if !literal.chars().all(is_segment_char) {
                        return Err(RoutingError::InvalidCharacters(raw.to_string()));
                    }
                    Segment::Literal(literal.to_string())
                }
            };
            segments.push(segment);
        }
        // `**` next to another wildcard is ambiguous
        for pair in segments.windows(2) {
            let adjacent_wildcards = !matches!(pair[0], Segment::Literal(_))
                && !matches!(pair[1], Segment::Literal(_));
            if adjacent_wildcards && pair.iter().any(|s| *s == Segment::Rest) {
                return Err(RoutingError::DoubleStarNotAlone);
            }
        }
        Ok(Self { raw: raw.to_string(), segments })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Count of literal segments (the specificity measure).
    pub fn literal_count(&self) -> usize {
        self.segments.iter().filter(|s| matches!(s, Segment::Literal(_))).count()
    }

    pub fn wildcard_count(&self) -> usize {
        self.segments.len() - self.literal_count()
    }

    pub fn matches(&self, path: &str) -> bool {
        let parts: Vec<&str> = path.split('.').collect();
        match_segments(&self.segments, &parts)
    }
}

impl fmt::Display for RoutePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}

fn is_segment_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-'
}

fn match_segments(pattern: &[Segment], parts: &[&str]) -> bool {
    match pattern.split_first() {
        None => parts.is_empty(),
        Some((Segment::Literal(lit), rest)) => {
            parts.split_first().is_some_and(|(head, tail)| lit == head && match_segments(rest, tail))
        }
        Some((Segment::Any, rest)) => {
            parts.split_first().is_some_and(|(_, tail)| match_segments(rest, tail))
        }
        Some((Segment::Rest, rest)) => {
            // zero or more: try every possible split
            (0..=parts.len()).any(|skip| match_segments(rest, &parts[skip..]))
        }
    }
}

/// Where a matched signal is sent.
#[derive(Clone)]
pub enum RouteTarget {
    /// Registry name of an action to execute.
    Action(String),
    /// Dispatch adapter configs; a list fans out.
    Dispatch(Vec<DispatchConfig>),
}

impl fmt::Debug for RouteTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RouteTarget::Action(name) => write!(f, "action:{}", name),
            RouteTarget::Dispatch(configs) => {
                let names: Vec<&str> = configs.iter().map(|c| c.adapter.as_str()).collect();
                write!(f, "dispatch:{}", names.join(","))
            }
        }
    }
}

/// One routing rule. Duplicate `(pattern, target)` pairs are allowed and
/// coexist as separate routes.
#[derive(Clone)]
pub struct Route {
    pub pattern: RoutePattern,
    pub target: RouteTarget,
    pub priority: i32,
    pub match_fn: Option<MatchFn>,
}

impl Route {
    pub fn new(pattern: &str, target: RouteTarget) -> Result<Self, RoutingError> {
        Self::with_priority(pattern, target, PRIORITY_AGENT)
    }

    pub fn with_priority(
        pattern: &str,
        target: RouteTarget,
        priority: i32,
    ) -> Result<Self, RoutingError> {
        if !(MIN_PRIORITY..=MAX_PRIORITY).contains(&priority) {
            return Err(RoutingError::InvalidPriority(priority));
        }
        if let RouteTarget::Dispatch(configs) = &target {
            if configs.is_empty() {
                return Err(RoutingError::InvalidTarget);
            }
        }
        Ok(Self { pattern: RoutePattern::parse(pattern)?, target, priority, match_fn: None })
    }

    /// Route at strategy priority (50).
    pub fn strategy(pattern: &str, action: impl Into<String>) -> Result<Self, RoutingError> {
        Self::with_priority(pattern, RouteTarget::Action(action.into()), PRIORITY_STRATEGY)
    }

    /// Route at agent priority (0).
    pub fn agent(pattern: &str, action: impl Into<String>) -> Result<Self, RoutingError> {
        Self::with_priority(pattern, RouteTarget::Action(action.into()), PRIORITY_AGENT)
    }

    /// Route at plugin priority (-10).
    pub fn plugin(pattern: &str, action: impl Into<String>) -> Result<Self, RoutingError> {
        Self::with_priority(pattern, RouteTarget::Action(action.into()), PRIORITY_PLUGIN)
    }

    /// Route at schedule-generated priority (-20).
    pub fn scheduled(pattern: &str, action: impl Into<String>) -> Result<Self, RoutingError> {
        Self::with_priority(pattern, RouteTarget::Action(action.into()), PRIORITY_SCHEDULED)
    }

    pub fn with_match_fn(mut self, match_fn: MatchFn) -> Self {
        self.match_fn = Some(match_fn);
        self
    }

    fn accepts(&self, signal: &Signal) -> bool {
        self.pattern.matches(&signal.ty)
            && self.match_fn.as_ref().map_or(true, |f| f(signal))
    }
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("pattern", &self.pattern.raw)
            .field("target", &self.target)
            .field("priority", &self.priority)
            .field("match_fn", &self.match_fn.is_some())
            .finish()
    }
}

/// An ordered set of routes. All mutating operations return a new router.
#[derive(Debug, Clone, Default)]
pub struct Router {
    routes: Vec<Route>,
}

impl Router {
    /// Build a router, re-validating each route's priority and target.
    pub fn new(routes: Vec<Route>) -> Result<Self, RoutingError> {
        for route in &routes {
            if !(MIN_PRIORITY..=MAX_PRIORITY).contains(&route.priority) {
                return Err(RoutingError::InvalidPriority(route.priority));
            }
            if let RouteTarget::Dispatch(configs) = &route.target {
                if configs.is_empty() {
                    return Err(RoutingError::InvalidTarget);
                }
            }
        }
        Ok(Self { routes })
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Targets matching the signal, in deterministic order: priority
    /// desc, then literal-segment count desc, then fewer wildcards, then
    /// insertion order (the sort is stable).
    pub fn route(&self, signal: &Signal) -> Vec<RouteTarget> {
        let mut matched: Vec<&Route> = self.routes.iter().filter(|r| r.accepts(signal)).collect();
        matched.sort_by_key(|r| {
            (
                std::cmp::Reverse(r.priority),
                std::cmp::Reverse(r.pattern.literal_count()),
                r.pattern.wildcard_count(),
            )
        });
        matched.into_iter().map(|r| r.target.clone()).collect()
    }

    /// A new router with the route appended.
    pub fn add(&self, route: Route) -> Self {
        let mut routes = self.routes.clone();
        routes.push(route);
        Self { routes }
    }

    /// A new router without any route whose pattern equals `pattern`.
    pub fn remove(&self, pattern: &str) -> Self {
        let routes =
            self.routes.iter().filter(|r| r.pattern.as_str() != pattern).cloned().collect();
        Self { routes }
    }

    /// A new router with `other`'s routes appended after this router's.
    pub fn merge(&self, other: &Router) -> Self {
        let mut routes = self.routes.clone();
        routes.extend(other.routes.iter().cloned());
        Self { routes }
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

#[cfg(test)]
#[path = "router_tests.rs"]
mod tests;
