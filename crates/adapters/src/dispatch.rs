// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Dispatch adapter contract and the name-keyed registry.

use async_trait::async_trait;
use jido_core::{DispatchConfig, Signal};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Name of the fallback adapter every registry carries.
pub const LOGGER_ADAPTER: &str = "logger";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    #[error("unknown dispatch adapter: {0}")]
    UnknownAdapter(String),
    #[error("dispatch target not registered: {0}")]
    UnknownTarget(String),
    #[error("delivery failed: {0}")]
    Delivery(String),
}

/// Publishes one signal to one transport.
#[async_trait]
pub trait DispatchAdapter: Send + Sync {
    /// Registry name; dispatch configs address adapters by this string.
    fn name(&self) -> &str;

    async fn deliver(&self, signal: &Signal, opts: &Map<String, Value>)
        -> Result<(), DispatchError>;
}

/// Name-keyed set of dispatch adapters with a logger fallback.
#[derive(Clone)]
pub struct DispatchRegistry {
    adapters: HashMap<String, Arc<dyn DispatchAdapter>>,
}

impl DispatchRegistry {
    /// An empty registry holding only the logger fallback.
    pub fn new() -> Self {
        let mut registry = Self { adapters: HashMap::new() };
        registry.register(Arc::new(crate::logger::LoggerAdapter));
        registry
    }

    /// The standard set: logger, console, noop.
    pub fn standard() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(crate::console::ConsoleAdapter));
        registry.register(Arc::new(crate::noop::NoopAdapter));
        registry
    }

    pub fn register(&mut self, adapter: Arc<dyn DispatchAdapter>) {
        self.adapters.insert(adapter.name().to_string(), adapter);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn DispatchAdapter>> {
        self.adapters.get(name).cloned()
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.adapters.keys().cloned().collect();
        names.sort();
        names
    }

    /// Fan a signal out to every config in order.
    ///
    /// Delivery failures and unknown adapter names are logged, not
    /// propagated: emit is fire-and-forget by contract.
    pub async fn dispatch_all(&self, signal: &Signal, configs: &[DispatchConfig]) {
        for config in configs {
            match self.get(&config.adapter) {
                Some(adapter) => {
                    if let Err(e) = adapter.deliver(signal, &config.opts).await {
                        tracing::warn!(
                            adapter = %config.adapter,
                            signal = %signal.log_summary(),
                            error = %e,
                            "dispatch delivery failed"
                        );
                    }
                }
                None => {
                    tracing::warn!(
                        adapter = %config.adapter,
                        signal = %signal.log_summary(),
                        "unknown dispatch adapter, skipping"
                    );
                }
            }
        }
    }

    /// Dispatch with the logger fallback when no config is given.
    pub async fn dispatch_or_log(&self, signal: &Signal, configs: Option<&[DispatchConfig]>) {
        match configs {
            Some(configs) if !configs.is_empty() => self.dispatch_all(signal, configs).await,
            _ => {
                self.dispatch_all(signal, &[DispatchConfig::new(LOGGER_ADAPTER)]).await;
            }
        }
    }
}

impl Default for DispatchRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

impl fmt::Debug for DispatchRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DispatchRegistry").field("adapters", &self.names()).finish()
    }
}

#[cfg(test)]
#[path = "dispatch_tests.rs"]
mod tests;
