// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! InstanceManager: a keyed pool of live agents with thaw-on-demand.
//!
//! `get` returns an existing live handle or spawns one, thawing the
//! agent from storage first (keyed by `{module, {manager, key}}`) and
//! falling back to a fresh agent. Hibernate always completes before a
//! server's handle closes, so waiting for a closing server and then
//! thawing is race-free.

use crate::error::ServerError;
use crate::server::{AgentHandle, AgentServer, Lifecycle, ServerConfig, StorageBinding};
use jido_core::{Agent, Clock, Route, Settings, StopReason, Strategy};
use jido_adapters::DispatchRegistry;
use jido_storage::{thaw, AgentKind, CheckpointKey, StorageAdapter, StorageError};
use parking_lot::Mutex;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Shared wiring for every agent a manager spawns.
#[derive(Clone)]
pub struct ManagerConfig {
    pub name: String,
    pub storage: Arc<dyn StorageAdapter>,
    pub kind: Arc<dyn AgentKind>,
    pub settings: Settings,
    pub routes: Vec<Route>,
    pub actions: Vec<Arc<dyn jido_core::Action>>,
    pub strategy: Option<Arc<dyn Strategy>>,
    pub dispatch: Arc<DispatchRegistry>,
}

impl ManagerConfig {
    pub fn new(
        name: impl Into<String>,
        storage: Arc<dyn StorageAdapter>,
        kind: Arc<dyn AgentKind>,
    ) -> Self {
        Self {
            name: name.into(),
            storage,
            kind,
            settings: Settings::default(),
            routes: Vec::new(),
            actions: Vec::new(),
            strategy: None,
            dispatch: Arc::new(DispatchRegistry::standard()),
        }
    }

    pub fn with_settings(mut self, settings: Settings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_routes(mut self, routes: Vec<Route>) -> Self {
        self.routes = routes;
        self
    }

    pub fn with_action(mut self, action: Arc<dyn jido_core::Action>) -> Self {
        self.actions.push(action);
        self
    }

    pub fn with_strategy(mut self, strategy: Arc<dyn Strategy>) -> Self {
        self.strategy = Some(strategy);
        self
    }

    pub fn with_dispatch(mut self, dispatch: Arc<DispatchRegistry>) -> Self {
        self.dispatch = dispatch;
        self
    }
}

/// Options for [`InstanceManager::get`].
#[derive(Debug, Clone)]
pub struct GetOpts {
    /// State for a freshly created agent (ignored on thaw).
    pub initial_state: Map<String, Value>,
    /// Bound on the retry loop through the thaw race.
    pub deadline: Duration,
}

impl Default for GetOpts {
    fn default() -> Self {
        Self { initial_state: Map::new(), deadline: Duration::from_secs(5) }
    }
}

impl GetOpts {
    pub fn with_state(mut self, initial_state: Map<String, Value>) -> Self {
        self.initial_state = initial_state;
        self
    }
}

/// Keyed pool owning the map from keys to running agent handles.
pub struct InstanceManager<C: Clock> {
    config: ManagerConfig,
    clock: C,
    entries: Arc<Mutex<HashMap<String, AgentHandle>>>,
    /// Serializes spawn decisions (single-writer; lookups stay lock-free
    /// of this gate).
    spawn_gate: Arc<tokio::sync::Mutex<()>>,
}

const SPAWN_RETRY: Duration = Duration::from_millis(20);

impl<C: Clock> InstanceManager<C> {
    pub fn new(config: ManagerConfig, clock: C) -> Self {
        Self {
            config,
            clock,
            entries: Arc::new(Mutex::new(HashMap::new())),
            spawn_gate: Arc::new(tokio::sync::Mutex::new(())),
        }
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// A live handle for `key`: existing, thawed from storage, or fresh.
    pub async fn get(&self, key: &str, opts: GetOpts) -> Result<AgentHandle, ServerError> {
        let deadline = tokio::time::Instant::now() + opts.deadline;
        loop {
            if let Some(handle) = self.live_entry(key) {
                let _ = handle.touch();
                return Ok(handle);
            }

            // an old server may still be terminating (and hibernating);
            // wait it out rather than thawing a half-written checkpoint
            if let Some(stopping) = self.stopping_entry(key) {
                if tokio::time::Instant::now() >= deadline {
                    return Err(ServerError::NotFound(format!(
                        "{}: server stuck terminating",
                        key
                    )));
                }
                let _ = tokio::time::timeout(SPAWN_RETRY * 10, stopping.closed()).await;
                continue;
            }

            let _gate = self.spawn_gate.lock().await;
            if let Some(handle) = self.live_entry(key) {
                let _ = handle.touch();
                return Ok(handle);
            }

            let checkpoint_key = self.key_for(key);
            let agent = match thaw(&*self.config.storage, &*self.config.kind, &checkpoint_key)
                .await
            {
                Ok(agent) => agent,
                Err(StorageError::NotFound) => Agent::new(key)
                    .map(|agent| agent.with_state(opts.initial_state.clone()))
                    .map_err(ServerError::Core)?,
                Err(e) => {
                    if tokio::time::Instant::now() >= deadline {
                        return Err(e.into());
                    }
                    drop(_gate);
                    tokio::time::sleep(SPAWN_RETRY).await;
                    continue;
                }
            };

            let mut server_config = ServerConfig::new(agent)
                .with_settings(self.config.settings.clone())
                .with_routes(self.config.routes.clone())
                .with_dispatch(Arc::clone(&self.config.dispatch))
                .with_storage(StorageBinding {
                    adapter: Arc::clone(&self.config.storage),
                    kind: Arc::clone(&self.config.kind),
                    key: checkpoint_key,
                });
            if let Some(strategy) = &self.config.strategy {
                server_config = server_config.with_strategy(Arc::clone(strategy));
            }
            for action in &self.config.actions {
                server_config = server_config.with_action(Arc::clone(action));
            }

            let handle = AgentServer::spawn(server_config, self.clock.clone());
            self.entries.lock().insert(key.to_string(), handle.clone());
            self.reap_on_exit(key.to_string(), handle.clone());
            tracing::info!(manager = %self.config.name, key, "instance started");
            return Ok(handle);
        }
    }

    /// An existing live handle, or `NotFound`.
    pub fn lookup(&self, key: &str) -> Result<AgentHandle, ServerError> {
        self.live_entry(key).ok_or_else(|| ServerError::NotFound(key.to_string()))
    }

    /// Graceful stop: hibernate, then terminate and drop from the pool.
    pub async fn stop(&self, key: &str) -> Result<(), ServerError> {
        let handle = self
            .entries
            .lock()
            .remove(key)
            .ok_or_else(|| ServerError::NotFound(key.to_string()))?;
        handle.stop(StopReason::Normal, true).await?;
        tracing::info!(manager = %self.config.name, key, "instance stopped");
        Ok(())
    }

    /// `(count, keys)` of live instances.
    pub fn stats(&self) -> (usize, Vec<String>) {
        let mut entries = self.entries.lock();
        entries.retain(|_, handle| !handle.is_closed());
        let mut keys: Vec<String> = entries.keys().cloned().collect();
        keys.sort();
        (keys.len(), keys)
    }

    /// The namespaced persistence key: `{module, {manager, key}}`.
    pub fn key_for(&self, key: &str) -> CheckpointKey {
        CheckpointKey::scoped(self.config.kind.module(), &self.config.name, key)
    }

    fn live_entry(&self, key: &str) -> Option<AgentHandle> {
        let mut entries = self.entries.lock();
        match entries.get(key) {
            Some(handle) if handle.is_closed() => {
                entries.remove(key);
                None
            }
            Some(handle)
                if matches!(handle.status(), Lifecycle::Stopping | Lifecycle::Stopped) =>
            {
                None
            }
            Some(handle) => Some(handle.clone()),
            None => None,
        }
    }

    /// A handle that is terminating but not yet closed, if any.
    fn stopping_entry(&self, key: &str) -> Option<AgentHandle> {
        let entries = self.entries.lock();
        entries
            .get(key)
            .filter(|h| {
                !h.is_closed()
                    && matches!(h.status(), Lifecycle::Stopping | Lifecycle::Stopped)
            })
            .cloned()
    }

    /// Remove the pool entry once its server exits (idle timeout, stop).
    fn reap_on_exit(&self, key: String, handle: AgentHandle) {
        let entries = Arc::clone(&self.entries);
        tokio::spawn(async move {
            handle.closed().await;
            let mut entries = entries.lock();
            if entries.get(&key).is_some_and(|current| current.same_server(&handle)) {
                entries.remove(&key);
            }
        });
    }
}

#[cfg(test)]
#[path = "manager_tests.rs"]
mod tests;
