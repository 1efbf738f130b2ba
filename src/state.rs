// src/state.rs

use std::{sync::Arc, time::Duration};

use axum::extract::FromRef;

use crate::{
    config::Config,
    engine::{EngineSettings, ProgressEngine},
    notify::Notifier,
    store::{CachedStore, Store},
};

#[derive(Clone)]
pub struct AppState {
    pub engine: ProgressEngine,
    pub config: Config,
}

impl AppState {
    /// Wraps `store` in the read-through cache and builds the engine on top.
    pub fn new<S>(config: Config, store: S, notifier: Arc<dyn Notifier>) -> Self
    where
        S: Store + 'static,
    {
        let cached = CachedStore::new(store, Duration::from_secs(config.cache_ttl_secs));
        let engine = ProgressEngine::new(
            Arc::new(cached),
            notifier,
            EngineSettings::from(&config),
        );
        Self { engine, config }
    }
}

impl FromRef<AppState> for ProgressEngine {
    fn from_ref(state: &AppState) -> Self {
        state.engine.clone()
    }
}

impl FromRef<AppState> for Config {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}
