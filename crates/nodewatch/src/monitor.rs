//! Wiring of registry, store, alert engine and poller.

use std::sync::Arc;

use tracing::info;

use crate::alerts::AlertEngine;
use crate::config::{Config, NetworkPolicy};
use crate::config::validation::validate_config;
use crate::error::ConfigError;
use crate::poller::{Poller, PollerHandle};
use crate::probe::{NodeQuery, ProbeDispatcher};
use crate::query::QueryService;
use crate::registry::NodeRegistry;
use crate::snapshot::SnapshotStore;

/// Owns every component of a running monitor
pub struct NodeMonitor {
    registry: Arc<NodeRegistry>,
    policy: Arc<NetworkPolicy>,
    store: Arc<SnapshotStore>,
    poller: Arc<Poller>,
}

impl NodeMonitor {
    /// Build a monitor probing nodes over HTTP or their health logs
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        let settings = config.poller_settings();
        let dispatcher = ProbeDispatcher::new(settings.probe_timeout)
            .map_err(|err| ConfigError::Invalid(err.to_string()))?;

        Self::with_query(config, Arc::new(dispatcher))
    }

    /// Build a monitor around a caller supplied probe
    pub fn with_query(config: &Config, query: Arc<dyn NodeQuery>) -> Result<Self, ConfigError> {
        validate_config(config)?;

        let registry = Arc::new(config.registry()?);
        let policy = config.network_policy();
        let store = Arc::new(SnapshotStore::new());
        let poller = Arc::new(Poller::new(
            registry.clone(),
            query,
            store.clone(),
            AlertEngine::new(policy.clone()),
            config.poller_settings(),
        ));

        info!(
            nodes = registry.len(),
            local = %registry.local_id(),
            min_version = %policy.min_version,
            "Node monitor configured"
        );

        Ok(Self { registry, policy: Arc::new(policy), store, poller })
    }

    pub fn query_service(&self) -> QueryService {
        QueryService::new(self.registry.clone(), self.store.clone(), self.policy.clone())
    }

    pub fn poller(&self) -> Arc<Poller> {
        self.poller.clone()
    }

    pub fn store(&self) -> Arc<SnapshotStore> {
        self.store.clone()
    }

    pub fn registry(&self) -> &NodeRegistry {
        &self.registry
    }

    /// Start periodic polling in the background
    pub fn start(&self) -> PollerHandle {
        self.poller.clone().spawn()
    }
}
