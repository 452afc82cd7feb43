//! Read-only query surface over the latest snapshot.
//!
//! Every call loads the current snapshot once and answers from it, so a
//! single response never mixes two cycles.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::alerts::{Alert, Severity};
use crate::config::NetworkPolicy;
use crate::error::QueryError;
use crate::probe::{AddressKind, HealthLogQuery};
use crate::registry::{NodeId, NodeIdentity, NodeRegistry};
use crate::snapshot::{NodeObservation, Snapshot, SnapshotStore};

/// Health summary of a single node
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthView {
    pub node_version: Option<String>,
    pub block_height: Option<u64>,
    pub peer_count: Option<u32>,
    pub online_status: bool,
}

/// A registered node joined with its latest observation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeView {
    #[serde(flatten)]
    pub identity: NodeIdentity,

    #[serde(flatten)]
    pub observation: NodeObservation,
}

/// A node with its observation and current alerts
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeDetail {
    #[serde(flatten)]
    pub node: NodeView,

    pub alerts: Vec<Alert>,
}

/// Fleet-wide health derived from the current alert set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OverallHealth {
    Healthy,
    Degraded,
    Critical,
    Unavailable,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusView {
    pub status: OverallHealth,
    pub as_of: Option<DateTime<Utc>>,
    pub cycle: Option<u64>,
}

/// Recent entries of a node's own health log, oldest first
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthHistory {
    pub count: usize,
    pub entries: Vec<Value>,
}

/// Entries returned by [`QueryService::health_history`] when no limit is given
pub const DEFAULT_HISTORY_LIMIT: usize = 100;

/// Answers read requests from the snapshot store
#[derive(Clone)]
pub struct QueryService {
    registry: Arc<NodeRegistry>,
    store: Arc<SnapshotStore>,
    policy: Arc<NetworkPolicy>,
}

impl QueryService {
    pub fn new(
        registry: Arc<NodeRegistry>,
        store: Arc<SnapshotStore>,
        policy: Arc<NetworkPolicy>,
    ) -> Self {
        Self { registry, store, policy }
    }

    /// Health of the local node
    pub fn health(&self) -> Result<HealthView, QueryError> {
        self.health_of(self.registry.local_id())
    }

    /// Health of any registered node
    pub fn health_of(&self, id: NodeId) -> Result<HealthView, QueryError> {
        if !self.registry.contains(id) {
            return Err(QueryError::NotFound(id));
        }
        let snapshot = self.store.current().ok_or(QueryError::NotInitialized)?;
        let observation = snapshot.observation(id).cloned().unwrap_or_default();

        Ok(HealthView {
            node_version: observation.version,
            block_height: observation.block_height,
            peer_count: observation.peer_count,
            online_status: observation.online,
        })
    }

    /// Last health entry of the local node exactly as it reported it
    pub fn health_raw(&self) -> Result<Value, QueryError> {
        let id = self.registry.local_id();
        let snapshot = self.store.current().ok_or(QueryError::NotInitialized)?;

        snapshot
            .observation(id)
            .and_then(|observation| observation.raw.clone())
            .ok_or_else(|| QueryError::Unavailable(format!("Node {id} has not reported a health entry")))
    }

    /// The last `limit` entries of the local node's health log
    ///
    /// Read from the node's own log on every call; only nodes with a
    /// `file://` address keep one.
    pub async fn health_history(&self, limit: usize) -> Result<HealthHistory, QueryError> {
        let id = self.registry.local_id();
        let identity = self.registry.get(id).ok_or(QueryError::NotFound(id))?;
        if AddressKind::of(&identity.address) != Some(AddressKind::HealthLog) {
            return Err(QueryError::Unavailable(format!("Node {id} has no health log")));
        }

        let entries = HealthLogQuery::new()
            .history(&identity.address, limit)
            .await
            .map_err(|err| QueryError::Unavailable(err.to_string()))?;

        Ok(HealthHistory { count: entries.len(), entries })
    }

    /// Every registered node in registry order
    pub fn list_nodes(&self) -> Vec<NodeView> {
        let snapshot = self.store.current();
        self.registry
            .iter()
            .map(|identity| Self::join(identity, snapshot.as_deref()))
            .collect()
    }

    /// One node with its alerts; `NotFound` only for ids outside the registry
    pub fn get_node(&self, id: NodeId) -> Result<NodeDetail, QueryError> {
        let identity = self.registry.get(id).ok_or(QueryError::NotFound(id))?;
        let snapshot = self.store.current();

        let alerts = snapshot
            .as_deref()
            .map(|snapshot| snapshot.alerts_for(id).cloned().collect())
            .unwrap_or_default();

        Ok(NodeDetail { node: Self::join(identity, snapshot.as_deref()), alerts })
    }

    pub fn list_alerts(&self) -> Vec<Alert> {
        self.store.current().map(|snapshot| snapshot.alerts.clone()).unwrap_or_default()
    }

    pub fn min_version(&self) -> &str {
        &self.policy.min_version
    }

    pub fn status(&self) -> StatusView {
        let Some(snapshot) = self.store.current() else {
            return StatusView { status: OverallHealth::Unavailable, as_of: None, cycle: None };
        };

        let worst = snapshot.alerts.iter().map(|alert| alert.severity).max();
        let status = match worst {
            None => OverallHealth::Healthy,
            Some(Severity::Critical) => OverallHealth::Critical,
            Some(_) => OverallHealth::Degraded,
        };

        StatusView { status, as_of: Some(snapshot.as_of), cycle: Some(snapshot.cycle) }
    }

    /// The raw current snapshot, if any
    pub fn snapshot(&self) -> Result<Arc<Snapshot>, QueryError> {
        self.store.current().ok_or(QueryError::NotInitialized)
    }

    fn join(identity: &NodeIdentity, snapshot: Option<&Snapshot>) -> NodeView {
        let observation = snapshot
            .and_then(|snapshot| snapshot.observation(identity.id))
            .cloned()
            .unwrap_or_default();

        NodeView { identity: identity.clone(), observation }
    }
}
