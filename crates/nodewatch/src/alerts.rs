//! Alert derivation.
//!
//! [`AlertEngine::evaluate`] is a pure function of the observations, the
//! network policy and the evaluation time. Alerts are rebuilt from scratch
//! every cycle; their ids depend only on `(node_id, kind)` so clients can
//! follow an alert across cycles.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use chrono::{DateTime, Utc};
use semver::Version;
use serde::{Deserialize, Serialize};

use crate::config::NetworkPolicy;
use crate::registry::{NodeId, NodeRegistry};
use crate::snapshot::NodeObservation;
use crate::version::{VersionCheck, check_version, parse_version};

/// Condition an alert reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AlertKind {
    VersionOutdated,
    Stale,
    LowPeerCount,
    Offline,
}

impl AlertKind {
    fn slug(self) -> &'static str {
        match self {
            AlertKind::VersionOutdated => "version_outdated",
            AlertKind::Stale => "stale",
            AlertKind::LowPeerCount => "low_peer_count",
            AlertKind::Offline => "offline",
        }
    }
}

impl fmt::Display for AlertKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Info => write!(f, "info"),
            Severity::Warning => write!(f, "warning"),
            Severity::Critical => write!(f, "critical"),
        }
    }
}

/// A condition detected on one node during one cycle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alert {
    /// Deterministic id, `node-<id>/<kind>`
    pub id: String,

    pub node_id: NodeId,

    #[serde(rename = "type")]
    pub kind: AlertKind,

    pub message: String,

    pub severity: Severity,
}

impl Alert {
    pub fn new(node_id: NodeId, kind: AlertKind, severity: Severity, message: String) -> Self {
        Self { id: Self::id_for(node_id, kind), node_id, kind, message, severity }
    }

    pub fn id_for(node_id: NodeId, kind: AlertKind) -> String {
        format!("node-{node_id}/{kind}")
    }
}

/// Derives alerts from observations according to a [`NetworkPolicy`]
#[derive(Debug, Clone)]
pub struct AlertEngine {
    policy: NetworkPolicy,
    min_version: Option<Version>,
}

impl AlertEngine {
    pub fn new(policy: NetworkPolicy) -> Self {
        let min_version = parse_version(&policy.min_version);
        Self { policy, min_version }
    }

    pub fn policy(&self) -> &NetworkPolicy {
        &self.policy
    }

    /// Compute the alert set for one cycle, sorted by node then kind
    ///
    /// Registered nodes without an observation are evaluated as never seen.
    pub fn evaluate(
        &self,
        registry: &NodeRegistry,
        observations: &BTreeMap<NodeId, NodeObservation>,
        now: DateTime<Utc>,
    ) -> Vec<Alert> {
        let unseen = NodeObservation::default();
        let mut alerts = Vec::new();

        for node in registry.iter() {
            let observation = observations.get(&node.id).unwrap_or(&unseen);
            self.evaluate_node(node.id, observation, now, &mut alerts);
        }

        alerts.sort_by_key(|alert| (alert.node_id, alert.kind));
        alerts
    }

    fn evaluate_node(
        &self,
        node_id: NodeId,
        observation: &NodeObservation,
        now: DateTime<Utc>,
        alerts: &mut Vec<Alert>,
    ) {
        if let Some(version) = observation.version.as_deref() {
            self.check_version_rule(node_id, version, alerts);
        }

        let since_success = observation.since_last_success(now);
        if !observation.online {
            let message = match since_success {
                Some(elapsed) => format!(
                    "Node is offline, last successful probe {}s ago: {}",
                    elapsed.num_seconds(),
                    observation.last_error.as_deref().unwrap_or("no response")
                ),
                None => format!(
                    "Node has never responded: {}",
                    observation.last_error.as_deref().unwrap_or("not probed yet")
                ),
            };
            alerts.push(Alert::new(node_id, AlertKind::Offline, Severity::Critical, message));
            return;
        }

        let threshold = self.policy.stale_threshold;
        if let Some(elapsed) = since_success {
            if elapsed.to_std().is_ok_and(|elapsed| elapsed > threshold) {
                alerts.push(Alert::new(
                    node_id,
                    AlertKind::Stale,
                    Severity::Warning,
                    format!(
                        "Last successful probe {}s ago exceeds the {}s threshold",
                        elapsed.num_seconds(),
                        threshold.as_secs()
                    ),
                ));
            }
        }

        if let Some(peer_count) = observation.peer_count {
            if peer_count < self.policy.min_peer_count {
                alerts.push(Alert::new(
                    node_id,
                    AlertKind::LowPeerCount,
                    Severity::Warning,
                    format!(
                        "Node has {peer_count} peers, minimum is {}",
                        self.policy.min_peer_count
                    ),
                ));
            }
        }
    }

    fn check_version_rule(&self, node_id: NodeId, version: &str, alerts: &mut Vec<Alert>) {
        let min_version = &self.policy.min_version;
        let alert = match self.min_version.as_ref().map(|minimum| check_version(version, minimum)) {
            Some(VersionCheck::Current) => None,
            Some(VersionCheck::Outdated) => Some((
                Severity::Warning,
                format!("Node is behind network version: runs {version}, minimum is {min_version}"),
            )),
            Some(VersionCheck::Unparseable) | None => Some((
                Severity::Info,
                format!("Cannot compare node version {version:?} with minimum {min_version}"),
            )),
        };

        if let Some((severity, message)) = alert {
            alerts.push(Alert::new(node_id, AlertKind::VersionOutdated, severity, message));
        }
    }
}

/// Alert ids that appeared or disappeared between two cycles
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AlertTransitions {
    pub raised: Vec<Alert>,
    pub cleared: Vec<Alert>,
}

impl AlertTransitions {
    pub fn is_empty(&self) -> bool {
        self.raised.is_empty() && self.cleared.is_empty()
    }
}

/// Diff two alert sets by alert id
///
/// An alert whose severity changed (e.g. an unparseable version becoming
/// outdated) counts as cleared and raised again.
pub fn diff_alerts(previous: &[Alert], current: &[Alert]) -> AlertTransitions {
    let before: HashMap<&str, &Alert> =
        previous.iter().map(|alert| (alert.id.as_str(), alert)).collect();
    let after: HashMap<&str, &Alert> =
        current.iter().map(|alert| (alert.id.as_str(), alert)).collect();

    let raised = current
        .iter()
        .filter(|alert| before.get(alert.id.as_str()).map_or(true, |old| old.severity != alert.severity))
        .cloned()
        .collect();
    let cleared = previous
        .iter()
        .filter(|alert| after.get(alert.id.as_str()).map_or(true, |new| new.severity != alert.severity))
        .cloned()
        .collect();

    AlertTransitions { raised, cleared }
}
