//! Configuration data structures.
//!
//! The `*Section` types mirror the TOML file; [`NetworkPolicy`] and
//! [`PollerSettings`] are the runtime forms handed to the engine.

use std::env;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::registry::NodeId;

/// Default health log written by a local Mintlayer node
const LOCAL_HEALTH_LOG: &str = ".mintlayer/mainnet/logs/mintlayer_health.log";

/// Fallback address of the local node when no home directory is known
const LOCAL_HEALTH_URL: &str = "http://127.0.0.1:3034";

/// Top level configuration file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Node reported by the health endpoint
    pub local_node_id: NodeId,

    #[serde(default)]
    pub poller: PollerSection,

    #[serde(default)]
    pub policy: PolicySection,

    #[serde(default)]
    pub server: ServerSection,

    #[serde(default)]
    pub nodes: Vec<NodeEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollerSection {
    pub interval_seconds: u64,
    pub probe_timeout_seconds: u64,

    /// Hard deadline for a whole cycle, defaults to the probe timeout plus one second
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cycle_deadline_seconds: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicySection {
    pub min_version: String,
    pub stale_threshold_seconds: u64,
    pub min_peer_count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    pub bind: String,
    pub port: u16,
}

/// One monitored node as written in the configuration file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeEntry {
    pub id: NodeId,
    pub name: String,
    pub address: String,
}

/// Network-wide expectations nodes are checked against
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkPolicy {
    /// Fork minimum version, semver with an optional leading `v`
    pub min_version: String,

    /// Maximum age of the last successful probe before a node is stale
    pub stale_threshold: Duration,

    pub min_peer_count: u32,
}

/// Timing of the polling loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollerSettings {
    /// Time between cycle starts
    pub interval: Duration,

    /// Per-node probe timeout
    pub probe_timeout: Duration,

    /// Hard deadline for collecting a cycle's results
    pub cycle_deadline: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            local_node_id: NodeId(1),
            poller: PollerSection::default(),
            policy: PolicySection::default(),
            server: ServerSection::default(),
            nodes: vec![NodeEntry {
                id: NodeId(1),
                name: "local".into(),
                address: default_local_address(),
            }],
        }
    }
}

impl Default for PollerSection {
    fn default() -> Self {
        Self { interval_seconds: 30, probe_timeout_seconds: 5, cycle_deadline_seconds: None }
    }
}

impl Default for PolicySection {
    fn default() -> Self {
        Self { min_version: "v1.2.0".into(), stale_threshold_seconds: 120, min_peer_count: 3 }
    }
}

impl Default for ServerSection {
    fn default() -> Self {
        Self { bind: "127.0.0.1".into(), port: 3033 }
    }
}

impl Default for NetworkPolicy {
    fn default() -> Self {
        PolicySection::default().into()
    }
}

impl Default for PollerSettings {
    fn default() -> Self {
        (&PollerSection::default()).into()
    }
}

impl From<PolicySection> for NetworkPolicy {
    fn from(section: PolicySection) -> Self {
        Self {
            min_version: section.min_version,
            stale_threshold: Duration::from_secs(section.stale_threshold_seconds),
            min_peer_count: section.min_peer_count,
        }
    }
}

impl From<&PollerSection> for PollerSettings {
    fn from(section: &PollerSection) -> Self {
        let probe_timeout = Duration::from_secs(section.probe_timeout_seconds);
        let cycle_deadline = section
            .cycle_deadline_seconds
            .map(Duration::from_secs)
            .unwrap_or(probe_timeout + Duration::from_secs(1));

        Self { interval: Duration::from_secs(section.interval_seconds), probe_timeout, cycle_deadline }
    }
}

/// Health log of a node running on this host, as a `file://` address
fn default_local_address() -> String {
    local_address(env::home_dir().as_deref())
}

fn local_address(home: Option<&Path>) -> String {
    home.and_then(|home| Url::from_file_path(home.join(LOCAL_HEALTH_LOG)).ok())
        .map(String::from)
        .unwrap_or_else(|| LOCAL_HEALTH_URL.to_string())
}
