//! Node probes.
//!
//! A [`NodeQuery`] performs one health round-trip against a node address.
//! Timeouts are enforced by the caller; implementations only need to be
//! cancel-safe, since a probe future is dropped when it runs over.

pub mod health_log;
pub mod http;

use std::time::Duration;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use url::Url;

pub use health_log::HealthLogQuery;
pub use http::HttpNodeQuery;

/// Data returned by a successful probe
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeReport {
    pub version: String,
    pub block_height: u64,
    pub peer_count: u32,

    /// When the node itself produced this data, if it says so
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed_at: Option<DateTime<Utc>>,

    /// Health entry exactly as the node reported it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw: Option<Value>,
}

impl ProbeReport {
    pub fn new(version: impl Into<String>, block_height: u64, peer_count: u32) -> Self {
        Self { version: version.into(), block_height, peer_count, observed_at: None, raw: None }
    }

    pub fn observed_at(mut self, at: DateTime<Utc>) -> Self {
        self.observed_at = Some(at);
        self
    }

    pub fn with_raw(mut self, raw: Value) -> Self {
        self.raw = Some(raw);
        self
    }
}

/// Parse a node supplied timestamp
///
/// RFC 3339 is preferred; timestamps without an offset are taken as UTC.
pub(crate) fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    DateTime::parse_from_rfc3339(value)
        .map(|at| at.with_timezone(&Utc))
        .ok()
        .or_else(|| NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f").ok().map(|at| at.and_utc()))
}

/// Reasons a probe can fail
///
/// None of these escape the poller: a failed probe turns into an offline
/// observation for that node.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProbeError {
    #[error("Probe timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Unsupported node address: {0}")]
    UnsupportedAddress(String),
}

/// Capability to query one node's health
#[async_trait::async_trait]
pub trait NodeQuery: Send + Sync {
    /// Probe the node at `address`
    async fn probe(&self, address: &str) -> Result<ProbeReport, ProbeError>;
}

/// Kind of probe an address calls for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressKind {
    Http,
    HealthLog,
}

impl AddressKind {
    pub fn of(address: &str) -> Option<Self> {
        match Url::parse(address).ok()?.scheme() {
            "http" | "https" => Some(AddressKind::Http),
            "file" => Some(AddressKind::HealthLog),
            _ => None,
        }
    }
}

/// Routes each address to the probe matching its scheme
pub struct ProbeDispatcher {
    http: HttpNodeQuery,
    health_log: HealthLogQuery,
}

impl ProbeDispatcher {
    pub fn new(timeout: Duration) -> Result<Self, ProbeError> {
        Ok(Self { http: HttpNodeQuery::new(timeout)?, health_log: HealthLogQuery::new() })
    }
}

#[async_trait::async_trait]
impl NodeQuery for ProbeDispatcher {
    async fn probe(&self, address: &str) -> Result<ProbeReport, ProbeError> {
        let query: &dyn NodeQuery = match AddressKind::of(address) {
            Some(AddressKind::Http) => &self.http,
            Some(AddressKind::HealthLog) => &self.health_log,
            None => return Err(ProbeError::UnsupportedAddress(address.to_string())),
        };

        query.probe(address).await
    }
}
