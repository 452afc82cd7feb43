//! Snapshot store: the single published view of node observations and alerts.
//!
//! There is exactly one writer (the poller) and any number of readers.
//! Observations and the alerts computed from them are swapped in together as
//! one immutable [`Snapshot`]; readers load it without taking a lock.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use arc_swap::ArcSwapOption;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::watch;
use tracing::warn;

use crate::alerts::Alert;
use crate::probe::ProbeReport;
use crate::registry::NodeId;

/// Latest known state of one node
///
/// The default value describes a node that has never been probed: offline
/// with every field unknown.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeObservation {
    /// Software version reported by the node
    pub version: Option<String>,

    /// Chain tip height reported by the node
    pub block_height: Option<u64>,

    /// Number of connected peers reported by the node
    pub peer_count: Option<u32>,

    /// Whether the most recent probe succeeded
    pub online: bool,

    /// Time of the last successful probe
    #[serde(rename = "last_successful_probe")]
    pub last_success: Option<DateTime<Utc>>,

    /// Time of the last probe attempt, successful or not
    pub last_probe: Option<DateTime<Utc>>,

    /// Error of the last probe, cleared on success
    pub last_error: Option<String>,

    /// Round-trip time of the last successful probe
    pub latency_ms: Option<u64>,

    /// Last health entry exactly as the node reported it
    #[serde(skip)]
    pub raw: Option<Value>,
}

impl NodeObservation {
    /// Observation for a successful probe
    ///
    /// When the node timestamps its own data, that time (never later than
    /// `at`) is the last success, so a node serving an old entry goes stale.
    pub fn online(report: ProbeReport, latency: Duration, at: DateTime<Utc>) -> Self {
        let last_success = report.observed_at.map_or(at, |observed| observed.min(at));

        Self {
            version: Some(report.version),
            block_height: Some(report.block_height),
            peer_count: Some(report.peer_count),
            online: true,
            last_success: Some(last_success),
            last_probe: Some(at),
            last_error: None,
            latency_ms: Some(latency.as_millis() as u64),
            raw: report.raw,
        }
    }

    /// Carry this observation forward after a failed probe
    ///
    /// Last known values and the last success time are kept so staleness
    /// stays measurable.
    pub fn offline(mut self, error: String, at: DateTime<Utc>) -> Self {
        self.online = false;
        self.last_probe = Some(at);
        self.last_error = Some(error);
        self.latency_ms = None;
        self
    }

    /// Time elapsed since the last successful probe, if there ever was one
    pub fn since_last_success(&self, now: DateTime<Utc>) -> Option<chrono::Duration> {
        self.last_success.map(|at| now.signed_duration_since(at))
    }
}

/// Immutable published state of one polling cycle
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    /// Publication sequence number, starting at 1
    pub cycle: u64,

    /// Time the cycle's results were collected
    pub as_of: DateTime<Utc>,

    pub observations: BTreeMap<NodeId, NodeObservation>,

    pub alerts: Vec<Alert>,
}

impl Snapshot {
    pub fn observation(&self, id: NodeId) -> Option<&NodeObservation> {
        self.observations.get(&id)
    }

    /// Alerts raised for a single node
    pub fn alerts_for(&self, id: NodeId) -> impl Iterator<Item = &Alert> {
        self.alerts.iter().filter(move |alert| alert.node_id == id)
    }
}

/// Holder of the currently visible [`Snapshot`]
pub struct SnapshotStore {
    current: ArcSwapOption<Snapshot>,
    publish_lock: Mutex<()>,
    cycle_tx: watch::Sender<u64>,
}

impl Default for SnapshotStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SnapshotStore {
    pub fn new() -> Self {
        let (cycle_tx, _cycle_rx) = watch::channel(0);
        Self { current: ArcSwapOption::empty(), publish_lock: Mutex::new(()), cycle_tx }
    }

    /// Atomically replace the visible snapshot
    ///
    /// The new snapshot gets the next cycle number. `as_of` is clamped to the
    /// previous snapshot's timestamp so readers never see time run backwards.
    pub fn publish(
        &self,
        observations: BTreeMap<NodeId, NodeObservation>,
        alerts: Vec<Alert>,
        as_of: DateTime<Utc>,
    ) -> Arc<Snapshot> {
        let _guard = self.publish_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let previous = self.current.load_full();

        let (cycle, as_of) = match previous.as_deref() {
            Some(prev) if as_of < prev.as_of => {
                warn!(
                    cycle = prev.cycle + 1,
                    previous = %prev.as_of,
                    requested = %as_of,
                    "Clock moved backwards, keeping previous snapshot timestamp"
                );
                (prev.cycle + 1, prev.as_of)
            }
            Some(prev) => (prev.cycle + 1, as_of),
            None => (1, as_of),
        };

        let snapshot = Arc::new(Snapshot { cycle, as_of, observations, alerts });
        self.current.store(Some(snapshot.clone()));
        self.cycle_tx.send_replace(cycle);

        snapshot
    }

    /// The most recently published snapshot, `None` before the first publication
    pub fn current(&self) -> Option<Arc<Snapshot>> {
        self.current.load_full()
    }

    pub fn is_initialized(&self) -> bool {
        self.current.load().is_some()
    }

    /// Receive the cycle number of every publication
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.cycle_tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alerts::{AlertKind, Severity};
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    fn observations(height: u64) -> BTreeMap<NodeId, NodeObservation> {
        let report = ProbeReport::new("v1.2.0", height, 8);
        BTreeMap::from([(NodeId(1), NodeObservation::online(report, Duration::from_millis(5), at(0)))])
    }

    #[test]
    fn test_store_starts_uninitialized() {
        let store = SnapshotStore::new();
        assert!(store.current().is_none());
        assert!(!store.is_initialized());
        assert_eq!(*store.subscribe().borrow(), 0);
    }

    #[test]
    fn test_online_uses_node_timestamp_for_last_success() {
        let latency = Duration::from_millis(5);

        let old = NodeObservation::online(ProbeReport::new("v1.2.0", 1, 8).observed_at(at(-600)), latency, at(0));
        assert!(old.online);
        assert_eq!(old.last_success, Some(at(-600)));
        assert_eq!(old.last_probe, Some(at(0)));

        let ahead = NodeObservation::online(ProbeReport::new("v1.2.0", 1, 8).observed_at(at(60)), latency, at(0));
        assert_eq!(ahead.last_success, Some(at(0)));

        let raw = serde_json::json!({"overall_health": "healthy"});
        let kept = NodeObservation::online(ProbeReport::new("v1.2.0", 1, 8).with_raw(raw.clone()), latency, at(0))
            .offline("timed out".into(), at(30));
        assert_eq!(kept.raw, Some(raw));
        assert!(serde_json::to_value(&kept).unwrap().get("raw").is_none());
    }

    #[test]
    fn test_publish_assigns_increasing_cycles() {
        let store = SnapshotStore::new();
        let mut rx = store.subscribe();

        let first = store.publish(observations(100), Vec::new(), at(0));
        let second = store.publish(observations(101), Vec::new(), at(30));

        assert_eq!(first.cycle, 1);
        assert_eq!(second.cycle, 2);
        assert_eq!(store.current().unwrap().cycle, 2);
        assert_eq!(store.current().unwrap().observation(NodeId(1)).unwrap().block_height, Some(101));
        assert!(rx.has_changed().unwrap());
        assert_eq!(*rx.borrow_and_update(), 2);
    }

    #[test]
    fn test_publish_clamps_backwards_clock() {
        let store = SnapshotStore::new();
        store.publish(observations(100), Vec::new(), at(60));
        let snapshot = store.publish(observations(101), Vec::new(), at(10));

        assert_eq!(snapshot.as_of, at(60));
        assert_eq!(snapshot.cycle, 2);
    }

    #[test]
    fn test_readers_keep_their_snapshot() {
        let store = SnapshotStore::new();
        store.publish(observations(100), Vec::new(), at(0));
        let held = store.current().unwrap();

        store.publish(observations(200), Vec::new(), at(30));

        assert_eq!(held.observation(NodeId(1)).unwrap().block_height, Some(100));
        assert_eq!(store.current().unwrap().observation(NodeId(1)).unwrap().block_height, Some(200));
    }

    #[test]
    fn test_offline_preserves_last_success() {
        let online = observations(100).remove(&NodeId(1)).unwrap();
        let offline = online.clone().offline("connection refused".into(), at(45));

        assert!(!offline.online);
        assert_eq!(offline.last_success, online.last_success);
        assert_eq!(offline.last_probe, Some(at(45)));
        assert_eq!(offline.version.as_deref(), Some("v1.2.0"));
        assert_eq!(offline.since_last_success(at(45)), Some(chrono::Duration::seconds(45)));
    }

    #[test]
    fn test_alerts_for_filters_by_node() {
        let store = SnapshotStore::new();
        let alerts = vec![
            Alert::new(NodeId(1), AlertKind::LowPeerCount, Severity::Warning, "low".into()),
            Alert::new(NodeId(2), AlertKind::Offline, Severity::Critical, "down".into()),
        ];
        let snapshot = store.publish(observations(1), alerts, at(0));

        let kinds: Vec<AlertKind> = snapshot.alerts_for(NodeId(2)).map(|alert| alert.kind).collect();
        assert_eq!(kinds, vec![AlertKind::Offline]);
    }
}
