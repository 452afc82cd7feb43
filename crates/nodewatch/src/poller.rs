//! Periodic polling of every registered node.
//!
//! A cycle probes all nodes concurrently, waits for every probe to finish or
//! time out (bounded by a hard cycle deadline), derives alerts and publishes
//! observations and alerts together. A failing node never fails the cycle;
//! it is recorded as offline and probed again next cycle.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::{Instant, MissedTickBehavior, interval, timeout, timeout_at};
use tracing::{debug, error, info, warn};

use crate::alerts::{AlertEngine, diff_alerts};
use crate::config::PollerSettings;
use crate::probe::{NodeQuery, ProbeError, ProbeReport};
use crate::registry::{NodeId, NodeRegistry};
use crate::snapshot::{NodeObservation, Snapshot, SnapshotStore};

type ProbeOutcome = (Result<ProbeReport, ProbeError>, Duration);

/// Polls the registry and publishes snapshots into a [`SnapshotStore`]
pub struct Poller {
    registry: Arc<NodeRegistry>,
    query: Arc<dyn NodeQuery>,
    store: Arc<SnapshotStore>,
    engine: AlertEngine,
    settings: PollerSettings,
}

impl Poller {
    pub fn new(
        registry: Arc<NodeRegistry>,
        query: Arc<dyn NodeQuery>,
        store: Arc<SnapshotStore>,
        engine: AlertEngine,
        settings: PollerSettings,
    ) -> Self {
        Self { registry, query, store, engine, settings }
    }

    pub fn settings(&self) -> &PollerSettings {
        &self.settings
    }

    /// Run one polling cycle and publish its snapshot
    pub async fn run_cycle(&self) -> Arc<Snapshot> {
        let started = Instant::now();
        let previous = self.store.current();

        let outcomes = self.probe_all(started + self.settings.cycle_deadline).await;

        let now = Utc::now();
        let observations = self.observe(previous.as_deref(), outcomes, now);
        let alerts = self.engine.evaluate(&self.registry, &observations, now);
        let snapshot = self.store.publish(observations, alerts, now);

        self.log_cycle(previous.as_deref(), &snapshot, started.elapsed());
        snapshot
    }

    /// Probe every node in parallel, collecting whatever finished by `deadline`
    async fn probe_all(&self, deadline: Instant) -> HashMap<NodeId, ProbeOutcome> {
        let probe_timeout = self.settings.probe_timeout;
        let mut tasks = JoinSet::new();

        for node in self.registry.iter() {
            let query = self.query.clone();
            let node = node.clone();

            tasks.spawn(async move {
                let started = Instant::now();
                let result = match timeout(probe_timeout, query.probe(&node.address)).await {
                    Ok(result) => result,
                    Err(_) => Err(ProbeError::Timeout(probe_timeout)),
                };
                (node.id, (result, started.elapsed()))
            });
        }

        let mut outcomes = HashMap::with_capacity(self.registry.len());
        loop {
            match timeout_at(deadline, tasks.join_next()).await {
                Ok(Some(Ok((node_id, outcome)))) => {
                    outcomes.insert(node_id, outcome);
                }
                Ok(Some(Err(join_error))) => {
                    error!("Probe task failed: {}", join_error);
                }
                Ok(None) => break,
                Err(_) => {
                    warn!(pending = tasks.len(), "Cycle deadline reached, abandoning remaining probes");
                    tasks.abort_all();
                    break;
                }
            }
        }

        outcomes
    }

    /// Turn probe outcomes into the next observation set
    ///
    /// Nodes without an outcome (abandoned at the deadline or whose task
    /// died) count as timed out.
    fn observe(
        &self,
        previous: Option<&Snapshot>,
        mut outcomes: HashMap<NodeId, ProbeOutcome>,
        now: DateTime<Utc>,
    ) -> BTreeMap<NodeId, NodeObservation> {
        let mut observations = BTreeMap::new();

        for node in self.registry.iter() {
            let last_known = || {
                previous.and_then(|snapshot| snapshot.observation(node.id)).cloned().unwrap_or_default()
            };

            let observation = match outcomes.remove(&node.id) {
                Some((Ok(report), latency)) => {
                    debug!(
                        node = %node.id,
                        version = %report.version,
                        block_height = report.block_height,
                        peers = report.peer_count,
                        latency_ms = latency.as_millis() as u64,
                        "Probe succeeded"
                    );
                    NodeObservation::online(report, latency, now)
                }
                Some((Err(err), _)) => {
                    warn!(node = %node.id, name = %node.name, "Probe failed: {}", err);
                    last_known().offline(err.to_string(), now)
                }
                None => {
                    let err = ProbeError::Timeout(self.settings.cycle_deadline);
                    warn!(node = %node.id, name = %node.name, "Probe abandoned: {}", err);
                    last_known().offline(err.to_string(), now)
                }
            };

            observations.insert(node.id, observation);
        }

        observations
    }

    fn log_cycle(&self, previous: Option<&Snapshot>, snapshot: &Snapshot, elapsed: Duration) {
        let online = snapshot.observations.values().filter(|obs| obs.online).count();
        info!(
            cycle = snapshot.cycle,
            online,
            nodes = snapshot.observations.len(),
            alerts = snapshot.alerts.len(),
            elapsed_ms = elapsed.as_millis() as u64,
            "Polling cycle published"
        );

        let previous_alerts = previous.map(|snapshot| snapshot.alerts.as_slice()).unwrap_or(&[]);
        let transitions = diff_alerts(previous_alerts, &snapshot.alerts);
        for alert in &transitions.raised {
            warn!(
                id = %alert.id,
                node = %alert.node_id,
                severity = %alert.severity,
                "Alert raised: {}",
                alert.message
            );
        }
        for alert in &transitions.cleared {
            info!(id = %alert.id, node = %alert.node_id, "Alert cleared");
        }
    }

    /// Start the periodic polling loop
    ///
    /// The first cycle starts immediately. A cycle that overruns the interval
    /// is followed directly by the next one; missed ticks are not replayed.
    /// Dropping the returned handle stops the loop.
    pub fn spawn(self: Arc<Self>) -> PollerHandle {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

        let handle = tokio::spawn(async move {
            let mut timer = interval(self.settings.interval);
            timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

            info!(
                nodes = self.registry.len(),
                interval_s = self.settings.interval.as_secs(),
                "Starting node poller"
            );

            loop {
                tokio::select! {
                    _ = timer.tick() => {}
                    _ = shutdown_rx.changed() => break,
                }

                tokio::select! {
                    _ = self.run_cycle() => {}
                    _ = shutdown_rx.changed() => {
                        info!("Shutdown requested, abandoning in-flight cycle");
                        break;
                    }
                }
            }

            info!("Node poller stopped");
        });

        PollerHandle { shutdown_tx, handle }
    }
}

/// Handle to a running polling loop
pub struct PollerHandle {
    shutdown_tx: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl PollerHandle {
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Stop the loop, waiting at most `grace` before aborting it
    pub async fn shutdown(mut self, grace: Duration) {
        let _ = self.shutdown_tx.send(true);

        if timeout(grace, &mut self.handle).await.is_err() {
            warn!(grace_ms = grace.as_millis() as u64, "Poller did not stop in time, aborting");
            self.handle.abort();
        }
    }
}
