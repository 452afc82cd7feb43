mod health;
mod nodes;

macros_utils::routes! {
    route health::index_route,
    route health::health_route,
    route health::health_raw_route,
    route health::health_history_route,
    route health::status_route,
    route nodes::list_nodes_route,
    route nodes::get_node_route,
    route nodes::list_alerts_route,
    route nodes::min_version_route,
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::collections::BTreeMap;
    use std::sync::Arc;
    use std::time::Duration;

    use chrono::Utc;
    use nodewatch::{
        Alert, AlertKind, NetworkPolicy, NodeId, NodeIdentity, NodeObservation, NodeRegistry,
        ProbeReport, QueryService, Severity, SnapshotStore,
    };

    /// Two node service; node 1 is local
    pub fn service() -> (QueryService, Arc<SnapshotStore>) {
        let registry = NodeRegistry::new(
            vec![
                NodeIdentity::new(1, "Node A", "http://10.0.0.1:3033"),
                NodeIdentity::new(2, "Node B", "http://10.0.0.2:3033"),
            ],
            NodeId(1),
        )
        .unwrap();
        let store = Arc::new(SnapshotStore::new());
        let policy = Arc::new(NetworkPolicy::default());

        (QueryService::new(Arc::new(registry), store.clone(), policy), store)
    }

    /// Node 1 online with v1.2.0, node 2 offline with a critical alert
    pub fn publish(store: &SnapshotStore) {
        let raw = serde_json::json!({
            "overall_health": "healthy",
            "node": {"version": "v1.2.0", "network": "mainnet"},
            "chain": {"block_height": 1_234_567},
            "peers": {"count": 12},
        });
        let report = ProbeReport::new("v1.2.0", 1_234_567, 12).with_raw(raw);
        let now = Utc::now();
        let observations = BTreeMap::from([
            (NodeId(1), NodeObservation::online(report, Duration::from_millis(4), now)),
            (NodeId(2), NodeObservation::default().offline("connection refused".into(), now)),
        ]);
        let alerts = vec![Alert::new(
            NodeId(2),
            AlertKind::Offline,
            Severity::Critical,
            "Node B never responded".to_string(),
        )];

        store.publish(observations, alerts, now);
    }
}
