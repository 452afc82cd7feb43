//! Shared test doubles for the integration tests

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use nodewatch::{Config, NodeQuery, ProbeError, ProbeReport};

/// What a scripted node does when probed
#[derive(Debug, Clone)]
pub enum Behavior {
    Respond(ProbeReport),
    Fail(String),
    Delay(Duration, ProbeReport),
    Hang,
}

/// NodeQuery whose per-address behavior can be changed between cycles
#[derive(Default)]
pub struct ScriptedQuery {
    behaviors: Mutex<HashMap<String, Behavior>>,
    calls: AtomicUsize,
}

impl ScriptedQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, address: &str, behavior: Behavior) {
        self.behaviors.lock().unwrap().insert(address.to_string(), behavior);
    }

    pub fn with(self, address: &str, behavior: Behavior) -> Self {
        self.set(address, behavior);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl NodeQuery for ScriptedQuery {
    async fn probe(&self, address: &str) -> Result<ProbeReport, ProbeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let behavior = self.behaviors.lock().unwrap().get(address).cloned();

        match behavior {
            Some(Behavior::Respond(report)) => Ok(report),
            Some(Behavior::Fail(message)) => Err(ProbeError::Transport(message)),
            Some(Behavior::Delay(delay, report)) => {
                tokio::time::sleep(delay).await;
                Ok(report)
            }
            Some(Behavior::Hang) => {
                tokio::time::sleep(Duration::from_secs(24 * 3600)).await;
                Err(ProbeError::Transport("hung probe woke up".into()))
            }
            None => Err(ProbeError::Transport(format!("no route to {address}"))),
        }
    }
}

pub fn report(version: &str, block_height: u64, peer_count: u32) -> ProbeReport {
    ProbeReport::new(version, block_height, peer_count)
}

pub fn address(id: u64) -> String {
    format!("http://10.0.0.{id}:3033")
}

/// Config with the given node ids, node 1 local, min version v1.2.0
pub fn config(ids: &[u64]) -> Config {
    let mut config = Config::default().with_nodes(Vec::new()).with_min_version("v1.2.0");
    for &id in ids {
        config = config.with_node(id, format!("Node {id}"), address(id));
    }
    config.with_local_node(ids[0])
}
