//! Registry of the nodes being monitored.
//!
//! The registry is built once from configuration and never mutated; every
//! other component refers to nodes by [`NodeId`].

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::RegistryError;

/// Stable identifier of a monitored node
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub u64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for NodeId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(NodeId)
    }
}

impl From<u64> for NodeId {
    fn from(id: u64) -> Self {
        NodeId(id)
    }
}

/// Immutable identity of a monitored node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeIdentity {
    /// Unique, stable id
    pub id: NodeId,

    /// Human readable name
    pub name: String,

    /// Address handed to the probe (`http(s)://host:port` or `file:///path`)
    pub address: String,
}

impl NodeIdentity {
    pub fn new(id: impl Into<NodeId>, name: impl Into<String>, address: impl Into<String>) -> Self {
        Self { id: id.into(), name: name.into(), address: address.into() }
    }
}

/// The configured set of nodes, in configuration order
#[derive(Debug, Clone)]
pub struct NodeRegistry {
    nodes: Vec<Arc<NodeIdentity>>,
    index: HashMap<NodeId, usize>,
    local_id: NodeId,
}

impl NodeRegistry {
    /// Build a registry, rejecting empty lists, duplicate ids and an unknown local node
    pub fn new(
        entries: impl IntoIterator<Item = NodeIdentity>,
        local_id: NodeId,
    ) -> Result<Self, RegistryError> {
        let mut nodes = Vec::new();
        let mut index = HashMap::new();

        for identity in entries {
            if index.insert(identity.id, nodes.len()).is_some() {
                return Err(RegistryError::DuplicateId(identity.id));
            }
            nodes.push(Arc::new(identity));
        }

        if nodes.is_empty() {
            return Err(RegistryError::Empty);
        }
        if !index.contains_key(&local_id) {
            return Err(RegistryError::UnknownLocalNode(local_id));
        }

        Ok(Self { nodes, index, local_id })
    }

    pub fn get(&self, id: NodeId) -> Option<&Arc<NodeIdentity>> {
        self.index.get(&id).map(|&position| &self.nodes[position])
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.index.contains_key(&id)
    }

    /// Iterate nodes in configuration order
    pub fn iter(&self) -> impl Iterator<Item = &Arc<NodeIdentity>> {
        self.nodes.iter()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Id of the node reported by the health endpoint
    pub fn local_id(&self) -> NodeId {
        self.local_id
    }
}
