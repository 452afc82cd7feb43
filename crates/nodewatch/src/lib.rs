//! nodewatch - health aggregation and alerting for a fleet of blockchain nodes
//!
//! A background [`Poller`] probes every registered node concurrently, the
//! [`AlertEngine`] derives alerts from the results and both are published
//! together as one immutable [`Snapshot`]. [`QueryService`] is the read-only
//! surface handed to request handlers.

pub mod alerts;
pub mod config;
pub mod error;
pub mod monitor;
pub mod poller;
pub mod probe;
pub mod query;
pub mod registry;
pub mod snapshot;
pub mod version;

// Re-export main types
pub use alerts::{Alert, AlertEngine, AlertKind, AlertTransitions, Severity};
pub use config::{Config, NetworkPolicy, PollerSettings};
pub use error::{ConfigError, QueryError, RegistryError};
pub use monitor::NodeMonitor;
pub use poller::{Poller, PollerHandle};
pub use probe::{NodeQuery, ProbeDispatcher, ProbeError, ProbeReport};
pub use query::{
    DEFAULT_HISTORY_LIMIT, HealthHistory, HealthView, NodeDetail, NodeView, OverallHealth, QueryService,
    StatusView,
};
pub use registry::{NodeId, NodeIdentity, NodeRegistry};
pub use snapshot::{NodeObservation, Snapshot, SnapshotStore};

/// Name reported by the service info endpoints
pub const SERVICE_NAME: &str = "nodewatch";

/// Default grace period granted to the poller on shutdown
pub const DEFAULT_SHUTDOWN_GRACE: std::time::Duration = std::time::Duration::from_secs(5);
