//! Configuration for nodewatch.
//!
//! Configuration is read from a TOML file once at startup and is read-only
//! afterwards. See [`Config::from_config`] for path resolution.

pub mod methods;
pub mod types;
pub mod validation;

pub use types::{Config, NetworkPolicy, NodeEntry, PollerSettings, PolicySection, PollerSection, ServerSection};
