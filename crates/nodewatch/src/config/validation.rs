//! Configuration validation.
//!
//! Individual checks return `anyhow` errors; [`validate_config`] folds the
//! first failure into [`ConfigError::Invalid`].

use anyhow::{Result, anyhow};
use url::Url;

use super::types::{Config, NodeEntry};
use crate::error::ConfigError;
use crate::version::parse_version;

/// Validate a whole configuration, including the node registry
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    validate_sections(config).map_err(|err| ConfigError::Invalid(format!("{err:#}")))?;
    config.registry()?;
    Ok(())
}

fn validate_sections(config: &Config) -> Result<()> {
    validate_poll_interval(config.poller.interval_seconds)?;
    validate_timeout(config.poller.probe_timeout_seconds)?;

    if let Some(deadline) = config.poller.cycle_deadline_seconds {
        if deadline < config.poller.probe_timeout_seconds {
            return Err(anyhow!(
                "Cycle deadline ({}s) must not be shorter than the probe timeout ({}s)",
                deadline,
                config.poller.probe_timeout_seconds
            ));
        }
    }

    validate_min_version(&config.policy.min_version)?;

    for node in &config.nodes {
        validate_node(node)?;
    }

    Ok(())
}

/// Validate poll interval
pub fn validate_poll_interval(interval_seconds: u64) -> Result<()> {
    const MIN_INTERVAL: u64 = 1;
    const MAX_INTERVAL: u64 = 86400; // 24 hours

    if !(MIN_INTERVAL..=MAX_INTERVAL).contains(&interval_seconds) {
        return Err(anyhow!(
            "Poll interval out of range: {} seconds (allowed: {}..={})",
            interval_seconds,
            MIN_INTERVAL,
            MAX_INTERVAL
        ));
    }

    Ok(())
}

/// Validate timeout is reasonable
pub fn validate_timeout(timeout_seconds: u64) -> Result<()> {
    const MIN_TIMEOUT: u64 = 1;
    const MAX_TIMEOUT: u64 = 300; // 5 minutes

    if timeout_seconds < MIN_TIMEOUT {
        return Err(anyhow!(
            "Timeout too short: {} seconds (minimum: {})",
            timeout_seconds,
            MIN_TIMEOUT
        ));
    }

    if timeout_seconds > MAX_TIMEOUT {
        return Err(anyhow!(
            "Timeout too long: {} seconds (maximum: {})",
            timeout_seconds,
            MAX_TIMEOUT
        ));
    }

    Ok(())
}

fn validate_min_version(min_version: &str) -> Result<()> {
    parse_version(min_version)
        .map(|_| ())
        .ok_or_else(|| anyhow!("Minimum version is not a semantic version: {:?}", min_version))
}

/// Validate a node entry's name and address
pub fn validate_node(node: &NodeEntry) -> Result<()> {
    if node.name.trim().is_empty() {
        return Err(anyhow!("Node {} has an empty name", node.id));
    }

    let url = Url::parse(&node.address)
        .map_err(|e| anyhow!("Node {} has an invalid address {:?}: {}", node.id, node.address, e))?;

    match url.scheme() {
        "http" | "https" => {
            if url.host_str().is_none() {
                return Err(anyhow!("Node {} address has no host", node.id));
            }
            if url.port() == Some(0) {
                return Err(anyhow!("Port 0 is not valid"));
            }
        }
        "file" => {
            if url.path().len() <= 1 {
                return Err(anyhow!("Node {} health log path is empty", node.id));
            }
        }
        other => {
            return Err(anyhow!("Unsupported address scheme for node {}: {}", node.id, other));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::NodeId;

    fn node(address: &str) -> NodeEntry {
        NodeEntry { id: NodeId(1), name: "Node A".into(), address: address.into() }
    }

    fn config() -> Config {
        Config::default()
            .with_nodes(Vec::new())
            .with_node(1, "Node A", "http://10.0.0.1:3033")
            .with_node(2, "Node B", "file:///var/log/node/health.log")
    }

    #[test]
    fn test_validate_node_addresses() {
        assert!(validate_node(&node("http://example.com:3033")).is_ok());
        assert!(validate_node(&node("https://node.example.com")).is_ok());
        assert!(validate_node(&node("file:///home/user/health.log")).is_ok());

        assert!(validate_node(&node("ftp://example.com")).is_err());
        assert!(validate_node(&node("not a url")).is_err());
        assert!(validate_node(&node("http://example.com:0")).is_err());
        assert!(validate_node(&node("file:///")).is_err());
        assert!(validate_node(&NodeEntry { name: "  ".into(), ..node("http://example.com") }).is_err());
    }

    #[test]
    fn test_validate_intervals() {
        assert!(validate_poll_interval(30).is_ok());
        assert!(validate_poll_interval(0).is_err());
        assert!(validate_poll_interval(100000).is_err());

        assert!(validate_timeout(5).is_ok());
        assert!(validate_timeout(0).is_err());
        assert!(validate_timeout(301).is_err());
    }

    #[test]
    fn test_validate_config() {
        assert!(validate_config(&config()).is_ok());

        let mut short_deadline = config();
        short_deadline.poller.cycle_deadline_seconds = Some(1);
        short_deadline.poller.probe_timeout_seconds = 5;
        assert!(matches!(validate_config(&short_deadline), Err(ConfigError::Invalid(_))));

        let bad_version = config().with_min_version("latest");
        assert!(matches!(validate_config(&bad_version), Err(ConfigError::Invalid(_))));

        let unknown_local = config().with_local_node(9);
        assert!(matches!(validate_config(&unknown_local), Err(ConfigError::Registry(_))));

        let duplicate = config().with_node(2, "Node B again", "http://10.0.0.9:3033");
        assert!(matches!(validate_config(&duplicate), Err(ConfigError::Registry(_))));
    }
}
