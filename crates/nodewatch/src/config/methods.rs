//! Loading, writing and accessor methods for [`Config`].

use std::{env, fmt, fs, path};

use super::types::{Config, NetworkPolicy, NodeEntry, PollerSettings};
use super::validation::validate_config;
use crate::error::{ConfigError, RegistryError};
use crate::registry::{NodeIdentity, NodeRegistry};

/// Environment variable naming the config file
pub const CONFIG_ENV_VAR: &str = "NODEWATCH_CONFIG";

/// Used to ensure we are actually reading a toml file
fn normalize_toml_path(path: &path::Path) -> path::PathBuf {
    let mut path = path.to_path_buf();
    if path.extension().map(|ext| ext != "toml").unwrap_or(true) {
        path.set_extension("toml");
    }
    path
}

/// Get default config path ($XDG_CONFIG_HOME/nodewatch/config.toml or
/// $HOME/.config/...)
fn default_config_path() -> Result<path::PathBuf, ConfigError> {
    let path = if let Ok(config_home) = env::var("XDG_CONFIG_HOME") {
        path::PathBuf::from(config_home)
    } else if let Some(home_dir) = env::home_dir() {
        home_dir.join(".config")
    } else {
        return Err(ConfigError::ConfigPathUnavailable);
    };

    Ok(path.join("nodewatch/config.toml"))
}

impl fmt::Display for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let write_indented = |level: usize| {
            move |f: &mut fmt::Formatter<'_>, label: &str, value: &dyn fmt::Display| {
                writeln!(f, "  {:indent$}{}: {}", "", label, value, indent = level * 2)
            }
        };
        let write_title_indented = |level: usize| {
            move |f: &mut fmt::Formatter<'_>, label: &str| {
                writeln!(f, "{:indent$}{}", "", label, indent = level * 2)
            }
        };

        let write_title_1 = write_title_indented(1);
        let write_title_2 = write_title_indented(2);
        let write_1 = write_indented(1);
        let write_2 = write_indented(2);
        let settings = self.poller_settings();

        writeln!(f, "Current Internal Configuration State:")?;
        write_title_1(f, "Poller")?;
        write_1(f, "Interval (s)", &self.poller.interval_seconds)?;
        write_1(f, "Probe Timeout (s)", &self.poller.probe_timeout_seconds)?;
        write_1(f, "Cycle Deadline (s)", &settings.cycle_deadline.as_secs())?;
        write_title_1(f, "Network Policy")?;
        write_1(f, "Minimum Version", &self.policy.min_version)?;
        write_1(f, "Stale Threshold (s)", &self.policy.stale_threshold_seconds)?;
        write_1(f, "Minimum Peer Count", &self.policy.min_peer_count)?;
        write_title_1(f, "Server")?;
        write_1(f, "Bind Address", &self.server.bind)?;
        write_1(f, "Port", &self.server.port)?;
        write_title_1(f, "Nodes")?;
        write_1(f, "Local Node", &self.local_node_id)?;
        for node in &self.nodes {
            write_title_2(f, &format!("[{}] {}", node.id, node.name))?;
            write_2(f, "Address", &node.address)?;
        }

        Ok(())
    }
}

impl Config {
    /// Generate Config structure from file
    ///
    /// Creates a default config in ~/.config/nodewatch/config.toml
    ///  or the specified path, with the name config.toml if one does not exist.
    /// The loaded configuration is validated before it is returned.
    ///
    /// ```ignore
    /// let cfg = Config::from_config(None::<&std::path::Path>)?;
    /// println!("{}", cfg);
    /// ```
    pub fn from_config(optional_path: Option<impl AsRef<path::Path>>) -> Result<Self, ConfigError> {
        let config_path: path::PathBuf = if let Some(path) = optional_path {
            normalize_toml_path(path.as_ref())
        } else {
            default_config_path()?
        };

        let config = if config_path.exists() {
            let raw_string = fs::read_to_string(&config_path).map_err(ConfigError::ReadFailed)?;
            Self::from_toml(&raw_string)?
        } else {
            tracing::info!(path = %config_path.display(), "No config file found, writing defaults");
            let config = Self::default();
            config.write_config(&config_path)?;
            config
        };

        validate_config(&config)?;
        Ok(config)
    }

    /// Load from an explicit path, falling back to `$NODEWATCH_CONFIG` and
    /// then the default location
    pub fn load(cli_path: Option<path::PathBuf>) -> Result<Self, ConfigError> {
        let path = cli_path.or_else(|| env::var_os(CONFIG_ENV_VAR).map(path::PathBuf::from));
        Self::from_config(path)
    }

    /// Parse a configuration document without validating it
    pub fn from_toml(raw: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(raw)?)
    }

    /// Serialize and write a config to a file
    pub fn write_config(&self, path: &path::Path) -> Result<(), ConfigError> {
        let config_str: String = toml::to_string_pretty(self)?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(ConfigError::WriteFailed)?;
        }

        fs::write(path, config_str).map_err(ConfigError::WriteFailed)
    }

    /// Add a node to the registry section
    pub fn with_node(
        mut self,
        id: u64,
        name: impl Into<String>,
        address: impl Into<String>,
    ) -> Self {
        self.nodes.push(NodeEntry { id: id.into(), name: name.into(), address: address.into() });
        self
    }

    /// Replace the registry section
    pub fn with_nodes(mut self, nodes: Vec<NodeEntry>) -> Self {
        self.nodes = nodes;
        self
    }

    /// Set the local node id
    pub fn with_local_node(mut self, id: u64) -> Self {
        self.local_node_id = id.into();
        self
    }

    /// Set the fork minimum version
    pub fn with_min_version(mut self, min_version: impl Into<String>) -> Self {
        self.policy.min_version = min_version.into();
        self
    }

    pub fn network_policy(&self) -> NetworkPolicy {
        self.policy.clone().into()
    }

    pub fn poller_settings(&self) -> PollerSettings {
        (&self.poller).into()
    }

    /// Build the node registry described by this configuration
    pub fn registry(&self) -> Result<NodeRegistry, RegistryError> {
        let identities = self
            .nodes
            .iter()
            .map(|node| NodeIdentity::new(node.id, node.name.clone(), node.address.clone()));
        NodeRegistry::new(identities, self.local_node_id)
    }

    /// Socket address string for the HTTP server
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.bind, self.server.port)
    }
}
