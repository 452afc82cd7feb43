use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "nodewatch-service", version, about = "Node fleet health monitor")]
pub struct Cli {
    /// Path to the TOML config, overrides NODEWATCH_CONFIG
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Poll continuously until interrupted
    Run,
    /// Run a single cycle and print the snapshot as JSON
    Once,
    /// Print the effective configuration
    Config,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_config_flag_after_subcommand() {
        let cli = Cli::try_parse_from(["nodewatch-service", "once", "--config", "/tmp/nw.toml"]).unwrap();
        assert_eq!(cli.command, Command::Once);
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/nw.toml")));
    }

    #[test]
    fn test_subcommand_required() {
        assert!(Cli::try_parse_from(["nodewatch-service"]).is_err());
        assert!(Cli::try_parse_from(["nodewatch-service", "run"]).unwrap().config.is_none());
    }
}
