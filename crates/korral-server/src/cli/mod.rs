/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

pub mod commands;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
/// Korral CLI
///
/// Serves the multi-cluster admin API and inspects configured clusters.
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the korral server
    Serve(ConfigArgs),

    /// Connect to every configured cluster and print its version
    Clusters(ConfigArgs),
}

#[derive(Args, Clone, Debug, Default)]
pub struct ConfigArgs {
    /// Path to a TOML configuration file
    #[arg(long, short, env = "KORRAL_CONFIG")]
    pub config: Option<String>,
}

impl Commands {
    pub fn config_args(&self) -> &ConfigArgs {
        match self {
            Commands::Serve(args) | Commands::Clusters(args) => args,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_serve_with_config() {
        let cli = Cli::try_parse_from(["korral", "serve", "--config", "/etc/korral.toml"])
            .expect("valid arguments");

        assert!(matches!(cli.command, Commands::Serve(_)));
        assert_eq!(
            cli.command.config_args().config.as_deref(),
            Some("/etc/korral.toml")
        );
    }

    #[test]
    fn test_parse_clusters_without_config() {
        let cli = Cli::try_parse_from(["korral", "clusters"]).expect("valid arguments");
        assert!(matches!(cli.command, Commands::Clusters(_)));
    }

    #[test]
    fn test_subcommand_is_required() {
        assert!(Cli::try_parse_from(["korral"]).is_err());
    }
}
