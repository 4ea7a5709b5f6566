/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! korral command-line entry point.

use clap::Parser;
use korral_server::cli::{commands, Cli, Commands};
use korral_utils::config::Settings;
use korral_utils::telemetry;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = Settings::new(cli.command.config_args().config.clone())?;
    telemetry::init(&config.telemetry, &config.log)?;

    let result = match cli.command {
        Commands::Serve(_) => commands::serve(&config).await,
        Commands::Clusters(_) => commands::clusters(&config).await,
    };

    telemetry::shutdown();
    result
}
