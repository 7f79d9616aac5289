// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 assetflow contributors

//! assetflow - Front-end asset pipeline
//!
//! Build, serve and watch web assets.

use clap::Parser;
use miette::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use assetflow::cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_env("ASSETFLOW_LOG")
                .unwrap_or_else(|_| "assetflow=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    assetflow::utils::configure_colors();

    let cli = Cli::parse();

    // Change to specified directory if provided
    if let Some(ref dir) = cli.directory {
        std::env::set_current_dir(dir).map_err(|e| {
            miette::miette!("Failed to change to directory '{}': {}", dir.display(), e)
        })?;
    }

    // Dispatch to command handlers
    match cli.command.unwrap_or(Commands::Dev) {
        Commands::Dev => assetflow::cli::run::run("dev", cli.config, false, cli.verbose).await,
        Commands::Build => assetflow::cli::run::run("build", cli.config, false, cli.verbose).await,
        Commands::Compress => {
            assetflow::cli::run::run("compress", cli.config, false, cli.verbose).await
        }
        Commands::Run { pipeline, dry_run } => {
            assetflow::cli::run::run(&pipeline, cli.config, dry_run, cli.verbose).await
        }
        Commands::Graph { pipeline, format } => {
            assetflow::cli::graph::run(&pipeline, cli.config, format, cli.verbose).await
        }
        Commands::Validate => assetflow::cli::validate::run(cli.config, cli.verbose).await,
    }
}
