// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 assetflow contributors

//! CLI command definitions and handlers
//!
//! Defines the command-line interface for assetflow.

pub mod graph;
pub mod run;
pub mod validate;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::path::{Path, PathBuf};

use crate::errors::{AssetflowError, RecoverySuggestion};
use crate::pipeline::ProjectConfig;

/// Front-end asset pipeline
///
/// Compiles styles, bundles scripts, renders templates and serves the result
/// with live reload.
#[derive(Parser, Debug)]
#[clap(
    name = "assetflow",
    version,
    about = "Front-end asset pipeline with watch routing and a live-reload dev server",
    long_about = None,
    after_help = "Examples:\n\
        assetflow                       Build, serve and watch (dev pipeline)\n\
        assetflow build                 Production build into the output directory\n\
        assetflow compress              Compress images in place\n\
        assetflow graph build -f dot    Show the build pipeline as a graph\n\n\
        See 'assetflow <command> --help' for more information on a specific command."
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Option<Commands>,

    /// Configuration file (default: assetflow.yaml when present)
    #[clap(short, long, global = true, env = "ASSETFLOW_CONFIG", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[clap(short, long, global = true)]
    pub verbose: bool,

    /// Change to directory before executing
    #[clap(short = 'C', long, global = true, value_name = "DIR")]
    pub directory: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build, then serve and watch (default)
    Dev,

    /// Production build
    Build,

    /// Compress raster images through the remote service
    Compress,

    /// Run a named pipeline
    Run {
        /// Pipeline name
        pipeline: String,

        /// Dry run (show the execution plan only)
        #[clap(long)]
        dry_run: bool,
    },

    /// Show a pipeline as a graph
    Graph {
        /// Pipeline name
        #[clap(default_value = "build")]
        pipeline: String,

        /// Output format
        #[clap(short, long, value_enum, default_value_t = GraphFormat::Text)]
        format: GraphFormat,
    },

    /// Validate the project configuration
    Validate,
}

/// Graph output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum GraphFormat {
    Text,
    Dot,
    Mermaid,
}

/// Resolve the project root and load its configuration
pub(crate) fn load_project(config: Option<&Path>) -> miette::Result<(PathBuf, ProjectConfig)> {
    let root = std::env::current_dir()
        .map_err(|e| miette::miette!("Failed to get current directory: {}", e))?;
    let config = ProjectConfig::load(config, &root)?;
    Ok((root, config))
}

/// Print concrete recovery steps for errors that have them
pub(crate) fn print_recovery(error: &AssetflowError) {
    let suggestion = match error {
        AssetflowError::ToolNotFound { tool, .. } => RecoverySuggestion::install_tool(tool),
        AssetflowError::MissingCredential { name } => RecoverySuggestion::provide_credential(name),
        AssetflowError::CircularDependency { tasks } => {
            RecoverySuggestion::fix_circular_dependency(tasks)
        }
        _ => return,
    };
    eprintln!();
    eprint!("{}", suggestion.to_string().yellow());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_command_is_dev() {
        let cli = Cli::try_parse_from(["assetflow"]).unwrap();
        assert!(cli.command.is_none());
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli =
            Cli::try_parse_from(["assetflow", "build", "-v", "-c", "site.yaml"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::Build)));
        assert!(cli.verbose);
        assert_eq!(cli.config, Some(PathBuf::from("site.yaml")));
    }

    #[test]
    fn test_graph_format() {
        let cli = Cli::try_parse_from(["assetflow", "graph", "dev", "--format", "mermaid"]).unwrap();
        match cli.command {
            Some(Commands::Graph { pipeline, format }) => {
                assert_eq!(pipeline, "dev");
                assert_eq!(format, GraphFormat::Mermaid);
            }
            other => panic!("Expected graph command, got {other:?}"),
        }

        assert!(Cli::try_parse_from(["assetflow", "graph", "-f", "svg"]).is_err());
    }
}
