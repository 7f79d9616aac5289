// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 assetflow contributors

//! Graph command - visualize a pipeline as a graph

use miette::Result;
use std::path::PathBuf;

use super::{load_project, GraphFormat};
use crate::pipeline::DagBuilder;

/// Run the graph command
pub async fn run(
    pipeline_name: &str,
    config_path: Option<PathBuf>,
    format: GraphFormat,
    _verbose: bool,
) -> Result<()> {
    let (root, config) = load_project(config_path.as_deref())?;
    let pipeline = config.pipeline(pipeline_name)?;

    // Build DAG
    let dag = DagBuilder::build(&config, pipeline, &root)?;

    // Output in requested format
    let output = match format {
        GraphFormat::Text => dag.to_text(&config),
        GraphFormat::Dot => dag.to_dot(),
        GraphFormat::Mermaid => dag.to_mermaid(),
    };

    println!("{}", output);

    Ok(())
}
