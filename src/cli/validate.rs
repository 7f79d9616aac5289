// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 assetflow contributors

//! Validate command - check project configuration

use colored::Colorize;
use miette::Result;
use std::path::PathBuf;

use crate::pipeline::{PipelineExecutor, ProjectConfig, ProjectValidator, DEFAULT_CONFIG_FILE};
use crate::utils::{print_error, print_section, print_success, print_warning};

/// Run the validate command
pub async fn run(config_path: Option<PathBuf>, verbose: bool) -> Result<()> {
    println!("{}", "Validating project...".bold());
    println!();

    let root = std::env::current_dir()
        .map_err(|e| miette::miette!("Failed to get current directory: {}", e))?;
    let source = config_path
        .clone()
        .unwrap_or_else(|| root.join(DEFAULT_CONFIG_FILE));

    let config = match ProjectConfig::load(config_path.as_deref(), &root) {
        Ok(config) => config,
        Err(e) => {
            print_error("Failed to load configuration");
            println!();
            return Err(e.into());
        }
    };

    if source.exists() {
        print_success(&format!("{} is valid YAML", source.display()));
    } else {
        print_success(&format!("No {} found, using defaults", DEFAULT_CONFIG_FILE));
    }

    let validation = ProjectValidator::validate(&config, &root);
    let missing_files = ProjectValidator::validate_files(&config, &root);

    // Tools for every declared pipeline
    let executor = PipelineExecutor::for_project(&config);
    let mut missing_tools: Vec<String> = config
        .pipelines
        .iter()
        .flat_map(|p| executor.check_tools(&config, p, &root))
        .collect();
    missing_tools.sort();
    missing_tools.dedup();

    // Report results
    if !validation.errors.is_empty() {
        print_section("Errors");
        for error in &validation.errors {
            print_error(error);
        }
    }

    if !missing_files.is_empty() {
        print_section("Missing files");
        for missing in &missing_files {
            print_warning(missing);
        }
    }

    if !missing_tools.is_empty() {
        print_section("Missing tools");
        for tool in &missing_tools {
            print_warning(tool);
        }
    }

    if !validation.warnings.is_empty() {
        print_section("Warnings");
        for warning in &validation.warnings {
            print_warning(warning);
        }
    }

    if verbose {
        print_section("Project summary");
        println!("  Source: {}", config.source_dir.display());
        println!("  Output: {}", config.output_dir.display());
        println!("  Tasks: {}", config.tasks.len());
        for task in &config.tasks {
            let deps = if task.depends_on.is_empty() {
                String::new()
            } else {
                format!(" [after: {}]", task.depends_on.join(", "))
            };
            println!(
                "    - {} ({}, on error: {}){}",
                task.name,
                task.adapter_name(),
                task.failure_policy(),
                deps.dimmed()
            );
        }
        println!("  Pipelines: {}", config.pipelines.len());
        for pipeline in &config.pipelines {
            println!(
                "    - {} ({}): {}",
                pipeline.name,
                pipeline.mode,
                pipeline.tasks.join(", ")
            );
        }
    }

    println!();

    if !validation.is_valid() {
        return Err(miette::miette!("Configuration validation failed"));
    }

    if missing_files.is_empty() && missing_tools.is_empty() && !validation.has_warnings() {
        println!("{}", "Configuration is valid!".green().bold());
    } else {
        println!("{}", "Configuration is valid but has warnings.".yellow().bold());
    }
    Ok(())
}
