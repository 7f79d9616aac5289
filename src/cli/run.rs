// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 assetflow contributors

//! Run command - execute a pipeline, then serve and watch when it asks to

use colored::Colorize;
use miette::Result;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;

use super::{load_project, print_recovery};
use crate::env::load_env;
use crate::errors::AssetflowError;
use crate::pipeline::{ExecutionOptions, PipelineExecutor, ProjectValidator, TaskOutcome};
use crate::server::{DevServer, LiveReload};
use crate::watch::{FileWatcher, TaskQueue};

/// Run a pipeline by name
pub async fn run(
    pipeline_name: &str,
    config_path: Option<PathBuf>,
    dry_run: bool,
    verbose: bool,
) -> Result<()> {
    let (root, config) = load_project(config_path.as_deref())?;
    let pipeline = config.pipeline(pipeline_name)?.clone();

    // Validate configuration
    let validation = ProjectValidator::validate(&config, &root);
    if !validation.is_valid() {
        eprintln!("{}", "Configuration is invalid:".red().bold());
        for error in &validation.errors {
            eprintln!("  {} {}", "✗".red(), error);
        }
        return Err(miette::miette!("Configuration is invalid"));
    }

    if validation.has_warnings() && verbose {
        eprintln!("{}", "Configuration warnings:".yellow().bold());
        for warning in &validation.warnings {
            eprintln!("  {} {}", "⚠".yellow(), warning);
        }
        eprintln!();
    }

    let env = load_env(&root.join(&config.env_file))?;
    let reload = LiveReload::new(&DevServer::served_root(&config, &root));

    let mut executor = PipelineExecutor::for_project(&config);
    if pipeline.serve {
        executor.add_notifier(Arc::new(reload.clone()));
    }

    // Missing tools are fatal only for tasks that cannot recover
    let missing_tools = executor.check_tools(&config, &pipeline, &root);
    if !missing_tools.is_empty() {
        eprintln!("{}", "Missing tools:".yellow().bold());
        for tool in &missing_tools {
            eprintln!("  {} {}", "⚠".yellow(), tool);
        }
    }

    let options = ExecutionOptions { dry_run, verbose };
    let result = match executor
        .execute(&config, &pipeline, &root, &env, &options)
        .await
    {
        Ok(result) => result,
        Err(error) => {
            print_recovery(&error);
            return Err(error.into());
        }
    };

    if !result.success {
        for (name, outcome) in &result.outcomes {
            if let TaskOutcome::Recovered { message, .. } = outcome {
                eprintln!("  {} {}: {}", "✗".red(), name.bold(), message.dimmed());
            }
        }
        return Err(miette::miette!("Pipeline '{}' failed", pipeline.name));
    }

    if dry_run || !(pipeline.serve || pipeline.watch) {
        return Ok(());
    }

    // Serve and watch until Ctrl+C
    println!();
    let executor = Arc::new(executor);
    let config = Arc::new(config);

    let server = pipeline
        .serve
        .then(|| DevServer::init(&config, &root, reload.clone()));

    let watcher = if pipeline.watch {
        let watcher = FileWatcher::new(&config, &root)?;
        let queue = TaskQueue::new(
            &watcher.tasks(),
            Arc::clone(&executor),
            Arc::clone(&config),
            root.clone(),
            pipeline.mode,
            env,
        )?;
        Some((watcher, queue))
    } else {
        None
    };

    let serving = optional(server.map(DevServer::serve));
    let watching = optional(watcher.map(|(watcher, queue)| watcher.run(queue)));

    tokio::select! {
        outcome = async { tokio::try_join!(serving, watching) } => {
            if let Err(error) = outcome {
                print_recovery(&error);
                return Err(error.into());
            }
        }
        _ = tokio::signal::ctrl_c() => {
            println!();
            println!("{}", "Stopped.".dimmed());
        }
    }

    Ok(())
}

/// A future that never completes when there is nothing to run
async fn optional<F>(future: Option<F>) -> Result<(), AssetflowError>
where
    F: Future<Output = Result<(), AssetflowError>>,
{
    match future {
        Some(future) => future.await,
        None => std::future::pending().await,
    }
}
