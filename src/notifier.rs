// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 assetflow contributors

//! Task completion notifications
//!
//! The executor reports every finished task to its notifiers. The console
//! notifier prints recovered failures for the developer; the live-reload
//! hub forwards completions to connected browsers.

use colored::Colorize;
use miette::Diagnostic;

use crate::adapters::TransformOutput;
use crate::errors::AssetflowError;
use crate::pipeline::FailurePolicy;

/// Receives task results
pub trait Notifier: Send + Sync {
    /// A task finished successfully
    fn task_completed(&self, task: &str, output: &TransformOutput);

    /// A task failed and its policy allowed the pipeline to continue
    fn task_failed(&self, task: &str, policy: FailurePolicy, error: &AssetflowError);
}

/// Prints recovered failures to stderr
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn task_completed(&self, task: &str, output: &TransformOutput) {
        tracing::debug!(
            task,
            written = output.written.len(),
            unchanged = output.unchanged,
            "task completed"
        );
    }

    fn task_failed(&self, task: &str, policy: FailurePolicy, error: &AssetflowError) {
        match policy {
            FailurePolicy::Notify => {
                eprintln!();
                eprintln!("  {} {}", "✗".red().bold(), format!("{} failed", task).red().bold());
                for line in error.to_string().lines() {
                    eprintln!("    {}", line);
                }
                if let Some(help) = error.help() {
                    eprintln!("    {} {}", "help:".cyan(), help);
                }
                eprintln!("    {}", "previous output kept".dimmed());
                eprintln!();
            }
            FailurePolicy::Swallow => {
                tracing::warn!(task, "{}", error);
            }
            FailurePolicy::Fail => {}
        }
    }
}
