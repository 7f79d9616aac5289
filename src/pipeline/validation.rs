// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 assetflow contributors

//! Project validation
//!
//! Validates configuration before anything runs.

use std::collections::HashSet;
use std::path::Path;

use crate::errors::AssetflowError;
use crate::pipeline::{AdapterSpec, DagBuilder, ProjectConfig, Task};
use crate::utils::globs::PatternSet;

/// Project validator
pub struct ProjectValidator;

impl ProjectValidator {
    /// Validate a project configuration
    pub fn validate(config: &ProjectConfig, root: &Path) -> ValidationResult {
        let mut result = ValidationResult::new();

        if config.tasks.is_empty() {
            result.add_error("No tasks defined");
        }

        // Check for duplicate names
        let mut seen_tasks = HashSet::new();
        for task in &config.tasks {
            if !seen_tasks.insert(task.name.as_str()) {
                result.add_error(&format!("Duplicate task name: '{}'", task.name));
            }
        }
        let mut seen_pipelines = HashSet::new();
        for pipeline in &config.pipelines {
            if !seen_pipelines.insert(pipeline.name.as_str()) {
                result.add_error(&format!("Duplicate pipeline name: '{}'", pipeline.name));
            }
        }

        for task in &config.tasks {
            Self::validate_task(task, config, &mut result);
        }

        // Validate each pipeline's graph (unknown members, cycles)
        for pipeline in &config.pipelines {
            if pipeline.tasks.is_empty() {
                result.add_error(&format!("Pipeline '{}' has no tasks", pipeline.name));
                continue;
            }
            let mut members = HashSet::new();
            let duplicates: Vec<&str> = pipeline
                .tasks
                .iter()
                .filter(|t| !members.insert(t.as_str()))
                .map(String::as_str)
                .collect();
            if !duplicates.is_empty() {
                for task in duplicates {
                    result.add_error(&format!(
                        "Pipeline '{}' lists task '{}' more than once",
                        pipeline.name, task
                    ));
                }
                continue;
            }
            match DagBuilder::build(config, pipeline, root) {
                Ok(_) => {}
                Err(AssetflowError::CircularDependency { tasks }) => {
                    result.add_error(&format!(
                        "Pipeline '{}': circular dependency: {}",
                        pipeline.name,
                        tasks.join(" → ")
                    ));
                }
                Err(AssetflowError::UnknownTask { task }) => {
                    result.add_error(&format!(
                        "Pipeline '{}' lists unknown task '{}'",
                        pipeline.name, task
                    ));
                }
                // Reported per task above
                Err(AssetflowError::UnknownDependency { .. }) => {}
                Err(e) => {
                    result.add_error(&format!("Pipeline '{}': {}", pipeline.name, e));
                }
            }
        }

        Self::validate_watch(config, &mut result);

        result
    }

    /// Validate a single task
    fn validate_task(task: &Task, config: &ProjectConfig, result: &mut ValidationResult) {
        for dep in &task.depends_on {
            if config.get_task(dep).is_none() {
                result.add_error(&format!(
                    "Task '{}' depends on unknown task '{}'",
                    task.name, dep
                ));
            }
        }

        if let Err(e) = PatternSet::from_mixed(&task.input) {
            result.add_error(&format!("Task '{}': {}", task.name, e));
        }

        let needs_input = matches!(
            task.adapter,
            AdapterSpec::Images { .. } | AdapterSpec::Icons | AdapterSpec::Copy { .. }
        );
        if needs_input && task.include_patterns().next().is_none() {
            result.add_error(&format!("Task '{}': input list is empty", task.name));
        }

        let production_output =
            matches!(task.adapter, AdapterSpec::Clean | AdapterSpec::Copy { .. });
        if production_output && task.output != config.output_dir {
            result.add_warning(&format!(
                "Task '{}' writes to '{}' but output_dir is '{}'",
                task.name,
                task.output.display(),
                config.output_dir.display()
            ));
        }

        match &task.adapter {
            AdapterSpec::Libs { files } if files.is_empty() => {
                result.add_warning(&format!("Task '{}': no library files listed", task.name));
            }
            AdapterSpec::Copy { base } => {
                if let Some(outside) = task
                    .include_patterns()
                    .find(|p| !Path::new(p).starts_with(base))
                {
                    result.add_error(&format!(
                        "Task '{}': '{}' is outside the copy base '{}'",
                        task.name,
                        outside,
                        base.display()
                    ));
                }
            }
            _ => {}
        }
    }

    /// Validate watch routing
    fn validate_watch(config: &ProjectConfig, result: &mut ValidationResult) {
        if config.watch.poll_interval_ms == 0 {
            result.add_error("watch.poll_interval_ms must be greater than zero");
        }

        let mut bound = HashSet::new();
        for (i, rule) in config.watch.rules.iter().enumerate() {
            if config.get_task(&rule.task).is_none() {
                result.add_error(&format!(
                    "Watch rule {} routes to unknown task '{}'",
                    i + 1,
                    rule.task
                ));
            }
            if rule.patterns.is_empty() {
                result.add_error(&format!("Watch rule {} has no patterns", i + 1));
            }
            if let Err(e) = PatternSet::new(&rule.patterns, &rule.exclude) {
                result.add_error(&format!("Watch rule {}: {}", i + 1, e));
            }
            if !bound.insert(rule.task.as_str()) {
                result.add_warning(&format!(
                    "Task '{}' is bound by more than one watch rule",
                    rule.task
                ));
            }
        }
    }

    /// Check that files the tasks read directly exist (runtime validation)
    pub fn validate_files(config: &ProjectConfig, root: &Path) -> Vec<String> {
        let mut missing = Vec::new();

        for task in &config.tasks {
            let files: Vec<&Path> = match &task.adapter {
                AdapterSpec::Scripts { entry, .. } | AdapterSpec::Styles { entry, .. } => {
                    vec![entry.as_path()]
                }
                AdapterSpec::Libs { files } => files.iter().map(|f| f.as_path()).collect(),
                AdapterSpec::Templates { root: dir, .. } => vec![dir.as_path()],
                _ => vec![],
            };

            for file in files {
                if !root.join(file).exists() {
                    missing.push(format!(
                        "Task '{}': {} not found",
                        task.name,
                        file.display()
                    ));
                }
            }
        }

        missing
    }
}

/// Result of project validation
#[derive(Debug, Default)]
pub struct ValidationResult {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_error(&mut self, message: &str) {
        self.errors.push(message.to_string());
    }

    pub fn add_warning(&mut self, message: &str) {
        self.warnings.push(message.to_string());
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}
