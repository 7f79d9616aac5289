// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 assetflow contributors

//! Pipeline executor
//!
//! Runs a pipeline's tasks in dependency order and applies each task's
//! failure policy.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use colored::Colorize;

use crate::adapters::{create_adapters, Adapter, TaskContext, TransformOutput};
use crate::errors::AssetflowError;
use crate::notifier::{ConsoleNotifier, Notifier};
use crate::pipeline::{DagBuilder, FailurePolicy, Pipeline, ProjectConfig, Task};

/// Pipeline execution options
#[derive(Debug, Clone, Default)]
pub struct ExecutionOptions {
    /// Only show what would be done
    pub dry_run: bool,
    /// Verbose output
    pub verbose: bool,
}

/// How a task ended
#[derive(Debug, Clone)]
pub enum TaskOutcome {
    /// The adapter succeeded
    Succeeded(TransformOutput),
    /// The adapter failed and its policy let the pipeline continue
    Recovered {
        policy: FailurePolicy,
        message: String,
    },
}

impl TaskOutcome {
    pub fn is_recovered(&self) -> bool {
        matches!(self, Self::Recovered { .. })
    }
}

/// Result of executing a pipeline
#[derive(Debug)]
pub struct PipelineResult {
    /// Outcome of each task, in execution order
    pub outcomes: Vec<(String, TaskOutcome)>,
    /// Total execution time
    pub duration: Duration,
    /// False when a strict pipeline had a recovered failure
    pub success: bool,
}

impl PipelineResult {
    /// Outcome of a task, if it ran
    pub fn outcome(&self, task: &str) -> Option<&TaskOutcome> {
        self.outcomes
            .iter()
            .find(|(name, _)| name == task)
            .map(|(_, outcome)| outcome)
    }

    /// Number of tasks that recovered from an error
    pub fn recovered(&self) -> usize {
        self.outcomes.iter().filter(|(_, o)| o.is_recovered()).count()
    }
}

/// Pipeline executor
pub struct PipelineExecutor {
    /// Adapters by task name
    adapters: HashMap<String, Arc<dyn Adapter>>,
    /// Receivers of task results
    notifiers: Vec<Arc<dyn Notifier>>,
}

impl PipelineExecutor {
    /// Create an executor with no adapters
    pub fn new() -> Self {
        Self {
            adapters: HashMap::new(),
            notifiers: Vec::new(),
        }
    }

    /// Create an executor with an adapter for every task of a project and
    /// console notifications
    pub fn for_project(config: &ProjectConfig) -> Self {
        let mut executor = Self::new();
        executor.adapters = create_adapters(&config.tasks);
        executor.add_notifier(Arc::new(ConsoleNotifier));
        executor
    }

    /// Register (or replace) the adapter for a task
    pub fn register_adapter(&mut self, task: &str, adapter: Arc<dyn Adapter>) {
        self.adapters.insert(task.to_string(), adapter);
    }

    /// Add a receiver of task results
    pub fn add_notifier(&mut self, notifier: Arc<dyn Notifier>) {
        self.notifiers.push(notifier);
    }

    fn adapter(&self, task: &Task) -> Result<&Arc<dyn Adapter>, AssetflowError> {
        self.adapters
            .get(&task.name)
            .ok_or_else(|| AssetflowError::AdapterNotFound {
                adapter: task.adapter_name().to_string(),
            })
    }

    /// Execute a pipeline
    pub async fn execute(
        &self,
        config: &ProjectConfig,
        pipeline: &Pipeline,
        root: &Path,
        env: &HashMap<String, String>,
        options: &ExecutionOptions,
    ) -> Result<PipelineResult, AssetflowError> {
        let start = Instant::now();

        // Build and validate DAG
        let dag = DagBuilder::build(config, pipeline, root)?;
        let order = dag.execution_order();

        self.print_execution_plan(pipeline, &order, &dag);

        if options.dry_run {
            return Ok(PipelineResult {
                outcomes: Vec::new(),
                duration: start.elapsed(),
                success: true,
            });
        }

        let mut outcomes = Vec::with_capacity(order.len());

        for name in order {
            let task = config
                .get_task(&name)
                .ok_or_else(|| AssetflowError::UnknownTask { task: name.clone() })?;
            let ctx = TaskContext {
                task: name.clone(),
                root: root.to_path_buf(),
                mode: pipeline.mode,
                env: env.clone(),
            };

            println!("  {} {}...", "→".blue(), name);
            let task_start = Instant::now();

            let outcome = match self.run_task(task, &ctx).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    println!("  {} {} failed", "✗".red(), name.bold());
                    return Err(e);
                }
            };

            match &outcome {
                TaskOutcome::Succeeded(output) => {
                    let detail = output
                        .summary
                        .as_deref()
                        .filter(|_| options.verbose)
                        .map(|s| format!(" {}", s.dimmed()))
                        .unwrap_or_default();
                    println!(
                        "  {} {} ({:.2}s){}",
                        "✓".green(),
                        name.bold(),
                        task_start.elapsed().as_secs_f64(),
                        detail
                    );
                }
                TaskOutcome::Recovered { policy, .. } => {
                    println!(
                        "  {} {} {}",
                        "⚠".yellow(),
                        name.bold(),
                        format!("(failed, {})", policy).dimmed()
                    );
                }
            }

            outcomes.push((name, outcome));
        }

        let duration = start.elapsed();
        let recovered = outcomes.iter().filter(|(_, o)| o.is_recovered()).count();
        let success = !(pipeline.strict && recovered > 0);

        // Print summary
        println!();
        if success {
            println!(
                "{}",
                format!("Pipeline completed successfully in {:.2}s", duration.as_secs_f64())
                    .green()
            );
        } else {
            println!(
                "{}",
                format!(
                    "Pipeline failed after {:.2}s ({} task{} reported errors)",
                    duration.as_secs_f64(),
                    recovered,
                    if recovered == 1 { "" } else { "s" }
                )
                .red()
            );
        }

        Ok(PipelineResult {
            outcomes,
            duration,
            success,
        })
    }

    /// Run one task and apply its failure policy.
    ///
    /// Errors under the `fail` policy are returned; `notify` and `swallow`
    /// failures are reported to the notifiers and become
    /// [`TaskOutcome::Recovered`].
    pub async fn run_task(
        &self,
        task: &Task,
        ctx: &TaskContext,
    ) -> Result<TaskOutcome, AssetflowError> {
        let adapter = self.adapter(task)?;

        match adapter.transform(ctx).await {
            Ok(output) => {
                for notifier in &self.notifiers {
                    notifier.task_completed(&task.name, &output);
                }
                Ok(TaskOutcome::Succeeded(output))
            }
            Err(error) => {
                let policy = task.failure_policy();
                if policy == FailurePolicy::Fail {
                    return Err(error);
                }
                for notifier in &self.notifiers {
                    notifier.task_failed(&task.name, policy, &error);
                }
                Ok(TaskOutcome::Recovered {
                    policy,
                    message: error.to_string(),
                })
            }
        }
    }

    /// Print the execution plan
    fn print_execution_plan(&self, pipeline: &Pipeline, order: &[String], dag: &DagBuilder) {
        println!();
        println!("{}: {} ({})", "Pipeline".bold(), pipeline.name, pipeline.mode);
        println!("{}", "═".repeat(50));
        println!(
            "Execution plan ({} task{}):",
            order.len(),
            if order.len() == 1 { "" } else { "s" }
        );
        println!();

        for (i, name) in order.iter().enumerate() {
            let deps = dag.dependencies(name).unwrap_or_default();

            print!("  {}. {}", i + 1, name.bold());
            if !deps.is_empty() {
                print!(" {}", format!("[after: {}]", deps.join(", ")).dimmed());
            }
            println!();
        }

        println!();
    }

    /// Check that every adapter in a pipeline has its tools installed.
    ///
    /// Returns one message per task whose tools are missing.
    pub fn check_tools(
        &self,
        config: &ProjectConfig,
        pipeline: &Pipeline,
        root: &Path,
    ) -> Vec<String> {
        let mut missing = Vec::new();

        for name in &pipeline.tasks {
            let Some(task) = config.get_task(name) else {
                continue;
            };
            match self.adapter(task) {
                Ok(adapter) => {
                    if let Err(e) = adapter.check_available(root) {
                        missing.push(format!("{}: {}", name, e));
                    }
                }
                Err(e) => missing.push(format!("{}: {}", name, e)),
            }
        }

        missing
    }
}

impl Default for PipelineExecutor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Adapter that records its invocations and can be told to fail
    struct Scripted {
        calls: Arc<Mutex<Vec<String>>>,
        fail: bool,
    }

    #[async_trait]
    impl Adapter for Scripted {
        async fn transform(&self, ctx: &TaskContext) -> Result<TransformOutput, AssetflowError> {
            self.calls.lock().unwrap().push(ctx.task.clone());
            if self.fail {
                Err(AssetflowError::TransformFailed {
                    task: ctx.task.clone(),
                    message: "boom".into(),
                    help: None,
                })
            } else {
                Ok(TransformOutput::default())
            }
        }
    }

    #[derive(Default)]
    struct Counting {
        completed: AtomicUsize,
        failed: AtomicUsize,
    }

    impl Notifier for Counting {
        fn task_completed(&self, _task: &str, _output: &TransformOutput) {
            self.completed.fetch_add(1, Ordering::SeqCst);
        }

        fn task_failed(&self, _task: &str, _policy: FailurePolicy, _error: &AssetflowError) {
            self.failed.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn executor(
        config: &ProjectConfig,
        failing: &[&str],
    ) -> (PipelineExecutor, Arc<Mutex<Vec<String>>>, Arc<Counting>) {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let counting = Arc::new(Counting::default());
        let mut executor = PipelineExecutor::new();
        for task in &config.tasks {
            executor.register_adapter(
                &task.name,
                Arc::new(Scripted {
                    calls: calls.clone(),
                    fail: failing.contains(&task.name.as_str()),
                }),
            );
        }
        executor.add_notifier(counting.clone());
        (executor, calls, counting)
    }

    async fn run(
        executor: &PipelineExecutor,
        config: &ProjectConfig,
        pipeline: &str,
    ) -> Result<PipelineResult, AssetflowError> {
        let tmp = tempfile::tempdir().unwrap();
        executor
            .execute(
                config,
                config.get_pipeline(pipeline).unwrap(),
                tmp.path(),
                &HashMap::new(),
                &ExecutionOptions::default(),
            )
            .await
    }

    #[tokio::test]
    async fn test_build_runs_in_dependency_order() {
        let config = ProjectConfig::default();
        let (executor, calls, counting) = executor(&config, &[]);

        let result = run(&executor, &config, "build").await.unwrap();

        assert!(result.success);
        assert_eq!(
            *calls.lock().unwrap(),
            vec!["clean", "libs", "scripts", "styles", "templates", "icons", "copy"]
        );
        assert_eq!(counting.completed.load(Ordering::SeqCst), 7);
    }

    #[tokio::test]
    async fn test_notify_failure_continues() {
        let config = ProjectConfig::default();
        let (executor, calls, counting) = executor(&config, &["styles"]);

        let result = run(&executor, &config, "dev").await.unwrap();

        assert!(result.success, "dev pipeline is not strict");
        assert_eq!(calls.lock().unwrap().len(), 5);
        assert!(matches!(
            result.outcome("styles"),
            Some(TaskOutcome::Recovered {
                policy: FailurePolicy::Notify,
                ..
            })
        ));
        assert_eq!(counting.failed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_strict_pipeline_reports_recovered_failures() {
        let config = ProjectConfig::default();
        let (executor, calls, _) = executor(&config, &["scripts"]);

        let result = run(&executor, &config, "build").await.unwrap();

        assert!(!result.success);
        assert_eq!(result.recovered(), 1);
        assert_eq!(calls.lock().unwrap().len(), 7, "later tasks still run");
    }

    #[tokio::test]
    async fn test_fail_policy_aborts() {
        let config = ProjectConfig::default();
        let (executor, calls, _) = executor(&config, &["clean"]);

        let err = run(&executor, &config, "build").await.unwrap_err();

        assert!(matches!(err, AssetflowError::TransformFailed { .. }));
        assert_eq!(*calls.lock().unwrap(), vec!["clean"]);
    }

    #[tokio::test]
    async fn test_missing_adapter() {
        let config = ProjectConfig::default();
        let executor = PipelineExecutor::new();

        let err = run(&executor, &config, "compress").await.unwrap_err();
        assert!(matches!(err, AssetflowError::AdapterNotFound { .. }));
    }

    #[test]
    fn test_check_tools_reports_missing_bundler() {
        let tmp = tempfile::tempdir().unwrap();
        let mut config = ProjectConfig::default();
        for task in &mut config.tasks {
            if let crate::pipeline::AdapterSpec::Scripts { program, .. } = &mut task.adapter {
                *program = "no-such-bundler-xyz".to_string();
            }
        }
        let executor = PipelineExecutor::for_project(&config);

        let missing = executor.check_tools(&config, config.get_pipeline("dev").unwrap(), tmp.path());
        assert!(missing.iter().any(|m| m.starts_with("scripts:")));
    }
}
