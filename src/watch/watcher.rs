// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 assetflow contributors

//! Polling file watcher and per-task run queues

use colored::Colorize;
use notify::{Config, EventKind, PollWatcher, RecursiveMode, Watcher};
use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc::{self, error::TrySendError};

use super::WatchRouter;
use crate::adapters::TaskContext;
use crate::errors::AssetflowError;
use crate::fingerprint;
use crate::pipeline::{Mode, PipelineExecutor, ProjectConfig, TaskOutcome};
use crate::utils::globs;

/// One worker per watched task.
///
/// Each worker has a single pending slot: a trigger that arrives while the
/// task is running queues exactly one re-run, further triggers are merged
/// into it.
pub struct TaskQueue {
    senders: HashMap<String, mpsc::Sender<()>>,
    failures: mpsc::UnboundedReceiver<AssetflowError>,
}

struct Runner {
    executor: Arc<PipelineExecutor>,
    config: Arc<ProjectConfig>,
    root: PathBuf,
    mode: Mode,
    env: HashMap<String, String>,
}

impl Runner {
    async fn run(&self, name: &str) -> Result<(), AssetflowError> {
        let task = self
            .config
            .get_task(name)
            .ok_or_else(|| AssetflowError::UnknownTask {
                task: name.to_string(),
            })?;
        let ctx = TaskContext {
            task: name.to_string(),
            root: self.root.clone(),
            mode: self.mode,
            env: self.env.clone(),
        };

        let start = Instant::now();
        match self.executor.run_task(task, &ctx).await? {
            TaskOutcome::Succeeded(_) => println!(
                "  {} {} ({:.2}s)",
                "✓".green(),
                name.bold(),
                start.elapsed().as_secs_f64()
            ),
            TaskOutcome::Recovered { policy, .. } => println!(
                "  {} {} {}",
                "⚠".yellow(),
                name.bold(),
                format!("(failed, {})", policy).dimmed()
            ),
        }
        Ok(())
    }
}

impl TaskQueue {
    /// Spawn a worker for each task
    pub fn new(
        tasks: &[&str],
        executor: Arc<PipelineExecutor>,
        config: Arc<ProjectConfig>,
        root: PathBuf,
        mode: Mode,
        env: HashMap<String, String>,
    ) -> Result<Self, AssetflowError> {
        if let Some(unknown) = tasks.iter().find(|t| config.get_task(t).is_none()) {
            return Err(AssetflowError::UnknownTask {
                task: unknown.to_string(),
            });
        }

        let runner = Arc::new(Runner {
            executor,
            config,
            root,
            mode,
            env,
        });
        let (failure_tx, failures) = mpsc::unbounded_channel();
        let mut senders = HashMap::new();

        for &name in tasks {
            let (tx, mut rx) = mpsc::channel::<()>(1);
            let runner = Arc::clone(&runner);
            let failure_tx = failure_tx.clone();
            let task = name.to_string();

            tokio::spawn(async move {
                while rx.recv().await.is_some() {
                    if let Err(error) = runner.run(&task).await {
                        println!("  {} {} failed", "✗".red(), task.bold());
                        let _ = failure_tx.send(error);
                        break;
                    }
                }
            });
            senders.insert(name.to_string(), tx);
        }

        Ok(Self { senders, failures })
    }

    /// Request a run of `task`.
    ///
    /// Returns `false` when the request was merged into one already pending.
    pub fn trigger(&self, task: &str) -> bool {
        let Some(tx) = self.senders.get(task) else {
            tracing::warn!(task, "no worker for task");
            return false;
        };
        match tx.try_send(()) {
            Ok(()) => true,
            Err(TrySendError::Full(())) => {
                tracing::debug!(task, "run already pending, coalesced");
                false
            }
            Err(TrySendError::Closed(())) => false,
        }
    }

    /// Wait for a task to fail under the `fail` policy
    pub async fn next_failure(&mut self) -> Option<AssetflowError> {
        self.failures.recv().await
    }
}

/// Polls the watched directories and routes changes to tasks
pub struct FileWatcher {
    root: PathBuf,
    router: WatchRouter,
    watched: Vec<PathBuf>,
    output_dir: PathBuf,
    poll_interval: Duration,
    hashes: HashMap<PathBuf, String>,
}

impl FileWatcher {
    /// Prepare a watcher over the base directories of the routing rules.
    ///
    /// `root` should be absolute; event paths are resolved against it.
    pub fn new(config: &ProjectConfig, root: &Path) -> Result<Self, AssetflowError> {
        let router = WatchRouter::new(&config.watch.rules)?;

        let mut bases: Vec<PathBuf> = config
            .watch
            .rules
            .iter()
            .flat_map(|rule| rule.patterns.iter())
            .map(|pattern| root.join(globs::glob_base(pattern)))
            .collect();
        bases.sort();
        bases.dedup();
        let mut watched: Vec<PathBuf> = Vec::new();
        for base in bases {
            if !watched.iter().any(|w| base.starts_with(w)) {
                watched.push(base);
            }
        }

        Ok(Self {
            root: root.to_path_buf(),
            router,
            watched,
            output_dir: root.join(&config.output_dir),
            poll_interval: Duration::from_millis(config.watch.poll_interval_ms.max(1)),
            hashes: HashMap::new(),
        })
    }

    /// Directories polled for changes
    pub fn watched_dirs(&self) -> &[PathBuf] {
        &self.watched
    }

    /// Tasks bound by the routing rules
    pub fn tasks(&self) -> Vec<&str> {
        self.router.tasks()
    }

    /// Record the current content of every routed file, so an event that
    /// leaves a file's bytes unchanged is dropped from the start
    pub fn prime(&mut self) {
        for dir in self.watched.clone() {
            for path in globs::walk_files(&dir) {
                if self.route_path(&path).is_none() {
                    continue;
                }
                if let Ok(hash) = fingerprint::hash_file(&path) {
                    self.hashes.insert(path, hash);
                }
            }
        }
    }

    fn route_path(&self, path: &Path) -> Option<String> {
        if path.starts_with(&self.output_dir) {
            return None;
        }
        let rel = globs::relative_slash_path(&self.root, path)?;
        let hidden = Path::new(&rel).components().any(|c| match c {
            Component::Normal(name) => name.to_string_lossy().starts_with('.'),
            _ => false,
        });
        if hidden {
            return None;
        }
        self.router.route(&rel).map(str::to_string)
    }

    /// Task to run for a changed path.
    ///
    /// `None` for ignored and unrouted paths, and for files whose content
    /// hash matches the last routed event.
    pub fn route_change(&mut self, path: &Path) -> Option<String> {
        let task = self.route_path(path)?;

        if path.is_file() {
            let hash = fingerprint::hash_file(path).ok()?;
            if self.hashes.get(path) == Some(&hash) {
                tracing::trace!(path = %path.display(), "content unchanged");
                return None;
            }
            self.hashes.insert(path.to_path_buf(), hash);
        } else {
            self.hashes.remove(path);
        }

        Some(task)
    }

    /// Poll until a task fails under the `fail` policy.
    ///
    /// Runs until the surrounding future is dropped (Ctrl+C in the CLI).
    pub async fn run(mut self, mut queue: TaskQueue) -> Result<(), AssetflowError> {
        self.prime();

        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut watcher = PollWatcher::new(
            move |event: notify::Result<notify::Event>| {
                let _ = tx.send(event);
            },
            Config::default().with_poll_interval(self.poll_interval),
        )?;

        for dir in &self.watched {
            if dir.is_dir() {
                watcher.watch(dir, RecursiveMode::Recursive)?;
                tracing::debug!(dir = %dir.display(), "watching");
            } else {
                tracing::warn!(dir = %dir.display(), "watch directory does not exist");
            }
        }

        println!(
            "{} {} ({}ms poll). Press {} to exit.",
            "Watching".bold(),
            self.tasks().join(", "),
            self.poll_interval.as_millis(),
            "Ctrl+C".cyan()
        );

        loop {
            tokio::select! {
                event = rx.recv() => match event {
                    Some(Ok(event)) => {
                        if matches!(event.kind, EventKind::Access(_)) {
                            continue;
                        }
                        for path in &event.paths {
                            if let Some(task) = self.route_change(path) {
                                tracing::info!(path = %path.display(), task = %task, "change detected");
                                queue.trigger(&task);
                            }
                        }
                    }
                    Some(Err(e)) => tracing::warn!(error = %e, "watch error"),
                    None => {
                        return Err(AssetflowError::Watch {
                            message: "watcher stopped unexpectedly".into(),
                        })
                    }
                },
                Some(error) = queue.next_failure() => return Err(error),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{Adapter, TransformOutput};
    use crate::pipeline::{AdapterSpec, FailurePolicy, Task};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Slow {
        runs: Arc<AtomicUsize>,
        fail: bool,
    }

    #[async_trait]
    impl Adapter for Slow {
        async fn transform(&self, _ctx: &TaskContext) -> Result<TransformOutput, AssetflowError> {
            tokio::time::sleep(Duration::from_millis(100)).await;
            self.runs.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(AssetflowError::Io {
                    message: "disk full".into(),
                });
            }
            Ok(TransformOutput::default())
        }
    }

    fn queue(fail: bool) -> (TaskQueue, Arc<AtomicUsize>) {
        let runs = Arc::new(AtomicUsize::new(0));
        let mut config = ProjectConfig::default();
        config.tasks = vec![Task::new("icons", AdapterSpec::Icons, &["*.svg"], "sprite.svg")];
        config.tasks[0].on_error = Some(FailurePolicy::Fail);

        let mut executor = PipelineExecutor::new();
        executor.register_adapter(
            "icons",
            Arc::new(Slow {
                runs: Arc::clone(&runs),
                fail,
            }),
        );

        let queue = TaskQueue::new(
            &["icons"],
            Arc::new(executor),
            Arc::new(config),
            PathBuf::from("."),
            Mode::Development,
            HashMap::new(),
        )
        .unwrap();
        (queue, runs)
    }

    async fn settle(runs: &AtomicUsize, expected: usize) {
        for _ in 0..50 {
            if runs.load(Ordering::SeqCst) >= expected {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        tokio::time::sleep(Duration::from_millis(250)).await;
    }

    #[tokio::test]
    async fn test_burst_runs_once() {
        let (queue, runs) = queue(false);

        assert!(queue.trigger("icons"));
        assert!(!queue.trigger("icons"));
        assert!(!queue.trigger("icons"));

        settle(&runs, 1).await;
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_events_during_run_coalesce_into_one_rerun() {
        let (queue, runs) = queue(false);

        queue.trigger("icons");
        // Let the worker pick it up and start running
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(queue.trigger("icons"));
        assert!(!queue.trigger("icons"));
        assert!(!queue.trigger("icons"));

        settle(&runs, 2).await;
        assert_eq!(runs.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_fatal_failure_is_reported() {
        let (mut queue, _runs) = queue(true);

        queue.trigger("icons");
        let error = tokio::time::timeout(Duration::from_secs(5), queue.next_failure())
            .await
            .unwrap();
        assert!(matches!(error, Some(AssetflowError::Io { .. })));
    }

    #[tokio::test]
    async fn test_unknown_task_rejected() {
        let result = TaskQueue::new(
            &["fonts"],
            Arc::new(PipelineExecutor::new()),
            Arc::new(ProjectConfig::default()),
            PathBuf::from("."),
            Mode::Development,
            HashMap::new(),
        );
        assert!(matches!(result, Err(AssetflowError::UnknownTask { .. })));
    }

    #[test]
    fn test_watched_dirs_are_rule_bases() {
        let root = Path::new("/project");
        let watcher = FileWatcher::new(&ProjectConfig::default(), root).unwrap();

        assert_eq!(
            watcher.watched_dirs(),
            &[
                root.join("app/img/svg-sprite"),
                root.join("app/js"),
                root.join("app/sass"),
                root.join("app/templates"),
            ]
        );
    }

    #[test]
    fn test_route_change_filters() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();
        std::fs::create_dir_all(root.join("app/sass")).unwrap();
        std::fs::create_dir_all(root.join("app/sass/.cache")).unwrap();
        std::fs::write(root.join("app/sass/main.sass"), "body\n  margin: 0").unwrap();
        std::fs::write(root.join("app/sass/.cache/x.sass"), "x").unwrap();

        let mut watcher = FileWatcher::new(&ProjectConfig::default(), root).unwrap();
        let main = root.join("app/sass/main.sass");

        assert_eq!(watcher.route_change(&main).as_deref(), Some("styles"));
        // Same bytes again
        assert_eq!(watcher.route_change(&main), None);

        std::fs::write(&main, "body\n  margin: 1px").unwrap();
        assert_eq!(watcher.route_change(&main).as_deref(), Some("styles"));

        // Removal still routes
        std::fs::remove_file(&main).unwrap();
        assert_eq!(watcher.route_change(&main).as_deref(), Some("styles"));

        assert_eq!(watcher.route_change(&root.join("app/sass/.cache/x.sass")), None);
        assert_eq!(watcher.route_change(&root.join("build/css/main.min.css")), None);
    }

    #[test]
    fn test_prime_drops_touch_without_change() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();
        std::fs::create_dir_all(root.join("app/js")).unwrap();
        std::fs::write(root.join("app/js/main.js"), "console.log(1)").unwrap();

        let mut watcher = FileWatcher::new(&ProjectConfig::default(), root).unwrap();
        watcher.prime();

        assert_eq!(watcher.route_change(&root.join("app/js/main.js")), None);
    }
}
