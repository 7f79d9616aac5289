// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 assetflow contributors

//! Polling watcher routes real file changes to exactly one task

mod common;

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use assetflow::adapters::{Adapter, TaskContext, TransformOutput};
use assetflow::pipeline::{Mode, PipelineExecutor, ProjectConfig};
use assetflow::watch::{FileWatcher, TaskQueue};
use assetflow::AssetflowError;

struct Counting(Arc<AtomicUsize>);

#[async_trait]
impl Adapter for Counting {
    async fn transform(&self, _ctx: &TaskContext) -> Result<TransformOutput, AssetflowError> {
        self.0.fetch_add(1, Ordering::SeqCst);
        Ok(TransformOutput::default())
    }
}

struct Harness {
    counts: HashMap<&'static str, Arc<AtomicUsize>>,
    handle: tokio::task::JoinHandle<Result<(), AssetflowError>>,
}

impl Harness {
    fn count(&self, task: &str) -> usize {
        self.counts[task].load(Ordering::SeqCst)
    }

    async fn wait_for(&self, task: &str, expected: usize) {
        for _ in 0..100 {
            if self.count(task) >= expected {
                return;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    }
}

async fn start(root: PathBuf) -> Harness {
    let mut config = ProjectConfig::default();
    config.watch.poll_interval_ms = 50;

    let mut executor = PipelineExecutor::new();
    let mut counts = HashMap::new();
    for task in ["styles", "templates", "scripts", "icons"] {
        let count = Arc::new(AtomicUsize::new(0));
        executor.register_adapter(task, Arc::new(Counting(Arc::clone(&count))));
        counts.insert(task, count);
    }

    let config = Arc::new(config);
    let watcher = FileWatcher::new(&config, &root).unwrap();
    let queue = TaskQueue::new(
        &watcher.tasks(),
        Arc::new(executor),
        Arc::clone(&config),
        root,
        Mode::Development,
        HashMap::new(),
    )
    .unwrap();

    let handle = tokio::spawn(watcher.run(queue));
    // Let the first poll record the tree
    tokio::time::sleep(Duration::from_millis(300)).await;

    Harness { counts, handle }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_change_triggers_exactly_one_task() {
    let tmp = common::project();
    let harness = start(tmp.path().to_path_buf()).await;

    common::write(tmp.path(), "app/sass/main.sass", "body\n  margin: 4px\n");
    harness.wait_for("styles", 1).await;
    tokio::time::sleep(Duration::from_millis(400)).await;

    assert_eq!(harness.count("styles"), 1);
    assert_eq!(harness.count("templates"), 0);
    assert_eq!(harness.count("scripts"), 0);
    assert_eq!(harness.count("icons"), 0);

    harness.handle.abort();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_unrouted_and_unchanged_files_are_ignored() {
    let tmp = common::project();
    let harness = start(tmp.path().to_path_buf()).await;

    // Excluded vendor partial, and an identical rewrite of a routed file
    common::write(tmp.path(), "app/sass/libs/normalize.scss", "html{}");
    common::write(tmp.path(), "app/js/main.js", "import './modules/menu.js'\n");
    // A template change goes through
    common::write(tmp.path(), "app/templates/pages/about.html", "<p>About</p>");

    harness.wait_for("templates", 1).await;
    tokio::time::sleep(Duration::from_millis(400)).await;

    assert_eq!(harness.count("templates"), 1);
    assert_eq!(harness.count("styles"), 0);
    assert_eq!(harness.count("scripts"), 0);

    harness.handle.abort();
}
