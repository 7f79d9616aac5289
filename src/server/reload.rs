// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 assetflow contributors

//! Live-reload event hub
//!
//! Task results become numbered events. Browsers long-poll for events newer
//! than the last sequence number they saw.

use serde::Serialize;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;

use crate::adapters::TransformOutput;
use crate::errors::AssetflowError;
use crate::notifier::Notifier;
use crate::pipeline::FailurePolicy;
use crate::utils::globs;

/// Events kept for clients that fall behind
const HISTORY: usize = 64;

/// What the browser should do
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ReloadKind {
    /// Reload the page
    Reload,
    /// Swap the listed stylesheets in place
    Inject { paths: Vec<String> },
    /// Print a task failure to the browser console
    Error { task: String, message: String },
}

/// A numbered live-reload event
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReloadEvent {
    pub seq: u64,
    #[serde(flatten)]
    pub kind: ReloadKind,
}

#[derive(Debug)]
struct Hub {
    /// URL paths are computed relative to the served directory
    served_root: PathBuf,
    history: Mutex<VecDeque<ReloadEvent>>,
    latest: watch::Sender<u64>,
}

/// Live-reload handle shared by the notifier side and the HTTP side
#[derive(Debug, Clone)]
pub struct LiveReload {
    hub: Arc<Hub>,
}

fn is_stylesheet(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("css") | Some("map")
    )
}

impl LiveReload {
    /// Create a hub for a server rooted at `served_root`
    pub fn new(served_root: &Path) -> Self {
        let (latest, _) = watch::channel(0);
        Self {
            hub: Arc::new(Hub {
                served_root: served_root.to_path_buf(),
                history: Mutex::new(VecDeque::with_capacity(HISTORY)),
                latest,
            }),
        }
    }

    /// Sequence number of the newest event (0 before any)
    pub fn current_seq(&self) -> u64 {
        *self.hub.latest.borrow()
    }

    fn publish(&self, kind: ReloadKind) -> ReloadEvent {
        let mut history = match self.hub.history.lock() {
            Ok(history) => history,
            Err(poisoned) => poisoned.into_inner(),
        };
        let event = ReloadEvent {
            seq: history.back().map_or(0, |e| e.seq) + 1,
            kind,
        };
        if history.len() == HISTORY {
            history.pop_front();
        }
        history.push_back(event.clone());
        self.hub.latest.send_replace(event.seq);

        tracing::debug!(seq = event.seq, kind = ?event.kind, "live reload");
        event
    }

    fn url_path(&self, path: &Path) -> String {
        let rel = globs::relative_slash_path(&self.hub.served_root, path)
            .filter(|_| path.starts_with(&self.hub.served_root))
            .unwrap_or_else(|| {
                path.file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default()
            });
        format!("/{}", rel)
    }

    /// Announce the files a task wrote.
    ///
    /// Stylesheets alone are injected without a page reload; anything else
    /// reloads. Nothing written, nothing sent.
    pub fn stream(&self, outputs: &[PathBuf]) -> Option<ReloadEvent> {
        if outputs.is_empty() {
            return None;
        }

        let kind = if outputs.iter().all(|p| is_stylesheet(p)) {
            let paths: Vec<String> = outputs
                .iter()
                .filter(|p| p.extension().is_some_and(|e| e == "css"))
                .map(|p| self.url_path(p))
                .collect();
            if paths.is_empty() {
                return None;
            }
            ReloadKind::Inject { paths }
        } else {
            ReloadKind::Reload
        };

        Some(self.publish(kind))
    }

    /// Announce a recovered task failure
    pub fn error(&self, task: &str, message: &str) -> ReloadEvent {
        self.publish(ReloadKind::Error {
            task: task.to_string(),
            message: message.to_string(),
        })
    }

    /// Events newer than `since`, oldest first
    pub fn events_since(&self, since: u64) -> Vec<ReloadEvent> {
        let history = match self.hub.history.lock() {
            Ok(history) => history,
            Err(poisoned) => poisoned.into_inner(),
        };
        history.iter().filter(|e| e.seq > since).cloned().collect()
    }

    /// Wait up to `timeout` for events newer than `since`
    pub async fn wait_since(&self, since: u64, timeout: Duration) -> Vec<ReloadEvent> {
        let mut rx = self.hub.latest.subscribe();
        let deadline = tokio::time::Instant::now() + timeout;

        loop {
            let events = self.events_since(since);
            if !events.is_empty() {
                return events;
            }
            match tokio::time::timeout_at(deadline, rx.changed()).await {
                Ok(Ok(())) => continue,
                _ => return Vec::new(),
            }
        }
    }
}

impl Notifier for LiveReload {
    fn task_completed(&self, _task: &str, output: &TransformOutput) {
        self.stream(&output.written);
    }

    fn task_failed(&self, task: &str, _policy: FailurePolicy, error: &AssetflowError) {
        self.error(task, &error.to_string());
    }
}
