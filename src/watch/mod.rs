// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 assetflow contributors

//! File watching
//!
//! A polling watcher feeds change events to the [`WatchRouter`], which picks
//! the single task bound to each path; the [`TaskQueue`] runs it, merging
//! events that arrive while the task is still running.

mod router;
mod watcher;

pub use router::WatchRouter;
pub use watcher::{FileWatcher, TaskQueue};
