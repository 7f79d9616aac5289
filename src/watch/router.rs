// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 assetflow contributors

//! Change routing
//!
//! Maps a changed path to the single task bound to it.

use std::collections::HashSet;
use std::sync::Mutex;

use crate::errors::AssetflowError;
use crate::pipeline::WatchRule;
use crate::utils::globs::PatternSet;

/// Routes project-relative paths to tasks
#[derive(Debug)]
pub struct WatchRouter {
    rules: Vec<(PatternSet, String)>,
    /// Paths already reported as matched by several rules
    warned: Mutex<HashSet<String>>,
}

impl WatchRouter {
    /// Compile the routing rules, in registration order
    pub fn new(rules: &[WatchRule]) -> Result<Self, AssetflowError> {
        let rules = rules
            .iter()
            .map(|rule| Ok((PatternSet::new(&rule.patterns, &rule.exclude)?, rule.task.clone())))
            .collect::<Result<Vec<_>, AssetflowError>>()?;

        Ok(Self {
            rules,
            warned: Mutex::new(HashSet::new()),
        })
    }

    /// Task bound to a `/`-separated path relative to the project root.
    ///
    /// When several rules match, the last registered one wins.
    pub fn route(&self, rel_path: &str) -> Option<&str> {
        let matched: Vec<&str> = self
            .rules
            .iter()
            .filter(|(set, _)| set.matches(rel_path))
            .map(|(_, task)| task.as_str())
            .collect();

        let winner = matched.last().copied()?;
        if matched.len() > 1 {
            let first_time = self
                .warned
                .lock()
                .map(|mut warned| warned.insert(rel_path.to_string()))
                .unwrap_or(true);
            if first_time {
                tracing::warn!(
                    path = rel_path,
                    rules = ?matched,
                    task = winner,
                    "path matches several watch rules, using the last one"
                );
            }
        }
        Some(winner)
    }

    /// Bound tasks, each once, in rule order
    pub fn tasks(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.rules
            .iter()
            .map(|(_, task)| task.as_str())
            .filter(|task| seen.insert(*task))
            .collect()
    }
}
