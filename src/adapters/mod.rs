// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 assetflow contributors

//! Asset transform adapters
//!
//! This module provides the adapter trait and one implementation per asset
//! class. An adapter is constructed from its task declaration once at
//! startup and holds that configuration immutably.

mod bem;
mod copy;
mod html;
mod icons;
mod images;
mod libs;
mod scripts;
mod styles;
mod templates;

pub use bem::Bem;
pub use copy::{CleanAdapter, CopyAdapter};
pub use html::HtmlFormatter;
pub use icons::{assemble_sprite, IconAdapter, SpriteError};
pub use images::{CompressedImage, CompressionReport, ImageAdapter};
pub use libs::LibsAdapter;
pub use scripts::{ScriptAdapter, EMPTY_BUNDLE};
pub use styles::StyleAdapter;
pub use templates::TemplateAdapter;

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::process::Command;

use crate::errors::AssetflowError;
use crate::fingerprint;
use crate::pipeline::{AdapterSpec, Mode, Task};

/// Everything an adapter needs to know about one invocation
#[derive(Debug, Clone)]
pub struct TaskContext {
    /// Name of the task being run
    pub task: String,
    /// Project root; relative paths resolve against it
    pub root: PathBuf,
    /// Build mode of the running pipeline
    pub mode: Mode,
    /// Environment loaded at startup (process env plus `.env`)
    pub env: HashMap<String, String>,
}

impl TaskContext {
    /// Resolve a project-relative path
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }
}

/// Result of a successful transform
#[derive(Debug, Clone, Default)]
pub struct TransformOutput {
    /// Files written or replaced
    pub written: Vec<PathBuf>,
    /// Outputs left alone because their content was already current
    pub unchanged: usize,
    /// One-line summary for the console
    pub summary: Option<String>,
}

impl TransformOutput {
    /// Output listing written files
    pub fn written(written: Vec<PathBuf>) -> Self {
        Self {
            written,
            ..Self::default()
        }
    }

    /// Attach a summary line
    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }

    /// Record a write that may have been skipped
    pub fn record(&mut self, path: PathBuf, changed: bool) {
        if changed {
            self.written.push(path);
        } else {
            self.unchanged += 1;
        }
    }
}

/// Trait for asset transform adapters
#[async_trait]
pub trait Adapter: Send + Sync {
    /// Run the transform, writing only to this adapter's declared output
    async fn transform(&self, ctx: &TaskContext) -> Result<TransformOutput, AssetflowError>;

    /// Check that external tools required by this adapter are installed
    fn check_available(&self, _root: &Path) -> Result<(), AssetflowError> {
        Ok(())
    }
}

/// Create the adapter bound to a task
pub fn adapter_for(task: &Task) -> Arc<dyn Adapter> {
    match &task.adapter {
        AdapterSpec::Scripts {
            entry,
            program,
            target,
            flags,
        } => Arc::new(ScriptAdapter::new(
            entry.clone(),
            task.output.clone(),
            program.clone(),
            target.clone(),
            flags.clone(),
        )),
        AdapterSpec::Libs { files } => {
            Arc::new(LibsAdapter::new(files.clone(), task.output.clone()))
        }
        AdapterSpec::Styles {
            entry,
            program,
            prefixer,
            browsers,
            suffix,
        } => Arc::new(StyleAdapter::new(
            entry.clone(),
            task.output.clone(),
            program.clone(),
            prefixer.clone(),
            browsers.clone(),
            suffix.clone(),
        )),
        AdapterSpec::Templates {
            root,
            pages,
            css_path,
            bem,
            format,
        } => Arc::new(TemplateAdapter::new(
            root.clone(),
            pages.clone(),
            task.output.clone(),
            css_path.clone(),
            Bem::new(bem.clone()),
            HtmlFormatter::new(format.clone()),
        )),
        AdapterSpec::Images {
            endpoint,
            credential_env,
        } => Arc::new(ImageAdapter::new(
            task.input.clone(),
            endpoint.clone(),
            credential_env.clone(),
        )),
        AdapterSpec::Icons => Arc::new(IconAdapter::new(task.input.clone(), task.output.clone())),
        AdapterSpec::Copy { base } => Arc::new(CopyAdapter::new(
            task.input.clone(),
            base.clone(),
            task.output.clone(),
        )),
        AdapterSpec::Clean => Arc::new(CleanAdapter::new(task.output.clone())),
    }
}

/// Create adapters for every task of a project, keyed by task name
pub fn create_adapters(tasks: &[Task]) -> HashMap<String, Arc<dyn Adapter>> {
    tasks
        .iter()
        .map(|task| (task.name.clone(), adapter_for(task)))
        .collect()
}

/// Locate an executable, honouring paths relative to the project root
pub fn locate_tool(program: &str, root: &Path) -> Result<PathBuf, AssetflowError> {
    which::which_in(program, std::env::var_os("PATH"), root)
        .map_err(|_| AssetflowError::tool_not_found(tool_label(program)))
}

/// Short tool name for messages ("node_modules/.bin/sass" → "sass")
pub(crate) fn tool_label(program: &str) -> &str {
    Path::new(program)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(program)
}

/// Captured output of an external tool
#[derive(Debug)]
pub(crate) struct ToolOutput {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

/// Run an external tool to completion
pub(crate) async fn run_tool(
    bin: &Path,
    args: &[String],
    cwd: &Path,
    envs: &[(String, String)],
) -> Result<ToolOutput, AssetflowError> {
    let label = bin
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    tracing::debug!(tool = %label, ?args, "spawning");

    let output = Command::new(bin)
        .args(args)
        .current_dir(cwd)
        .envs(envs.iter().map(|(k, v)| (k, v)))
        .output()
        .await
        .map_err(|e| AssetflowError::ToolExecutionFailed {
            tool: label.clone(),
            error: e.to_string(),
            help: Some(format!("Check that '{}' is executable", bin.display())),
        })?;

    Ok(ToolOutput {
        success: output.status.success(),
        stdout: String::from_utf8_lossy(&output.stdout).to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
    })
}

/// Scratch directory next to an output directory.
///
/// Staged files are renamed into place only after a transform succeeds, so a
/// failed run never replaces previous output. The directory sits at the same
/// depth as the output so relative references (source maps) stay valid.
pub(crate) struct Staging {
    dir: tempfile::TempDir,
}

impl Staging {
    /// Create a staging directory beside `output_dir`
    pub fn beside(output_dir: &Path) -> Result<Self, AssetflowError> {
        let parent = output_dir
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        std::fs::create_dir_all(parent).map_err(|e| AssetflowError::write(parent, e))?;

        let dir = tempfile::Builder::new()
            .prefix(".assetflow-")
            .tempdir_in(parent)
            .map_err(|e| AssetflowError::write(parent, e))?;

        Ok(Self { dir })
    }

    /// Path of a staged file
    pub fn file(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    /// Move a staged file into `dest_dir`, skipping identical content
    pub fn promote(
        &self,
        name: &str,
        dest_dir: &Path,
        output: &mut TransformOutput,
    ) -> Result<(), AssetflowError> {
        let staged = self.file(name);
        let dest = dest_dir.join(name);

        if fingerprint::same_content(&staged, &dest)? {
            output.record(dest, false);
            return Ok(());
        }

        std::fs::create_dir_all(dest_dir).map_err(|e| AssetflowError::write(dest_dir, e))?;
        std::fs::rename(&staged, &dest).map_err(|e| AssetflowError::write(&dest, e))?;
        output.record(dest, true);
        Ok(())
    }
}

/// Write `bytes` to `path` unless it already holds exactly that content.
///
/// Returns whether the file was written.
pub(crate) fn write_if_changed(path: &Path, bytes: &[u8]) -> Result<bool, AssetflowError> {
    if path.is_file() && fingerprint::hash_file(path)? == fingerprint::hash_bytes(bytes) {
        return Ok(false);
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| AssetflowError::write(parent, e))?;
    }
    std::fs::write(path, bytes).map_err(|e| AssetflowError::write(path, e))?;
    Ok(true)
}

/// Make an executable shell script standing in for an external tool
#[cfg(test)]
pub(crate) fn fake_tool(dir: &Path, name: &str, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
    let mut perms = std::fs::metadata(&path).unwrap().permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(&path, perms).unwrap();
    path
}

#[cfg(test)]
pub(crate) fn test_context(root: &Path, mode: Mode) -> TaskContext {
    TaskContext {
        task: "test".into(),
        root: root.to_path_buf(),
        mode,
        env: HashMap::new(),
    }
}
