// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 assetflow contributors

//! Script bundling
//!
//! Drives an external bundler (esbuild by default) over the entry module.
//! Development output stays readable; production output is minified.

use async_trait::async_trait;
use std::path::{Path, PathBuf};

use super::{locate_tool, run_tool, tool_label, Adapter, Staging, TaskContext, TransformOutput};
use crate::errors::AssetflowError;
use crate::pipeline::Mode;

/// Bundle emitted for an entry module with no content
pub const EMPTY_BUNDLE: &str = "(() => {\n})();\n";

/// Script bundler adapter
pub struct ScriptAdapter {
    entry: PathBuf,
    output: PathBuf,
    program: String,
    target: Option<String>,
    flags: Vec<String>,
}

impl ScriptAdapter {
    pub fn new(
        entry: PathBuf,
        output: PathBuf,
        program: String,
        target: Option<String>,
        flags: Vec<String>,
    ) -> Self {
        Self {
            entry,
            output,
            program,
            target,
            flags,
        }
    }

    fn bundler_args(&self, entry: &Path, outfile: &Path, mode: Mode) -> Vec<String> {
        let mut args = vec![
            entry.to_string_lossy().into_owned(),
            "--bundle".to_string(),
            format!("--outfile={}", outfile.display()),
            "--format=iife".to_string(),
        ];

        if let Some(target) = &self.target {
            args.push(format!("--target={}", target));
        }

        if mode == Mode::Production {
            args.push("--minify".to_string());
            args.push("--legal-comments=none".to_string());
        }

        args.extend(self.flags.iter().cloned());
        args
    }

    fn output_name(&self) -> String {
        self.output
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "bundle.js".to_string())
    }
}

#[async_trait]
impl Adapter for ScriptAdapter {
    async fn transform(&self, ctx: &TaskContext) -> Result<TransformOutput, AssetflowError> {
        let entry = ctx.resolve(&self.entry);
        let output = ctx.resolve(&self.output);
        let output_dir = output
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| ctx.root.clone());

        let source = tokio::fs::read_to_string(&entry)
            .await
            .map_err(|_| AssetflowError::FileNotFound {
                path: entry.clone(),
                help: Some("The script entry module must exist".into()),
            })?;

        let mut result = TransformOutput::default();

        // Nothing to bundle: skip the bundler and emit a valid empty program.
        if source.trim().is_empty() {
            let changed = super::write_if_changed(&output, EMPTY_BUNDLE.as_bytes())?;
            result.record(output, changed);
            return Ok(result.with_summary("empty entry"));
        }

        let bin = locate_tool(&self.program, &ctx.root)?;
        let staging = Staging::beside(&output_dir)?;
        let name = self.output_name();
        let args = self.bundler_args(&entry, &staging.file(&name), ctx.mode);

        let run = run_tool(&bin, &args, &ctx.root, &[]).await?;
        if !run.success {
            return Err(AssetflowError::transform_failed(
                &ctx.task,
                tool_label(&self.program),
                &run.stderr,
            ));
        }

        staging.promote(&name, &output_dir, &mut result)?;
        Ok(result.with_summary(format!("{} bundle", ctx.mode)))
    }

    fn check_available(&self, root: &Path) -> Result<(), AssetflowError> {
        locate_tool(&self.program, root).map(|_| ())
    }
}
