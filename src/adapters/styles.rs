// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 assetflow contributors

//! Stylesheet compilation
//!
//! Compiles the entry stylesheet with the Dart Sass CLI (compressed, with an
//! embedded source map), vendor-prefixes it with PostCSS + autoprefixer and
//! renames it with the configured suffix. Output is staged and only promoted
//! when every step succeeds, so a syntax error leaves the last good CSS in
//! place.

use async_trait::async_trait;
use std::path::{Path, PathBuf};

use super::{locate_tool, run_tool, tool_label, Adapter, Staging, TaskContext, TransformOutput};
use crate::errors::AssetflowError;
use crate::pipeline::definition::file_stem;

/// Sass + autoprefixer adapter
pub struct StyleAdapter {
    entry: PathBuf,
    output_dir: PathBuf,
    program: String,
    prefixer: Option<String>,
    browsers: Vec<String>,
    suffix: String,
}

impl StyleAdapter {
    pub fn new(
        entry: PathBuf,
        output_dir: PathBuf,
        program: String,
        prefixer: Option<String>,
        browsers: Vec<String>,
        suffix: String,
    ) -> Self {
        Self {
            entry,
            output_dir,
            program,
            prefixer,
            browsers,
            suffix,
        }
    }

    /// File name of the compiled stylesheet
    pub fn css_name(&self) -> String {
        format!("{}{}", file_stem(&self.entry), self.suffix)
    }

    fn sass_args(entry: &Path, css: &Path) -> Vec<String> {
        vec![
            entry.to_string_lossy().into_owned(),
            css.to_string_lossy().into_owned(),
            "--style=compressed".to_string(),
            "--source-map".to_string(),
            "--embed-sources".to_string(),
            "--no-error-css".to_string(),
        ]
    }

    async fn prefix(&self, ctx: &TaskContext, css: &Path) -> Result<(), AssetflowError> {
        let Some(prefixer) = &self.prefixer else {
            return Ok(());
        };

        let bin = match locate_tool(prefixer, &ctx.root) {
            Ok(bin) => bin,
            Err(_) => {
                tracing::warn!(
                    task = %ctx.task,
                    "{} not installed, skipping vendor prefixes",
                    tool_label(prefixer)
                );
                return Ok(());
            }
        };

        let args = vec![
            css.to_string_lossy().into_owned(),
            "--use".to_string(),
            "autoprefixer".to_string(),
            "--replace".to_string(),
            "--map".to_string(),
        ];
        let env = [("BROWSERSLIST".to_string(), self.browsers.join(", "))];

        let run = run_tool(&bin, &args, &ctx.root, &env).await?;
        if !run.success {
            return Err(AssetflowError::transform_failed(
                &ctx.task,
                tool_label(prefixer),
                &run.stderr,
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl Adapter for StyleAdapter {
    async fn transform(&self, ctx: &TaskContext) -> Result<TransformOutput, AssetflowError> {
        let entry = ctx.resolve(&self.entry);
        if !entry.is_file() {
            return Err(AssetflowError::FileNotFound {
                path: entry,
                help: Some("The stylesheet entry must exist".into()),
            });
        }

        let sass = locate_tool(&self.program, &ctx.root)?;
        let output_dir = ctx.resolve(&self.output_dir);
        let staging = Staging::beside(&output_dir)?;

        let css_name = self.css_name();
        let map_name = format!("{}.map", css_name);
        let staged_css = staging.file(&css_name);

        let run = run_tool(&sass, &Self::sass_args(&entry, &staged_css), &ctx.root, &[]).await?;
        if !run.success {
            return Err(AssetflowError::transform_failed(
                &ctx.task,
                tool_label(&self.program),
                &run.stderr,
            ));
        }

        self.prefix(ctx, &staged_css).await?;

        let mut result = TransformOutput::default();
        staging.promote(&css_name, &output_dir, &mut result)?;
        if staging.file(&map_name).is_file() {
            staging.promote(&map_name, &output_dir, &mut result)?;
        }

        Ok(result.with_summary(css_name))
    }

    fn check_available(&self, root: &Path) -> Result<(), AssetflowError> {
        locate_tool(&self.program, root)?;
        if let Some(prefixer) = &self.prefixer {
            if locate_tool(prefixer, root).is_err() {
                tracing::warn!("{} not found; stylesheets will not be prefixed", prefixer);
            }
        }
        Ok(())
    }
}
