// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 assetflow contributors

//! Third-party library concatenation

use async_trait::async_trait;
use std::path::PathBuf;

use super::{write_if_changed, Adapter, TaskContext, TransformOutput};
use crate::errors::AssetflowError;

/// Concatenates prebuilt library files, in order, into one script
pub struct LibsAdapter {
    files: Vec<PathBuf>,
    output: PathBuf,
}

impl LibsAdapter {
    pub fn new(files: Vec<PathBuf>, output: PathBuf) -> Self {
        Self { files, output }
    }
}

#[async_trait]
impl Adapter for LibsAdapter {
    async fn transform(&self, ctx: &TaskContext) -> Result<TransformOutput, AssetflowError> {
        let mut bundle = String::new();

        for file in &self.files {
            let path = ctx.resolve(file);
            let content = tokio::fs::read_to_string(&path).await.map_err(|_| {
                AssetflowError::FileNotFound {
                    path: path.clone(),
                    help: Some("Install front-end dependencies with `npm install`".into()),
                }
            })?;
            bundle.push_str(content.trim_end());
            bundle.push('\n');
        }

        let output = ctx.resolve(&self.output);
        let mut result = TransformOutput::default();
        let changed = write_if_changed(&output, bundle.as_bytes())?;
        result.record(output, changed);

        Ok(result.with_summary(format!("{} libraries", self.files.len())))
    }
}
