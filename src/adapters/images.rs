// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 assetflow contributors

//! Remote image compression
//!
//! Speaks the TinyPNG shrink protocol: the raw image is POSTed with HTTP
//! basic auth (`api:<key>`), the service answers `201 Created` with the
//! compressed image's location, which is then downloaded. A file is only
//! replaced when the result is smaller.

use async_trait::async_trait;
use reqwest::header::LOCATION;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::path::PathBuf;

use super::{Adapter, TaskContext, TransformOutput};
use crate::errors::AssetflowError;
use crate::utils::{create_progress_bar, format_bytes, globs};

/// One compressed file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompressedImage {
    pub path: PathBuf,
    pub before: u64,
    pub after: u64,
}

impl CompressedImage {
    /// Whether the file was replaced
    pub fn replaced(&self) -> bool {
        self.after < self.before
    }
}

/// Outcome of a compression run
#[derive(Debug, Clone, Default)]
pub struct CompressionReport {
    pub images: Vec<CompressedImage>,
}

impl CompressionReport {
    pub fn bytes_saved(&self) -> u64 {
        self.images
            .iter()
            .map(|i| i.before.saturating_sub(i.after))
            .sum()
    }

    pub fn replaced(&self) -> usize {
        self.images.iter().filter(|i| i.replaced()).count()
    }
}

#[derive(Debug, Deserialize)]
struct ShrinkResponse {
    output: ShrinkOutput,
}

#[derive(Debug, Deserialize)]
struct ShrinkOutput {
    url: String,
}

#[derive(Debug, Deserialize)]
struct ServiceError {
    #[serde(default)]
    error: String,
    #[serde(default)]
    message: String,
}

/// Image compression adapter
pub struct ImageAdapter {
    input: Vec<String>,
    endpoint: String,
    credential_env: String,
}

impl ImageAdapter {
    pub fn new(input: Vec<String>, endpoint: String, credential_env: String) -> Self {
        Self {
            input,
            endpoint,
            credential_env,
        }
    }

    /// Compress every matching image and report the size changes.
    ///
    /// Any service or network failure aborts the run; files already
    /// replaced stay replaced.
    pub async fn compress(&self, ctx: &TaskContext) -> Result<CompressionReport, AssetflowError> {
        let key = ctx
            .env
            .get(&self.credential_env)
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| AssetflowError::MissingCredential {
                name: self.credential_env.clone(),
            })?;

        let files = globs::resolve_globs(&self.input, &ctx.root, true)?;
        let mut report = CompressionReport::default();
        if files.is_empty() {
            tracing::info!(task = %ctx.task, "no images to compress");
            return Ok(report);
        }

        let client = Client::builder()
            .user_agent(concat!("assetflow/", env!("CARGO_PKG_VERSION")))
            .build()?;
        let progress = create_progress_bar(files.len() as u64, "Compressing");

        for path in files {
            let original = tokio::fs::read(&path)
                .await
                .map_err(|e| AssetflowError::read(&path, e))?;
            let compressed = self.shrink(&client, key, &path, original.clone()).await?;

            let image = CompressedImage {
                path: path.clone(),
                before: original.len() as u64,
                after: compressed.len() as u64,
            };
            if image.replaced() {
                tokio::fs::write(&path, &compressed)
                    .await
                    .map_err(|e| AssetflowError::write(&path, e))?;
            }
            tracing::debug!(
                path = %path.display(),
                before = image.before,
                after = image.after,
                "compressed"
            );

            report.images.push(image);
            progress.inc(1);
        }

        progress.finish_and_clear();
        Ok(report)
    }

    async fn shrink(
        &self,
        client: &Client,
        key: &str,
        path: &std::path::Path,
        body: Vec<u8>,
    ) -> Result<Vec<u8>, AssetflowError> {
        let response = client
            .post(&self.endpoint)
            .basic_auth("api", Some(key))
            .body(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let detail = response
                .json::<ServiceError>()
                .await
                .map(|e| format!("{} {}", e.error, e.message).trim().to_string())
                .unwrap_or_default();
            return Err(AssetflowError::Compression {
                message: format!("{}: HTTP {} {}", path.display(), status.as_u16(), detail)
                    .trim_end()
                    .to_string(),
                help: (status == StatusCode::UNAUTHORIZED)
                    .then(|| format!("Check the value of {}", self.credential_env)),
            });
        }

        let location = response
            .headers()
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| response.url().join(v).ok());

        let url = match location {
            Some(url) => url.to_string(),
            None => response.json::<ShrinkResponse>().await?.output.url,
        };

        let bytes = client
            .get(url)
            .basic_auth("api", Some(key))
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;

        Ok(bytes.to_vec())
    }
}

#[async_trait]
impl Adapter for ImageAdapter {
    async fn transform(&self, ctx: &TaskContext) -> Result<TransformOutput, AssetflowError> {
        let report = self.compress(ctx).await?;

        let written = report
            .images
            .iter()
            .filter(|i| i.replaced())
            .map(|i| i.path.clone())
            .collect();
        let mut output = TransformOutput::written(written);
        output.unchanged = report.images.len() - report.replaced();

        Ok(output.with_summary(format!(
            "{} images, saved {}",
            report.images.len(),
            format_bytes(report.bytes_saved())
        )))
    }
}
