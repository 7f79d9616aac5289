// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 assetflow contributors

//! Production output promotion
//!
//! [`CopyAdapter`] applies the ordered copy manifest; [`CleanAdapter`]
//! empties the output directory before a production build.

use async_trait::async_trait;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use super::{write_if_changed, Adapter, TaskContext, TransformOutput};
use crate::errors::AssetflowError;
use crate::utils::globs;

/// Copies the files selected by an ordered include/exclude manifest.
///
/// Entries are applied in order: an inclusion adds the files it matches, a
/// `!` exclusion removes matching files selected so far, and a later
/// inclusion may add them back. Destination paths are relative to `base`.
pub struct CopyAdapter {
    manifest: Vec<String>,
    base: PathBuf,
    output: PathBuf,
}

impl CopyAdapter {
    pub fn new(manifest: Vec<String>, base: PathBuf, output: PathBuf) -> Self {
        Self {
            manifest,
            base,
            output,
        }
    }

    /// Resolve the manifest to project-relative paths, in sorted order
    pub fn select(&self, root: &Path) -> Result<BTreeSet<String>, AssetflowError> {
        let mut selected = BTreeSet::new();

        for entry in &self.manifest {
            if let Some(pattern) = entry.strip_prefix('!') {
                let glob = globs::compile_glob(pattern)?.compile_matcher();
                selected.retain(|rel: &String| !glob.is_match(rel));
                continue;
            }

            let glob = globs::compile_glob(entry)?.compile_matcher();
            let hidden_ok = globs::selects_hidden(entry);
            let dir = root.join(globs::glob_base(entry));
            if !dir.exists() {
                continue;
            }

            for path in globs::walk_files(&dir) {
                let hidden = path
                    .file_name()
                    .is_some_and(|n| n.to_string_lossy().starts_with('.'));
                if hidden && !hidden_ok {
                    continue;
                }
                if let Some(rel) = globs::relative_slash_path(root, &path) {
                    if glob.is_match(&rel) {
                        selected.insert(rel);
                    }
                }
            }
        }

        Ok(selected)
    }
}

#[async_trait]
impl Adapter for CopyAdapter {
    async fn transform(&self, ctx: &TaskContext) -> Result<TransformOutput, AssetflowError> {
        let output_dir = ctx.resolve(&self.output);
        let mut result = TransformOutput::default();

        for rel in self.select(&ctx.root)? {
            let rel = PathBuf::from(rel);
            let dest_rel = rel.strip_prefix(&self.base).map_err(|_| AssetflowError::InvalidConfig {
                reason: format!(
                    "'{}' is outside the copy base '{}'",
                    rel.display(),
                    self.base.display()
                ),
                help: Some("Every manifest entry must live under the task's base directory".into()),
            })?;

            let source = ctx.root.join(&rel);
            let bytes = tokio::fs::read(&source)
                .await
                .map_err(|e| AssetflowError::read(&source, e))?;
            let dest = output_dir.join(dest_rel);
            let changed = write_if_changed(&dest, &bytes)?;
            result.record(dest, changed);
        }

        let summary = format!(
            "{} copied, {} unchanged",
            result.written.len(),
            result.unchanged
        );
        Ok(result.with_summary(summary))
    }
}

/// Removes everything inside the output directory, keeping the directory
pub struct CleanAdapter {
    output: PathBuf,
}

impl CleanAdapter {
    pub fn new(output: PathBuf) -> Self {
        Self { output }
    }
}

#[async_trait]
impl Adapter for CleanAdapter {
    async fn transform(&self, ctx: &TaskContext) -> Result<TransformOutput, AssetflowError> {
        let output_dir = ctx.resolve(&self.output);
        if ctx.root.starts_with(&output_dir) {
            return Err(AssetflowError::InvalidConfig {
                reason: format!("refusing to clean '{}'", output_dir.display()),
                help: Some("The clean output must be a directory inside the project".into()),
            });
        }
        if !output_dir.exists() {
            return Ok(TransformOutput::default().with_summary("nothing to clean"));
        }

        let mut entries = tokio::fs::read_dir(&output_dir)
            .await
            .map_err(|e| AssetflowError::read(&output_dir, e))?;
        let mut removed = 0usize;

        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| AssetflowError::read(&output_dir, e))?
        {
            let path = entry.path();
            let is_dir = entry
                .file_type()
                .await
                .map(|t| t.is_dir())
                .unwrap_or(false);
            let outcome = if is_dir {
                tokio::fs::remove_dir_all(&path).await
            } else {
                tokio::fs::remove_file(&path).await
            };
            outcome.map_err(|e| AssetflowError::write(&path, e))?;
            removed += 1;
        }

        Ok(TransformOutput::default().with_summary(format!("removed {} entries", removed)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::test_context;
    use crate::fingerprint;
    use crate::pipeline::Mode;

    fn manifest() -> Vec<String> {
        [
            "app/css/main.min.css",
            "app/js/*.{js,json}",
            "!app/js/main.js",
            "app/js/main.bundle.js",
            "app/fonts/**/*",
            "app/img/**/*",
            "app/*.html",
            "app/.htaccess",
            "app/mail/*",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect()
    }

    fn project() -> tempfile::TempDir {
        let tmp = tempfile::tempdir().unwrap();
        let app = tmp.path().join("app");
        for dir in ["css", "js/modules", "fonts/roboto", "img/.thumbs", "sass", "mail"] {
            std::fs::create_dir_all(app.join(dir)).unwrap();
        }
        for (file, body) in [
            ("css/main.min.css", "a{}"),
            ("css/other.css", "b{}"),
            ("js/main.js", "import"),
            ("js/main.bundle.js", "bundle"),
            ("js/libs.min.js", "libs"),
            ("js/data.json", "{}"),
            ("js/modules/menu.js", "menu"),
            ("fonts/roboto/r.woff2", "font"),
            ("img/logo.png", "png"),
            ("img/.DS_Store", "junk"),
            ("img/.thumbs/t.png", "thumb"),
            ("sass/main.sass", "sass"),
            ("index.html", "<p></p>"),
            (".htaccess", "Options -Indexes"),
            ("mail/send.php", "<?php"),
        ] {
            std::fs::write(app.join(file), body).unwrap();
        }
        tmp
    }

    fn adapter() -> CopyAdapter {
        CopyAdapter::new(manifest(), PathBuf::from("app"), PathBuf::from("build"))
    }

    #[test]
    fn test_manifest_selection() {
        let tmp = project();
        let selected: Vec<String> = adapter().select(tmp.path()).unwrap().into_iter().collect();

        assert_eq!(
            selected,
            vec![
                "app/.htaccess",
                "app/css/main.min.css",
                "app/fonts/roboto/r.woff2",
                "app/img/logo.png",
                "app/index.html",
                "app/js/data.json",
                "app/js/libs.min.js",
                "app/js/main.bundle.js",
                "app/mail/send.php",
            ]
        );
    }

    #[test]
    fn test_later_inclusion_re_adds() {
        let tmp = project();
        let adapter = CopyAdapter::new(
            vec![
                "app/js/*.js".into(),
                "!app/js/*.js".into(),
                "app/js/main.js".into(),
            ],
            PathBuf::from("app"),
            PathBuf::from("build"),
        );

        let selected: Vec<String> = adapter.select(tmp.path()).unwrap().into_iter().collect();
        assert_eq!(selected, vec!["app/js/main.js"]);
    }

    #[tokio::test]
    async fn test_copy_is_idempotent() {
        let tmp = project();
        let ctx = test_context(tmp.path(), Mode::Production);

        let first = adapter().transform(&ctx).await.unwrap();
        assert_eq!(first.written.len(), 9);
        let build = tmp.path().join("build");
        assert!(build.join("js/main.bundle.js").is_file());
        assert!(!build.join("js/main.js").exists());
        let snapshot = fingerprint::hash_tree(&build).unwrap();

        let second = adapter().transform(&ctx).await.unwrap();
        assert!(second.written.is_empty());
        assert_eq!(second.unchanged, 9);
        assert_eq!(fingerprint::hash_tree(&build).unwrap(), snapshot);
    }

    #[tokio::test]
    async fn test_clean_empties_output_dir() {
        let tmp = project();
        let build = tmp.path().join("build");
        std::fs::create_dir_all(build.join("css")).unwrap();
        std::fs::write(build.join("css/old.css"), "x").unwrap();
        std::fs::write(build.join("index.html"), "x").unwrap();

        let ctx = test_context(tmp.path(), Mode::Production);
        let output = CleanAdapter::new(PathBuf::from("build"))
            .transform(&ctx)
            .await
            .unwrap();

        assert!(build.is_dir());
        assert_eq!(std::fs::read_dir(&build).unwrap().count(), 0);
        assert_eq!(output.summary.as_deref(), Some("removed 2 entries"));
    }

    #[tokio::test]
    async fn test_clean_refuses_project_root() {
        let tmp = project();
        let ctx = test_context(tmp.path(), Mode::Production);

        let err = CleanAdapter::new(PathBuf::from("."))
            .transform(&ctx)
            .await
            .unwrap_err();
        assert!(matches!(err, AssetflowError::InvalidConfig { .. }));
    }
}
