// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 assetflow contributors

//! Page template rendering
//!
//! Renders every page under the template root with minijinja. Layouts and
//! partials are loaded by name relative to the root. Each rendered page is
//! passed through [`HtmlFormatter`] and written as `<stem>.html`.

use async_trait::async_trait;
use minijinja::{context, path_loader, AutoEscape, Environment};
use std::path::{Path, PathBuf};

use super::{write_if_changed, Adapter, Bem, HtmlFormatter, TaskContext, TransformOutput};
use crate::errors::AssetflowError;
use crate::pipeline::definition::file_stem;
use crate::utils::globs;

/// Template adapter.
///
/// Holds its naming and formatting configuration immutably; nothing about a
/// render depends on state set elsewhere.
pub struct TemplateAdapter {
    root: PathBuf,
    pages: String,
    output: PathBuf,
    css_path: String,
    bem: Bem,
    formatter: HtmlFormatter,
}

impl TemplateAdapter {
    pub fn new(
        root: PathBuf,
        pages: String,
        output: PathBuf,
        css_path: String,
        bem: Bem,
        formatter: HtmlFormatter,
    ) -> Self {
        Self {
            root,
            pages,
            output,
            css_path,
            bem,
            formatter,
        }
    }

    fn environment(&self, root: &Path, ctx: &TaskContext) -> Environment<'static> {
        let mut env = Environment::new();
        // Pages are project sources; values are inserted as written.
        env.set_auto_escape_callback(|_| AutoEscape::None);
        env.set_loader(path_loader(root));
        env.add_global("mode", ctx.mode.to_string());
        env.add_global("css", self.css_path.clone());
        self.bem.register(&mut env);
        env
    }
}

#[async_trait]
impl Adapter for TemplateAdapter {
    async fn transform(&self, ctx: &TaskContext) -> Result<TransformOutput, AssetflowError> {
        let root = ctx.resolve(&self.root);
        let output_dir = ctx.resolve(&self.output);
        let pages = globs::resolve_globs(&[self.pages.as_str()], &root, true)?;

        let mut result = TransformOutput::default();
        if pages.is_empty() {
            tracing::warn!(task = %ctx.task, "no pages match {}", self.pages);
            return Ok(result.with_summary("no pages"));
        }

        let env = self.environment(&root, ctx);
        let mut failures = Vec::new();

        for page in &pages {
            let Some(name) = globs::relative_slash_path(&root, page) else {
                continue;
            };
            let stem = file_stem(page);

            let rendered = env
                .get_template(&name)
                .and_then(|template| template.render(context! { page => stem }));

            match rendered {
                Ok(html) => {
                    let dest = output_dir.join(format!("{}.html", stem));
                    let changed = write_if_changed(&dest, self.formatter.format(&html).as_bytes())?;
                    result.record(dest, changed);
                }
                Err(e) => {
                    tracing::debug!(page = %name, "render failed: {:#}", e);
                    failures.push(format!("{}: {:#}", name, e));
                }
            }
        }

        if !failures.is_empty() {
            return Err(AssetflowError::Template {
                message: failures.join("\n"),
            });
        }

        Ok(result.with_summary(format!("{} pages", pages.len())))
    }
}
