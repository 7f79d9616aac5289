// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 assetflow contributors

//! SVG icon sprite assembly
//!
//! Each icon is minified, its internal IDs are renamed to `<stem>-<short>`
//! so they cannot collide across files, presentation attributes are removed
//! so the icon can be styled with CSS, and the result is wrapped in a
//! `<symbol id="<stem>">`. Icons are processed in file name order, so the
//! sprite is byte-for-byte deterministic.

use async_trait::async_trait;
use regex::{Captures, Regex};
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::OnceLock;
use thiserror::Error;

use super::{write_if_changed, Adapter, TaskContext, TransformOutput};
use crate::errors::AssetflowError;
use crate::pipeline::definition::file_stem;
use crate::utils::globs;

struct Patterns {
    prolog: Regex,
    root: Regex,
    view_box: Regex,
    width: Regex,
    height: Regex,
    id_attr: Regex,
    url_ref: Regex,
    href_ref: Regex,
    presentation: Regex,
    between_tags: Regex,
    whitespace: Regex,
}

fn patterns() -> &'static Patterns {
    static PATTERNS: OnceLock<Patterns> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        let re = |p: &str| Regex::new(p).unwrap_or_else(|e| panic!("invalid pattern {p}: {e}"));
        Patterns {
            prolog: re(r"(?s)<\?xml.*?\?>|<!--.*?-->|<!DOCTYPE[^>]*>"),
            root: re(r"(?s)<svg\b([^>]*)>(.*)</svg>"),
            view_box: re(r#"\bviewBox\s*=\s*["']([^"']*)["']"#),
            width: re(r#"\swidth\s*=\s*["']([\d.]+)(?:px)?["']"#),
            height: re(r#"\sheight\s*=\s*["']([\d.]+)(?:px)?["']"#),
            id_attr: re(r#"\s+id\s*=\s*["']([^"']*)["']"#),
            url_ref: re(r"url\(\s*#([^)\s]+)\s*\)"),
            href_ref: re(r#"((?:xlink:)?href\s*=\s*["'])#([^"']+)(["'])"#),
            presentation: re(
                r#"\s+(?:fill|fill-opacity|stroke|style|data-name)\s*=\s*(?:"[^"]*"|'[^']*')"#,
            ),
            between_tags: re(r">\s+<"),
            whitespace: re(r"\s+"),
        }
    })
}

/// Short ID for the n-th referenced ID of an icon: a, b, ..., z, aa, ab, ...
fn short_id(mut n: usize) -> String {
    let mut id = Vec::new();
    loop {
        id.push(b'a' + (n % 26) as u8);
        if n < 26 {
            break;
        }
        n = n / 26 - 1;
    }
    id.reverse();
    String::from_utf8_lossy(&id).into_owned()
}

/// Why a set of icons cannot be combined
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SpriteError {
    #[error("icon '{0}' is not an SVG document")]
    NotSvg(String),
    #[error("two icons are named '{0}'")]
    DuplicateName(String),
}

/// Turn one SVG document into a `<symbol>` element.
///
/// `taken` holds every ID already used in the sprite; renamed IDs are added
/// to it. Returns `None` when the input has no `<svg>` root.
fn symbol(stem: &str, svg: &str, taken: &mut HashSet<String>) -> Option<String> {
    let p = patterns();
    let svg = p.prolog.replace_all(svg, "");
    let caps = p.root.captures(&svg)?;
    let root_attrs = caps.get(1).map_or("", |m| m.as_str());
    let body = caps.get(2).map_or("", |m| m.as_str());

    let view_box = p
        .view_box
        .captures(root_attrs)
        .map(|c| c[1].to_string())
        .or_else(|| {
            let w = p.width.captures(root_attrs)?;
            let h = p.height.captures(root_attrs)?;
            Some(format!("0 0 {} {}", &w[1], &h[1]))
        });

    // Only IDs that are referenced survive; they get short, prefixed names.
    let referenced: HashSet<&str> = p
        .url_ref
        .captures_iter(body)
        .filter_map(|c| c.get(1))
        .chain(p.href_ref.captures_iter(body).filter_map(|c| c.get(2)))
        .map(|m| m.as_str())
        .collect();

    let mut renamed: HashMap<String, String> = HashMap::new();
    let mut next = 0;
    for caps in p.id_attr.captures_iter(body) {
        let id = &caps[1];
        if referenced.contains(id) && !renamed.contains_key(id) {
            // Another icon's symbol may already be called `<stem>-<short>`
            let short = loop {
                let candidate = format!("{}-{}", stem, short_id(next));
                next += 1;
                if taken.insert(candidate.clone()) {
                    break candidate;
                }
            };
            renamed.insert(id.to_string(), short);
        }
    }

    let body = p.id_attr.replace_all(body, |c: &Captures| match renamed.get(&c[1]) {
        Some(new) => format!(r#" id="{}""#, new),
        None => String::new(),
    });
    let body = p.url_ref.replace_all(&body, |c: &Captures| match renamed.get(&c[1]) {
        Some(new) => format!("url(#{})", new),
        None => c[0].to_string(),
    });
    let body = p.href_ref.replace_all(&body, |c: &Captures| match renamed.get(&c[2]) {
        Some(new) => format!("{}#{}{}", &c[1], new, &c[3]),
        None => c[0].to_string(),
    });
    let body = p.presentation.replace_all(&body, "");
    let body = p.between_tags.replace_all(&body, "><");
    let body = p.whitespace.replace_all(&body, " ");

    let view_box = view_box
        .map(|v| format!(r#" viewBox="{}""#, v))
        .unwrap_or_default();
    Some(format!(
        r#"<symbol id="{}"{}>{}</symbol>"#,
        stem,
        view_box,
        body.trim()
    ))
}

/// Combine named SVG documents into one sprite.
///
/// `icons` pairs each icon's symbol ID (the file stem) with its source.
/// Every `id` in the result is unique.
pub fn assemble_sprite(icons: &[(String, String)]) -> Result<String, SpriteError> {
    let mut taken = HashSet::new();
    for (stem, _) in icons {
        if !taken.insert(stem.clone()) {
            return Err(SpriteError::DuplicateName(stem.clone()));
        }
    }

    let mut symbols = String::new();
    for (stem, svg) in icons {
        let symbol =
            symbol(stem, svg, &mut taken).ok_or_else(|| SpriteError::NotSvg(stem.clone()))?;
        symbols.push_str(&symbol);
    }

    let xlink = if symbols.contains("xlink:") {
        r#" xmlns:xlink="http://www.w3.org/1999/xlink""#
    } else {
        ""
    };
    Ok(format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg"{}>{}</svg>"#,
        xlink, symbols
    ))
}

/// Icon sprite adapter
pub struct IconAdapter {
    input: Vec<String>,
    output: PathBuf,
}

impl IconAdapter {
    pub fn new(input: Vec<String>, output: PathBuf) -> Self {
        Self { input, output }
    }
}

#[async_trait]
impl Adapter for IconAdapter {
    async fn transform(&self, ctx: &TaskContext) -> Result<TransformOutput, AssetflowError> {
        let files = globs::resolve_globs(&self.input, &ctx.root, true)?;
        let mut result = TransformOutput::default();
        if files.is_empty() {
            tracing::warn!(task = %ctx.task, "no icons found");
            return Ok(result.with_summary("no icons"));
        }

        let mut icons = Vec::with_capacity(files.len());
        for path in &files {
            let svg = tokio::fs::read_to_string(path)
                .await
                .map_err(|e| AssetflowError::read(path, e))?;
            icons.push((file_stem(path), svg));
        }
        icons.sort_by(|a, b| a.0.cmp(&b.0));

        let sprite = assemble_sprite(&icons).map_err(|e| {
            let help = match e {
                SpriteError::NotSvg(_) => "Every icon file needs an <svg> root element",
                SpriteError::DuplicateName(_) => "Icon file names must be unique across inputs",
            };
            AssetflowError::TransformFailed {
                task: ctx.task.clone(),
                message: e.to_string(),
                help: Some(help.into()),
            }
        })?;

        let output = ctx.resolve(&self.output);
        let changed = write_if_changed(&output, sprite.as_bytes())?;
        result.record(output, changed);

        Ok(result.with_summary(format!("{} icons", icons.len())))
    }
}
