// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 assetflow contributors

//! Glob helpers shared by the graph, the watcher and the copy manifest
//!
//! Patterns are matched against `/`-separated paths relative to the project
//! root. `*` never crosses a directory boundary; `**` does.

use globset::{Glob, GlobBuilder, GlobSet, GlobSetBuilder};
use std::path::{Path, PathBuf};

use crate::errors::AssetflowError;

/// Compile a single pattern with path-aware wildcard semantics
pub fn compile_glob(pattern: &str) -> Result<Glob, AssetflowError> {
    GlobBuilder::new(pattern)
        .literal_separator(true)
        .build()
        .map_err(|e| AssetflowError::GlobPattern {
            message: format!("invalid glob '{}': {}", pattern, e),
        })
}

/// Compile a list of patterns into one set
pub fn compile_globset<S: AsRef<str>>(patterns: &[S]) -> Result<GlobSet, AssetflowError> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(compile_glob(pattern.as_ref())?);
    }
    Ok(builder.build()?)
}

/// Include/exclude matcher built from a mixed list where `!` marks exclusions
#[derive(Debug, Clone)]
pub struct PatternSet {
    include: GlobSet,
    exclude: GlobSet,
}

impl PatternSet {
    /// Split `!`-prefixed exclusions from inclusions and compile both
    pub fn from_mixed<S: AsRef<str>>(patterns: &[S]) -> Result<Self, AssetflowError> {
        let (exclude, include): (Vec<&str>, Vec<&str>) = patterns
            .iter()
            .map(AsRef::as_ref)
            .partition(|p| p.starts_with('!'));
        let exclude: Vec<&str> = exclude.iter().map(|p| &p[1..]).collect();

        Ok(Self {
            include: compile_globset(&include)?,
            exclude: compile_globset(&exclude)?,
        })
    }

    /// Build from separate inclusion and exclusion lists
    pub fn new<S: AsRef<str>>(include: &[S], exclude: &[S]) -> Result<Self, AssetflowError> {
        Ok(Self {
            include: compile_globset(include)?,
            exclude: compile_globset(exclude)?,
        })
    }

    /// Whether a relative, `/`-separated path is selected
    pub fn matches(&self, rel_path: &str) -> bool {
        self.include.is_match(rel_path) && !self.exclude.is_match(rel_path)
    }
}

/// Express `path` relative to `root` with `/` separators
pub fn relative_slash_path(root: &Path, path: &Path) -> Option<String> {
    let rel = if path.is_absolute() {
        path.strip_prefix(root).ok()?
    } else {
        path
    };
    let rel = rel.strip_prefix(".").unwrap_or(rel);
    Some(rel.to_string_lossy().replace('\\', "/"))
}

/// Directory prefix of a pattern that contains no wildcard
pub fn glob_base(pattern: &str) -> PathBuf {
    let mut base = PathBuf::new();
    let mut segments = pattern.split('/').peekable();
    while let Some(segment) = segments.next() {
        if segments.peek().is_none() || segment.contains(['*', '?', '[', '{']) {
            break;
        }
        base.push(segment);
    }
    base
}

fn is_hidden(name: &str) -> bool {
    name.starts_with('.') && name != "." && name != ".."
}

/// Whether a wildcard pattern may select a hidden file.
///
/// Dotfiles are only matched by patterns whose last segment names them
/// explicitly (`app/.htaccess`), never by `*`.
pub fn selects_hidden(pattern: &str) -> bool {
    pattern
        .rsplit('/')
        .next()
        .map(|last| last.starts_with('.'))
        .unwrap_or(false)
}

/// Walk the files under `base`, skipping hidden directories
pub fn walk_files(base: &Path) -> impl Iterator<Item = PathBuf> {
    walkdir::WalkDir::new(base)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            entry.depth() == 0
                || !entry.file_type().is_dir()
                || !is_hidden(&entry.file_name().to_string_lossy())
        })
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
}

/// Resolve a mixed include/`!`exclude pattern list to existing files.
///
/// Patterns are relative to `root`; results are absolute and sorted. An
/// empty result is an error unless `allow_empty` is set.
pub fn resolve_globs<S: AsRef<str>>(
    patterns: &[S],
    root: &Path,
    allow_empty: bool,
) -> Result<Vec<PathBuf>, AssetflowError> {
    let set = PatternSet::from_mixed(patterns)?;
    let includes: Vec<&str> = patterns
        .iter()
        .map(AsRef::as_ref)
        .filter(|p| !p.starts_with('!'))
        .collect();
    let hidden_ok = includes.iter().any(|p| selects_hidden(p));

    let mut bases: Vec<PathBuf> = includes.iter().map(|p| glob_base(p)).collect();
    bases.sort();
    bases.dedup();
    // Drop bases nested inside another base
    let bases: Vec<&PathBuf> = bases
        .iter()
        .filter(|b| !bases.iter().any(|other| other != *b && b.starts_with(other)))
        .collect();

    let mut files = Vec::new();
    for base in bases {
        let dir = root.join(base);
        if !dir.exists() {
            continue;
        }
        for path in walk_files(&dir) {
            let Some(rel) = relative_slash_path(root, &path) else {
                continue;
            };
            let name_hidden = path
                .file_name()
                .map(|n| is_hidden(&n.to_string_lossy()))
                .unwrap_or(false);
            if name_hidden && !hidden_ok {
                continue;
            }
            if set.matches(&rel) {
                files.push(path);
            }
        }
    }

    files.sort();
    files.dedup();

    if files.is_empty() && !allow_empty {
        return Err(AssetflowError::NoInputFiles {
            pattern: includes.join(", "),
        });
    }

    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_star_does_not_cross_directories() {
        let set = compile_globset(&["app/js/*.js"]).unwrap();
        assert!(set.is_match("app/js/main.js"));
        assert!(!set.is_match("app/js/modules/menu.js"));
    }

    #[test]
    fn test_double_star_matches_zero_or_more_dirs() {
        let set = compile_globset(&["app/img/**/*"]).unwrap();
        assert!(set.is_match("app/img/logo.png"));
        assert!(set.is_match("app/img/icons/a/b.svg"));
    }

    #[test]
    fn test_alternation() {
        let set = compile_globset(&["app/js/*.{js,json}"]).unwrap();
        assert!(set.is_match("app/js/data.json"));
        assert!(!set.is_match("app/js/data.yaml"));
    }

    #[test]
    fn test_pattern_set_exclusions() {
        let set = PatternSet::from_mixed(&["app/sass/**/*.sass", "!app/sass/libs/**"]).unwrap();
        assert!(set.matches("app/sass/main.sass"));
        assert!(!set.matches("app/sass/libs/libs.sass"));
    }

    #[test]
    fn test_glob_base() {
        assert_eq!(glob_base("app/img/**/*"), PathBuf::from("app/img"));
        assert_eq!(glob_base("app/js/main.js"), PathBuf::from("app/js"));
        assert_eq!(glob_base("*.html"), PathBuf::new());
    }

    #[test]
    fn test_resolve_globs_with_exclusions_and_hidden_files() {
        let tmp = tempfile::tempdir().unwrap();
        let img = tmp.path().join("app/img");
        std::fs::create_dir_all(img.join("icons")).unwrap();
        std::fs::create_dir_all(img.join(".cache")).unwrap();
        std::fs::write(img.join("a.png"), "").unwrap();
        std::fs::write(img.join("icons/b.jpg"), "").unwrap();
        std::fs::write(img.join("c.svg"), "").unwrap();
        std::fs::write(img.join(".DS_Store"), "").unwrap();
        std::fs::write(img.join(".cache/d.png"), "").unwrap();

        let files = resolve_globs(
            &["app/img/**/*.{png,jpg}", "!app/img/icons/**"],
            tmp.path(),
            false,
        )
        .unwrap();

        assert_eq!(files, vec![img.join("a.png")]);
    }

    #[test]
    fn test_resolve_globs_empty() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(matches!(
            resolve_globs(&["app/**/*.png"], tmp.path(), false),
            Err(AssetflowError::NoInputFiles { .. })
        ));
        assert!(resolve_globs(&["app/**/*.png"], tmp.path(), true)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_relative_slash_path() {
        let root = Path::new("/project");
        assert_eq!(
            relative_slash_path(root, Path::new("/project/app/main.sass")).as_deref(),
            Some("app/main.sass")
        );
        assert_eq!(
            relative_slash_path(root, Path::new("./app/x.js")).as_deref(),
            Some("app/x.js")
        );
        assert!(relative_slash_path(root, Path::new("/elsewhere/x.js")).is_none());
    }
}
