// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 assetflow contributors

//! Shared fixtures for integration tests

#![allow(dead_code)]

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use assetflow::pipeline::{AdapterSpec, ProjectConfig};

/// Write an executable shell script standing in for an external tool
pub fn fake_tool(dir: &Path, name: &str, body: &str) -> PathBuf {
    std::fs::create_dir_all(dir).unwrap();
    let path = dir.join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
    let mut perms = std::fs::metadata(&path).unwrap().permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(&path, perms).unwrap();
    path
}

/// Write a file, creating parent directories
pub fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, content).unwrap();
}

pub const FAKE_SASS: &str = r#"echo "/* compiled $1 */ body{margin:0}" > "$2"
echo '{"version":3}' > "$2.map""#;

pub const FAKE_ESBUILD: &str = r#"for a in "$@"; do
  case "$a" in --outfile=*) out="${a#--outfile=}";; esac
done
cat "$1" > "$out""#;

/// A project in the canonical layout with fake tools under `bin/`
pub fn project() -> tempfile::TempDir {
    let tmp = tempfile::tempdir().unwrap();
    let root = tmp.path();

    write(root, "node_modules/jquery/dist/jquery.min.js", "/*! jQuery */");
    write(
        root,
        "node_modules/magnific-popup/dist/jquery.magnific-popup.min.js",
        "/*! Magnific Popup */",
    );
    write(root, "app/sass/main.sass", "body\n  margin: 0\n");
    write(root, "app/js/main.js", "import './modules/menu.js'\n");
    write(root, "app/js/modules/menu.js", "export const menu = 1\n");
    write(
        root,
        "app/templates/layouts/base.html",
        r#"<!DOCTYPE html>
<html>
<head>
<link rel="stylesheet" href="{{ css }}">
</head>
<body>{% block content %}{% endblock %}</body>
</html>
"#,
    );
    write(
        root,
        "app/templates/pages/index.html",
        r#"{% extends "layouts/base.html" %}{% block content %}<div class="{{ bem('card', 'title', 'big') }}"><p>Hello</p></div>{% endblock %}"#,
    );
    write(
        root,
        "app/img/svg-sprite/arrow.svg",
        r##"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 24 24"><path d="M0 0L10 10" fill="#333"/></svg>"##,
    );
    write(root, "app/fonts/roboto.woff2", "font");
    write(root, "app/.htaccess", "Options -Indexes\n");

    fake_tool(&root.join("bin"), "sass", FAKE_SASS);
    fake_tool(&root.join("bin"), "esbuild", FAKE_ESBUILD);

    tmp
}

/// Default configuration pointed at the fake tools, without a prefixer
pub fn config() -> ProjectConfig {
    let mut config = ProjectConfig::default();
    for task in &mut config.tasks {
        match &mut task.adapter {
            AdapterSpec::Scripts { program, .. } => *program = "bin/esbuild".to_string(),
            AdapterSpec::Styles {
                program, prefixer, ..
            } => {
                *program = "bin/sass".to_string();
                *prefixer = None;
            }
            _ => {}
        }
    }
    config
}
