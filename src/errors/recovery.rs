// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 assetflow contributors

//! Error recovery suggestions
//!
//! Provides actionable suggestions for recovering from errors.

/// A recovery suggestion with concrete steps
#[derive(Debug, Clone)]
pub struct RecoverySuggestion {
    /// Brief description of what to do
    pub action: String,
    /// Detailed steps
    pub steps: Vec<String>,
    /// Commands to run
    pub commands: Vec<String>,
}

impl RecoverySuggestion {
    /// Suggest installing a missing tool
    pub fn install_tool(tool: &str) -> Self {
        match tool {
            "sass" => Self {
                action: "Install Dart Sass".into(),
                steps: vec![
                    "Sass is required to compile stylesheets".into(),
                    "Install it globally or as a project dev dependency".into(),
                ],
                commands: vec![
                    "npm install -g sass".into(),
                    "".into(),
                    "# Or point the styles task at a local binary:".into(),
                    "#   program: node_modules/.bin/sass".into(),
                ],
            },
            "esbuild" => Self {
                action: "Install esbuild".into(),
                steps: vec!["esbuild is required to bundle scripts".into()],
                commands: vec!["npm install -g esbuild".into()],
            },
            "postcss" => Self {
                action: "Install PostCSS with autoprefixer".into(),
                steps: vec![
                    "Vendor prefixing is skipped until postcss is available".into(),
                ],
                commands: vec!["npm install -g postcss-cli autoprefixer".into()],
            },
            _ => Self {
                action: format!("Install {}", tool),
                steps: vec![format!("Install {} and ensure it's in your PATH", tool)],
                commands: vec![],
            },
        }
    }

    /// Suggest providing the compression service credential
    pub fn provide_credential(name: &str) -> Self {
        Self {
            action: format!("Provide {}", name),
            steps: vec![
                "Image compression needs an API key for the remote service".into(),
                "Get a key at https://tinypng.com/developers".into(),
            ],
            commands: vec![format!("echo '{}=<your key>' >> .env", name)],
        }
    }

    /// Suggest fixing a circular dependency
    pub fn fix_circular_dependency(tasks: &[String]) -> Self {
        Self {
            action: "Remove circular dependency".into(),
            steps: vec![
                format!("Detected cycle: {}", tasks.join(" → ")),
                "A task's output must not feed one of its own upstream tasks".into(),
            ],
            commands: vec![
                "# Visualize the pipeline:".into(),
                "assetflow graph build --format mermaid".into(),
            ],
        }
    }
}

impl std::fmt::Display for RecoverySuggestion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "→ {}", self.action)?;

        for step in &self.steps {
            writeln!(f, "  {}", step)?;
        }

        if !self.commands.is_empty() {
            writeln!(f)?;
            for cmd in &self.commands {
                writeln!(f, "  {}", cmd)?;
            }
        }

        Ok(())
    }
}
