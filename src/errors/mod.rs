// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 assetflow contributors

//! Error types
//!
//! Every failure carries a stable diagnostic code and, where one exists,
//! a hint that tells the developer what to do next.

mod recovery;

pub use recovery::RecoverySuggestion;

use miette::Diagnostic;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for assetflow operations
pub type AssetflowResult<T> = Result<T, AssetflowError>;

/// Main error type for assetflow
#[derive(Error, Debug, Diagnostic)]
pub enum AssetflowError {
    // ─────────────────────────────────────────────────────────────────────────
    // Tool Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("Tool '{tool}' not found")]
    #[diagnostic(code(assetflow::tool_not_found), help("{suggestion}"))]
    ToolNotFound { tool: String, suggestion: String },

    #[error("Tool '{tool}' execution failed: {error}")]
    #[diagnostic(code(assetflow::tool_execution_failed))]
    ToolExecutionFailed {
        tool: String,
        error: String,
        #[help]
        help: Option<String>,
    },

    #[error("No adapter registered for '{adapter}'")]
    #[diagnostic(
        code(assetflow::adapter_not_found),
        help("Built-in adapters: scripts, libs, styles, templates, images, icons, copy, clean")
    )]
    AdapterNotFound { adapter: String },

    // ─────────────────────────────────────────────────────────────────────────
    // Configuration Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("Invalid configuration: {reason}")]
    #[diagnostic(code(assetflow::invalid_config))]
    InvalidConfig {
        reason: String,
        #[help]
        help: Option<String>,
    },

    #[error("Pipeline '{pipeline}' is not defined")]
    #[diagnostic(
        code(assetflow::unknown_pipeline),
        help("Built-in pipelines: dev, build, compress")
    )]
    UnknownPipeline { pipeline: String },

    #[error("Task '{task}' is not defined")]
    #[diagnostic(code(assetflow::unknown_task))]
    UnknownTask { task: String },

    #[error("Circular dependency detected")]
    #[diagnostic(
        code(assetflow::circular_dependency),
        help("Review the task dependencies and declared outputs to remove the cycle")
    )]
    CircularDependency { tasks: Vec<String> },

    #[error("Task '{task}' depends on unknown task '{dependency}'")]
    #[diagnostic(
        code(assetflow::unknown_dependency),
        help("Check that '{dependency}' is defined in your configuration")
    )]
    UnknownDependency { task: String, dependency: String },

    #[error("Environment variable '{name}' is not set")]
    #[diagnostic(
        code(assetflow::missing_credential),
        help("Add {name}=<value> to your .env file or export it in the shell")
    )]
    MissingCredential { name: String },

    // ─────────────────────────────────────────────────────────────────────────
    // Transform Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("Task '{task}' failed: {message}")]
    #[diagnostic(code(assetflow::transform_failed))]
    TransformFailed {
        task: String,
        message: String,
        #[help]
        help: Option<String>,
    },

    #[error("Template error: {message}")]
    #[diagnostic(code(assetflow::template_error))]
    Template { message: String },

    #[error("Compression service error: {message}")]
    #[diagnostic(code(assetflow::compression_failed))]
    Compression {
        message: String,
        #[help]
        help: Option<String>,
    },

    // ─────────────────────────────────────────────────────────────────────────
    // File Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("File not found: {path}")]
    #[diagnostic(code(assetflow::file_not_found))]
    FileNotFound {
        path: PathBuf,
        #[help]
        help: Option<String>,
    },

    #[error("Failed to read file '{path}': {error}")]
    #[diagnostic(code(assetflow::file_read_error))]
    FileReadError { path: PathBuf, error: String },

    #[error("Failed to write file '{path}': {error}")]
    #[diagnostic(code(assetflow::file_write_error))]
    FileWriteError { path: PathBuf, error: String },

    #[error("No input files matched pattern: {pattern}")]
    #[diagnostic(
        code(assetflow::no_input_files),
        help("Check that files matching '{pattern}' exist in your project")
    )]
    NoInputFiles { pattern: String },

    // ─────────────────────────────────────────────────────────────────────────
    // Server / Watch Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("Dev server error: {message}")]
    #[diagnostic(code(assetflow::server_error))]
    Server { message: String },

    #[error("File watcher error: {message}")]
    #[diagnostic(code(assetflow::watch_error))]
    Watch { message: String },

    // ─────────────────────────────────────────────────────────────────────────
    // IO/System Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("IO error: {message}")]
    #[diagnostic(code(assetflow::io_error))]
    Io { message: String },

    #[error("YAML parsing error: {message}")]
    #[diagnostic(code(assetflow::yaml_error))]
    Yaml { message: String },

    #[error("Glob pattern error: {message}")]
    #[diagnostic(code(assetflow::glob_error))]
    GlobPattern { message: String },
}

impl From<std::io::Error> for AssetflowError {
    fn from(e: std::io::Error) -> Self {
        Self::Io {
            message: e.to_string(),
        }
    }
}

impl From<serde_yaml::Error> for AssetflowError {
    fn from(e: serde_yaml::Error) -> Self {
        Self::Yaml {
            message: e.to_string(),
        }
    }
}

impl From<globset::Error> for AssetflowError {
    fn from(e: globset::Error) -> Self {
        Self::GlobPattern {
            message: e.to_string(),
        }
    }
}

impl From<minijinja::Error> for AssetflowError {
    fn from(e: minijinja::Error) -> Self {
        Self::Template {
            message: format!("{:#}", e),
        }
    }
}

impl From<reqwest::Error> for AssetflowError {
    fn from(e: reqwest::Error) -> Self {
        Self::Compression {
            message: e.to_string(),
            help: e
                .is_connect()
                .then(|| "The compression service is unreachable. Check your network.".into()),
        }
    }
}

impl From<notify::Error> for AssetflowError {
    fn from(e: notify::Error) -> Self {
        Self::Watch {
            message: e.to_string(),
        }
    }
}

impl AssetflowError {
    /// Create a tool not found error with installation suggestion
    pub fn tool_not_found(tool: &str) -> Self {
        let suggestion = match tool {
            "sass" => "Install Dart Sass: npm install -g sass".to_string(),
            "esbuild" => "Install esbuild: npm install -g esbuild".to_string(),
            "postcss" => "Install PostCSS: npm install -g postcss-cli autoprefixer".to_string(),
            _ => format!("Install {} and ensure it's in your PATH", tool),
        };

        Self::ToolNotFound {
            tool: tool.to_string(),
            suggestion,
        }
    }

    /// Wrap a tool's stderr as a transform failure for a task
    pub fn transform_failed(task: &str, tool: &str, stderr: &str) -> Self {
        Self::TransformFailed {
            task: task.to_string(),
            message: first_meaningful_line(stderr)
                .unwrap_or("tool exited with an error")
                .to_string(),
            help: Self::generate_help_for_tool_error(tool, stderr),
        }
    }

    /// Create a file read error for a path
    pub fn read(path: impl Into<PathBuf>, error: impl ToString) -> Self {
        Self::FileReadError {
            path: path.into(),
            error: error.to_string(),
        }
    }

    /// Create a file write error for a path
    pub fn write(path: impl Into<PathBuf>, error: impl ToString) -> Self {
        Self::FileWriteError {
            path: path.into(),
            error: error.to_string(),
        }
    }

    fn generate_help_for_tool_error(tool: &str, stderr: &str) -> Option<String> {
        match tool {
            "sass" => Self::parse_sass_error(stderr),
            "esbuild" => Self::parse_esbuild_error(stderr),
            _ => None,
        }
    }

    fn parse_sass_error(stderr: &str) -> Option<String> {
        if stderr.contains("Undefined variable") {
            Some("A variable is used before it is declared. Check your imports order.".into())
        } else if stderr.contains("expected") {
            Some("Syntax error. Indented syntax (.sass) is whitespace-sensitive.".into())
        } else if stderr.contains("Can't find stylesheet") {
            Some("An @import or @use path does not resolve. Check the file name.".into())
        } else {
            None
        }
    }

    fn parse_esbuild_error(stderr: &str) -> Option<String> {
        if stderr.contains("Could not resolve") {
            Some("An import does not resolve. Check the path or install the package.".into())
        } else {
            None
        }
    }
}

fn first_meaningful_line(text: &str) -> Option<&str> {
    text.lines().map(str::trim).find(|l| !l.is_empty())
}
