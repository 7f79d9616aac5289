// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 assetflow contributors

//! Project definition structures
//!
//! Defines the schema for `assetflow.yaml`. Every section is optional; the
//! defaults describe the canonical `app/` → `build/` layout.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::errors::AssetflowError;
use crate::utils::globs;

/// Default configuration file name, looked up in the project root
pub const DEFAULT_CONFIG_FILE: &str = "assetflow.yaml";

/// Project definition from `assetflow.yaml`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    /// Config version (for future compatibility)
    pub version: String,

    /// Directory holding sources and dev-mode outputs; served by the dev server
    pub source_dir: PathBuf,

    /// Production output directory
    pub output_dir: PathBuf,

    /// Environment file read at startup
    pub env_file: PathBuf,

    /// Task declarations
    pub tasks: Vec<Task>,

    /// Pipeline declarations
    pub pipelines: Vec<Pipeline>,

    /// Watch routing
    pub watch: WatchConfig,

    /// Dev server settings
    pub server: ServerConfig,
}

impl ProjectConfig {
    /// Load the project configuration.
    ///
    /// An explicit path must exist. Without one, `assetflow.yaml` in `root`
    /// is used when present and the built-in defaults otherwise.
    pub fn load(explicit: Option<&Path>, root: &Path) -> Result<Self, AssetflowError> {
        match explicit {
            Some(path) => {
                if !path.exists() {
                    return Err(AssetflowError::FileNotFound {
                        path: path.to_path_buf(),
                        help: Some("Pass an existing file to --config or omit the flag".into()),
                    });
                }
                Self::from_file(path)
            }
            None => {
                let candidate = root.join(DEFAULT_CONFIG_FILE);
                if candidate.exists() {
                    Self::from_file(&candidate)
                } else {
                    tracing::debug!("no {} found, using built-in defaults", DEFAULT_CONFIG_FILE);
                    Ok(Self::default())
                }
            }
        }
    }

    /// Load configuration from a YAML file
    pub fn from_file(path: &Path) -> Result<Self, AssetflowError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| AssetflowError::read(path, e))?;

        Self::from_yaml(&content)
    }

    /// Parse configuration from a YAML string
    ///
    /// Without a `tasks` section the built-in tasks are used, with `clean`
    /// and `copy` pointed at the configured `output_dir`.
    pub fn from_yaml(yaml: &str) -> Result<Self, AssetflowError> {
        let value: serde_yaml::Value = serde_yaml::from_str(yaml)?;
        let declares_tasks = value.get("tasks").is_some();
        let mut config: Self = if value.is_null() {
            Self::default()
        } else {
            serde_yaml::from_value(value)?
        };
        if !declares_tasks {
            config.tasks = default_tasks(&config.output_dir);
        }
        Ok(config)
    }

    /// Serialize configuration to YAML
    pub fn to_yaml(&self) -> Result<String, AssetflowError> {
        serde_yaml::to_string(self).map_err(Into::into)
    }

    /// Get a task by name
    pub fn get_task(&self, name: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.name == name)
    }

    /// Get a pipeline by name
    pub fn get_pipeline(&self, name: &str) -> Option<&Pipeline> {
        self.pipelines.iter().find(|p| p.name == name)
    }

    /// Get a pipeline by name or fail with a diagnostic
    pub fn pipeline(&self, name: &str) -> Result<&Pipeline, AssetflowError> {
        self.get_pipeline(name)
            .ok_or_else(|| AssetflowError::UnknownPipeline {
                pipeline: name.to_string(),
            })
    }

    /// Get all task names
    pub fn task_names(&self) -> Vec<&str> {
        self.tasks.iter().map(|t| t.name.as_str()).collect()
    }
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            version: "1".to_string(),
            source_dir: PathBuf::from("app"),
            output_dir: PathBuf::from("build"),
            env_file: PathBuf::from(".env"),
            tasks: default_tasks(Path::new("build")),
            pipelines: default_pipelines(),
            watch: WatchConfig::default(),
            server: ServerConfig::default(),
        }
    }
}

/// A named invocation of one adapter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    /// Task name (must be unique)
    pub name: String,

    /// Task description
    #[serde(default)]
    pub description: Option<String>,

    /// Adapter and its options
    pub adapter: AdapterSpec,

    /// Input globs, relative to the project root. `!`-prefixed entries exclude.
    #[serde(default)]
    pub input: Vec<String>,

    /// Output file or directory
    pub output: PathBuf,

    /// Tasks that must complete first when both are in the same pipeline
    #[serde(default)]
    pub depends_on: Vec<String>,

    /// Override the adapter's failure policy
    #[serde(default)]
    pub on_error: Option<FailurePolicy>,
}

impl Task {
    /// Create a task with no dependencies and the adapter's default policy
    pub fn new(name: &str, adapter: AdapterSpec, input: &[&str], output: &str) -> Self {
        Self {
            name: name.to_string(),
            description: None,
            adapter,
            input: input.iter().map(|s| s.to_string()).collect(),
            output: PathBuf::from(output),
            depends_on: vec![],
            on_error: None,
        }
    }

    /// Declare dependencies
    pub fn after(mut self, deps: &[&str]) -> Self {
        self.depends_on = deps.iter().map(|s| s.to_string()).collect();
        self
    }

    /// Get the adapter name for this task
    pub fn adapter_name(&self) -> &str {
        self.adapter.name()
    }

    /// Effective failure policy
    pub fn failure_policy(&self) -> FailurePolicy {
        self.on_error.unwrap_or_else(|| self.adapter.default_policy())
    }

    /// Inclusion globs (without the `!` exclusions)
    pub fn include_patterns(&self) -> impl Iterator<Item = &str> {
        self.input
            .iter()
            .map(String::as_str)
            .filter(|p| !p.starts_with('!'))
    }

    /// Files this task is expected to write, relative to the project root.
    ///
    /// Used to infer graph edges. Template pages are resolved from disk
    /// because their output names follow the page files.
    pub fn planned_outputs(&self, root: &Path) -> Vec<PathBuf> {
        match &self.adapter {
            AdapterSpec::Styles { entry, suffix, .. } => {
                let stem = file_stem(entry);
                let css = self.output.join(format!("{}{}", stem, suffix));
                let map = self.output.join(format!("{}{}.map", stem, suffix));
                vec![css, map]
            }
            AdapterSpec::Templates { root: dir, pages, .. } => {
                let pattern = format!("{}/{}", dir.to_string_lossy(), pages);
                globs::resolve_globs(&[pattern], root, true)
                    .unwrap_or_default()
                    .iter()
                    .map(|p| self.output.join(format!("{}.html", file_stem(p))))
                    .collect()
            }
            // In-place rewrite, deletion and promotion produce nothing new
            // inside the source tree.
            AdapterSpec::Images { .. } | AdapterSpec::Clean | AdapterSpec::Copy { .. } => vec![],
            AdapterSpec::Scripts { .. } | AdapterSpec::Libs { .. } | AdapterSpec::Icons => {
                vec![self.output.clone()]
            }
        }
    }
}

pub(crate) fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Adapter specification
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum AdapterSpec {
    /// Bundle an entry module graph with an external bundler
    Scripts {
        /// Entry module
        entry: PathBuf,

        /// Bundler executable
        #[serde(default = "default_bundler")]
        program: String,

        /// Language target passed to the bundler
        #[serde(default = "default_target")]
        target: Option<String>,

        /// Additional bundler flags
        #[serde(default)]
        flags: Vec<String>,
    },

    /// Concatenate prebuilt library files
    Libs {
        /// Library files, in order
        files: Vec<PathBuf>,
    },

    /// Compile, prefix and minify the entry stylesheet
    Styles {
        /// Entry stylesheet
        entry: PathBuf,

        /// Sass executable
        #[serde(default = "default_sass")]
        program: String,

        /// Vendor prefixer executable (PostCSS CLI)
        #[serde(default = "default_prefixer")]
        prefixer: Option<String>,

        /// Browser support matrix for prefixing
        #[serde(default = "default_browsers")]
        browsers: Vec<String>,

        /// Output name suffix replacing the extension
        #[serde(default = "default_css_suffix")]
        suffix: String,
    },

    /// Render page templates into HTML
    Templates {
        /// Template root; layouts and partials are loaded relative to it
        root: PathBuf,

        /// Page glob, relative to `root`
        #[serde(default = "default_pages")]
        pages: String,

        /// Stylesheet path exposed to templates as `css`
        #[serde(default = "default_css_path")]
        css_path: String,

        /// Class naming helper settings
        #[serde(default)]
        bem: BemConfig,

        /// HTML reformatting settings
        #[serde(default)]
        format: HtmlFormatConfig,
    },

    /// Compress raster images through a remote service
    Images {
        /// Service endpoint
        #[serde(default = "default_compression_endpoint")]
        endpoint: String,

        /// Environment variable holding the API key
        #[serde(default = "default_credential_env")]
        credential_env: String,
    },

    /// Assemble SVG icons into a symbol sprite
    Icons,

    /// Promote whitelisted files into the output directory
    Copy {
        /// Base directory stripped from copied paths
        base: PathBuf,
    },

    /// Empty the output directory
    Clean,
}

impl AdapterSpec {
    /// Adapter name used for registry lookup
    pub fn name(&self) -> &'static str {
        match self {
            Self::Scripts { .. } => "scripts",
            Self::Libs { .. } => "libs",
            Self::Styles { .. } => "styles",
            Self::Templates { .. } => "templates",
            Self::Images { .. } => "images",
            Self::Icons => "icons",
            Self::Copy { .. } => "copy",
            Self::Clean => "clean",
        }
    }

    /// How failures of this adapter are treated unless overridden
    pub fn default_policy(&self) -> FailurePolicy {
        match self {
            Self::Styles { .. } | Self::Templates { .. } => FailurePolicy::Notify,
            Self::Scripts { .. } => FailurePolicy::Swallow,
            _ => FailurePolicy::Fail,
        }
    }
}

fn default_bundler() -> String {
    "esbuild".to_string()
}

fn default_target() -> Option<String> {
    Some("es2015".to_string())
}

fn default_sass() -> String {
    "sass".to_string()
}

fn default_prefixer() -> Option<String> {
    Some("postcss".to_string())
}

fn default_browsers() -> Vec<String> {
    vec!["last 10 versions".to_string()]
}

fn default_css_suffix() -> String {
    ".min.css".to_string()
}

fn default_pages() -> String {
    "pages/*.html".to_string()
}

fn default_css_path() -> String {
    "css/main.min.css".to_string()
}

fn default_compression_endpoint() -> String {
    "https://api.tinify.com/shrink".to_string()
}

fn default_credential_env() -> String {
    "TINYPNG_API_KEY".to_string()
}

/// Block/element/modifier class naming
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BemConfig {
    /// Separator between block and element
    pub element_separator: String,
    /// Separator between base class and modifier
    pub modifier_separator: String,
    /// Prefix prepended to every block name
    pub block_prefix: String,
}

impl Default for BemConfig {
    fn default() -> Self {
        Self {
            element_separator: "__".to_string(),
            modifier_separator: "--".to_string(),
            block_prefix: String::new(),
        }
    }
}

/// HTML reformatting options
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HtmlFormatConfig {
    /// Spaces per indentation level
    pub indent_size: usize,
    /// Tags whose contents are emitted verbatim
    pub unformatted: Vec<String>,
    /// Tags that flow inline with surrounding text
    pub inline: Vec<String>,
    /// Tags preceded by a blank line
    pub extra_liners: Vec<String>,
}

impl Default for HtmlFormatConfig {
    fn default() -> Self {
        let strings = |list: &[&str]| list.iter().map(|s| s.to_string()).collect();
        Self {
            indent_size: 2,
            unformatted: strings(&["code", "pre", "em", "strong", "span", "i", "b", "br"]),
            inline: strings(&[
                "a", "abbr", "b", "br", "code", "em", "i", "img", "input", "label", "small",
                "span", "strong", "sub", "sup",
            ]),
            extra_liners: vec![],
        }
    }
}

/// Failure handling for a task
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Surface a notification, keep previous output, continue
    Notify,
    /// Log and treat as completed
    Swallow,
    /// Abort the pipeline
    Fail,
}

impl std::fmt::Display for FailurePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Notify => write!(f, "notify"),
            Self::Swallow => write!(f, "swallow"),
            Self::Fail => write!(f, "fail"),
        }
    }
}

/// Build mode passed to adapters
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Development,
    Production,
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Development => write!(f, "development"),
            Self::Production => write!(f, "production"),
        }
    }
}

/// A composition of tasks representing one build mode
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pipeline {
    /// Pipeline name
    pub name: String,

    /// Pipeline description
    #[serde(default)]
    pub description: Option<String>,

    /// Member tasks; listing order breaks ties between independent tasks
    pub tasks: Vec<String>,

    /// Mode passed to adapters
    #[serde(default)]
    pub mode: Mode,

    /// Start the dev server after the tasks
    #[serde(default)]
    pub serve: bool,

    /// Start the file watcher after the tasks
    #[serde(default)]
    pub watch: bool,

    /// Report failure when any task recovered from an error
    #[serde(default)]
    pub strict: bool,
}

/// Watch routing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    /// Polling interval in milliseconds
    pub poll_interval_ms: u64,
    /// Routing rules; later rules win on overlap
    pub rules: Vec<WatchRule>,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 100,
            rules: vec![
                WatchRule::new(
                    &["app/sass/**/*.sass", "app/sass/**/*.scss"],
                    &["app/sass/libs/**"],
                    "styles",
                ),
                WatchRule::new(&["app/templates/**/*.html"], &[], "templates"),
                WatchRule::new(&["app/js/main.js", "app/js/modules/*.js"], &[], "scripts"),
                WatchRule::new(&["app/img/svg-sprite/*.svg"], &[], "icons"),
            ],
        }
    }
}

/// A glob-to-task binding
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchRule {
    /// Globs that select changed files
    pub patterns: Vec<String>,
    /// Globs that veto a match
    #[serde(default)]
    pub exclude: Vec<String>,
    /// Task to run
    pub task: String,
}

impl WatchRule {
    /// Create a rule
    pub fn new(patterns: &[&str], exclude: &[&str], task: &str) -> Self {
        Self {
            patterns: patterns.iter().map(|s| s.to_string()).collect(),
            exclude: exclude.iter().map(|s| s.to_string()).collect(),
            task: task.to_string(),
        }
    }
}

/// Dev server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address
    pub host: String,
    /// Bind port
    pub port: u16,
    /// Served directory; defaults to the source directory
    pub root: Option<PathBuf>,
    /// How long a reload poll is held open, in milliseconds
    pub poll_timeout_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            root: None,
            poll_timeout_ms: 25_000,
        }
    }
}

fn default_tasks(output_dir: &Path) -> Vec<Task> {
    let output = output_dir.to_string_lossy();
    vec![
        Task::new("clean", AdapterSpec::Clean, &[], &output),
        Task::new(
            "libs",
            AdapterSpec::Libs {
                files: vec![
                    PathBuf::from("node_modules/jquery/dist/jquery.min.js"),
                    PathBuf::from("node_modules/magnific-popup/dist/jquery.magnific-popup.min.js"),
                ],
            },
            &[
                "node_modules/jquery/dist/jquery.min.js",
                "node_modules/magnific-popup/dist/jquery.magnific-popup.min.js",
            ],
            "app/js/libs.min.js",
        ),
        Task::new(
            "scripts",
            AdapterSpec::Scripts {
                entry: PathBuf::from("app/js/main.js"),
                program: default_bundler(),
                target: default_target(),
                flags: vec![],
            },
            &["app/js/main.js", "app/js/modules/*.js"],
            "app/js/main.bundle.js",
        ),
        Task::new(
            "styles",
            AdapterSpec::Styles {
                entry: PathBuf::from("app/sass/main.sass"),
                program: default_sass(),
                prefixer: default_prefixer(),
                browsers: default_browsers(),
                suffix: default_css_suffix(),
            },
            &["app/sass/**/*.sass", "app/sass/**/*.scss"],
            "app/css",
        ),
        Task::new(
            "templates",
            AdapterSpec::Templates {
                root: PathBuf::from("app/templates"),
                pages: default_pages(),
                css_path: default_css_path(),
                bem: BemConfig::default(),
                format: HtmlFormatConfig::default(),
            },
            &["app/templates/**/*.html"],
            "app",
        )
        .after(&["styles"]),
        Task::new(
            "icons",
            AdapterSpec::Icons,
            &["app/img/svg-sprite/*.svg"],
            "app/img/svg-sprite.svg",
        ),
        Task::new(
            "images",
            AdapterSpec::Images {
                endpoint: default_compression_endpoint(),
                credential_env: default_credential_env(),
            },
            &["app/img/**/*.{png,jpg,jpeg,webp}"],
            "app/img",
        ),
        Task::new(
            "copy",
            AdapterSpec::Copy {
                base: PathBuf::from("app"),
            },
            &[
                "app/css/main.min.css",
                "app/js/*.{js,json}",
                "!app/js/main.js",
                "app/js/main.bundle.js",
                "app/fonts/**/*",
                "app/img/**/*",
                "app/*.html",
                "app/.htaccess",
                "app/mail/*",
            ],
            &output,
        )
        .after(&["clean", "libs", "scripts", "styles", "templates", "icons"]),
    ]
}

fn default_pipelines() -> Vec<Pipeline> {
    let names = |list: &[&str]| list.iter().map(|s| s.to_string()).collect();
    vec![
        Pipeline {
            name: "dev".to_string(),
            description: Some("Fast unminified build, then serve and watch".to_string()),
            tasks: names(&["libs", "scripts", "styles", "templates", "icons"]),
            mode: Mode::Development,
            serve: true,
            watch: true,
            strict: false,
        },
        Pipeline {
            name: "build".to_string(),
            description: Some("Minified build promoted into the output directory".to_string()),
            tasks: names(&[
                "clean", "libs", "scripts", "styles", "templates", "icons", "copy",
            ]),
            mode: Mode::Production,
            serve: false,
            watch: false,
            strict: true,
        },
        Pipeline {
            name: "compress".to_string(),
            description: Some("Compress raster images in place".to_string()),
            tasks: names(&["images"]),
            mode: Mode::Production,
            serve: false,
            watch: false,
            strict: true,
        },
    ]
}
