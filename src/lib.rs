// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 assetflow contributors

//! # assetflow - Front-end asset pipeline
//!
//! `assetflow` compiles stylesheets, bundles scripts, renders page
//! templates, builds an SVG icon sprite and compresses images, then serves
//! the result with live reload while watching the sources.
//!
//! ## Features
//!
//! - **Task graph** - Pipelines run in dependency order, with edges declared
//!   or inferred from task inputs and outputs
//! - **Watch routing** - Each changed file triggers exactly one task
//! - **Safe outputs** - Failed transforms keep the previous good output
//! - **Dev server** - Static files with stylesheet injection and page reload
//!
//! ## Quick Start
//!
//! ```bash
//! # Build, serve on http://127.0.0.1:3000 and watch
//! assetflow
//!
//! # Production build into build/
//! assetflow build
//!
//! # Compress images (needs TINYPNG_API_KEY)
//! assetflow compress
//! ```

pub mod adapters;
pub mod cli;
pub mod env;
pub mod errors;
pub mod fingerprint;
pub mod notifier;
pub mod pipeline;
pub mod server;
pub mod utils;
pub mod watch;

// Re-export commonly used types
pub use errors::{AssetflowError, AssetflowResult};
pub use pipeline::{Pipeline, PipelineExecutor, ProjectConfig, Task};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
