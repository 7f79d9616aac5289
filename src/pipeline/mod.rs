// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 assetflow contributors

//! Task graph
//!
//! Project configuration, the dependency graph built from it, validation,
//! and the executor that runs a pipeline's tasks in order.

mod dag;
pub mod definition;
mod executor;
mod validation;

pub use dag::{DagBuilder, EdgeKind};
pub use definition::*;
pub use executor::{ExecutionOptions, PipelineExecutor, PipelineResult, TaskOutcome};
pub use validation::{ProjectValidator, ValidationResult};
