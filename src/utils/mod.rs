// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 assetflow contributors

//! Utility modules
//!
//! Terminal styling, progress bars and glob helpers shared across assetflow.

pub mod colors;
pub mod globs;
pub mod spinner;

pub use colors::*;
pub use spinner::*;
