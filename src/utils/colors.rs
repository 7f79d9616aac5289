// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 assetflow contributors

//! Terminal color utilities
//!
//! Consistent styling for pipeline progress and notifications.

use colored::Colorize;
use std::io::IsTerminal;

/// Keep colors only when stdout is a terminal with `TERM` set and no `NO_COLOR`
pub fn configure_colors() {
    let disable = colors_disabled(
        std::env::var_os("NO_COLOR").is_some(),
        std::env::var_os("TERM").is_some(),
        std::io::stdout().is_terminal(),
    );
    if disable {
        colored::control::set_override(false);
    }
}

fn colors_disabled(no_color: bool, term_set: bool, stdout_is_terminal: bool) -> bool {
    no_color || !term_set || !stdout_is_terminal
}

/// Print a styled section
pub fn print_section(title: &str) {
    println!();
    println!("{}:", title.bold());
}

/// Print a success check
pub fn print_success(msg: &str) {
    println!("  {} {}", "✓".green(), msg);
}

/// Print an error cross
pub fn print_error(msg: &str) {
    println!("  {} {}", "✗".red(), msg);
}

/// Print a warning
pub fn print_warning(msg: &str) {
    println!("  {} {}", "⚠".yellow(), msg);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_colors_disabled() {
        assert!(!colors_disabled(false, true, true));
        assert!(colors_disabled(true, true, true));
        assert!(colors_disabled(false, false, true));
        assert!(colors_disabled(false, true, false));
    }
}
