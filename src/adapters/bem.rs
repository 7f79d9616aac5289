// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 assetflow contributors

//! Block/element/modifier class naming for templates

use minijinja::value::Value;
use minijinja::{Environment, Error, ErrorKind};

use crate::pipeline::BemConfig;

/// Class name builder exposed to templates as `bem(block, element, modifiers)`
#[derive(Debug, Clone, Default)]
pub struct Bem {
    config: BemConfig,
}

impl Bem {
    pub fn new(config: BemConfig) -> Self {
        Self { config }
    }

    /// Build the class list for a block or element with modifiers.
    ///
    /// `bem("card", Some("title"), &["big"])` gives
    /// `card__title card__title--big`.
    pub fn class(&self, block: &str, element: Option<&str>, modifiers: &[String]) -> String {
        let mut base = format!("{}{}", self.config.block_prefix, block);
        if let Some(element) = element.filter(|e| !e.is_empty()) {
            base.push_str(&self.config.element_separator);
            base.push_str(element);
        }

        let mut classes = base.clone();
        for modifier in modifiers.iter().filter(|m| !m.is_empty()) {
            classes.push(' ');
            classes.push_str(&base);
            classes.push_str(&self.config.modifier_separator);
            classes.push_str(modifier);
        }
        classes
    }

    /// Register the `bem` function in a template environment
    pub fn register(&self, env: &mut Environment<'_>) {
        let bem = self.clone();
        env.add_function(
            "bem",
            move |block: String, element: Option<String>, modifiers: Option<Value>| {
                let modifiers = modifier_list(modifiers)?;
                Ok::<_, Error>(bem.class(&block, element.as_deref(), &modifiers))
            },
        );
    }
}

/// Accept a single modifier string (space separated) or a sequence
fn modifier_list(value: Option<Value>) -> Result<Vec<String>, Error> {
    let Some(value) = value else {
        return Ok(vec![]);
    };
    if value.is_none() || value.is_undefined() {
        return Ok(vec![]);
    }
    if let Some(s) = value.as_str() {
        return Ok(s.split_whitespace().map(String::from).collect());
    }

    let iter = value.try_iter().map_err(|_| {
        Error::new(
            ErrorKind::InvalidOperation,
            "bem modifiers must be a string or a list",
        )
    })?;
    Ok(iter.map(|item| item.to_string()).collect())
}
