// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 assetflow contributors

//! Environment loading
//!
//! Values from the project's `.env` file are merged under the process
//! environment; a variable exported in the shell always wins.

use std::collections::HashMap;
use std::path::Path;

use crate::errors::AssetflowError;

/// Load the task environment: `.env` entries overlaid by the process env.
///
/// A missing file is not an error.
pub fn load_env(path: &Path) -> Result<HashMap<String, String>, AssetflowError> {
    let mut env = read_env_file(path)?;
    env.extend(process_env());
    Ok(env)
}

/// Process variables whose name and value are valid UTF-8
fn process_env() -> impl Iterator<Item = (String, String)> {
    std::env::vars_os()
        .filter_map(|(key, value)| Some((key.into_string().ok()?, value.into_string().ok()?)))
}

/// Parse a `.env` file without touching the process environment
pub fn read_env_file(path: &Path) -> Result<HashMap<String, String>, AssetflowError> {
    if !path.is_file() {
        tracing::debug!(path = %path.display(), "no env file");
        return Ok(HashMap::new());
    }

    let invalid = |e: dotenvy::Error| AssetflowError::InvalidConfig {
        reason: format!("cannot parse {}: {}", path.display(), e),
        help: Some("Each line must be KEY=value".into()),
    };

    let mut values = HashMap::new();
    for item in dotenvy::from_path_iter(path).map_err(invalid)? {
        let (key, value) = item.map_err(invalid)?;
        values.insert(key, value);
    }

    tracing::debug!(path = %path.display(), count = values.len(), "loaded env file");
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reads_env_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join(".env");
        std::fs::write(&path, "# credentials\nTINYPNG_API_KEY=abc123\nQUOTED=\"a b\"\n").unwrap();

        let values = read_env_file(&path).unwrap();
        assert_eq!(values.get("TINYPNG_API_KEY").map(String::as_str), Some("abc123"));
        assert_eq!(values.get("QUOTED").map(String::as_str), Some("a b"));
    }

    #[test]
    fn test_missing_file_is_empty() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(read_env_file(&tmp.path().join(".env")).unwrap().is_empty());
    }

    #[test]
    fn test_process_env_wins() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join(".env");
        std::fs::write(&path, "PATH=/from/dotenv\nASSETFLOW_ONLY_IN_FILE=1\n").unwrap();

        let env = load_env(&path).unwrap();
        assert_ne!(env.get("PATH").map(String::as_str), Some("/from/dotenv"));
        assert_eq!(env.get("ASSETFLOW_ONLY_IN_FILE").map(String::as_str), Some("1"));
    }

    #[cfg(unix)]
    #[test]
    fn test_non_utf8_process_value_skipped() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        std::env::set_var("ASSETFLOW_NOT_UTF8", OsStr::from_bytes(b"caf\xe9"));
        let tmp = tempfile::tempdir().unwrap();
        let env = load_env(&tmp.path().join(".env")).unwrap();
        std::env::remove_var("ASSETFLOW_NOT_UTF8");

        assert!(!env.contains_key("ASSETFLOW_NOT_UTF8"));
        assert!(env.contains_key("PATH"));
    }
}
