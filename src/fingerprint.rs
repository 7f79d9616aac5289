// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 assetflow contributors

//! Content fingerprints
//!
//! Uses BLAKE3 to decide whether an output actually changed, so repeated
//! runs leave identical files untouched.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::errors::AssetflowError;

/// Hash a byte slice
pub fn hash_bytes(bytes: &[u8]) -> String {
    blake3::hash(bytes).to_hex().to_string()
}

/// Hash a file's contents
pub fn hash_file(path: &Path) -> Result<String, AssetflowError> {
    let content = std::fs::read(path).map_err(|e| AssetflowError::read(path, e))?;
    Ok(hash_bytes(&content))
}

/// Whether two files exist and hold identical bytes
pub fn same_content(a: &Path, b: &Path) -> Result<bool, AssetflowError> {
    if !a.is_file() || !b.is_file() {
        return Ok(false);
    }
    let (meta_a, meta_b) = (
        std::fs::metadata(a).map_err(|e| AssetflowError::read(a, e))?,
        std::fs::metadata(b).map_err(|e| AssetflowError::read(b, e))?,
    );
    if meta_a.len() != meta_b.len() {
        return Ok(false);
    }
    Ok(hash_file(a)? == hash_file(b)?)
}

/// Fingerprint every file under a directory, keyed by relative path
pub fn hash_tree(dir: &Path) -> Result<BTreeMap<PathBuf, String>, AssetflowError> {
    let mut tree = BTreeMap::new();
    if !dir.exists() {
        return Ok(tree);
    }

    for entry in walkdir::WalkDir::new(dir).sort_by_file_name() {
        let entry = entry.map_err(|e| AssetflowError::read(dir, e))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let rel = entry
            .path()
            .strip_prefix(dir)
            .unwrap_or(entry.path())
            .to_path_buf();
        tree.insert(rel, hash_file(entry.path())?);
    }

    Ok(tree)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_is_stable() {
        assert_eq!(hash_bytes(b"body{}"), hash_bytes(b"body{}"));
        assert_ne!(hash_bytes(b"body{}"), hash_bytes(b"body {}"));
    }

    #[test]
    fn test_same_content() {
        let tmp = tempfile::tempdir().unwrap();
        let (a, b, c) = (
            tmp.path().join("a"),
            tmp.path().join("b"),
            tmp.path().join("c"),
        );
        std::fs::write(&a, "x").unwrap();
        std::fs::write(&b, "x").unwrap();
        std::fs::write(&c, "y").unwrap();

        assert!(same_content(&a, &b).unwrap());
        assert!(!same_content(&a, &c).unwrap());
        assert!(!same_content(&a, &tmp.path().join("missing")).unwrap());
    }

    #[test]
    fn test_hash_tree() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(tmp.path().join("css")).unwrap();
        std::fs::write(tmp.path().join("css/main.min.css"), "a{}").unwrap();
        std::fs::write(tmp.path().join("index.html"), "<p></p>").unwrap();

        let tree = hash_tree(tmp.path()).unwrap();
        let keys: Vec<_> = tree.keys().cloned().collect();
        assert_eq!(
            keys,
            vec![PathBuf::from("css/main.min.css"), PathBuf::from("index.html")]
        );
    }
}
