//! `$(find pkg)` package resolution (§4.1).
//!
//! Walks each colon-separated entry of the package search path; the
//! first directory named `pkg` that contains a `package.xml` manifest
//! wins. Sub-directories below a directory containing such a manifest
//! are never descended into (a package owns its whole subtree).

use std::path::{Path, PathBuf};

use crate::error::{LaunchError, Result};

/// Resolves package names to absolute directories.
#[derive(Debug, Clone)]
pub struct PackageLocator {
    search_roots: Vec<PathBuf>,
}

impl PackageLocator {
    #[must_use]
    pub fn new(search_roots: Vec<PathBuf>) -> Self {
        PackageLocator { search_roots }
    }

    /// Builds a locator from a `:`-separated `ROS_PACKAGE_PATH`-style string.
    #[must_use]
    pub fn from_search_path(path: &str) -> Self {
        let roots = path
            .split(':')
            .filter(|s| !s.is_empty())
            .map(PathBuf::from)
            .collect();
        PackageLocator::new(roots)
    }

    pub fn find(&self, pkg: &str) -> Result<PathBuf> {
        for root in &self.search_roots {
            if let Some(found) = search_dir(root, pkg) {
                return Ok(found);
            }
        }
        Err(LaunchError::MissingResource(format!("package '{pkg}' not found")))
    }
}

/// Depth-first search under `dir` for a directory named `pkg` that
/// directly contains a `package.xml`, never descending past a
/// directory that itself contains a manifest (whether or not it's the
/// one we're looking for).
fn search_dir(dir: &Path, pkg: &str) -> Option<PathBuf> {
    let entries = std::fs::read_dir(dir).ok()?;
    let mut subdirs = Vec::new();
    for entry in entries.flatten() {
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }
        let has_manifest = path.join("package.xml").is_file();
        let name_matches = path.file_name().and_then(|n| n.to_str()) == Some(pkg);
        if has_manifest {
            if name_matches {
                return Some(path);
            }
            // Owns its subtree; do not descend into it looking for `pkg`.
            continue;
        }
        subdirs.push(path);
    }
    for subdir in subdirs {
        if let Some(found) = search_dir(&subdir, pkg) {
            return Some(found);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn finds_package_with_manifest() {
        let tmp = tempfile::tempdir().unwrap();
        let pkg_dir = tmp.path().join("nested").join("my_pkg");
        fs::create_dir_all(&pkg_dir).unwrap();
        fs::write(pkg_dir.join("package.xml"), "<package/>").unwrap();

        let locator = PackageLocator::new(vec![tmp.path().to_path_buf()]);
        let found = locator.find("my_pkg").unwrap();
        assert_eq!(found, pkg_dir);
    }

    #[test]
    fn does_not_descend_past_a_manifest() {
        let tmp = tempfile::tempdir().unwrap();
        let outer = tmp.path().join("outer_pkg");
        let inner = outer.join("inner_pkg");
        fs::create_dir_all(&inner).unwrap();
        fs::write(outer.join("package.xml"), "<package/>").unwrap();
        fs::write(inner.join("package.xml"), "<package/>").unwrap();

        let locator = PackageLocator::new(vec![tmp.path().to_path_buf()]);
        assert!(locator.find("inner_pkg").is_err());
    }

    #[test]
    fn missing_package_is_error() {
        let tmp = tempfile::tempdir().unwrap();
        let locator = PackageLocator::new(vec![tmp.path().to_path_buf()]);
        assert!(locator.find("nope").is_err());
    }
}
