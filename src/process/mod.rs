//! Process handles (§3 `ProcessHandle`, components G and H).

pub mod handle;
pub mod local;
pub mod remote;

pub use handle::ProcessHandle;

use std::path::PathBuf;

use crate::error::{LaunchError, Result};
use crate::substitution::pkg_locator::PackageLocator;

/// Resolves a node's executable within its package directory (§4.1
/// `$(find pkg)` plus the conventional `bin/<type>` layout; a bare
/// `<type>` at the package root is accepted too).
pub fn resolve_executable(locator: &PackageLocator, pkg: &str, node_type: &str) -> Result<PathBuf> {
    let pkg_dir = locator.find(pkg)?;
    let candidates = [pkg_dir.join("bin").join(node_type), pkg_dir.join(node_type)];
    candidates
        .into_iter()
        .find(|p| p.is_file())
        .ok_or_else(|| {
            LaunchError::MissingResource(format!(
                "package '{pkg}' has no executable named '{node_type}' (looked in 'bin/' and the package root)"
            ))
        })
}

/// Builds `from:=to` remap argv entries in a deterministic order.
pub(crate) fn remap_args(remap: &std::collections::BTreeMap<String, String>) -> Vec<String> {
    remap.iter().map(|(from, to)| format!("{from}:={to}")).collect()
}

pub(crate) fn package_dir(locator: &PackageLocator, pkg: &str) -> Result<PathBuf> {
    locator.find(pkg)
}

pub(crate) fn default_cwd() -> PathBuf {
    std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
}

pub(crate) fn env_var_dir(name: &str) -> Option<PathBuf> {
    std::env::var(name).ok().map(PathBuf::from)
}
