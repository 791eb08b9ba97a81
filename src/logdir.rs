//! Per-run log directory, PID file, and disk-space check (§6
//! "Persisted state", component K).
//!
//! New territory for the teacher pack; `nix::sys::statvfs` is chosen
//! because `nix` is already a teacher dependency (`agentwire`) for
//! exactly this kind of thin POSIX wrapper.

use std::fs;
use std::os::unix::fs::symlink;
use std::path::{Path, PathBuf};

use crate::consts;
use crate::error::{LaunchError, Result};

/// Owns the per-run log directory and the optional PID file; both are
/// removed by `cleanup`, which is safe to call more than once (§7
/// "cleanup is idempotent").
pub struct LogDir {
    path: PathBuf,
    pid_file: Option<PathBuf>,
}

impl LogDir {
    /// Creates `<ROS_HOME>/log/<run_id>`, refreshes the `latest`
    /// symlink to point at it, and writes the PID file if requested.
    pub fn create(run_id: &str, pid_file: Option<PathBuf>, skip_log_check: bool) -> Result<Self> {
        let ros_home = resolve_ros_home();
        let log_root = ros_home.join("log");
        let path = log_root.join(run_id);

        if !skip_log_check {
            check_free_space(&log_root)?;
        }

        fs::create_dir_all(&path).map_err(|e| LaunchError::io(format!("creating log directory '{}'", path.display()), e))?;

        refresh_latest_symlink(&log_root, &path);

        if let Some(pid_path) = &pid_file {
            fs::write(pid_path, std::process::id().to_string())
                .map_err(|e| LaunchError::io(format!("writing pid file '{}'", pid_path.display()), e))?;
        }

        Ok(LogDir { path, pid_file })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Deletes the PID file (the log directory itself is left for the
    /// user to inspect, matching the real tool's behavior of keeping
    /// per-run logs around after shutdown). Safe to call twice.
    pub fn cleanup(&mut self) {
        if let Some(pid_path) = self.pid_file.take() {
            let _ = fs::remove_file(pid_path);
        }
    }
}

impl Drop for LogDir {
    fn drop(&mut self) {
        self.cleanup();
    }
}

fn resolve_ros_home() -> PathBuf {
    if let Ok(home) = std::env::var(consts::env_vars::ROS_HOME) {
        return PathBuf::from(home);
    }
    std::env::var("HOME").map(|h| PathBuf::from(h).join(".ros")).unwrap_or_else(|_| PathBuf::from(".ros"))
}

fn refresh_latest_symlink(log_root: &Path, target: &Path) {
    let link = log_root.join("latest");
    let _ = fs::remove_file(&link);
    let _ = symlink(target, &link);
}

fn check_free_space(log_root: &Path) -> Result<()> {
    let probe_dir = if log_root.is_dir() { log_root.to_path_buf() } else { nearest_existing_ancestor(log_root) };
    let stats = nix::sys::statvfs::statvfs(&probe_dir)
        .map_err(|e| LaunchError::io(format!("checking free space under '{}'", probe_dir.display()), e.into()))?;
    let free_bytes = stats.blocks_available() as u64 * stats.fragment_size() as u64;
    if free_bytes < consts::MIN_FREE_LOG_SPACE_BYTES {
        return Err(LaunchError::Io {
            context: format!("only {free_bytes} bytes free under '{}'", probe_dir.display()),
            source: std::io::Error::new(std::io::ErrorKind::Other, "insufficient disk space for logs"),
        });
    }
    Ok(())
}

fn nearest_existing_ancestor(path: &Path) -> PathBuf {
    let mut current = path;
    loop {
        if current.is_dir() {
            return current.to_path_buf();
        }
        match current.parent() {
            Some(parent) => current = parent,
            None => return PathBuf::from("/"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn creates_log_directory_and_latest_symlink() {
        let tmp = tempfile::tempdir().unwrap();
        std::env::set_var(consts::env_vars::ROS_HOME, tmp.path());
        let dir = LogDir::create("run-123", None, true).unwrap();
        assert!(dir.path().is_dir());
        let latest = tmp.path().join("log/latest");
        assert_eq!(fs::read_link(latest).unwrap(), dir.path());
        std::env::remove_var(consts::env_vars::ROS_HOME);
    }

    #[test]
    fn cleanup_removes_pid_file_and_is_idempotent() {
        let tmp = tempfile::tempdir().unwrap();
        std::env::set_var(consts::env_vars::ROS_HOME, tmp.path());
        let pid_path = tmp.path().join("roslaunch.pid");
        let mut dir = LogDir::create("run-456", Some(pid_path.clone()), true).unwrap();
        assert!(pid_path.is_file());
        dir.cleanup();
        assert!(!pid_path.is_file());
        dir.cleanup();
        std::env::remove_var(consts::env_vars::ROS_HOME);
    }
}
