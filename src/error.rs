//! Library error type.
//!
//! One variant per §7 error kind. Mirrors the teacher's split between
//! a library-level `thiserror::Error` enum (`agentwire::BrokerError`,
//! `agentwire::agent::process::CallError`) and a `color-eyre`-reporting
//! binary crate root — this enum is what the library returns, and
//! `main.rs` is the only place that turns it into a human report.

use std::path::PathBuf;

use thiserror::Error;

/// Every fallible operation in this crate returns this error type.
#[derive(Error, Debug)]
pub enum LaunchError {
    /// Usage misuse on the command line (§7.1).
    #[error("{0}")]
    CommandLine(String),

    /// Well-formedness, schema, or semantic rule violation in a launch
    /// file (§7.2). Carries the offending file so callers can print
    /// the mandated `[path]: <reason>` shape.
    #[error("[{file}]: {reason}")]
    Parse { file: PathBuf, reason: String },

    /// Unknown package, unknown machine, or unreadable file (§7.3).
    #[error("missing resource: {0}")]
    MissingResource(String),

    /// The include graph revisited an ancestor (§7.4).
    #[error("cycle in the launch graph: {path}")]
    Cycle { path: String },

    /// Registry connection failure or fault response (§7.5).
    #[error("registry error: {0}")]
    Registry(String),

    /// Could not fork or locate an executable for a node (§7.6).
    #[error("failed to spawn node {name}: {reason}")]
    Spawn { name: String, reason: String },

    /// A required process died; the required-dies-fails-all rule
    /// fired (§7.7).
    #[error("REQUIRED process [{0}] has died!")]
    RequiredDied(String),

    /// SSH connection, auth, or host-key verification failure (§7.8).
    #[error("remote connection error ({machine}): {reason}")]
    Remote { machine: String, reason: String },

    /// Wraps an underlying I/O failure with the operation that triggered it.
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

impl LaunchError {
    pub fn parse(file: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        LaunchError::Parse { file: file.into(), reason: reason.into() }
    }

    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        LaunchError::Io { context: context.into(), source }
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, LaunchError>;
