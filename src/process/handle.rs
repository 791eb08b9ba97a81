//! `ProcessHandle` (§3, §9 "Polymorphism without inheritance"): a
//! sealed sum of `{local, remote}` behind one small interface, rather
//! than a trait object. The monitor (I) only ever sees this enum.

use std::time::Duration;

use crate::error::Result;

use super::local::LocalProcess;
use super::remote::RemoteProcess;

/// One supervised worker, local or tunneled over SSH.
pub enum ProcessHandle {
    Local(LocalProcess),
    Remote(RemoteProcess),
}

impl ProcessHandle {
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            ProcessHandle::Local(p) => p.name(),
            ProcessHandle::Remote(p) => p.name(),
        }
    }

    pub fn rename(&mut self, new_name: String) {
        match self {
            ProcessHandle::Local(p) => p.rename(new_name),
            ProcessHandle::Remote(p) => p.rename(new_name),
        }
    }

    #[must_use]
    pub fn required(&self) -> bool {
        match self {
            ProcessHandle::Local(p) => p.required,
            ProcessHandle::Remote(p) => p.required,
        }
    }

    #[must_use]
    pub fn respawn(&self) -> bool {
        match self {
            ProcessHandle::Local(p) => p.respawn,
            ProcessHandle::Remote(p) => p.respawn,
        }
    }

    #[must_use]
    pub fn respawn_delay(&self) -> Duration {
        match self {
            ProcessHandle::Local(p) => p.respawn_delay,
            ProcessHandle::Remote(p) => p.respawn_delay,
        }
    }

    /// Polls for liveness without blocking. A `false` result means the
    /// child has exited; its description is cached for later retrieval.
    pub fn is_running(&mut self) -> Result<bool> {
        match self {
            ProcessHandle::Local(p) => p.is_running(),
            ProcessHandle::Remote(p) => p.is_running(),
        }
    }

    pub fn destroy(&mut self) -> Result<()> {
        match self {
            ProcessHandle::Local(p) => p.destroy(),
            ProcessHandle::Remote(p) => p.destroy(),
        }
    }

    pub fn wait_for(&mut self) -> Result<()> {
        match self {
            ProcessHandle::Local(p) => p.wait_for(),
            ProcessHandle::Remote(p) => p.wait_for(),
        }
    }

    /// Re-launches the process after a death (respawn) or fails
    /// cleanly for a remote handle (§4.8: restart unsupported there).
    pub fn restart(&mut self) -> Result<()> {
        match self {
            ProcessHandle::Local(p) => p.restart(),
            ProcessHandle::Remote(p) => p.restart(),
        }
    }

    #[must_use]
    pub fn exit_description(&self) -> Option<&str> {
        match self {
            ProcessHandle::Local(p) => p.exit_description.as_deref(),
            ProcessHandle::Remote(p) => p.exit_description.as_deref(),
        }
    }
}
