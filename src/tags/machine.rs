//! `<machine>` (§4.2, §3 `MachineSpec`).

use std::time::Duration;

use crate::error::{LaunchError, Result};

use super::{AttrReader, Warnings};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MachineDefault {
    True,
    False,
    Never,
}

/// `{name, address, ssh port, user, password, env loader path, timeout}`.
/// Equality ignores `name` (used to canonicalize duplicates, §4.4).
#[derive(Debug, Clone, PartialEq)]
pub struct MachineTag {
    pub name: String,
    pub address: String,
    pub ssh_port: u16,
    pub user: Option<String>,
    pub password: Option<String>,
    pub env_loader: Option<String>,
    pub timeout: Duration,
    pub default: MachineDefault,
}

impl MachineTag {
    pub fn parse(attrs: &AttrReader<'_, '_>, warnings: &mut Warnings) -> Result<Self> {
        attrs.warn_unknown(
            &["name", "address", "env-loader", "user", "password", "ssh-port", "timeout", "default", "if", "unless"],
            warnings,
        );

        let name = attrs.require("name")?;
        let address = attrs.require("address")?;
        let user = attrs.get("user")?;
        let password = attrs.get("password")?;
        let env_loader = attrs.get("env-loader")?;

        let ssh_port = match attrs.get("ssh-port")? {
            Some(v) => v.trim().parse::<u16>().map_err(|_| {
                LaunchError::parse(attrs.file(), format!("machine '{name}' has invalid ssh-port '{v}'"))
            })?,
            None => crate::consts::DEFAULT_SSH_PORT,
        };

        let timeout = match attrs.get("timeout")? {
            Some(v) => {
                let secs: f64 = v.trim().parse().map_err(|_| {
                    LaunchError::parse(attrs.file(), format!("machine '{name}' has invalid timeout '{v}'"))
                })?;
                Duration::from_secs_f64(secs)
            }
            None => crate::consts::DEFAULT_MACHINE_TIMEOUT,
        };

        let default = match attrs.get("default")?.as_deref() {
            None | Some("false") => MachineDefault::False,
            Some("true") => MachineDefault::True,
            Some("never") => MachineDefault::Never,
            Some(other) => {
                return Err(LaunchError::parse(
                    attrs.file(),
                    format!("machine '{name}' has invalid default='{other}'"),
                ))
            }
        };

        Ok(MachineTag { name, address, ssh_port, user, password, env_loader, timeout, default })
    }

    /// Connection-parameter equality used to canonicalize duplicate
    /// machines (§3, §4.4): ignores `name` and `default`.
    #[must_use]
    pub fn same_connection(&self, other: &MachineTag) -> bool {
        self.address == other.address
            && self.ssh_port == other.ssh_port
            && self.user == other.user
            && self.password == other.password
            && self.env_loader == other.env_loader
            && self.timeout == other.timeout
    }
}
