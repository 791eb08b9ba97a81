//! `<node>` and `<test>` (§4.2, §3 `ProcessSpec`).

use std::time::Duration;

use crate::error::{LaunchError, Result};

use super::{AttrReader, Warnings};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputPolicy {
    Log,
    Screen,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CwdPolicy {
    RosHome,
    RosRoot,
    Cwd,
    Node,
}

impl CwdPolicy {
    fn parse(value: &str, allowed: &[(&str, CwdPolicy)], file: &std::path::Path, tag: &str) -> Result<Self> {
        allowed
            .iter()
            .find(|(name, _)| *name == value)
            .map(|(_, policy)| *policy)
            .ok_or_else(|| {
                let names: Vec<&str> = allowed.iter().map(|(n, _)| *n).collect();
                LaunchError::parse(
                    file,
                    format!("<{tag}> cwd='{value}' must be one of {names:?}"),
                )
            })
    }
}

/// `<node>`: `{name, pkg, type, argv extras, ..., required, respawn?,
/// respawn delay, output policy, cwd policy, launch prefix, ns,
/// machine}`. `required ∧ respawn` is forbidden.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeTag {
    pub name: String,
    pub pkg: String,
    pub node_type: String,
    pub output: OutputPolicy,
    pub cwd: CwdPolicy,
    pub respawn: bool,
    pub respawn_delay: Duration,
    pub required: bool,
    pub ns: Option<String>,
    pub machine: Option<String>,
    pub launch_prefix: Option<String>,
    pub args: Option<String>,
    pub clear_params: bool,
}

const NODE_ATTRS: &[&str] = &[
    "name", "pkg", "type", "output", "cwd", "respawn", "respawn_delay", "required", "ns",
    "machine", "launch-prefix", "args", "clear_params", "if", "unless",
];

impl NodeTag {
    pub fn parse(attrs: &AttrReader<'_, '_>, warnings: &mut Warnings) -> Result<Self> {
        attrs.warn_unknown(NODE_ATTRS, warnings);

        let name = attrs.require("name")?;
        if name.contains('/') {
            return Err(LaunchError::parse(attrs.file(), format!("<node> name '{name}' must not contain '/'")));
        }
        let pkg = attrs.require("pkg")?;
        let node_type = attrs.require("type")?;

        let output = match attrs.get("output")?.as_deref() {
            None | Some("log") => OutputPolicy::Log,
            Some("screen") => OutputPolicy::Screen,
            Some(other) => {
                return Err(LaunchError::parse(attrs.file(), format!("<node> output='{other}' invalid")))
            }
        };

        let cwd = match attrs.get("cwd")? {
            Some(v) => CwdPolicy::parse(
                &v,
                &[
                    ("ros-home", CwdPolicy::RosHome),
                    ("ros-root", CwdPolicy::RosRoot),
                    ("cwd", CwdPolicy::Cwd),
                    ("node", CwdPolicy::Node),
                ],
                attrs.file(),
                "node",
            )?,
            None => CwdPolicy::RosHome,
        };

        let respawn = attrs.get_bool("respawn", false)?;
        let required = attrs.get_bool("required", false)?;
        if respawn && required {
            return Err(LaunchError::parse(
                attrs.file(),
                format!("<node name=\"{name}\"> cannot set both 'respawn' and 'required'"),
            ));
        }

        let respawn_delay = match attrs.get("respawn_delay")? {
            Some(v) => {
                let secs: f64 = v.trim().parse().map_err(|_| {
                    LaunchError::parse(attrs.file(), format!("invalid respawn_delay '{v}'"))
                })?;
                Duration::from_secs_f64(secs.max(0.0))
            }
            None => Duration::from_secs(0),
        };

        Ok(NodeTag {
            name,
            pkg,
            node_type,
            output,
            cwd,
            respawn,
            respawn_delay,
            required,
            ns: attrs.get("ns")?,
            machine: attrs.get("machine")?,
            launch_prefix: attrs.get("launch-prefix")?,
            args: attrs.get("args")?,
            clear_params: attrs.get_bool("clear_params", false)?,
        })
    }
}

/// `<test>`: like `<node>` but with `test-name` (no slash), `retry`
/// (default 0), `time-limit` seconds (default 60), and a restricted
/// `cwd` alphabet.
#[derive(Debug, Clone, PartialEq)]
pub struct TestTag {
    pub test_name: String,
    pub pkg: String,
    pub node_type: String,
    pub cwd: CwdPolicy,
    pub retry: u32,
    pub time_limit: Duration,
    pub ns: Option<String>,
    pub machine: Option<String>,
    pub launch_prefix: Option<String>,
    pub args: Option<String>,
}

const TEST_ATTRS: &[&str] = &[
    "test-name", "pkg", "type", "cwd", "retry", "time-limit", "ns", "machine", "launch-prefix",
    "args", "if", "unless",
];

impl TestTag {
    pub fn parse(attrs: &AttrReader<'_, '_>, warnings: &mut Warnings) -> Result<Self> {
        attrs.warn_unknown(TEST_ATTRS, warnings);

        let test_name = attrs.require("test-name")?;
        if test_name.contains('/') {
            return Err(LaunchError::parse(
                attrs.file(),
                format!("<test> test-name '{test_name}' must not contain '/'"),
            ));
        }
        let pkg = attrs.require("pkg")?;
        let node_type = attrs.require("type")?;

        let cwd = match attrs.get("cwd")? {
            Some(v) => CwdPolicy::parse(
                &v,
                &[("ROS_HOME", CwdPolicy::RosHome), ("node", CwdPolicy::Node)],
                attrs.file(),
                "test",
            )?,
            None => CwdPolicy::RosHome,
        };

        let retry = match attrs.get("retry")? {
            Some(v) => v.trim().parse::<u32>().map_err(|_| {
                LaunchError::parse(attrs.file(), format!("invalid retry '{v}'"))
            })?,
            None => 0,
        };

        let time_limit = match attrs.get("time-limit")? {
            Some(v) => {
                let secs: f64 = v.trim().parse().map_err(|_| {
                    LaunchError::parse(attrs.file(), format!("invalid time-limit '{v}'"))
                })?;
                Duration::from_secs_f64(secs)
            }
            None => Duration::from_secs(60),
        };

        Ok(TestTag {
            test_name,
            pkg,
            node_type,
            cwd,
            retry,
            time_limit,
            ns: attrs.get("ns")?,
            machine: attrs.get("machine")?,
            launch_prefix: attrs.get("launch-prefix")?,
            args: attrs.get("args")?,
        })
    }
}
