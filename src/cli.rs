//! Command-line surface (§6, component K).
//!
//! Derives the raw flags with `clap`, the teacher's argument-parsing
//! crate (`mcu-util/src/main.rs`), then layers them into a resolved
//! [`Config`] and validates the cross-constraints §6 lists, since
//! `clap`'s own `conflicts_with`/`requires` graph can't express rules
//! that span more than two flags at once ("a request mode is
//! compatible with zero launch files only via the forms listed").

use std::collections::BTreeMap;
use std::path::PathBuf;

use clap::Parser;

use crate::consts;
use crate::error::{LaunchError, Result};

#[derive(Parser, Debug)]
#[clap(
    name = "roslaunch",
    author,
    version,
    about = "Distributed process launcher for a pub/sub robotics middleware"
)]
pub struct Args {
    /// Launch files and `name:=value` argument bindings, in any order.
    pub positional: Vec<String>,

    /// List every launch file that would be loaded, then exit.
    #[clap(long)]
    pub files: bool,

    /// Print the value a declared `arg` would resolve to, then exit.
    #[clap(long, value_name = "NAME")]
    pub args: Option<String>,

    /// List every node that would be launched, then exit.
    #[clap(long)]
    pub nodes: bool,

    /// Print the launch file defining a node, then exit.
    #[clap(long, value_name = "NAME")]
    pub find_node: Option<String>,

    /// Run only the nodes assigned to the named machine (child mode).
    #[clap(long, short = 'c', value_name = "NAME")]
    pub child: Option<String>,

    /// Restrict to nodes bound to the local machine.
    #[clap(long)]
    pub local: bool,

    /// Force every node's output to the terminal, overriding `output=log`.
    #[clap(long)]
    pub screen: bool,

    /// Registry URI, overriding `ROS_MASTER_URI`.
    #[clap(long = "server_uri", short = 'u', value_name = "URI")]
    pub server_uri: Option<String>,

    /// Run identifier to reconcile against the registry.
    #[clap(long = "run_id", value_name = "RUN_ID")]
    pub run_id: Option<String>,

    /// Block until a registry becomes reachable instead of forking one.
    #[clap(long)]
    pub wait: bool,

    /// Registry port, overriding the URI's own port.
    #[clap(long, short = 'p', value_name = "PORT")]
    pub port: Option<u16>,

    /// Start only the registry and core nodes; no launch files.
    #[clap(long)]
    pub core: bool,

    /// Write this process's PID to the given path.
    #[clap(long, value_name = "PATH")]
    pub pid: Option<PathBuf>,

    /// Lower the log level to debug for this crate.
    #[clap(short = 'v')]
    pub verbose: bool,

    /// Print every parameter that would be pushed to the registry, then exit.
    #[clap(long)]
    pub dump_params: bool,

    /// Skip the free-disk-space check before creating the log directory.
    #[clap(long)]
    pub skip_log_check: bool,

    /// Print the resolved argv for every node, then exit.
    #[clap(long)]
    pub ros_args: bool,

    /// Don't set the terminal title.
    #[clap(long)]
    pub disable_title: bool,

    /// Worker thread count passed to a newly forked master.
    #[clap(long, short = 'w', value_name = "N")]
    pub numworkers: Option<u32>,

    /// Registry probe/connect timeout in seconds.
    #[clap(long, short = 't', value_name = "SEC")]
    pub timeout: Option<u64>,
}

/// Resolved, validated launch request plus the request-mode flags
/// that make the process print something and exit instead of
/// spawning anything (§6 "a request mode ... is compatible with zero
/// launch files").
pub struct Config {
    pub files: Vec<PathBuf>,
    pub cli_args: BTreeMap<String, String>,
    pub server_uri: Option<String>,
    pub port: Option<u16>,
    pub numworkers: u32,
    pub wait: bool,
    pub run_id: Option<String>,
    pub force_screen: bool,
    pub skip_log_check: bool,
    pub disable_title: bool,
    pub pid_file: Option<PathBuf>,
    pub verbose: bool,
    pub request_mode: Option<RequestMode>,
    pub child: Option<String>,
    pub core: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestMode {
    Files,
    Nodes,
    FindNode(String),
    Args(String),
    RosArgs,
    DumpParams,
}

impl Args {
    /// Validates §6's cross-constraints and splits positionals into
    /// launch-file paths vs. `name:=value` bindings.
    pub fn into_config(self) -> Result<Config> {
        let request_modes: Vec<RequestMode> = [
            self.files.then_some(RequestMode::Files),
            self.nodes.then_some(RequestMode::Nodes),
            self.find_node.clone().map(RequestMode::FindNode),
            self.args.clone().map(RequestMode::Args),
            self.ros_args.then_some(RequestMode::RosArgs),
            self.dump_params.then_some(RequestMode::DumpParams),
        ]
        .into_iter()
        .flatten()
        .collect();

        if request_modes.len() > 1 {
            return Err(LaunchError::CommandLine(
                "--files, --nodes, --find-node, --args, --ros-args, --dump-params are pairwise exclusive"
                    .to_string(),
            ));
        }

        if self.wait && self.core {
            return Err(LaunchError::CommandLine("--wait and --core are mutually exclusive".to_string()));
        }

        let mut files = Vec::new();
        let mut cli_args = BTreeMap::new();
        for token in &self.positional {
            if let Some((name, value)) = token.split_once(":=") {
                cli_args.insert(name.to_string(), value.to_string());
            } else {
                files.push(PathBuf::from(token));
            }
        }

        if let Some(child) = &self.child {
            if self.server_uri.is_none() || self.run_id.is_none() {
                return Err(LaunchError::CommandLine(
                    "--child requires --server_uri and --run_id".to_string(),
                ));
            }
            if self.port.is_some() || !files.is_empty() {
                return Err(LaunchError::CommandLine(
                    "--child forbids --port and launch-file positions".to_string(),
                ));
            }
            let _ = child;
        }

        if self.core {
            if !files.is_empty() {
                return Err(LaunchError::CommandLine("--core forbids launch files".to_string()));
            }
            if self.run_id.is_some() {
                return Err(LaunchError::CommandLine("--core forbids --run_id".to_string()));
            }
        }

        if files.is_empty() && request_modes.is_empty() && self.child.is_none() && !self.core {
            return Err(LaunchError::CommandLine(
                "expected at least one launch file, --child, --core, or a request-mode flag".to_string(),
            ));
        }

        Ok(Config {
            files,
            cli_args,
            server_uri: self.server_uri,
            port: self.port,
            numworkers: self.numworkers.unwrap_or(consts::DEFAULT_MASTER_WORKERS),
            wait: self.wait,
            run_id: self.run_id,
            force_screen: self.screen,
            skip_log_check: self.skip_log_check,
            disable_title: self.disable_title,
            pid_file: self.pid,
            verbose: self.verbose,
            request_mode: request_modes.into_iter().next(),
            child: self.child,
            core: self.core,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Config> {
        let mut full = vec!["roslaunch"];
        full.extend_from_slice(args);
        Args::try_parse_from(full).unwrap().into_config()
    }

    #[test]
    fn splits_files_from_arg_bindings() {
        let config = parse(&["a.launch", "foo:=bar"]).unwrap();
        assert_eq!(config.files, vec![PathBuf::from("a.launch")]);
        assert_eq!(config.cli_args.get("foo").map(String::as_str), Some("bar"));
    }

    #[test]
    fn rejects_conflicting_request_modes() {
        assert!(parse(&["--files", "--nodes", "a.launch"]).is_err());
    }

    #[test]
    fn rejects_wait_and_core_together() {
        assert!(parse(&["--wait", "--core"]).is_err());
    }

    #[test]
    fn child_requires_server_uri_and_run_id() {
        assert!(parse(&["--child", "foo"]).is_err());
        assert!(parse(&["--child", "foo", "--server_uri", "http://h:1/", "--run_id", "r"]).is_ok());
    }

    #[test]
    fn core_forbids_launch_files() {
        assert!(parse(&["--core", "a.launch"]).is_err());
    }
}
