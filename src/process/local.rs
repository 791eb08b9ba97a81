//! Local process handle (§4.7, component G).
//!
//! Modeled on `agentwire::agent::process::spawn_process_impl`: a
//! `std::process::Command` built from argv/env/cwd, piped stdio, and a
//! named background thread per stream draining it line by line so the
//! line-buffer shim's output is delivered promptly rather than sitting
//! in our own process's pipe buffer.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::thread::JoinHandle;
use std::time::Duration;

use crate::assembler::AssembledNode;
use crate::consts;
use crate::error::{LaunchError, Result};
use crate::substitution::pkg_locator::PackageLocator;
use crate::tags::node::{CwdPolicy, OutputPolicy};
use crate::tags::param::shell_split;

use super::{package_dir, remap_args, resolve_executable};

/// Everything needed to (re)spawn a node, computed once at assembly
/// time; only the handle name (and therefore the log-file argument)
/// changes across a respawn (§4.7 "On restart").
struct LaunchPlan {
    argv: Vec<String>,
    env: BTreeMap<String, String>,
    cwd: PathBuf,
}

pub struct LocalProcess {
    resolved_name: String,
    handle_name: String,
    pub required: bool,
    pub respawn: bool,
    pub respawn_delay: Duration,
    plan: LaunchPlan,
    output: OutputPolicy,
    log_dir: PathBuf,
    child: Option<Child>,
    drain_threads: Vec<JoinHandle<()>>,
    pub exit_description: Option<String>,
}

impl LocalProcess {
    /// Computes the launch plan for `node` and spawns it for the
    /// first time, with handle name `<resolved name sans leading
    /// slash>-1`.
    pub fn spawn(
        node: &AssembledNode,
        locator: &PackageLocator,
        registry_uri: &str,
        log_dir: PathBuf,
        force_screen: bool,
    ) -> Result<Self> {
        let executable = resolve_executable(locator, &node.tag.pkg, &node.tag.node_type)?;
        let pkg_dir = package_dir(locator, &node.tag.pkg)?;

        let mut argv: Vec<String> = Vec::new();
        if let Some(prefix) = &node.tag.launch_prefix {
            argv.extend(shell_split(prefix));
        }
        argv.extend(consts::LINE_BUFFER_SHIM.iter().map(ToString::to_string));
        argv.push(executable.display().to_string());
        argv.extend(remap_args(&node.remap));
        argv.push(format!("__name:={}", node.tag.name));
        if let Some(extra) = &node.tag.args {
            argv.extend(shell_split(extra));
        }

        let mut env = std::env::vars().collect::<BTreeMap<_, _>>();
        env.remove(consts::env_vars::ROS_NAMESPACE);
        for (k, v) in &node.env {
            env.insert(k.clone(), v.clone());
        }
        env.insert(consts::env_vars::ROS_MASTER_URI.to_string(), registry_uri.to_string());
        if node.ns != "/" {
            env.insert(consts::env_vars::ROS_NAMESPACE.to_string(), node.ns.trim_end_matches('/').to_string());
        }

        let cwd = match node.tag.cwd {
            CwdPolicy::RosHome => super::env_var_dir(consts::env_vars::ROS_HOME).unwrap_or_else(super::default_cwd),
            CwdPolicy::RosRoot => super::env_var_dir(consts::env_vars::ROS_ROOT).unwrap_or_else(super::default_cwd),
            CwdPolicy::Cwd => super::default_cwd(),
            CwdPolicy::Node => pkg_dir,
        };

        let output = if force_screen { OutputPolicy::Screen } else { node.tag.output };

        let mut process = LocalProcess {
            resolved_name: node.resolved_name.clone(),
            handle_name: format!("{}-1", node.resolved_name.trim_start_matches('/')),
            required: node.tag.required,
            respawn: node.tag.respawn,
            respawn_delay: node.tag.respawn_delay,
            plan: LaunchPlan { argv, env, cwd },
            output,
            log_dir,
            child: None,
            drain_threads: Vec::new(),
            exit_description: None,
        };
        process.launch()?;
        Ok(process)
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.handle_name
    }

    pub fn rename(&mut self, new_name: String) {
        self.handle_name = new_name;
    }

    fn log_argument(&self) -> String {
        format!("__log:={}", self.log_dir.join(format!("{}.log", self.handle_name)).display())
    }

    fn launch(&mut self) -> Result<()> {
        let mut argv = self.plan.argv.clone();
        if self.output == OutputPolicy::Log {
            argv.push(self.log_argument());
        }

        let (program, args) = argv.split_first().ok_or_else(|| LaunchError::Spawn {
            name: self.resolved_name.clone(),
            reason: "empty argv".to_string(),
        })?;

        let mut command = Command::new(program);
        command.args(args).current_dir(&self.plan.cwd).env_clear().envs(&self.plan.env);

        let (stdout_mode, stderr_mode) = match self.output {
            OutputPolicy::Screen => (Stdio::inherit(), Stdio::inherit()),
            OutputPolicy::Log => (Stdio::piped(), Stdio::piped()),
        };
        command.stdin(Stdio::null()).stdout(stdout_mode).stderr(stderr_mode);

        let mut child = command.spawn().map_err(|e| LaunchError::Spawn {
            name: self.resolved_name.clone(),
            reason: e.to_string(),
        })?;

        if self.output == OutputPolicy::Log {
            let stdout_path = self.log_dir.join(format!("{}{}", self.handle_name, consts::STDOUT_SUFFIX));
            let stderr_path = self.log_dir.join(format!("{}{}", self.handle_name, consts::STDERR_SUFFIX));
            if let Some(stdout) = child.stdout.take() {
                self.drain_threads.push(spawn_drain_thread(stdout, stdout_path)?);
            }
            if let Some(stderr) = child.stderr.take() {
                self.drain_threads.push(spawn_drain_thread(stderr, stderr_path)?);
            }
        }

        self.child = Some(child);
        self.exit_description = None;
        Ok(())
    }

    pub fn is_running(&mut self) -> Result<bool> {
        let Some(child) = self.child.as_mut() else { return Ok(false) };
        match child.try_wait() {
            Ok(None) => Ok(true),
            Ok(Some(status)) => {
                self.exit_description = Some(describe_exit(&status));
                Ok(false)
            }
            Err(e) => Err(LaunchError::io(format!("polling process '{}'", self.handle_name), e)),
        }
    }

    pub fn destroy(&mut self) -> Result<()> {
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
        self.join_drain_threads();
        Ok(())
    }

    pub fn wait_for(&mut self) -> Result<()> {
        if let Some(child) = self.child.as_mut() {
            let status = child.wait().map_err(|e| LaunchError::io(format!("waiting for '{}'", self.handle_name), e))?;
            self.exit_description = Some(describe_exit(&status));
        }
        self.join_drain_threads();
        Ok(())
    }

    /// §4.7 "On restart": re-derive only the `__log:=` argument; keep
    /// every other argv entry verbatim from the first launch. The
    /// caller (the monitor) has already renamed the handle, so the new
    /// log path falls out of `self.handle_name` automatically.
    pub fn restart(&mut self) -> Result<()> {
        self.launch()
    }

    fn join_drain_threads(&mut self) {
        for handle in self.drain_threads.drain(..) {
            let _ = handle.join();
        }
    }
}

fn describe_exit(status: &std::process::ExitStatus) -> String {
    match status.code() {
        Some(code) => format!("exited with code {code}"),
        None => "killed by signal".to_string(),
    }
}

fn spawn_drain_thread(
    mut reader: impl std::io::Read + Send + 'static,
    log_path: PathBuf,
) -> Result<JoinHandle<()>> {
    let mut out = File::create(&log_path)
        .map_err(|e| LaunchError::io(format!("opening log file '{}'", log_path.display()), e))?;
    Ok(std::thread::spawn(move || {
        let mut buffered = BufReader::new(&mut reader);
        let mut line = String::new();
        loop {
            line.clear();
            match buffered.read_line(&mut line) {
                Ok(0) | Err(_) => break,
                Ok(_) => {
                    if out.write_all(line.as_bytes()).is_err() {
                        break;
                    }
                }
            }
        }
    }))
}
