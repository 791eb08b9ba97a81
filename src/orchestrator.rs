//! Top-level orchestrator (§4, §5, component J).
//!
//! Glues the compiler (C), assembler (D), registry client (E),
//! bootstrap (F), process handles (G/H), and monitor (I) together:
//! compiles every launch file given on the command line, brings up the
//! registry, pushes parameters, spawns every node (core-before-local-
//! before-remote), then drives the 100 ms monitoring loop until
//! shutdown.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::assembler::{self, AssembledNode};
use crate::bootstrap::{self, Bootstrap};
use crate::compiler::Compiler;
use crate::consts;
use crate::error::{LaunchError, Result};
use crate::monitor::Monitor;
use crate::process::local::LocalProcess;
use crate::process::remote::RemoteProcess;
use crate::process::ProcessHandle;
use crate::substitution::anon::AnonRegistry;
use crate::substitution::pkg_locator::PackageLocator;
use crate::tags::Warnings;

/// Inputs the CLI (K) resolves before handing off to the orchestrator.
pub struct LaunchRequest {
    pub files: Vec<PathBuf>,
    pub cli_args: BTreeMap<String, String>,
    pub server_uri: Option<String>,
    pub port: Option<u16>,
    pub numworkers: u32,
    pub wait: bool,
    pub run_id: String,
    pub force_screen: bool,
    pub log_dir: PathBuf,
    pub package_path: PackageLocator,
    pub launcher_binary: String,
}

/// One built-in service always brought up locally during bootstrap
/// (§4.6 step 5 "launch each core node"); the spec leaves the concrete
/// core service unspecified, so this mirrors the real system's always-
/// on log aggregator.
fn core_node(locator: &PackageLocator) -> Option<AssembledNode> {
    use crate::tags::node::{CwdPolicy, OutputPolicy};
    use crate::tags::NodeTag;

    if locator.find(consts::CORE_NODE_PKG).is_err() {
        return None;
    }
    Some(AssembledNode {
        tag: NodeTag {
            name: consts::CORE_NODE_NAME.to_string(),
            pkg: consts::CORE_NODE_PKG.to_string(),
            node_type: consts::CORE_NODE_TYPE.to_string(),
            output: OutputPolicy::Log,
            cwd: CwdPolicy::RosHome,
            respawn: true,
            respawn_delay: std::time::Duration::from_secs(1),
            required: false,
            ns: None,
            machine: Some(consts::LOCAL_MACHINE.to_string()),
            launch_prefix: None,
            args: None,
            clear_params: false,
        },
        ns: "/".to_string(),
        resolved_name: format!("/{}", consts::CORE_NODE_NAME),
        env: BTreeMap::new(),
        remap: BTreeMap::new(),
        machine: None,
        source_file: PathBuf::from("<core>"),
    })
}

pub struct Orchestrator {
    client_uri: String,
    forked_master: std::sync::Mutex<Option<std::process::Child>>,
    monitor: Arc<Monitor>,
    shutting_down: Arc<AtomicBool>,
}

impl Orchestrator {
    /// Compiles every file, assembles the flat config, brings up the
    /// registry, applies parameters, and spawns every node. Does not
    /// block; call [`Orchestrator::run`] to enter the monitor loop.
    pub fn launch(request: &LaunchRequest) -> Result<Self> {
        let anon = AnonRegistry::new();
        let mut warnings = Warnings::default();

        let mut nodes = Vec::new();
        let mut tests = Vec::new();
        let mut params = Vec::new();
        let mut rosparams = Vec::new();
        let mut clear_params = Vec::new();
        let mut machines = Vec::new();

        for file in &request.files {
            let mut compiler = Compiler::new(&request.package_path, &anon, &mut warnings);
            let tree = compiler.compile_root(file, &request.cli_args)?;
            let assembled = assembler::assemble(&tree)?;
            nodes.extend(assembled.nodes);
            tests.extend(assembled.tests);
            params.extend(assembled.params);
            rosparams.extend(assembled.rosparams);
            clear_params.extend(assembled.clear_params);
            machines.extend(assembled.machines);
        }

        for warning in &warnings.0 {
            tracing::warn!(file = %warning.file.display(), tag = warning.tag, "{}", warning.message);
        }

        let assembled = assembler::Assembled { nodes, tests, params, rosparams, machines, clear_params };

        let bootstrap = bootstrap::bootstrap(
            request.server_uri.as_deref(),
            request.port,
            request.numworkers,
            request.wait,
            &request.run_id,
        )?;
        bootstrap::apply_param_ops(&bootstrap.client, &assembled)?;

        let mut handles = Vec::new();
        if let Some(core) = core_node(&request.package_path) {
            handles.push(spawn_node(&core, &request.package_path, bootstrap.client.uri(), request)?);
        }

        let (local_nodes, remote_nodes): (Vec<_>, Vec<_>) =
            assembled.nodes.into_iter().partition(is_local);

        for node in &local_nodes {
            handles.push(spawn_node(node, &request.package_path, bootstrap.client.uri(), request)?);
        }
        for node in &remote_nodes {
            match spawn_remote(node, &bootstrap, request) {
                Ok(handle) => handles.push(handle),
                Err(e) if node.tag.required => return Err(e),
                Err(e) => tracing::error!(node = node.resolved_name, error = %e, "remote spawn failed"),
            }
        }

        println!(
            "started {} node(s), run_id [{}], registry at {}",
            handles.len(),
            request.run_id,
            bootstrap.client.uri()
        );

        let monitor = Arc::new(Monitor::new(handles));
        Ok(Orchestrator {
            client_uri: bootstrap.client.uri().to_string(),
            forked_master: std::sync::Mutex::new(bootstrap.forked_master),
            monitor,
            shutting_down: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Drives the 100 ms monitor loop until shutdown is requested or
    /// the monitor shuts itself down (required-process death).
    pub fn run(&self) {
        loop {
            self.monitor.cycle();
            if self.monitor.has_shut_down() || self.shutting_down.load(Ordering::SeqCst) {
                break;
            }
            std::thread::sleep(consts::MONITOR_CYCLE_INTERVAL);
        }
        let _ = self.monitor.shutdown();
        if let Ok(mut guard) = self.forked_master.lock() {
            if let Some(mut child) = guard.take() {
                let _ = child.kill();
                let _ = child.wait();
            }
        }
    }

    /// Registers a termination request the run loop observes on its
    /// next iteration (§5 "a shutdown signal raises the termination
    /// flag that the main loop observes").
    #[must_use]
    pub fn shutdown_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.shutting_down)
    }

    #[must_use]
    pub fn registry_uri(&self) -> &str {
        &self.client_uri
    }
}

fn is_local(node: &AssembledNode) -> bool {
    match &node.machine {
        None => true,
        Some(machine) => {
            let resolved_is_local = if_addrs::get_if_addrs()
                .map(|addrs| addrs.iter().any(|a| a.ip().to_string() == machine.address))
                .unwrap_or(false)
                || machine.address == "localhost"
                || machine.address == "127.0.0.1";
            let user_matches = machine
                .user
                .as_deref()
                .map(|u| std::env::var("USER").map(|current| current == u).unwrap_or(false))
                .unwrap_or(true);
            resolved_is_local && user_matches
        }
    }
}

fn spawn_node(
    node: &AssembledNode,
    locator: &PackageLocator,
    registry_uri: &str,
    request: &LaunchRequest,
) -> Result<ProcessHandle> {
    LocalProcess::spawn(node, locator, registry_uri, request.log_dir.clone(), request.force_screen)
        .map(ProcessHandle::Local)
}

fn spawn_remote(node: &AssembledNode, bootstrap: &Bootstrap, request: &LaunchRequest) -> Result<ProcessHandle> {
    let machine = node.machine.as_ref().ok_or_else(|| LaunchError::MissingResource(format!(
        "node '{}' has no resolved machine but was routed to the remote partition",
        node.resolved_name
    )))?;
    RemoteProcess::spawn(
        &node.resolved_name,
        machine,
        &request.launcher_binary,
        bootstrap.client.uri(),
        &bootstrap.run_id,
        node.tag.required,
        Path::new(&request.log_dir),
    )
    .map(ProcessHandle::Remote)
}
