//! Master bootstrap (§4.6, component F).
//!
//! Determines the registry URI, probes or forks the master process,
//! reconciles the run identifier, and pushes every parameter in the
//! mandated order: delete → dump (stubbed, §9 (c)) → clear (unified)
//! → rosparam-set → param-set.

use std::process::{Child, Command, Stdio};
use std::time::{Duration, Instant};

use crate::assembler::Assembled;
use crate::consts;
use crate::error::{LaunchError, Result};
use crate::registry::value::XmlRpcValue;
use crate::registry::RegistryClient;
use crate::tags::rosparam::{RosParamCommand, RosParamSource};

/// Outcome of bringing up the registry: a connected client, the
/// reconciled run identifier, and the master's own child handle if
/// this process started it (so it can be torn down on shutdown).
pub struct Bootstrap {
    pub client: RegistryClient,
    pub run_id: String,
    pub forked_master: Option<Child>,
}

/// Resolves the registry URI per §4.6 step 1: an explicit
/// `--server_uri` wins outright; otherwise `ROS_MASTER_URI` (or the
/// hardcoded default) has its port replaced by `--port` if given.
#[must_use]
pub fn resolve_uri(server_uri: Option<&str>, port: Option<u16>) -> String {
    if let Some(uri) = server_uri {
        return uri.to_string();
    }
    let base = std::env::var(consts::env_vars::ROS_MASTER_URI)
        .unwrap_or_else(|_| format!("http://localhost:{}/", consts::DEFAULT_MASTER_PORT));
    match port {
        Some(p) => replace_port(&base, p),
        None => base,
    }
}

fn replace_port(uri: &str, port: u16) -> String {
    let without_scheme = uri.trim_start_matches("http://").trim_end_matches('/');
    let host = without_scheme.split(':').next().unwrap_or("localhost");
    format!("http://{host}:{port}/")
}

/// §4.6 steps 1-3: resolve the URI, bring up a reachable registry
/// (probing, forking, or waiting per `wait`), and reconcile `run_id`.
pub fn bootstrap(
    server_uri: Option<&str>,
    port: Option<u16>,
    workers: u32,
    wait: bool,
    run_id: &str,
) -> Result<Bootstrap> {
    let uri = resolve_uri(server_uri, port);
    let client = RegistryClient::new(&uri)?;

    let forked_master = if client.is_reachable() {
        None
    } else if wait {
        wait_for_master(&client);
        None
    } else {
        Some(fork_master(port.unwrap_or(consts::DEFAULT_MASTER_PORT), workers, &client)?)
    };

    reconcile_run_id(&client, run_id)?;

    Ok(Bootstrap { client, run_id: run_id.to_string(), forked_master })
}

fn wait_for_master(client: &RegistryClient) {
    tracing::info!(uri = client.uri(), "waiting for a registry to become reachable");
    while !client.is_reachable() {
        std::thread::sleep(consts::MASTER_WAIT_INTERVAL);
    }
}

/// Forks the external master binary and polls until it answers or the
/// cumulative deadline (§4.6 step 2, `MASTER_PROBE_DEADLINE`) elapses.
fn fork_master(port: u16, workers: u32, client: &RegistryClient) -> Result<Child> {
    tracing::info!(port, workers, "starting master");
    let child = Command::new(consts::MASTER_BINARY)
        .arg("--core")
        .arg("-p")
        .arg(port.to_string())
        .arg("-w")
        .arg(workers.to_string())
        .stdin(Stdio::null())
        .spawn()
        .map_err(|e| LaunchError::Spawn { name: consts::MASTER_BINARY.to_string(), reason: e.to_string() })?;

    let deadline = Instant::now() + consts::MASTER_PROBE_DEADLINE;
    while Instant::now() < deadline {
        if client.is_reachable() {
            return Ok(child);
        }
        std::thread::sleep(consts::MASTER_PROBE_INTERVAL);
    }

    Err(LaunchError::Registry("could not contact master".to_string()))
}

/// §4.6 step 3: reconcile the run identifier.
fn reconcile_run_id(client: &RegistryClient, run_id: &str) -> Result<()> {
    if !client.has_param("/run_id")? {
        client.set_param("/run_id", &XmlRpcValue::from(run_id))?;
        return Ok(());
    }
    let existing = client.get_param("/run_id")?;
    match existing.as_str() {
        Some(existing_id) if existing_id == run_id => Ok(()),
        _ => Err(LaunchError::Registry(
            "run_id on parameter server does not match declared run_id".to_string(),
        )),
    }
}

/// §4.6 step 4: apply every parameter operation in the mandated order.
pub fn apply_param_ops(client: &RegistryClient, assembled: &Assembled) -> Result<()> {
    for op in assembled.rosparams.iter().filter(|op| op.command == RosParamCommand::Delete) {
        client.delete_param(&op.ns)?;
    }

    for op in assembled.rosparams.iter().filter(|op| op.command == RosParamCommand::Dump) {
        tracing::warn!(ns = op.ns, "rosparam dump is not implemented, skipping");
    }

    for ns in &assembled.clear_params {
        client.clear_param(ns)?;
    }

    for op in assembled.rosparams.iter().filter(|op| op.command == RosParamCommand::Load) {
        let Some(RosParamSource::Inline(text)) = &op.source else {
            continue;
        };
        let yaml: serde_yaml::Value = serde_yaml::from_str(text)
            .map_err(|e| LaunchError::Registry(format!("invalid rosparam YAML at '{}': {e}", op.ns)))?;
        let value = XmlRpcValue::try_from(&yaml)?;
        client.set_yaml_param(&op.ns, value)?;
    }

    for param in &assembled.params {
        client.set_param(&param.name, &XmlRpcValue::from(&param.value))?;
    }

    Ok(())
}

/// Generates a fresh run identifier (§9 "Run-id generation"
/// supplement): a version-4 UUID string.
#[must_use]
pub fn generate_run_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
