//! Remote process handle (§4.8, component H).
//!
//! Opens one `ssh2::Session` per handle, verifies the host key against
//! a known-hosts database unless the user has opted out, and runs the
//! launcher's own binary on the far end in child mode so it can spawn
//! the node locally there. Mirrors the teacher's `orb-software` pattern
//! of a dedicated drain thread per child stream (`process/local.rs`)
//! but over an SSH channel instead of a pipe.

use std::io::Read;
use std::net::TcpStream;
use std::path::PathBuf;
use std::sync::mpsc::{Receiver, Sender};
use std::thread::JoinHandle;
use std::time::Duration;

use ssh2::{KnownHostFileKind, Session};

use crate::consts;
use crate::error::{LaunchError, Result};
use crate::tags::machine::MachineTag;

pub struct RemoteProcess {
    name: String,
    machine: String,
    pub required: bool,
    pub respawn: bool,
    pub respawn_delay: Duration,
    session: Session,
    drain_thread: Option<JoinHandle<()>>,
    exit_rx: Receiver<i32>,
    status: Option<i32>,
    pub exit_description: Option<String>,
}

impl RemoteProcess {
    /// Opens the SSH session, verifies the host key, and execs
    /// `<launcher-binary> -c <machine-tag> -u <master-uri> --run_id
    /// <run_id>` with `ROS_MASTER_URI` prefixed onto the command
    /// (§4.8 steps 1-4).
    pub fn spawn(
        resolved_name: &str,
        machine: &MachineTag,
        launcher_binary: &str,
        registry_uri: &str,
        run_id: &str,
        required: bool,
        log_dir: &std::path::Path,
    ) -> Result<Self> {
        let mut session = connect(machine)?;
        verify_host_key(&session, machine)?;
        authenticate(&session, machine)?;

        let mut channel = session
            .channel_session()
            .map_err(|e| remote_err(&machine.name, format!("opening exec channel: {e}")))?;

        let command = format!(
            "env ROS_MASTER_URI={registry_uri} {launcher_binary} -c {} -u {registry_uri} --run_id {run_id}",
            machine.name
        );
        channel
            .exec(&command)
            .map_err(|e| remote_err(&machine.name, format!("exec failed: {e}")))?;

        let log_path = log_dir.join(format!("{}{}", resolved_name.trim_start_matches('/'), consts::STDOUT_SUFFIX));
        let (drain_thread, exit_rx) = spawn_drain_thread(channel, log_path)?;

        Ok(RemoteProcess {
            name: resolved_name.to_string(),
            machine: machine.name.clone(),
            required,
            respawn: false,
            respawn_delay: Duration::from_secs(0),
            session,
            drain_thread: Some(drain_thread),
            exit_rx,
            status: None,
            exit_description: None,
        })
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn rename(&mut self, new_name: String) {
        self.name = new_name;
    }

    pub fn is_running(&mut self) -> Result<bool> {
        if self.status.is_some() {
            return Ok(false);
        }
        match self.exit_rx.try_recv() {
            Ok(code) => {
                self.status = Some(code);
                self.exit_description = Some(format!("remote process on '{}' exited with code {code}", self.machine));
                Ok(false)
            }
            Err(std::sync::mpsc::TryRecvError::Empty) => Ok(true),
            Err(std::sync::mpsc::TryRecvError::Disconnected) => {
                self.status = Some(-1);
                self.exit_description = Some(format!("lost connection to '{}'", self.machine));
                Ok(false)
            }
        }
    }

    pub fn destroy(&mut self) -> Result<()> {
        // ssh2 has no clean remote-kill primitive for an already-exec'd
        // channel; dropping the session closes the underlying socket,
        // which the remote sshd treats as a hangup for the child.
        self.join_drain_thread();
        Ok(())
    }

    pub fn wait_for(&mut self) -> Result<()> {
        if self.status.is_none() {
            if let Ok(code) = self.exit_rx.recv() {
                self.status = Some(code);
                self.exit_description = Some(format!("remote process on '{}' exited with code {code}", self.machine));
            }
        }
        self.join_drain_thread();
        Ok(())
    }

    /// §4.8: remote processes never support restart.
    pub fn restart(&mut self) -> Result<()> {
        Err(LaunchError::Remote {
            machine: self.machine.clone(),
            reason: "remote processes do not support restart".to_string(),
        })
    }

    fn join_drain_thread(&mut self) {
        if let Some(handle) = self.drain_thread.take() {
            let _ = handle.join();
        }
    }
}

fn connect(machine: &MachineTag) -> Result<Session> {
    let address = format!("{}:{}", machine.address, machine.ssh_port);
    let tcp = TcpStream::connect(&address)
        .map_err(|e| remote_err(&machine.name, format!("connecting to {address}: {e}")))?;
    tcp.set_read_timeout(Some(machine.timeout))
        .map_err(|e| remote_err(&machine.name, format!("setting socket timeout: {e}")))?;

    let mut session = Session::new().map_err(|e| remote_err(&machine.name, format!("creating ssh session: {e}")))?;
    session.set_tcp_stream(tcp);
    session.handshake().map_err(|e| remote_err(&machine.name, format!("ssh handshake failed: {e}")))?;
    Ok(session)
}

/// §4.8 step 2: check the system known-hosts file, then the user's;
/// an unrecognized host only passes with explicit opt-in.
fn verify_host_key(session: &Session, machine: &MachineTag) -> Result<()> {
    let (key, _key_type) = session
        .host_key()
        .ok_or_else(|| remote_err(&machine.name, "server did not present a host key"))?;

    let mut known_hosts = session
        .known_hosts()
        .map_err(|e| remote_err(&machine.name, format!("building known-hosts checker: {e}")))?;

    for path in [PathBuf::from("/etc/ssh/ssh_known_hosts"), user_known_hosts_path()] {
        if path.is_file()
            && known_hosts.read_file(&path, KnownHostFileKind::OpenSSH).is_ok()
            && known_hosts.check_port(&machine.address, machine.ssh_port, key).is_match()
        {
            return Ok(());
        }
    }

    if std::env::var(consts::env_vars::ROSLAUNCH_SSH_UNKNOWN).as_deref() == Ok("1") {
        return Ok(());
    }

    Err(remote_err(
        &machine.name,
        format!(
            "host '{}' is not in a known-hosts file; connect to it manually once, or set {}=1",
            machine.address,
            consts::env_vars::ROSLAUNCH_SSH_UNKNOWN
        ),
    ))
}

fn user_known_hosts_path() -> PathBuf {
    std::env::var("HOME").map(|home| PathBuf::from(home).join(".ssh/known_hosts")).unwrap_or_default()
}

fn authenticate(session: &Session, machine: &MachineTag) -> Result<()> {
    let user = machine.user.clone().unwrap_or_else(|| {
        std::env::var("USER").unwrap_or_else(|_| "root".to_string())
    });

    if let Some(password) = &machine.password {
        session
            .userauth_password(&user, password)
            .map_err(|e| remote_err(&machine.name, format!("password authentication failed: {e}")))?;
    } else {
        session
            .userauth_agent(&user)
            .map_err(|e| remote_err(&machine.name, format!("agent authentication failed: {e}")))?;
    }

    if !session.authenticated() {
        return Err(remote_err(&machine.name, "authentication did not succeed"));
    }
    Ok(())
}

fn remote_err(machine: &str, reason: impl Into<String>) -> LaunchError {
    LaunchError::Remote { machine: machine.to_string(), reason: reason.into() }
}

/// Drains the channel's stdout into a log file until the remote side
/// closes it, then reports the exit status over `exit_rx` (§4.8 step 4:
/// "captures the exit status once the channel is closed and the
/// stream is drained").
fn spawn_drain_thread(
    mut channel: ssh2::Channel,
    log_path: PathBuf,
) -> Result<(JoinHandle<()>, Receiver<i32>)> {
    let mut out = std::fs::File::create(&log_path)
        .map_err(|e| LaunchError::io(format!("opening log file '{}'", log_path.display()), e))?;
    let (tx, rx): (Sender<i32>, Receiver<i32>) = std::sync::mpsc::channel();

    let handle = std::thread::spawn(move || {
        use std::io::Write;
        let mut buf = [0u8; 4096];
        loop {
            match channel.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => {
                    let _ = out.write_all(&buf[..n]);
                }
                Err(_) => break,
            }
        }
        let _ = channel.wait_close();
        let code = channel.exit_status().unwrap_or(-1);
        let _ = tx.send(code);
    });

    Ok((handle, rx))
}
