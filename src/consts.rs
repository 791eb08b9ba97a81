//! Crate-wide constants, split out the way the teacher keeps a
//! `consts` module alongside `startup`/`interfaces` in `orb-supervisor`
//! (`supervisor/src/lib.rs` declares `pub mod consts;`).

use std::time::Duration;

/// Default registry (master) port, matching the real tool's default.
pub const DEFAULT_MASTER_PORT: u16 = 11311;

/// Default SSH port for machine tags without an explicit `ssh-port`.
pub const DEFAULT_SSH_PORT: u16 = 22;

/// Default machine connection timeout (§4.2 `machine` `timeout`).
pub const DEFAULT_MACHINE_TIMEOUT: Duration = Duration::from_secs(10);

/// Cumulative deadline for probing/starting the master (§4.6 step 2).
pub const MASTER_PROBE_DEADLINE: Duration = Duration::from_secs(10);

/// Poll interval while waiting for the master to come up.
pub const MASTER_PROBE_INTERVAL: Duration = Duration::from_millis(100);

/// Poll interval while `--wait` is blocking for someone else's master.
pub const MASTER_WAIT_INTERVAL: Duration = Duration::from_secs(1);

/// Process-monitor cycle period (§5).
pub const MONITOR_CYCLE_INTERVAL: Duration = Duration::from_millis(100);

/// Minimum free space (bytes) under `ROS_LOG_DIR` before the disk
/// check refuses to launch, unless `--skip-log-check` is given.
pub const MIN_FREE_LOG_SPACE_BYTES: u64 = 1024 * 1024 * 1024; // 1 GiB

/// Name of the built-in machine every node binds to when it has no
/// explicit `machine` attribute, and that core nodes always bind to.
pub const LOCAL_MACHINE: &str = "local";

/// External registry (master) binary forked by the bootstrap step
/// when no registry is already reachable (§4.6 step 2). Implementing
/// the registry server itself is an explicit Non-goal (§1); this tool
/// only ever forks an already-installed one.
pub const MASTER_BINARY: &str = "rosmaster";

/// Default `-w <workers>` passed to the forked master.
pub const DEFAULT_MASTER_WORKERS: u32 = 3;

/// Argv prefix forcing line-buffered stdout/stderr on children that
/// would otherwise fully buffer when not attached to a tty (§4.7).
pub const LINE_BUFFER_SHIM: &[&str] = &["stdbuf", "-oL", "-eL"];

/// The single built-in node always brought up alongside the master
/// during bootstrap (§4.6 step 5), skipped silently if the package is
/// not present on the search path.
pub const CORE_NODE_PKG: &str = "rosout";
pub const CORE_NODE_TYPE: &str = "rosout";
pub const CORE_NODE_NAME: &str = "rosout";

/// Output file suffixes (§7 persisted state).
pub const STDOUT_SUFFIX: &str = "-stdout.log";
pub const STDERR_SUFFIX: &str = "-stderr.log";

/// Environment variable names read by this tool (§6).
pub mod env_vars {
    pub const ROS_MASTER_URI: &str = "ROS_MASTER_URI";
    pub const ROS_PACKAGE_PATH: &str = "ROS_PACKAGE_PATH";
    pub const LD_LIBRARY_PATH: &str = "LD_LIBRARY_PATH";
    pub const ROS_HOME: &str = "ROS_HOME";
    pub const ROS_ROOT: &str = "ROS_ROOT";
    pub const ROS_LOG_DIR: &str = "ROS_LOG_DIR";
    pub const ROS_NAMESPACE: &str = "ROS_NAMESPACE";
    pub const ROS_HOSTNAME: &str = "ROS_HOSTNAME";
    pub const ROS_IP: &str = "ROS_IP";
    pub const ROS_IPV6: &str = "ROS_IPV6";
    pub const ROSLAUNCH_SSH_UNKNOWN: &str = "ROSLAUNCH_SSH_UNKNOWN";
}
