//! End-to-end process monitor scenarios (§4.9, §8), driving a real
//! `LocalProcess` child through `Monitor::cycle` rather than a mock:
//! a required death stops the whole run, and a respawn-eligible death
//! comes back under a renamed handle.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use roslaunch::assembler::AssembledNode;
use roslaunch::monitor::Monitor;
use roslaunch::process::local::LocalProcess;
use roslaunch::process::ProcessHandle;
use roslaunch::substitution::pkg_locator::PackageLocator;
use roslaunch::tags::node::{CwdPolicy, OutputPolicy};
use roslaunch::tags::NodeTag;

use crate::helpers::make_script_package;

fn node(name: &str, pkg: &str, node_type: &str, required: bool, respawn: bool, respawn_delay: Duration) -> AssembledNode {
    AssembledNode {
        tag: NodeTag {
            name: name.to_string(),
            pkg: pkg.to_string(),
            node_type: node_type.to_string(),
            output: OutputPolicy::Screen,
            cwd: CwdPolicy::Cwd,
            respawn,
            respawn_delay,
            required,
            ns: None,
            machine: None,
            launch_prefix: None,
            args: None,
            clear_params: false,
        },
        ns: "/".to_string(),
        resolved_name: format!("/{name}"),
        env: BTreeMap::new(),
        remap: BTreeMap::new(),
        machine: None,
        source_file: PathBuf::from("<test>"),
    }
}

fn poll_until(deadline: Duration, mut predicate: impl FnMut() -> bool) -> bool {
    let start = Instant::now();
    while start.elapsed() < deadline {
        if predicate() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(20));
    }
    predicate()
}

#[test]
fn required_process_death_shuts_the_monitor_down() {
    let tmp = tempfile::tempdir().unwrap();
    make_script_package(tmp.path(), "demo_pkg", "dies_immediately", "#!/bin/sh\nexit 1\n");
    let locator = PackageLocator::new(vec![tmp.path().to_path_buf()]);

    let assembled = node("critical", "demo_pkg", "dies_immediately", true, false, Duration::from_secs(0));
    let process = LocalProcess::spawn(&assembled, &locator, "http://localhost:0/", tmp.path().to_path_buf(), true).unwrap();
    let monitor = Monitor::new(vec![ProcessHandle::Local(process)]);

    let shut_down = poll_until(Duration::from_secs(5), || {
        monitor.cycle();
        monitor.has_shut_down()
    });

    assert!(shut_down, "monitor did not shut down after a required process died");
    assert_eq!(monitor.active_count(), 0);
}

#[test]
fn non_required_death_respawns_with_a_renamed_handle() {
    let tmp = tempfile::tempdir().unwrap();
    make_script_package(tmp.path(), "demo_pkg", "dies_immediately", "#!/bin/sh\nexit 0\n");
    let locator = PackageLocator::new(vec![tmp.path().to_path_buf()]);

    let assembled = node("q", "demo_pkg", "dies_immediately", false, true, Duration::from_millis(50));
    let process = LocalProcess::spawn(&assembled, &locator, "http://localhost:0/", tmp.path().to_path_buf(), true).unwrap();
    let monitor = Monitor::new(vec![ProcessHandle::Local(process)]);

    let renamed = poll_until(Duration::from_secs(5), || {
        monitor.cycle();
        monitor.active_names().iter().any(|n| n == "q-2")
    });

    assert!(renamed, "expected the respawned handle to be renamed to 'q-2', got {:?}", monitor.active_names());
    assert!(!monitor.has_shut_down());

    let _ = monitor.shutdown();
}

#[test]
fn a_long_lived_node_stays_active_across_a_cycle() {
    let tmp = tempfile::tempdir().unwrap();
    make_script_package(tmp.path(), "demo_pkg", "sleeper", "#!/bin/sh\nsleep 5\n");
    let locator = PackageLocator::new(vec![tmp.path().to_path_buf()]);

    let assembled = node("sleeper", "demo_pkg", "sleeper", false, false, Duration::from_secs(0));
    let process = LocalProcess::spawn(&assembled, &locator, "http://localhost:0/", tmp.path().to_path_buf(), true).unwrap();
    let monitor = Monitor::new(vec![ProcessHandle::Local(process)]);

    std::thread::sleep(Duration::from_millis(100));
    monitor.cycle();
    assert_eq!(monitor.active_count(), 1);
    assert!(!monitor.has_shut_down());

    monitor.shutdown().unwrap();
    assert_eq!(monitor.active_count(), 0);
}
