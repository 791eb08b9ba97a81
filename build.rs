//! Records the git describe string at build time, following the same
//! `cargo:rustc-env` pattern as `orb-build-info`'s build helper.

use std::process::Command;

fn main() {
    println!("cargo:rerun-if-changed=.git/HEAD");

    let describe = Command::new("git")
        .args(["describe", "--always", "--dirty=-modified"])
        .output()
        .ok()
        .filter(|out| out.status.success())
        .and_then(|out| String::from_utf8(out.stdout).ok())
        .map(|s| s.trim_end().to_string())
        .unwrap_or_else(|| "unknown".to_string());

    println!("cargo:rustc-env=ROSLAUNCH_GIT_DESCRIBE={describe}");
}
