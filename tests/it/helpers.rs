use std::path::{Path, PathBuf};

/// The checked-in `.launch` fixtures and their `package.xml` stand-ins
/// for `$(find ...)` resolution, shared by every module in this binary.
pub fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/it/fixtures")
}

/// Writes a one-package tree with a tiny shell script as its only
/// executable, the shape `resolve_executable` expects: `<pkg>/bin/<type>`.
/// Used by the monitor tests to spawn a real, short-lived child without
/// depending on any real ROS package being installed on the test host.
pub fn make_script_package(root: &Path, pkg: &str, node_type: &str, script: &str) {
    let pkg_dir = root.join(pkg);
    let bin_dir = pkg_dir.join("bin");
    std::fs::create_dir_all(&bin_dir).unwrap();
    std::fs::write(pkg_dir.join("package.xml"), "<package/>").unwrap();

    let script_path = bin_dir.join(node_type);
    std::fs::write(&script_path, script).unwrap();

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mut perms = std::fs::metadata(&script_path).unwrap().permissions();
        perms.set_mode(0o755);
        std::fs::set_permissions(&script_path, perms).unwrap();
    }
}
