//! Build-time metadata, collapsed from the teacher's two-crate
//! `orb-build-info`/`orb-build-info-helper` split into a single
//! `build.rs` + `const` pair, since a second workspace member wasn't
//! warranted for one string.

/// Information about this build, baked in by `build.rs`.
#[derive(Clone, Copy, Debug)]
pub struct BuildInfo {
    /// Output of `git describe --always --dirty=-modified` at build time.
    pub git_describe: &'static str,
    /// The crate version from `Cargo.toml`.
    pub version: &'static str,
}

/// The build info for this binary.
pub const BUILD_INFO: BuildInfo = BuildInfo {
    git_describe: env!("ROSLAUNCH_GIT_DESCRIBE"),
    version: env!("CARGO_PKG_VERSION"),
};
