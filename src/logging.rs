//! Standardized logging for roslaunch, trimmed from the teacher's
//! `orb-telemetry` crate (`telemetry/src/lib.rs`) down to the one
//! backend this CLI actually needs: a `tracing_subscriber::fmt` layer
//! on stderr, filtered by `EnvFilter`. The otel/journald backends
//! `orb-telemetry` supports assume infrastructure (a collector, a
//! systemd journal) this standalone launcher does not assume is
//! present.

use tracing_subscriber::{layer::SubscriberExt as _, util::SubscriberInitExt as _, EnvFilter};

/// Builder for the process-wide tracing subscriber. Start here.
#[derive(Debug, Default)]
pub struct Telemetry {
    verbose: bool,
}

impl Telemetry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Mirrors `-v`: lowers the default filter to `debug` for our own
    /// crate while leaving dependencies at `info`.
    #[must_use]
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    fn default_directive(&self) -> &'static str {
        if self.verbose {
            "roslaunch=debug,warn"
        } else {
            "roslaunch=info,warn"
        }
    }

    /// Installs the global subscriber. Call once, as early as possible.
    pub fn init(self) {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(self.default_directive()));

        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_target(false)
            .with_writer(std::io::stderr);

        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .init();
    }
}
