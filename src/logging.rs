//! Logging setup.

use tracing_subscriber::EnvFilter;

/// Builds the `tracing` filter layer, seeded from `log_level` but always
/// overridable by `RUST_LOG` so an operator can turn up verbosity without
/// touching the config file.
pub fn build_loglevel_filter_layer(log_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level))
}

/// Installs the global `tracing` subscriber. Line-oriented output on
/// stderr — no structured telemetry, no remote collector (§6, §10.3).
pub fn init_logging(log_level: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(build_loglevel_filter_layer(log_level))
        .with_target(false)
        .init();
}
