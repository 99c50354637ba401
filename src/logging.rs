//! Stderr logging for the command-line tools. Library code only emits `tracing` events.

use tracing_subscriber::EnvFilter;

/// Filter directives, e.g. `debug` or `blastmc=debug`.
pub const LOG_ENV_VAR: &str = "BLASTMC_LOG";

/// Installs the global subscriber once; later calls are no-ops.
pub fn init() {
    let filter = EnvFilter::try_from_env(LOG_ENV_VAR).unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
