//! Logging initialization for the CLI.

use tracing_subscriber::EnvFilter;

/// Initialize tracing output to stderr.
///
/// The level comes from `RUST_LOG` when set, otherwise from the provided
/// default (config file or `--log-level`).
pub fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
