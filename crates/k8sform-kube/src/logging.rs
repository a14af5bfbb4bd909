//! Logging setup
//!
//! Logs go to stderr; stdout belongs to the host protocol. The filter is read from
//! `K8SFORM_LOG` (same syntax as `RUST_LOG`) and defaults to `info`.

use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter
pub const LOG_ENV: &str = "K8SFORM_LOG";

const DEFAULT_FILTER: &str = "info";

/// Build the filter from `K8SFORM_LOG`, falling back to `default` when unset or invalid
pub fn env_filter(default: &str) -> EnvFilter {
    let env = std::env::var(LOG_ENV).unwrap_or_else(|_| default.to_string());
    EnvFilter::try_new(&env).unwrap_or_else(|_| EnvFilter::new(default))
}

/// Install the global subscriber
///
/// Does nothing if a subscriber is already installed, so tests and embedding hosts can
/// call it more than once.
pub fn init_logging() {
    init_logging_with_default(DEFAULT_FILTER);
}

/// Same as [`init_logging`] with a different fallback filter
pub fn init_logging_with_default(default: &str) {
    let _ = try_init_logging(default);
}

/// Install the global subscriber, reporting whether one was already set
pub fn try_init_logging(default: &str) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter(default))
        .with_writer(std::io::stderr)
        .with_target(true)
        .try_init()
}
