//! Tracing subscriber setup for the binary.

use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::errors::{Result, VaultError};

/// Build the filter: `RUST_LOG` when set and valid, else `default_directive`.
pub fn env_filter(default_directive: &str) -> Result<EnvFilter> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(default_directive)
            .map_err(|e| VaultError::ConfigError(format!("invalid log_filter '{default_directive}': {e}"))),
    }
}

/// Install the global fmt subscriber.  Logs go to stderr so command output
/// on stdout stays clean.
pub fn init(default_directive: &str) -> Result<()> {
    let filter = env_filter(default_directive)?;

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .try_init()
        .map_err(|e| VaultError::ConfigError(format!("logging already initialized: {e}")))
}
