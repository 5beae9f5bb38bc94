use tracing_subscriber::EnvFilter;

use crate::error::{Result, ToolError};

/// Installs the global fmt subscriber. `RUST_LOG` overrides the default
/// `info` level.
pub fn init() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init()
        .map_err(|err| ToolError::Logging(err.to_string()))
}
