//! Tracing setup

use tracing_subscriber::EnvFilter;

use crate::{config::Config, error::Result};

/// Initialize the global tracing subscriber
///
/// JSON lines in production, human-readable output elsewhere. `RUST_LOG`
/// is not consulted; the level comes from `service.log_level`.
pub fn init_tracing(config: &Config) -> Result<()> {
    let filter = EnvFilter::try_new(&config.service.log_level)
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let installed = if config.service.is_production() {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .try_init()
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .try_init()
    };

    installed.map_err(|e| crate::error::Error::Internal(format!("tracing already initialized: {e}")))?;

    tracing::info!(
        service = %config.service.name,
        environment = %config.service.environment,
        "Tracing initialized"
    );

    Ok(())
}
