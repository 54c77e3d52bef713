//! Tracing initialisation

use tracing_subscriber::EnvFilter;

use crate::{config::Config, error::Result};

/// Install a JSON `tracing` subscriber filtered by the configured log level
///
/// `RUST_LOG`-style directives are accepted (`info,suite_query=debug`); an
/// invalid directive falls back to `info`. Installing twice is harmless: the
/// second call leaves the first subscriber in place.
pub fn init_tracing(config: &Config) -> Result<()> {
    let filter = build_filter(&config.service.log_level);

    let installed = tracing_subscriber::fmt()
        .json()
        .with_env_filter(filter)
        .try_init()
        .is_ok();

    if installed {
        tracing::info!(
            environment = %config.service.environment,
            "Tracing initialized for service: {}",
            config.service.name
        );
    }

    Ok(())
}

/// Flush and stop tracing
pub fn shutdown_tracing() {
    tracing::info!("Tracing shutdown complete");
}

fn build_filter(log_level: &str) -> EnvFilter {
    EnvFilter::try_new(log_level).unwrap_or_else(|_| EnvFilter::new("info"))
}
