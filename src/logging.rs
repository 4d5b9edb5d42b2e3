//! Tracing subscriber setup for the command line

use tracing_subscriber::EnvFilter;

use crate::config::{LogFormat, LoggingConfig};

/// Install the global subscriber.
///
/// `RUST_LOG` takes precedence over the configured level. Logs go to
/// stderr so command output stays clean.
pub fn init(config: &LoggingConfig) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.as_str()));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    match config.format {
        LogFormat::Text => builder
            .try_init()
            .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e)),
        LogFormat::Json => builder
            .json()
            .try_init()
            .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e)),
    }
}
