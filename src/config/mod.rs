//! Configuration for scrapekit

mod client;
mod logging;

pub use client::ClientConfig;
pub use logging::{LogFormat, LogLevel, LoggingConfig};

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default user agent for HTTP requests
pub const DEFAULT_USER_AGENT: &str = concat!("scrapekit/", env!("CARGO_PKG_VERSION"));

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// HTTP client configuration
    #[serde(default)]
    pub client: ClientConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load and validate configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read config file '{}': {}", path.display(), e))?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Failed to parse config file '{}': {}", path.display(), e))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate all configuration fields.
    ///
    /// Every problem is collected and reported in one error.
    pub fn validate(&self) -> Result<()> {
        let mut errors: Vec<String> = Vec::new();

        if self.client.user_agent.trim().is_empty() {
            errors.push("user_agent must not be empty".to_string());
        }
        if self.client.timeout_secs == 0 {
            errors.push("timeout_secs must be positive".to_string());
        }
        if self.client.connect_timeout_secs == 0 {
            errors.push("connect_timeout_secs must be positive".to_string());
        }
        if self.client.connect_timeout_secs > self.client.timeout_secs {
            errors.push("connect_timeout_secs must not exceed timeout_secs".to_string());
        }
        if self.client.max_content_size == 0 {
            errors.push("max_content_size must be positive".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            anyhow::bail!(
                "Configuration validation failed:\n  - {}",
                errors.join("\n  - ")
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_passes_validation() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn validate_rejects_zero_timeout() {
        let mut cfg = Config::default();
        cfg.client.timeout_secs = 0;
        let err = cfg.validate().unwrap_err();
        assert!(
            err.to_string().contains("timeout_secs must be positive"),
            "unexpected error message: {}",
            err
        );
    }

    #[test]
    fn validate_collects_every_error() {
        let mut cfg = Config::default();
        cfg.client.user_agent = "  ".to_string();
        cfg.client.max_content_size = 0;
        cfg.client.connect_timeout_secs = 60;
        let msg = cfg.validate().unwrap_err().to_string();
        assert!(msg.contains("user_agent must not be empty"));
        assert!(msg.contains("max_content_size must be positive"));
        assert!(msg.contains("connect_timeout_secs must not exceed timeout_secs"));
    }

    #[test]
    fn load_partial_file_fills_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("scrapekit.toml");
        std::fs::write(
            &path,
            r#"
[client]
user_agent = "test-agent/1.0"
max_redirects = 3

[logging]
format = "json"
"#,
        )
        .unwrap();

        let cfg = Config::load(&path).unwrap();
        assert_eq!(cfg.client.user_agent, "test-agent/1.0");
        assert_eq!(cfg.client.max_redirects, 3);
        assert_eq!(cfg.client.timeout_secs, ClientConfig::default().timeout_secs);
        assert_eq!(cfg.logging.format, LogFormat::Json);
        assert_eq!(cfg.logging.level, LogLevel::Warn);
    }

    #[test]
    fn load_rejects_invalid_values() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("bad.toml");
        std::fs::write(&path, "[client]\ntimeout_secs = 0\n").unwrap();
        let err = Config::load(&path).unwrap_err();
        assert!(err.to_string().contains("timeout_secs must be positive"));
    }

    #[test]
    fn load_reports_missing_file() {
        let tmp = tempfile::tempdir().unwrap();
        let err = Config::load(&tmp.path().join("absent.toml")).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }

    #[test]
    fn log_level_verbosity_steps() {
        assert_eq!(LogLevel::Warn.more_verbose(0), LogLevel::Warn);
        assert_eq!(LogLevel::Warn.more_verbose(1), LogLevel::Info);
        assert_eq!(LogLevel::Warn.more_verbose(5), LogLevel::Trace);
        assert_eq!("JSON".parse::<LogFormat>(), Ok(LogFormat::Json));
        assert!("xml".parse::<LogFormat>().is_err());
    }
}
