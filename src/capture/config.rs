//! Scan configuration.
//!
//! The tick interval bounds CPU use: multiple display refreshes inside one
//! interval collapse into a single decode attempt.

use super::FacingMode;
use crate::codec::CodecOptions;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Longest accepted tick interval.
const MAX_TICK_INTERVAL_MS: u64 = 10_000;

/// Configuration for a scan session.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Minimum time between decode attempts in milliseconds.
    pub tick_interval_ms: u64,
    /// Camera facing used when the caller has no preference.
    pub preferred_facing: FacingMode,
    /// Decoded payloads buffered before the scan loop waits on the consumer.
    pub channel_capacity: usize,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 300,
            preferred_facing: FacingMode::Environment,
            channel_capacity: 16,
        }
    }
}

impl ScanConfig {
    /// Creates a configuration with the given tick interval.
    pub fn with_interval(tick_interval_ms: u64) -> Self {
        Self {
            tick_interval_ms,
            ..Default::default()
        }
    }

    /// Tick interval as a duration.
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    /// Validates the configuration parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tick_interval_ms == 0 || self.tick_interval_ms > MAX_TICK_INTERVAL_MS {
            return Err(ConfigError::InvalidInterval);
        }
        if self.channel_capacity == 0 {
            return Err(ConfigError::InvalidCapacity);
        }
        Ok(())
    }
}

/// Configuration validation errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    /// Tick interval outside 1..=10000 ms.
    #[error("invalid tick interval (must be 1-10000 ms)")]
    InvalidInterval,
    /// Payload channel capacity of zero.
    #[error("invalid channel capacity (must be at least 1)")]
    InvalidCapacity,
    /// The config file could not be read.
    #[error("failed to read config file: {0}")]
    FileReadError(String),
    /// The config file is not valid TOML for this format.
    #[error("failed to parse config file: {0}")]
    ParseError(String),
}

/// Full configuration file format.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FileConfig {
    /// Scan loop settings.
    #[serde(default)]
    pub scan: ScanConfig,
    /// Decoder settings.
    #[serde(default)]
    pub codec: CodecOptions,
    /// CLI output settings.
    #[serde(default)]
    pub output: OutputConfig,
}

/// Output configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Stop after the first decoded payload.
    pub exit_after_first: bool,
    /// Metrics server port (0 to disable).
    pub metrics_port: u16,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            exit_after_first: false,
            metrics_port: 9090,
        }
    }
}

impl FileConfig {
    /// Loads configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::FileReadError(e.to_string()))?;
        Self::from_toml(&content)
    }

    /// Parses configuration from TOML text.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: FileConfig =
            toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.scan.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::InversionAttempts;

    #[test]
    fn test_default_config_valid() {
        let config = ScanConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.tick_interval(), Duration::from_millis(300));
    }

    #[test]
    fn test_zero_interval_invalid() {
        let config = ScanConfig::with_interval(0);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidInterval)
        ));
    }

    #[test]
    fn test_zero_capacity_invalid() {
        let config = ScanConfig {
            channel_capacity: 0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidCapacity)
        ));
    }

    #[test]
    fn test_parse_partial_file() {
        let config = FileConfig::from_toml(
            r#"
            [scan]
            tick_interval_ms = 500
            preferred_facing = "user"

            [codec]
            inversion = "dont-invert"

            [output]
            exit_after_first = true
            "#,
        )
        .unwrap();

        assert_eq!(config.scan.tick_interval_ms, 500);
        assert_eq!(config.scan.preferred_facing, FacingMode::User);
        assert_eq!(config.scan.channel_capacity, 16);
        assert_eq!(config.codec.inversion, InversionAttempts::DontInvert);
        assert!(config.output.exit_after_first);
        assert_eq!(config.output.metrics_port, 9090);
    }

    #[test]
    fn test_invalid_file_rejected() {
        assert!(matches!(
            FileConfig::from_toml("[scan]\ntick_interval_ms = 0\n"),
            Err(ConfigError::InvalidInterval)
        ));
        assert!(matches!(
            FileConfig::from_toml("[scan\n"),
            Err(ConfigError::ParseError(_))
        ));
    }
}
