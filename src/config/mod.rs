//! Runtime configuration for the monthly pipeline.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Errors that can occur while assembling configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An environment variable has an invalid value.
    #[error("invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    /// Configuration validation failed.
    #[error("configuration validation failed: {0}")]
    ValidationFailed(String),
}

/// Configuration for the monthly pipeline.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Root URL of the SCADA data endpoint.
    pub source_root_url: String,
    /// Directory visualisation artifacts are written under.
    pub output_dir: PathBuf,
    /// Timeout for individual requests against the data endpoint.
    pub request_timeout: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            source_root_url: "http://localhost:8000".to_string(),
            output_dir: PathBuf::from("./data/output-viz"),
            request_timeout: Duration::from_secs(60),
        }
    }
}

impl PipelineConfig {
    /// Creates a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `WINDMAP_SOURCE_URL`: root URL of the data endpoint
    /// - `WINDMAP_OUTPUT_DIR`: artifact output directory
    /// - `WINDMAP_REQUEST_TIMEOUT_SECS`: per-request timeout in seconds
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable has an invalid value or the
    /// resulting configuration fails validation.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("WINDMAP_SOURCE_URL") {
            config.source_root_url = val;
        }

        if let Ok(val) = std::env::var("WINDMAP_OUTPUT_DIR") {
            config.output_dir = PathBuf::from(val);
        }

        if let Ok(val) = std::env::var("WINDMAP_REQUEST_TIMEOUT_SECS") {
            let secs: u64 = val.parse().map_err(|_| ConfigError::InvalidValue {
                key: "WINDMAP_REQUEST_TIMEOUT_SECS".to_string(),
                message: format!("expected an integer number of seconds, got '{val}'"),
            })?;
            config.request_timeout = Duration::from_secs(secs);
        }

        config.validate()?;
        Ok(config)
    }

    /// Sets the data endpoint root URL.
    pub fn with_source_root_url(mut self, url: impl Into<String>) -> Self {
        self.source_root_url = url.into();
        self
    }

    /// Sets the artifact output directory.
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    /// Sets the per-request timeout.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Validates the configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.source_root_url.trim().is_empty() {
            return Err(ConfigError::ValidationFailed(
                "source_root_url must not be empty".to_string(),
            ));
        }

        if self.request_timeout.as_secs() == 0 {
            return Err(ConfigError::ValidationFailed(
                "request_timeout must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}
