//! Configuration types for the producer session.

use crate::errors::SessionError;
use framepipe_pool::PoolConfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Complete producer session configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Buffer pool settings.
    #[serde(default)]
    pub pool: PoolConfig,
    /// Acquire behavior.
    #[serde(default)]
    pub acquire: AcquireConfig,
}

/// Acquire behavior configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AcquireConfig {
    /// Upper bound on blocking in acquire, in milliseconds.
    ///
    /// When unset, acquire blocks until a buffer of the requested size is
    /// recycled. Tests and housekeeping callers set a bound to turn a
    /// would-be deadlock into a reported allocation failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
}

impl Config {
    /// Creates a new configuration builder.
    #[must_use]
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Parses and validates a configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns an error if the text does not parse or the resulting
    /// configuration is invalid.
    pub fn from_toml_str(text: &str) -> Result<Self, SessionError> {
        let config: Self = toml::from_str(text)
            .map_err(|e| SessionError::Initialization(format!("configuration parse: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<(), SessionError> {
        self.pool.validate()?;
        if self.acquire.timeout_ms == Some(0) {
            return Err(SessionError::Initialization(
                "acquire timeout cannot be 0 ms; omit it to block indefinitely".to_string(),
            ));
        }
        Ok(())
    }

    /// Returns the acquire timeout, if one is configured.
    #[must_use]
    pub fn acquire_timeout(&self) -> Option<Duration> {
        self.acquire.timeout_ms.map(Duration::from_millis)
    }
}

/// Builder for creating a `Config`.
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Sets the maximum buffers per size class.
    #[must_use]
    pub fn pool_capacity(mut self, max_buffers_per_class: usize) -> Self {
        self.config.pool.max_buffers_per_class = max_buffers_per_class;
        self
    }

    /// Sets the row alignment in bytes.
    #[must_use]
    pub fn pitch_alignment(mut self, alignment: usize) -> Self {
        self.config.pool.pitch_alignment = alignment;
        self
    }

    /// Bounds blocking in acquire.
    #[must_use]
    pub fn acquire_timeout(mut self, timeout: Duration) -> Self {
        self.config.acquire.timeout_ms = Some(timeout.as_millis() as u64);
        self
    }

    /// Builds the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn build(self) -> Result<Config, SessionError> {
        self.config.validate()?;
        Ok(self.config)
    }
}
