//! Configuration file format.
//!
//! Every section is optional in the TOML file; missing sections and
//! fields fall back to their defaults.

use crate::capture::CaptureConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Rejected configuration values.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    #[error("frame width and height must be non-zero")]
    InvalidDimensions,
    #[error("exposure must be non-zero")]
    InvalidExposure,
    #[error("fps must be between 1 and {}", crate::capture::MAX_FPS)]
    InvalidFrameRate,
    #[error("max_sets must be at least 1")]
    InvalidCapacity,
    #[error("set_bits must be a positive multiple of 24")]
    InvalidSetBits,
    #[error("sampling_ratio must be in (0, 1]")]
    InvalidSamplingRatio,
    #[error("storage prefix must be non-empty and contain no path separators")]
    InvalidPrefix,
    #[error("cannot read config file: {0}")]
    FileReadError(String),
    #[error("invalid TOML in config file: {0}")]
    ParseError(String),
}

/// Contents of a `hotbits.toml` file.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FileConfig {
    #[serde(default)]
    pub capture: CaptureConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub producer: ProducerConfig,
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

impl FileConfig {
    /// Reads and validates a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::FileReadError(e.to_string()))?;
        Self::from_toml(&content)
    }

    /// Parses and validates configuration from TOML text.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: FileConfig =
            toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates every section.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.capture.validate()?;
        self.storage.validate()?;
        self.producer.validate()?;
        Ok(())
    }
}

/// Where entropy sets live.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Queue directory, created on first use.
    pub directory: PathBuf,
    /// File name prefix for new sets.
    pub prefix: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("hotbits_storage"),
            prefix: "hotbits".to_string(),
        }
    }
}

impl StorageConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.prefix.is_empty() || self.prefix.contains(['/', '\\']) {
            return Err(ConfigError::InvalidPrefix);
        }
        Ok(())
    }
}

/// Producer loop settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProducerConfig {
    /// Queue capacity; production pauses while this many sets are resident.
    pub max_sets: usize,
    /// Delay between frame captures in milliseconds.
    pub frame_interval_ms: u64,
    /// How often a paused producer re-checks the queue size, in milliseconds.
    pub poll_interval_ms: u64,
    /// Raw bits to accumulate before a set is cut.
    pub set_bits: usize,
    /// Fraction of pixel positions sampled from each frame.
    pub sampling_ratio: f64,
}

impl Default for ProducerConfig {
    fn default() -> Self {
        Self {
            max_sets: 1000,
            frame_interval_ms: 0,
            poll_interval_ms: 10_000,
            set_bits: 24 * 100,
            sampling_ratio: 0.2,
        }
    }
}

impl ProducerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_sets == 0 {
            return Err(ConfigError::InvalidCapacity);
        }
        if self.set_bits == 0 || self.set_bits % crate::storage::WORD_BITS != 0 {
            return Err(ConfigError::InvalidSetBits);
        }
        if !(self.sampling_ratio > 0.0 && self.sampling_ratio <= 1.0) {
            return Err(ConfigError::InvalidSamplingRatio);
        }
        Ok(())
    }

    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// Consumption engine settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Upper bound on rejected draws per sampling call. `None` retries forever.
    pub max_retries: Option<u32>,
}

/// Metrics exporter settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Metrics server port (0 to disable).
    pub port: u16,
}
