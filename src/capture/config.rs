//! Sensor settings for frame capture.
//!
//! Exposure and gain stay fixed for a whole run so the noise floor
//! the sampler reads from does not drift between frames.

use crate::config::ConfigError;
use serde::{Deserialize, Serialize};

/// Highest frame rate accepted by [`CaptureConfig::validate`].
pub const MAX_FPS: u32 = 120;

/// Pixel layout delivered by the sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorMode {
    #[default]
    Rgb,
    Gray,
}

impl ColorMode {
    /// Bytes per pixel.
    pub fn channels(self) -> usize {
        match self {
            ColorMode::Rgb => 3,
            ColorMode::Gray => 1,
        }
    }
}

/// `[capture]` section of the configuration file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Index of the capture device.
    pub device: u32,
    /// Columns per frame.
    pub width: u32,
    /// Rows per frame.
    pub height: u32,
    pub color: ColorMode,
    /// Exposure in microseconds.
    pub exposure_micros: u32,
    /// Sensor gain, in device units.
    pub gain: u32,
    pub fps: u32,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            device: 0,
            width: 640,
            height: 480,
            color: ColorMode::Rgb,
            exposure_micros: 10_000,
            gain: 1,
            fps: 30,
        }
    }
}

impl CaptureConfig {
    /// Default settings at a given frame size.
    pub fn with_dimensions(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            ..Default::default()
        }
    }

    pub fn channels(&self) -> usize {
        self.color.channels()
    }

    /// Bytes in one frame.
    pub fn frame_len(&self) -> usize {
        self.width as usize * self.height as usize * self.channels()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.frame_len() == 0 {
            return Err(ConfigError::InvalidDimensions);
        }
        if self.exposure_micros == 0 {
            return Err(ConfigError::InvalidExposure);
        }
        if !(1..=MAX_FPS).contains(&self.fps) {
            return Err(ConfigError::InvalidFrameRate);
        }
        Ok(())
    }
}
