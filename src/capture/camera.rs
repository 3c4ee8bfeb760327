//! Frame sources.

use super::{CaptureConfig, Frame};
use crate::config::ConfigError;
use rand_chacha::ChaCha20Rng;
use rand_core::{RngCore, SeedableRng};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CameraError {
    #[error("camera rejected its settings: {0}")]
    Misconfigured(#[from] ConfigError),
    #[error("camera is not open")]
    NotOpen,
}

/// A device that delivers frames of sensor data.
pub trait Camera {
    /// Applies `config` and starts the device. Reopening resets the frame counter.
    fn open(&mut self, config: &CaptureConfig) -> Result<(), CameraError>;

    /// Next frame. Sequence numbers start at 1 after every `open`.
    fn capture(&mut self) -> Result<Frame, CameraError>;

    fn is_open(&self) -> bool;

    fn close(&mut self);
}

/// Synthetic camera: a fixed scene with per-frame noise on top.
///
/// The scene is drawn once when the camera opens. Every capture adds
/// fresh noise in `-2..=2` to each byte, so low-order bits change between
/// frames while the high-order bits track the scene. The noise is a
/// seeded ChaCha stream: useful for exercising the pipeline, worthless
/// as a physical entropy source.
#[derive(Debug)]
pub struct MockCamera {
    noise: ChaCha20Rng,
    open: Option<OpenState>,
}

#[derive(Debug)]
struct OpenState {
    config: CaptureConfig,
    scene: Vec<u8>,
    sequence: u64,
}

impl MockCamera {
    pub fn new() -> Self {
        Self::from_rng(ChaCha20Rng::from_entropy())
    }

    /// Reproducible frames for a given seed.
    pub fn with_seed(seed: u64) -> Self {
        Self::from_rng(ChaCha20Rng::seed_from_u64(seed))
    }

    fn from_rng(noise: ChaCha20Rng) -> Self {
        Self { noise, open: None }
    }
}

impl Default for MockCamera {
    fn default() -> Self {
        Self::new()
    }
}

impl Camera for MockCamera {
    fn open(&mut self, config: &CaptureConfig) -> Result<(), CameraError> {
        config.validate()?;

        let mut scene = vec![0u8; config.frame_len()];
        self.noise.fill_bytes(&mut scene);
        self.open = Some(OpenState {
            config: config.clone(),
            scene,
            sequence: 0,
        });

        tracing::info!(
            device = config.device,
            width = config.width,
            height = config.height,
            color = ?config.color,
            "Opened mock camera"
        );
        Ok(())
    }

    fn capture(&mut self) -> Result<Frame, CameraError> {
        let state = self.open.as_mut().ok_or(CameraError::NotOpen)?;

        let mut jitter = vec![0u8; state.scene.len()];
        self.noise.fill_bytes(&mut jitter);
        let pixels = state
            .scene
            .iter()
            .zip(&jitter)
            .map(|(&base, &j)| base.wrapping_add((j % 5).wrapping_sub(2)))
            .collect();

        state.sequence += 1;
        Ok(Frame::new(
            pixels,
            state.config.height as usize,
            state.config.width as usize,
            state.config.channels(),
            state.sequence,
        ))
    }

    fn is_open(&self) -> bool {
        self.open.is_some()
    }

    fn close(&mut self) {
        if self.open.take().is_some() {
            tracing::info!("Closed mock camera");
        }
    }
}
