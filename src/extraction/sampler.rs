//! Least-significant-bit sampling of sensor noise.
//!
//! The low bit of each channel of a pixel is dominated by sensor and
//! shot noise. The sampler keeps only those bits from a random subset
//! of pixel positions in every frame.

use super::{ExtractionError, RawBits};
use crate::capture::{Frame, FrameShape};
use rand::seq::index;
use rand_chacha::ChaCha20Rng;
use rand_core::SeedableRng;

/// Default fraction of pixel positions sampled per frame.
pub const DEFAULT_SAMPLING_RATIO: f64 = 0.2;

/// Harvests least significant bits from a stream of same-shaped frames.
pub struct LsbSampler {
    sampling_ratio: f64,
    /// Shape of the previous frame; `None` until the sampler is primed.
    previous_shape: Option<FrameShape>,
    bits: RawBits,
    total_bits_processed: u64,
    /// Chooses pixel positions. Its output never reaches a set directly.
    positions: ChaCha20Rng,
}

impl LsbSampler {
    pub fn new(sampling_ratio: f64) -> Self {
        Self::with_positions(sampling_ratio, ChaCha20Rng::from_entropy())
    }

    /// Creates a sampler with reproducible position choices.
    pub fn with_seed(sampling_ratio: f64, seed: u64) -> Self {
        Self::with_positions(sampling_ratio, ChaCha20Rng::seed_from_u64(seed))
    }

    fn with_positions(sampling_ratio: f64, positions: ChaCha20Rng) -> Self {
        Self {
            sampling_ratio,
            previous_shape: None,
            bits: RawBits::new(),
            total_bits_processed: 0,
            positions,
        }
    }

    /// Samples a frame and returns the number of bits it contributed.
    ///
    /// The first frame only primes the sampler and contributes nothing.
    /// Every later frame must have the same shape as the one before it.
    pub fn process(&mut self, frame: &Frame) -> Result<usize, ExtractionError> {
        if !frame.is_valid() {
            return Err(ExtractionError::InvalidFrame {
                sequence: frame.sequence(),
            });
        }

        let Some(expected) = self.previous_shape else {
            self.previous_shape = Some(frame.shape());
            tracing::trace!(sequence = frame.sequence(), "Sampler primed");
            return Ok(0);
        };
        if expected != frame.shape() {
            return Err(ExtractionError::ShapeMismatch {
                expected,
                found: frame.shape(),
            });
        }

        let pixel_count = frame.pixel_count();
        let num_samples =
            ((pixel_count as f64 * self.sampling_ratio) as usize).min(pixel_count);

        for position in index::sample(&mut self.positions, pixel_count, num_samples) {
            for channel in 0..frame.channels() {
                self.bits.push(frame.sample(position, channel) & 1 == 1);
            }
        }
        self.bits.note_frame();

        let added = num_samples * frame.channels();
        self.total_bits_processed += added as u64;

        tracing::trace!(
            sequence = frame.sequence(),
            added,
            buffered = self.bits.len(),
            "Sampled frame"
        );
        Ok(added)
    }

    /// Bits buffered and not yet cut into a set.
    pub fn buffered_bits(&self) -> usize {
        self.bits.len()
    }

    /// Returns true once at least `set_bits` bits are buffered.
    pub fn is_ready(&self, set_bits: usize) -> bool {
        self.bits.len() >= set_bits
    }

    /// Cuts every whole 24-bit chunk buffered so far into set words.
    pub fn cut_set(&mut self) -> Vec<u32> {
        let bias = self.bits.bit_bias();
        let frames = self.bits.source_frames();
        let words = self.bits.drain_words();
        tracing::debug!(
            words = words.len(),
            frames,
            bias = %format!("{:.4}", bias),
            carried = self.bits.len(),
            "Cut entropy set"
        );
        words
    }

    /// Total bits harvested since creation.
    pub fn total_bits_processed(&self) -> u64 {
        self.total_bits_processed
    }

    /// Forgets the previous frame shape and any buffered bits.
    pub fn reset(&mut self) {
        self.previous_shape = None;
        self.bits = RawBits::new();
    }
}

impl Default for LsbSampler {
    fn default() -> Self {
        Self::new(DEFAULT_SAMPLING_RATIO)
    }
}
