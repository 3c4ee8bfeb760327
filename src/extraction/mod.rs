//! Bit harvesting from camera frames.
//!
//! Converts raw frames into a stream of raw bits and cuts that stream
//! into entropy sets once enough bits have accumulated.

mod bitstream;
mod sampler;

pub use bitstream::RawBits;
pub use sampler::{LsbSampler, DEFAULT_SAMPLING_RATIO};

use crate::capture::FrameShape;
use thiserror::Error;

/// Errors raised while extracting bits from frames.
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("frame shape changed from {expected:?} to {found:?}; captures must be consistent")]
    ShapeMismatch {
        expected: FrameShape,
        found: FrameShape,
    },
    #[error("frame {sequence} pixel buffer does not match its shape")]
    InvalidFrame { sequence: u64 },
}
