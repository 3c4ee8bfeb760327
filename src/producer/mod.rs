//! Entropy production.
//!
//! Drives a camera, harvests low-order bits from each frame, cuts them
//! into sets and stores the sets in the queue, pausing whenever the
//! queue is at capacity.

mod backpressure;
mod runner;

pub use backpressure::CapacityGate;
pub use runner::{Producer, ProducerStats};

use crate::capture::CameraError;
use crate::extraction::ExtractionError;
use crate::storage::QueueError;
use thiserror::Error;

/// Errors that stop a producer.
#[derive(Debug, Error)]
pub enum ProducerError {
    #[error("camera error: {0}")]
    Camera(#[from] CameraError),
    #[error("extraction error: {0}")]
    Extraction(#[from] ExtractionError),
    #[error("queue error: {0}")]
    Queue(#[from] QueueError),
}
