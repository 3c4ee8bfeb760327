//! Durable storage of entropy sets.
//!
//! Raw bits are cut into sets of 24-bit words and written as small JSON
//! files into a storage directory. The directory acts as a bounded queue
//! between the producer and the consumption engine: producers add files,
//! the consumer removes one at random each time it needs more bits.

pub mod codec;
mod queue;

pub use codec::{decode, encode, EntropySet, WORD_BITS};
pub use queue::EntropyQueue;

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors raised by the entropy queue.
#[derive(Debug, Error)]
pub enum QueueError {
    #[error("no entropy sets available; generate more sets")]
    PoolExhausted,
    #[error("malformed entropy set {path}: {reason}")]
    MalformedSet { path: PathBuf, reason: String },
    #[error("refusing to store invalid set: {0}")]
    InvalidSet(String),
    #[error("failed to encode entropy set: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl QueueError {
    pub(crate) fn malformed(path: &Path, reason: impl std::fmt::Display) -> Self {
        Self::MalformedSet {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        }
    }
}

/// A supply of whole entropy sets.
///
/// Each call hands out a set that will never be handed out again.
pub trait SetSource {
    /// Removes one set from the supply and returns its words.
    ///
    /// Fails with [`QueueError::PoolExhausted`] when nothing is left.
    fn take_random(&mut self) -> Result<Vec<u32>, QueueError>;
}

impl<S: SetSource + ?Sized> SetSource for &mut S {
    fn take_random(&mut self) -> Result<Vec<u32>, QueueError> {
        (**self).take_random()
    }
}
