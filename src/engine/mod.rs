//! Consumption engine.
//!
//! Turns stored entropy sets into integers, floats, choices and
//! permutations. A [`BitPool`] owns an in-memory bit buffer that is
//! refilled from the entropy queue one whole set at a time; the
//! [`EntropyRng`] trait derives every higher-level primitive from the
//! pool's single `extract` operation.

mod pool;
mod rng;

pub use pool::{BitPool, MAX_EXTRACT_BITS};
pub use rng::{bit_length, EntropyRng};

use crate::storage::QueueError;
use thiserror::Error;

/// Errors raised while drawing random values.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Queue(#[from] QueueError),
    #[error("cannot extract {requested} bits at once (max {max})", max = MAX_EXTRACT_BITS)]
    TooManyBits { requested: u32 },
    #[error("empty range between {low} and {high}")]
    EmptyRange { low: i64, high: i64 },
    #[error("no {bits}-bit draw can land in {low}..={high}")]
    UnreachableRange { low: i64, high: i64, bits: u32 },
    #[error("range step must not be zero")]
    ZeroStep,
    #[error("cannot choose from an empty sequence")]
    EmptySequence,
    #[error("sample of {requested} is larger than the sequence ({available})")]
    SampleTooLarge { requested: usize, available: usize },
    #[error("gave up after {attempts} rejected draws")]
    RetryLimitExceeded { attempts: u32 },
}

impl EngineError {
    /// Returns true if the queue ran out of sets while bits were still needed.
    pub fn is_exhausted(&self) -> bool {
        matches!(self, EngineError::Queue(QueueError::PoolExhausted))
    }
}
