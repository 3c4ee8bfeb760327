//! HotBits: consume-once randomness from camera sensor noise.
//!
//! Low-order bits harvested from camera frames are stored as small
//! "entropy sets" in a directory. A consumer turns those sets back into
//! bits on demand and exposes them through an RNG-style API in which
//! every stored bit is used at most once.
//!
//! # Architecture
//!
//! ```text
//! capture → extraction → storage (queue on disk) → engine (bit pool) → caller
//!                 ↑                  │
//!                 └── backpressure ──┘
//! ```
//!
//! # Design Principles
//!
//! - **Consume once**: a set's file is deleted as soon as it is loaded
//! - **No modulo bias**: bounded values come from rejection sampling
//! - **Block, don't drop**: producers pause while the queue is full
//! - **Fail loudly**: an empty queue or a corrupt set is an error, never a fallback
//! - **No cryptographic claims**: nothing here certifies the quality of the source
//!
//! # Example
//!
//! ```no_run
//! use hotbits::{
//!     capture::{Camera, CaptureConfig, MockCamera},
//!     config::{EngineConfig, ProducerConfig},
//!     engine::{BitPool, EntropyRng},
//!     producer::Producer,
//!     storage::EntropyQueue,
//! };
//! use std::sync::atomic::AtomicBool;
//!
//! // Fill the queue
//! let mut camera = MockCamera::new();
//! camera.open(&CaptureConfig::default()).unwrap();
//! let queue = EntropyQueue::open("hotbits_storage", "hotbits").unwrap();
//! let mut producer = Producer::new(camera, queue, &ProducerConfig::default());
//! producer.run(Some(10), &AtomicBool::new(false)).unwrap();
//!
//! // Draw from it
//! let queue = EntropyQueue::open("hotbits_storage", "hotbits").unwrap();
//! let mut rng = BitPool::new(queue, EngineConfig::default());
//! let die = rng.int_inclusive(1, 6).unwrap();
//! let coin = rng.uniform01().unwrap() < 0.5;
//! println!("{} {}", die, coin);
//! ```

#![warn(rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod capture;
pub mod config;
pub mod engine;
pub mod extraction;
pub mod metrics;
pub mod producer;
pub mod storage;

// Re-export commonly used types at crate root
pub use capture::{Camera, CaptureConfig, Frame, MockCamera};
pub use config::FileConfig;
pub use engine::{BitPool, EngineError, EntropyRng};
pub use extraction::{LsbSampler, RawBits};
pub use producer::{CapacityGate, Producer, ProducerError};
pub use storage::{EntropyQueue, QueueError, SetSource};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
