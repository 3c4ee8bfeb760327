//! Prometheus metrics exporter for queue monitoring.
//!
//! # Metrics Exposed
//!
//! ## Queue
//! - `hotbits_queue_sets` - Sets currently resident in the queue
//! - `hotbits_sets_written_total` - Sets written by the producer
//! - `hotbits_sets_consumed_total` - Sets loaded and deleted by the consumer
//!
//! ## Consumer
//! - `hotbits_pool_bits_buffered` - Bits held in the in-memory pool
//! - `hotbits_bits_extracted_total` - Bits handed out
//! - `hotbits_rejections_total` - Draws discarded by rejection sampling
//!
//! ## Producer
//! - `hotbits_frames_processed_total` - Frames sampled
//! - `hotbits_backpressure_waits_total` - Pauses on a full queue
//!
//! # Example
//!
//! ```no_run
//! use hotbits::metrics::{MetricsRegistry, MetricsSnapshot};
//!
//! let registry = MetricsRegistry::new().expect("Failed to create registry");
//!
//! let snapshot = MetricsSnapshot {
//!     queue_sets: 12,
//!     sets_written: 40,
//!     frames_processed: 41,
//!     ..Default::default()
//! };
//!
//! registry.update(&snapshot);
//! ```

mod collector;
#[cfg(feature = "metrics")]
mod server;

pub use collector::{MetricsError, MetricsRegistry, MetricsSnapshot};
#[cfg(feature = "metrics")]
pub use server::{MetricsServer, MetricsServerConfig, MetricsState, ServerError};
