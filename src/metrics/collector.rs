//! Prometheus gauges and counters for the queue, producer and consumer.

use prometheus::{Encoder, IntCounter, IntGauge, Registry, TextEncoder};
use thiserror::Error;

/// Failure to register or encode a metric.
#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("metrics registry error: {0}")]
    Prometheus(#[from] prometheus::Error),
}

/// Point-in-time counters pushed into a [`MetricsRegistry`].
///
/// Producer and consumer each fill in their own half; the rest stays zero.
#[derive(Debug, Clone, Default)]
pub struct MetricsSnapshot {
    /// Sets currently resident in the queue.
    pub queue_sets: usize,
    /// Sets written by the producer.
    pub sets_written: u64,
    /// Sets taken by the consumer.
    pub sets_consumed: u64,
    /// Bits held in the consumer's in-memory pool.
    pub pool_bits_buffered: usize,
    /// Bits handed out by the consumer.
    pub bits_extracted: u64,
    /// Draws discarded by rejection sampling.
    pub rejections: u64,
    /// Frames captured by the producer.
    pub frames_processed: u64,
    /// Times the producer paused on a full queue.
    pub backpressure_waits: u64,
}

/// Prometheus metrics registry for the entropy queue.
pub struct MetricsRegistry {
    registry: Registry,

    // Queue metrics
    queue_sets: IntGauge,
    sets_written_total: IntCounter,
    sets_consumed_total: IntCounter,

    // Consumer metrics
    pool_bits_buffered: IntGauge,
    bits_extracted_total: IntCounter,
    rejections_total: IntCounter,

    // Producer metrics
    frames_processed_total: IntCounter,
    backpressure_waits_total: IntCounter,
}

impl MetricsRegistry {
    /// Creates a new metrics registry with all metrics registered.
    pub fn new() -> Result<Self, MetricsError> {
        let registry = Registry::new();

        let queue_sets = IntGauge::new(
            "hotbits_queue_sets",
            "Entropy sets currently resident in the queue",
        )?;
        let sets_written_total = IntCounter::new(
            "hotbits_sets_written_total",
            "Total entropy sets written by the producer",
        )?;
        let sets_consumed_total = IntCounter::new(
            "hotbits_sets_consumed_total",
            "Total entropy sets loaded and deleted by the consumer",
        )?;
        let pool_bits_buffered = IntGauge::new(
            "hotbits_pool_bits_buffered",
            "Bits buffered in the consumer's in-memory pool",
        )?;
        let bits_extracted_total = IntCounter::new(
            "hotbits_bits_extracted_total",
            "Total bits handed out by the consumer",
        )?;
        let rejections_total = IntCounter::new(
            "hotbits_rejections_total",
            "Total draws discarded by rejection sampling",
        )?;
        let frames_processed_total = IntCounter::new(
            "hotbits_frames_processed_total",
            "Total camera frames sampled by the producer",
        )?;
        let backpressure_waits_total = IntCounter::new(
            "hotbits_backpressure_waits_total",
            "Times the producer paused because the queue was full",
        )?;

        registry.register(Box::new(queue_sets.clone()))?;
        registry.register(Box::new(sets_written_total.clone()))?;
        registry.register(Box::new(sets_consumed_total.clone()))?;
        registry.register(Box::new(pool_bits_buffered.clone()))?;
        registry.register(Box::new(bits_extracted_total.clone()))?;
        registry.register(Box::new(rejections_total.clone()))?;
        registry.register(Box::new(frames_processed_total.clone()))?;
        registry.register(Box::new(backpressure_waits_total.clone()))?;

        Ok(Self {
            registry,
            queue_sets,
            sets_written_total,
            sets_consumed_total,
            pool_bits_buffered,
            bits_extracted_total,
            rejections_total,
            frames_processed_total,
            backpressure_waits_total,
        })
    }

    /// Sets gauges and advances counters to the snapshot's totals.
    pub fn update(&self, snapshot: &MetricsSnapshot) {
        self.queue_sets.set(snapshot.queue_sets as i64);
        self.pool_bits_buffered.set(snapshot.pool_bits_buffered as i64);

        // Counters only move forward by the difference
        advance(&self.sets_written_total, snapshot.sets_written);
        advance(&self.sets_consumed_total, snapshot.sets_consumed);
        advance(&self.bits_extracted_total, snapshot.bits_extracted);
        advance(&self.rejections_total, snapshot.rejections);
        advance(&self.frames_processed_total, snapshot.frames_processed);
        advance(&self.backpressure_waits_total, snapshot.backpressure_waits);
    }

        pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Text exposition format, as served on `/metrics`.
    pub fn encode(&self) -> Result<String, MetricsError> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}

fn advance(counter: &IntCounter, total: u64) {
    let current = counter.get();
    if total > current {
        counter.inc_by(total - current);
    }
}

impl MetricsSnapshot {
    /// Captures producer-side state.
    pub fn from_producer(
        queue: &crate::storage::EntropyQueue,
        stats: &crate::producer::ProducerStats,
    ) -> Self {
        Self {
            queue_sets: queue.size().unwrap_or_default(),
            sets_written: stats.sets_written,
            frames_processed: stats.frames_processed,
            backpressure_waits: stats.backpressure_waits,
            ..Default::default()
        }
    }

    /// Captures consumer-side state.
    pub fn from_pool(pool: &crate::engine::BitPool) -> Self {
        Self {
            queue_sets: pool.source().size().unwrap_or_default(),
            sets_consumed: pool.sets_loaded(),
            pool_bits_buffered: pool.buffered_bits(),
            bits_extracted: pool.bits_extracted(),
            rejections: pool.rejections(),
            ..Default::default()
        }
    }
}
