//! Capacity-based backpressure for entropy producers.
//!
//! The queue itself never blocks. A producer asks the gate before each
//! frame, and the gate polls the queue size until a consumer has made
//! room. Nothing is dropped while waiting.

use crate::storage::{EntropyQueue, QueueError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

/// Longest single sleep while waiting, so a stop request is seen promptly.
const STOP_CHECK_SLICE: Duration = Duration::from_millis(50);

/// Holds a producer back while the queue is at capacity.
#[derive(Debug, Clone)]
pub struct CapacityGate {
    capacity: usize,
    poll_interval: Duration,
    waits: u64,
}

impl CapacityGate {
    pub fn new(capacity: usize, poll_interval: Duration) -> Self {
        Self {
            capacity: capacity.max(1),
            poll_interval,
            waits: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of times the gate had to hold a producer back.
    pub fn waits(&self) -> u64 {
        self.waits
    }

    /// Returns true if another set may be written now.
    pub fn has_capacity(&self, queue: &EntropyQueue) -> Result<bool, QueueError> {
        Ok(queue.size()? < self.capacity)
    }

    /// Blocks until the queue drops below capacity.
    ///
    /// Returns `Ok(true)` once there is room, or `Ok(false)` if `stop` was
    /// raised first.
    pub fn wait_for_capacity(
        &mut self,
        queue: &EntropyQueue,
        stop: &AtomicBool,
    ) -> Result<bool, QueueError> {
        let mut since: Option<Instant> = None;
        loop {
            if stop.load(Ordering::SeqCst) {
                return Ok(false);
            }

            let size = queue.size()?;
            if size < self.capacity {
                if let Some(since) = since {
                    tracing::info!(
                        size,
                        waited_ms = since.elapsed().as_millis() as u64,
                        "Queue below capacity, resuming"
                    );
                }
                return Ok(true);
            }

            if since.is_none() {
                self.waits += 1;
                since = Some(Instant::now());
                tracing::warn!(
                    capacity = self.capacity,
                    poll_ms = self.poll_interval.as_millis() as u64,
                    "Reached maximum set count, waiting for sets to be consumed"
                );
            }
            sleep_unless_stopped(self.poll_interval, stop);
        }
    }
}

/// Sleeps for `duration`, returning early if `stop` is raised.
pub(crate) fn sleep_unless_stopped(duration: Duration, stop: &AtomicBool) {
    let deadline = Instant::now() + duration;
    loop {
        let now = Instant::now();
        if now >= deadline || stop.load(Ordering::SeqCst) {
            return;
        }
        std::thread::sleep((deadline - now).min(STOP_CHECK_SLICE));
    }
}
