//! The capture → extract → store loop.

use super::backpressure::{sleep_unless_stopped, CapacityGate};
use super::ProducerError;
use crate::capture::Camera;
use crate::config::ProducerConfig;
use crate::extraction::LsbSampler;
use crate::storage::EntropyQueue;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Counters describing a producer's progress.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProducerStats {
    /// Frames captured and sampled.
    pub frames_processed: u64,
    /// Sets written to the queue.
    pub sets_written: u64,
    /// Words written across all sets.
    pub words_written: u64,
    /// Raw bits harvested from frames.
    pub bits_harvested: u64,
    /// Times production paused because the queue was full.
    pub backpressure_waits: u64,
}

/// Feeds an entropy queue from a camera.
pub struct Producer<C: Camera> {
    camera: C,
    sampler: LsbSampler,
    queue: EntropyQueue,
    gate: CapacityGate,
    set_bits: usize,
    frame_interval: Duration,
    stats: ProducerStats,
}

impl<C: Camera> Producer<C> {
    /// Creates a producer over an already opened camera.
    pub fn new(camera: C, queue: EntropyQueue, config: &ProducerConfig) -> Self {
        Self::with_sampler(camera, queue, LsbSampler::new(config.sampling_ratio), config)
    }

    /// Creates a producer with a caller-supplied sampler.
    pub fn with_sampler(
        camera: C,
        queue: EntropyQueue,
        sampler: LsbSampler,
        config: &ProducerConfig,
    ) -> Self {
        Self {
            camera,
            sampler,
            queue,
            gate: CapacityGate::new(config.max_sets, config.poll_interval()),
            set_bits: config.set_bits,
            frame_interval: config.frame_interval(),
            stats: ProducerStats::default(),
        }
    }

    /// Captures and samples one frame, writing a set if enough bits are buffered.
    ///
    /// Does not consult the capacity gate.
    pub fn step(&mut self) -> Result<Option<PathBuf>, ProducerError> {
        let frame = self.camera.capture()?;
        let added = self.sampler.process(&frame)?;
        self.stats.frames_processed += 1;
        self.stats.bits_harvested += added as u64;

        if !self.sampler.is_ready(self.set_bits) {
            return Ok(None);
        }

        let words = self.sampler.cut_set();
        if words.is_empty() {
            tracing::warn!(sequence = frame.sequence(), "Cut produced no nonzero words");
            return Ok(None);
        }

        let path = self.queue.enqueue(&words)?;
        self.stats.sets_written += 1;
        self.stats.words_written += words.len() as u64;

        tracing::info!(
            path = %path.display(),
            bits = words.len() * crate::storage::WORD_BITS,
            total_bits = self.sampler.total_bits_processed(),
            sets_written = self.stats.sets_written,
            "Stored entropy set"
        );
        Ok(Some(path))
    }

    /// Runs until `max_frames` frames were processed or `stop` is raised.
    ///
    /// `None` runs until stopped. Before every frame the producer waits
    /// for the queue to drop below capacity.
    pub fn run(
        &mut self,
        max_frames: Option<u64>,
        stop: &AtomicBool,
    ) -> Result<ProducerStats, ProducerError> {
        self.run_observed(max_frames, stop, |_, _| {})
    }

    /// Like [`Producer::run`], calling `observe` after every processed frame.
    pub fn run_observed(
        &mut self,
        max_frames: Option<u64>,
        stop: &AtomicBool,
        mut observe: impl FnMut(&EntropyQueue, &ProducerStats),
    ) -> Result<ProducerStats, ProducerError> {
        tracing::info!(
            capacity = self.gate.capacity(),
            set_bits = self.set_bits,
            "Starting entropy production"
        );

        loop {
            if stop.load(Ordering::SeqCst) {
                tracing::info!("Stop requested");
                break;
            }
            if max_frames.is_some_and(|max| self.stats.frames_processed >= max) {
                break;
            }
            if !self.gate.wait_for_capacity(&self.queue, stop)? {
                continue;
            }

            self.step()?;
            observe(&self.queue, &self.stats());

            if !self.frame_interval.is_zero() {
                sleep_unless_stopped(self.frame_interval, stop);
            }
        }

        tracing::info!(
            frames = self.stats.frames_processed,
            sets = self.stats.sets_written,
            "Entropy production finished"
        );
        Ok(self.stats())
    }

    pub fn stats(&self) -> ProducerStats {
        ProducerStats {
            backpressure_waits: self.gate.waits(),
            ..self.stats
        }
    }

    pub fn queue(&self) -> &EntropyQueue {
        &self.queue
    }

    /// Consumes the producer, returning the camera so it can be closed.
    pub fn into_camera(self) -> C {
        self.camera
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::{CaptureConfig, MockCamera};
    use std::sync::Arc;
    use std::thread;

    // 40 x 20 pixels * 3 channels at ratio 1.0 = 2400 bits per frame
    fn open_camera() -> MockCamera {
        let mut camera = MockCamera::with_seed(11);
        camera.open(&CaptureConfig::with_dimensions(40, 20)).unwrap();
        camera
    }

    fn config(max_sets: usize) -> ProducerConfig {
        ProducerConfig {
            max_sets,
            poll_interval_ms: 20,
            sampling_ratio: 1.0,
            ..Default::default()
        }
    }

    fn producer(dir: &tempfile::TempDir, max_sets: usize) -> Producer<MockCamera> {
        let queue = EntropyQueue::open(dir.path(), "hotbits").unwrap();
        Producer::with_sampler(
            open_camera(),
            queue,
            LsbSampler::with_seed(1.0, 5),
            &config(max_sets),
        )
    }

    #[test]
    fn test_first_frame_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let mut producer = producer(&dir, 10);

        assert!(producer.step().unwrap().is_none());
        let path = producer.step().unwrap().unwrap();
        assert!(path.exists());
        assert_eq!(producer.queue().size().unwrap(), 1);
    }

    #[test]
    fn test_run_frame_budget() {
        let dir = tempfile::tempdir().unwrap();
        let mut producer = producer(&dir, 10);
        let stop = AtomicBool::new(false);

        let stats = producer.run(Some(4), &stop).unwrap();

        assert_eq!(stats.frames_processed, 4);
        assert_eq!(stats.sets_written, 3);
        assert_eq!(stats.bits_harvested, 3 * 2400);
        assert_eq!(producer.queue().size().unwrap(), 3);
    }

    #[test]
    fn test_run_observed_sees_every_frame() {
        let dir = tempfile::tempdir().unwrap();
        let mut producer = producer(&dir, 10);
        let mut seen = Vec::new();

        producer
            .run_observed(Some(3), &AtomicBool::new(false), |queue, stats| {
                seen.push((stats.frames_processed, queue.size().unwrap()));
            })
            .unwrap();

        assert_eq!(seen, vec![(1, 0), (2, 1), (3, 2)]);
    }

    #[test]
    fn test_run_pauses_at_capacity() {
        let dir = tempfile::tempdir().unwrap();
        let mut producer = producer(&dir, 2);

        let stop = Arc::new(AtomicBool::new(false));
        let stopper = {
            let stop = Arc::clone(&stop);
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(300));
                stop.store(true, Ordering::SeqCst);
            })
        };

        let stats = producer.run(None, &stop).unwrap();
        stopper.join().unwrap();

        assert_eq!(stats.sets_written, 2);
        assert_eq!(stats.backpressure_waits, 1);
        assert_eq!(producer.queue().size().unwrap(), 2);
    }

    #[test]
    fn test_unopened_camera_fails() {
        let dir = tempfile::tempdir().unwrap();
        let queue = EntropyQueue::open(dir.path(), "hotbits").unwrap();
        let mut producer = Producer::new(MockCamera::new(), queue, &config(2));

        assert!(matches!(
            producer.step(),
            Err(ProducerError::Camera(_))
        ));
    }
}
