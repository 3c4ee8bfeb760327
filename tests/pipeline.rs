//! Integration tests for the producer → queue → bit pool pipeline.

use hotbits::{
    capture::{Camera, CaptureConfig, MockCamera},
    config::{EngineConfig, FileConfig, ProducerConfig},
    engine::{BitPool, EngineError, EntropyRng},
    producer::Producer,
    storage::{EntropyQueue, QueueError},
};
use std::fs;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

fn pool_over(dir: &tempfile::TempDir) -> BitPool {
    let queue = EntropyQueue::open(dir.path(), "hotbits").unwrap();
    BitPool::new(queue, EngineConfig::default())
}

#[test]
fn single_set_yields_its_words_then_exhausts() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("hotbits_20240101_120000.json"),
        r#"{"integerList": [5, 10]}"#,
    )
    .unwrap();

    let mut rng = pool_over(&dir);
    assert_eq!(rng.extract(24).unwrap(), 5);
    assert_eq!(rng.extract(24).unwrap(), 10);

    let err = rng.extract(1).unwrap_err();
    assert!(err.is_exhausted(), "unexpected error: {}", err);
    assert_eq!(rng.sets_loaded(), 1);
}

#[test]
fn set_is_deleted_as_soon_as_it_is_loaded() {
    let dir = tempfile::tempdir().unwrap();
    let mut queue = EntropyQueue::open(dir.path(), "hotbits").unwrap();
    queue.enqueue(&[0xAB_CDEF]).unwrap();

    let mut rng = BitPool::new(queue, EngineConfig::default());
    rng.extract(1).unwrap();

    // 23 bits still buffered, but the file is already gone
    assert_eq!(rng.buffered_bits(), 23);
    assert_eq!(rng.source().size().unwrap(), 0);
    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[test]
fn same_set_cannot_be_taken_twice() {
    let dir = tempfile::tempdir().unwrap();
    let mut queue = EntropyQueue::open(dir.path(), "hotbits").unwrap();
    queue.enqueue(&[1, 2, 3]).unwrap();

    assert_eq!(queue.take_random().unwrap(), vec![1, 2, 3]);
    assert!(matches!(queue.take_random(), Err(QueueError::PoolExhausted)));
}

#[test]
fn malformed_set_surfaces_through_the_pool() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("hotbits_bad.json"), r#"{"integerList": [0]}"#).unwrap();

    let mut rng = pool_over(&dir);
    assert!(matches!(
        rng.extract(8),
        Err(EngineError::Queue(QueueError::MalformedSet { .. }))
    ));
}

#[test]
fn int_inclusive_zero_to_seven_reads_four_bit_draws() {
    let dir = tempfile::tempdir().unwrap();
    let mut queue = EntropyQueue::open(dir.path(), "hotbits").unwrap();
    // 1111 (rejected) 0101 (accepted) then 16 more bits
    queue.enqueue(&[0xF5_0001]).unwrap();

    let mut rng = BitPool::new(queue, EngineConfig::default());
    assert_eq!(rng.int_inclusive(0, 7).unwrap(), 5);
    assert_eq!(rng.bits_extracted(), 8);
    assert_eq!(rng.rejections(), 1);
}

#[test]
fn produced_sets_are_fully_consumable() {
    let dir = tempfile::tempdir().unwrap();

    let mut camera = MockCamera::with_seed(3);
    camera.open(&CaptureConfig::with_dimensions(40, 20)).unwrap();
    let queue = EntropyQueue::open(dir.path(), "hotbits").unwrap();
    let config = ProducerConfig {
        sampling_ratio: 1.0,
        ..Default::default()
    };
    let mut producer = Producer::new(camera, queue, &config);
    let stats = producer.run(Some(6), &AtomicBool::new(false)).unwrap();
    assert_eq!(stats.sets_written, 5);

    let mut rng = pool_over(&dir);
    let mut drawn = 0u64;
    loop {
        match rng.extract(24) {
            Ok(_) => drawn += 24,
            Err(e) if e.is_exhausted() => break,
            Err(e) => panic!("unexpected error: {}", e),
        }
    }

    assert_eq!(drawn, stats.words_written * 24);
    assert_eq!(rng.sets_loaded(), 5);
    assert_eq!(rng.source().size().unwrap(), 0);
}

#[test]
fn producer_waits_for_consumer_at_capacity() {
    let dir = tempfile::tempdir().unwrap();

    let mut camera = MockCamera::with_seed(9);
    camera.open(&CaptureConfig::with_dimensions(40, 20)).unwrap();
    let queue = EntropyQueue::open(dir.path(), "hotbits").unwrap();
    let config = ProducerConfig {
        max_sets: 2,
        poll_interval_ms: 20,
        sampling_ratio: 1.0,
        ..Default::default()
    };
    let mut producer = Producer::new(camera, queue, &config);

    let stop = Arc::new(AtomicBool::new(false));
    let consumer = {
        let stop = Arc::clone(&stop);
        let path = dir.path().to_path_buf();
        thread::spawn(move || {
            let mut queue = EntropyQueue::open(path, "hotbits").unwrap();
            // Wait until the producer is parked at capacity
            while queue.size().unwrap() < 2 {
                thread::sleep(Duration::from_millis(10));
            }
            thread::sleep(Duration::from_millis(100));
            queue.take_random().unwrap();

            while queue.size().unwrap() < 2 {
                thread::sleep(Duration::from_millis(10));
            }
            stop.store(true, Ordering::SeqCst);
        })
    };

    let stats = producer.run(None, &stop).unwrap();
    consumer.join().unwrap();

    // Two sets, one consumed, one more written to refill; nothing dropped
    assert_eq!(stats.sets_written, 3);
    assert!(stats.backpressure_waits >= 1);
    assert_eq!(producer.queue().size().unwrap(), 2);
}

#[test]
fn config_file_drives_storage_and_engine() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("hotbits.toml");
    let storage = dir.path().join("sets");
    fs::write(
        &config_path,
        format!(
            "[storage]\ndirectory = {:?}\nprefix = \"cam0\"\n\n[engine]\nmax_retries = 0\n",
            storage.to_str().unwrap()
        ),
    )
    .unwrap();

    let config = FileConfig::from_file(&config_path).unwrap();
    let mut queue = EntropyQueue::from_config(&config.storage).unwrap();
    let path = queue.enqueue(&[0xFF_FFFF]).unwrap();
    assert!(path.starts_with(&storage));
    assert!(path
        .file_name()
        .unwrap()
        .to_str()
        .unwrap()
        .starts_with("cam0_"));

    // A 3-bit draw of 111 is outside 0..5 and no retries are allowed
    let mut rng = BitPool::new(queue, config.engine.clone());
    assert!(matches!(
        rng.range(0, 5, 1),
        Err(EngineError::RetryLimitExceeded { attempts: 1 })
    ));
}
