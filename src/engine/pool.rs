//! In-memory bit pool refilled from the entropy queue.

use super::{EngineError, EntropyRng};
use crate::config::EngineConfig;
use crate::storage::{codec, EntropyQueue, SetSource};
use rand_core::RngCore;
use std::collections::VecDeque;

/// Largest number of bits a single extraction may return.
pub const MAX_EXTRACT_BITS: u32 = u64::BITS;

/// Consumer-side bit buffer backed by a supply of entropy sets.
///
/// Bits are appended one whole set at a time and removed from the front.
/// A set is only taken when the buffer cannot satisfy a request, and the
/// set's backing file is gone before its bits are used.
///
/// A pool is meant for a single thread; it performs blocking I/O through
/// its set source whenever it refills.
pub struct BitPool<S: SetSource = EntropyQueue> {
    source: S,
    buffer: VecDeque<bool>,
    config: EngineConfig,
    bits_extracted: u64,
    sets_loaded: u64,
    rejections: u64,
}

impl<S: SetSource> BitPool<S> {
    /// Creates an empty pool over `source`.
    pub fn new(source: S, config: EngineConfig) -> Self {
        Self {
            source,
            buffer: VecDeque::new(),
            config,
            bits_extracted: 0,
            sets_loaded: 0,
            rejections: 0,
        }
    }

    /// Bits currently held in memory.
    pub fn buffered_bits(&self) -> usize {
        self.buffer.len()
    }

    /// Total bits handed out by `extract`.
    pub fn bits_extracted(&self) -> u64 {
        self.bits_extracted
    }

    /// Sets taken from the source so far.
    pub fn sets_loaded(&self) -> u64 {
        self.sets_loaded
    }

    /// Draws discarded by rejection sampling so far.
    pub fn rejections(&self) -> u64 {
        self.rejections
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }

    /// Consumes the pool, discarding buffered bits.
    pub fn into_source(self) -> S {
        self.source
    }

    /// Takes one set from the source and appends its bits.
    fn refill(&mut self) -> Result<(), EngineError> {
        let words = self.source.take_random()?;
        codec::decode_into(&words, &mut self.buffer);
        self.sets_loaded += 1;

        tracing::debug!(
            words = words.len(),
            buffered = self.buffer.len(),
            sets_loaded = self.sets_loaded,
            "Refilled bit pool"
        );
        Ok(())
    }
}

impl<S: SetSource> EntropyRng for BitPool<S> {
    fn extract(&mut self, k: u32) -> Result<u64, EngineError> {
        if k > MAX_EXTRACT_BITS {
            return Err(EngineError::TooManyBits { requested: k });
        }
        if k == 0 {
            return Ok(0);
        }

        while self.buffer.len() < k as usize {
            self.refill()?;
        }

        let value = self
            .buffer
            .drain(..k as usize)
            .fold(0u64, |acc, bit| (acc << 1) | bit as u64);
        self.bits_extracted += k as u64;
        Ok(value)
    }

    fn retry_limit(&self) -> Option<u32> {
        self.config.max_retries
    }

    fn note_rejection(&mut self) {
        self.rejections += 1;
    }
}

/// `rand_core` view of the pool.
///
/// The infallible methods panic once the source runs dry, as `OsRng` does
/// when the OS fails; use `try_fill_bytes` to observe exhaustion instead.
impl<S: SetSource> RngCore for BitPool<S> {
    fn next_u32(&mut self) -> u32 {
        match self.extract(32) {
            Ok(value) => value as u32,
            Err(e) => panic!("entropy pool failed: {}", e),
        }
    }

    fn next_u64(&mut self) -> u64 {
        match self.extract(64) {
            Ok(value) => value,
            Err(e) => panic!("entropy pool failed: {}", e),
        }
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        if let Err(e) = self.try_fill_bytes(dest) {
            panic!("entropy pool failed: {}", e);
        }
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand_core::Error> {
        for byte in dest.iter_mut() {
            *byte = self.extract(8).map_err(rand_core::Error::new)? as u8;
        }
        Ok(())
    }
}

impl<S: SetSource> std::fmt::Debug for BitPool<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BitPool")
            .field("buffered_bits", &self.buffer.len())
            .field("bits_extracted", &self.bits_extracted)
            .field("sets_loaded", &self.sets_loaded)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::QueueError;

    /// Sets held in memory, handed out front first.
    #[derive(Default)]
    struct MemorySets(VecDeque<Vec<u32>>);

    impl SetSource for MemorySets {
        fn take_random(&mut self) -> Result<Vec<u32>, QueueError> {
            self.0.pop_front().ok_or(QueueError::PoolExhausted)
        }
    }

    fn pool_of(sets: &[&[u32]]) -> BitPool<MemorySets> {
        let sets = sets.iter().map(|s| s.to_vec()).collect();
        BitPool::new(MemorySets(sets), EngineConfig::default())
    }

    #[test]
    fn test_extract_zero_is_free() {
        let mut pool = pool_of(&[]);
        assert_eq!(pool.extract(0).unwrap(), 0);
        assert_eq!(pool.buffered_bits(), 0);
        assert_eq!(pool.sets_loaded(), 0);
    }

    #[test]
    fn test_extract_zero_leaves_buffer_unchanged() {
        let mut pool = pool_of(&[&[5]]);
        pool.extract(4).unwrap();
        assert_eq!(pool.extract(0).unwrap(), 0);
        assert_eq!(pool.buffered_bits(), 20);
    }

    #[test]
    fn test_extract_words_in_order() {
        let mut pool = pool_of(&[&[5, 10]]);
        assert_eq!(pool.extract(24).unwrap(), 5);
        assert_eq!(pool.extract(24).unwrap(), 10);
        assert!(pool.extract(1).unwrap_err().is_exhausted());
        assert_eq!(pool.bits_extracted(), 48);
    }

    #[test]
    fn test_extract_spans_sets() {
        let mut pool = pool_of(&[&[0xFF_FFFF], &[0x80_0000]]);
        pool.extract(20).unwrap();
        // 4 remaining ones, then the leading one of the next set
        assert_eq!(pool.extract(5).unwrap(), 0b11111);
        assert_eq!(pool.sets_loaded(), 2);
    }

    #[test]
    fn test_exhaustion_keeps_loaded_bits() {
        let mut pool = pool_of(&[&[5]]);
        assert!(pool.extract(30).unwrap_err().is_exhausted());
        assert_eq!(pool.buffered_bits(), 24);

        pool.source_mut().0.push_back(vec![1]);
        // 000...101 followed by the top six bits of 000...001
        assert_eq!(pool.extract(30).unwrap(), 5 << 6);
    }

    #[test]
    fn test_extract_too_many_bits() {
        let mut pool = pool_of(&[&[1, 2, 3]]);
        assert!(matches!(
            pool.extract(65),
            Err(EngineError::TooManyBits { requested: 65 })
        ));
        assert_eq!(pool.sets_loaded(), 0);
    }

    #[test]
    fn test_extract_full_width() {
        let mut pool = pool_of(&[&[0xFF_FFFF, 0xFF_FFFF, 0xFF_FFFF]]);
        assert_eq!(pool.extract(64).unwrap(), u64::MAX);
    }

    #[test]
    fn test_rejections_counted() {
        // 4-bit draw 1111 is rejected for int_inclusive(0, 7), then 0101 accepted
        let mut pool = pool_of(&[&[0xF5_0000]]);
        assert_eq!(pool.int_inclusive(0, 7).unwrap(), 5);
        assert_eq!(pool.rejections(), 1);
    }

    #[test]
    fn test_configured_retry_limit() {
        let sets: Vec<Vec<u32>> = vec![vec![0xFF_FFFF; 10]];
        let mut pool = BitPool::new(
            MemorySets(sets.into()),
            EngineConfig {
                max_retries: Some(4),
            },
        );
        assert!(matches!(
            pool.range(0, 5, 1),
            Err(EngineError::RetryLimitExceeded { attempts: 5 })
        ));
    }

    #[test]
    fn test_rng_core_words() {
        let mut pool = pool_of(&[&[0xAB_CDEF, 0x12_3456]]);
        assert_eq!(pool.next_u32(), 0xABCD_EF12);

        let mut bytes = [0u8; 2];
        pool.fill_bytes(&mut bytes);
        assert_eq!(bytes, [0x34, 0x56]);
    }

    #[test]
    fn test_try_fill_bytes_reports_exhaustion() {
        let mut pool = pool_of(&[&[0xAB_CDEF]]);
        let mut bytes = [0u8; 4];
        assert!(pool.try_fill_bytes(&mut bytes).is_err());
    }

    #[test]
    #[should_panic(expected = "entropy pool failed")]
    fn test_next_u64_panics_when_exhausted() {
        let mut pool = pool_of(&[]);
        pool.next_u64();
    }
}
