//! Raw bit accumulator for extracted sensor bits.

use crate::storage::{codec, WORD_BITS};

/// Raw bits harvested from camera frames, in extraction order.
///
/// This is the output of the extraction stage and the input to set
/// encoding. Bits are kept one per element so that sets can be cut at
/// arbitrary 24-bit boundaries.
#[derive(Clone, Default)]
pub struct RawBits {
    bits: Vec<bool>,
    /// Frames that contributed bits since the last drain.
    source_frames: u64,
}

impl RawBits {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates raw bits from an existing bit vector.
    pub fn from_bits(bits: Vec<bool>, source_frames: u64) -> Self {
        Self {
            bits,
            source_frames,
        }
    }

    #[inline]
    pub fn push(&mut self, bit: bool) {
        self.bits.push(bit);
    }

    /// Records that another frame contributed bits.
    #[inline]
    pub fn note_frame(&mut self) {
        self.source_frames += 1;
    }

    #[inline]
    pub fn bits(&self) -> &[bool] {
        &self.bits
    }

    /// Buffered bit count.
    #[inline]
    pub fn len(&self) -> usize {
        self.bits.len()
    }

        #[inline]
    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

        #[inline]
    pub fn source_frames(&self) -> u64 {
        self.source_frames
    }

    /// Counts the number of set bits.
    pub fn popcount(&self) -> usize {
        self.bits.iter().filter(|&&b| b).count()
    }

    /// Fraction of ones minus one half.
    ///
    /// Ranges over `[-0.5, 0.5]`; 0.0 means as many ones as zeros.
    pub fn bit_bias(&self) -> f64 {
        if self.is_empty() {
            return 0.0;
        }
        (self.popcount() as f64 / self.len() as f64) - 0.5
    }

    /// Encodes every whole 24-bit chunk into set words and keeps the
    /// partial remainder for the next cut.
    pub fn drain_words(&mut self) -> Vec<u32> {
        let whole = self.bits.len() - self.bits.len() % WORD_BITS;
        let words = codec::encode(&self.bits[..whole]);
        self.bits.drain(..whole);
        self.source_frames = 0;
        words
    }
}

impl std::fmt::Debug for RawBits {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RawBits")
            .field("bits", &self.bits.len())
            .field("source_frames", &self.source_frames)
            .field("bit_bias", &format!("{:.4}", self.bit_bias()))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alternating_bits_unbiased() {
        let bits = RawBits::from_bits((0..800).map(|i| i % 2 == 0).collect(), 1);
        assert!(bits.bit_bias().abs() < 0.001);
    }

    #[test]
    fn test_all_ones_bias() {
        let bits = RawBits::from_bits(vec![true; 800], 1);
        assert!((bits.bit_bias() - 0.5).abs() < 0.001);
    }

    #[test]
    fn test_empty_is_unbiased() {
        assert_eq!(RawBits::new().bit_bias(), 0.0);
    }

    #[test]
    fn test_drain_words_keeps_remainder() {
        let mut bits = RawBits::from_bits(vec![true; 24 * 3 + 5], 2);
        let words = bits.drain_words();

        assert_eq!(words, vec![0xFF_FFFF; 3]);
        assert_eq!(bits.len(), 5);
        assert_eq!(bits.source_frames(), 0);
    }

    #[test]
    fn test_drain_words_drops_zero_chunks() {
        let mut raw = vec![false; 24];
        raw.extend(vec![true; 24]);
        let mut bits = RawBits::from_bits(raw, 1);

        assert_eq!(bits.drain_words().len(), 1);
        assert!(bits.is_empty());
    }
}
