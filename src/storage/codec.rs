//! Entropy set encoding.
//!
//! A set is a list of 24-bit words. Each word carries exactly 24 raw
//! bits, most significant bit first. Words equal to zero are never
//! stored, so an all-zero window of the raw stream is dropped when a
//! set is cut. That loss is deliberate and biases the stored stream
//! slightly away from long runs of zeros.

use super::QueueError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Number of raw bits carried by one stored word.
pub const WORD_BITS: usize = 24;

/// Largest value a stored word may take.
pub const WORD_MAX: u32 = (1 << WORD_BITS) - 1;

/// Splits `bits` into 24-bit words, dropping zero words and any
/// trailing partial chunk.
pub fn encode(bits: &[bool]) -> Vec<u32> {
    bits.chunks_exact(WORD_BITS)
        .map(|chunk| chunk.iter().fold(0u32, |acc, &bit| (acc << 1) | bit as u32))
        .filter(|&word| word != 0)
        .collect()
}

/// Expands words back into their zero-padded 24-bit representation.
pub fn decode(words: &[u32]) -> Vec<bool> {
    let mut bits = Vec::with_capacity(words.len() * WORD_BITS);
    decode_into(words, &mut bits);
    bits
}

/// Appends the bits of `words` to `out`.
pub fn decode_into<E: Extend<bool>>(words: &[u32], out: &mut E) {
    out.extend(
        words
            .iter()
            .flat_map(|&word| (0..WORD_BITS).rev().map(move |shift| (word >> shift) & 1 == 1)),
    );
}

/// On-disk record of one entropy set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EntropySet {
    #[serde(rename = "integerList")]
    pub integer_list: Vec<u32>,
}

impl EntropySet {
    pub fn new(integer_list: Vec<u32>) -> Self {
        Self { integer_list }
    }

    /// Parses and validates a set read from `path`.
    pub fn from_json(path: &Path, bytes: &[u8]) -> Result<Self, QueueError> {
        let set: EntropySet =
            serde_json::from_slice(bytes).map_err(|e| QueueError::malformed(path, e))?;
        set.validate()
            .map_err(|reason| QueueError::malformed(path, reason))?;
        Ok(set)
    }

    /// Checks that every word is a nonzero 24-bit value.
    pub fn validate(&self) -> Result<(), String> {
        match self
            .integer_list
            .iter()
            .position(|&word| word == 0 || word > WORD_MAX)
        {
            Some(index) => Err(format!(
                "word {} at index {} is outside 1..={}",
                self.integer_list[index], index, WORD_MAX
            )),
            None => Ok(()),
        }
    }

    /// Number of raw bits this set carries.
    pub fn bit_count(&self) -> usize {
        self.integer_list.len() * WORD_BITS
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn bits_of(s: &str) -> Vec<bool> {
        s.chars().map(|c| c == '1').collect()
    }

    #[test]
    fn test_encode_msb_first() {
        let mut bits = vec![false; 21];
        bits.extend(bits_of("101"));
        assert_eq!(encode(&bits), vec![5]);
    }

    #[test]
    fn test_encode_drops_zero_words_and_partial_tail() {
        let mut bits = vec![false; 24];
        bits.extend(vec![true; 24]);
        bits.extend(vec![true; 10]);
        assert_eq!(encode(&bits), vec![WORD_MAX]);
    }

    #[test]
    fn test_decode_pads_to_word_width() {
        let bits = decode(&[5, 10]);
        assert_eq!(bits.len(), 48);
        let mut expected = vec![false; 21];
        expected.extend(bits_of("101"));
        expected.extend(vec![false; 20]);
        expected.extend(bits_of("1010"));
        assert_eq!(bits, expected);
    }

    #[test]
    fn test_set_json_field_name() {
        let json = serde_json::to_string(&EntropySet::new(vec![5, 10])).unwrap();
        assert_eq!(json, r#"{"integerList":[5,10]}"#);
    }

    #[test]
    fn test_zero_word_is_malformed() {
        let result = EntropySet::from_json(Path::new("x.json"), br#"{"integerList":[3,0]}"#);
        assert!(matches!(result, Err(QueueError::MalformedSet { .. })));
    }

    #[test]
    fn test_oversized_word_is_malformed() {
        let result =
            EntropySet::from_json(Path::new("x.json"), br#"{"integerList":[16777216]}"#);
        assert!(matches!(result, Err(QueueError::MalformedSet { .. })));
    }

    #[test]
    fn test_wrong_schema_is_malformed() {
        for body in [&br#"{"ints":[1]}"#[..], b"not json", br#"{"integerList":[-1]}"#] {
            let result = EntropySet::from_json(Path::new("x.json"), body);
            assert!(matches!(result, Err(QueueError::MalformedSet { .. })));
        }
    }

    proptest! {
        #[test]
        fn prop_decode_encode_removes_only_zero_windows(bits in proptest::collection::vec(any::<bool>(), 0..400)) {
            let expected: Vec<bool> = bits
                .chunks_exact(WORD_BITS)
                .filter(|chunk| chunk.iter().any(|&b| b))
                .flatten()
                .copied()
                .collect();
            prop_assert_eq!(decode(&encode(&bits)), expected);
        }
    }
}
