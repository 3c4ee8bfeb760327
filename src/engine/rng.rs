//! Random-number primitives derived from raw bit extraction.
//!
//! Everything here is built on [`EntropyRng::extract`]. Bounded values
//! use rejection sampling: draw a fixed number of bits, discard draws
//! outside the target range, and draw again. No modulo reduction is
//! ever applied, so no value is favoured over another.

use super::EngineError;

/// Number of significant bits in `x` (0 for 0).
#[inline]
pub fn bit_length(x: u128) -> u32 {
    u128::BITS - x.leading_zeros()
}

/// Floor division on signed integers, rounding towards negative infinity.
fn floor_div(n: i128, d: i128) -> i128 {
    let q = n / d;
    if n % d != 0 && ((n < 0) != (d < 0)) {
        q - 1
    } else {
        q
    }
}

/// A random number generator whose only source of randomness is `extract`.
pub trait EntropyRng {
    /// Removes `k` bits from the underlying supply and returns them as an
    /// unsigned integer, most significant bit first.
    ///
    /// `extract(0)` returns 0 and consumes nothing.
    fn extract(&mut self, k: u32) -> Result<u64, EngineError>;

    /// Maximum rejected draws per sampling call, or `None` for no limit.
    fn retry_limit(&self) -> Option<u32> {
        None
    }

    /// Called once for every rejected draw.
    fn note_rejection(&mut self) {}

    /// Random value from `start, start + step, ...` stopping before `stop`.
    ///
    /// Draws `bit_length(size - 1)` bits per attempt and rejects draws
    /// that are not below `size`.
    fn range(&mut self, start: i64, stop: i64, step: i64) -> Result<i64, EngineError> {
        if step == 0 {
            return Err(EngineError::ZeroStep);
        }
        let size = floor_div(stop as i128 - start as i128, step as i128);
        if size <= 0 {
            return Err(EngineError::EmptyRange {
                low: start,
                high: stop,
            });
        }

        let width = bit_length((size - 1) as u128);
        let draw = draw_until(self, width, |draw| (draw as i128) < size)?;
        Ok((start as i128 + draw as i128 * step as i128) as i64)
    }

    /// Random value in `0..stop`.
    fn below(&mut self, stop: i64) -> Result<i64, EngineError> {
        self.range(0, stop, 1)
    }

    /// Random value in `a..=b`.
    ///
    /// Each attempt draws `bit_length(p)` bits where
    /// `p = 2^(bit_length(b - a + 1) - 1)`, and accepts the raw draw only
    /// if it already lies in `a..=b`. The draw is not offset by `a`, so
    /// bounds that no draw of that width can reach are rejected up front
    /// with [`EngineError::UnreachableRange`]. `a == b` returns `a`
    /// without consuming bits.
    fn int_inclusive(&mut self, a: i64, b: i64) -> Result<i64, EngineError> {
        if a > b {
            return Err(EngineError::EmptyRange { low: a, high: b });
        }
        if a == b {
            return Ok(a);
        }

        let size = (b as i128 - a as i128 + 1) as u128;
        let p = 1u128 << (bit_length(size) - 1);
        let width = bit_length(p);

        let ceiling = 1i128 << width;
        if (b as i128) < 0 || (a as i128) >= ceiling {
            return Err(EngineError::UnreachableRange {
                low: a,
                high: b,
                bits: width,
            });
        }

        let draw = draw_until(self, width, |draw| {
            let draw = draw as i128;
            a as i128 <= draw && draw <= b as i128
        })?;
        Ok(draw as i64)
    }

    /// One element of `seq`, chosen uniformly.
    fn pick<'a, T>(&mut self, seq: &'a [T]) -> Result<&'a T, EngineError> {
        if seq.is_empty() {
            return Err(EngineError::EmptySequence);
        }
        let index = self.int_inclusive(0, seq.len() as i64 - 1)?;
        Ok(&seq[index as usize])
    }

    /// `k` independent picks from `seq`. Elements may repeat.
    fn pick_many<'a, T>(&mut self, seq: &'a [T], k: usize) -> Result<Vec<&'a T>, EngineError> {
        (0..k).map(|_| self.pick(seq)).collect()
    }

    /// `k` elements from distinct positions of `seq`, in their original order.
    ///
    /// Positions are chosen without replacement by a partial Fisher-Yates
    /// pass over the position list, then sorted.
    fn pick_distinct<'a, T>(
        &mut self,
        seq: &'a [T],
        k: usize,
    ) -> Result<Vec<&'a T>, EngineError> {
        if k > seq.len() {
            return Err(EngineError::SampleTooLarge {
                requested: k,
                available: seq.len(),
            });
        }

        let mut positions: Vec<usize> = (0..seq.len()).collect();
        for i in 0..k {
            let j = self.range(i as i64, seq.len() as i64, 1)? as usize;
            positions.swap(i, j);
        }

        let mut chosen = positions[..k].to_vec();
        chosen.sort_unstable();
        Ok(chosen.into_iter().map(|i| &seq[i]).collect())
    }

    /// Shuffles `seq` in place (Fisher-Yates).
    fn shuffle<T>(&mut self, seq: &mut [T]) -> Result<(), EngineError> {
        for i in (1..seq.len()).rev() {
            let j = self.int_inclusive(0, i as i64)? as usize;
            seq.swap(i, j);
        }
        Ok(())
    }

    /// Uniform float in `[0, 1)` with 53 bits of resolution.
    fn uniform01(&mut self) -> Result<f64, EngineError> {
        Ok(self.extract(53)? as f64 / (1u64 << 53) as f64)
    }

    /// Uniform float between `a` and `b`.
    fn uniform(&mut self, a: f64, b: f64) -> Result<f64, EngineError> {
        Ok(a + (b - a) * self.uniform01()?)
    }
}

/// Draws `width` bits until `accept` holds, honouring the retry limit.
fn draw_until<R: EntropyRng + ?Sized>(
    rng: &mut R,
    width: u32,
    mut accept: impl FnMut(u64) -> bool,
) -> Result<u64, EngineError> {
    let limit = rng.retry_limit();
    let mut rejected: u32 = 0;
    loop {
        let draw = rng.extract(width)?;
        if accept(draw) {
            return Ok(draw);
        }
        rng.note_rejection();
        rejected = rejected.saturating_add(1);
        tracing::trace!(draw, width, rejected, "Rejected draw");
        if limit.is_some_and(|limit| rejected > limit) {
            return Err(EngineError::RetryLimitExceeded { attempts: rejected });
        }
    }
}
