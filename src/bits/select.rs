//! Sampled select acceleration.
//!
//! Stores the position of every 256th set bit; a query jumps to the
//! nearest sample and scans forward word by word, finishing with a
//! table-driven select inside the final word. Queries within a sample
//! window touch at most 256 bits' worth of words.

#[cfg(not(test))]
use alloc::vec::Vec;

use super::table::select_in_word;

/// Set bits between consecutive samples.
pub const SELECT_SAMPLE_RATE: usize = 256;

/// Select acceleration over an external word buffer.
///
/// Implementations are built once over a bitmap and answer
/// `select1(k)`, the position of the k-th set bit (0-indexed), against
/// the same bitmap. Which implementation backs a coded stream is a
/// space/time trade-off, not a format property: the serialized form
/// never includes the select structure.
pub trait SelectSupport: Sized {
    /// Build over `words`, of which only the first `num_bits` bits are
    /// meaningful. Bits past `num_bits` must be zero.
    fn build(words: &[u64], num_bits: usize) -> Self;

    /// Position of the k-th set bit, or `None` if fewer than `k + 1`
    /// bits are set.
    fn select1(&self, words: &[u64], k: usize) -> Option<usize>;

    /// Heap bytes held by the structure.
    fn size_bytes(&self) -> usize;
}

/// Position-sampled select.
///
/// One `u32` sample per [`SELECT_SAMPLE_RATE`] set bits. The sampled
/// positions cap the bitmap at 2^32 bits, plenty for any coded stream
/// this crate produces.
#[derive(Clone, Debug)]
pub struct SampledSelect {
    /// Entry s = position of the (s * SELECT_SAMPLE_RATE)-th set bit.
    samples: Vec<u32>,
    ones: usize,
}

impl SelectSupport for SampledSelect {
    fn build(words: &[u64], _num_bits: usize) -> Self {
        let mut samples = Vec::new();
        let mut ones = 0usize;
        for (word_idx, &word) in words.iter().enumerate() {
            let mut w = word;
            while w != 0 {
                if ones % SELECT_SAMPLE_RATE == 0 {
                    let bit = w.trailing_zeros() as usize;
                    samples.push((word_idx * 64 + bit) as u32);
                }
                w &= w - 1;
                ones += 1;
            }
        }
        Self { samples, ones }
    }

    #[inline]
    fn select1(&self, words: &[u64], k: usize) -> Option<usize> {
        if k >= self.ones {
            return None;
        }
        let sample_idx = k / SELECT_SAMPLE_RATE;
        let pos = self.samples[sample_idx] as usize;
        let mut remaining = (k - sample_idx * SELECT_SAMPLE_RATE) as u32;

        // The sampled bit itself is the first candidate.
        let mut word_idx = pos / 64;
        let mut word = words[word_idx] & (!0u64 << (pos % 64));
        loop {
            let ones = word.count_ones();
            if remaining < ones {
                return Some(word_idx * 64 + select_in_word(word, remaining) as usize);
            }
            remaining -= ones;
            word_idx += 1;
            word = words[word_idx];
        }
    }

    fn size_bytes(&self) -> usize {
        self.samples.len() * 4
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn naive_select(words: &[u64], k: usize) -> Option<usize> {
        let mut seen = 0usize;
        for (i, &w) in words.iter().enumerate() {
            for bit in 0..64 {
                if (w >> bit) & 1 == 1 {
                    if seen == k {
                        return Some(i * 64 + bit);
                    }
                    seen += 1;
                }
            }
        }
        None
    }

    #[test]
    fn test_empty() {
        let words: Vec<u64> = vec![];
        let sel = SampledSelect::build(&words, 0);
        assert_eq!(sel.select1(&words, 0), None);
    }

    #[test]
    fn test_single_word() {
        let words = vec![0b1010_1010u64];
        let sel = SampledSelect::build(&words, 8);
        assert_eq!(sel.select1(&words, 0), Some(1));
        assert_eq!(sel.select1(&words, 1), Some(3));
        assert_eq!(sel.select1(&words, 2), Some(5));
        assert_eq!(sel.select1(&words, 3), Some(7));
        assert_eq!(sel.select1(&words, 4), None);
    }

    #[test]
    fn test_sparse_across_words() {
        // One bit every 3 words
        let mut words = vec![0u64; 30];
        for i in (0..30).step_by(3) {
            words[i] = 1 << (i % 64);
        }
        let sel = SampledSelect::build(&words, 30 * 64);
        for k in 0..10 {
            assert_eq!(sel.select1(&words, k), naive_select(&words, k));
        }
        assert_eq!(sel.select1(&words, 10), None);
    }

    #[test]
    fn test_crosses_sample_boundaries() {
        let words: Vec<u64> = (0..100u64)
            .map(|i| i.wrapping_mul(0x9E37_79B9_7F4A_7C15) | 1)
            .collect();
        let total: usize = words.iter().map(|w| w.count_ones() as usize).sum();
        assert!(total > 4 * SELECT_SAMPLE_RATE);

        let sel = SampledSelect::build(&words, words.len() * 64);
        for k in 0..total {
            assert_eq!(sel.select1(&words, k), naive_select(&words, k), "k={}", k);
        }
        assert_eq!(sel.select1(&words, total), None);
    }

    #[test]
    fn test_all_ones_many_samples() {
        let words = vec![u64::MAX; 9]; // 576 ones, 3 samples
        let sel = SampledSelect::build(&words, 576);
        for k in [0, 1, 63, 64, 255, 256, 257, 511, 512, 575] {
            assert_eq!(sel.select1(&words, k), Some(k));
        }
        assert_eq!(sel.select1(&words, 576), None);
        assert_eq!(sel.size_bytes(), 3 * 4);
    }
}
