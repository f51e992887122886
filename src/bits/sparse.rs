//! Elias-Fano select acceleration.
//!
//! Re-encodes the positions of the set bits as an Elias-Fano sequence:
//! each position splits into a fixed-width low part, packed contiguously,
//! and a high part stored in unary in a much denser bitmap. A sampled
//! select over the high bitmap then answers `select1` directly, without
//! touching the original bitmap at all.
//!
//! For a marker bitmap with long zero runs this is both smaller and
//! faster to query than scanning, which is exactly the shape of the
//! length-marker vectors variable-length codes produce.

#[cfg(not(test))]
use alloc::vec::Vec;

use super::select::{SampledSelect, SelectSupport};
use super::BitVec;

/// Elias-Fano positions of the set bits, with sampled select on top.
#[derive(Clone, Debug)]
pub struct SparseSelect {
    /// Low `low_width` bits of each set-bit position, packed.
    lows: BitVec,
    low_width: u32,
    /// High parts in unary: bit `(pos >> low_width) + i` set for the
    /// i-th position.
    highs: Vec<u64>,
    high_select: SampledSelect,
    ones: usize,
}

impl SelectSupport for SparseSelect {
    fn build(words: &[u64], num_bits: usize) -> Self {
        let mut positions = Vec::new();
        for (word_idx, &word) in words.iter().enumerate() {
            let mut w = word;
            while w != 0 {
                positions.push(word_idx * 64 + w.trailing_zeros() as usize);
                w &= w - 1;
            }
        }

        let n = positions.len();
        if n == 0 {
            return Self {
                lows: BitVec::new(),
                low_width: 0,
                highs: Vec::new(),
                high_select: SampledSelect::build(&[], 0),
                ones: 0,
            };
        }

        let universe = num_bits.max(1);
        let ratio = (universe / n).max(1) as u64;
        let low_width = 63 - ratio.leading_zeros();

        let mut lows = BitVec::with_capacity(n * low_width as usize);
        for &pos in &positions {
            lows.push_bits(pos as u64, low_width);
        }

        let max_high = positions[n - 1] >> low_width;
        let high_bits = n + max_high + 1;
        let mut highs = Vec::new();
        highs.resize(high_bits.div_ceil(64), 0u64);
        for (i, &pos) in positions.iter().enumerate() {
            let slot = (pos >> low_width) + i;
            highs[slot / 64] |= 1 << (slot % 64);
        }

        let high_select = SampledSelect::build(&highs, high_bits);

        Self {
            lows,
            low_width,
            highs,
            high_select,
            ones: n,
        }
    }

    #[inline]
    fn select1(&self, _words: &[u64], k: usize) -> Option<usize> {
        if k >= self.ones {
            return None;
        }
        let slot = self.high_select.select1(&self.highs, k)?;
        let high = slot - k;
        let low = self.lows.get_bits(k * self.low_width as usize, self.low_width) as usize;
        Some((high << self.low_width) | low)
    }

    fn size_bytes(&self) -> usize {
        self.lows.heap_size() + self.highs.len() * 8 + self.high_select.size_bytes()
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
        let sel = SparseSelect::build(&words, 0);
        assert_eq!(sel.select1(&words, 0), None);
    }

    #[test]
    fn test_all_zero_bitmap() {
        let words = vec![0u64; 10];
        let sel = SparseSelect::build(&words, 640);
        assert_eq!(sel.select1(&words, 0), None);
    }

    #[test]
    fn test_dense() {
        let words = vec![u64::MAX; 5];
        let sel = SparseSelect::build(&words, 320);
        for k in 0..320 {
            assert_eq!(sel.select1(&words, k), Some(k));
        }
        assert_eq!(sel.select1(&words, 320), None);
    }

    #[test]
    fn test_very_sparse() {
        // One bit every ~1000 positions
        let mut bv = BitVec::new();
        let mut expected = Vec::new();
        for i in 0..50usize {
            let gap = 900 + (i * 37) % 200;
            bv.push_bits(0, gap as u32 % 64);
            for _ in 0..gap / 64 {
                bv.push_bits(0, 64);
            }
            expected.push(bv.len());
            bv.push_bit(true);
        }
        let sel = SparseSelect::build(bv.words(), bv.len());
        for (k, &pos) in expected.iter().enumerate() {
            assert_eq!(sel.select1(bv.words(), k), Some(pos), "k={}", k);
        }
        assert_eq!(sel.select1(bv.words(), expected.len()), None);
    }

    #[test]
    fn test_matches_naive_mixed() {
        let words: Vec<u64> = (0..64u64)
            .map(|i| {
                if i % 5 == 0 {
                    0
                } else {
                    i.wrapping_mul(0x2545_F491_4F6C_DD1D)
                }
            })
            .collect();
        let total: usize = words.iter().map(|w| w.count_ones() as usize).sum();

        let sel = SparseSelect::build(&words, words.len() * 64);
        for k in 0..total {
            assert_eq!(sel.select1(&words, k), naive_select(&words, k), "k={}", k);
        }
        assert_eq!(sel.select1(&words, total), None);
    }

    #[test]
    fn test_single_bit_far_out() {
        let mut words = vec![0u64; 100];
        words[99] = 1 << 17;
        let sel = SparseSelect::build(&words, 6400);
        assert_eq!(sel.select1(&words, 0), Some(99 * 64 + 17));
        assert_eq!(sel.select1(&words, 1), None);
    }
}
