//! Compact two-level rank directory.
//!
//! Keeps ~3.5% overhead relative to the bitmap instead of the 50% a naive
//! `Vec<u32>` cumulative popcount costs. Built over an external word
//! buffer and queried against the same buffer, so one directory can sit
//! beside any bit-packed stream without owning it.
//!
//! # Structure
//!
//! - **L1**: Absolute cumulative rank every 128 words (8192 bits).
//!   One `u32` per superblock.
//! - **L2**: Relative cumulative rank every 8 words (512 bits).
//!   One `u16` per block.
//!
//! # Query
//!
//! `rank_at_word(w)` = `l1[w / 128] + l2[w / 8]` plus a popcount over at
//! most 7 words; `rank1(i)` adds a masked popcount for the partial word.

#[cfg(not(test))]
use alloc::vec::Vec;

/// Words per L1 superblock.
const L1_WORDS: usize = 128;

/// Words per L2 block.
const L2_WORDS: usize = 8;

/// Compact two-level rank directory over an external word buffer.
///
/// The `words` passed to queries must be the buffer the directory was
/// built from.
#[derive(Clone, Debug)]
pub struct RankDir {
    /// Absolute cumulative rank at each superblock boundary.
    /// Entry i = popcount of words [0, i * 128).
    l1: Vec<u32>,
    /// Relative cumulative rank at each block boundary within its
    /// superblock.
    l2: Vec<u16>,
    /// Total popcount across all words.
    total: u32,
}

impl RankDir {
    pub fn empty() -> Self {
        Self {
            l1: Vec::new(),
            l2: Vec::new(),
            total: 0,
        }
    }

    /// Build a rank directory from bitmap words.
    pub fn build(words: &[u64]) -> Self {
        if words.is_empty() {
            return Self::empty();
        }

        let num_superblocks = words.len().div_ceil(L1_WORDS);
        let num_blocks = words.len().div_ceil(L2_WORDS);

        let mut l1 = Vec::with_capacity(num_superblocks);
        let mut l2 = Vec::with_capacity(num_blocks);

        let mut absolute_rank: u32 = 0;

        for sb in 0..num_superblocks {
            l1.push(absolute_rank);

            let sb_start = sb * L1_WORDS;
            let sb_end = (sb_start + L1_WORDS).min(words.len());
            let mut relative_rank: u16 = 0;

            let blocks_in_sb = (sb_end - sb_start).div_ceil(L2_WORDS);
            for b in 0..blocks_in_sb {
                l2.push(relative_rank);

                let block_start = sb_start + b * L2_WORDS;
                let block_end = (block_start + L2_WORDS).min(sb_end);
                for &word in &words[block_start..block_end] {
                    let ones = word.count_ones() as u16;
                    relative_rank += ones;
                    absolute_rank += ones as u32;
                }
            }
        }

        Self {
            l1,
            l2,
            total: absolute_rank,
        }
    }

    /// Number of 1-bits in `words[0..word_idx]`.
    ///
    /// Saturates to the total popcount past the end of the buffer.
    #[inline]
    pub fn rank_at_word(&self, words: &[u64], word_idx: usize) -> usize {
        if self.l1.is_empty() {
            return 0;
        }
        if word_idx >= words.len() {
            return self.total as usize;
        }

        let sb_idx = word_idx / L1_WORDS;
        let block_idx = word_idx / L2_WORDS;

        let mut count = self.l1[sb_idx] as usize + self.l2[block_idx] as usize;

        let block_start = block_idx * L2_WORDS;
        for &word in &words[block_start..word_idx] {
            count += word.count_ones() as usize;
        }

        count
    }

    /// Number of 1-bits in bit positions `[0, i)`.
    #[inline]
    pub fn rank1(&self, words: &[u64], i: usize) -> usize {
        let word_idx = i / 64;
        if word_idx >= words.len() {
            return self.total as usize;
        }
        let bit = i % 64;
        let mut count = self.rank_at_word(words, word_idx);
        if bit != 0 {
            let mask = (1u64 << bit) - 1;
            count += (words[word_idx] & mask).count_ones() as usize;
        }
        count
    }

    /// Total number of 1-bits in the buffer.
    #[inline]
    pub fn total_ones(&self) -> usize {
        self.total as usize
    }

    /// Returns the heap memory usage in bytes.
    pub fn heap_size(&self) -> usize {
        self.l1.len() * 4 + self.l2.len() * 2
    }
}
