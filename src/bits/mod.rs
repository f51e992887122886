//! Bit-level building blocks: bit buffers, rank directories, select
//! structures.
//!
//! # Structure
//!
//! - [`BitVec`] - append-only bit buffer over `u64` words with cross-word
//!   field extraction. The raw material every coded stream is packed into.
//! - [`RankDir`] - two-level rank directory, built over a word buffer.
//! - [`SelectSupport`] - the seam between codes and their select
//!   acceleration, with [`SampledSelect`] (position samples + word scan)
//!   and [`SparseSelect`] (Elias-Fano over the set-bit positions).
//!
//! Rank counts set bits in `[0, i)`; select finds the position of the
//! k-th set bit, 0-indexed. Both structures answer against the word
//! buffer they were built from and are rebuilt at load rather than
//! serialized.

#[cfg(not(test))]
use alloc::vec::Vec;

use crate::binary::{words_to_bytes, ByteReader};
use crate::error::LoadError;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

mod rank;
mod select;
mod sparse;
mod table;

pub use rank::RankDir;
pub use select::{SampledSelect, SelectSupport, SELECT_SAMPLE_RATE};
pub use sparse::SparseSelect;
pub use table::{select_in_byte, select_in_word, SELECT_IN_BYTE_TABLE};

/// Append-only bit buffer backed by `u64` words.
///
/// Bits are numbered from 0; bit `i` lives in word `i / 64` at bit
/// `i % 64`. Unused high bits of the last word are kept zero, so two
/// buffers with the same bits compare equal word for word.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BitVec {
    words: Vec<u64>,
    num_bits: usize,
}

impl BitVec {
    pub fn new() -> Self {
        Self {
            words: Vec::new(),
            num_bits: 0,
        }
    }

    pub fn with_capacity(bits: usize) -> Self {
        Self {
            words: Vec::with_capacity(bits.div_ceil(64)),
            num_bits: 0,
        }
    }

    /// Number of bits in the buffer.
    #[inline]
    pub fn len(&self) -> usize {
        self.num_bits
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.num_bits == 0
    }

    /// The backing words. The last word's unused high bits are zero.
    #[inline]
    pub fn words(&self) -> &[u64] {
        &self.words
    }

    /// Total number of set bits.
    pub fn count_ones(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// Append a single bit.
    #[inline]
    pub fn push_bit(&mut self, bit: bool) {
        self.push_bits(bit as u64, 1);
    }

    /// Append the low `width` bits of `value`, least significant first.
    ///
    /// `width` may be 0 (appends nothing) up to 64. Bits of `value` above
    /// `width` are ignored.
    pub fn push_bits(&mut self, value: u64, width: u32) {
        debug_assert!(width <= 64);
        if width == 0 {
            return;
        }
        let masked = if width == 64 {
            value
        } else {
            value & ((1u64 << width) - 1)
        };
        let off = (self.num_bits % 64) as u32;
        if off == 0 {
            self.words.push(masked);
        } else {
            // Unused high bits of the last word are zero, so OR suffices.
            let last = self.words.len() - 1;
            self.words[last] |= masked << off;
            if off + width > 64 {
                self.words.push(masked >> (64 - off));
            }
        }
        self.num_bits += width as usize;
    }

    /// Read the bit at `pos`.
    #[inline]
    pub fn get_bit(&self, pos: usize) -> bool {
        debug_assert!(pos < self.num_bits);
        (self.words[pos / 64] >> (pos % 64)) & 1 == 1
    }

    /// Read `width` bits starting at `pos`, least significant first.
    ///
    /// `width` may be 0 (returns 0) up to 64. The caller must keep
    /// `pos + width <= len()`.
    #[inline]
    pub fn get_bits(&self, pos: usize, width: u32) -> u64 {
        debug_assert!(width <= 64);
        if width == 0 {
            return 0;
        }
        debug_assert!(pos + width as usize <= self.num_bits);
        let word = pos / 64;
        let off = (pos % 64) as u32;
        let low = self.words[word] >> off;
        let have = 64 - off;
        let val = if have >= width {
            low
        } else {
            low | (self.words[word + 1] << have)
        };
        if width == 64 {
            val
        } else {
            val & ((1u64 << width) - 1)
        }
    }

    /// Heap bytes held by the buffer.
    pub fn heap_size(&self) -> usize {
        self.words.len() * 8
    }

    /// Serialize as a bit count followed by the backing words.
    pub fn write_into(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&(self.num_bits as u64).to_le_bytes());
        out.extend_from_slice(&words_to_bytes(&self.words));
    }

    /// Deserialize a buffer written by [`write_into`](Self::write_into).
    ///
    /// The word count is validated against the bytes actually present
    /// before anything is allocated.
    pub fn read_from(r: &mut ByteReader<'_>) -> Result<Self, LoadError> {
        let num_bits = r.read_u64()?;
        let num_bits = usize::try_from(num_bits)
            .map_err(|_| LoadError::Malformed("bit count exceeds address space"))?;
        let words = r.read_words(num_bits.div_ceil(64))?;
        // Whole-word scans downstream rely on the tail invariant.
        let tail = (num_bits % 64) as u32;
        if tail != 0 {
            if let Some(&last) = words.last() {
                if last >> tail != 0 {
                    return Err(LoadError::Malformed("bit buffer tail bits not zero"));
                }
            }
        }
        Ok(Self { words, num_bits })
    }
}
