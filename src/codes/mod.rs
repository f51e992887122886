//! Succinct integer codes.
//!
//! Every rule stream in a grammar store is a sequence of unsigned
//! integers packed by one of these codes. They share one contract,
//! [`IntCode`]: encode a slice, answer positional `get` queries, and
//! serialize to the crate's little-endian layout.
//!
//! - [`FixedCode`] - every value gets the same width. `FixedCode<0>`
//!   picks the width of the largest value; `FixedCode<W>` pins it and
//!   rejects values that do not fit.
//! - [`IncCode`] - widths only ever grow along the sequence, so a value
//!   is found by ranking a bucket-start bitmap and extracting at a fixed
//!   width within its bucket. Suits streams that trend upward, like
//!   post-order rule bodies.
//! - [`GammaCode`] - Elias gamma with a select-backed marker vector for
//!   direct access. Suits skewed streams where most values are small.
//!
//! Serialized streams begin with a one-byte code tag so that a file
//! packed with one code cannot be silently misread by another.

#[cfg(not(test))]
use alloc::vec::Vec;

use crate::binary::ByteReader;
use crate::error::{BuildError, LoadError};

mod fixed;
mod gamma;
mod inc;

pub use fixed::FixedCode;
pub use gamma::GammaCode;
pub use inc::IncCode;

/// A positionally indexed sequence of `u64` values in compressed form.
pub trait IntCode: Sized {
    /// Stream tag distinguishing this code in serialized form.
    const TAG: u8;
    /// Human-readable code name for diagnostics.
    const NAME: &'static str;

    /// Pack a value sequence.
    fn encode(values: &[u64]) -> Result<Self, BuildError>;

    /// The value at index `i`.
    ///
    /// Panics if `i >= len()`, like slice indexing.
    fn get(&self, i: usize) -> u64;

    /// Number of values in the sequence.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Heap bytes held by the structure, including rebuilt accelerators.
    fn size_bytes(&self) -> usize;

    /// Append the serialized stream, starting with the code tag.
    fn write_into(&self, out: &mut Vec<u8>);

    /// Decode a stream written by [`write_into`](Self::write_into).
    fn read_from(r: &mut ByteReader<'_>) -> Result<Self, LoadError>;
}

/// Check the leading stream tag against the expected code.
pub(crate) fn read_tag<C: IntCode>(r: &mut ByteReader<'_>) -> Result<(), LoadError> {
    let tag = r.read_u8()?;
    if tag != C::TAG {
        return Err(LoadError::CodeMismatch {
            expected: C::NAME,
            found: tag,
        });
    }
    Ok(())
}

/// Bits needed to represent `v`; 0 for `v == 0`.
#[inline]
pub(crate) fn bit_len(v: u64) -> u32 {
    64 - v.leading_zeros()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bit_len() {
        assert_eq!(bit_len(0), 0);
        assert_eq!(bit_len(1), 1);
        assert_eq!(bit_len(2), 2);
        assert_eq!(bit_len(3), 2);
        assert_eq!(bit_len(4), 3);
        assert_eq!(bit_len(u64::MAX), 64);
        assert_eq!(bit_len(1 << 63), 64);
        assert_eq!(bit_len((1 << 63) - 1), 63);
    }
}
