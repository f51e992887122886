//! Direct-access Elias gamma code.

#[cfg(not(test))]
use alloc::vec::Vec;

use super::{bit_len, read_tag, IntCode};
use crate::binary::ByteReader;
use crate::bits::{BitVec, SelectSupport};
use crate::error::{BuildError, LoadError};

/// Elias gamma over `v + 1` with select-backed random access.
///
/// Value `v` is stored as `u = v + 1`: the `bit_len(u) - 1` low bits of
/// `u` go to a contiguous remainder stream, and a marker vector receives
/// a 1 followed by that many 0s. A final sentinel 1 closes the vector,
/// so `n` values produce `n + 1` ones. `get(i)` selects the i-th and
/// (i+1)-th ones; the gap between them is the remainder width and the
/// zeros before the i-th one count the remainder bits already consumed.
///
/// `u64::MAX` has no `v + 1` and is rejected at encode time. The select
/// structure `S` is rebuilt at load and never serialized, so the same
/// stream loads under any [`SelectSupport`].
#[derive(Clone, Debug)]
pub struct GammaCode<S> {
    len: usize,
    markers: BitVec,
    remainder: BitVec,
    select: S,
}

impl<S: SelectSupport> GammaCode<S> {
    /// Position of the k-th marker one.
    #[inline]
    fn marker_pos(&self, k: usize) -> usize {
        match self.select.select1(self.markers.words(), k) {
            Some(p) => p,
            // The marker vector always carries len + 1 ones.
            None => unreachable!("gamma marker vector lost its sentinel"),
        }
    }
}

impl<S: SelectSupport> IntCode for GammaCode<S> {
    const TAG: u8 = 3;
    const NAME: &'static str = "gamma";

    fn encode(values: &[u64]) -> Result<Self, BuildError> {
        let mut markers = BitVec::with_capacity(values.len() * 2 + 1);
        let mut remainder = BitVec::new();
        for &v in values {
            if v == u64::MAX {
                return Err(BuildError::ValueUnencodable { value: v });
            }
            let u = v + 1;
            let r = bit_len(u) - 1;
            markers.push_bit(true);
            markers.push_bits(0, r);
            remainder.push_bits(u, r);
        }
        markers.push_bit(true);

        let select = S::build(markers.words(), markers.len());
        Ok(Self {
            len: values.len(),
            markers,
            remainder,
            select,
        })
    }

    #[inline]
    fn get(&self, i: usize) -> u64 {
        assert!(i < self.len, "index {} out of range for {} values", i, self.len);
        let p0 = self.marker_pos(i);
        let p1 = self.marker_pos(i + 1);
        let r = (p1 - p0 - 1) as u32;
        let consumed = p0 - i;
        let u = (1u64 << r) | self.remainder.get_bits(consumed, r);
        u - 1
    }

    #[inline]
    fn len(&self) -> usize {
        self.len
    }

    fn size_bytes(&self) -> usize {
        self.markers.heap_size() + self.remainder.heap_size() + self.select.size_bytes()
    }

    fn write_into(&self, out: &mut Vec<u8>) {
        out.push(Self::TAG);
        out.extend_from_slice(&(self.len as u64).to_le_bytes());
        self.markers.write_into(out);
        self.remainder.write_into(out);
    }

    fn read_from(r: &mut ByteReader<'_>) -> Result<Self, LoadError> {
        read_tag::<Self>(r)?;
        let len = r.read_u64()?;
        let len = usize::try_from(len)
            .map_err(|_| LoadError::Malformed("value count exceeds address space"))?;
        let want_ones = len
            .checked_add(1)
            .ok_or(LoadError::Malformed("value count exceeds address space"))?;

        let markers = BitVec::read_from(r)?;
        let remainder = BitVec::read_from(r)?;

        // One pass over the marker bits: count the ones, bound every
        // zero run at 63 (a wider gap cannot be a u64 remainder), and
        // reject runs before the first or after the last one.
        let mut ones = 0usize;
        let mut gap = 0usize;
        for pos in 0..markers.len() {
            if markers.get_bit(pos) {
                if ones == 0 {
                    if gap > 0 {
                        return Err(LoadError::Malformed("gamma stream starts with a zero run"));
                    }
                } else if gap > 63 {
                    return Err(LoadError::Malformed("gamma run exceeds 63 bits"));
                }
                ones += 1;
                gap = 0;
            } else {
                gap += 1;
            }
        }
        if gap > 0 {
            return Err(LoadError::Malformed("gamma stream ends with a zero run"));
        }
        if ones != want_ones {
            return Err(LoadError::Malformed("gamma marker count mismatch"));
        }
        let zeros = markers.len() - ones;
        if zeros != remainder.len() {
            return Err(LoadError::Malformed("gamma remainder length mismatch"));
        }

        let select = S::build(markers.words(), markers.len());
        Ok(Self {
            len,
            markers,
            remainder,
            select,
        })
    }
}
