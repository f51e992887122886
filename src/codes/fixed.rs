//! Fixed-width integer code.

#[cfg(not(test))]
use alloc::vec::Vec;

use super::{bit_len, read_tag, IntCode};
use crate::binary::ByteReader;
use crate::bits::BitVec;
use crate::error::{BuildError, LoadError};

/// Every value packed at the same bit width.
///
/// `W = 0` (the default) sizes the width to the largest encoded value.
/// `W > 0` pins the width at compile time; encoding a value that does
/// not fit is a [`BuildError::ValueTooWide`], never a silent truncation.
/// Streams written with a pinned width refuse to load under a different
/// pin.
#[derive(Clone, Debug)]
pub struct FixedCode<const W: u8 = 0> {
    width: u32,
    len: usize,
    bits: BitVec,
}

impl<const W: u8> FixedCode<W> {
    /// Width in use for this sequence.
    pub fn width(&self) -> u32 {
        self.width
    }
}

impl<const W: u8> IntCode for FixedCode<W> {
    const TAG: u8 = 1;
    const NAME: &'static str = "fixed";

    fn encode(values: &[u64]) -> Result<Self, BuildError> {
        debug_assert!(W <= 64);
        let width = if W > 0 {
            if W < 64 {
                for &v in values {
                    if v >> W != 0 {
                        return Err(BuildError::ValueTooWide { value: v, width: W });
                    }
                }
            }
            W as u32
        } else {
            values.iter().map(|&v| bit_len(v)).max().unwrap_or(0)
        };

        let mut bits = BitVec::with_capacity(values.len() * width as usize);
        for &v in values {
            bits.push_bits(v, width);
        }
        Ok(Self {
            width,
            len: values.len(),
            bits,
        })
    }

    #[inline]
    fn get(&self, i: usize) -> u64 {
        assert!(i < self.len, "index {} out of range for {} values", i, self.len);
        self.bits.get_bits(i * self.width as usize, self.width)
    }

    #[inline]
    fn len(&self) -> usize {
        self.len
    }

    fn size_bytes(&self) -> usize {
        self.bits.heap_size()
    }

    fn write_into(&self, out: &mut Vec<u8>) {
        out.push(Self::TAG);
        out.extend_from_slice(&(self.len as u64).to_le_bytes());
        out.push(self.width as u8);
        self.bits.write_into(out);
    }

    fn read_from(r: &mut ByteReader<'_>) -> Result<Self, LoadError> {
        read_tag::<Self>(r)?;
        let len = r.read_u64()?;
        let len = usize::try_from(len)
            .map_err(|_| LoadError::Malformed("value count exceeds address space"))?;
        let width = r.read_u8()?;
        if width > 64 {
            return Err(LoadError::Malformed("code width exceeds 64 bits"));
        }
        if W > 0 && width != W {
            return Err(LoadError::Malformed("pinned width does not match stream"));
        }
        let bits = BitVec::read_from(r)?;
        if (len as u128) * (width as u128) != bits.len() as u128 {
            return Err(LoadError::Malformed("fixed stream length mismatch"));
        }
        Ok(Self {
            width: width as u32,
            len,
            bits,
        })
    }
}
