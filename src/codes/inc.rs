//! Incremental-bit-length integer code.

#[cfg(not(test))]
use alloc::vec::Vec;

use super::{bit_len, read_tag, IntCode};
use crate::binary::ByteReader;
use crate::bits::{BitVec, RankDir};
use crate::error::{BuildError, LoadError};

/// Widths that only ever grow along the sequence.
///
/// The sequence is cut into buckets: a value wider than the current
/// bucket opens a new one at its own bit length, a narrower value stays
/// put. A side bitmap marks bucket starts; `get` ranks it to find the
/// bucket, then extracts at that bucket's fixed width. Since widths
/// strictly increase and never pass 64, there are at most 65 buckets.
///
/// Post-order rule streams fit this shape well: references are mostly
/// recent, so packed ids grow roughly with position.
#[derive(Clone, Debug)]
pub struct IncCode {
    len: usize,
    /// Strictly increasing bucket widths.
    widths: Vec<u8>,
    /// Bit i set iff value i opens a bucket.
    starts: BitVec,
    rank: RankDir,
    /// First value index of each bucket.
    base: Vec<u64>,
    /// Payload bit offset of each bucket.
    offsets: Vec<u64>,
    payload: BitVec,
}

impl IntCode for IncCode {
    const TAG: u8 = 2;
    const NAME: &'static str = "inc";

    fn encode(values: &[u64]) -> Result<Self, BuildError> {
        let mut widths: Vec<u8> = Vec::new();
        let mut starts = BitVec::with_capacity(values.len());
        let mut payload = BitVec::new();
        let mut base = Vec::new();
        let mut offsets = Vec::new();
        let mut cur_width: u32 = 0;

        for (i, &v) in values.iter().enumerate() {
            let need = bit_len(v);
            let opens = i == 0 || need > cur_width;
            if opens {
                cur_width = need;
                widths.push(need as u8);
                base.push(i as u64);
                offsets.push(payload.len() as u64);
            }
            starts.push_bit(opens);
            payload.push_bits(v, cur_width);
        }

        let rank = RankDir::build(starts.words());
        Ok(Self {
            len: values.len(),
            widths,
            starts,
            rank,
            base,
            offsets,
            payload,
        })
    }

    #[inline]
    fn get(&self, i: usize) -> u64 {
        assert!(i < self.len, "index {} out of range for {} values", i, self.len);
        let bucket = self.rank.rank1(self.starts.words(), i + 1) - 1;
        let width = self.widths[bucket] as u32;
        let pos = self.offsets[bucket] + (i as u64 - self.base[bucket]) * width as u64;
        self.payload.get_bits(pos as usize, width)
    }

    #[inline]
    fn len(&self) -> usize {
        self.len
    }

    fn size_bytes(&self) -> usize {
        self.widths.len()
            + self.starts.heap_size()
            + self.rank.heap_size()
            + self.base.len() * 8
            + self.offsets.len() * 8
            + self.payload.heap_size()
    }

    fn write_into(&self, out: &mut Vec<u8>) {
        out.push(Self::TAG);
        out.extend_from_slice(&(self.len as u64).to_le_bytes());
        out.push(self.widths.len() as u8);
        out.extend_from_slice(&self.widths);
        self.starts.write_into(out);
        self.payload.write_into(out);
    }

    fn read_from(r: &mut ByteReader<'_>) -> Result<Self, LoadError> {
        read_tag::<Self>(r)?;
        let len = r.read_u64()?;
        let len = usize::try_from(len)
            .map_err(|_| LoadError::Malformed("value count exceeds address space"))?;
        let num_buckets = r.read_u8()? as usize;
        let widths = r.take(num_buckets)?.to_vec();
        for pair in widths.windows(2) {
            if pair[0] >= pair[1] {
                return Err(LoadError::Malformed("bucket widths not strictly increasing"));
            }
        }
        if widths.last().copied().unwrap_or(0) > 64 {
            return Err(LoadError::Malformed("code width exceeds 64 bits"));
        }
        if (len == 0) != widths.is_empty() {
            return Err(LoadError::Malformed("bucket count mismatch"));
        }

        let starts = BitVec::read_from(r)?;
        if starts.len() != len {
            return Err(LoadError::Malformed("bucket bitmap length mismatch"));
        }
        let payload = BitVec::read_from(r)?;

        // Rebuild the bucket tables while checking that the bitmap and
        // the width list describe the same cut of the payload.
        let mut base = Vec::with_capacity(widths.len());
        let mut offsets = Vec::with_capacity(widths.len());
        let mut payload_bits: u64 = 0;
        let mut cur: Option<usize> = None;
        for i in 0..len {
            if starts.get_bit(i) {
                let next = base.len();
                if next == widths.len() {
                    return Err(LoadError::Malformed("bucket count mismatch"));
                }
                base.push(i as u64);
                offsets.push(payload_bits);
                cur = Some(next);
            }
            let bucket = cur.ok_or(LoadError::Malformed("first value opens no bucket"))?;
            payload_bits += widths[bucket] as u64;
        }
        if base.len() != widths.len() {
            return Err(LoadError::Malformed("bucket count mismatch"));
        }
        if payload_bits != payload.len() as u64 {
            return Err(LoadError::Malformed("payload length mismatch"));
        }

        let rank = RankDir::build(starts.words());
        Ok(Self {
            len,
            widths,
            starts,
            rank,
            base,
            offsets,
            payload,
        })
    }
}
