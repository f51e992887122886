//! The flat layout: rule bodies as two parallel absolute-id streams.
//!
//! Rule `i`'s children sit at position `i` of the left and right
//! streams, packed over the compacted alphabet. Queries are two code
//! reads, no rank or select involved. This is the largest layout and
//! the baseline the others are measured against.

#[cfg(not(test))]
use alloc::vec::Vec;

use super::{
    check_topological, read_envelope, read_header, unpack, write_envelope, write_header, Alphabet,
    LenIndex, Slp, SlpRules, Symbol, VARIANT_FLAT,
};
use crate::binary::ByteReader;
use crate::codes::IntCode;
use crate::error::{BuildError, LoadError};

/// A grammar stored as parallel child-id streams under code `C`.
#[derive(Clone, Debug)]
pub struct FlatSlp<C> {
    left: C,
    right: C,
    alphabet: Vec<u8>,
    start: u32,
    lens: LenIndex,
}

impl<C: IntCode> Slp for FlatSlp<C> {
    fn from_rules(rules: &SlpRules) -> Result<Self, BuildError> {
        let bodies = rules.rules();
        let alpha = Alphabet::collect(bodies.iter().flat_map(|&(l, r)| [l, r]));
        let mut left_ids = Vec::with_capacity(bodies.len());
        let mut right_ids = Vec::with_capacity(bodies.len());
        for &(l, r) in bodies {
            left_ids.push(alpha.pack(l));
            right_ids.push(alpha.pack(r));
        }
        let left = C::encode(&left_ids)?;
        let right = C::encode(&right_ids)?;
        let lens = LenIndex::build(bodies.len() as u32, |v| rules.rule(v))?;
        Ok(Self {
            left,
            right,
            alphabet: alpha.bytes().to_vec(),
            start: rules.start(),
            lens,
        })
    }

    fn from_bytes(bytes: &[u8]) -> Result<Self, LoadError> {
        let mut r = ByteReader::new(bytes);
        read_envelope(&mut r, VARIANT_FLAT)?;
        let header = read_header(&mut r, true)?;
        let left = C::read_from(&mut r)?;
        let right = C::read_from(&mut r)?;
        r.finish()?;

        check_topological(&left, &right, header.alphabet.len() as u16, header.n)?;
        let alphabet = header.alphabet;
        let lens = LenIndex::build(header.n, |v| {
            (
                unpack(left.get(v as usize), &alphabet),
                unpack(right.get(v as usize), &alphabet),
            )
        })?;
        let derived = lens.get(header.start);
        if derived != header.total {
            return Err(LoadError::TotalLenMismatch {
                stored: header.total,
                derived,
            });
        }
        Ok(Self {
            left,
            right,
            alphabet,
            start: header.start,
            lens,
        })
    }

    fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        write_envelope(&mut out, VARIANT_FLAT);
        write_header(
            &mut out,
            self.total_len(),
            self.lens.len() as u32,
            Some(self.start),
            &self.alphabet,
        );
        self.left.write_into(&mut out);
        self.right.write_into(&mut out);
        out
    }

    #[inline]
    fn num_rules(&self) -> usize {
        self.lens.len()
    }

    #[inline]
    fn start_symbol(&self) -> Symbol {
        Symbol::Variable(self.start)
    }

    #[inline]
    fn total_len(&self) -> u64 {
        self.lens.get(self.start)
    }

    #[inline]
    fn rule(&self, v: u32) -> (Symbol, Symbol) {
        (
            unpack(self.left.get(v as usize), &self.alphabet),
            unpack(self.right.get(v as usize), &self.alphabet),
        )
    }

    #[inline]
    fn var_len(&self, v: u32) -> u64 {
        self.lens.get(v)
    }

    #[inline]
    fn alphabet(&self) -> &[u8] {
        &self.alphabet
    }

    fn size_bytes(&self) -> usize {
        self.left.size_bytes()
            + self.right.size_bytes()
            + self.alphabet.len()
            + self.lens.heap_size()
    }
}
