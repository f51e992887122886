//! The shaped layout: flat child streams plus an explicit split stream.
//!
//! Descent through a rule needs the left child's derived length at
//! every step. The flat layout derives it from the length table after
//! decoding the child; this layout stores it outright, one value per
//! rule, so steering reads the split stream and decodes children only
//! on the straddling path. Splits skew small, a shape gamma and
//! Elias-Fano select are built for.
//!
//! On the wire the split stream precedes the two child streams. A
//! stored split that disagrees with the left child's derived length is
//! a load error, so steering and decoding can never drift apart.

#[cfg(not(test))]
use alloc::vec::Vec;

use super::{
    check_topological, read_envelope, read_header, unpack, write_envelope, write_header, Alphabet,
    LenIndex, Slp, SlpRules, Symbol, VARIANT_SHAPED,
};
use crate::binary::ByteReader;
use crate::codes::IntCode;
use crate::error::{BuildError, LoadError};

/// A grammar with splits under code `S` and child ids under code `P`.
#[derive(Clone, Debug)]
pub struct ShapedSlp<S, P> {
    splits: S,
    left: P,
    right: P,
    alphabet: Vec<u8>,
    start: u32,
    lens: LenIndex,
}

impl<S: IntCode, P: IntCode> Slp for ShapedSlp<S, P> {
    fn from_rules(rules: &SlpRules) -> Result<Self, BuildError> {
        let bodies = rules.rules();
        let alpha = Alphabet::collect(bodies.iter().flat_map(|&(l, r)| [l, r]));
        let mut left_ids = Vec::with_capacity(bodies.len());
        let mut right_ids = Vec::with_capacity(bodies.len());
        for &(l, r) in bodies {
            left_ids.push(alpha.pack(l));
            right_ids.push(alpha.pack(r));
        }
        let left = P::encode(&left_ids)?;
        let right = P::encode(&right_ids)?;
        let lens = LenIndex::build(bodies.len() as u32, |v| rules.rule(v))?;

        let mut split_vals = Vec::with_capacity(bodies.len());
        for &(l, _) in bodies {
            split_vals.push(match l {
                Symbol::Terminal(_) => 1,
                Symbol::Variable(j) => lens.get(j),
            });
        }
        let splits = S::encode(&split_vals)?;
        Ok(Self {
            splits,
            left,
            right,
            alphabet: alpha.bytes().to_vec(),
            start: rules.start(),
            lens,
        })
    }

    fn from_bytes(bytes: &[u8]) -> Result<Self, LoadError> {
        let mut r = ByteReader::new(bytes);
        read_envelope(&mut r, VARIANT_SHAPED)?;
        let header = read_header(&mut r, true)?;
        let splits = S::read_from(&mut r)?;
        let left = P::read_from(&mut r)?;
        let right = P::read_from(&mut r)?;
        r.finish()?;

        let n = header.n;
        check_topological(&left, &right, header.alphabet.len() as u16, n)?;
        if splits.len() != n as usize {
            return Err(LoadError::Malformed("split stream length mismatch"));
        }
        let alphabet = header.alphabet;
        let lens = LenIndex::build(n, |v| {
            (
                unpack(left.get(v as usize), &alphabet),
                unpack(right.get(v as usize), &alphabet),
            )
        })?;
        for i in 0..n {
            let stored = splits.get(i as usize);
            let derived = match unpack(left.get(i as usize), &alphabet) {
                Symbol::Terminal(_) => 1,
                Symbol::Variable(j) => lens.get(j),
            };
            if stored != derived {
                return Err(LoadError::SplitMismatch {
                    rule: i,
                    stored,
                    derived,
                });
            }
        }
        let derived = lens.get(header.start);
        if derived != header.total {
            return Err(LoadError::TotalLenMismatch {
                stored: header.total,
                derived,
            });
        }
        Ok(Self {
            splits,
            left,
            right,
            alphabet,
            start: header.start,
            lens,
        })
    }

    fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        write_envelope(&mut out, VARIANT_SHAPED);
        write_header(
            &mut out,
            self.total_len(),
            self.lens.len() as u32,
            Some(self.start),
            &self.alphabet,
        );
        self.splits.write_into(&mut out);
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

    // Steering reads the stored stream instead of deriving the length.
    #[inline]
    fn split(&self, v: u32) -> u64 {
        self.splits.get(v as usize)
    }

    fn size_bytes(&self) -> usize {
        self.splits.size_bytes()
            + self.left.size_bytes()
            + self.right.size_bytes()
            + self.alphabet.len()
            + self.lens.heap_size()
    }
}
