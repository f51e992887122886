//! The self-contained shaped layout: split stream plus
//! frequency-remapped children.
//!
//! Children are not stored as packed ids but as ranks into a stored
//! permutation that lists the ids used by the grammar, most frequent
//! first. Repetitive grammars reference a few rules very often, so the
//! rank stream is dominated by small values and compresses well under
//! gamma; the permutation itself is one fixed-width entry per distinct
//! id. Everything needed to decode is in the file, hence the name.
//!
//! On the wire: split stream, rank stream (two interleaved entries per
//! rule, left then right), then the permutation.

#[cfg(not(test))]
use alloc::vec::Vec;

use super::{
    read_envelope, read_header, unpack, write_envelope, write_header, Alphabet, LenIndex, Slp,
    SlpRules, Symbol, VARIANT_SELF_SHAPED,
};
use crate::binary::ByteReader;
use crate::codes::{FixedCode, IntCode};
use crate::error::{BuildError, LoadError};

/// A grammar with splits under code `S` and child ranks under code `P`.
#[derive(Clone, Debug)]
pub struct SelfShapedSlp<S, P> {
    splits: S,
    refs: P,
    perm: FixedCode,
    alphabet: Vec<u8>,
    start: u32,
    lens: LenIndex,
}

impl<S: IntCode, P: IntCode> SelfShapedSlp<S, P> {
    #[inline]
    fn decode_slot(&self, slot: usize) -> Symbol {
        let rank = self.refs.get(slot) as usize;
        unpack(self.perm.get(rank), &self.alphabet)
    }
}

impl<S: IntCode, P: IntCode> Slp for SelfShapedSlp<S, P> {
    fn from_rules(rules: &SlpRules) -> Result<Self, BuildError> {
        let bodies = rules.rules();
        let alpha = Alphabet::collect(bodies.iter().flat_map(|&(l, r)| [l, r]));
        let id_space = alpha.sigma() as usize + bodies.len();

        let mut counts = Vec::new();
        counts.resize(id_space, 0u64);
        let mut slots = Vec::with_capacity(2 * bodies.len());
        for &(l, r) in bodies {
            for sym in [l, r] {
                let id = alpha.pack(sym);
                counts[id as usize] += 1;
                slots.push(id);
            }
        }
        let mut perm_ids: Vec<u64> = (0..id_space as u64)
            .filter(|&id| counts[id as usize] > 0)
            .collect();
        perm_ids.sort_unstable_by(|&a, &b| {
            counts[b as usize]
                .cmp(&counts[a as usize])
                .then(a.cmp(&b))
        });
        let mut rank_of = Vec::new();
        rank_of.resize(id_space, 0u32);
        for (k, &id) in perm_ids.iter().enumerate() {
            rank_of[id as usize] = k as u32;
        }
        let ref_vals: Vec<u64> = slots.iter().map(|&id| rank_of[id as usize] as u64).collect();
        let refs = P::encode(&ref_vals)?;
        let perm = FixedCode::<0>::encode(&perm_ids)?;

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
            refs,
            perm,
            alphabet: alpha.bytes().to_vec(),
            start: rules.start(),
            lens,
        })
    }

    fn from_bytes(bytes: &[u8]) -> Result<Self, LoadError> {
        let mut r = ByteReader::new(bytes);
        read_envelope(&mut r, VARIANT_SELF_SHAPED)?;
        let header = read_header(&mut r, true)?;
        let splits = S::read_from(&mut r)?;
        let refs = P::read_from(&mut r)?;
        let perm = FixedCode::<0>::read_from(&mut r)?;
        r.finish()?;

        let n = header.n;
        let sigma = header.alphabet.len() as u64;
        let limit = sigma + n as u64;
        let m = perm.len();
        let mut seen = Vec::new();
        seen.resize(limit as usize, false);
        for k in 0..m {
            let id = perm.get(k);
            if id >= limit || seen[id as usize] {
                return Err(LoadError::BadRemap { rank: k as u32, id });
            }
            seen[id as usize] = true;
        }

        if refs.len() != 2 * n as usize {
            return Err(LoadError::Malformed("reference stream length mismatch"));
        }
        for i in 0..n as usize {
            for slot in [2 * i, 2 * i + 1] {
                let rank = refs.get(slot);
                if rank >= m as u64 {
                    return Err(LoadError::SymbolOutOfRange {
                        rule: i as u32,
                        id: rank,
                        limit: m as u64,
                    });
                }
                let id = perm.get(rank as usize);
                if id >= sigma + i as u64 {
                    return Err(LoadError::ForwardRef {
                        rule: i as u32,
                        target: id - sigma,
                    });
                }
            }
        }

        let alphabet = header.alphabet;
        let decode = |slot: usize| unpack(perm.get(refs.get(slot) as usize), &alphabet);
        let lens = LenIndex::build(n, |v| (decode(2 * v as usize), decode(2 * v as usize + 1)))?;

        if splits.len() != n as usize {
            return Err(LoadError::Malformed("split stream length mismatch"));
        }
        for i in 0..n {
            let stored = splits.get(i as usize);
            let derived = match decode(2 * i as usize) {
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
            refs,
            perm,
            alphabet,
            start: header.start,
            lens,
        })
    }

    fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        write_envelope(&mut out, VARIANT_SELF_SHAPED);
        write_header(
            &mut out,
            self.total_len(),
            self.lens.len() as u32,
            Some(self.start),
            &self.alphabet,
        );
        self.splits.write_into(&mut out);
        self.refs.write_into(&mut out);
        self.perm.write_into(&mut out);
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
        let i = v as usize;
        (self.decode_slot(2 * i), self.decode_slot(2 * i + 1))
    }

    #[inline]
    fn var_len(&self, v: u32) -> u64 {
        self.lens.get(v)
    }

    #[inline]
    fn alphabet(&self) -> &[u8] {
        &self.alphabet
    }

    #[inline]
    fn split(&self, v: u32) -> u64 {
        self.splits.get(v as usize)
    }

    fn size_bytes(&self) -> usize {
        self.splits.size_bytes()
            + self.refs.size_bytes()
            + self.perm.size_bytes()
            + self.alphabet.len()
            + self.lens.heap_size()
    }
}
