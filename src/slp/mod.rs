//! Grammar stores: straight-line programs with random-access expansion.
//!
//! A straight-line program (SLP) derives one string from a table of
//! binary rules. Variables are numbered densely; rule `i` may only
//! reference variables below `i`, so the table is its own topological
//! order and the reference graph is a DAG. The start variable derives
//! the whole string.
//!
//! # Structure
//!
//! - [`SlpRules`] - the plain, validated rule table and the `SLPR`
//!   interchange format upstream builders hand us.
//! - [`Slp`] - the store trait: load/save, rule and length queries, and
//!   the provided expansion methods.
//! - Four physical layouts with identical semantics:
//!   [`FlatSlp`], [`PostOrderSlp`], [`ShapedSlp`], [`SelfShapedSlp`].
//! - [`LenIndex`] - derived length of every variable, rebuilt at load.
//!
//! # Query
//!
//! `expand_substring(start, len)` materializes `len` bytes from offset
//! `start` in time proportional to `len` plus the grammar depth, without
//! touching the rest of the derivation. `expand_all` walks the whole
//! tree. Out-of-range requests fail with [`RangeError`]; nothing is
//! silently truncated.
//!
//! Stores are immutable after construction and shareable across threads.

#[cfg(not(test))]
use alloc::vec::Vec;

use core::fmt;

use crate::binary::ByteReader;
use crate::bits::{SampledSelect, SparseSelect};
use crate::codes::{FixedCode, GammaCode, IncCode, IntCode};
use crate::error::{BuildError, LoadError, RangeError};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

mod expand;
mod flat;
mod lens;
mod post_order;
mod rules;
mod self_shaped;
mod shaped;

pub use flat::FlatSlp;
pub use lens::LenIndex;
pub use post_order::PostOrderSlp;
pub use rules::SlpRules;
pub use self_shaped::SelfShapedSlp;
pub use shaped::ShapedSlp;

// =============================================================================
// Curated instantiations
// =============================================================================

/// Flat layout, width sized to the largest id.
pub type FlatFixedSlp = FlatSlp<FixedCode>;
/// Flat layout pinned at 32-bit ids.
pub type FlatFixed32Slp = FlatSlp<FixedCode<32>>;
/// Flat layout under gamma ids.
pub type FlatGammaSlp = FlatSlp<GammaCode<SampledSelect>>;
/// Post-order layout under gamma deltas.
pub type PoGammaSlp = PostOrderSlp<GammaCode<SampledSelect>>;
/// Post-order layout under incremental-width ids.
pub type PoIncSlp = PostOrderSlp<IncCode>;
/// Shape-separated, Elias-Fano splits, sampled-select payload.
pub type ShapedSdMclSlp = ShapedSlp<GammaCode<SparseSelect>, GammaCode<SampledSelect>>;
/// Shape-separated, Elias-Fano splits and payload.
pub type ShapedSdSdSlp = ShapedSlp<GammaCode<SparseSelect>, GammaCode<SparseSelect>>;
/// Self-contained shape-separated, sampled-select payload.
pub type SelfSdMclSlp = SelfShapedSlp<GammaCode<SparseSelect>, GammaCode<SampledSelect>>;
/// Self-contained shape-separated, Elias-Fano payload.
pub type SelfSdSdSlp = SelfShapedSlp<GammaCode<SparseSelect>, GammaCode<SparseSelect>>;

// =============================================================================
// Symbols
// =============================================================================

/// One side of a rule body: a literal byte or a variable reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Symbol {
    /// A literal byte of the derived string.
    Terminal(u8),
    /// A reference to the rule with this index.
    Variable(u32),
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::Terminal(b) => {
                if (0x20..0x7F).contains(&b) {
                    write!(f, "'{}'", b as char)
                } else {
                    write!(f, "0x{:02x}", b)
                }
            }
            Self::Variable(v) => write!(f, "R{}", v),
        }
    }
}

// =============================================================================
// The store trait
// =============================================================================

/// A loaded grammar store.
///
/// Implementations differ only in physical layout; `rule`, `var_len`
/// and the expansion methods behave identically across them. Stores are
/// read-only after construction.
pub trait Slp: Sized {
    /// Pack a validated rule table into this layout.
    fn from_rules(rules: &SlpRules) -> Result<Self, BuildError>;

    /// Load a store serialized by [`to_bytes`](Self::to_bytes).
    ///
    /// Malformed input fails with [`LoadError`]; a partially decoded
    /// store is never returned.
    fn from_bytes(bytes: &[u8]) -> Result<Self, LoadError>;

    /// Serialize the store. The result round-trips exactly.
    fn to_bytes(&self) -> Vec<u8>;

    /// Number of rules in this layout.
    fn num_rules(&self) -> usize;

    /// The symbol whose derivation is the whole string.
    fn start_symbol(&self) -> Symbol;

    /// Length of the derived string.
    fn total_len(&self) -> u64;

    /// The body of rule `v`.
    ///
    /// Panics if `v >= num_rules()`, like slice indexing.
    fn rule(&self, v: u32) -> (Symbol, Symbol);

    /// Derived length of variable `v`.
    ///
    /// Panics if `v >= num_rules()`, like slice indexing.
    fn var_len(&self, v: u32) -> u64;

    /// The sorted distinct terminal bytes of the grammar.
    fn alphabet(&self) -> &[u8];

    /// Heap bytes held by the store.
    fn size_bytes(&self) -> usize;

    /// Derived length of the left child of rule `v`.
    ///
    /// The expander steers by this value alone; layouts that store the
    /// split explicitly override the derivation-based default.
    #[inline]
    fn split(&self, v: u32) -> u64 {
        let (left, _) = self.rule(v);
        self.sym_len(left)
    }

    /// Derived length of a symbol: 1 for terminals.
    #[inline]
    fn sym_len(&self, sym: Symbol) -> u64 {
        match sym {
            Symbol::Terminal(_) => 1,
            Symbol::Variable(v) => self.var_len(v),
        }
    }

    /// Materialize the whole derived string.
    fn expand_all(&self) -> Vec<u8> {
        let mut out = Vec::new();
        expand::all_into(self, &mut out);
        out
    }

    /// Materialize `len` bytes starting at offset `start`.
    fn expand_substring(&self, start: u64, len: u64) -> Result<Vec<u8>, RangeError> {
        let mut out = Vec::new();
        self.expand_into(start, len, &mut out)?;
        Ok(out)
    }

    /// Like [`expand_substring`](Self::expand_substring), appending into
    /// a caller-owned buffer.
    fn expand_into(&self, start: u64, len: u64, out: &mut Vec<u8>) -> Result<(), RangeError> {
        expand::substring_into(self, start, len, out)
    }
}

// =============================================================================
// Wire envelope
// =============================================================================

pub(crate) const MAGIC: [u8; 4] = *b"SLPA";
pub(crate) const FORMAT_VERSION: u8 = 1;

pub(crate) const VARIANT_FLAT: u8 = 1;
pub(crate) const VARIANT_POST_ORDER: u8 = 2;
pub(crate) const VARIANT_SHAPED: u8 = 3;
pub(crate) const VARIANT_SELF_SHAPED: u8 = 4;

pub(crate) fn write_envelope(out: &mut Vec<u8>, variant: u8) {
    out.extend_from_slice(&MAGIC);
    out.push(FORMAT_VERSION);
    out.push(variant);
    out.extend_from_slice(&0u16.to_le_bytes());
}

pub(crate) fn read_envelope(r: &mut ByteReader<'_>, variant: u8) -> Result<(), LoadError> {
    let magic = r.take(4)?;
    let found = [magic[0], magic[1], magic[2], magic[3]];
    if found != MAGIC {
        return Err(LoadError::BadMagic { found });
    }
    let version = r.read_u8()?;
    if version != FORMAT_VERSION {
        return Err(LoadError::UnsupportedVersion { found: version });
    }
    let found = r.read_u8()?;
    if found != variant {
        return Err(LoadError::VariantMismatch {
            expected: variant,
            found,
        });
    }
    let flags = r.read_u16()?;
    if flags != 0 {
        return Err(LoadError::BadFlags { found: flags });
    }
    Ok(())
}

/// Fields every layout stores right after the envelope. Post-order
/// layouts leave the start implicit, so `start` is optional on the wire.
pub(crate) struct Header {
    pub total: u64,
    pub n: u32,
    pub start: u32,
    pub alphabet: Vec<u8>,
}

pub(crate) fn write_header(out: &mut Vec<u8>, total: u64, n: u32, start: Option<u32>, alphabet: &[u8]) {
    out.extend_from_slice(&total.to_le_bytes());
    out.extend_from_slice(&n.to_le_bytes());
    if let Some(s) = start {
        out.extend_from_slice(&s.to_le_bytes());
    }
    out.extend_from_slice(&(alphabet.len() as u16).to_le_bytes());
    out.extend_from_slice(alphabet);
}

pub(crate) fn read_header(r: &mut ByteReader<'_>, with_start: bool) -> Result<Header, LoadError> {
    let total = r.read_u64()?;
    let n = r.read_u32()?;
    if n == 0 {
        return Err(LoadError::EmptyGrammar);
    }
    let start = if with_start {
        let s = r.read_u32()?;
        if s >= n {
            return Err(LoadError::StartOutOfRange { start: s, rules: n });
        }
        s
    } else {
        n - 1
    };
    let sigma = r.read_u16()?;
    if sigma == 0 || sigma > 256 {
        return Err(LoadError::Malformed("alphabet size out of range"));
    }
    let alphabet = r.take(sigma as usize)?.to_vec();
    for pair in alphabet.windows(2) {
        if pair[0] >= pair[1] {
            return Err(LoadError::Malformed("alphabet not strictly increasing"));
        }
    }
    Ok(Header {
        total,
        n,
        start,
        alphabet,
    })
}

// =============================================================================
// Packed symbol ids
// =============================================================================

// Layouts store rule bodies as packed ids over a compacted alphabet:
// id < sigma is the terminal `alphabet[id]`, anything above is a
// variable (absolute index or backward delta, depending on the layout).

/// Sorted distinct terminals plus the byte -> packed id table, built
/// once per pack.
pub(crate) struct Alphabet {
    bytes: Vec<u8>,
    ranks: [u16; 256],
}

impl Alphabet {
    pub(crate) fn collect<I: Iterator<Item = Symbol>>(symbols: I) -> Self {
        let mut seen = [false; 256];
        for sym in symbols {
            if let Symbol::Terminal(b) = sym {
                seen[b as usize] = true;
            }
        }
        let mut bytes = Vec::new();
        let mut ranks = [0u16; 256];
        for b in 0..256 {
            if seen[b] {
                ranks[b] = bytes.len() as u16;
                bytes.push(b as u8);
            }
        }
        Self { bytes, ranks }
    }

    pub(crate) fn sigma(&self) -> u16 {
        self.bytes.len() as u16
    }

    pub(crate) fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub(crate) fn pack(&self, sym: Symbol) -> u64 {
        match sym {
            Symbol::Terminal(b) => self.ranks[b as usize] as u64,
            Symbol::Variable(v) => self.sigma() as u64 + v as u64,
        }
    }
}

/// Decode a validated absolute packed id.
#[inline]
pub(crate) fn unpack(id: u64, alphabet: &[u8]) -> Symbol {
    let sigma = alphabet.len() as u64;
    if id < sigma {
        Symbol::Terminal(alphabet[id as usize])
    } else {
        Symbol::Variable((id - sigma) as u32)
    }
}

/// Validate two absolute-id rule streams against the strict topological
/// order: rule `i` may hold terminals and variables below `i` only.
pub(crate) fn check_topological<C: IntCode>(
    left: &C,
    right: &C,
    sigma: u16,
    n: u32,
) -> Result<(), LoadError> {
    if left.len() != n as usize || right.len() != n as usize {
        return Err(LoadError::Malformed("rule stream length mismatch"));
    }
    let sigma = sigma as u64;
    let limit = sigma + n as u64;
    for i in 0..n as usize {
        for id in [left.get(i), right.get(i)] {
            if id >= limit {
                return Err(LoadError::SymbolOutOfRange {
                    rule: i as u32,
                    id,
                    limit,
                });
            }
            if id >= sigma + i as u64 {
                return Err(LoadError::ForwardRef {
                    rule: i as u32,
                    target: id - sigma,
                });
            }
        }
    }
    Ok(())
}
