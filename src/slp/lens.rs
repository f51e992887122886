//! Derived expansion lengths, one `u64` per variable.

#[cfg(not(test))]
use alloc::vec::Vec;

use super::Symbol;
use crate::error::{BuildError, LoadError};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Why a length table could not be derived.
///
/// Converted into the caller's error space: builders report
/// [`BuildError`], loaders report [`LoadError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LenError {
    ForwardRef { rule: u32, target: u32 },
    Overflow { rule: u32 },
}

impl From<LenError> for BuildError {
    fn from(e: LenError) -> Self {
        match e {
            LenError::ForwardRef { rule, target } => Self::ForwardRef { rule, target },
            LenError::Overflow { rule } => Self::LengthOverflow { rule },
        }
    }
}

impl From<LenError> for LoadError {
    fn from(e: LenError) -> Self {
        match e {
            LenError::ForwardRef { rule, target } => Self::ForwardRef {
                rule,
                target: target as u64,
            },
            LenError::Overflow { rule } => Self::LengthOverflow { rule },
        }
    }
}

/// Expansion length of every variable, derived in one linear pass.
///
/// Derivation walks rules in index order, so only already-computed
/// entries are read. Additions are checked: a grammar whose derived
/// string exceeds `u64` is rejected rather than wrapped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LenIndex {
    lens: Vec<u64>,
}

impl LenIndex {
    /// Derive lengths for `n` rules, fetching bodies through `rule`.
    pub(crate) fn build<F>(n: u32, rule: F) -> Result<Self, LenError>
    where
        F: Fn(u32) -> (Symbol, Symbol),
    {
        let mut lens: Vec<u64> = Vec::with_capacity(n as usize);
        for i in 0..n {
            let (left, right) = rule(i);
            let a = sym_len(&lens, i, left)?;
            let b = sym_len(&lens, i, right)?;
            let len = a
                .checked_add(b)
                .ok_or(LenError::Overflow { rule: i })?;
            lens.push(len);
        }
        Ok(Self { lens })
    }

    /// Expansion length of variable `v`.
    ///
    /// Panics if `v` is not a rule index.
    #[inline]
    pub fn get(&self, v: u32) -> u64 {
        self.lens[v as usize]
    }

    /// Number of entries.
    #[inline]
    pub fn len(&self) -> usize {
        self.lens.len()
    }

    /// Whether the table is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.lens.is_empty()
    }

    /// Heap footprint in bytes.
    pub fn heap_size(&self) -> usize {
        self.lens.len() * core::mem::size_of::<u64>()
    }
}

fn sym_len(lens: &[u64], rule: u32, sym: Symbol) -> Result<u64, LenError> {
    match sym {
        Symbol::Terminal(_) => Ok(1),
        Symbol::Variable(v) => {
            if v as usize >= lens.len() {
                return Err(LenError::ForwardRef { rule, target: v });
            }
            Ok(lens[v as usize])
        }
    }
}
