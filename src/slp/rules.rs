//! The plain rule table and its interchange format.

#[cfg(not(test))]
use alloc::vec::Vec;

use core::fmt;

use super::Symbol;
use crate::binary::ByteReader;
use crate::error::{BuildError, LoadError};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

const RULES_MAGIC: [u8; 4] = *b"SLPR";
const RULES_VERSION: u8 = 1;

/// Offset separating terminal bytes from variable ids in the
/// interchange format: an id below it is a literal byte, an id at or
/// above it is the variable `id - 256`.
const VAR_OFFSET: u32 = 256;

/// A validated straight-line program in plain form.
///
/// This is the handoff type between an upstream grammar builder and the
/// packed layouts: construction checks the strict topological order
/// (rule `i` references variables below `i` only), so every store can
/// assume a DAG. The table is immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SlpRules {
    rules: Vec<(Symbol, Symbol)>,
    start: u32,
}

impl SlpRules {
    /// Validate and wrap a rule table.
    pub fn new(rules: Vec<(Symbol, Symbol)>, start: u32) -> Result<Self, BuildError> {
        if rules.is_empty() {
            return Err(BuildError::EmptyGrammar);
        }
        let n = u32::try_from(rules.len()).map_err(|_| BuildError::TooManyRules {
            rules: rules.len(),
        })?;
        if n > u32::MAX - VAR_OFFSET {
            return Err(BuildError::TooManyRules {
                rules: rules.len(),
            });
        }
        if start >= n {
            return Err(BuildError::StartOutOfRange {
                start,
                rules: rules.len(),
            });
        }
        for (i, &(left, right)) in rules.iter().enumerate() {
            for sym in [left, right] {
                if let Symbol::Variable(j) = sym {
                    if j >= n {
                        return Err(BuildError::RefOutOfRange {
                            rule: i as u32,
                            target: j,
                        });
                    }
                    if j as usize >= i {
                        return Err(BuildError::ForwardRef {
                            rule: i as u32,
                            target: j,
                        });
                    }
                }
            }
        }
        Ok(Self { rules, start })
    }

    /// Number of rules.
    #[inline]
    pub fn num_rules(&self) -> usize {
        self.rules.len()
    }

    /// The start variable.
    #[inline]
    pub fn start(&self) -> u32 {
        self.start
    }

    /// The body of rule `v`.
    #[inline]
    pub fn rule(&self, v: u32) -> (Symbol, Symbol) {
        self.rules[v as usize]
    }

    /// All rule bodies in index order.
    #[inline]
    pub fn rules(&self) -> &[(Symbol, Symbol)] {
        &self.rules
    }

    /// Materialize the derived string by a plain iterative walk.
    ///
    /// Every occurrence of every symbol is visited, so this is linear in
    /// the output, not in the grammar. Meant for small grammars and as
    /// the reference behavior the packed layouts are checked against.
    pub fn expand(&self) -> Vec<u8> {
        let mut out = Vec::new();
        let mut stack = Vec::new();
        stack.push(Symbol::Variable(self.start));
        while let Some(sym) = stack.pop() {
            match sym {
                Symbol::Terminal(b) => out.push(b),
                Symbol::Variable(v) => {
                    let (left, right) = self.rules[v as usize];
                    stack.push(right);
                    stack.push(left);
                }
            }
        }
        out
    }

    /// Serialize to the `SLPR` interchange layout.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(13 + self.rules.len() * 8);
        out.extend_from_slice(&RULES_MAGIC);
        out.push(RULES_VERSION);
        out.extend_from_slice(&(self.rules.len() as u32).to_le_bytes());
        out.extend_from_slice(&self.start.to_le_bytes());
        for &(left, right) in &self.rules {
            for sym in [left, right] {
                let id: u32 = match sym {
                    Symbol::Terminal(b) => b as u32,
                    Symbol::Variable(v) => VAR_OFFSET + v,
                };
                out.extend_from_slice(&id.to_le_bytes());
            }
        }
        out
    }

    /// Load an `SLPR` interchange file.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, LoadError> {
        let mut r = ByteReader::new(bytes);
        let magic = r.take(4)?;
        let found = [magic[0], magic[1], magic[2], magic[3]];
        if found != RULES_MAGIC {
            return Err(LoadError::BadMagic { found });
        }
        let version = r.read_u8()?;
        if version != RULES_VERSION {
            return Err(LoadError::UnsupportedVersion { found: version });
        }
        let n = r.read_u32()?;
        if n == 0 {
            return Err(LoadError::EmptyGrammar);
        }
        if n > u32::MAX - VAR_OFFSET {
            return Err(LoadError::Malformed("rule count exceeds u32 range"));
        }
        let start = r.read_u32()?;
        if start >= n {
            return Err(LoadError::StartOutOfRange { start, rules: n });
        }

        let body_bytes = n as usize * 8;
        if r.remaining() < body_bytes {
            return Err(LoadError::UnexpectedEof {
                needed: body_bytes,
                available: r.remaining(),
            });
        }
        let mut rules = Vec::with_capacity(n as usize);
        for i in 0..n {
            let left = decode_symbol(r.read_u32()?, i, n)?;
            let right = decode_symbol(r.read_u32()?, i, n)?;
            rules.push((left, right));
        }
        r.finish()?;
        Ok(Self { rules, start })
    }
}

fn decode_symbol(id: u32, rule: u32, n: u32) -> Result<Symbol, LoadError> {
    if id < VAR_OFFSET {
        return Ok(Symbol::Terminal(id as u8));
    }
    let target = id - VAR_OFFSET;
    if target >= n {
        return Err(LoadError::SymbolOutOfRange {
            rule,
            id: id as u64,
            limit: VAR_OFFSET as u64 + n as u64,
        });
    }
    if target >= rule {
        return Err(LoadError::ForwardRef {
            rule,
            target: target as u64,
        });
    }
    Ok(Symbol::Variable(target))
}

impl fmt::Display for SlpRules {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, &(left, right)) in self.rules.iter().enumerate() {
            writeln!(f, "R{} -> {} {}", i, left, right)?;
        }
        write!(f, "start: R{}", self.start)
    }
}
