//! The expansion walk shared by every layout.
//!
//! Extraction keeps an explicit frame stack of (symbol, absolute
//! interval) entries. A frame disjoint from the query window is never
//! pushed, a frame fully inside it is emitted by a plain descent with
//! no further interval math, and a frame straddling a window edge is
//! split at the left-child length and both overlapping halves are
//! pushed. At most two root-to-leaf paths straddle an edge, so a query
//! costs the output length plus the grammar depth.

#[cfg(not(test))]
use alloc::vec::Vec;

use super::{Slp, Symbol};
use crate::error::RangeError;

struct Frame {
    sym: Symbol,
    pos: u64,
    len: u64,
}

pub(crate) fn substring_into<S: Slp>(
    slp: &S,
    start: u64,
    len: u64,
    out: &mut Vec<u8>,
) -> Result<(), RangeError> {
    let total = slp.total_len();
    let end = match start.checked_add(len) {
        Some(end) if end <= total => end,
        _ => return Err(RangeError { start, len, total }),
    };
    if len == 0 {
        return Ok(());
    }
    if let Ok(len) = usize::try_from(len) {
        out.reserve(len);
    }

    let mut scratch = Vec::new();
    let mut frames = Vec::new();
    frames.push(Frame {
        sym: slp.start_symbol(),
        pos: 0,
        len: total,
    });
    while let Some(Frame { sym, pos, len }) = frames.pop() {
        match sym {
            // A pushed frame always overlaps the window, and a terminal
            // covers one byte, so that byte is inside it.
            Symbol::Terminal(b) => out.push(b),
            Symbol::Variable(v) => {
                if start <= pos && pos + len <= end {
                    descend_all(slp, sym, &mut scratch, out);
                    continue;
                }
                let split = slp.split(v);
                let (left, right) = slp.rule(v);
                let mid = pos + split;
                // Right below left so the left half pops first.
                if mid < end {
                    frames.push(Frame {
                        sym: right,
                        pos: mid,
                        len: len - split,
                    });
                }
                if mid > start {
                    frames.push(Frame {
                        sym: left,
                        pos,
                        len: split,
                    });
                }
            }
        }
    }
    Ok(())
}

pub(crate) fn all_into<S: Slp>(slp: &S, out: &mut Vec<u8>) {
    if let Ok(total) = usize::try_from(slp.total_len()) {
        out.reserve(total);
    }
    let mut scratch = Vec::new();
    descend_all(slp, slp.start_symbol(), &mut scratch, out);
}

/// Emit the full derivation of `sym`, left to right.
fn descend_all<S: Slp>(slp: &S, sym: Symbol, stack: &mut Vec<Symbol>, out: &mut Vec<u8>) {
    stack.push(sym);
    while let Some(sym) = stack.pop() {
        match sym {
            Symbol::Terminal(b) => out.push(b),
            Symbol::Variable(v) => {
                let (left, right) = slp.rule(v);
                stack.push(right);
                stack.push(left);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{BuildError, LoadError};
    use crate::slp::{LenIndex, SlpRules};
    use Symbol::{Terminal, Variable};

    /// Store over the plain table, for exercising the walk without a
    /// packed layout in the way.
    struct PlainStore {
        rules: SlpRules,
        lens: LenIndex,
    }

    impl PlainStore {
        fn new(rules: SlpRules) -> Self {
            let lens = LenIndex::build(rules.num_rules() as u32, |v| rules.rule(v)).unwrap();
            Self { rules, lens }
        }
    }

    impl Slp for PlainStore {
        fn from_rules(rules: &SlpRules) -> Result<Self, BuildError> {
            Ok(Self::new(rules.clone()))
        }

        fn from_bytes(_bytes: &[u8]) -> Result<Self, LoadError> {
            unimplemented!()
        }

        fn to_bytes(&self) -> Vec<u8> {
            unimplemented!()
        }

        fn num_rules(&self) -> usize {
            self.rules.num_rules()
        }

        fn start_symbol(&self) -> Symbol {
            Symbol::Variable(self.rules.start())
        }

        fn total_len(&self) -> u64 {
            self.lens.get(self.rules.start())
        }

        fn rule(&self, v: u32) -> (Symbol, Symbol) {
            self.rules.rule(v)
        }

        fn var_len(&self, v: u32) -> u64 {
            self.lens.get(v)
        }

        fn alphabet(&self) -> &[u8] {
            &[]
        }

        fn size_bytes(&self) -> usize {
            0
        }
    }

    fn abab() -> PlainStore {
        PlainStore::new(
            SlpRules::new(
                vec![(Terminal(b'a'), Terminal(b'b')), (Variable(0), Variable(0))],
                1,
            )
            .unwrap(),
        )
    }

    /// Five chained rules deriving "abcababcababc".
    fn chained() -> PlainStore {
        PlainStore::new(
            SlpRules::new(
                vec![
                    (Terminal(b'a'), Terminal(b'b')),
                    (Variable(0), Terminal(b'c')),
                    (Variable(1), Variable(0)),
                    (Variable(2), Variable(2)),
                    (Variable(3), Variable(1)),
                ],
                4,
            )
            .unwrap(),
        )
    }

    #[test]
    fn test_full_expansion() {
        assert_eq!(abab().expand_all(), b"abab");
        assert_eq!(chained().expand_all(), b"abcababcababc");
    }

    #[test]
    fn test_straddling_window() {
        assert_eq!(abab().expand_substring(1, 2).unwrap(), b"ba");
    }

    #[test]
    fn test_every_window_matches_slice() {
        let store = chained();
        let full = store.rules.expand();
        let total = full.len();
        for s in 0..=total {
            for l in 0..=(total - s) {
                let got = store.expand_substring(s as u64, l as u64).unwrap();
                assert_eq!(got, &full[s..s + l], "window ({}, {})", s, l);
            }
        }
    }

    #[test]
    fn test_empty_window_anywhere() {
        let store = abab();
        assert_eq!(store.expand_substring(0, 0).unwrap(), b"");
        assert_eq!(store.expand_substring(4, 0).unwrap(), b"");
    }

    #[test]
    fn test_window_past_end() {
        let store = abab();
        let err = store.expand_substring(4, 1).unwrap_err();
        assert_eq!(
            err,
            RangeError {
                start: 4,
                len: 1,
                total: 4
            }
        );
        assert!(store.expand_substring(3, 2).is_err());
        assert!(store.expand_substring(5, 0).is_err());
    }

    #[test]
    fn test_window_length_overflow() {
        let store = abab();
        let err = store.expand_substring(2, u64::MAX).unwrap_err();
        assert_eq!(
            err,
            RangeError {
                start: 2,
                len: u64::MAX,
                total: 4
            }
        );
    }

    #[test]
    fn test_expand_into_appends() {
        let store = abab();
        let mut out = Vec::from(&b"head:"[..]);
        store.expand_into(1, 3, &mut out).unwrap();
        assert_eq!(out, b"head:bab");
    }
}
