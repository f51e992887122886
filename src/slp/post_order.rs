//! The post-order layout: rules renumbered by DFS exit, children as
//! backward deltas.
//!
//! Packing walks the derivation DAG left to right from the start
//! symbol and renumbers each rule by the order it is left for the last
//! time. Rules the start symbol never reaches are dropped. In that
//! numbering every child exits strictly before its parent, so a child
//! reference is a positive backward delta and the start variable is
//! always the last rule; neither needs storing. Deltas are small for
//! recently produced rules, which is what [`IncCode`](crate::codes::IncCode)
//! and gamma are shaped for.
//!
//! Loading accepts any table whose deltas stay in range, not just the
//! canonical order `from_rules` emits.

#[cfg(not(test))]
use alloc::vec::Vec;

use super::{
    read_envelope, read_header, write_envelope, write_header, Alphabet, LenIndex, Slp, SlpRules,
    Symbol, VARIANT_POST_ORDER,
};
use crate::binary::ByteReader;
use crate::codes::IntCode;
use crate::error::{BuildError, LoadError};

/// A grammar stored in post-order with delta-packed children.
#[derive(Clone, Debug)]
pub struct PostOrderSlp<C> {
    left: C,
    right: C,
    alphabet: Vec<u8>,
    lens: LenIndex,
}

enum Visit {
    Enter(u32),
    Exit(u32),
}

/// Old rule ids in DFS exit order, left subtrees first.
fn post_order(rules: &SlpRules) -> (Vec<u32>, Vec<u32>) {
    let n = rules.num_rules();
    let mut order = Vec::new();
    let mut pos = Vec::new();
    pos.resize(n, 0u32);
    let mut visited = Vec::new();
    visited.resize(n, false);

    // Marking happens when an Enter pops, not when it is pushed: a rule
    // can be pushed from several parents, and only the first pop may
    // claim it, or a shared rule could exit after a rule referencing it.
    let mut stack = Vec::new();
    stack.push(Visit::Enter(rules.start()));
    while let Some(visit) = stack.pop() {
        match visit {
            Visit::Enter(i) => {
                if visited[i as usize] {
                    continue;
                }
                visited[i as usize] = true;
                stack.push(Visit::Exit(i));
                let (left, right) = rules.rule(i);
                // Right below left so the left subtree exits first.
                for sym in [right, left] {
                    if let Symbol::Variable(j) = sym {
                        if !visited[j as usize] {
                            stack.push(Visit::Enter(j));
                        }
                    }
                }
            }
            Visit::Exit(i) => {
                pos[i as usize] = order.len() as u32;
                order.push(i);
            }
        }
    }
    (order, pos)
}

impl<C: IntCode> PostOrderSlp<C> {
    #[inline]
    fn decode(&self, p: u32, id: u64) -> Symbol {
        let sigma = self.alphabet.len() as u64;
        if id < sigma {
            Symbol::Terminal(self.alphabet[id as usize])
        } else {
            let delta = (id - sigma) as u32 + 1;
            Symbol::Variable(p - delta)
        }
    }
}

impl<C: IntCode> Slp for PostOrderSlp<C> {
    fn from_rules(rules: &SlpRules) -> Result<Self, BuildError> {
        let (order, pos) = post_order(rules);
        let alpha = Alphabet::collect(
            order
                .iter()
                .flat_map(|&i| { let (l, r) = rules.rule(i); [l, r] }),
        );
        let sigma = alpha.sigma() as u64;

        let pack = |p: u32, sym: Symbol| -> u64 {
            match sym {
                Symbol::Terminal(_) => alpha.pack(sym),
                Symbol::Variable(j) => {
                    let delta = p - pos[j as usize];
                    sigma + delta as u64 - 1
                }
            }
        };
        let mut left_ids = Vec::with_capacity(order.len());
        let mut right_ids = Vec::with_capacity(order.len());
        for (p, &old) in order.iter().enumerate() {
            let (l, r) = rules.rule(old);
            left_ids.push(pack(p as u32, l));
            right_ids.push(pack(p as u32, r));
        }
        let left = C::encode(&left_ids)?;
        let right = C::encode(&right_ids)?;

        let remap = |sym: Symbol| match sym {
            Symbol::Terminal(_) => sym,
            Symbol::Variable(j) => Symbol::Variable(pos[j as usize]),
        };
        let lens = LenIndex::build(order.len() as u32, |p| {
            let (l, r) = rules.rule(order[p as usize]);
            (remap(l), remap(r))
        })?;
        Ok(Self {
            left,
            right,
            alphabet: alpha.bytes().to_vec(),
            lens,
        })
    }

    fn from_bytes(bytes: &[u8]) -> Result<Self, LoadError> {
        let mut r = ByteReader::new(bytes);
        read_envelope(&mut r, VARIANT_POST_ORDER)?;
        let header = read_header(&mut r, false)?;
        let left = C::read_from(&mut r)?;
        let right = C::read_from(&mut r)?;
        r.finish()?;

        let n = header.n;
        if left.len() != n as usize || right.len() != n as usize {
            return Err(LoadError::Malformed("rule stream length mismatch"));
        }
        // A delta reference always points backward, so the only failure
        // mode is a delta reaching below position zero.
        let sigma = header.alphabet.len() as u64;
        for p in 0..n as usize {
            for id in [left.get(p), right.get(p)] {
                let limit = sigma + p as u64;
                if id >= limit {
                    return Err(LoadError::SymbolOutOfRange {
                        rule: p as u32,
                        id,
                        limit,
                    });
                }
            }
        }

        let alphabet = header.alphabet;
        let decode = |p: u32, id: u64| -> Symbol {
            if id < sigma {
                Symbol::Terminal(alphabet[id as usize])
            } else {
                Symbol::Variable(p - ((id - sigma) as u32 + 1))
            }
        };
        let lens = LenIndex::build(n, |p| {
            (
                decode(p, left.get(p as usize)),
                decode(p, right.get(p as usize)),
            )
        })?;
        let derived = lens.get(n - 1);
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
            lens,
        })
    }

    fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        write_envelope(&mut out, VARIANT_POST_ORDER);
        write_header(
            &mut out,
            self.total_len(),
            self.lens.len() as u32,
            None,
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
        Symbol::Variable(self.lens.len() as u32 - 1)
    }

    #[inline]
    fn total_len(&self) -> u64 {
        self.lens.get(self.lens.len() as u32 - 1)
    }

    #[inline]
    fn rule(&self, v: u32) -> (Symbol, Symbol) {
        (
            self.decode(v, self.left.get(v as usize)),
            self.decode(v, self.right.get(v as usize)),
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
