//! Behavioral tests across every store layout.
//!
//! Every layout packs the same rule tables and must answer the same
//! queries identically; the layouts differ only in wire format and in
//! their space/time balance. One battery is stamped per layout so a
//! regression names the offender directly.

use slp_access::Symbol::{Terminal, Variable};
use slp_access::{
    BuildError, FlatFixed32Slp, FlatFixedSlp, FlatGammaSlp, PoGammaSlp, PoIncSlp, RangeError,
    SelfSdMclSlp, SelfSdSdSlp, ShapedSdMclSlp, ShapedSdSdSlp, Slp, SlpRules,
};

// ============================================================================
// Rule table fixtures
// ============================================================================

/// r0 = 'a' 'b', r1 = r0 r0, deriving "abab".
fn abab_rules() -> SlpRules {
    SlpRules::new(
        vec![(Terminal(b'a'), Terminal(b'b')), (Variable(0), Variable(0))],
        1,
    )
    .unwrap()
}

/// Five rules deriving "abcababcababc", reusing subtrees at several
/// depths so straddling windows cross real structure.
fn chained_rules() -> SlpRules {
    SlpRules::new(
        vec![
            (Terminal(b'a'), Terminal(b'b')), // "ab"
            (Variable(0), Terminal(b'c')),    // "abc"
            (Variable(1), Variable(0)),       // "abcab"
            (Variable(2), Variable(2)),       // "abcababcab"
            (Variable(3), Variable(1)),       // "abcababcababc"
        ],
        4,
    )
    .unwrap()
}

/// Start symbol in the middle of the table; r3 is present but not
/// reachable from the start.
fn mid_start_rules() -> SlpRules {
    SlpRules::new(
        vec![
            (Terminal(b'a'), Terminal(b'b')),
            (Variable(0), Terminal(b'c')),
            (Variable(1), Variable(0)),
            (Variable(2), Variable(1)),
        ],
        2,
    )
    .unwrap()
}

/// Fibonacci-word rules: r0 = 'a' 'b', r1 = r0 'a', r_i = r_{i-1} r_{i-2}.
/// Rule lengths follow the Fibonacci numbers, so 91 rules derive a
/// string of about 12.2 exabytes while the table stays tiny.
fn fib_rules(top: u32) -> SlpRules {
    let mut rules = vec![
        (Terminal(b'a'), Terminal(b'b')),
        (Variable(0), Terminal(b'a')),
    ];
    for i in 2..=top {
        rules.push((Variable(i - 1), Variable(i - 2)));
    }
    SlpRules::new(rules, top).unwrap()
}

/// Derived length of each Fibonacci rule up to `top`.
fn fib_lens(top: usize) -> Vec<u64> {
    let mut lens = vec![2u64, 3];
    for i in 2..=top {
        lens.push(lens[i - 1] + lens[i - 2]);
    }
    lens
}

/// A prefix of the infinite Fibonacci word, at least `len` bytes long.
fn fib_word(len: usize) -> Vec<u8> {
    let mut prev = b"ab".to_vec();
    let mut cur = b"aba".to_vec();
    while cur.len() < len {
        let next = [cur.as_slice(), prev.as_slice()].concat();
        prev = cur;
        cur = next;
    }
    cur
}

/// A complete binary tree whose 128 leaf rules cover all 256 byte
/// values in scrambled order, driving the alphabet to its ceiling.
fn balanced_rules() -> SlpRules {
    let mut table = Vec::new();
    for i in 0..128u8 {
        let a = (2 * i).wrapping_mul(37);
        let b = (2 * i + 1).wrapping_mul(37);
        table.push((Terminal(a), Terminal(b)));
    }
    let mut level: Vec<u32> = (0..128).collect();
    while level.len() > 1 {
        let mut next = Vec::new();
        for pair in level.chunks(2) {
            let v = table.len() as u32;
            table.push((Variable(pair[0]), Variable(pair[1])));
            next.push(v);
        }
        level = next;
    }
    SlpRules::new(table, level[0]).unwrap()
}

/// r0 = 'a' 'a', r_i = r_{i-1} r_{i-1}: rule i derives 2^(i+1) bytes.
fn doubling_rules(rules: u32) -> SlpRules {
    let mut table = vec![(Terminal(b'a'), Terminal(b'a'))];
    for i in 1..rules {
        table.push((Variable(i - 1), Variable(i - 1)));
    }
    SlpRules::new(table, rules - 1).unwrap()
}

// ============================================================================
// Layout-generic checks
// ============================================================================

fn check_pack_expand_extract<S: Slp>() {
    let slp = S::from_rules(&abab_rules()).unwrap();

    assert_eq!(slp.total_len(), 4);
    assert_eq!(slp.alphabet(), b"ab");
    assert_eq!(slp.expand_all(), b"abab");
    assert_eq!(slp.expand_substring(0, 4).unwrap(), b"abab");
    assert_eq!(slp.expand_substring(1, 2).unwrap(), b"ba");
    assert_eq!(slp.sym_len(slp.start_symbol()), 4);
}

/// Every window of the derived string against a naive expansion.
fn check_windows<S: Slp>(rules: &SlpRules) {
    let slp = S::from_rules(rules).unwrap();
    let want = rules.expand();
    let total = want.len() as u64;

    assert_eq!(slp.total_len(), total);
    assert_eq!(slp.expand_all(), want);

    for start in 0..=total {
        for len in 0..=total - start {
            let got = slp.expand_substring(start, len).unwrap();
            assert_eq!(
                got,
                &want[start as usize..(start + len) as usize],
                "window ({}, {})",
                start,
                len
            );
        }
    }
}

fn check_range_errors<S: Slp>() {
    let slp = S::from_rules(&abab_rules()).unwrap();

    // The empty window is valid anywhere inside, including at the end.
    assert_eq!(slp.expand_substring(0, 0).unwrap(), b"");
    assert_eq!(slp.expand_substring(4, 0).unwrap(), b"");

    let out_of_range = |start, len| RangeError { start, len, total: 4 };
    assert_eq!(slp.expand_substring(4, 1), Err(out_of_range(4, 1)));
    assert_eq!(slp.expand_substring(3, 2), Err(out_of_range(3, 2)));
    assert_eq!(slp.expand_substring(5, 0), Err(out_of_range(5, 0)));
    // start + len past u64 is out of range, not a wraparound.
    assert_eq!(
        slp.expand_substring(2, u64::MAX),
        Err(out_of_range(2, u64::MAX))
    );

    // A failed request leaves a caller buffer untouched.
    let mut buf = b"keep".to_vec();
    assert!(slp.expand_into(9, 1, &mut buf).is_err());
    assert_eq!(buf, b"keep");
}

/// Random access into a 12.2 exabyte derivation: the store answers
/// window queries without ever materializing more than the window.
fn check_exabyte_random_access<S: Slp>() {
    let lens = fib_lens(90);
    let slp = S::from_rules(&fib_rules(90)).unwrap();

    assert_eq!(slp.total_len(), lens[90]);
    assert_eq!(slp.total_len(), 12_200_160_415_121_876_738);

    // The first 89 bytes are the Fibonacci word.
    let word = fib_word(89);
    assert_eq!(slp.expand_substring(0, 89).unwrap(), &word[..89]);

    // The word ends "...abaab".
    assert_eq!(slp.expand_substring(lens[90] - 5, 5).unwrap(), b"abaab");
    assert_eq!(slp.expand_substring(lens[90] - 1, 1).unwrap(), b"b");

    // A window straddling the top rule: the left child ends "...aba",
    // the right child starts "ab...".
    assert_eq!(slp.expand_substring(lens[89] - 2, 4).unwrap(), b"baab");

    // One byte past the end.
    assert_eq!(
        slp.expand_substring(lens[90], 1),
        Err(RangeError {
            start: lens[90],
            len: 1,
            total: lens[90]
        })
    );
}

fn check_length_overflow<S: Slp>() {
    // Rule 63 of the doubling chain would derive 2^64 bytes.
    assert_eq!(
        S::from_rules(&doubling_rules(64)).err(),
        Some(BuildError::LengthOverflow { rule: 63 })
    );

    // One rule shy still packs, at the largest power-of-two length.
    let slp = S::from_rules(&doubling_rules(63)).unwrap();
    assert_eq!(slp.total_len(), 1u64 << 63);
}

// ============================================================================
// Per-layout batteries
// ============================================================================

macro_rules! layout_tests {
    ($name:ident, $ty:ty) => {
        mod $name {
            use super::*;

            #[test]
            fn test_pack_expand_extract() {
                check_pack_expand_extract::<$ty>();
            }

            #[test]
            fn test_windows_match_naive_expansion() {
                check_windows::<$ty>(&chained_rules());
                check_windows::<$ty>(&mid_start_rules());
            }

            #[test]
            fn test_out_of_range_requests() {
                check_range_errors::<$ty>();
            }

            #[test]
            fn test_exabyte_scale_random_access() {
                check_exabyte_random_access::<$ty>();
            }

            #[test]
            fn test_rejects_length_overflow() {
                check_length_overflow::<$ty>();
            }
        }
    };
}

layout_tests!(flat_fixed, FlatFixedSlp);
layout_tests!(flat_fixed32, FlatFixed32Slp);
layout_tests!(flat_gamma, FlatGammaSlp);
layout_tests!(po_gamma, PoGammaSlp);
layout_tests!(po_inc, PoIncSlp);
layout_tests!(shaped_sd_mcl, ShapedSdMclSlp);
layout_tests!(shaped_sd_sd, ShapedSdSdSlp);
layout_tests!(self_sd_mcl, SelfSdMclSlp);
layout_tests!(self_sd_sd, SelfSdSdSlp);

// ============================================================================
// Cross-layout agreement
// ============================================================================

#[test]
fn test_layouts_agree_on_scrambled_alphabet() {
    let rules = balanced_rules();
    let want: Vec<u8> = (0..=255u8).map(|k| k.wrapping_mul(37)).collect();
    assert_eq!(rules.expand(), want);

    check_windows::<FlatFixedSlp>(&rules);
    check_windows::<PoIncSlp>(&rules);
    check_windows::<ShapedSdMclSlp>(&rules);
    check_windows::<SelfSdSdSlp>(&rules);
}

#[test]
fn test_full_byte_alphabet() {
    let slp = FlatFixedSlp::from_rules(&balanced_rules()).unwrap();
    let sorted: Vec<u8> = (0..=255).collect();

    assert_eq!(slp.alphabet().len(), 256);
    assert_eq!(slp.alphabet(), &sorted[..]);
    assert_eq!(slp.num_rules(), 255);
}

#[test]
fn test_post_order_drops_unreachable_rules() {
    let rules = mid_start_rules();

    // The flat layout keeps the table as given.
    let flat = FlatFixedSlp::from_rules(&rules).unwrap();
    assert_eq!(flat.num_rules(), 4);
    assert_eq!(flat.start_symbol(), Variable(2));

    // The post-order layout renumbers in traversal order from the start
    // symbol, so the unreachable rule disappears.
    let po = PoIncSlp::from_rules(&rules).unwrap();
    assert_eq!(po.num_rules(), 3);
    assert_eq!(po.start_symbol(), Variable(2));
    assert_eq!(po.expand_all(), flat.expand_all());
    assert_eq!(po.alphabet(), flat.alphabet());
}

#[test]
fn test_rule_bodies_survive_packing() {
    let rules = chained_rules();
    let slp = SelfSdMclSlp::from_rules(&rules).unwrap();

    assert_eq!(slp.num_rules(), 5);
    for v in 0..5 {
        assert_eq!(slp.rule(v), rules.rule(v), "rule {}", v);
    }
    for (v, &want) in [2u64, 3, 5, 10, 13].iter().enumerate() {
        assert_eq!(slp.var_len(v as u32), want);
    }
    assert_eq!(slp.split(4), 10);
}

#[test]
fn test_single_rule_grammar() {
    let rules = SlpRules::new(vec![(Terminal(0x00), Terminal(0xFF))], 0).unwrap();
    for expanded in [
        FlatGammaSlp::from_rules(&rules).unwrap().expand_all(),
        PoIncSlp::from_rules(&rules).unwrap().expand_all(),
        SelfSdSdSlp::from_rules(&rules).unwrap().expand_all(),
    ] {
        assert_eq!(expanded, [0x00, 0xFF]);
    }
}

#[test]
fn test_single_terminal_alphabet() {
    let slp = ShapedSdSdSlp::from_rules(&doubling_rules(10)).unwrap();

    assert_eq!(slp.alphabet(), b"a");
    assert_eq!(slp.total_len(), 1 << 10);
    assert_eq!(slp.expand_substring(511, 2).unwrap(), b"aa");
}

/// A 100_000-deep left spine; expansion walks it without recursing.
#[test]
fn test_deep_grammar_does_not_overflow_stack() {
    let depth = 100_000u32;
    let mut table = vec![(Terminal(b'x'), Terminal(b'y'))];
    for i in 1..depth {
        table.push((Variable(i - 1), Terminal(b'z')));
    }
    let rules = SlpRules::new(table, depth - 1).unwrap();

    let slp = FlatFixedSlp::from_rules(&rules).unwrap();
    assert_eq!(slp.total_len(), depth as u64 + 1);
    let all = slp.expand_all();
    assert_eq!(&all[..2], b"xy");
    assert!(all[2..].iter().all(|&b| b == b'z'));
    assert_eq!(slp.expand_substring(0, 3).unwrap(), b"xyz");
    assert_eq!(slp.expand_substring(depth as u64 - 1, 2).unwrap(), b"zz");

    // The post-order pack walks the same spine iteratively.
    let po = PoGammaSlp::from_rules(&rules).unwrap();
    assert_eq!(po.expand_substring(0, 3).unwrap(), b"xyz");
    assert_eq!(po.expand_substring(depth as u64 - 1, 2).unwrap(), b"zz");
}
