//! # slp-access
//!
//! Grammar-compressed string storage with random-access substring
//! extraction.
//!
//! A straight-line program (SLP) represents one long string as a table
//! of binary rules: each rule concatenates two symbols, a symbol is a
//! literal byte or an earlier rule, and a designated start rule derives
//! the whole string. Repetitive inputs collapse to small grammars, and
//! any substring can be materialized in time proportional to its length
//! plus the grammar depth, without decompressing the rest.
//!
//! This crate stores already-built grammars. It offers four physical
//! layouts with identical behavior, several integer codes to hold their
//! streams, and an exact byte-for-byte serialization for each.
//!
//! ## Module Organization
//!
//! - [`slp`] - grammar layouts, the store trait, substring expansion
//! - [`codes`] - integer stream codes (fixed width, incremental, gamma)
//! - [`bits`] - bitvector with rank and select support structures
//! - [`binary`] - little-endian serialization helpers
//! - [`error`] - build, load and range error types
//!
//! ## Quick Start
//!
//! ```
//! use slp_access::{FlatFixedSlp, Slp, SlpRules, Symbol};
//!
//! // R0 -> 'a' 'b'; R1 -> R0 R0. The start rule R1 derives "abab".
//! let rules = SlpRules::new(
//!     vec![
//!         (Symbol::Terminal(b'a'), Symbol::Terminal(b'b')),
//!         (Symbol::Variable(0), Symbol::Variable(0)),
//!     ],
//!     1,
//! )?;
//! let slp = FlatFixedSlp::from_rules(&rules)?;
//!
//! assert_eq!(slp.total_len(), 4);
//! assert_eq!(slp.expand_all(), b"abab");
//! assert_eq!(slp.expand_substring(1, 2)?, b"ba");
//!
//! // Stores round-trip through bytes exactly.
//! let bytes = slp.to_bytes();
//! let back = FlatFixedSlp::from_bytes(&bytes)?;
//! assert_eq!(back.to_bytes(), bytes);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Choosing a layout
//!
//! [`FlatFixedSlp`] is the fastest and largest; start there. The
//! post-order layouts ([`PoIncSlp`], [`PoGammaSlp`]) renumber rules so
//! references become small backward deltas. The shaped layouts
//! ([`ShapedSdMclSlp`], [`SelfSdMclSlp`] and friends) spend extra
//! effort on the split stream the expander steers by, and compress
//! hardest. All of them load from their own `to_bytes` output and
//! reject anything malformed with a precise [`LoadError`].
//!
//! ## Features
//!
//! - `std` (default) - std error integration; disable for `no_std`
//!   with `alloc`
//! - `serde` - serialization support for the plain model types
//! - `mmap` - memory-mapped file loading via [`MmapFile`]
//! - `cli` - the `slp-access` command-line tool

// Use no_std unless std feature is enabled or we're in test mode
#![cfg_attr(not(any(test, feature = "std")), no_std)]

// When using no_std, we need to explicitly link the alloc crate
#[cfg(not(any(test, feature = "std")))]
extern crate alloc;

// When using std, re-export alloc types from std for compatibility
#[cfg(any(test, feature = "std"))]
extern crate std as alloc;

// =============================================================================
// Core modules
// =============================================================================

/// Bitvector implementations with rank and select support.
pub mod bits;

/// Binary serialization utilities.
pub mod binary;

/// Integer stream codes.
pub mod codes;

/// Error types.
pub mod error;

/// Grammar stores and substring expansion.
pub mod slp;

// =============================================================================
// Public re-exports (convenience)
// =============================================================================

// Core types
pub use bits::{BitVec, RankDir, SampledSelect, SelectSupport, SparseSelect};
pub use codes::{FixedCode, GammaCode, IncCode, IntCode};
pub use error::{BuildError, LoadError, RangeError};

// Grammar stores
pub use slp::{
    FlatFixed32Slp, FlatFixedSlp, FlatGammaSlp, FlatSlp, LenIndex, PoGammaSlp, PoIncSlp,
    PostOrderSlp, SelfSdMclSlp, SelfSdSdSlp, SelfShapedSlp, ShapedSdMclSlp, ShapedSdSdSlp,
    ShapedSlp, Slp, SlpRules, Symbol,
};

#[cfg(feature = "mmap")]
pub use binary::mmap::MmapFile;
