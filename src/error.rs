//! Error types for grammar construction, loading, and queries.
//!
//! Three failure domains, kept separate so callers can match on what they
//! can actually handle:
//!
//! - [`BuildError`] - invalid plain rules or unencodable values while
//!   packing a grammar.
//! - [`LoadError`] - a malformed serialized stream. Loading is all or
//!   nothing; no partially initialized store is ever returned.
//! - [`RangeError`] - an out-of-bounds substring request against an
//!   otherwise healthy store.

use core::fmt;

/// Errors from packing plain rules into a store, or from encoding a
/// value stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildError {
    /// The rule table is empty.
    EmptyGrammar,
    /// The rule table is too large to index with `u32` identifiers.
    TooManyRules { rules: usize },
    /// The start symbol does not name a rule.
    StartOutOfRange { start: u32, rules: usize },
    /// A rule body references a variable that does not exist.
    RefOutOfRange { rule: u32, target: u32 },
    /// A rule body references itself or a later rule, breaking the
    /// strict topological order.
    ForwardRef { rule: u32, target: u32 },
    /// A value does not fit a statically configured code width.
    ValueTooWide { value: u64, width: u8 },
    /// A value cannot be represented by the chosen code at all.
    ValueUnencodable { value: u64 },
    /// A derived length exceeds `u64::MAX`.
    LengthOverflow { rule: u32 },
}

impl fmt::Display for BuildError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::EmptyGrammar => write!(f, "grammar has no rules"),
            Self::TooManyRules { rules } => {
                write!(f, "grammar has {} rules, more than u32 can index", rules)
            }
            Self::StartOutOfRange { start, rules } => {
                write!(f, "start symbol {} out of range for {} rules", start, rules)
            }
            Self::RefOutOfRange { rule, target } => {
                write!(f, "rule {} references nonexistent variable {}", rule, target)
            }
            Self::ForwardRef { rule, target } => {
                write!(
                    f,
                    "rule {} references variable {} out of topological order",
                    rule, target
                )
            }
            Self::ValueTooWide { value, width } => {
                write!(f, "value {} does not fit in {} bits", value, width)
            }
            Self::ValueUnencodable { value } => {
                write!(f, "value {} is not representable by this code", value)
            }
            Self::LengthOverflow { rule } => {
                write!(f, "derived length of rule {} exceeds u64 range", rule)
            }
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for BuildError {}

/// Errors from deserializing a grammar store or a plain rules file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadError {
    /// Input ended before the expected number of bytes.
    UnexpectedEof { needed: usize, available: usize },
    /// The leading magic bytes are wrong.
    BadMagic { found: [u8; 4] },
    /// The format version is not one this library understands.
    UnsupportedVersion { found: u8 },
    /// The file's variant tag does not match the requested store type.
    VariantMismatch { expected: u8, found: u8 },
    /// A coded stream's tag does not match the requested code type.
    CodeMismatch { expected: &'static str, found: u8 },
    /// The reserved flags field is not zero.
    BadFlags { found: u16 },
    /// Bytes remain after the last field.
    TrailingBytes { extra: usize },
    /// The stored rule count is zero.
    EmptyGrammar,
    /// The stored start symbol does not name a rule.
    StartOutOfRange { start: u32, rules: u32 },
    /// A decoded symbol id is outside the range valid at its position.
    SymbolOutOfRange { rule: u32, id: u64, limit: u64 },
    /// An absolute reference points at its own rule or a later one,
    /// breaking the strict topological order.
    ForwardRef { rule: u32, target: u64 },
    /// A remap table entry is out of range or duplicated.
    BadRemap { rank: u32, id: u64 },
    /// A derived length exceeds `u64::MAX`.
    LengthOverflow { rule: u32 },
    /// The start symbol's derived length disagrees with the stored
    /// total length.
    TotalLenMismatch { stored: u64, derived: u64 },
    /// A stored split disagrees with the left child's derived length.
    SplitMismatch { rule: u32, stored: u64, derived: u64 },
    /// A structural field has an impossible value.
    Malformed(&'static str),
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::UnexpectedEof { needed, available } => {
                write!(
                    f,
                    "unexpected end of input: needed {} bytes, {} available",
                    needed, available
                )
            }
            Self::BadMagic { found } => {
                write!(
                    f,
                    "bad magic bytes {:02x} {:02x} {:02x} {:02x}",
                    found[0], found[1], found[2], found[3]
                )
            }
            Self::UnsupportedVersion { found } => {
                write!(f, "unsupported format version {}", found)
            }
            Self::VariantMismatch { expected, found } => {
                write!(
                    f,
                    "variant tag {} does not match requested store (tag {})",
                    found, expected
                )
            }
            Self::CodeMismatch { expected, found } => {
                write!(
                    f,
                    "stream coded with tag {} where a {} stream was requested",
                    found, expected
                )
            }
            Self::BadFlags { found } => write!(f, "reserved flags field is {:#06x}", found),
            Self::TrailingBytes { extra } => {
                write!(f, "{} trailing bytes after the last field", extra)
            }
            Self::EmptyGrammar => write!(f, "stored grammar has no rules"),
            Self::StartOutOfRange { start, rules } => {
                write!(f, "start symbol {} out of range for {} rules", start, rules)
            }
            Self::SymbolOutOfRange { rule, id, limit } => {
                write!(
                    f,
                    "rule {} holds symbol id {} (valid ids are below {})",
                    rule, id, limit
                )
            }
            Self::ForwardRef { rule, target } => {
                write!(
                    f,
                    "rule {} references variable {} out of topological order",
                    rule, target
                )
            }
            Self::BadRemap { rank, id } => {
                write!(f, "remap entry {} holds invalid or duplicate id {}", rank, id)
            }
            Self::LengthOverflow { rule } => {
                write!(f, "derived length of rule {} exceeds u64 range", rule)
            }
            Self::TotalLenMismatch { stored, derived } => {
                write!(
                    f,
                    "stored total length {} but the start symbol derives {}",
                    stored, derived
                )
            }
            Self::SplitMismatch { rule, stored, derived } => {
                write!(
                    f,
                    "rule {} stores split {} but its left child derives {}",
                    rule, stored, derived
                )
            }
            Self::Malformed(what) => write!(f, "malformed stream: {}", what),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for LoadError {}

impl From<BuildError> for LoadError {
    fn from(e: BuildError) -> Self {
        match e {
            BuildError::EmptyGrammar => Self::EmptyGrammar,
            BuildError::StartOutOfRange { start, rules } => Self::StartOutOfRange {
                start,
                rules: rules as u32,
            },
            BuildError::RefOutOfRange { .. } => {
                Self::Malformed("rule references a nonexistent variable")
            }
            BuildError::ForwardRef { rule, target } => Self::ForwardRef {
                rule,
                target: target as u64,
            },
            BuildError::LengthOverflow { rule } => Self::LengthOverflow { rule },
            BuildError::TooManyRules { .. } => Self::Malformed("rule count exceeds u32 range"),
            BuildError::ValueTooWide { .. } | BuildError::ValueUnencodable { .. } => {
                Self::Malformed("stream holds a value invalid for its code")
            }
        }
    }
}

/// An out-of-bounds substring request.
///
/// Raised when `start + len` overflows or runs past the end of the
/// derived string. The request is never silently truncated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangeError {
    /// Requested start offset.
    pub start: u64,
    /// Requested length.
    pub len: u64,
    /// Total length of the derived string.
    pub total: u64,
}

impl fmt::Display for RangeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "substring (start {}, len {}) out of range for a string of length {}",
            self.start, self.len, self.total
        )
    }
}

#[cfg(feature = "std")]
impl std::error::Error for RangeError {}
