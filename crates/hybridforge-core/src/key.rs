//! Variable identifiers.
//!
//! A [`Key`] is a plain 64-bit value. The symbol form packs an ASCII
//! character into the top byte and an index into the remaining 56 bits, so
//! `Key::symbol('x', 3)` prints as `x3`.

use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{HybridError, Result};

const CHR_BITS: u32 = 8;
const INDEX_BITS: u32 = 64 - CHR_BITS;
const INDEX_MASK: u64 = (1 << INDEX_BITS) - 1;

/// Identifier of one unknown, continuous or discrete.
///
/// # Examples
///
/// ```
/// use hybridforge_core::Key;
///
/// let x3 = Key::symbol('x', 3);
/// assert_eq!(x3.chr(), Some('x'));
/// assert_eq!(x3.index(), 3);
/// assert_eq!(x3.to_string(), "x3");
/// assert!(Key::symbol('x', 2) < x3);
/// ```
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Key(u64);

impl Key {
    /// Creates a key from its raw value.
    #[inline]
    pub const fn new(raw: u64) -> Self {
        Key(raw)
    }

    /// Creates a symbol key such as `x3` or `m0`.
    ///
    /// # Panics
    ///
    /// Panics if `chr` is not ASCII or `index` does not fit in 56 bits; use
    /// [`try_symbol`](Self::try_symbol) for untrusted input.
    pub fn symbol(chr: char, index: u64) -> Self {
        match Self::try_symbol(chr, index) {
            Ok(key) => key,
            Err(e) => panic!("{}", e),
        }
    }

    /// Creates a symbol key, rejecting a non-ASCII character or an index
    /// wider than 56 bits with `InvalidArgument`.
    pub fn try_symbol(chr: char, index: u64) -> Result<Self> {
        if !chr.is_ascii() {
            return Err(HybridError::InvalidArgument(format!(
                "symbol character {:?} is not ASCII",
                chr
            )));
        }
        if index > INDEX_MASK {
            return Err(HybridError::InvalidArgument(format!(
                "symbol index {} does not fit in {} bits",
                index, INDEX_BITS
            )));
        }
        Ok(Key(((chr as u64) << INDEX_BITS) | index))
    }

    /// Returns the raw value.
    #[inline]
    pub const fn raw(&self) -> u64 {
        self.0
    }

    /// Returns the symbol character, if this key was built as a symbol.
    pub fn chr(&self) -> Option<char> {
        let c = (self.0 >> INDEX_BITS) as u8;
        c.is_ascii_alphabetic().then_some(c as char)
    }

    /// Returns the symbol index (the low 56 bits).
    #[inline]
    pub const fn index(&self) -> u64 {
        self.0 & INDEX_MASK
    }
}

impl From<u64> for Key {
    fn from(raw: u64) -> Self {
        Key(raw)
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.chr() {
            Some(c) => write!(f, "{}{}", c, self.index()),
            None => write!(f, "{}", self.0),
        }
    }
}

impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Key({})", self)
    }
}

/// Shorthands for the symbol keys used throughout the estimation examples.
pub mod symbol_shorthand {
    use super::Key;

    /// Continuous state `x_k`.
    pub fn x(k: u64) -> Key {
        Key::symbol('x', k)
    }

    /// Discrete mode `m_k`.
    pub fn m(k: u64) -> Key {
        Key::symbol('m', k)
    }
}

/// A discrete variable: its key plus the size of its finite domain.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DiscreteKey {
    pub key: Key,
    pub cardinality: usize,
}

impl DiscreteKey {
    /// Creates a discrete key.
    ///
    /// # Panics
    ///
    /// Panics if `cardinality < 2`; use [`try_new`](Self::try_new) for
    /// untrusted input.
    pub fn new(key: Key, cardinality: usize) -> Self {
        match Self::try_new(key, cardinality) {
            Ok(dk) => dk,
            Err(e) => panic!("{}", e),
        }
    }

    /// Creates a discrete key, rejecting `cardinality < 2` with
    /// `InvalidArgument`.
    pub fn try_new(key: Key, cardinality: usize) -> Result<Self> {
        if cardinality < 2 {
            return Err(HybridError::InvalidArgument(format!(
                "discrete key {} needs cardinality >= 2, got {}",
                key, cardinality
            )));
        }
        Ok(DiscreteKey { key, cardinality })
    }
}

impl fmt::Debug for DiscreteKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.key, self.cardinality)
    }
}

/// Kind of an unknown, discovered from the factors that reference it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariableKind {
    /// Vector-valued unknown of the given dimension.
    Continuous { dim: usize },
    /// Finite-domain unknown of the given cardinality.
    Discrete { cardinality: usize },
}

impl VariableKind {
    pub fn is_discrete(&self) -> bool {
        matches!(self, VariableKind::Discrete { .. })
    }
}
