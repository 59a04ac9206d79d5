//! Deterministic hash-based symbol identity for lowered functions.
//!
//! Every IR function carries a [`SymbolHash`] computed from the declaration it
//! was lowered from and the kind of entry point it is. Unlike sequential ids,
//! the hash is the same in every run, so a function lowered in one
//! incremental step links against the same symbol in the next.
//!
//! # Hash Computation
//!
//! Uses XXHash64 over the declaration id, XORed with a domain constant per
//! entry-point kind so that the allocator and initializer of one constructor
//! never collide.
//!
//! # Examples
//!
//! ```
//! use kestrel_core::{DeclId, SymbolHash, symbol_domains};
//!
//! let alloc = SymbolHash::from_decl(symbol_domains::ALLOCATOR, DeclId(7));
//! let init = SymbolHash::from_decl(symbol_domains::INITIALIZER, DeclId(7));
//! assert_ne!(alloc, init);
//! ```

use std::fmt;
use xxhash_rust::xxh64::xxh64;

use crate::DeclId;

/// Domain constants mixed into symbol hashes, one per entry-point kind.
pub mod symbol_domains {
    /// Plain functions, methods and value-type constructors.
    pub const FUNCTION: u64 = 0x5ea77ffbcdf5f302;

    /// Class constructor initializer entry points.
    pub const INITIALIZER: u64 = 0x9a7f3d5e2b8c4601;

    /// Class constructor allocator entry points.
    pub const ALLOCATOR: u64 = 0x7d3c8b4a92e15f6d;

    /// Class destructors.
    pub const DESTRUCTOR: u64 = 0x3e9f5d2a8c7b1403;

    /// Closure literals.
    pub const CLOSURE: u64 = 0x2fac10b63a6cc57c;

    /// The script-mode top-level function.
    pub const TOP_LEVEL: u64 = 0x1a095090689d4647;
}

/// A deterministic 64-bit symbol identifying one lowered entry point.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct SymbolHash(pub u64);

impl SymbolHash {
    /// Empty/invalid hash constant.
    pub const EMPTY: SymbolHash = SymbolHash(0);

    /// Hash a declaration under the given domain.
    #[inline]
    pub fn from_decl(domain: u64, decl: DeclId) -> Self {
        SymbolHash(domain ^ xxh64(&decl.raw().to_le_bytes(), 0))
    }

    /// Hash a free-standing name under the given domain.
    ///
    /// Used for symbols with no declaration behind them, like the top-level
    /// function.
    #[inline]
    pub fn from_name(domain: u64, name: &str) -> Self {
        SymbolHash(domain ^ xxh64(name.as_bytes(), 0))
    }

    /// Check if this is an empty/invalid hash.
    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Get the underlying u64 value.
    #[inline]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for SymbolHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SymbolHash({:#018x})", self.0)
    }
}

impl fmt::Display for SymbolHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#018x}", self.0)
    }
}
