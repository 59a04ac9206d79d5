//! Stable declaration identity assigned by the type checker.

use std::fmt;

/// Identifies one declaration (or closure literal) of a checked program.
///
/// Ids are handed out upstream and stay stable across incremental runs, so a
/// declaration seen again in a later increment maps to the same id.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct DeclId(pub u32);

impl DeclId {
    /// Get the raw index.
    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Debug for DeclId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DeclId({})", self.0)
    }
}

impl fmt::Display for DeclId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}
