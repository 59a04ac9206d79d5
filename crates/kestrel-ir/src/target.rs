//! Lowering targets: the keys of a module's function table.

use std::fmt;

use kestrel_core::{DeclId, SymbolHash, symbol_domains};

/// What part of a declaration an IR function implements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TargetKind {
    /// A function body, method body, or value-type constructor.
    Function,
    /// The half of a class constructor that populates existing storage.
    Initializer,
    /// The half of a class constructor callers invoke; obtains storage.
    Allocator,
    /// A class destructor.
    Destructor,
    /// A closure literal.
    Closure,
}

impl TargetKind {
    /// Hash domain mixed into symbols of this kind.
    fn domain(self) -> u64 {
        match self {
            TargetKind::Function => symbol_domains::FUNCTION,
            TargetKind::Initializer => symbol_domains::INITIALIZER,
            TargetKind::Allocator => symbol_domains::ALLOCATOR,
            TargetKind::Destructor => symbol_domains::DESTRUCTOR,
            TargetKind::Closure => symbol_domains::CLOSURE,
        }
    }
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TargetKind::Function => "function",
            TargetKind::Initializer => "initializer",
            TargetKind::Allocator => "allocator",
            TargetKind::Destructor => "destructor",
            TargetKind::Closure => "closure",
        };
        f.write_str(s)
    }
}

/// Identifies one IR function to be produced: a declaration plus the kind
/// of function derived from it.
///
/// Two targets are equal iff both declaration and kind match. A module holds
/// at most one function per target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LoweringTarget {
    pub decl: DeclId,
    pub kind: TargetKind,
}

impl LoweringTarget {
    #[inline]
    pub fn new(decl: DeclId, kind: TargetKind) -> Self {
        Self { decl, kind }
    }

    #[inline]
    pub fn function(decl: DeclId) -> Self {
        Self::new(decl, TargetKind::Function)
    }

    #[inline]
    pub fn initializer(decl: DeclId) -> Self {
        Self::new(decl, TargetKind::Initializer)
    }

    #[inline]
    pub fn allocator(decl: DeclId) -> Self {
        Self::new(decl, TargetKind::Allocator)
    }

    #[inline]
    pub fn destructor(decl: DeclId) -> Self {
        Self::new(decl, TargetKind::Destructor)
    }

    #[inline]
    pub fn closure(decl: DeclId) -> Self {
        Self::new(decl, TargetKind::Closure)
    }

    /// Deterministic symbol for this target.
    ///
    /// Stable across incremental runs, so a function lowered by an earlier
    /// increment keeps its symbol.
    pub fn symbol(&self) -> SymbolHash {
        SymbolHash::from_decl(self.kind.domain(), self.decl)
    }
}

impl fmt::Display for LoweringTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind, self.decl)
    }
}
