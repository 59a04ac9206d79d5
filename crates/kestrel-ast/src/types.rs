//! Checked semantic types attached to AST nodes.
//!
//! These are the types the type checker resolved, not the type expressions
//! the user wrote. Lowering maps them onto IR types and never re-derives them.

use kestrel_core::DeclId;

/// Whether instances of a nominal type carry identity or are copied by value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Semantics {
    /// Identity-bearing, heap-allocated instances (classes).
    Reference,
    /// Instances copied by value (structs).
    Value,
}

/// A reference to a declared type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NominalType<'ast> {
    /// The declaring type.
    pub decl: DeclId,
    /// Type name, for diagnostics and symbol names.
    pub name: &'ast str,
    /// Reference or value semantics.
    pub semantics: Semantics,
}

impl NominalType<'_> {
    /// Check if this type has reference semantics.
    #[inline]
    pub fn has_reference_semantics(&self) -> bool {
        self.semantics == Semantics::Reference
    }
}

/// A function signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FunctionType<'ast> {
    /// Parameter types in order.
    pub params: &'ast [Type<'ast>],
    /// Result type.
    pub result: Type<'ast>,
}

/// A checked type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Type<'ast> {
    /// The canonical empty type `()`.
    Unit,
    /// Boolean
    Bool,
    /// 64-bit signed integer
    Int,
    /// 64-bit float
    Float,
    /// The type of expressions that never produce a value.
    Never,
    /// A declared class or struct.
    Nominal(NominalType<'ast>),
    /// A function or closure value.
    Function(&'ast FunctionType<'ast>),
}

impl<'ast> Type<'ast> {
    /// Check if this is the canonical unit type.
    #[inline]
    pub fn is_unit(&self) -> bool {
        matches!(self, Type::Unit)
    }

    /// Check if this type is uninhabited.
    #[inline]
    pub fn is_never(&self) -> bool {
        matches!(self, Type::Never)
    }

    /// Check if values of this type are references to heap instances.
    pub fn has_reference_semantics(&self) -> bool {
        match self {
            Type::Nominal(nominal) => nominal.has_reference_semantics(),
            _ => false,
        }
    }

    /// Get the nominal type, if this is one.
    pub fn as_nominal(&self) -> Option<&NominalType<'ast>> {
        match self {
            Type::Nominal(nominal) => Some(nominal),
            _ => None,
        }
    }
}
