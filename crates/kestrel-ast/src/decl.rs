//! Declaration AST nodes.
//!
//! Declarations are the top-level items of a compilation unit. Types nest
//! their constructors, methods and destructor, so a method always knows its
//! owner through the enclosing [`TypeDecl`].

use kestrel_core::{DeclId, Span};

use crate::expr::Expr;
use crate::stmt::{Block, Stmt};
use crate::types::{NominalType, Semantics, Type};

/// A declaration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Decl<'ast> {
    /// Free function
    Function(FunctionDecl<'ast>),
    /// Class or struct declaration
    Type(TypeDecl<'ast>),
    /// Global variable declaration
    Var(VarDecl<'ast>),
    /// Global variable bound by a top-level pattern binding
    Binding(BindingDecl<'ast>),
    /// Script-mode statements executed in source order
    TopLevelCode(TopLevelCode<'ast>),
}

impl<'ast> Decl<'ast> {
    /// Get the span of this declaration.
    pub fn span(&self) -> Span {
        match self {
            Self::Function(d) => d.span,
            Self::Type(d) => d.span,
            Self::Var(d) => d.span,
            Self::Binding(d) => d.span,
            Self::TopLevelCode(d) => d.span,
        }
    }

    /// Get the declared name, for diagnostics.
    pub fn name(&self) -> &'ast str {
        match self {
            Self::Function(d) => d.name,
            Self::Type(d) => d.name,
            Self::Var(d) => d.name,
            Self::Binding(d) => d.var.name,
            Self::TopLevelCode(_) => "<top-level code>",
        }
    }

    /// Get the declaration identity. Top-level code has none.
    pub fn id(&self) -> Option<DeclId> {
        match self {
            Self::Function(d) => Some(d.id),
            Self::Type(d) => Some(d.id),
            Self::Var(d) => Some(d.id),
            Self::Binding(d) => Some(d.var.id),
            Self::TopLevelCode(_) => None,
        }
    }
}

/// A function parameter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Param<'ast> {
    pub name: &'ast str,
    pub ty: Type<'ast>,
    pub span: Span,
}

/// A function or method declaration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FunctionDecl<'ast> {
    pub id: DeclId,
    pub name: &'ast str,
    pub params: &'ast [Param<'ast>],
    /// Declared result type
    pub result: Type<'ast>,
    /// `None` for prototypes
    pub body: Option<Block<'ast>>,
    pub span: Span,
}

impl FunctionDecl<'_> {
    /// Check if this is a body-less prototype.
    #[inline]
    pub fn is_prototype(&self) -> bool {
        self.body.is_none()
    }
}

/// A class or struct declaration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TypeDecl<'ast> {
    pub id: DeclId,
    pub name: &'ast str,
    pub semantics: Semantics,
    /// Stored fields in declaration order
    pub fields: &'ast [FieldDecl<'ast>],
    pub constructors: &'ast [ConstructorDecl<'ast>],
    pub methods: &'ast [FunctionDecl<'ast>],
    /// Explicit destructor, if declared
    pub destructor: Option<DestructorDecl<'ast>>,
    pub span: Span,
}

impl<'ast> TypeDecl<'ast> {
    /// The nominal type this declaration introduces.
    pub fn nominal(&self) -> NominalType<'ast> {
        NominalType {
            decl: self.id,
            name: self.name,
            semantics: self.semantics,
        }
    }

    /// Check if this type has reference semantics.
    #[inline]
    pub fn is_class(&self) -> bool {
        self.semantics == Semantics::Reference
    }
}

/// A stored field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldDecl<'ast> {
    pub name: &'ast str,
    pub ty: Type<'ast>,
    pub span: Span,
}

/// A constructor declaration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConstructorDecl<'ast> {
    pub id: DeclId,
    pub params: &'ast [Param<'ast>],
    /// `None` for prototypes
    pub body: Option<Block<'ast>>,
    pub span: Span,
}

/// An explicit destructor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DestructorDecl<'ast> {
    pub body: Block<'ast>,
    pub span: Span,
}

/// A global variable.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VarDecl<'ast> {
    pub id: DeclId,
    pub name: &'ast str,
    pub ty: Type<'ast>,
    pub span: Span,
}

/// A top-level binding `let name = init`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BindingDecl<'ast> {
    /// The global being bound
    pub var: VarDecl<'ast>,
    pub init: Option<&'ast Expr<'ast>>,
    pub span: Span,
}

/// Statements at file scope in a script-mode unit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TopLevelCode<'ast> {
    pub stmts: &'ast [Stmt<'ast>],
    pub span: Span,
}
