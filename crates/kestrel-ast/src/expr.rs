//! Expression AST nodes.
//!
//! Every expression carries the type the checker assigned to it.

use kestrel_core::{DeclId, Span};

use crate::decl::Param;
use crate::stmt::Block;
use crate::types::{NominalType, Type};

/// An expression.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Expr<'ast> {
    /// Literal value
    Literal(LiteralExpr),
    /// Reference to a local variable or parameter
    Local(LocalExpr<'ast>),
    /// Reference to a global variable
    Global(GlobalExpr<'ast>),
    /// The implicit instance inside methods, constructors and destructors
    SelfRef(SelfExpr<'ast>),
    /// Field projection
    Field(&'ast FieldExpr<'ast>),
    /// Direct call of a declared function or method
    Call(&'ast CallExpr<'ast>),
    /// Call through a function value
    CallIndirect(&'ast CallIndirectExpr<'ast>),
    /// Instance construction through a constructor
    Construct(&'ast ConstructExpr<'ast>),
    /// Binary operation
    Binary(&'ast BinaryExpr<'ast>),
    /// Closure literal
    Closure(&'ast ClosureExpr<'ast>),
}

impl<'ast> Expr<'ast> {
    /// Get the span of this expression.
    pub fn span(&self) -> Span {
        match self {
            Self::Literal(e) => e.span,
            Self::Local(e) => e.span,
            Self::Global(e) => e.span,
            Self::SelfRef(e) => e.span,
            Self::Field(e) => e.span,
            Self::Call(e) => e.span,
            Self::CallIndirect(e) => e.span,
            Self::Construct(e) => e.span,
            Self::Binary(e) => e.span,
            Self::Closure(e) => e.span,
        }
    }

    /// Get the checked type of this expression.
    pub fn ty(&self) -> Type<'ast> {
        match self {
            Self::Literal(e) => e.kind.ty(),
            Self::Local(e) => e.ty,
            Self::Global(e) => e.ty,
            Self::SelfRef(e) => e.ty,
            Self::Field(e) => e.ty,
            Self::Call(e) => e.ty,
            Self::CallIndirect(e) => e.ty,
            Self::Construct(e) => Type::Nominal(e.ty),
            Self::Binary(e) => e.ty,
            Self::Closure(e) => e.ty,
        }
    }
}

/// A literal expression.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LiteralExpr {
    /// The literal value
    pub kind: Literal,
    /// Source location
    pub span: Span,
}

/// Literal values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Literal {
    /// `()`
    Unit,
    /// `true` / `false`
    Bool(bool),
    /// Integer literal
    Int(i64),
    /// Float literal
    Float(f64),
}

impl Literal {
    /// The type of this literal.
    pub fn ty(&self) -> Type<'static> {
        match self {
            Literal::Unit => Type::Unit,
            Literal::Bool(_) => Type::Bool,
            Literal::Int(_) => Type::Int,
            Literal::Float(_) => Type::Float,
        }
    }
}

/// A local variable or parameter reference.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocalExpr<'ast> {
    pub name: &'ast str,
    pub ty: Type<'ast>,
    pub span: Span,
}

/// A global variable reference.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GlobalExpr<'ast> {
    /// The global's declaration
    pub var: DeclId,
    pub name: &'ast str,
    pub ty: Type<'ast>,
    pub span: Span,
}

/// The implicit `self` instance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SelfExpr<'ast> {
    pub ty: Type<'ast>,
    pub span: Span,
}

/// A field projection `base.name`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldExpr<'ast> {
    /// The aggregate being projected
    pub base: &'ast Expr<'ast>,
    /// Field index in declaration order
    pub field: u32,
    /// Field name
    pub name: &'ast str,
    /// Field type
    pub ty: Type<'ast>,
    pub span: Span,
}

/// A direct call `name(args)` or `receiver.name(args)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CallExpr<'ast> {
    /// The called function or method declaration
    pub callee: DeclId,
    pub name: &'ast str,
    /// Method receiver, passed as the leading argument
    pub receiver: Option<&'ast Expr<'ast>>,
    pub args: &'ast [Expr<'ast>],
    /// Result type
    pub ty: Type<'ast>,
    pub span: Span,
}

/// A call through a function-typed value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CallIndirectExpr<'ast> {
    pub callee: &'ast Expr<'ast>,
    pub args: &'ast [Expr<'ast>],
    /// Result type
    pub ty: Type<'ast>,
    pub span: Span,
}

/// Instance construction `Type(args)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConstructExpr<'ast> {
    /// The constructed type
    pub ty: NominalType<'ast>,
    /// The selected constructor declaration
    pub constructor: DeclId,
    pub args: &'ast [Expr<'ast>],
    pub span: Span,
}

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

/// A binary operation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BinaryExpr<'ast> {
    pub op: BinaryOp,
    pub lhs: &'ast Expr<'ast>,
    pub rhs: &'ast Expr<'ast>,
    /// Result type
    pub ty: Type<'ast>,
    pub span: Span,
}

/// A closure literal.
///
/// Closures reaching lowering are capture-free; captured state has already
/// been turned into explicit parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClosureExpr<'ast> {
    /// Identity of this literal
    pub id: DeclId,
    pub params: &'ast [Param<'ast>],
    /// Declared result type
    pub result: Type<'ast>,
    pub body: Block<'ast>,
    /// Function type of the closure value
    pub ty: Type<'ast>,
    pub span: Span,
}
