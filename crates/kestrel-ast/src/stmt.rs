//! Statement AST nodes.

use kestrel_core::Span;

use crate::expr::Expr;
use crate::types::Type;

/// A statement.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Stmt<'ast> {
    /// Expression statement (expr;)
    Expr(ExprStmt<'ast>),
    /// Local variable binding
    Let(LetStmt<'ast>),
    /// Assignment to a local, global or field
    Assign(AssignStmt<'ast>),
    /// Return statement
    Return(ReturnStmt<'ast>),
    /// Block statement
    Block(Block<'ast>),
    /// If statement
    If(&'ast IfStmt<'ast>),
    /// While loop
    While(&'ast WhileStmt<'ast>),
}

impl<'ast> Stmt<'ast> {
    /// Get the span of this statement.
    pub fn span(&self) -> Span {
        match self {
            Self::Expr(s) => s.span,
            Self::Let(s) => s.span,
            Self::Assign(s) => s.span,
            Self::Return(s) => s.span,
            Self::Block(s) => s.span,
            Self::If(s) => s.span,
            Self::While(s) => s.span,
        }
    }
}

/// An expression evaluated for its effects.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExprStmt<'ast> {
    pub expr: &'ast Expr<'ast>,
    pub span: Span,
}

/// `let name: ty = init;`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LetStmt<'ast> {
    pub name: &'ast str,
    pub ty: Type<'ast>,
    pub init: &'ast Expr<'ast>,
    pub span: Span,
}

/// `target = value;`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AssignStmt<'ast> {
    pub target: &'ast Expr<'ast>,
    pub value: &'ast Expr<'ast>,
    pub span: Span,
}

/// `return;` or `return value;`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReturnStmt<'ast> {
    pub value: Option<&'ast Expr<'ast>>,
    pub span: Span,
}

/// A braced sequence of statements opening a new scope.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Block<'ast> {
    pub stmts: &'ast [Stmt<'ast>],
    pub span: Span,
}

/// `if cond { ... } else { ... }`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IfStmt<'ast> {
    pub cond: &'ast Expr<'ast>,
    pub then_block: Block<'ast>,
    pub else_block: Option<Block<'ast>>,
    pub span: Span,
}

/// `while cond { ... }`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WhileStmt<'ast> {
    pub cond: &'ast Expr<'ast>,
    pub body: Block<'ast>,
    pub span: Span,
}
