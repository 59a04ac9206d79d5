//! Kestrel AST
//!
//! The type-checked syntax tree handed to lowering. Nodes borrow from an
//! arena (`'ast`) and are all `Copy`; every expression carries its checked
//! type.

pub mod decl;
pub mod expr;
pub mod stmt;
pub mod types;
pub mod unit;

pub use decl::{
    BindingDecl, ConstructorDecl, Decl, DestructorDecl, FieldDecl, FunctionDecl, Param,
    TopLevelCode, TypeDecl, VarDecl,
};
pub use expr::{
    BinaryExpr, BinaryOp, CallExpr, CallIndirectExpr, ClosureExpr, ConstructExpr, Expr, FieldExpr,
    GlobalExpr, Literal, LiteralExpr, LocalExpr, SelfExpr,
};
pub use stmt::{AssignStmt, Block, ExprStmt, IfStmt, LetStmt, ReturnStmt, Stmt, WhileStmt};
pub use types::{FunctionType, NominalType, Semantics, Type};
pub use unit::{CheckStage, CompilationUnit, ExternalDefinition, ImportedModule, UnitKind};
