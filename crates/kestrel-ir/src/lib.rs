//! Kestrel IR
//!
//! The block-structured intermediate representation produced by lowering.
//!
//! - [`IrModule`] owns every lowered function, keyed by [`LoweringTarget`]
//! - [`IrFunction`] is an append-only list of basic blocks with typed values
//! - [`IrBuilder`] issues instructions and tracks the insertion point
//! - [`IrFunction::verify`] checks the structural rules lowering must uphold

mod builder;
mod display;
mod function;
mod instr;
mod module;
mod target;
mod types;
mod verify;

pub use builder::{InsertionPoint, IrBuilder};
pub use function::{Block, FunctionAttrs, IrFunction};
pub use instr::{BinaryOp, BlockId, Const, Instr, Terminator, ValueId};
pub use module::{IrGlobal, IrModule};
pub use target::{LoweringTarget, TargetKind};
pub use types::{FunctionType, IrType};

pub use ordered_float::OrderedFloat;
