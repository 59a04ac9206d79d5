//! Instructions, terminators, and the value/block identifiers they use.

use std::fmt;

use kestrel_core::DeclId;
use ordered_float::OrderedFloat;

use crate::target::LoweringTarget;
use crate::types::IrType;

/// An SSA value within one function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ValueId(pub u32);

impl fmt::Display for ValueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "%{}", self.0)
    }
}

/// A basic block within one function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockId(pub u32);

impl BlockId {
    /// The entry block of every function.
    pub const ENTRY: BlockId = BlockId(0);

    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "bb{}", self.0)
    }
}

/// A constant operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Const {
    Unit,
    Bool(bool),
    Int(i64),
    Float(OrderedFloat<f64>),
}

impl Const {
    /// The type of this constant.
    pub fn ty(&self) -> IrType {
        match self {
            Const::Unit => IrType::Unit,
            Const::Bool(_) => IrType::Bool,
            Const::Int(_) => IrType::Int,
            Const::Float(_) => IrType::Float,
        }
    }
}

impl fmt::Display for Const {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Const::Unit => f.write_str("()"),
            Const::Bool(b) => write!(f, "{}", b),
            Const::Int(i) => write!(f, "{}", i),
            Const::Float(x) => write!(f, "{:?}", x.0),
        }
    }
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

impl BinaryOp {
    /// Whether the result is `bool` regardless of operand type.
    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinaryOp::Eq | BinaryOp::Ne | BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge
        )
    }

    pub fn mnemonic(self) -> &'static str {
        match self {
            BinaryOp::Add => "add",
            BinaryOp::Sub => "sub",
            BinaryOp::Mul => "mul",
            BinaryOp::Div => "div",
            BinaryOp::Eq => "eq",
            BinaryOp::Ne => "ne",
            BinaryOp::Lt => "lt",
            BinaryOp::Le => "le",
            BinaryOp::Gt => "gt",
            BinaryOp::Ge => "ge",
            BinaryOp::And => "and",
            BinaryOp::Or => "or",
        }
    }
}

/// A non-terminating instruction.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Instr {
    Const {
        dst: ValueId,
        value: Const,
    },
    Binary {
        dst: ValueId,
        op: BinaryOp,
        lhs: ValueId,
        rhs: ValueId,
    },
    /// Direct call of another lowered function.
    Call {
        dst: ValueId,
        callee: LoweringTarget,
        args: Vec<ValueId>,
    },
    /// Call through a function value.
    CallIndirect {
        dst: ValueId,
        callee: ValueId,
        args: Vec<ValueId>,
    },
    /// Materialize a function value for a lowered target.
    FunctionRef {
        dst: ValueId,
        target: LoweringTarget,
    },
    /// Reserve a stack slot; yields its address.
    AllocStack {
        dst: ValueId,
        ty: IrType,
    },
    /// Allocate uninitialized heap storage for a class instance.
    AllocObject {
        dst: ValueId,
        class: DeclId,
    },
    /// Free the storage of a class instance.
    DeallocObject {
        object: ValueId,
    },
    GlobalAddr {
        dst: ValueId,
        global: DeclId,
    },
    /// Address of a stored field of an object or of a struct in memory.
    FieldAddr {
        dst: ValueId,
        base: ValueId,
        field: u32,
    },
    /// Read a field out of a struct value.
    ExtractField {
        dst: ValueId,
        aggregate: ValueId,
        field: u32,
    },
    Load {
        dst: ValueId,
        addr: ValueId,
    },
    Store {
        addr: ValueId,
        value: ValueId,
    },
    /// Add one reference to an object.
    Retain {
        value: ValueId,
    },
    /// Drop one reference to an object.
    Release {
        value: ValueId,
    },
}

impl Instr {
    /// The value this instruction defines, if any.
    pub fn dst(&self) -> Option<ValueId> {
        match self {
            Instr::Const { dst, .. }
            | Instr::Binary { dst, .. }
            | Instr::Call { dst, .. }
            | Instr::CallIndirect { dst, .. }
            | Instr::FunctionRef { dst, .. }
            | Instr::AllocStack { dst, .. }
            | Instr::AllocObject { dst, .. }
            | Instr::GlobalAddr { dst, .. }
            | Instr::FieldAddr { dst, .. }
            | Instr::ExtractField { dst, .. }
            | Instr::Load { dst, .. } => Some(*dst),
            Instr::DeallocObject { .. }
            | Instr::Store { .. }
            | Instr::Retain { .. }
            | Instr::Release { .. } => None,
        }
    }

    /// Values read by this instruction.
    pub fn operands(&self) -> Vec<ValueId> {
        match self {
            Instr::Const { .. }
            | Instr::FunctionRef { .. }
            | Instr::AllocStack { .. }
            | Instr::AllocObject { .. }
            | Instr::GlobalAddr { .. } => Vec::new(),
            Instr::Binary { lhs, rhs, .. } => vec![*lhs, *rhs],
            Instr::Call { args, .. } => args.clone(),
            Instr::CallIndirect { callee, args, .. } => {
                let mut ops = Vec::with_capacity(args.len() + 1);
                ops.push(*callee);
                ops.extend_from_slice(args);
                ops
            }
            Instr::DeallocObject { object } => vec![*object],
            Instr::FieldAddr { base, .. } => vec![*base],
            Instr::ExtractField { aggregate, .. } => vec![*aggregate],
            Instr::Load { addr, .. } => vec![*addr],
            Instr::Store { addr, value } => vec![*addr, *value],
            Instr::Retain { value } | Instr::Release { value } => vec![*value],
        }
    }
}

/// The instruction that ends a basic block.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Terminator {
    Return(ValueId),
    Jump {
        target: BlockId,
        args: Vec<ValueId>,
    },
    /// Conditional branch; both targets take no block arguments.
    Branch {
        cond: ValueId,
        then_block: BlockId,
        else_block: BlockId,
    },
    Unreachable,
}

impl Terminator {
    /// Blocks control may transfer to.
    pub fn successors(&self) -> Vec<BlockId> {
        match self {
            Terminator::Return(_) | Terminator::Unreachable => Vec::new(),
            Terminator::Jump { target, .. } => vec![*target],
            Terminator::Branch {
                then_block,
                else_block,
                ..
            } => vec![*then_block, *else_block],
        }
    }

    /// Values read by this terminator.
    pub fn operands(&self) -> Vec<ValueId> {
        match self {
            Terminator::Return(value) => vec![*value],
            Terminator::Jump { args, .. } => args.clone(),
            Terminator::Branch { cond, .. } => vec![*cond],
            Terminator::Unreachable => Vec::new(),
        }
    }

    /// Block arguments passed to `target`.
    pub fn args_for(&self, target: BlockId) -> &[ValueId] {
        match self {
            Terminator::Jump { target: t, args } if *t == target => args,
            _ => &[],
        }
    }
}
