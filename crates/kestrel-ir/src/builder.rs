//! Instruction-level builder for one IR function.
//!
//! [`IrBuilder`] owns the function under construction and tracks the
//! insertion point as an explicit two-state machine: either a block is
//! [`Active`](InsertionPoint::Active) and accepts instructions, or control
//! has [`Terminated`](InsertionPoint::Terminated) and nothing may be emitted
//! until the builder is positioned at a fresh block.
//!
//! # Example
//!
//! ```
//! use kestrel_core::SymbolHash;
//! use kestrel_ir::{Const, FunctionType, IrBuilder, IrFunction, IrType};
//!
//! let function = IrFunction::new("answer", SymbolHash(1), FunctionType::new(vec![], IrType::Int));
//! let mut builder = IrBuilder::new(function);
//! let value = builder.emit_const(Const::Int(42)).unwrap();
//! builder.emit_return(value).unwrap();
//!
//! let function = builder.finish();
//! assert!(function.verify().is_ok());
//! ```

use kestrel_core::{DeclId, LoweringError};

use crate::function::IrFunction;
use crate::instr::{BinaryOp, BlockId, Const, Instr, Terminator, ValueId};
use crate::target::LoweringTarget;
use crate::types::IrType;

type Result<T> = std::result::Result<T, LoweringError>;

/// Where the next instruction goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertionPoint {
    /// Instructions are appended to this block.
    Active(BlockId),
    /// The last block was closed by a terminator.
    Terminated,
}

/// Builds a single [`IrFunction`].
#[derive(Debug)]
pub struct IrBuilder {
    function: IrFunction,
    insertion: InsertionPoint,
}

impl IrBuilder {
    /// Start building `function`.
    ///
    /// Appends the entry block, binds one block parameter per declared
    /// parameter, and positions at the entry block.
    pub fn new(mut function: IrFunction) -> Self {
        let entry = function.push_block();
        let params = function.ty().params.clone();
        for ty in params {
            let value = function.new_value(ty);
            if let Some(block) = function.block_mut(entry) {
                block.params.push(value);
            }
        }

        Self {
            function,
            insertion: InsertionPoint::Active(entry),
        }
    }

    /// The function under construction.
    pub fn function(&self) -> &IrFunction {
        &self.function
    }

    pub fn name(&self) -> &str {
        self.function.name()
    }

    pub fn insertion_point(&self) -> InsertionPoint {
        self.insertion
    }

    /// Check if instructions can currently be emitted.
    #[inline]
    pub fn is_active(&self) -> bool {
        matches!(self.insertion, InsertionPoint::Active(_))
    }

    pub fn current_block(&self) -> Option<BlockId> {
        match self.insertion {
            InsertionPoint::Active(block) => Some(block),
            InsertionPoint::Terminated => None,
        }
    }

    /// Values bound to the declared parameters, in order.
    pub fn entry_params(&self) -> Vec<ValueId> {
        self.function
            .entry()
            .map(|b| b.params.clone())
            .unwrap_or_default()
    }

    pub fn value_type(&self, value: ValueId) -> Option<&IrType> {
        self.function.value_type(value)
    }

    // ==========================================================================
    // Blocks
    // ==========================================================================

    /// Append a new empty block without moving the insertion point.
    pub fn create_block(&mut self) -> BlockId {
        self.function.push_block()
    }

    /// Bind a new parameter on `block`.
    pub fn add_block_param(&mut self, block: BlockId, ty: IrType) -> ValueId {
        let value = self.function.new_value(ty);
        if let Some(b) = self.function.block_mut(block) {
            b.params.push(value);
        }
        value
    }

    /// Make `block` the insertion point.
    pub fn position_at(&mut self, block: BlockId) -> Result<()> {
        let terminated = self
            .function
            .block(block)
            .map(|b| b.is_terminated())
            .unwrap_or(false);
        if terminated {
            return Err(LoweringError::AlreadyTerminated {
                function: self.function.name().to_string(),
                block: block.0,
            });
        }
        self.insertion = InsertionPoint::Active(block);
        Ok(())
    }

    fn current(&self) -> Result<BlockId> {
        self.current_block()
            .ok_or_else(|| LoweringError::NoInsertionPoint {
                function: self.function.name().to_string(),
            })
    }

    fn push(&mut self, instr: Instr) -> Result<()> {
        let block = self.current()?;
        if let Some(b) = self.function.block_mut(block) {
            b.instrs.push(instr);
        }
        Ok(())
    }

    fn push_value(&mut self, ty: IrType, make: impl FnOnce(ValueId) -> Instr) -> Result<ValueId> {
        self.current()?;
        let dst = self.function.new_value(ty);
        self.push(make(dst))?;
        Ok(dst)
    }

    // ==========================================================================
    // Instructions
    // ==========================================================================

    pub fn emit_const(&mut self, value: Const) -> Result<ValueId> {
        self.push_value(value.ty(), |dst| Instr::Const { dst, value })
    }

    pub fn emit_binary(
        &mut self,
        op: BinaryOp,
        lhs: ValueId,
        rhs: ValueId,
        result: IrType,
    ) -> Result<ValueId> {
        self.push_value(result, |dst| Instr::Binary { dst, op, lhs, rhs })
    }

    pub fn emit_call(
        &mut self,
        callee: LoweringTarget,
        args: Vec<ValueId>,
        result: IrType,
    ) -> Result<ValueId> {
        self.push_value(result, |dst| Instr::Call { dst, callee, args })
    }

    pub fn emit_call_indirect(
        &mut self,
        callee: ValueId,
        args: Vec<ValueId>,
        result: IrType,
    ) -> Result<ValueId> {
        self.push_value(result, |dst| Instr::CallIndirect { dst, callee, args })
    }

    pub fn emit_function_ref(&mut self, target: LoweringTarget, ty: IrType) -> Result<ValueId> {
        self.push_value(ty, |dst| Instr::FunctionRef { dst, target })
    }

    /// Reserve a stack slot for a `ty`; yields its address.
    pub fn emit_alloc_stack(&mut self, ty: IrType) -> Result<ValueId> {
        let addr = IrType::address(ty.clone());
        self.push_value(addr, |dst| Instr::AllocStack { dst, ty })
    }

    pub fn emit_alloc_object(&mut self, class: DeclId) -> Result<ValueId> {
        self.push_value(IrType::Object(class), |dst| Instr::AllocObject { dst, class })
    }

    pub fn emit_dealloc_object(&mut self, object: ValueId) -> Result<()> {
        self.push(Instr::DeallocObject { object })
    }

    /// Address of a global holding a `ty`.
    pub fn emit_global_addr(&mut self, global: DeclId, ty: IrType) -> Result<ValueId> {
        self.push_value(IrType::address(ty), |dst| Instr::GlobalAddr { dst, global })
    }

    /// Address of field `field` (of type `ty`) in the object or struct slot `base`.
    pub fn emit_field_addr(&mut self, base: ValueId, field: u32, ty: IrType) -> Result<ValueId> {
        self.push_value(IrType::address(ty), |dst| Instr::FieldAddr { dst, base, field })
    }

    pub fn emit_extract_field(
        &mut self,
        aggregate: ValueId,
        field: u32,
        ty: IrType,
    ) -> Result<ValueId> {
        self.push_value(ty, |dst| Instr::ExtractField {
            dst,
            aggregate,
            field,
        })
    }

    /// Load from `addr`; the result has the address's pointee type.
    pub fn emit_load(&mut self, addr: ValueId) -> Result<ValueId> {
        let ty = self
            .function
            .value_type(addr)
            .and_then(IrType::pointee)
            .cloned()
            .unwrap_or(IrType::Never);
        self.push_value(ty, |dst| Instr::Load { dst, addr })
    }

    pub fn emit_store(&mut self, addr: ValueId, value: ValueId) -> Result<()> {
        self.push(Instr::Store { addr, value })
    }

    pub fn emit_retain(&mut self, value: ValueId) -> Result<()> {
        self.push(Instr::Retain { value })
    }

    pub fn emit_release(&mut self, value: ValueId) -> Result<()> {
        self.push(Instr::Release { value })
    }

    // ==========================================================================
    // Terminators
    // ==========================================================================

    /// Close the current block with `terminator`.
    ///
    /// Afterwards the insertion point is [`InsertionPoint::Terminated`].
    pub fn terminate(&mut self, terminator: Terminator) -> Result<()> {
        let block = self.current()?;
        let name = self.function.name().to_string();
        let Some(b) = self.function.block_mut(block) else {
            return Err(LoweringError::NoInsertionPoint { function: name });
        };
        if b.terminator.is_some() {
            return Err(LoweringError::AlreadyTerminated {
                function: name,
                block: block.0,
            });
        }
        b.terminator = Some(terminator);
        self.insertion = InsertionPoint::Terminated;
        Ok(())
    }

    pub fn emit_return(&mut self, value: ValueId) -> Result<()> {
        self.terminate(Terminator::Return(value))
    }

    pub fn emit_jump(&mut self, target: BlockId, args: Vec<ValueId>) -> Result<()> {
        self.terminate(Terminator::Jump { target, args })
    }

    pub fn emit_branch(
        &mut self,
        cond: ValueId,
        then_block: BlockId,
        else_block: BlockId,
    ) -> Result<()> {
        self.terminate(Terminator::Branch {
            cond,
            then_block,
            else_block,
        })
    }

    pub fn emit_unreachable(&mut self) -> Result<()> {
        self.terminate(Terminator::Unreachable)
    }

    /// Finish construction and hand back the function.
    pub fn finish(self) -> IrFunction {
        self.function
    }
}
