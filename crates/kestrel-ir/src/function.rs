//! IR functions and their basic blocks.

use bitflags::bitflags;
use kestrel_core::SymbolHash;

use crate::instr::{BlockId, Instr, Terminator, ValueId};
use crate::types::{FunctionType, IrType};

bitflags! {
    /// Properties of an IR function.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct FunctionAttrs: u8 {
        /// Script-mode entry point.
        const TOP_LEVEL = 1 << 0;
        /// Lowered from a closure literal.
        const CLOSURE = 1 << 1;
        /// Body generated without a source declaration.
        const SYNTHESIZED = 1 << 2;
        /// Lowered from a definition imported from another module.
        const EXTERNAL = 1 << 3;
        /// Allocator, initializer or value constructor.
        const CONSTRUCTOR = 1 << 4;
        const DESTRUCTOR = 1 << 5;
    }
}

/// A basic block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub id: BlockId,
    /// Values bound by incoming jumps.
    pub params: Vec<ValueId>,
    pub instrs: Vec<Instr>,
    /// `None` only while the function is under construction.
    pub terminator: Option<Terminator>,
}

impl Block {
    fn new(id: BlockId) -> Self {
        Self {
            id,
            params: Vec::new(),
            instrs: Vec::new(),
            terminator: None,
        }
    }

    #[inline]
    pub fn is_terminated(&self) -> bool {
        self.terminator.is_some()
    }
}

/// A lowered function.
///
/// Append-only while an [`IrBuilder`](crate::IrBuilder) owns it: blocks and
/// values are added, never removed. Read-only once finished.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IrFunction {
    name: String,
    symbol: SymbolHash,
    ty: FunctionType,
    attrs: FunctionAttrs,
    blocks: Vec<Block>,
    value_types: Vec<IrType>,
}

impl IrFunction {
    /// Create an empty function with its type already resolved.
    pub fn new(name: impl Into<String>, symbol: SymbolHash, ty: FunctionType) -> Self {
        Self {
            name: name.into(),
            symbol,
            ty,
            attrs: FunctionAttrs::empty(),
            blocks: Vec::new(),
            value_types: Vec::new(),
        }
    }

    /// Set attributes.
    pub fn with_attrs(mut self, attrs: FunctionAttrs) -> Self {
        self.attrs = attrs;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn symbol(&self) -> SymbolHash {
        self.symbol
    }

    pub fn ty(&self) -> &FunctionType {
        &self.ty
    }

    pub fn attrs(&self) -> FunctionAttrs {
        self.attrs
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn block(&self, id: BlockId) -> Option<&Block> {
        self.blocks.get(id.index())
    }

    pub fn entry(&self) -> Option<&Block> {
        self.blocks.first()
    }

    /// The type of a value, if it is defined in this function.
    pub fn value_type(&self, value: ValueId) -> Option<&IrType> {
        self.value_types.get(value.0 as usize)
    }

    pub fn value_count(&self) -> usize {
        self.value_types.len()
    }

    /// Total instructions across all blocks, terminators excluded.
    pub fn instr_count(&self) -> usize {
        self.blocks.iter().map(|b| b.instrs.len()).sum()
    }

    /// Iterate over every instruction in block order.
    pub fn instrs(&self) -> impl Iterator<Item = &Instr> {
        self.blocks.iter().flat_map(|b| b.instrs.iter())
    }

    /// Iterate over every terminator in block order.
    pub fn terminators(&self) -> impl Iterator<Item = &Terminator> {
        self.blocks.iter().filter_map(|b| b.terminator.as_ref())
    }

    // ==========================================================================
    // Construction (builder only)
    // ==========================================================================

    pub(crate) fn push_block(&mut self) -> BlockId {
        let id = BlockId(self.blocks.len() as u32);
        self.blocks.push(Block::new(id));
        id
    }

    pub(crate) fn new_value(&mut self, ty: IrType) -> ValueId {
        let id = ValueId(self.value_types.len() as u32);
        self.value_types.push(ty);
        id
    }

    pub(crate) fn block_mut(&mut self, id: BlockId) -> Option<&mut Block> {
        self.blocks.get_mut(id.index())
    }
}
