//! The IR module produced for one compilation unit.

use kestrel_core::{DeclId, LoweringError};
use rustc_hash::FxHashMap;

use crate::function::IrFunction;
use crate::target::LoweringTarget;
use crate::types::IrType;

/// A lowered global variable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IrGlobal {
    pub name: String,
    pub ty: IrType,
}

/// Owns every function and global lowered from a compilation unit.
///
/// Holds at most one function per [`LoweringTarget`]; insertion order is
/// not preserved.
#[derive(Debug, Default)]
pub struct IrModule {
    functions: FxHashMap<LoweringTarget, IrFunction>,
    globals: FxHashMap<DeclId, IrGlobal>,
    top_level: Option<IrFunction>,
}

impl IrModule {
    pub fn new() -> Self {
        Self::default()
    }

    // ==========================================================================
    // Functions
    // ==========================================================================

    pub fn has_function(&self, target: &LoweringTarget) -> bool {
        self.functions.contains_key(target)
    }

    pub fn function(&self, target: &LoweringTarget) -> Option<&IrFunction> {
        self.functions.get(target)
    }

    /// Iterate over all functions in unspecified order.
    pub fn functions(&self) -> impl Iterator<Item = (&LoweringTarget, &IrFunction)> {
        self.functions.iter()
    }

    pub fn function_count(&self) -> usize {
        self.functions.len()
    }

    /// Register a finished function.
    ///
    /// Registering a second function for the same target is a fault; the
    /// existing entry is left untouched.
    pub fn insert_function(
        &mut self,
        target: LoweringTarget,
        function: IrFunction,
    ) -> Result<(), LoweringError> {
        if self.functions.contains_key(&target) {
            return Err(LoweringError::DuplicateTarget {
                target: target.to_string(),
            });
        }
        self.functions.insert(target, function);
        Ok(())
    }

    // ==========================================================================
    // Globals
    // ==========================================================================

    /// Register a global. Returns `false` if it was already present.
    pub fn add_global(&mut self, decl: DeclId, global: IrGlobal) -> bool {
        if self.globals.contains_key(&decl) {
            return false;
        }
        self.globals.insert(decl, global);
        true
    }

    pub fn global(&self, decl: DeclId) -> Option<&IrGlobal> {
        self.globals.get(&decl)
    }

    pub fn globals(&self) -> impl Iterator<Item = (&DeclId, &IrGlobal)> {
        self.globals.iter()
    }

    pub fn global_count(&self) -> usize {
        self.globals.len()
    }

    // ==========================================================================
    // Top level
    // ==========================================================================

    /// The script-mode entry function, if the unit has one.
    pub fn top_level(&self) -> Option<&IrFunction> {
        self.top_level.as_ref()
    }

    /// Install the top-level function, returning the one it replaces.
    pub fn set_top_level(&mut self, function: IrFunction) -> Option<IrFunction> {
        self.top_level.replace(function)
    }
}
