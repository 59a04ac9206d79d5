//! Local scope management for function emission.
//!
//! This module provides `LocalScope` for tracking local variables while a
//! function body is lowered. It handles:
//! - Binding names to the stack slots that hold them
//! - Nested block scopes (if/while bodies, explicit blocks)
//! - Shadowing with proper restoration on scope exit

use kestrel_ir::{IrType, ValueId};
use rustc_hash::FxHashMap;

// ============================================================================
// Types
// ============================================================================

/// Information about a local variable.
#[derive(Debug, Clone, PartialEq)]
pub struct LocalVar {
    /// Address of the stack slot holding the variable
    pub slot: ValueId,
    /// Stored type
    pub ty: IrType,
    /// Scope depth where declared
    pub depth: u32,
}

// ============================================================================
// LocalScope
// ============================================================================

/// Local scope for a function being lowered.
#[derive(Debug, Default)]
pub struct LocalScope<'ast> {
    /// Variables by name in current scope chain
    variables: FxHashMap<&'ast str, LocalVar>,

    /// Current scope depth (0 = function scope)
    scope_depth: u32,

    /// Stack of shadowed variables (shadowing_depth, name, old_var).
    /// Recorded at the depth where the shadowing happened, so the outer
    /// variable comes back when that scope exits.
    shadowed: Vec<(u32, &'ast str, LocalVar)>,
}

impl<'ast> LocalScope<'ast> {
    pub fn new() -> Self {
        Self::default()
    }

    // ==========================================================================
    // Scope Management
    // ==========================================================================

    /// Enter a new scope.
    pub fn push_scope(&mut self) {
        self.scope_depth += 1;
    }

    /// Exit the current scope, removing variables declared in it.
    pub fn pop_scope(&mut self) {
        let depth = self.scope_depth;
        self.variables.retain(|_, var| var.depth < depth);

        while self
            .shadowed
            .last()
            .is_some_and(|(shadowing_depth, _, _)| *shadowing_depth == depth)
        {
            if let Some((_, name, var)) = self.shadowed.pop() {
                self.variables.insert(name, var);
            }
        }

        self.scope_depth = depth.saturating_sub(1);
    }

    pub fn depth(&self) -> u32 {
        self.scope_depth
    }

    // ==========================================================================
    // Variables
    // ==========================================================================

    /// Bind `name` to `slot` in the current scope.
    ///
    /// A variable from an enclosing scope is shadowed and restored when this
    /// scope exits. Rebinding a name within the same scope replaces it.
    pub fn declare(&mut self, name: &'ast str, slot: ValueId, ty: IrType) {
        let var = LocalVar {
            slot,
            ty,
            depth: self.scope_depth,
        };
        if let Some(previous) = self.variables.insert(name, var)
            && previous.depth < self.scope_depth
        {
            self.shadowed.push((self.scope_depth, name, previous));
        }
    }

    pub fn get(&self, name: &str) -> Option<&LocalVar> {
        self.variables.get(name)
    }

    pub fn len(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }
}
