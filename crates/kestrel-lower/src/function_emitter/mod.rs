//! Per-function emission state.
//!
//! [`FunctionEmitter`] owns the [`IrBuilder`] for one IR function together
//! with its cleanup stack, local scopes and optional designated epilogue
//! block. It exposes one `emit_*` entry point per kind of body and
//! synthesizes the implicit control flow at the end of the function in
//! [`finish`](FunctionEmitter::finish):
//!
//! - already terminated: nothing to do
//! - still active with the unit-return convention: return `()` after
//!   running every pending cleanup
//! - still active otherwise: mark the point unreachable
//!
//! Closure literals met while lowering a body are not lowered in place;
//! they are collected and handed back to the module emitter so that only
//! one function emitter is ever active.
//!
//! # Example
//!
//! ```ignore
//! let mut emitter = FunctionEmitter::new(function, decl.result.is_unit());
//! emitter.emit_function(&decl)?;
//! let (function, closures) = emitter.finish()?;
//! ```

mod expr;
mod ownership;
mod stmt;

use std::rc::Rc;

use kestrel_ast::{
    BindingDecl, Block, ClosureExpr, ConstructorDecl, FunctionDecl, Param, Semantics, TopLevelCode,
    TypeDecl,
};
use kestrel_core::{DeclId, LoweringError};
use kestrel_ir::{BlockId, Const, IrBuilder, IrFunction, IrType, LoweringTarget, ValueId};
use rustc_hash::FxHashSet;

use crate::cleanup::{Cleanup, CleanupStack};
use crate::layout::StructLayouts;
use crate::scope::LocalScope;
use crate::types::{lower_nominal, lower_type};

type Result<T> = std::result::Result<T, LoweringError>;

/// A block that every exit of the function converges on before returning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Epilogue {
    block: BlockId,
    /// Cleanup depth the epilogue itself unwinds from.
    depth: usize,
}

/// How `self` is reachable inside the body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SelfBinding {
    /// A borrowed class instance.
    Object(ValueId),
    /// Address of a struct instance in a stack slot.
    Slot(ValueId),
}

/// Emits the body of a single IR function.
pub struct FunctionEmitter<'ast> {
    builder: IrBuilder,
    cleanups: CleanupStack,
    scope: LocalScope<'ast>,
    /// The declared result is `()`; falling off the end returns it.
    unit_return: bool,
    epilogue: Option<Epilogue>,
    self_binding: Option<SelfBinding>,
    /// Stores through `self.field` initialize rather than overwrite.
    initializing_self: bool,
    /// Fields of `self` stored on every path to the insertion point.
    initialized_fields: FxHashSet<u32>,
    layouts: Rc<StructLayouts>,
    closures: Vec<&'ast ClosureExpr<'ast>>,
}

impl<'ast> FunctionEmitter<'ast> {
    /// Create an emitter for `function`, which must be empty.
    pub fn new(function: IrFunction, unit_return: bool) -> Self {
        Self {
            builder: IrBuilder::new(function),
            cleanups: CleanupStack::new(),
            scope: LocalScope::new(),
            unit_return,
            epilogue: None,
            self_binding: None,
            initializing_self: false,
            initialized_fields: FxHashSet::default(),
            layouts: Rc::default(),
            closures: Vec::new(),
        }
    }

    /// Use `layouts` to find the references held by struct values.
    pub fn with_layouts(mut self, layouts: Rc<StructLayouts>) -> Self {
        self.layouts = layouts;
        self
    }

    /// Whether control can still reach the end of what has been emitted.
    pub fn is_active(&self) -> bool {
        self.builder.is_active()
    }

    pub fn uses_unit_return(&self) -> bool {
        self.unit_return
    }

    pub fn function(&self) -> &IrFunction {
        self.builder.function()
    }

    /// Hand over closure literals collected so far.
    pub fn take_closures(&mut self) -> Vec<&'ast ClosureExpr<'ast>> {
        std::mem::take(&mut self.closures)
    }

    // ==========================================================================
    // Entry Points
    // ==========================================================================

    /// Emit a free function body.
    pub fn emit_function(&mut self, decl: &FunctionDecl<'ast>) -> Result<()> {
        let params = self.builder.entry_params();
        self.bind_params(decl.params, &params)?;
        if let Some(body) = &decl.body {
            self.lower_block(body)?;
        }
        Ok(())
    }

    /// Emit a method body. The first entry parameter is `self`.
    pub fn emit_method(&mut self, owner: &TypeDecl<'ast>, decl: &FunctionDecl<'ast>) -> Result<()> {
        let params = self.builder.entry_params();
        let Some((&receiver, rest)) = params.split_first() else {
            return Err(LoweringError::MissingSelf { span: decl.span });
        };
        self.bind_self(owner, receiver)?;
        self.bind_params(decl.params, rest)?;
        if let Some(body) = &decl.body {
            self.lower_block(body)?;
        }
        Ok(())
    }

    /// Emit the allocating entry point of a class constructor.
    ///
    /// Obtains storage, hands it to the initializer together with the
    /// arguments, and returns the new instance.
    pub fn emit_class_constructor_allocator(
        &mut self,
        owner: &TypeDecl<'ast>,
        ctor: &ConstructorDecl<'ast>,
    ) -> Result<()> {
        let object = self.builder.emit_alloc_object(owner.id)?;
        let mut args = Vec::with_capacity(ctor.params.len() + 1);
        args.push(object);
        args.extend(self.builder.entry_params());
        self.builder
            .emit_call(LoweringTarget::initializer(ctor.id), args, IrType::Unit)?;
        self.cleanups
            .emit_return_and_cleanups(&mut self.builder, object)
    }

    /// Emit the initializing half of a class constructor.
    pub fn emit_class_constructor_initializer(
        &mut self,
        owner: &TypeDecl<'ast>,
        ctor: &ConstructorDecl<'ast>,
    ) -> Result<()> {
        let params = self.builder.entry_params();
        let Some((&receiver, rest)) = params.split_first() else {
            return Err(LoweringError::MissingSelf { span: ctor.span });
        };
        self.bind_self(owner, receiver)?;
        self.bind_params(ctor.params, rest)?;
        self.initializing_self = true;
        if let Some(body) = &ctor.body {
            self.lower_block(body)?;
        }
        Ok(())
    }

    /// Emit a value-type constructor.
    ///
    /// The instance lives in a stack slot; every exit converges on a
    /// designated epilogue block that loads it, runs the shared cleanups and
    /// returns it.
    pub fn emit_value_constructor(
        &mut self,
        owner: &TypeDecl<'ast>,
        ctor: &ConstructorDecl<'ast>,
    ) -> Result<()> {
        let slot = self.builder.emit_alloc_stack(IrType::Struct(owner.id))?;
        self.self_binding = Some(SelfBinding::Slot(slot));
        let params = self.builder.entry_params();
        self.bind_params(ctor.params, &params)?;
        self.initializing_self = true;

        let block = self.builder.create_block();
        self.epilogue = Some(Epilogue {
            block,
            depth: self.cleanups.depth(),
        });

        if let Some(body) = &ctor.body {
            self.lower_block(body)?;
        }
        if self.builder.is_active() {
            self.builder.emit_jump(block, Vec::new())?;
        }

        self.builder.position_at(block)?;
        let instance = self.builder.emit_load(slot)?;
        self.cleanups
            .emit_return_and_cleanups(&mut self.builder, instance)
    }

    /// Emit a closure body.
    pub fn emit_closure(&mut self, closure: &ClosureExpr<'ast>) -> Result<()> {
        let params = self.builder.entry_params();
        self.bind_params(closure.params, &params)?;
        self.lower_block(&closure.body)
    }

    /// Emit a class destructor.
    ///
    /// Deallocation of `self` is pushed first and a release of every
    /// reference held by a field after it, so falling off the end releases
    /// fields in reverse declaration order and then frees the instance.
    pub fn emit_destructor(&mut self, owner: &TypeDecl<'ast>) -> Result<()> {
        let params = self.builder.entry_params();
        let Some(&receiver) = params.first() else {
            return Err(LoweringError::MissingSelf { span: owner.span });
        };
        self.self_binding = Some(SelfBinding::Object(receiver));

        self.cleanups.push(Cleanup::Dealloc { object: receiver });
        for (index, field) in owner.fields.iter().enumerate() {
            let ty = lower_type(&field.ty);
            let field = index as u32;
            match ty {
                IrType::Object(_) => self.cleanups.push(Cleanup::ReleaseField {
                    object: receiver,
                    field,
                    ty,
                }),
                IrType::Struct(_) if self.needs_cleanup(&ty) => {
                    let addr = self.builder.emit_field_addr(receiver, field, ty.clone())?;
                    self.push_release_cleanups(addr, &ty)?;
                }
                _ => {}
            }
        }

        if let Some(destructor) = &owner.destructor {
            self.lower_block(&destructor.body)?;
        }
        Ok(())
    }

    /// Lower a top-level binding's initializer into the top-level function.
    pub fn emit_top_level_binding(&mut self, binding: &BindingDecl<'ast>) -> Result<()> {
        let Some(init) = binding.init else {
            return Ok(());
        };
        let Some(value) = self.lower_expr(init)? else {
            return Ok(());
        };
        let addr = self
            .builder
            .emit_global_addr(binding.var.id, lower_type(&binding.var.ty))?;
        self.builder.emit_store(addr, value)
    }

    /// Lower script-mode statements into the top-level function.
    ///
    /// Bindings introduced here stay in scope for later top-level code, and
    /// their cleanups run in the final epilogue.
    pub fn emit_top_level_code(&mut self, code: &TopLevelCode<'ast>) -> Result<()> {
        self.lower_stmts(code.stmts)
    }

    // ==========================================================================
    // Epilogue
    // ==========================================================================

    /// Synthesize the implicit end of the function and hand back the result
    /// together with any closure literals still queued.
    pub fn finish(mut self) -> Result<(IrFunction, Vec<&'ast ClosureExpr<'ast>>)> {
        self.emit_epilogue()?;
        Ok((self.builder.finish(), self.closures))
    }

    fn emit_epilogue(&mut self) -> Result<()> {
        if !self.builder.is_active() {
            return Ok(());
        }

        if self.unit_return {
            if self.epilogue.is_some() {
                return Err(LoweringError::UnconvergedEpilogue {
                    function: self.builder.name().to_string(),
                });
            }
            let unit = self.builder.emit_const(Const::Unit)?;
            self.cleanups
                .emit_return_and_cleanups(&mut self.builder, unit)
        } else {
            self.builder.emit_unreachable()
        }
    }

    // ==========================================================================
    // Bindings
    // ==========================================================================

    fn bind_self(&mut self, owner: &TypeDecl<'ast>, receiver: ValueId) -> Result<()> {
        let binding = match owner.semantics {
            Semantics::Reference => SelfBinding::Object(receiver),
            Semantics::Value => {
                let slot = self
                    .builder
                    .emit_alloc_stack(lower_nominal(&owner.nominal()))?;
                self.builder.emit_store(slot, receiver)?;
                SelfBinding::Slot(slot)
            }
        };
        self.self_binding = Some(binding);
        Ok(())
    }

    /// Give each parameter a stack slot. References held by parameters are
    /// owned by the callee and released on exit.
    fn bind_params(&mut self, params: &'ast [Param<'ast>], values: &[ValueId]) -> Result<()> {
        for (param, &value) in params.iter().zip(values) {
            let ty = lower_type(&param.ty);
            let slot = self.builder.emit_alloc_stack(ty.clone())?;
            self.builder.emit_store(slot, value)?;
            self.push_release_cleanups(slot, &ty)?;
            self.scope.declare(param.name, slot, ty);
        }
        Ok(())
    }

    // ==========================================================================
    // Scopes
    // ==========================================================================

    /// Lower a block in a fresh scope.
    fn lower_block(&mut self, block: &Block<'ast>) -> Result<()> {
        let depth = self.enter_scope();
        self.lower_stmts(block.stmts)?;
        self.exit_scope(depth)
    }

    fn enter_scope(&mut self) -> usize {
        self.scope.push_scope();
        self.cleanups.depth()
    }

    fn exit_scope(&mut self, depth: usize) -> Result<()> {
        self.cleanups.pop_to(depth, &mut self.builder)?;
        self.scope.pop_scope();
        Ok(())
    }

    /// Return from the function, routing through the designated epilogue
    /// if there is one.
    fn emit_exit(&mut self, value: Option<ValueId>) -> Result<()> {
        match self.epilogue {
            Some(epilogue) => {
                self.cleanups
                    .emit_cleanups_to(epilogue.depth, &mut self.builder)?;
                self.builder.emit_jump(epilogue.block, Vec::new())
            }
            None => {
                let value = match value {
                    Some(value) => value,
                    None => self.builder.emit_const(Const::Unit)?,
                };
                self.cleanups
                    .emit_return_and_cleanups(&mut self.builder, value)
            }
        }
    }

    fn queue_closure(&mut self, closure: &'ast ClosureExpr<'ast>) -> DeclId {
        self.closures.push(closure);
        closure.id
    }
}
