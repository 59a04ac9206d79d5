//! Module-level emission.
//!
//! [`ModuleEmitter`] decides, per declaration, which IR functions to
//! produce and wraps each one in the same protocol:
//!
//! 1. pre-emit: reject a target that is already in the module, allocate the
//!    empty function with its resolved type, log what is being lowered
//! 2. a [`FunctionEmitter`] runs to completion
//! 3. post-emit: verify the function and register it under its target
//!
//! It also owns the persistent top-level context of script-mode units,
//! which is finished and verified once in [`finish`](ModuleEmitter::finish).
//!
//! ```text
//! Decl::Function ─► function               (skipped without a body)
//! Decl::Type     ─► class ctor: allocator + initializer
//!                   struct ctor: one function
//!                   methods: one function each
//!                   class: one destructor, declared or synthesized
//! Decl::Var      ─► module global
//! Decl::Binding  ─► module global + initializer into the top level
//! TopLevelCode   ─► statements into the top level
//! ```

use std::collections::VecDeque;
use std::rc::Rc;

use kestrel_ast::{
    BindingDecl, ClosureExpr, ConstructorDecl, Decl, FunctionDecl, Semantics, TopLevelCode, Type,
    TypeDecl, VarDecl,
};
use kestrel_core::{LoweringError, Span, SymbolHash, symbol_domains};
use kestrel_ir::{
    FunctionAttrs, FunctionType, IrFunction, IrGlobal, IrModule, IrType, LoweringTarget,
};

use crate::function_emitter::FunctionEmitter;
use crate::layout::StructLayouts;
use crate::options::LoweringOptions;
use crate::types::{lower_type, method_signature, signature};

type Result<T> = std::result::Result<T, LoweringError>;

/// The AST node a function is lowered from, for diagnostics.
#[derive(Debug, Clone, Copy)]
enum SourceNode<'ast> {
    Function(&'ast FunctionDecl<'ast>),
    Constructor(&'ast ConstructorDecl<'ast>),
    Destructor(&'ast TypeDecl<'ast>),
    Closure(&'ast ClosureExpr<'ast>),
}

impl SourceNode<'_> {
    fn span(&self) -> Span {
        match self {
            SourceNode::Function(d) => d.span,
            SourceNode::Constructor(d) => d.span,
            SourceNode::Destructor(d) => d.destructor.map_or(d.span, |dtor| dtor.span),
            SourceNode::Closure(c) => c.span,
        }
    }
}

/// The target whose presence means an external definition was already
/// lowered, by an earlier import or an earlier increment.
fn primary_target(decl: &Decl<'_>) -> Option<LoweringTarget> {
    match decl {
        Decl::Function(f) if !f.is_prototype() => Some(LoweringTarget::function(f.id)),
        Decl::Type(t) if t.is_class() => Some(LoweringTarget::destructor(t.id)),
        Decl::Type(t) => t
            .constructors
            .iter()
            .find(|c| c.body.is_some())
            .map(|c| LoweringTarget::function(c.id))
            .or_else(|| {
                t.methods
                    .iter()
                    .find(|m| !m.is_prototype())
                    .map(|m| LoweringTarget::function(m.id))
            }),
        _ => None,
    }
}

/// Lowers the declarations of one compilation unit into an [`IrModule`].
pub struct ModuleEmitter<'m, 'ast> {
    module: &'m mut IrModule,
    options: &'m LoweringOptions,
    /// Present for program-entry and interactive units.
    top_level: Option<FunctionEmitter<'ast>>,
    /// Closure literals waiting for their own function.
    pending_closures: VecDeque<&'ast ClosureExpr<'ast>>,
    /// Added to every function emitted by the current visit.
    extra_attrs: FunctionAttrs,
    layouts: Rc<StructLayouts>,
}

impl<'m, 'ast> ModuleEmitter<'m, 'ast> {
    /// Create an emitter bound to `module`.
    ///
    /// With `has_top_level`, an empty top-level function is started and
    /// kept open across declarations.
    pub fn new(
        module: &'m mut IrModule,
        options: &'m LoweringOptions,
        has_top_level: bool,
    ) -> Self {
        let top_level = has_top_level.then(|| {
            let name = options.top_level_name.as_str();
            let function = IrFunction::new(
                name,
                SymbolHash::from_name(symbol_domains::TOP_LEVEL, name),
                FunctionType::new(Vec::new(), IrType::Unit),
            )
            .with_attrs(FunctionAttrs::TOP_LEVEL);
            FunctionEmitter::new(function, true)
        });

        Self {
            module,
            options,
            top_level,
            pending_closures: VecDeque::new(),
            extra_attrs: FunctionAttrs::empty(),
            layouts: Rc::default(),
        }
    }

    /// Use `layouts` for every function emitted from now on, including the
    /// top level.
    pub fn with_layouts(mut self, layouts: StructLayouts) -> Self {
        self.layouts = Rc::new(layouts);
        if let Some(top_level) = self.top_level.take() {
            self.top_level = Some(top_level.with_layouts(Rc::clone(&self.layouts)));
        }
        self
    }

    pub fn has_top_level(&self) -> bool {
        self.top_level.is_some()
    }

    pub fn module(&self) -> &IrModule {
        &*self.module
    }

    // ==========================================================================
    // Declaration Dispatch
    // ==========================================================================

    /// Lower one declaration and every closure literal it contains.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn visit_decl(&mut self, decl: &'ast Decl<'ast>) -> Result<()> {
        match decl {
            Decl::Function(f) => self.emit_function(f)?,
            Decl::Type(t) => self.emit_type(t)?,
            Decl::Var(v) => self.register_global(v),
            Decl::Binding(b) => self.visit_binding(b)?,
            Decl::TopLevelCode(code) => self.visit_top_level_code(code)?,
        }
        self.drain_closures()
    }

    /// Lower a definition imported from another module.
    ///
    /// Skipped when its primary target is already in the module. Functions
    /// produced here are marked [`FunctionAttrs::EXTERNAL`].
    pub fn emit_external_definition(&mut self, decl: &'ast Decl<'ast>) -> Result<()> {
        if let Some(target) = primary_target(decl)
            && self.module.has_function(&target)
        {
            tracing::trace!(%target, name = decl.name(), "external definition already lowered");
            return Ok(());
        }

        let saved = self.extra_attrs;
        self.extra_attrs |= FunctionAttrs::EXTERNAL;
        let result = match decl {
            // Initializers run in the module that defines the global.
            Decl::Binding(b) => {
                self.register_global(&b.var);
                Ok(())
            }
            Decl::TopLevelCode(_) => {
                tracing::warn!("ignoring top-level code in an external definition");
                Ok(())
            }
            _ => self.visit_decl(decl),
        };
        self.extra_attrs = saved;
        result
    }

    pub fn emit_function(&mut self, decl: &'ast FunctionDecl<'ast>) -> Result<()> {
        if decl.is_prototype() {
            tracing::trace!(name = decl.name, "skipping prototype");
            return Ok(());
        }

        let target = LoweringTarget::function(decl.id);
        let function = self.pre_emit(
            target,
            decl.name.to_string(),
            signature(decl.params, &decl.result),
            FunctionAttrs::empty(),
            SourceNode::Function(decl),
        )?;
        let mut emitter = self.function_emitter(function, decl.result.is_unit());
        emitter.emit_function(decl)?;
        self.post_emit(target, emitter)
    }

    pub fn emit_type(&mut self, decl: &'ast TypeDecl<'ast>) -> Result<()> {
        for ctor in decl.constructors {
            self.emit_constructor(decl, ctor)?;
        }
        for method in decl.methods {
            self.emit_method(decl, method)?;
        }
        if decl.is_class() {
            self.emit_destructor(decl)?;
        }
        Ok(())
    }

    /// Class constructors split into an allocator and an initializer;
    /// struct constructors produce a single function.
    pub fn emit_constructor(
        &mut self,
        owner: &'ast TypeDecl<'ast>,
        ctor: &'ast ConstructorDecl<'ast>,
    ) -> Result<()> {
        if ctor.body.is_none() {
            tracing::trace!(owner = owner.name, "skipping constructor prototype");
            return Ok(());
        }
        let instance = Type::Nominal(owner.nominal());

        match owner.semantics {
            Semantics::Reference => {
                let target = LoweringTarget::allocator(ctor.id);
                let function = self.pre_emit(
                    target,
                    format!("{}.init.allocator", owner.name),
                    signature(ctor.params, &instance),
                    FunctionAttrs::CONSTRUCTOR,
                    SourceNode::Constructor(ctor),
                )?;
                let mut emitter = self.function_emitter(function, true);
                emitter.emit_class_constructor_allocator(owner, ctor)?;
                self.post_emit(target, emitter)?;

                let target = LoweringTarget::initializer(ctor.id);
                let function = self.pre_emit(
                    target,
                    format!("{}.init.initializer", owner.name),
                    method_signature(&owner.nominal(), ctor.params, IrType::Unit),
                    FunctionAttrs::CONSTRUCTOR,
                    SourceNode::Constructor(ctor),
                )?;
                let mut emitter = self.function_emitter(function, true);
                emitter.emit_class_constructor_initializer(owner, ctor)?;
                self.post_emit(target, emitter)
            }
            Semantics::Value => {
                let target = LoweringTarget::function(ctor.id);
                let function = self.pre_emit(
                    target,
                    format!("{}.init", owner.name),
                    signature(ctor.params, &instance),
                    FunctionAttrs::CONSTRUCTOR,
                    SourceNode::Constructor(ctor),
                )?;
                let mut emitter = self.function_emitter(function, true);
                emitter.emit_value_constructor(owner, ctor)?;
                self.post_emit(target, emitter)
            }
        }
    }

    pub fn emit_method(
        &mut self,
        owner: &'ast TypeDecl<'ast>,
        decl: &'ast FunctionDecl<'ast>,
    ) -> Result<()> {
        if decl.is_prototype() {
            tracing::trace!(
                owner = owner.name,
                name = decl.name,
                "skipping method prototype"
            );
            return Ok(());
        }

        let target = LoweringTarget::function(decl.id);
        let function = self.pre_emit(
            target,
            format!("{}.{}", owner.name, decl.name),
            method_signature(&owner.nominal(), decl.params, lower_type(&decl.result)),
            FunctionAttrs::empty(),
            SourceNode::Function(decl),
        )?;
        let mut emitter = self.function_emitter(function, decl.result.is_unit());
        emitter.emit_method(owner, decl)?;
        self.post_emit(target, emitter)
    }

    /// Every class gets exactly one destructor; without a declared one the
    /// body is synthesized and only runs the implicit cleanups.
    pub fn emit_destructor(&mut self, owner: &'ast TypeDecl<'ast>) -> Result<()> {
        let mut attrs = FunctionAttrs::DESTRUCTOR;
        if owner.destructor.is_none() {
            attrs |= FunctionAttrs::SYNTHESIZED;
        }

        let target = LoweringTarget::destructor(owner.id);
        let function = self.pre_emit(
            target,
            format!("{}.deinit", owner.name),
            method_signature(&owner.nominal(), &[], IrType::Unit),
            attrs,
            SourceNode::Destructor(owner),
        )?;
        let mut emitter = self.function_emitter(function, true);
        emitter.emit_destructor(owner)?;
        self.post_emit(target, emitter)
    }

    /// Closures follow their own result type; there is no implicit unit
    /// return.
    pub fn emit_closure(&mut self, closure: &'ast ClosureExpr<'ast>) -> Result<()> {
        let target = LoweringTarget::closure(closure.id);
        let function = self.pre_emit(
            target,
            format!("closure{}", closure.id),
            signature(closure.params, &closure.result),
            FunctionAttrs::CLOSURE,
            SourceNode::Closure(closure),
        )?;
        let mut emitter = self.function_emitter(function, false);
        emitter.emit_closure(closure)?;
        self.post_emit(target, emitter)
    }

    fn register_global(&mut self, var: &VarDecl<'ast>) {
        let global = IrGlobal {
            name: var.name.to_string(),
            ty: lower_type(&var.ty),
        };
        if !self.module.add_global(var.id, global) {
            tracing::trace!(name = var.name, "global already registered");
        }
        // TODO: synthesize accessors for globals visible outside the module
        // once their calling convention is settled.
    }

    fn visit_binding(&mut self, binding: &'ast BindingDecl<'ast>) -> Result<()> {
        self.register_global(&binding.var);

        let Some(top_level) = self.top_level.as_mut() else {
            if binding.init.is_some() {
                tracing::debug!(
                    name = binding.var.name,
                    "binding initializer outside a top-level context is not emitted"
                );
            }
            return Ok(());
        };
        if !top_level.is_active() {
            tracing::debug!(
                name = binding.var.name,
                "skipping unreachable top-level binding"
            );
            return Ok(());
        }
        top_level.emit_top_level_binding(binding)
    }

    fn visit_top_level_code(&mut self, code: &'ast TopLevelCode<'ast>) -> Result<()> {
        let Some(top_level) = self.top_level.as_mut() else {
            tracing::warn!(span = %code.span, "ignoring top-level code in a library unit");
            return Ok(());
        };
        if !top_level.is_active() {
            tracing::debug!(span = %code.span, "skipping unreachable top-level code");
            return Ok(());
        }
        top_level.emit_top_level_code(code)
    }

    // ==========================================================================
    // Emission Protocol
    // ==========================================================================

    fn function_emitter(&self, function: IrFunction, unit_return: bool) -> FunctionEmitter<'ast> {
        FunctionEmitter::new(function, unit_return)
            .with_layouts(Rc::clone(&self.layouts))
    }

    fn pre_emit(
        &self,
        target: LoweringTarget,
        name: String,
        ty: FunctionType,
        attrs: FunctionAttrs,
        node: SourceNode<'ast>,
    ) -> Result<IrFunction> {
        if self.module.has_function(&target) {
            return Err(LoweringError::DuplicateTarget {
                target: target.to_string(),
            });
        }

        tracing::debug!(%target, %name, %ty, span = %node.span(), "emitting function");
        tracing::trace!(?node, "source");

        Ok(IrFunction::new(name, target.symbol(), ty).with_attrs(attrs | self.extra_attrs))
    }

    #[cfg_attr(feature = "profiling", profiling::function)]
    fn post_emit(&mut self, target: LoweringTarget, emitter: FunctionEmitter<'ast>) -> Result<()> {
        let (function, closures) = emitter.finish()?;
        function.verify()?;

        if self.options.dump_ir {
            tracing::debug!(%target, "lowered:\n{}", function);
        }

        self.module.insert_function(target, function)?;
        self.pending_closures.extend(closures);
        Ok(())
    }

    fn drain_closures(&mut self) -> Result<()> {
        if let Some(top_level) = self.top_level.as_mut() {
            self.pending_closures.extend(top_level.take_closures());
        }
        while let Some(closure) = self.pending_closures.pop_front() {
            self.emit_closure(closure)?;
        }
        Ok(())
    }

    /// Close the top-level function, verify it, and install it in the module.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn finish(mut self) -> Result<()> {
        let Some(top_level) = self.top_level.take() else {
            return Ok(());
        };

        let (function, closures) = top_level.finish()?;
        self.pending_closures.extend(closures);
        self.drain_closures()?;
        function.verify()?;

        if self.options.dump_ir {
            tracing::debug!("lowered top level:\n{}", function);
        }
        if self.module.set_top_level(function).is_some() {
            tracing::debug!("replaced top-level function of a previous increment");
        }
        Ok(())
    }
}
