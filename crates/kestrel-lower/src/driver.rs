//! Entry points that lower a type-checked compilation unit.

use kestrel_ast::{CheckStage, CompilationUnit};
use kestrel_core::LoweringError;
use kestrel_ir::IrModule;

use crate::layout::StructLayouts;
use crate::module_emitter::ModuleEmitter;
use crate::options::LoweringOptions;

/// Lower `unit` into a fresh module with default options.
///
/// Declarations before `start` are ignored; pass `0` for a whole unit.
pub fn construct_module(
    unit: &CompilationUnit<'_>,
    start: usize,
) -> Result<IrModule, LoweringError> {
    construct_module_with_options(unit, start, &LoweringOptions::default())
}

pub fn construct_module_with_options(
    unit: &CompilationUnit<'_>,
    start: usize,
    options: &LoweringOptions,
) -> Result<IrModule, LoweringError> {
    let mut module = IrModule::new();
    lower_into_module(&mut module, unit, start, options)?;
    Ok(module)
}

/// Lower the declarations of `unit` from `start` on into an existing module.
///
/// Interactive sessions call this once per increment with the index of the
/// first new declaration. Functions lowered by earlier increments stay in
/// the module; lowering any of them again is a
/// [`LoweringError::DuplicateTarget`].
#[cfg_attr(feature = "profiling", profiling::function)]
pub fn lower_into_module<'ast>(
    module: &mut IrModule,
    unit: &CompilationUnit<'ast>,
    start: usize,
    options: &LoweringOptions,
) -> Result<(), LoweringError> {
    let Some(pending) = unit.decls.get(start..) else {
        return Err(LoweringError::StartIndexOutOfRange {
            start,
            len: unit.decls.len(),
        });
    };

    tracing::debug!(
        kind = ?unit.kind,
        start,
        count = pending.len(),
        "lowering compilation unit"
    );

    // Earlier increments and imports may declare the value types used here.
    let imported = unit.external_definitions().map(|external| external.decl);
    let layouts = StructLayouts::collect(unit.decls.iter().chain(imported));
    let mut emitter = ModuleEmitter::new(module, options, unit.kind.has_top_level())
        .with_layouts(layouts);
    for decl in pending {
        emitter.visit_decl(decl)?;
    }

    if options.emit_external_definitions {
        for external in unit.external_definitions() {
            match external.stage {
                CheckStage::NameBound => {
                    return Err(LoweringError::UncheckedExternal {
                        name: external.decl.name().to_string(),
                    });
                }
                CheckStage::TypeChecked => emitter.emit_external_definition(external.decl)?,
            }
        }
    }

    emitter.finish()
}
