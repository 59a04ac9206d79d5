//! Reference counting of lowered values.
//!
//! Objects are retained and released directly. Struct values are walked
//! field by field through [`StructLayouts`](crate::layout::StructLayouts),
//! touching only the fields that hold counted references.

use std::rc::Rc;

use kestrel_ir::{IrType, ValueId};

use super::{FunctionEmitter, Result};
use crate::cleanup::Cleanup;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CountOp {
    Retain,
    Release,
}

impl<'ast> FunctionEmitter<'ast> {
    /// Take a count on every reference held by `value`.
    pub(super) fn retain_value(&mut self, value: ValueId, ty: &IrType) -> Result<()> {
        self.adjust_count(value, ty, CountOp::Retain)
    }

    /// Drop the counts held by `value`, which is consumed.
    pub(super) fn release_value(&mut self, value: ValueId, ty: &IrType) -> Result<()> {
        self.adjust_count(value, ty, CountOp::Release)
    }

    fn adjust_count(&mut self, value: ValueId, ty: &IrType, op: CountOp) -> Result<()> {
        match ty {
            IrType::Object(_) => match op {
                CountOp::Retain => self.builder.emit_retain(value),
                CountOp::Release => self.builder.emit_release(value),
            },
            IrType::Struct(decl) => {
                let layouts = Rc::clone(&self.layouts);
                for (index, field_ty) in layouts.counted_fields(*decl) {
                    let field = self
                        .builder
                        .emit_extract_field(value, index, field_ty.clone())?;
                    self.adjust_count(field, field_ty, op)?;
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }

    /// Check if values of `ty` hold counted references.
    pub(super) fn needs_cleanup(&self, ty: &IrType) -> bool {
        self.layouts.needs_cleanup(ty)
    }

    /// Register releases for the references stored at `addr` when the
    /// current scope exits.
    ///
    /// Struct storage gets one entry per counted field, innermost last, so
    /// fields are released in reverse declaration order.
    pub(super) fn push_release_cleanups(&mut self, addr: ValueId, ty: &IrType) -> Result<()> {
        match ty {
            IrType::Object(_) => {
                self.cleanups.push(Cleanup::ReleaseSlot { slot: addr });
                Ok(())
            }
            IrType::Struct(decl) => {
                let layouts = Rc::clone(&self.layouts);
                for (index, field_ty) in layouts.counted_fields(*decl) {
                    let field = self.builder.emit_field_addr(addr, index, field_ty.clone())?;
                    self.push_release_cleanups(field, field_ty)?;
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::StructLayouts;
    use kestrel_ast::{FieldDecl, NominalType, Semantics, Type, TypeDecl};
    use kestrel_core::{DeclId, Span, SymbolHash};
    use kestrel_ir::{FunctionType, Instr, IrFunction};

    fn layouts() -> Rc<StructLayouts> {
        let node = Type::Nominal(NominalType {
            decl: DeclId(9),
            name: "Node",
            semantics: Semantics::Reference,
        });
        let fields = [
            FieldDecl {
                name: "head",
                ty: node,
                span: Span::default(),
            },
            FieldDecl {
                name: "len",
                ty: Type::Int,
                span: Span::default(),
            },
            FieldDecl {
                name: "tail",
                ty: node,
                span: Span::default(),
            },
        ];
        let mut layouts = StructLayouts::new();
        layouts.insert(&TypeDecl {
            id: DeclId(1),
            name: "Pair",
            semantics: Semantics::Value,
            fields: &fields,
            constructors: &[],
            methods: &[],
            destructor: None,
            span: Span::default(),
        });
        Rc::new(layouts)
    }

    fn emitter() -> FunctionEmitter<'static> {
        let function = IrFunction::new(
            "f",
            SymbolHash(1),
            FunctionType::new(vec![IrType::Struct(DeclId(1))], IrType::Unit),
        );
        FunctionEmitter::new(function, true).with_layouts(layouts())
    }

    #[test]
    fn releasing_a_struct_releases_each_reference_field() {
        let mut emitter = emitter();
        let pair = emitter.builder.entry_params()[0];
        emitter
            .release_value(pair, &IrType::Struct(DeclId(1)))
            .unwrap();

        let instrs: Vec<_> = emitter.function().instrs().cloned().collect();
        let extracted: Vec<u32> = instrs
            .iter()
            .filter_map(|i| match i {
                Instr::ExtractField { field, .. } => Some(*field),
                _ => None,
            })
            .collect();
        assert_eq!(extracted, vec![0, 2]);
        let releases = instrs
            .iter()
            .filter(|i| matches!(i, Instr::Release { .. }))
            .count();
        assert_eq!(releases, 2);
    }

    #[test]
    fn struct_slots_get_one_cleanup_per_reference_field() {
        let mut emitter = emitter();
        let slot = emitter
            .builder
            .emit_alloc_stack(IrType::Struct(DeclId(1)))
            .unwrap();
        emitter
            .push_release_cleanups(slot, &IrType::Struct(DeclId(1)))
            .unwrap();
        assert_eq!(emitter.cleanups.depth(), 2);

        emitter.push_release_cleanups(slot, &IrType::Int).unwrap();
        assert_eq!(emitter.cleanups.depth(), 2);
    }
}
