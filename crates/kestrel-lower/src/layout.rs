//! Field layouts of value types.
//!
//! Struct values are copied by value, so a struct holding object references
//! (directly or through nested structs) owns a count on each of them. The
//! function emitter consults [`StructLayouts`] to retain, release and clean
//! up those references field by field.

use kestrel_ast::{Decl, Semantics, TypeDecl};
use kestrel_core::DeclId;
use kestrel_ir::IrType;
use rustc_hash::FxHashMap;

use crate::types::lower_type;

/// Lowered field types of every known value type.
#[derive(Debug, Default)]
pub struct StructLayouts {
    fields: FxHashMap<DeclId, Vec<IrType>>,
}

impl StructLayouts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the layout of every value type among `decls`.
    pub fn collect<'a, 'ast: 'a>(decls: impl IntoIterator<Item = &'a Decl<'ast>>) -> Self {
        let mut layouts = Self::new();
        for decl in decls {
            if let Decl::Type(ty) = decl {
                layouts.insert(ty);
            }
        }
        layouts
    }

    /// Record `decl` if it is a value type. Classes are ignored.
    pub fn insert(&mut self, decl: &TypeDecl<'_>) {
        if decl.semantics != Semantics::Value {
            return;
        }
        let fields = decl.fields.iter().map(|f| lower_type(&f.ty)).collect();
        self.fields.insert(decl.id, fields);
    }

    pub fn fields(&self, decl: DeclId) -> Option<&[IrType]> {
        self.fields.get(&decl).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Check if a value of `ty` holds at least one counted reference.
    ///
    /// Value types cannot contain themselves, so the walk terminates.
    pub fn needs_cleanup(&self, ty: &IrType) -> bool {
        match ty {
            IrType::Object(_) => true,
            IrType::Struct(decl) => self
                .fields(*decl)
                .is_some_and(|fields| fields.iter().any(|f| self.needs_cleanup(f))),
            _ => false,
        }
    }

    /// Fields of struct `decl` that hold counted references, with their
    /// indices. Empty for unknown types.
    pub fn counted_fields(&self, decl: DeclId) -> impl Iterator<Item = (u32, &IrType)> {
        self.fields(decl)
            .unwrap_or_default()
            .iter()
            .enumerate()
            .filter(|(_, ty)| self.needs_cleanup(ty))
            .map(|(index, ty)| (index as u32, ty))
    }
}
