//! Compilation units and imported definitions.

use crate::decl::Decl;

/// What kind of program a compilation unit belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnitKind {
    /// A library: declarations only, no sequential entry point.
    Library,
    /// A program entry point.
    Main,
    /// An interactive session, compiled incrementally.
    Repl,
}

impl UnitKind {
    /// Whether units of this kind execute file-scope code through a
    /// top-level function.
    #[inline]
    pub fn has_top_level(&self) -> bool {
        !matches!(self, UnitKind::Library)
    }
}

/// How far an external definition has progressed through checking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CheckStage {
    /// Names resolved, types not yet checked.
    NameBound,
    /// Fully type-checked.
    TypeChecked,
}

/// A declaration pulled in from a foreign module.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExternalDefinition<'ast> {
    pub stage: CheckStage,
    pub decl: &'ast Decl<'ast>,
}

/// A foreign module imported by the unit, with the definitions it
/// contributes transitively.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImportedModule<'ast> {
    pub name: &'ast str,
    pub definitions: &'ast [ExternalDefinition<'ast>],
}

/// A type-checked compilation unit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompilationUnit<'ast> {
    pub kind: UnitKind,
    /// Declarations in source order
    pub decls: &'ast [Decl<'ast>],
    pub imports: &'ast [ImportedModule<'ast>],
}

impl<'ast> CompilationUnit<'ast> {
    /// Create a unit with no imports.
    pub fn new(kind: UnitKind, decls: &'ast [Decl<'ast>]) -> Self {
        Self {
            kind,
            decls,
            imports: &[],
        }
    }

    /// Attach imported modules.
    pub fn with_imports(mut self, imports: &'ast [ImportedModule<'ast>]) -> Self {
        self.imports = imports;
        self
    }

    /// Iterate over every external definition across all imports, in
    /// import order.
    pub fn external_definitions(&self) -> impl Iterator<Item = &'ast ExternalDefinition<'ast>> {
        self.imports
            .iter()
            .flat_map(|module| module.definitions.iter())
    }
}
