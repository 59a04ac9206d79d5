//! Kestrel
//!
//! Lowering of type-checked Kestrel compilation units into a verified,
//! block-structured IR.
//!
//! The work is split across the workspace crates and re-exported here:
//!
//! - `kestrel-core`: spans, declaration ids, symbol hashes, error types
//! - `kestrel-ast`: the type-checked tree consumed by lowering
//! - `kestrel-ir`: IR functions, the builder, the verifier and modules
//! - `kestrel-lower`: the module and function emitters
//!
//! # Example
//!
//! ```
//! use kestrel::prelude::*;
//!
//! let unit = CompilationUnit::new(UnitKind::Main, &[]);
//! let module = construct_module(&unit, 0).unwrap();
//! assert_eq!(module.top_level().map(|f| f.name()), Some("main"));
//! ```

pub use kestrel_ast as ast;
pub use kestrel_core as core;
pub use kestrel_ir as ir;
pub use kestrel_lower as lower;

pub use kestrel_core::{DeclId, LoweringError, Span, SymbolHash, VerifyError};
pub use kestrel_ir::{IrFunction, IrModule, LoweringTarget, TargetKind};
pub use kestrel_lower::{
    LoweringOptions, construct_module, construct_module_with_options, lower_into_module,
};

pub mod prelude {
    pub use kestrel_ast::{CheckStage, CompilationUnit, Decl, ImportedModule, UnitKind};
    pub use kestrel_core::{DeclId, LoweringError, Span};
    pub use kestrel_ir::{FunctionAttrs, IrFunction, IrModule, LoweringTarget, TargetKind};
    pub use kestrel_lower::{
        LoweringOptions, construct_module, construct_module_with_options, lower_into_module,
    };
}
