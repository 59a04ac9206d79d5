//! Lowering of type-checked Kestrel declarations into IR.
//!
//! The crate is organized bottom-up:
//!
//! - [`CleanupStack`]: scope-exit actions replayed on every exit path
//! - [`StructLayouts`]: which fields of a value type hold references
//! - [`FunctionEmitter`]: lowers the body of one function
//! - [`ModuleEmitter`]: decides which functions each declaration produces
//! - [`construct_module`] / [`lower_into_module`]: entry points
//!
//! # Example
//!
//! ```
//! use kestrel_ast::{CompilationUnit, UnitKind};
//! use kestrel_lower::construct_module;
//!
//! let unit = CompilationUnit::new(UnitKind::Main, &[]);
//! let module = construct_module(&unit, 0).unwrap();
//! assert!(module.top_level().is_some());
//! ```

mod cleanup;
mod driver;
mod function_emitter;
mod layout;
mod module_emitter;
mod options;
mod scope;
pub mod types;

pub use cleanup::{Cleanup, CleanupStack};
pub use driver::{construct_module, construct_module_with_options, lower_into_module};
pub use function_emitter::FunctionEmitter;
pub use layout::StructLayouts;
pub use module_emitter::ModuleEmitter;
pub use options::LoweringOptions;
pub use scope::{LocalScope, LocalVar};
