//! Kestrel Core
//!
//! Shared vocabulary for the lowering pipeline: source spans, declaration
//! identity, deterministic symbol hashes, and the error hierarchy.

mod decl_id;
pub mod error;
mod span;
mod symbol_hash;

pub use decl_id::DeclId;
pub use error::{LoweringError, VerifyError};
pub use span::Span;
pub use symbol_hash::{SymbolHash, symbol_domains};
