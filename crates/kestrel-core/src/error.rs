//! Error types for the lowering pipeline.
//!
//! Lowering receives fully type-checked input, so it never reports user
//! diagnostics. Every error here is an internal-consistency fault: it means
//! the upstream contract was broken or the lowering logic itself is wrong,
//! and it aborts the run that produced it.
//!
//! ## Error Hierarchy
//!
//! ```text
//! LoweringError         - faults raised while emitting a module
//! └── Verification      - wraps a VerifyError for a finished function
//! VerifyError           - structural defects found in lowered IR
//! ```

use thiserror::Error;

use crate::Span;

// ============================================================================
// Verification Errors
// ============================================================================

/// Structural defects found by the IR verifier.
///
/// Blocks and values are reported by their raw indices (`bb3`, `%7`).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VerifyError {
    /// The function has no blocks at all.
    #[error("function '{function}' has no blocks")]
    EmptyFunction { function: String },

    /// A block was left without a terminator.
    #[error("function '{function}': block bb{block} has no terminator")]
    MissingTerminator { function: String, block: u32 },

    /// A terminator names a block that does not exist.
    #[error("function '{function}': block bb{block} branches to undefined block bb{target}")]
    UndefinedBlock {
        function: String,
        block: u32,
        target: u32,
    },

    /// A jump passes the wrong number of block arguments.
    #[error(
        "function '{function}': block bb{block} passes {found} argument(s) to bb{target}, which takes {expected}"
    )]
    BlockArgumentCount {
        function: String,
        block: u32,
        target: u32,
        expected: usize,
        found: usize,
    },

    /// An instruction or terminator reads a value that is never defined.
    #[error("function '{function}': block bb{block} uses undefined value %{value}")]
    UndefinedValue {
        function: String,
        block: u32,
        value: u32,
    },

    /// A value is defined by more than one instruction or parameter.
    #[error("function '{function}': value %{value} is defined more than once")]
    ValueRedefined { function: String, value: u32 },

    /// Operand or result types disagree.
    #[error("function '{function}': block bb{block}: {message}")]
    TypeMismatch {
        function: String,
        block: u32,
        message: String,
    },

    /// The entry block parameters do not match the declared parameter list.
    #[error("function '{function}': entry block parameters do not match the declared signature")]
    EntrySignature { function: String },

    /// A function declared to never return contains a `return`.
    #[error("function '{function}': block bb{block} returns from a function declared Never")]
    ReturnFromNever { function: String, block: u32 },
}

// ============================================================================
// Lowering Errors
// ============================================================================

/// Internal-consistency faults raised while lowering a compilation unit.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoweringError {
    /// A lowering target was emitted twice.
    #[error("already generated function for target {target}")]
    DuplicateTarget { target: String },

    /// A finished function failed IR verification.
    #[error("lowered IR failed verification: {0}")]
    Verification(#[from] VerifyError),

    /// An imported external definition arrived before type checking finished.
    #[error("external definition '{name}' reached lowering before type checking")]
    UncheckedExternal { name: String },

    /// The driver was asked to start past the end of the declaration list.
    #[error("start index {start} is past the end of {len} declaration(s)")]
    StartIndexOutOfRange { start: usize, len: usize },

    /// Control fell off the end of a unit-returning function whose
    /// designated epilogue block was never emitted.
    #[error("function '{function}' fell off the end with an unconverged epilogue block")]
    UnconvergedEpilogue { function: String },

    /// A terminator was emitted into a block that already has one.
    #[error("function '{function}': block bb{block} is already terminated")]
    AlreadyTerminated { function: String, block: u32 },

    /// An instruction was emitted after control flow had terminated.
    #[error("function '{function}' has no valid insertion point")]
    NoInsertionPoint { function: String },

    /// A local name survived type checking but has no binding in scope.
    #[error("at {span}: unresolved local '{name}'")]
    UnresolvedLocal { name: String, span: Span },

    /// An assignment target that does not denote storage.
    #[error("at {span}: expression is not assignable")]
    InvalidPlace { span: Span },

    /// `self` used where no instance is bound.
    #[error("at {span}: 'self' used outside of a method, constructor or destructor")]
    MissingSelf { span: Span },

    /// A scope exit tried to pop cleanups it never pushed.
    #[error("function '{function}': cleanup stack popped below its scope")]
    CleanupUnderflow { function: String },
}
