//! Pending scope-exit actions.
//!
//! Each lowered scope pushes the cleanups it owns and pops them on exit.
//! Every exit path replays the pending entries in reverse push order, so an
//! action registered by a scope runs on every normal exit through that scope
//! and never twice on the same path.

use kestrel_core::LoweringError;
use kestrel_ir::{IrBuilder, IrType, ValueId};

type Result<T> = std::result::Result<T, LoweringError>;

/// A scope-exit action.
#[derive(Debug, Clone, PartialEq)]
pub enum Cleanup {
    /// Release the object stored at `slot`, a stack slot or field address.
    ReleaseSlot { slot: ValueId },
    /// Release an object held in a field of `object`.
    ReleaseField {
        object: ValueId,
        field: u32,
        ty: IrType,
    },
    /// Free the storage of `object`.
    Dealloc { object: ValueId },
}

impl Cleanup {
    fn emit(&self, builder: &mut IrBuilder) -> Result<()> {
        match self {
            Cleanup::ReleaseSlot { slot } => {
                let value = builder.emit_load(*slot)?;
                builder.emit_release(value)
            }
            Cleanup::ReleaseField { object, field, ty } => {
                let addr = builder.emit_field_addr(*object, *field, ty.clone())?;
                let value = builder.emit_load(addr)?;
                builder.emit_release(value)
            }
            Cleanup::Dealloc { object } => builder.emit_dealloc_object(*object),
        }
    }
}

/// LIFO ledger of pending cleanups for one function.
#[derive(Debug, Default)]
pub struct CleanupStack {
    entries: Vec<Cleanup>,
}

impl CleanupStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, cleanup: Cleanup) {
        self.entries.push(cleanup);
    }

    /// Number of pending entries; scopes record it on entry.
    pub fn depth(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Pending entries, oldest first.
    pub fn entries(&self) -> &[Cleanup] {
        &self.entries
    }

    /// Remove the most recent entry, emitting it if control can still
    /// reach this point. Returns `false` if the stack was empty.
    pub fn pop_and_run(&mut self, builder: &mut IrBuilder) -> Result<bool> {
        let Some(cleanup) = self.entries.pop() else {
            return Ok(false);
        };
        if builder.is_active() {
            cleanup.emit(builder)?;
        }
        Ok(true)
    }

    /// Pop and run entries until `depth` remain.
    pub fn pop_to(&mut self, depth: usize, builder: &mut IrBuilder) -> Result<()> {
        if depth > self.entries.len() {
            return Err(LoweringError::CleanupUnderflow {
                function: builder.name().to_string(),
            });
        }
        while self.entries.len() > depth {
            self.pop_and_run(builder)?;
        }
        Ok(())
    }

    /// Emit the entries above `depth` in reverse order without popping them.
    ///
    /// Used on early exits, where the scopes stay open for other paths.
    pub fn emit_cleanups_to(&self, depth: usize, builder: &mut IrBuilder) -> Result<()> {
        let Some(pending) = self.entries.get(depth..) else {
            return Err(LoweringError::CleanupUnderflow {
                function: builder.name().to_string(),
            });
        };
        for cleanup in pending.iter().rev() {
            cleanup.emit(builder)?;
        }
        Ok(())
    }

    /// Run every pending entry in reverse order, then return `value`.
    pub fn emit_return_and_cleanups(&self, builder: &mut IrBuilder, value: ValueId) -> Result<()> {
        self.emit_cleanups_to(0, builder)?;
        builder.emit_return(value)
    }
}
