//! Textual IR dump. Diagnostic only; the format carries no compatibility
//! guarantees.

use std::fmt;

use crate::function::{Block, IrFunction};
use crate::instr::{Instr, Terminator, ValueId};
use crate::module::IrModule;

fn write_list(f: &mut fmt::Formatter<'_>, values: &[ValueId]) -> fmt::Result {
    for (i, v) in values.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{}", v)?;
    }
    Ok(())
}

impl fmt::Display for Instr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instr::Const { dst, value } => write!(f, "{} = const {}", dst, value),
            Instr::Binary { dst, op, lhs, rhs } => {
                write!(f, "{} = {} {}, {}", dst, op.mnemonic(), lhs, rhs)
            }
            Instr::Call { dst, callee, args } => {
                write!(f, "{} = call {}(", dst, callee)?;
                write_list(f, args)?;
                f.write_str(")")
            }
            Instr::CallIndirect { dst, callee, args } => {
                write!(f, "{} = call_indirect {}(", dst, callee)?;
                write_list(f, args)?;
                f.write_str(")")
            }
            Instr::FunctionRef { dst, target } => write!(f, "{} = function_ref {}", dst, target),
            Instr::AllocStack { dst, ty } => write!(f, "{} = alloc_stack {}", dst, ty),
            Instr::AllocObject { dst, class } => write!(f, "{} = alloc_object {}", dst, class),
            Instr::DeallocObject { object } => write!(f, "dealloc_object {}", object),
            Instr::GlobalAddr { dst, global } => write!(f, "{} = global_addr {}", dst, global),
            Instr::FieldAddr { dst, base, field } => {
                write!(f, "{} = field_addr {}, {}", dst, base, field)
            }
            Instr::ExtractField {
                dst,
                aggregate,
                field,
            } => write!(f, "{} = extract_field {}, {}", dst, aggregate, field),
            Instr::Load { dst, addr } => write!(f, "{} = load {}", dst, addr),
            Instr::Store { addr, value } => write!(f, "store {} to {}", value, addr),
            Instr::Retain { value } => write!(f, "retain {}", value),
            Instr::Release { value } => write!(f, "release {}", value),
        }
    }
}

impl fmt::Display for Terminator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Terminator::Return(value) => write!(f, "return {}", value),
            Terminator::Jump { target, args } => {
                write!(f, "jump {}", target)?;
                if !args.is_empty() {
                    f.write_str("(")?;
                    write_list(f, args)?;
                    f.write_str(")")?;
                }
                Ok(())
            }
            Terminator::Branch {
                cond,
                then_block,
                else_block,
            } => write!(f, "branch {}, {}, {}", cond, then_block, else_block),
            Terminator::Unreachable => f.write_str("unreachable"),
        }
    }
}

fn write_block(f: &mut fmt::Formatter<'_>, function: &IrFunction, block: &Block) -> fmt::Result {
    write!(f, "{}", block.id)?;
    if !block.params.is_empty() {
        f.write_str("(")?;
        for (i, param) in block.params.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            match function.value_type(*param) {
                Some(ty) => write!(f, "{}: {}", param, ty)?,
                None => write!(f, "{}", param)?,
            }
        }
        f.write_str(")")?;
    }
    f.write_str(":\n")?;

    for instr in &block.instrs {
        writeln!(f, "    {}", instr)?;
    }
    match &block.terminator {
        Some(term) => writeln!(f, "    {}", term),
        None => writeln!(f, "    <unterminated>"),
    }
}

impl fmt::Display for IrFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.name(), self.ty())?;
        if !self.attrs().is_empty() {
            write!(f, " {:?}", self.attrs())?;
        }
        writeln!(f, " [{}] {{", self.symbol())?;
        for block in self.blocks() {
            write_block(f, self, block)?;
        }
        f.write_str("}\n")
    }
}

impl fmt::Display for IrModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut globals: Vec<_> = self.globals().collect();
        globals.sort_by_key(|(decl, _)| **decl);
        for (decl, global) in globals {
            writeln!(f, "global {} {}: {}", decl, global.name, global.ty)?;
        }

        let mut functions: Vec<_> = self.functions().collect();
        functions.sort_by_key(|(target, _)| **target);
        for (_, function) in functions {
            writeln!(f)?;
            write!(f, "{}", function)?;
        }

        if let Some(top_level) = self.top_level() {
            writeln!(f)?;
            write!(f, "{}", top_level)?;
        }
        Ok(())
    }
}
