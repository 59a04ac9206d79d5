//! Structural verification of finished IR functions.
//!
//! The verifier checks what lowering is required to guarantee: every block
//! ends in a terminator, control transfers name real blocks with matching
//! arguments, every use has a definition, and the handful of type rules the
//! IR carries locally hold. It does not check dominance.

use kestrel_core::VerifyError;
use rustc_hash::FxHashSet;

use crate::function::{Block, IrFunction};
use crate::instr::{Instr, Terminator, ValueId};
use crate::types::IrType;

/// Stand-in type for values the verifier already reported as undefined.
const NEVER: &IrType = &IrType::Never;

impl IrFunction {
    /// Verify this function.
    pub fn verify(&self) -> Result<(), VerifyError> {
        Verifier::new(self).run()
    }
}

struct Verifier<'f> {
    function: &'f IrFunction,
    defined: FxHashSet<ValueId>,
}

impl<'f> Verifier<'f> {
    fn new(function: &'f IrFunction) -> Self {
        Self {
            function,
            defined: FxHashSet::default(),
        }
    }

    fn name(&self) -> String {
        self.function.name().to_string()
    }

    fn run(mut self) -> Result<(), VerifyError> {
        let function = self.function;
        let Some(entry) = function.entry() else {
            return Err(VerifyError::EmptyFunction {
                function: self.name(),
            });
        };
        self.check_entry(entry)?;
        self.collect_definitions()?;

        for block in function.blocks() {
            for instr in &block.instrs {
                self.check_uses(block, &instr.operands())?;
                self.check_instr(block, instr)?;
            }

            let Some(terminator) = &block.terminator else {
                return Err(VerifyError::MissingTerminator {
                    function: self.name(),
                    block: block.id.0,
                });
            };
            self.check_uses(block, &terminator.operands())?;
            self.check_terminator(block, terminator)?;
        }

        Ok(())
    }

    fn check_entry(&self, entry: &Block) -> Result<(), VerifyError> {
        let declared = &self.function.ty().params;
        let matches = entry.params.len() == declared.len()
            && entry
                .params
                .iter()
                .zip(declared)
                .all(|(v, ty)| self.function.value_type(*v) == Some(ty));
        if matches {
            Ok(())
        } else {
            Err(VerifyError::EntrySignature {
                function: self.name(),
            })
        }
    }

    fn collect_definitions(&mut self) -> Result<(), VerifyError> {
        let function = self.function;
        for block in function.blocks() {
            let defs = block
                .params
                .iter()
                .copied()
                .chain(block.instrs.iter().filter_map(Instr::dst));
            for value in defs {
                if !self.defined.insert(value) {
                    return Err(VerifyError::ValueRedefined {
                        function: self.name(),
                        value: value.0,
                    });
                }
            }
        }
        Ok(())
    }

    fn check_uses(&self, block: &Block, uses: &[ValueId]) -> Result<(), VerifyError> {
        for value in uses {
            if !self.defined.contains(value) || self.function.value_type(*value).is_none() {
                return Err(VerifyError::UndefinedValue {
                    function: self.name(),
                    block: block.id.0,
                    value: value.0,
                });
            }
        }
        Ok(())
    }

    fn ty(&self, value: ValueId) -> &IrType {
        self.function.value_type(value).unwrap_or(NEVER)
    }

    fn mismatch(&self, block: &Block, message: String) -> VerifyError {
        VerifyError::TypeMismatch {
            function: self.name(),
            block: block.id.0,
            message,
        }
    }

    fn check_instr(&self, block: &Block, instr: &Instr) -> Result<(), VerifyError> {
        match instr {
            Instr::Binary { op, lhs, rhs, .. } => {
                let (l, r) = (self.ty(*lhs), self.ty(*rhs));
                if l != r {
                    return Err(self.mismatch(
                        block,
                        format!("operands of '{}' disagree: {} vs {}", op.mnemonic(), l, r),
                    ));
                }
            }
            Instr::Load { dst, addr } => match self.ty(*addr).pointee() {
                Some(pointee) if pointee == self.ty(*dst) => {}
                Some(pointee) => {
                    return Err(self.mismatch(
                        block,
                        format!("load of {} yields {}", pointee, self.ty(*dst)),
                    ));
                }
                None => {
                    return Err(self.mismatch(block, format!("load from non-address {}", addr)));
                }
            },
            Instr::Store { addr, value } => match self.ty(*addr).pointee() {
                Some(pointee) if pointee == self.ty(*value) => {}
                Some(pointee) => {
                    return Err(self.mismatch(
                        block,
                        format!("store of {} into *{}", self.ty(*value), pointee),
                    ));
                }
                None => {
                    return Err(self.mismatch(block, format!("store to non-address {}", addr)));
                }
            },
            Instr::DeallocObject { object: value }
            | Instr::Retain { value }
            | Instr::Release { value } => {
                if !self.ty(*value).is_object() {
                    return Err(self.mismatch(
                        block,
                        format!("{} of non-object {}", instr_name(instr), self.ty(*value)),
                    ));
                }
            }
            Instr::CallIndirect { callee, .. } => {
                if !matches!(self.ty(*callee), IrType::Function(_)) {
                    return Err(self.mismatch(
                        block,
                        format!("indirect call through {}", self.ty(*callee)),
                    ));
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn check_terminator(&self, block: &Block, terminator: &Terminator) -> Result<(), VerifyError> {
        match terminator {
            Terminator::Return(value) => {
                let result = &self.function.ty().result;
                if result.is_never() {
                    return Err(VerifyError::ReturnFromNever {
                        function: self.name(),
                        block: block.id.0,
                    });
                }
                if self.ty(*value) != result {
                    return Err(self.mismatch(
                        block,
                        format!(
                            "returns {} from a function returning {}",
                            self.ty(*value),
                            result
                        ),
                    ));
                }
            }
            Terminator::Branch { cond, .. } => {
                if *self.ty(*cond) != IrType::Bool {
                    return Err(self.mismatch(
                        block,
                        format!("branch condition has type {}", self.ty(*cond)),
                    ));
                }
            }
            Terminator::Jump { .. } | Terminator::Unreachable => {}
        }

        for target in terminator.successors() {
            let Some(dest) = self.function.block(target) else {
                return Err(VerifyError::UndefinedBlock {
                    function: self.name(),
                    block: block.id.0,
                    target: target.0,
                });
            };
            let args = terminator.args_for(target);
            if args.len() != dest.params.len() {
                return Err(VerifyError::BlockArgumentCount {
                    function: self.name(),
                    block: block.id.0,
                    target: target.0,
                    expected: dest.params.len(),
                    found: args.len(),
                });
            }
            for (arg, param) in args.iter().zip(&dest.params) {
                if self.ty(*arg) != self.ty(*param) {
                    return Err(self.mismatch(
                        block,
                        format!(
                            "argument {} to {} has type {}, expected {}",
                            arg,
                            target,
                            self.ty(*arg),
                            self.ty(*param)
                        ),
                    ));
                }
            }
        }

        Ok(())
    }
}

fn instr_name(instr: &Instr) -> &'static str {
    match instr {
        Instr::DeallocObject { .. } => "dealloc_object",
        Instr::Retain { .. } => "retain",
        Instr::Release { .. } => "release",
        _ => "instruction",
    }
}
