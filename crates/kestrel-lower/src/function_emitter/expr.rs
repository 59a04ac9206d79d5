//! Expression lowering.
//!
//! Every lowered expression yields an owned value: reading stored
//! references retains them, and consumers either store the value, pass it
//! on, or release it. For structs this applies to each field that holds a
//! reference. `self` is borrowed and never released by the body it is
//! bound in.
//!
//! Lowering returns `Ok(None)` when evaluation diverges, after which the
//! builder has no insertion point.

use kestrel_ast::{
    BinaryExpr, BinaryOp as AstBinaryOp, CallExpr, CallIndirectExpr, ConstructExpr, Expr, FieldExpr,
    Literal, Semantics, Type,
};
use kestrel_core::{LoweringError, Span};
use kestrel_ir::{BinaryOp, Const, IrType, LoweringTarget, OrderedFloat, ValueId};

use super::{FunctionEmitter, Result, SelfBinding};
use crate::types::lower_type;

/// Storage an assignment or read goes through.
#[derive(Debug, Clone, PartialEq)]
pub(super) struct Place {
    pub addr: ValueId,
    /// Stored type
    pub ty: IrType,
    /// Owned object the address was projected from, released after use.
    pub base: Option<ValueId>,
    /// Field of `self` this place initializes, during construction and
    /// before any store to it.
    pub initializes: Option<u32>,
}

fn lower_binary_op(op: AstBinaryOp) -> BinaryOp {
    match op {
        AstBinaryOp::Add => BinaryOp::Add,
        AstBinaryOp::Sub => BinaryOp::Sub,
        AstBinaryOp::Mul => BinaryOp::Mul,
        AstBinaryOp::Div => BinaryOp::Div,
        AstBinaryOp::Eq => BinaryOp::Eq,
        AstBinaryOp::Ne => BinaryOp::Ne,
        AstBinaryOp::Lt => BinaryOp::Lt,
        AstBinaryOp::Le => BinaryOp::Le,
        AstBinaryOp::Gt => BinaryOp::Gt,
        AstBinaryOp::Ge => BinaryOp::Ge,
        AstBinaryOp::And => BinaryOp::And,
        AstBinaryOp::Or => BinaryOp::Or,
    }
}

/// Whether `expr` denotes storage that can be addressed without copying.
fn is_place(expr: &Expr<'_>) -> bool {
    match expr {
        Expr::Local(_) | Expr::Global(_) => true,
        Expr::Field(f) => {
            matches!(f.base, Expr::SelfRef(_))
                || f.base.ty().has_reference_semantics()
                || is_place(f.base)
        }
        _ => false,
    }
}

impl<'ast> FunctionEmitter<'ast> {
    pub(super) fn lower_expr(&mut self, expr: &'ast Expr<'ast>) -> Result<Option<ValueId>> {
        match expr {
            Expr::Literal(lit) => {
                let value = match lit.kind {
                    Literal::Unit => Const::Unit,
                    Literal::Bool(b) => Const::Bool(b),
                    Literal::Int(i) => Const::Int(i),
                    Literal::Float(x) => Const::Float(OrderedFloat(x)),
                };
                self.builder.emit_const(value).map(Some)
            }
            Expr::Local(_) | Expr::Global(_) => self.lower_place_read(expr),
            Expr::SelfRef(s) => self.lower_self(s.span).map(Some),
            Expr::Field(field) => self.lower_field(expr, field),
            Expr::Call(call) => self.lower_call(call),
            Expr::CallIndirect(call) => self.lower_call_indirect(call),
            Expr::Construct(construct) => self.lower_construct(construct),
            Expr::Binary(binary) => self.lower_binary(binary),
            Expr::Closure(closure) => {
                let id = self.queue_closure(closure);
                self.builder
                    .emit_function_ref(LoweringTarget::closure(id), lower_type(&closure.ty))
                    .map(Some)
            }
        }
    }

    /// `self` as an owned value.
    fn lower_self(&mut self, span: Span) -> Result<ValueId> {
        match self.self_binding {
            Some(SelfBinding::Object(object)) => {
                self.builder.emit_retain(object)?;
                Ok(object)
            }
            Some(SelfBinding::Slot(slot)) => {
                let value = self.builder.emit_load(slot)?;
                if let Some(ty) = self.builder.value_type(value).cloned() {
                    self.retain_value(value, &ty)?;
                }
                Ok(value)
            }
            None => Err(LoweringError::MissingSelf { span }),
        }
    }

    fn lower_place_read(&mut self, expr: &'ast Expr<'ast>) -> Result<Option<ValueId>> {
        let Some(place) = self.lower_place(expr)? else {
            return Ok(None);
        };
        let value = self.builder.emit_load(place.addr)?;
        self.retain_value(value, &place.ty)?;
        self.release_place_base(&place)?;
        Ok(Some(value))
    }

    fn lower_field(
        &mut self,
        expr: &'ast Expr<'ast>,
        field: &'ast FieldExpr<'ast>,
    ) -> Result<Option<ValueId>> {
        if is_place(expr) {
            return self.lower_place_read(expr);
        }

        // Projection out of a struct rvalue: keep the field, drop the rest.
        let Some(aggregate) = self.lower_expr(field.base)? else {
            return Ok(None);
        };
        let ty = lower_type(&field.ty);
        let value = self
            .builder
            .emit_extract_field(aggregate, field.field, ty.clone())?;
        self.retain_value(value, &ty)?;
        self.release_value(aggregate, &lower_type(&field.base.ty()))?;
        Ok(Some(value))
    }

    /// Compute the address `expr` denotes.
    pub(super) fn lower_place(&mut self, expr: &'ast Expr<'ast>) -> Result<Option<Place>> {
        match expr {
            Expr::Local(local) => {
                let Some(var) = self.scope.get(local.name) else {
                    return Err(LoweringError::UnresolvedLocal {
                        name: local.name.to_string(),
                        span: local.span,
                    });
                };
                Ok(Some(Place {
                    addr: var.slot,
                    ty: var.ty.clone(),
                    base: None,
                    initializes: None,
                }))
            }
            Expr::Global(global) => {
                let ty = lower_type(&global.ty);
                let addr = self.builder.emit_global_addr(global.var, ty.clone())?;
                Ok(Some(Place {
                    addr,
                    ty,
                    base: None,
                    initializes: None,
                }))
            }
            Expr::Field(field) => self.lower_field_place(field),
            _ => Err(LoweringError::InvalidPlace { span: expr.span() }),
        }
    }

    fn lower_field_place(&mut self, field: &'ast FieldExpr<'ast>) -> Result<Option<Place>> {
        let ty = lower_type(&field.ty);

        if let Expr::SelfRef(s) = field.base {
            let base = match self.self_binding {
                Some(SelfBinding::Object(object)) => object,
                Some(SelfBinding::Slot(slot)) => slot,
                None => return Err(LoweringError::MissingSelf { span: s.span }),
            };
            let addr = self.builder.emit_field_addr(base, field.field, ty.clone())?;
            let fresh = self.initializing_self && !self.initialized_fields.contains(&field.field);
            return Ok(Some(Place {
                addr,
                ty,
                base: None,
                initializes: fresh.then_some(field.field),
            }));
        }

        if field.base.ty().has_reference_semantics() {
            let Some(object) = self.lower_expr(field.base)? else {
                return Ok(None);
            };
            let addr = self
                .builder
                .emit_field_addr(object, field.field, ty.clone())?;
            return Ok(Some(Place {
                addr,
                ty,
                base: Some(object),
                initializes: None,
            }));
        }

        let Some(outer) = self.lower_place(field.base)? else {
            return Ok(None);
        };
        let addr = self
            .builder
            .emit_field_addr(outer.addr, field.field, ty.clone())?;
        Ok(Some(Place {
            addr,
            ty,
            base: outer.base,
            initializes: None,
        }))
    }

    /// Lower arguments left to right.
    fn lower_args(&mut self, args: &'ast [Expr<'ast>], out: &mut Vec<ValueId>) -> Result<bool> {
        for arg in args {
            match self.lower_expr(arg)? {
                Some(value) => out.push(value),
                None => return Ok(false),
            }
        }
        Ok(true)
    }

    /// Terminate after a call that never returns.
    fn finish_call(&mut self, result: ValueId, ty: &Type<'ast>) -> Result<Option<ValueId>> {
        if ty.is_never() {
            self.builder.emit_unreachable()?;
            return Ok(None);
        }
        Ok(Some(result))
    }

    fn lower_call(&mut self, call: &'ast CallExpr<'ast>) -> Result<Option<ValueId>> {
        let mut args = Vec::with_capacity(call.args.len() + 1);
        let mut receiver = None;
        if let Some(expr) = call.receiver {
            let Some(value) = self.lower_expr(expr)? else {
                return Ok(None);
            };
            args.push(value);
            receiver = Some((value, lower_type(&expr.ty())));
        }
        if !self.lower_args(call.args, &mut args)? {
            return Ok(None);
        }

        let result = self.builder.emit_call(
            LoweringTarget::function(call.callee),
            args,
            lower_type(&call.ty),
        )?;
        if call.ty.is_never() {
            return self.finish_call(result, &call.ty);
        }
        // The receiver is borrowed for the duration of the call.
        if let Some((value, ty)) = receiver {
            self.release_value(value, &ty)?;
        }
        Ok(Some(result))
    }

    fn lower_call_indirect(
        &mut self,
        call: &'ast CallIndirectExpr<'ast>,
    ) -> Result<Option<ValueId>> {
        let Some(callee) = self.lower_expr(call.callee)? else {
            return Ok(None);
        };
        let mut args = Vec::with_capacity(call.args.len());
        if !self.lower_args(call.args, &mut args)? {
            return Ok(None);
        }
        let result = self
            .builder
            .emit_call_indirect(callee, args, lower_type(&call.ty))?;
        self.finish_call(result, &call.ty)
    }

    /// Construction calls the allocator of a class or the constructor
    /// function of a struct.
    fn lower_construct(&mut self, construct: &'ast ConstructExpr<'ast>) -> Result<Option<ValueId>> {
        let mut args = Vec::with_capacity(construct.args.len());
        if !self.lower_args(construct.args, &mut args)? {
            return Ok(None);
        }
        let (target, ty) = match construct.ty.semantics {
            Semantics::Reference => (
                LoweringTarget::allocator(construct.constructor),
                IrType::Object(construct.ty.decl),
            ),
            Semantics::Value => (
                LoweringTarget::function(construct.constructor),
                IrType::Struct(construct.ty.decl),
            ),
        };
        self.builder.emit_call(target, args, ty).map(Some)
    }

    fn lower_binary(&mut self, binary: &'ast BinaryExpr<'ast>) -> Result<Option<ValueId>> {
        if matches!(binary.op, AstBinaryOp::And | AstBinaryOp::Or) {
            return self.lower_short_circuit(binary);
        }
        let Some(lhs) = self.lower_expr(binary.lhs)? else {
            return Ok(None);
        };
        let Some(rhs) = self.lower_expr(binary.rhs)? else {
            return Ok(None);
        };
        self.builder
            .emit_binary(lower_binary_op(binary.op), lhs, rhs, lower_type(&binary.ty))
            .map(Some)
    }

    /// `a && b` / `a || b`: the right operand runs only when it decides
    /// the result.
    fn lower_short_circuit(&mut self, binary: &'ast BinaryExpr<'ast>) -> Result<Option<ValueId>> {
        let Some(lhs) = self.lower_expr(binary.lhs)? else {
            return Ok(None);
        };

        let rhs_block = self.builder.create_block();
        let short_block = self.builder.create_block();
        let merge = self.builder.create_block();
        let result = self.builder.add_block_param(merge, IrType::Bool);

        let is_and = binary.op == AstBinaryOp::And;
        if is_and {
            self.builder.emit_branch(lhs, rhs_block, short_block)?;
        } else {
            self.builder.emit_branch(lhs, short_block, rhs_block)?;
        }

        self.builder.position_at(short_block)?;
        let decided = self.builder.emit_const(Const::Bool(!is_and))?;
        self.builder.emit_jump(merge, vec![decided])?;

        self.builder.position_at(rhs_block)?;
        let rhs = self.lower_expr(binary.rhs)?;
        if let Some(rhs) = rhs {
            self.builder.emit_jump(merge, vec![rhs])?;
        }

        self.builder.position_at(merge)?;
        Ok(Some(result))
    }
}
