//! Statement lowering.

use kestrel_ast::{AssignStmt, Expr, IfStmt, LetStmt, ReturnStmt, Stmt, WhileStmt};
use kestrel_ir::BlockId;
use rustc_hash::FxHashSet;

use super::expr::Place;
use super::{FunctionEmitter, Result};
use crate::types::lower_type;

/// Fields initialized on every one of `paths`; `None` without paths.
fn initialized_on_all(paths: Vec<FxHashSet<u32>>) -> Option<FxHashSet<u32>> {
    paths
        .into_iter()
        .reduce(|all, path| all.intersection(&path).copied().collect())
}

impl<'ast> FunctionEmitter<'ast> {
    /// Lower statements in order, stopping once control has left the block.
    pub(super) fn lower_stmts(&mut self, stmts: &'ast [Stmt<'ast>]) -> Result<()> {
        for (index, stmt) in stmts.iter().enumerate() {
            if !self.builder.is_active() {
                tracing::trace!(
                    function = self.builder.name(),
                    skipped = stmts.len() - index,
                    "dropping unreachable statements"
                );
                break;
            }
            self.lower_stmt(stmt)?;
        }
        Ok(())
    }

    fn lower_stmt(&mut self, stmt: &'ast Stmt<'ast>) -> Result<()> {
        match stmt {
            Stmt::Expr(s) => self.lower_expr_stmt(s.expr),
            Stmt::Let(s) => self.lower_let(s),
            Stmt::Assign(s) => self.lower_assign(s),
            Stmt::Return(s) => self.lower_return(s),
            Stmt::Block(block) => self.lower_block(block),
            Stmt::If(s) => self.lower_if(s),
            Stmt::While(s) => self.lower_while(s),
        }
    }

    /// Evaluate for effect; the owned result is dropped at once.
    fn lower_expr_stmt(&mut self, expr: &'ast Expr<'ast>) -> Result<()> {
        let Some(value) = self.lower_expr(expr)? else {
            return Ok(());
        };
        self.release_value(value, &lower_type(&expr.ty()))
    }

    fn lower_let(&mut self, stmt: &LetStmt<'ast>) -> Result<()> {
        let Some(value) = self.lower_expr(stmt.init)? else {
            return Ok(());
        };
        let ty = lower_type(&stmt.ty);
        let slot = self.builder.emit_alloc_stack(ty.clone())?;
        self.builder.emit_store(slot, value)?;
        self.push_release_cleanups(slot, &ty)?;
        self.scope.declare(stmt.name, slot, ty);
        Ok(())
    }

    fn lower_assign(&mut self, stmt: &AssignStmt<'ast>) -> Result<()> {
        let Some(place) = self.lower_place(stmt.target)? else {
            return Ok(());
        };
        let Some(value) = self.lower_expr(stmt.value)? else {
            return Ok(());
        };

        match place.initializes {
            Some(field) => {
                self.builder.emit_store(place.addr, value)?;
                self.initialized_fields.insert(field);
            }
            None if self.needs_cleanup(&place.ty) => {
                let old = self.builder.emit_load(place.addr)?;
                self.builder.emit_store(place.addr, value)?;
                self.release_value(old, &place.ty)?;
            }
            None => self.builder.emit_store(place.addr, value)?,
        }
        self.release_place_base(&place)
    }

    fn lower_return(&mut self, stmt: &ReturnStmt<'ast>) -> Result<()> {
        let value = match stmt.value {
            Some(expr) => match self.lower_expr(expr)? {
                Some(value) => Some(value),
                None => return Ok(()),
            },
            None => None,
        };
        self.emit_exit(value)
    }

    /// `if` with a merge block created only when some branch falls through.
    ///
    /// During construction a field of `self` counts as initialized after
    /// the `if` only when every branch reaching the merge stored it.
    fn lower_if(&mut self, stmt: &'ast IfStmt<'ast>) -> Result<()> {
        let Some(cond) = self.lower_expr(stmt.cond)? else {
            return Ok(());
        };

        let then_block = self.builder.create_block();
        let (else_block, mut merge) = match stmt.else_block {
            Some(_) => (self.builder.create_block(), None),
            None => {
                let merge = self.builder.create_block();
                (merge, Some(merge))
            }
        };
        self.builder.emit_branch(cond, then_block, else_block)?;

        let entry = self.initialized_fields.clone();
        let mut reaching = Vec::new();
        if stmt.else_block.is_none() {
            reaching.push(entry.clone());
        }

        self.builder.position_at(then_block)?;
        self.lower_block(&stmt.then_block)?;
        self.leave_branch(&entry, &mut reaching);
        self.jump_to_merge(&mut merge)?;

        if let Some(else_body) = &stmt.else_block {
            self.builder.position_at(else_block)?;
            self.lower_block(else_body)?;
            self.leave_branch(&entry, &mut reaching);
            self.jump_to_merge(&mut merge)?;
        }

        self.initialized_fields = initialized_on_all(reaching).unwrap_or(entry);
        if let Some(merge) = merge {
            self.builder.position_at(merge)?;
        }
        Ok(())
    }

    /// Record the fields a finished branch initialized, if it reaches the
    /// merge, and reset them for the next branch.
    fn leave_branch(&mut self, entry: &FxHashSet<u32>, reaching: &mut Vec<FxHashSet<u32>>) {
        let initialized = std::mem::replace(&mut self.initialized_fields, entry.clone());
        if self.builder.is_active() {
            reaching.push(initialized);
        }
    }

    fn jump_to_merge(&mut self, merge: &mut Option<BlockId>) -> Result<()> {
        if !self.builder.is_active() {
            return Ok(());
        }
        let target = *merge.get_or_insert_with(|| self.builder.create_block());
        self.builder.emit_jump(target, Vec::new())
    }

    /// Stores in the body never count as initializing after the loop,
    /// which may run zero times.
    fn lower_while(&mut self, stmt: &'ast WhileStmt<'ast>) -> Result<()> {
        let entry = self.initialized_fields.clone();
        let header = self.builder.create_block();
        self.builder.emit_jump(header, Vec::new())?;
        self.builder.position_at(header)?;
        let Some(cond) = self.lower_expr(stmt.cond)? else {
            return Ok(());
        };

        let body = self.builder.create_block();
        let exit = self.builder.create_block();
        self.builder.emit_branch(cond, body, exit)?;

        self.builder.position_at(body)?;
        self.lower_block(&stmt.body)?;
        if self.builder.is_active() {
            self.builder.emit_jump(header, Vec::new())?;
        }

        self.initialized_fields = entry;
        self.builder.position_at(exit)
    }

    /// Release the temporary object a place was projected from, if any.
    pub(super) fn release_place_base(&mut self, place: &Place) -> Result<()> {
        match place.base {
            Some(base) => self.builder.emit_release(base),
            None => Ok(()),
        }
    }
}
