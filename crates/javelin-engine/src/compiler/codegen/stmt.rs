//! Statement generation

use super::{CodeGenerator, UNKNOWN};
use crate::ast::{Expr, Stmt, StmtKind, TextPosition, TypeNode};
use crate::compiler::Instruction;
use crate::types::Type;
use crate::vm::Value;

impl CodeGenerator<'_> {
    pub(super) fn gen_stmt(&mut self, stmt: &Stmt) {
        let position = stmt.position;
        match &stmt.kind {
            StmtKind::LocalVar {
                ty,
                identifier,
                initializer,
            } => self.gen_local(ty.as_ref(), identifier, initializer.as_ref(), position),
            StmtKind::Expr(expr) => self.gen_discard(expr),
            StmtKind::If {
                condition,
                then_branch,
                else_branch,
            } => self.gen_if(condition, then_branch, else_branch.as_deref()),
            StmtKind::While { condition, body } => self.gen_while(condition, body),
            StmtKind::DoWhile { body, condition } => self.gen_do_while(body, condition),
            StmtKind::For {
                init,
                condition,
                update,
                body,
            } => self.gen_for(init, condition.as_ref(), update, body),
            StmtKind::ForEach {
                ty,
                identifier,
                iterable,
                body,
            } => self.gen_for_each(ty.as_ref(), identifier, iterable, body, position),
            StmtKind::Return(value) => self.gen_return(value.as_ref(), position),
            StmtKind::Block(statements) => {
                self.symbols.push_scope();
                for statement in statements {
                    self.gen_stmt(statement);
                }
                self.symbols.pop_scope();
            }
            StmtKind::Break => self.gen_break(position),
            StmtKind::Continue => self.gen_continue(position),
            StmtKind::Print { value, newline } => self.gen_print(value.as_ref(), *newline, position),
        }
    }

    /// Declare a local after its initializer so `int x = x;` does not see it
    fn gen_local(&mut self, ty: Option<&TypeNode>, name: &str, initializer: Option<&Expr>, position: TextPosition) {
        let declared = ty.map(|node| self.resolve_type(node, position));
        let value_ty = initializer.map(|init| (self.gen_expr(init), init.position));
        let ty = match (declared, value_ty) {
            (Some(declared), Some((value_ty, value_position))) => {
                self.coerce(&value_ty, &declared, value_position);
                declared
            }
            (Some(declared), None) => {
                self.emit(
                    Instruction::PushConstant {
                        value: declared.default_value(),
                    },
                    position,
                );
                declared
            }
            (None, Some((value_ty, _))) => {
                if value_ty == Type::Null || value_ty.is_void() {
                    self.error(format!("Cannot infer type of {}.", name), position);
                    UNKNOWN
                } else {
                    value_ty
                }
            }
            (None, None) => {
                self.error(format!("Cannot infer type of {} without an initializer.", name), position);
                self.emit(Instruction::PushConstant { value: Value::Null }, position);
                UNKNOWN
            }
        };
        self.declare_local(name, ty, position);
    }

    /// Bind the value on top of the stack to a new local
    pub(super) fn declare_local(&mut self, name: &str, ty: Type, position: TextPosition) {
        match self.symbols.declare(name, ty) {
            Ok(offset) => {
                self.emit(Instruction::StoreLocal { offset, keep: false }, position);
            }
            Err(_) => {
                self.error(format!("Variable {} is already defined.", name), position);
                self.emit(Instruction::Pop, position);
            }
        }
    }

    fn gen_return(&mut self, value: Option<&Expr>, position: TextPosition) {
        if self.context.is_constructor {
            if let Some(value) = value {
                self.error("Cannot return a value from a constructor.", value.position);
                self.gen_discard(value);
            }
            self.emit(Instruction::LoadLocal { offset: 0 }, position);
            self.emit(Instruction::Return { has_value: true }, position);
            return;
        }
        let return_type = self.context.return_type.clone();
        match value {
            Some(value) if return_type.is_void() => {
                self.error("Cannot return a value from a method with void result type.", value.position);
                self.gen_discard(value);
                self.emit(Instruction::Return { has_value: false }, position);
            }
            Some(value) => {
                let ty = self.gen_expr(value);
                self.coerce(&ty, &return_type, value.position);
                self.emit(Instruction::Return { has_value: true }, position);
            }
            None if !return_type.is_void() => {
                self.error("Missing return value.", position);
                self.emit(
                    Instruction::PushConstant {
                        value: return_type.default_value(),
                    },
                    position,
                );
                self.emit(Instruction::Return { has_value: true }, position);
            }
            None => {
                self.emit(Instruction::Return { has_value: false }, position);
            }
        }
    }

    fn gen_print(&mut self, value: Option<&Expr>, newline: bool, position: TextPosition) {
        let Some(value) = value else {
            self.emit(
                Instruction::Print {
                    newline,
                    has_value: false,
                },
                position,
            );
            return;
        };
        let ty = self.gen_expr(value);
        if ty.is_void() {
            self.error("'void' type not allowed here.", value.position);
        }
        if let Some(steps) = self.stringify_steps(&ty, value.position) {
            self.emit_steps(steps);
        }
        self.emit(
            Instruction::Print {
                newline,
                has_value: true,
            },
            position,
        );
    }
}

/// Whether every path through `statements` ends in `return`
pub(super) fn always_returns(statements: &[Stmt]) -> bool {
    statements.iter().any(stmt_always_returns)
}

fn stmt_always_returns(stmt: &Stmt) -> bool {
    match &stmt.kind {
        StmtKind::Return(_) => true,
        StmtKind::Block(statements) => always_returns(statements),
        StmtKind::If {
            then_branch,
            else_branch: Some(else_branch),
            ..
        } => stmt_always_returns(then_branch) && stmt_always_returns(else_branch),
        StmtKind::While { condition, body } => is_true_literal(condition) && !contains_break(body),
        StmtKind::For { condition, body, .. } => {
            condition.as_ref().map(is_true_literal).unwrap_or(true) && !contains_break(body)
        }
        StmtKind::DoWhile { body, condition } => {
            stmt_always_returns(body) || (is_true_literal(condition) && !contains_break(body))
        }
        _ => false,
    }
}

fn is_true_literal(expr: &Expr) -> bool {
    matches!(
        expr.kind,
        crate::ast::ExprKind::Literal(crate::ast::Literal::Bool(true))
    )
}

/// `break` that leaves the loop whose body is `stmt`
fn contains_break(stmt: &Stmt) -> bool {
    match &stmt.kind {
        StmtKind::Break => true,
        StmtKind::Block(statements) => statements.iter().any(contains_break),
        StmtKind::If {
            then_branch,
            else_branch,
            ..
        } => contains_break(then_branch) || else_branch.as_deref().map(contains_break).unwrap_or(false),
        // nested loops own their breaks
        _ => false,
    }
}
