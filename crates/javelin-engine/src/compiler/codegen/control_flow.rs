//! Branches and loops
//!
//! Forward jumps are emitted with a placeholder target and patched once the
//! destination index is known. `break` and `continue` collect their jump
//! indices on the innermost [`LoopContext`].

use super::{CodeGenerator, UNKNOWN};
use crate::ast::{Expr, Stmt, TextPosition, TypeNode};
use crate::compiler::Instruction;
use crate::types::{Operator, Type};

/// Pending exits of the loop being generated
#[derive(Debug, Default)]
pub(super) struct LoopContext {
    breaks: Vec<usize>,
    continues: Vec<usize>,
}

impl CodeGenerator<'_> {
    /// Emit a condition and convert it to `boolean`
    fn gen_condition(&mut self, condition: &Expr) {
        let ty = self.gen_expr(condition);
        self.coerce(&ty, &Type::BOOLEAN, condition.position);
    }

    fn jump_placeholder(&mut self, instruction: fn(usize) -> Instruction, position: TextPosition) -> usize {
        self.emit(instruction(0), position)
    }

    fn patch_here(&mut self, jump: usize) {
        let here = self.program.next_index();
        self.program.patch_jump(jump, here);
    }

    /// Generate a loop body and return the exits it recorded
    fn gen_loop_body(&mut self, body: &Stmt) -> LoopContext {
        self.loops.push(LoopContext::default());
        self.gen_stmt(body);
        self.loops.pop().unwrap_or_default()
    }

    fn patch_all(&mut self, jumps: &[usize], target: usize) {
        for &jump in jumps {
            self.program.patch_jump(jump, target);
        }
    }

    pub(super) fn gen_if(&mut self, condition: &Expr, then_branch: &Stmt, else_branch: Option<&Stmt>) {
        self.gen_condition(condition);
        let skip_then = self.jump_placeholder(|target| Instruction::JumpIfFalse { target }, condition.position);
        self.scoped(then_branch);
        match else_branch {
            Some(else_branch) => {
                let skip_else = self.jump_placeholder(|target| Instruction::Jump { target }, else_branch.position);
                self.patch_here(skip_then);
                self.scoped(else_branch);
                self.patch_here(skip_else);
            }
            None => self.patch_here(skip_then),
        }
    }

    /// A branch or body gets its own scope even without braces
    fn scoped(&mut self, stmt: &Stmt) {
        self.symbols.push_scope();
        self.gen_stmt(stmt);
        self.symbols.pop_scope();
    }

    pub(super) fn gen_while(&mut self, condition: &Expr, body: &Stmt) {
        let start = self.program.next_index();
        self.gen_condition(condition);
        let exit = self.jump_placeholder(|target| Instruction::JumpIfFalse { target }, condition.position);
        self.symbols.push_scope();
        let exits = self.gen_loop_body(body);
        self.symbols.pop_scope();
        self.emit(Instruction::Jump { target: start }, condition.position);
        self.patch_here(exit);
        let end = self.program.next_index();
        self.patch_all(&exits.continues, start);
        self.patch_all(&exits.breaks, end);
    }

    pub(super) fn gen_do_while(&mut self, body: &Stmt, condition: &Expr) {
        let start = self.program.next_index();
        self.symbols.push_scope();
        let exits = self.gen_loop_body(body);
        self.symbols.pop_scope();
        let check = self.program.next_index();
        self.gen_condition(condition);
        self.emit(Instruction::JumpIfTrue { target: start }, condition.position);
        let end = self.program.next_index();
        self.patch_all(&exits.continues, check);
        self.patch_all(&exits.breaks, end);
    }

    pub(super) fn gen_for(&mut self, init: &[Stmt], condition: Option<&Expr>, update: &[Expr], body: &Stmt) {
        self.symbols.push_scope();
        for statement in init {
            self.gen_stmt(statement);
        }
        let start = self.program.next_index();
        let exit = condition.map(|condition| {
            self.gen_condition(condition);
            self.jump_placeholder(|target| Instruction::JumpIfFalse { target }, condition.position)
        });
        self.symbols.push_scope();
        let exits = self.gen_loop_body(body);
        self.symbols.pop_scope();
        let next = self.program.next_index();
        for expr in update {
            self.gen_discard(expr);
        }
        self.emit(Instruction::Jump { target: start }, body.position);
        if let Some(exit) = exit {
            self.patch_here(exit);
        }
        let end = self.program.next_index();
        self.patch_all(&exits.continues, next);
        self.patch_all(&exits.breaks, end);
        self.symbols.pop_scope();
    }

    /// `for (T x : array)` over hidden array and index locals
    pub(super) fn gen_for_each(
        &mut self,
        ty: Option<&TypeNode>,
        name: &str,
        iterable: &Expr,
        body: &Stmt,
        position: TextPosition,
    ) {
        self.symbols.push_scope();
        let iterable_ty = self.gen_expr(iterable);
        let element_ty = match &iterable_ty {
            Type::Array(element) => (**element).clone(),
            other => {
                if *other != UNKNOWN {
                    let message = format!("for-each requires an array, but {} found.", self.type_name(other));
                    self.error(message, iterable.position);
                }
                UNKNOWN
            }
        };
        let array = self.symbols.reserve();
        let index = self.symbols.reserve();
        self.emit(Instruction::StoreLocal { offset: array, keep: false }, position);
        self.emit(
            Instruction::PushConstant {
                value: crate::vm::Value::Int(0),
            },
            position,
        );
        self.emit(Instruction::StoreLocal { offset: index, keep: false }, position);

        let declared = match ty {
            Some(node) => self.resolve_type(node, position),
            None => element_ty.clone(),
        };

        let start = self.program.next_index();
        self.emit(Instruction::LoadLocal { offset: index }, position);
        self.emit(Instruction::LoadLocal { offset: array }, position);
        self.emit(Instruction::ArrayLength, position);
        self.emit(
            Instruction::Binary {
                op: Operator::Lower,
                left: Type::INT,
            },
            position,
        );
        let exit = self.jump_placeholder(|target| Instruction::JumpIfFalse { target }, position);

        self.symbols.push_scope();
        self.emit(Instruction::LoadLocal { offset: array }, position);
        self.emit(Instruction::LoadLocal { offset: index }, position);
        self.emit(Instruction::LoadElement, position);
        self.coerce(&element_ty, &declared, position);
        self.declare_local(name, declared, position);
        let exits = self.gen_loop_body(body);
        self.symbols.pop_scope();

        let next = self.program.next_index();
        self.emit(Instruction::LoadLocal { offset: index }, position);
        self.emit(
            Instruction::PushConstant {
                value: crate::vm::Value::Int(1),
            },
            position,
        );
        self.emit(
            Instruction::Binary {
                op: Operator::Plus,
                left: Type::INT,
            },
            position,
        );
        self.emit(Instruction::StoreLocal { offset: index, keep: false }, position);
        self.emit(Instruction::Jump { target: start }, position);
        self.patch_here(exit);
        let end = self.program.next_index();
        self.patch_all(&exits.continues, next);
        self.patch_all(&exits.breaks, end);
        self.symbols.pop_scope();
    }

    pub(super) fn gen_break(&mut self, position: TextPosition) {
        if self.loops.is_empty() {
            self.error("break outside of loop.", position);
            return;
        }
        let jump = self.jump_placeholder(|target| Instruction::Jump { target }, position);
        if let Some(exits) = self.loops.last_mut() {
            exits.breaks.push(jump);
        }
    }

    pub(super) fn gen_continue(&mut self, position: TextPosition) {
        if self.loops.is_empty() {
            self.error("continue outside of loop.", position);
            return;
        }
        let jump = self.jump_placeholder(|target| Instruction::Jump { target }, position);
        if let Some(exits) = self.loops.last_mut() {
            exits.continues.push(jump);
        }
    }

    /// `&&` and `||` keep the deciding operand when they skip the right side
    pub(super) fn gen_short_circuit(&mut self, op: Operator, lhs: &Expr, rhs: &Expr, position: TextPosition) -> Type {
        let left = self.gen_expr(lhs);
        self.coerce(&left, &Type::BOOLEAN, lhs.position);
        let skip = if op == Operator::And {
            self.jump_placeholder(|target| Instruction::JumpIfFalseKeep { target }, position)
        } else {
            self.jump_placeholder(|target| Instruction::JumpIfTrueKeep { target }, position)
        };
        let right = self.gen_expr(rhs);
        self.coerce(&right, &Type::BOOLEAN, rhs.position);
        self.patch_here(skip);
        Type::BOOLEAN
    }

    pub(super) fn gen_ternary(
        &mut self,
        condition: &Expr,
        then_value: &Expr,
        else_value: &Expr,
        position: TextPosition,
    ) -> Type {
        self.gen_condition(condition);
        let skip_then = self.jump_placeholder(|target| Instruction::JumpIfFalse { target }, position);
        let then_ty = self.gen_expr(then_value);
        let skip_else = self.jump_placeholder(|target| Instruction::Jump { target }, position);
        self.patch_here(skip_then);
        let else_ty = self.gen_expr(else_value);

        let Some(result) = self.common_type(&then_ty, &else_ty) else {
            let message = format!(
                "Incompatible types in conditional expression: {} and {}.",
                self.type_name(&then_ty),
                self.type_name(&else_ty)
            );
            self.error(message, position);
            self.patch_here(skip_else);
            return UNKNOWN;
        };
        self.coerce(&else_ty, &result, else_value.position);
        self.patch_here(skip_else);
        // the then-branch ends at the jump over the else branch
        let then_steps = self.conversion_steps(&then_ty, &result, then_value.position);
        if !then_steps.is_empty() {
            self.program.insert_steps(skip_else, then_steps);
        }
        result
    }

    fn common_type(&self, a: &Type, b: &Type) -> Option<Type> {
        let classes = &self.process.classes;
        if a == b {
            return Some(a.clone());
        }
        if *a == UNKNOWN {
            return Some(b.clone());
        }
        if *b == UNKNOWN {
            return Some(a.clone());
        }
        // numeric branches widen to the larger type
        if let (Some(x), Some(y)) = (a.primitive(), b.primitive()) {
            if x.is_numeric() && y.is_numeric() {
                return a
                    .result_type(Operator::Plus, Some(b))
                    .filter(|widened| widened.is_numeric());
            }
        }
        if a.is_assignable_to(b, classes) {
            return Some(b.clone());
        }
        if b.is_assignable_to(a, classes) {
            return Some(a.clone());
        }
        if a.is_reference() && b.is_reference() {
            return Some(Type::OBJECT);
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use crate::ast::build::*;
    use crate::compiler::{CodeGenerator, CODE_GENERATION_PHASE};
    use crate::types::Operator;
    use crate::vm::Process;

    fn output(statements: Vec<crate::ast::Stmt>) -> String {
        let mut process = Process::new();
        let generated = CodeGenerator::generate(&module("m", vec![], statements), &mut process);
        assert!(!generated.has_errors(), "{:?}", generated.errors);
        let result = generated.execute(&mut process).unwrap();
        assert!(result.is_completed(), "{:?}", result);
        process.console.take()
    }

    #[test]
    fn test_loops_with_break_and_continue() {
        let out = output(vec![for_loop(
            vec![local(ty("int"), "i", Some(int(0)))],
            Some(binary(Operator::Lower, ident("i"), int(10))),
            vec![post_inc(ident("i"))],
            block(vec![
                if_then(binary(Operator::Equal, ident("i"), int(2)), cont()),
                if_then(binary(Operator::Equal, ident("i"), int(5)), brk()),
                print(ident("i")),
            ]),
        )]);
        assert_eq!(out, "0134");
    }

    #[test]
    fn test_do_while_runs_once() {
        let out = output(vec![
            local(ty("int"), "n", Some(int(10))),
            do_while(block(vec![println(ident("n")), expr(post_inc(ident("n")))]), boolean(false)),
        ]);
        assert_eq!(out, "10\n");
    }

    #[test]
    fn test_for_each_over_array() {
        let out = output(vec![
            var("xs", array_literal(ty("int"), vec![int(3), int(4), int(5)])),
            local(ty("int"), "sum", Some(int(0))),
            for_each(ty("double"), "x", ident("xs"), expr(compound(Operator::Plus, ident("sum"), int(1)))),
            for_each(ty("int"), "x", ident("xs"), expr(compound(Operator::Plus, ident("sum"), ident("x")))),
            println(ident("sum")),
        ]);
        assert_eq!(out, "15\n");
    }

    #[test]
    fn test_short_circuit_skips_right_side() {
        let out = output(vec![
            local(ty("int"), "calls", Some(int(0))),
            local(
                ty("boolean"),
                "b",
                Some(binary(
                    Operator::And,
                    boolean(false),
                    binary(Operator::Equal, pre_inc(ident("calls")), int(1)),
                )),
            ),
            println(binary(
                Operator::Plus,
                binary(Operator::Plus, string(""), ident("b")),
                ident("calls"),
            )),
        ]);
        assert_eq!(out, "false0\n");
    }

    #[test]
    fn test_ternary_widens_then_branch() {
        let out = output(vec![
            local(ty("boolean"), "c", Some(boolean(true))),
            println(ternary(ident("c"), int(3), double(2.5))),
            println(ternary(ident("c"), double(0.5), int(1))),
        ]);
        assert_eq!(out, "3\n0.5\n");
    }

    #[test]
    fn test_break_outside_loop() {
        let mut process = Process::new();
        let generated = CodeGenerator::generate(&module("m", vec![], vec![brk()]), &mut process);
        assert_eq!(
            generated.errors.phase(CODE_GENERATION_PHASE)[0].message,
            "break outside of loop."
        );
    }
}
