//! Entry program selection
//!
//! A module's top-level statements form its main program. When there are
//! none, the entry is a `public static void main(String[])` method of one of
//! the module's classes, wrapped in a two-step program.

use super::{CodeGenerator, MethodContext};
use crate::ast::{self, Module, Stmt, TextPosition, Visibility};
use crate::compiler::declare::Declarations;
use crate::compiler::{Instruction, Program};
use crate::types::Type;
use crate::vm::{ClassId, MethodId};
use std::rc::Rc;

/// Name of the entry program in stack traces
const MAIN: &str = "main";

impl CodeGenerator<'_> {
    /// Program of the module's top-level statements
    pub(super) fn generate_main(&mut self, statements: &[Stmt]) -> Program {
        self.begin_program(MAIN.to_string(), None, MethodContext::top_level());
        for stmt in statements {
            self.gen_stmt(stmt);
        }
        let end = statements
            .last()
            .map(|s| s.position)
            .unwrap_or_else(TextPosition::synthetic);
        self.emit(Instruction::CloseStackFrame, end);
        self.finish_program()
    }

    /// Choose the entry program
    ///
    /// Top-level statements that produced code win. Otherwise exactly one
    /// class may declare a static `main`; more than one is an error and no
    /// method is selected.
    pub(super) fn resolve_entry(
        &mut self,
        main: Program,
        module: &Module,
        declarations: &Declarations,
    ) -> Option<Rc<Program>> {
        // anything beyond the closing step means real top-level code
        if main.steps.len() > 2 {
            return Some(Rc::new(main));
        }

        let mut found: Option<(MethodId, ClassId)> = None;
        let mut ambiguous = false;
        for (decl, declared) in module.classes.iter().zip(&declarations.classes) {
            if decl.kind != ast::ClassKind::Class {
                continue;
            }
            let Some(declared) = declared else { continue };
            let Some(method) = declared
                .methods
                .iter()
                .flatten()
                .copied()
                .find(|id| self.is_main_method(*id))
            else {
                continue;
            };
            if found.is_some() {
                self.error("Multiple classes contain a static main method.", decl.position);
                ambiguous = true;
            } else {
                found = Some((method, declared.class));
            }
        }

        match found.filter(|_| !ambiguous) {
            Some((method, class)) => {
                let position = self
                    .process
                    .classes
                    .method(method)
                    .map(|m| m.entry_position())
                    .unwrap_or_default();
                let mut program = Program::new(self.module.clone(), MAIN);
                program.push(
                    Instruction::CallMain {
                        method,
                        static_class: class,
                    },
                    position,
                );
                program.push(Instruction::CloseStackFrame, position);
                program.stack_slot_count = 1;
                tracing::debug!(class = %self.class_name(class), "entry is static main");
                Some(Rc::new(program))
            }
            None if module.statements.is_empty() => None,
            None => Some(Rc::new(main)),
        }
    }

    fn is_main_method(&self, id: MethodId) -> bool {
        self.process
            .classes
            .method(id)
            .map(|m| {
                m.name == MAIN
                    && m.is_static
                    && m.visibility == Visibility::Public
                    && m.params.len() == 1
                    && m.params[0].ty == Type::array_of(Type::STRING)
            })
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use crate::ast::build::*;
    use crate::compiler::{CodeGenerator, Instruction, CODE_GENERATION_PHASE};
    use crate::vm::Process;

    #[test]
    fn test_static_main_entry() {
        let m = module(
            "m",
            vec![class("App")
                .method(main_method(vec![println(string("hello")).at(4, 9)]))
                .build()],
            vec![],
        );
        let mut process = Process::new();
        let generated = CodeGenerator::generate(&m, &mut process);
        let main = generated.main_program.clone().unwrap();
        assert_eq!(main.steps.len(), 2);
        assert!(matches!(main.steps[0].instruction, Instruction::CallMain { .. }));
        assert!(matches!(main.steps[1].instruction, Instruction::CloseStackFrame));
        assert_eq!(main.steps[0].position.line, 4);
        generated.execute(&mut process).unwrap();
        assert_eq!(process.console.take(), "hello\n");
    }

    #[test]
    fn test_top_level_statements_win() {
        let m = module(
            "m",
            vec![class("App").method(main_method(vec![println(string("main"))])).build()],
            vec![println(string("top"))],
        );
        let mut process = Process::new();
        let generated = CodeGenerator::generate(&m, &mut process);
        generated.execute(&mut process).unwrap();
        assert_eq!(process.console.take(), "top\n");
    }

    #[test]
    fn test_multiple_main_methods() {
        let m = module(
            "m",
            vec![
                class("A").method(main_method(vec![])).build(),
                class("B").method(main_method(vec![])).build(),
            ],
            vec![],
        );
        let mut process = Process::new();
        let generated = CodeGenerator::generate(&m, &mut process);
        assert!(generated.main_program.is_none());
        assert_eq!(
            generated.errors.phase(CODE_GENERATION_PHASE)[0].message,
            "Multiple classes contain a static main method."
        );
    }

    #[test]
    fn test_nothing_to_run() {
        let m = module("m", vec![class("A").build()], vec![]);
        let mut process = Process::new();
        let generated = CodeGenerator::generate(&m, &mut process);
        assert!(generated.main_program.is_none());
        assert!(generated.execute(&mut process).unwrap().is_completed());
    }
}
