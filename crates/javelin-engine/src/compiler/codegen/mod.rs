//! Step program generation
//!
//! The generator walks declared classes and the module's top-level
//! statements and emits one [`Program`] per body. Type checking happens on
//! the way: every expression reports its static type, operators go through
//! the operation tables, and implicit conversions through the cast tables.
//! Diagnostics are recorded in the code generation phase and generation
//! carries on with the next statement.

mod class_methods;
mod control_flow;
mod entry;
mod expr;
mod stmt;

use self::control_flow::LoopContext;
use super::declare::{self, Declarations};
use super::symbols::SymbolTable;
use super::{Diagnostic, Dispatch, ErrorCollection, Instruction, Program, Step, CODE_GENERATION_PHASE};
use crate::ast::{Module, TextPosition, TypeNode};
use crate::types::Type;
use crate::vm::{
    run_to_completion, Attribute, ClassId, ExecutionResult, Interpreter, MethodId, Process, Value, VmResult,
};
use std::rc::Rc;

/// Type of an expression that already produced a diagnostic
///
/// Checks involving it are skipped so one mistake reports once.
const UNKNOWN: Type = Type::Var;

/// Compiled form of a module
#[derive(Debug, Clone, Default)]
pub struct GeneratedModule {
    /// Module name
    pub name: String,
    /// Entry program: the top-level statements, or a call to `main`
    pub main_program: Option<Rc<Program>>,
    /// Static initializers in class declaration order
    pub static_initializers: Vec<Rc<Program>>,
    /// Method and constructor programs
    pub programs: Vec<Rc<Program>>,
    /// Diagnostics of all compile phases
    pub errors: ErrorCollection,
}

impl GeneratedModule {
    /// Whether any diagnostic is an error
    pub fn has_errors(&self) -> bool {
        self.errors.has_errors()
    }

    /// Run the static initializers to completion, in declaration order
    pub fn initialize(&self, process: &mut Process) -> VmResult<()> {
        for program in &self.static_initializers {
            run_to_completion(process, Rc::clone(program), &[])?;
        }
        Ok(())
    }

    /// Initialize statics and return an interpreter positioned at the entry
    ///
    /// `None` when the module has nothing to run.
    pub fn start(&self, process: &mut Process) -> VmResult<Option<Interpreter>> {
        self.initialize(process)?;
        let Some(main) = &self.main_program else {
            return Ok(None);
        };
        let mut interpreter = Interpreter::new();
        interpreter.start(process, Rc::clone(main), &[]);
        Ok(Some(interpreter))
    }

    /// Initialize statics and run the entry program
    ///
    /// Honors the process's step budget; a module without an entry program
    /// completes with `null`. A fault caused by an internal error is returned
    /// as `Err`, never as [`ExecutionResult::Failed`].
    pub fn execute(&self, process: &mut Process) -> VmResult<ExecutionResult> {
        let result = match self.start(process)? {
            Some(mut interpreter) => interpreter.run(process),
            None => ExecutionResult::completed(Value::Null),
        };
        result.into_checked()
    }
}

/// Where the body being generated lives
#[derive(Debug, Clone)]
struct MethodContext {
    /// Enclosing class (`None` for top-level statements)
    class: Option<ClassId>,
    /// No `this` available
    is_static: bool,
    /// `return` yields the receiver
    is_constructor: bool,
    /// Declared return type
    return_type: Type,
}

impl MethodContext {
    fn top_level() -> Self {
        Self {
            class: None,
            is_static: true,
            is_constructor: false,
            return_type: Type::VOID,
        }
    }
}

/// Already generated argument of a call
#[derive(Debug, Clone)]
struct ArgInfo {
    ty: Type,
    /// Index just past the argument's steps, where a conversion goes
    end: usize,
    position: TextPosition,
}

/// Code generator for one module
pub struct CodeGenerator<'p> {
    process: &'p mut Process,
    module: String,
    errors: ErrorCollection,
    program: Program,
    symbols: SymbolTable,
    loops: Vec<LoopContext>,
    context: MethodContext,
}

impl<'p> CodeGenerator<'p> {
    /// Declare and generate `module` into `process`
    ///
    /// Method bodies are installed into the process's class registry as they
    /// are generated; the returned module holds the entry and initializer
    /// programs plus all diagnostics.
    pub fn generate(module: &Module, process: &'p mut Process) -> GeneratedModule {
        let mut errors = ErrorCollection::default();
        let declarations = declare::declare_module(module, process, &mut errors);
        let mut generator = CodeGenerator {
            process,
            module: module.name.clone(),
            errors,
            program: Program::default(),
            symbols: SymbolTable::new(),
            loops: Vec::new(),
            context: MethodContext::top_level(),
        };

        let main = generator.generate_main(&module.statements);
        let mut generated = GeneratedModule {
            name: module.name.clone(),
            ..Default::default()
        };
        for (decl, declared) in module.classes.iter().zip(&declarations.classes) {
            let Some(declared) = declared else { continue };
            let programs = generator.generate_class(decl, declared);
            generated.programs.extend(programs.methods);
            generated.static_initializers.extend(programs.static_initializer);
        }
        generated.main_program = generator.resolve_entry(main, module, &declarations);
        generated.errors = generator.errors;
        tracing::debug!(
            module = %module.name,
            programs = generated.programs.len(),
            errors = generated.errors.len(),
            "module generated"
        );
        generated
    }

    // ========================================================================
    // Program bookkeeping
    // ========================================================================

    fn begin_program(&mut self, name: String, method: Option<MethodId>, context: MethodContext) {
        self.program = Program::new(self.module.clone(), name);
        self.program.method = method;
        self.symbols = SymbolTable::new();
        self.loops.clear();
        self.context = context;
    }

    fn finish_program(&mut self) -> Program {
        let mut program = std::mem::take(&mut self.program);
        program.stack_slot_count = self.symbols.stack_slot_count();
        tracing::debug!(program = %program.name, steps = program.steps.len(), "program generated");
        program
    }

    fn emit(&mut self, instruction: Instruction, position: TextPosition) -> usize {
        self.program.push(instruction, position)
    }

    fn emit_steps(&mut self, steps: Vec<Step>) {
        self.program.steps.extend(steps);
    }

    /// Keep the stack balanced after a failed expression
    fn poison(&mut self, position: TextPosition) -> Type {
        self.emit(Instruction::PushConstant { value: Value::Null }, position);
        UNKNOWN
    }

    fn error(&mut self, message: impl Into<String>, position: TextPosition) {
        self.errors
            .push(CODE_GENERATION_PHASE, Diagnostic::error(message, position));
    }

    fn type_name(&self, ty: &Type) -> String {
        ty.identifier(&self.process.classes)
    }

    fn class_name(&self, class: ClassId) -> String {
        self.process
            .classes
            .get_class(class)
            .map(|c| c.name.clone())
            .unwrap_or_else(|| format!("#{}", class.0))
    }

    fn resolve_type(&mut self, node: &TypeNode, position: TextPosition) -> Type {
        match declare::resolve_type(&self.process.classes, node) {
            Some(ty) => ty,
            None => {
                self.error(format!("Unknown type {}.", node.display_name()), position);
                UNKNOWN
            }
        }
    }

    // ========================================================================
    // Conversions
    // ========================================================================

    /// Steps converting the value on top of the stack from `from` to `to`
    ///
    /// Reports a diagnostic when no implicit conversion exists.
    fn conversion_steps(&mut self, from: &Type, to: &Type, position: TextPosition) -> Vec<Step> {
        if from == to || *from == UNKNOWN || *to == UNKNOWN {
            return Vec::new();
        }
        match from.cast_rule(to, &self.process.classes) {
            Some(rule) if rule.automatic => {
                if rule.needs_statement {
                    vec![Step {
                        instruction: Instruction::Cast {
                            from: from.clone(),
                            to: to.clone(),
                        },
                        position,
                    }]
                } else {
                    Vec::new()
                }
            }
            Some(_) => {
                let target = self.type_name(to);
                let diagnostic = Diagnostic::error(
                    format!("explicit cast required from {} to {}", self.type_name(from), target),
                    position,
                )
                .with_quick_fix(
                    format!("Insert cast ({})", target),
                    TextPosition::new(position.line, position.column, 0),
                    format!("({}) ", target),
                );
                self.errors.push(CODE_GENERATION_PHASE, diagnostic);
                Vec::new()
            }
            None => {
                let message = format!(
                    "Incompatible types: {} cannot be converted to {}.",
                    self.type_name(from),
                    self.type_name(to)
                );
                self.error(message, position);
                Vec::new()
            }
        }
    }

    /// Convert the value on top of the stack, emitting in place
    fn coerce(&mut self, from: &Type, to: &Type, position: TextPosition) {
        let steps = self.conversion_steps(from, to, position);
        self.emit_steps(steps);
    }

    /// Virtual `toString` call for a non-`String` reference operand
    fn stringify_steps(&self, ty: &Type, position: TextPosition) -> Option<Vec<Step>> {
        if !ty.is_reference() || ty.is_string() {
            return None;
        }
        let class = match ty {
            Type::Class(id) | Type::Enum(id) => *id,
            _ => ClassId::OBJECT,
        };
        let method = self.to_string_method(class)?;
        Some(vec![Step {
            instruction: Instruction::Call {
                method,
                arg_count: 0,
                dispatch: Dispatch::Stringify,
            },
            position,
        }])
    }

    fn to_string_method(&self, class: ClassId) -> Option<MethodId> {
        let classes = &self.process.classes;
        let find = |class: ClassId| {
            classes.find_methods(class, "toString").into_iter().find(|id| {
                classes
                    .method(*id)
                    .map(|m| m.params.is_empty() && !m.is_static)
                    .unwrap_or(false)
            })
        };
        find(class).or_else(|| find(ClassId::OBJECT))
    }

    /// Nearest instance attribute with the class declaring it
    fn find_instance_attribute(&self, class: ClassId, name: &str) -> Option<(ClassId, Attribute)> {
        let classes = &self.process.classes;
        classes.ancestors(class).into_iter().find_map(|owner| {
            classes
                .get_class(owner)?
                .attribute(name)
                .map(|attribute| (owner, attribute.clone()))
        })
    }

    fn find_static_attribute(&self, class: ClassId, name: &str) -> Option<(ClassId, Attribute)> {
        self.process
            .classes
            .find_static_attribute(class, name)
            .map(|(owner, attribute)| (owner, attribute.clone()))
    }

    fn check_access(&mut self, owner: ClassId, attribute: &Attribute, position: TextPosition) {
        if !self
            .process
            .classes
            .is_accessible(owner, attribute.visibility, self.context.class)
        {
            let message = format!(
                "{} has {} access in {}.",
                attribute.identifier,
                visibility_name(attribute.visibility),
                self.class_name(owner)
            );
            self.error(message, position);
        }
    }
}

fn visibility_name(visibility: crate::ast::Visibility) -> &'static str {
    match visibility {
        crate::ast::Visibility::Public => "public",
        crate::ast::Visibility::Protected => "protected",
        crate::ast::Visibility::Private => "private",
    }
}
