//! Method, constructor and static initializer programs of one class

use super::stmt::always_returns;
use super::{CodeGenerator, MethodContext, UNKNOWN};
use crate::ast::{ClassDecl, Expr, ExprKind, MethodDecl, ParamDecl, Stmt, StmtKind, TextPosition};
use crate::compiler::declare::DeclaredClass;
use crate::compiler::{Dispatch, Instruction, Program};
use crate::types::Type;
use crate::vm::{ClassId, Method, MethodBody, MethodId, Value};
use std::rc::Rc;

/// Programs generated for one class
#[derive(Debug, Default)]
pub(super) struct ClassPrograms {
    pub methods: Vec<Rc<Program>>,
    pub static_initializer: Option<Rc<Program>>,
}

impl CodeGenerator<'_> {
    pub(super) fn generate_class(&mut self, decl: &ClassDecl, declared: &DeclaredClass) -> ClassPrograms {
        let class = declared.class;
        let mut programs = ClassPrograms::default();

        for (method_decl, id) in decl.methods.iter().zip(&declared.methods) {
            let Some(id) = *id else { continue };
            let program = if method_decl.is_constructor {
                let body = method_decl.body.as_deref().unwrap_or_default();
                self.gen_constructor(decl, class, id, &method_decl.params, body, method_decl.position)
            } else {
                match &method_decl.body {
                    Some(body) if !method_decl.is_abstract => self.gen_method(decl, class, id, method_decl, body),
                    _ => continue,
                }
            };
            programs.methods.push(self.install(id, program));
        }

        if let Some(id) = declared.default_constructor {
            let program = self.gen_constructor(decl, class, id, &[], &[], decl.position);
            programs.methods.push(self.install(id, program));
        }

        programs.static_initializer = self.gen_static_initializer(decl, class).map(Rc::new);
        tracing::debug!(class = %decl.identifier, methods = programs.methods.len(), "class generated");
        programs
    }

    /// Attach a generated body to its method descriptor
    fn install(&mut self, id: MethodId, program: Program) -> Rc<Program> {
        let program = Rc::new(program);
        if let Some(method) = self.process.classes.method_mut(id) {
            method.body = MethodBody::Program(Rc::clone(&program));
        }
        program
    }

    fn declare_params(&mut self, params: &[ParamDecl], id: MethodId) {
        let types: Vec<Type> = self
            .process
            .classes
            .method(id)
            .map(|m| m.params.iter().map(|p| p.ty.clone()).collect())
            .unwrap_or_default();
        for (param, ty) in params.iter().zip(types) {
            if self.symbols.declare(&param.identifier, ty).is_err() {
                let message = format!("Variable {} is already defined.", param.identifier);
                self.error(message, param.position);
            }
        }
    }

    fn gen_method(
        &mut self,
        decl: &ClassDecl,
        class: ClassId,
        id: MethodId,
        method_decl: &MethodDecl,
        body: &[Stmt],
    ) -> Program {
        let return_type = self
            .process
            .classes
            .method(id)
            .map(|m| m.return_type.clone())
            .unwrap_or(UNKNOWN);
        let context = MethodContext {
            class: Some(class),
            is_static: method_decl.is_static,
            is_constructor: false,
            return_type: return_type.clone(),
        };
        self.begin_program(format!("{}.{}", decl.identifier, method_decl.identifier), Some(id), context);
        self.declare_params(&method_decl.params, id);
        for stmt in body {
            self.gen_stmt(stmt);
        }

        let end = body.last().map(|s| s.position).unwrap_or(method_decl.position);
        if return_type.is_void() {
            self.emit(Instruction::Return { has_value: false }, end);
        } else if !always_returns(body) {
            if return_type != UNKNOWN {
                let message = format!("Missing return statement in method {}.", method_decl.identifier);
                self.error(message, method_decl.position);
            }
            self.emit(
                Instruction::PushConstant {
                    value: return_type.default_value(),
                },
                end,
            );
            self.emit(Instruction::Return { has_value: true }, end);
        }
        self.finish_program()
    }

    /// Constructor: base constructor, attribute initializers, body, `return this`
    fn gen_constructor(
        &mut self,
        decl: &ClassDecl,
        class: ClassId,
        id: MethodId,
        params: &[ParamDecl],
        body: &[Stmt],
        position: TextPosition,
    ) -> Program {
        let context = MethodContext {
            class: Some(class),
            is_static: false,
            is_constructor: true,
            return_type: Type::VOID,
        };
        self.begin_program(format!("{}.{}", decl.identifier, Method::CONSTRUCTOR), Some(id), context);
        self.declare_params(params, id);

        let (super_args, super_position, rest) = match body.split_first() {
            Some((first, rest)) => match explicit_super(first) {
                Some(args) => (args, first.position, rest),
                None => (&[][..], position, body),
            },
            None => (&[][..], position, body),
        };
        self.gen_base_constructor(class, super_args, super_position);
        self.gen_attribute_initializers(decl, class, false);
        for stmt in rest {
            self.gen_stmt(stmt);
        }

        let end = body.last().map(|s| s.position).unwrap_or(position);
        self.emit(Instruction::LoadLocal { offset: 0 }, end);
        self.emit(Instruction::Return { has_value: true }, end);
        self.finish_program()
    }

    /// Call the base class constructor on the receiver
    ///
    /// Bases without constructors (such as `Object`) need no call.
    fn gen_base_constructor(&mut self, class: ClassId, args: &[Expr], position: TextPosition) {
        let base = self
            .process
            .classes
            .get_class(class)
            .and_then(|c| c.base_class);
        let constructors: Vec<MethodId> = base
            .and_then(|base| self.process.classes.get_class(base))
            .map(|base| base.overloads(Method::CONSTRUCTOR).to_vec())
            .unwrap_or_default();
        let base_name = base.map(|base| self.class_name(base)).unwrap_or_default();

        if constructors.is_empty() {
            if !args.is_empty() {
                let message = format!("Class {} has no constructor taking {} arguments.", base_name, args.len());
                self.error(message, position);
            }
            return;
        }

        self.emit(Instruction::LoadLocal { offset: 0 }, position);
        let args = self.gen_args(args);
        let Some(constructor) = self.resolve_overload(&constructors, &args, &base_name, position) else {
            for _ in 0..=args.len() {
                self.emit(Instruction::Pop, position);
            }
            return;
        };
        self.convert_args(constructor, &args);
        self.use_method(constructor, position);
        self.emit(
            Instruction::Call {
                method: constructor,
                arg_count: args.len(),
                dispatch: Dispatch::Super,
            },
            position,
        );
        self.emit(Instruction::Pop, position);
    }

    /// Initializers not folded into the attribute template at declaration
    fn gen_attribute_initializers(&mut self, decl: &ClassDecl, class: ClassId, statics: bool) {
        for attribute_decl in decl.attributes.iter().filter(|a| a.is_static == statics) {
            let Some(initializer) = &attribute_decl.initializer else {
                continue;
            };
            let found = if statics {
                self.find_static_attribute(class, &attribute_decl.identifier)
            } else {
                self.find_instance_attribute(class, &attribute_decl.identifier)
            };
            let Some((owner, attribute)) = found.filter(|(owner, _)| *owner == class) else {
                continue;
            };
            if attribute.initial_value.is_some() {
                continue;
            }
            let Some(index) = attribute.index else { continue };
            let position = attribute_decl.position;
            if !statics {
                self.emit(Instruction::LoadLocal { offset: 0 }, position);
            }
            let ty = self.gen_expr(initializer);
            self.coerce(&ty, &attribute.ty, initializer.position);
            let store = if statics {
                Instruction::StoreStatic {
                    class: owner,
                    index,
                    keep: false,
                }
            } else {
                Instruction::StoreAttribute { index, keep: false }
            };
            self.emit(store, position);
        }
    }

    /// Enum constructor calls, then static attribute initializers
    ///
    /// `None` when the class has nothing to initialize.
    fn gen_static_initializer(&mut self, decl: &ClassDecl, class: ClassId) -> Option<Program> {
        let context = MethodContext {
            class: Some(class),
            is_static: true,
            is_constructor: false,
            return_type: Type::VOID,
        };
        self.begin_program(format!("{}.<static>", decl.identifier), None, context);

        let (values, constructors) = match self.process.classes.get_class(class) {
            Some(c) => (
                c.enum_values
                    .iter()
                    .map(|v| (v.ordinal, v.object))
                    .collect::<Vec<_>>(),
                c.overloads(Method::CONSTRUCTOR).to_vec(),
            ),
            None => (Vec::new(), Vec::new()),
        };
        for (value_decl, (_, object)) in decl.enum_values.iter().zip(values) {
            let position = value_decl.position;
            self.emit(
                Instruction::PushConstant {
                    value: Value::Object(object),
                },
                position,
            );
            let args = self.gen_args(&value_decl.args);
            let resolved = self.resolve_overload(&constructors, &args, &decl.identifier, position);
            match resolved {
                Some(constructor) => {
                    self.convert_args(constructor, &args);
                    self.use_method(constructor, position);
                    self.emit(
                        Instruction::Call {
                            method: constructor,
                            arg_count: args.len(),
                            dispatch: Dispatch::Super,
                        },
                        position,
                    );
                    self.emit(Instruction::Pop, position);
                }
                None => {
                    for _ in 0..=args.len() {
                        self.emit(Instruction::Pop, position);
                    }
                }
            }
        }

        self.gen_attribute_initializers(decl, class, true);
        let mut program = self.finish_program();
        if program.steps.is_empty() {
            return None;
        }
        program.push(Instruction::Return { has_value: false }, decl.position);
        Some(program)
    }
}

/// Arguments of a leading `super(...)` statement
fn explicit_super(stmt: &Stmt) -> Option<&[Expr]> {
    match &stmt.kind {
        StmtKind::Expr(Expr {
            kind: ExprKind::SuperCall { method: None, args },
            ..
        }) => Some(args),
        _ => None,
    }
}
