//! Expression generation
//!
//! Every `gen_*` leaves exactly one value on the stack and returns its static
//! type, also on error, so enclosing expressions stay balanced.

use super::{ArgInfo, CodeGenerator, UNKNOWN};
use crate::ast::{Expr, ExprKind, TextPosition, TypeNode};
use crate::compiler::declare::literal_value;
use crate::compiler::{Dispatch, Instruction};
use crate::types::{Operator, Type};
use crate::vm::{ClassId, ClassKind, Method, MethodId};

/// Storage location written by an assignment
///
/// Any object or array reference the location needs has already been pushed.
#[derive(Debug, Clone, Copy)]
pub(super) enum Target {
    Local { offset: usize },
    Attribute { index: usize },
    Static { class: ClassId, index: usize },
    Element,
}

/// Result of looking up a bare name as a variable
enum Variable {
    Found(Target, Type),
    /// Lookup failed and a diagnostic was already recorded
    Reported,
    Missing,
}

/// How the receiver of an overloaded call was provided
enum Receiver {
    /// Not yet emitted; the step at this index is patched after resolution
    Implicit(usize),
    /// Class name: only static methods qualify
    Class(usize),
    /// Evaluated expression
    Value,
}

impl CodeGenerator<'_> {
    /// Emit `expr`, leaving its value on the stack
    pub(super) fn gen_expr(&mut self, expr: &Expr) -> Type {
        let position = expr.position;
        match &expr.kind {
            ExprKind::Literal(literal) => {
                let (value, ty) = literal_value(literal);
                self.emit(Instruction::PushConstant { value }, position);
                ty
            }
            ExprKind::Identifier(name) => self.gen_identifier(name, position),
            ExprKind::This => self.gen_this(position),
            ExprKind::Binary { op, lhs, rhs } => self.gen_binary(*op, lhs, rhs, position),
            ExprKind::Unary { op, operand } => self.gen_unary(*op, operand, position),
            ExprKind::Assign { op, target, value } => self.gen_assign(*op, target, value, true, position),
            ExprKind::IncDec {
                increment,
                prefix,
                target,
            } => self.gen_inc_dec(*increment, *prefix, target, true, position),
            ExprKind::Call {
                receiver,
                method,
                args,
            } => self.gen_call(receiver.as_deref(), method, args, position),
            ExprKind::SuperCall { method, args } => match method {
                Some(method) => self.gen_super_call(method, args, position),
                None => {
                    self.error("Call to super must be first statement in constructor.", position);
                    self.poison(position)
                }
            },
            ExprKind::New { class, args } => self.gen_new(class, args, position),
            ExprKind::NewArray {
                element,
                dimensions,
                extra_dimensions,
            } => self.gen_new_array(element, dimensions, *extra_dimensions, position),
            ExprKind::ArrayLiteral { element, elements } => self.gen_array_literal(element, elements, position),
            ExprKind::Index { array, index } => self.gen_index(array, index, position),
            ExprKind::Field { receiver, name } => self.gen_field(receiver, name, position),
            ExprKind::Cast { ty, operand } => self.gen_cast(ty, operand, position),
            ExprKind::InstanceOf { operand, ty } => self.gen_instance_of(operand, ty, position),
            ExprKind::Ternary {
                condition,
                then_value,
                else_value,
            } => self.gen_ternary(condition, then_value, else_value, position),
        }
    }

    /// Emit `expr` for its side effects, leaving nothing on the stack
    pub(super) fn gen_discard(&mut self, expr: &Expr) {
        let position = expr.position;
        match &expr.kind {
            ExprKind::Assign { op, target, value } => {
                self.gen_assign(*op, target, value, false, position);
            }
            ExprKind::IncDec {
                increment, target, ..
            } => {
                // prefix and postfix are the same when the value is unused
                self.gen_inc_dec(*increment, true, target, false, position);
            }
            _ => {
                self.gen_expr(expr);
                self.emit(Instruction::Pop, position);
            }
        }
    }

    // ========================================================================
    // Names
    // ========================================================================

    fn lookup_variable(&mut self, name: &str, position: TextPosition) -> Variable {
        if let Some(symbol) = self.symbols.lookup(name) {
            return Variable::Found(Target::Local { offset: symbol.offset }, symbol.ty.clone());
        }
        let Some(class) = self.context.class else {
            return Variable::Missing;
        };
        if let Some((owner, attribute)) = self.find_instance_attribute(class, name) {
            if self.context.is_static {
                self.error(
                    format!("Cannot access instance attribute {} from a static context.", name),
                    position,
                );
                return Variable::Reported;
            }
            self.check_access(owner, &attribute, position);
            let Some(index) = attribute.index else {
                return Variable::Missing;
            };
            self.emit(Instruction::LoadLocal { offset: 0 }, position);
            return Variable::Found(Target::Attribute { index }, attribute.ty);
        }
        if let Some((owner, attribute)) = self.find_static_attribute(class, name) {
            self.check_access(owner, &attribute, position);
            if let Some(index) = attribute.index {
                return Variable::Found(Target::Static { class: owner, index }, attribute.ty);
            }
        }
        Variable::Missing
    }

    fn class_by_name(&self, name: &str) -> Option<ClassId> {
        self.process
            .classes
            .get_class_by_name(name)
            .filter(|class| !class.is_static())
            .map(|class| class.id)
    }

    /// Class named by a bare identifier that is not shadowed by a variable
    fn class_reference(&self, expr: &Expr) -> Option<ClassId> {
        let ExprKind::Identifier(name) = &expr.kind else {
            return None;
        };
        if self.symbols.lookup(name).is_some() {
            return None;
        }
        if let Some(class) = self.context.class {
            if self.find_instance_attribute(class, name).is_some() || self.find_static_attribute(class, name).is_some()
            {
                return None;
            }
        }
        self.class_by_name(name)
    }

    fn gen_identifier(&mut self, name: &str, position: TextPosition) -> Type {
        match self.lookup_variable(name, position) {
            Variable::Found(target, ty) => {
                self.load_target(target, position);
                ty
            }
            Variable::Reported => self.poison(position),
            Variable::Missing => {
                let message = if self.class_by_name(name).is_some() {
                    format!("{} is a class name, not a value.", name)
                } else {
                    format!("Unknown variable {}.", name)
                };
                self.error(message, position);
                self.poison(position)
            }
        }
    }

    fn gen_this(&mut self, position: TextPosition) -> Type {
        match self.context.class {
            Some(class) if !self.context.is_static => {
                self.emit(Instruction::LoadLocal { offset: 0 }, position);
                self.process
                    .classes
                    .get_class(class)
                    .map(|c| c.ty())
                    .unwrap_or(UNKNOWN)
            }
            _ => {
                self.error("Cannot use this in a static context.", position);
                self.poison(position)
            }
        }
    }

    fn gen_field(&mut self, receiver: &Expr, name: &str, position: TextPosition) -> Type {
        if let Some(class) = self.class_reference(receiver) {
            return match self.find_static_attribute(class, name) {
                Some((owner, attribute)) => {
                    self.check_access(owner, &attribute, position);
                    let index = attribute.index.unwrap_or_default();
                    self.emit(Instruction::LoadStatic { class: owner, index }, position);
                    attribute.ty
                }
                None => {
                    let message = format!("Unknown static attribute {} in class {}.", name, self.class_name(class));
                    self.error(message, position);
                    self.poison(position)
                }
            };
        }

        let ty = self.gen_expr(receiver);
        if ty == UNKNOWN {
            return UNKNOWN;
        }
        if let Type::Array(_) = ty {
            if name == "length" {
                self.emit(Instruction::ArrayLength, position);
                return Type::INT;
            }
        }
        match self.attribute_target(&ty, name, position) {
            Some((target, attribute_ty)) => {
                self.load_target(target, position);
                attribute_ty
            }
            None => {
                self.emit(Instruction::Pop, position);
                self.poison(position)
            }
        }
    }

    /// Attribute of the object on top of the stack
    ///
    /// A static attribute reached through an instance drops the instance.
    fn attribute_target(&mut self, ty: &Type, name: &str, position: TextPosition) -> Option<(Target, Type)> {
        let class = ty.class_id();
        let found = class.and_then(|class| {
            self.find_instance_attribute(class, name)
                .map(|found| (found, false))
                .or_else(|| self.find_static_attribute(class, name).map(|found| (found, true)))
        });
        let Some(((owner, attribute), is_static)) = found else {
            let message = format!("Unknown attribute {} in type {}.", name, self.type_name(ty));
            self.error(message, position);
            return None;
        };
        self.check_access(owner, &attribute, position);
        let index = attribute.index.unwrap_or_default();
        if is_static {
            self.emit(Instruction::Pop, position);
            Some((Target::Static { class: owner, index }, attribute.ty))
        } else {
            Some((Target::Attribute { index }, attribute.ty))
        }
    }

    // ========================================================================
    // Operators
    // ========================================================================

    fn gen_binary(&mut self, op: Operator, lhs: &Expr, rhs: &Expr, position: TextPosition) -> Type {
        if op.is_short_circuit() {
            return self.gen_short_circuit(op, lhs, rhs, position);
        }
        let mut left = self.gen_expr(lhs);
        let left_end = self.program.next_index();
        let mut right = self.gen_expr(rhs);
        if left == UNKNOWN || right == UNKNOWN {
            self.emit(Instruction::Pop, position);
            return UNKNOWN;
        }
        if op == Operator::Plus && (left.is_string() || right.is_string()) {
            if let Some(steps) = self.stringify_steps(&right, rhs.position) {
                self.emit_steps(steps);
                right = Type::STRING;
            }
            if let Some(steps) = self.stringify_steps(&left, lhs.position) {
                self.program.insert_steps(left_end, steps);
                left = Type::STRING;
            }
        }
        match left.result_type(op, Some(&right)) {
            Some(result) => {
                self.emit(Instruction::Binary { op, left }, position);
                result
            }
            None => {
                let message = format!(
                    "Operator {} cannot be applied to {} and {}.",
                    op.symbol(),
                    self.type_name(&left),
                    self.type_name(&right)
                );
                self.error(message, position);
                self.emit(Instruction::Pop, position);
                UNKNOWN
            }
        }
    }

    fn gen_unary(&mut self, op: Operator, operand: &Expr, position: TextPosition) -> Type {
        let ty = self.gen_expr(operand);
        if ty == UNKNOWN {
            return UNKNOWN;
        }
        if op == Operator::Plus && ty.numeric_view().map(|k| k.is_numeric()).unwrap_or(false) {
            return ty;
        }
        match ty.result_type(op, None) {
            Some(result) => {
                self.emit(Instruction::Unary { op, operand: ty }, position);
                result
            }
            None => {
                let message = format!("Operator {} cannot be applied to {}.", op.symbol(), self.type_name(&ty));
                self.error(message, position);
                UNKNOWN
            }
        }
    }

    // ========================================================================
    // Assignment
    // ========================================================================

    /// Emit pushes for an assignment target and return where it stores
    fn gen_target(&mut self, expr: &Expr) -> Option<(Target, Type)> {
        let position = expr.position;
        match &expr.kind {
            ExprKind::Identifier(name) => match self.lookup_variable(name, position) {
                Variable::Found(target, ty) => Some((target, ty)),
                Variable::Reported => None,
                Variable::Missing => {
                    self.error(format!("Unknown variable {}.", name), position);
                    None
                }
            },
            ExprKind::Field { receiver, name } => {
                if let Some(class) = self.class_reference(receiver) {
                    return match self.find_static_attribute(class, name) {
                        Some((owner, attribute)) => {
                            self.check_access(owner, &attribute, position);
                            let index = attribute.index.unwrap_or_default();
                            Some((Target::Static { class: owner, index }, attribute.ty))
                        }
                        None => {
                            let message =
                                format!("Unknown static attribute {} in class {}.", name, self.class_name(class));
                            self.error(message, position);
                            None
                        }
                    };
                }
                let ty = self.gen_expr(receiver);
                if ty == UNKNOWN {
                    self.emit(Instruction::Pop, position);
                    return None;
                }
                if matches!(ty, Type::Array(_)) && name == "length" {
                    self.error("Cannot assign a value to final variable length.", position);
                    self.emit(Instruction::Pop, position);
                    return None;
                }
                let found = self.attribute_target(&ty, name, position);
                if found.is_none() {
                    self.emit(Instruction::Pop, position);
                }
                found
            }
            ExprKind::Index { array, index } => {
                let array_ty = self.gen_expr(array);
                let index_ty = self.gen_expr(index);
                self.coerce(&index_ty, &Type::INT, index.position);
                match array_ty {
                    Type::Array(element) => Some((Target::Element, *element)),
                    other => {
                        if other != UNKNOWN {
                            let message = format!("Array required, but {} found.", self.type_name(&other));
                            self.error(message, position);
                        }
                        self.emit(Instruction::Pop, position);
                        self.emit(Instruction::Pop, position);
                        None
                    }
                }
            }
            _ => {
                self.error("Invalid assignment target.", position);
                None
            }
        }
    }

    fn load_target(&mut self, target: Target, position: TextPosition) {
        let instruction = match target {
            Target::Local { offset } => Instruction::LoadLocal { offset },
            Target::Attribute { index } => Instruction::LoadAttribute { index },
            Target::Static { class, index } => Instruction::LoadStatic { class, index },
            Target::Element => Instruction::LoadElement,
        };
        self.emit(instruction, position);
    }

    fn store_target(&mut self, target: Target, keep: bool, position: TextPosition) {
        let instruction = match target {
            Target::Local { offset } => Instruction::StoreLocal { offset, keep },
            Target::Attribute { index } => Instruction::StoreAttribute { index, keep },
            Target::Static { class, index } => Instruction::StoreStatic { class, index, keep },
            Target::Element => Instruction::StoreElement { keep },
        };
        self.emit(instruction, position);
    }

    /// Move the references a target needs into hidden locals
    fn spill(&mut self, target: Target, position: TextPosition) -> Vec<usize> {
        let count = match target {
            Target::Local { .. } | Target::Static { .. } => 0,
            Target::Attribute { .. } => 1,
            Target::Element => 2,
        };
        let temps: Vec<usize> = (0..count).map(|_| self.symbols.reserve()).collect();
        for &offset in temps.iter().rev() {
            self.emit(Instruction::StoreLocal { offset, keep: false }, position);
        }
        temps
    }

    fn reload(&mut self, temps: &[usize], position: TextPosition) {
        for &offset in temps {
            self.emit(Instruction::LoadLocal { offset }, position);
        }
    }

    /// Cast an arithmetic result back to the target's type
    fn narrow_to(&mut self, result: &Type, target: &Type, position: TextPosition) {
        if result == target || *result == UNKNOWN || *target == UNKNOWN {
            return;
        }
        match result.cast_rule(target, &self.process.classes) {
            Some(rule) => {
                if rule.needs_statement {
                    self.emit(
                        Instruction::Cast {
                            from: result.clone(),
                            to: target.clone(),
                        },
                        position,
                    );
                }
            }
            None => {
                let message = format!(
                    "Incompatible types: {} cannot be converted to {}.",
                    self.type_name(result),
                    self.type_name(target)
                );
                self.error(message, position);
            }
        }
    }

    fn gen_assign(
        &mut self,
        op: Option<Operator>,
        target: &Expr,
        value: &Expr,
        keep: bool,
        position: TextPosition,
    ) -> Type {
        self.symbols.push_scope();
        let ty = self.gen_assign_scoped(op, target, value, keep, position);
        self.symbols.pop_scope();
        ty
    }

    fn gen_assign_scoped(
        &mut self,
        op: Option<Operator>,
        target: &Expr,
        value: &Expr,
        keep: bool,
        position: TextPosition,
    ) -> Type {
        let Some((place, target_ty)) = self.gen_target(target) else {
            // evaluate the value anyway for its diagnostics
            self.gen_expr(value);
            if !keep {
                self.emit(Instruction::Pop, position);
            }
            return UNKNOWN;
        };

        let Some(op) = op else {
            let value_ty = self.gen_expr(value);
            self.coerce(&value_ty, &target_ty, value.position);
            self.store_target(place, keep, position);
            return target_ty;
        };

        let temps = self.spill(place, position);
        self.reload(&temps, position);
        self.reload(&temps, position);
        self.load_target(place, position);
        let mut value_ty = self.gen_expr(value);
        if op == Operator::Plus && target_ty.is_string() {
            if let Some(steps) = self.stringify_steps(&value_ty, value.position) {
                self.emit_steps(steps);
                value_ty = Type::STRING;
            }
        }
        let result = if target_ty == UNKNOWN || value_ty == UNKNOWN {
            self.emit(Instruction::Pop, position);
            UNKNOWN
        } else {
            match target_ty.result_type(op, Some(&value_ty)) {
                Some(result) => {
                    self.emit(
                        Instruction::Binary {
                            op,
                            left: target_ty.clone(),
                        },
                        position,
                    );
                    result
                }
                None => {
                    let message = format!(
                        "Operator {}= cannot be applied to {} and {}.",
                        op.symbol(),
                        self.type_name(&target_ty),
                        self.type_name(&value_ty)
                    );
                    self.error(message, position);
                    self.emit(Instruction::Pop, position);
                    UNKNOWN
                }
            }
        };
        self.narrow_to(&result, &target_ty, position);
        self.store_target(place, keep, position);
        target_ty
    }

    fn gen_inc_dec(
        &mut self,
        increment: bool,
        prefix: bool,
        target: &Expr,
        keep: bool,
        position: TextPosition,
    ) -> Type {
        let op = if increment {
            Operator::Increment
        } else {
            Operator::Decrement
        };
        self.symbols.push_scope();
        let ty = match self.gen_target(target) {
            Some((place, ty)) => {
                let temps = self.spill(place, position);
                if keep && !prefix {
                    // old value stays below the update
                    self.reload(&temps, position);
                    self.load_target(place, position);
                }
                self.reload(&temps, position);
                self.reload(&temps, position);
                self.load_target(place, position);
                let result = match ty.result_type(op, None) {
                    _ if ty == UNKNOWN => UNKNOWN,
                    Some(result) => {
                        self.emit(
                            Instruction::Unary {
                                op,
                                operand: ty.clone(),
                            },
                            position,
                        );
                        result
                    }
                    None => {
                        let message = format!("Operator {} cannot be applied to {}.", op.symbol(), self.type_name(&ty));
                        self.error(message, position);
                        UNKNOWN
                    }
                };
                self.narrow_to(&result, &ty, position);
                self.store_target(place, keep && prefix, position);
                ty
            }
            None => {
                if keep {
                    self.poison(position);
                }
                UNKNOWN
            }
        };
        self.symbols.pop_scope();
        ty
    }

    // ========================================================================
    // Calls
    // ========================================================================

    pub(super) fn gen_args(&mut self, args: &[Expr]) -> Vec<ArgInfo> {
        args.iter()
            .map(|arg| {
                let ty = self.gen_expr(arg);
                ArgInfo {
                    ty,
                    end: self.program.next_index(),
                    position: arg.position,
                }
            })
            .collect()
    }

    /// Drop a failed call's receiver and arguments, leaving a placeholder
    fn abandon_call(&mut self, arg_count: usize, position: TextPosition) -> Type {
        for _ in 0..=arg_count {
            self.emit(Instruction::Pop, position);
        }
        self.poison(position)
    }

    /// Pick the overload best matching `args`
    ///
    /// Exact matches win, then the applicable overload needing the fewest
    /// conversions. With a single candidate of the right arity it is chosen
    /// even if inapplicable so the conversion reports the precise problem.
    pub(super) fn resolve_overload(
        &mut self,
        candidates: &[MethodId],
        args: &[ArgInfo],
        display_name: &str,
        position: TextPosition,
    ) -> Option<MethodId> {
        if args.iter().any(|arg| arg.ty == UNKNOWN) {
            return None;
        }
        let classes = &self.process.classes;
        let by_arity: Vec<&Method> = candidates
            .iter()
            .filter_map(|id| classes.method(*id))
            .filter(|m| m.params.len() == args.len())
            .collect();

        let exact = by_arity
            .iter()
            .find(|m| m.params.iter().zip(args).all(|(p, a)| p.ty == a.ty));
        let chosen = exact.map(|m| m.id).or_else(|| {
            by_arity
                .iter()
                .filter(|m| {
                    m.params
                        .iter()
                        .zip(args)
                        .all(|(p, a)| a.ty.is_assignable_to(&p.ty, classes))
                })
                .min_by_key(|m| m.params.iter().zip(args).filter(|(p, a)| p.ty != a.ty).count())
                .map(|m| m.id)
        });
        let chosen = chosen.or_else(|| match by_arity.as_slice() {
            [only] => Some(only.id),
            _ => None,
        });
        if chosen.is_none() {
            let types: Vec<String> = args.iter().map(|a| a.ty.identifier(classes)).collect();
            let message = format!("No applicable method {}({}).", display_name, types.join(", "));
            self.error(message, position);
        }
        chosen
    }

    /// Insert argument conversions for the chosen method, last argument first
    pub(super) fn convert_args(&mut self, method: MethodId, args: &[ArgInfo]) {
        let params: Vec<Type> = self
            .process
            .classes
            .method(method)
            .map(|m| m.params.iter().map(|p| p.ty.clone()).collect())
            .unwrap_or_default();
        for (arg, param) in args.iter().zip(&params).rev() {
            let steps = self.conversion_steps(&arg.ty, param, arg.position);
            if !steps.is_empty() {
                self.program.insert_steps(arg.end, steps);
            }
        }
    }

    /// Record a use site and check visibility of a resolved method
    pub(super) fn use_method(&mut self, method: MethodId, position: TextPosition) {
        let Some(descriptor) = self.process.classes.method(method) else {
            return;
        };
        let (owner, visibility, name) = (descriptor.owner, descriptor.visibility, descriptor.name.clone());
        if !self.process.classes.is_accessible(owner, visibility, self.context.class) {
            let display = if name == Method::CONSTRUCTOR {
                self.class_name(owner)
            } else {
                name
            };
            let message = format!(
                "{} has {} access in {}.",
                display,
                super::visibility_name(visibility),
                self.class_name(owner)
            );
            self.error(message, position);
        }
        if let Some(descriptor) = self.process.classes.method_mut(method) {
            descriptor.usage_positions.push(position);
        }
    }

    fn return_type_of(&self, method: MethodId) -> Type {
        self.process
            .classes
            .method(method)
            .map(|m| m.return_type.clone())
            .unwrap_or(UNKNOWN)
    }

    fn gen_call(&mut self, receiver: Option<&Expr>, name: &str, args: &[Expr], position: TextPosition) -> Type {
        let (search, receiver_kind) = match receiver {
            None => {
                let Some(class) = self.context.class else {
                    let args = self.gen_args(args);
                    self.error(format!("Unknown method {}.", name), position);
                    for _ in 0..args.len() {
                        self.emit(Instruction::Pop, position);
                    }
                    return self.poison(position);
                };
                let placeholder = self.emit(Instruction::Noop, position);
                (class, Receiver::Implicit(placeholder))
            }
            Some(expr) => match self.class_reference(expr) {
                Some(class) => {
                    let placeholder = self.emit(Instruction::Noop, position);
                    (class, Receiver::Class(placeholder))
                }
                None => {
                    let ty = self.gen_expr(expr);
                    let class = match &ty {
                        Type::Class(id) | Type::Enum(id) | Type::Interface(id) => Some(*id),
                        Type::Array(_) | Type::Null => Some(ClassId::OBJECT),
                        _ => None,
                    };
                    match class {
                        Some(class) => (class, Receiver::Value),
                        None => {
                            let args = self.gen_args(args);
                            if ty != UNKNOWN {
                                let message =
                                    format!("Cannot call method {} on primitive type {}.", name, self.type_name(&ty));
                                self.error(message, position);
                            }
                            return self.abandon_call(args.len(), position);
                        }
                    }
                }
            },
        };

        let args = self.gen_args(args);
        let mut candidates = self.process.classes.find_methods(search, name);
        if candidates.is_empty() && search != ClassId::OBJECT {
            candidates = self.process.classes.find_methods(ClassId::OBJECT, name);
        }
        if candidates.is_empty() {
            let message = format!("Unknown method {} in class {}.", name, self.class_name(search));
            self.error(message, position);
            return self.abandon_receiver(&receiver_kind, args.len(), position);
        }
        let Some(method) = self.resolve_overload(&candidates, &args, name, position) else {
            return self.abandon_receiver(&receiver_kind, args.len(), position);
        };
        self.convert_args(method, &args);
        self.use_method(method, position);

        let (is_static, owner) = self
            .process
            .classes
            .method(method)
            .map(|m| (m.is_static, m.owner))
            .unwrap_or((true, search));
        let dispatch = match receiver_kind {
            Receiver::Implicit(at) if is_static => {
                self.program.steps[at].instruction = Instruction::PushStaticClass { class: owner };
                Dispatch::Static
            }
            Receiver::Implicit(at) => {
                if self.context.is_static {
                    let message = format!("Cannot call instance method {} from a static context.", name);
                    self.error(message, position);
                }
                self.program.steps[at].instruction = Instruction::LoadLocal { offset: 0 };
                Dispatch::Virtual
            }
            Receiver::Class(at) => {
                if !is_static {
                    let message = format!("Cannot call instance method {} without an object.", name);
                    self.error(message, position);
                }
                self.program.steps[at].instruction = Instruction::PushStaticClass { class: owner };
                Dispatch::Static
            }
            // a static method ignores the evaluated receiver in slot 0
            Receiver::Value if is_static => Dispatch::Static,
            Receiver::Value => Dispatch::Virtual,
        };
        self.emit(
            Instruction::Call {
                method,
                arg_count: args.len(),
                dispatch,
            },
            position,
        );
        self.return_type_of(method)
    }

    /// Unwind a call whose target could not be resolved
    fn abandon_receiver(&mut self, receiver: &Receiver, arg_count: usize, position: TextPosition) -> Type {
        match receiver {
            Receiver::Implicit(_) | Receiver::Class(_) => {
                for _ in 0..arg_count {
                    self.emit(Instruction::Pop, position);
                }
                self.poison(position)
            }
            Receiver::Value => self.abandon_call(arg_count, position),
        }
    }

    fn gen_super_call(&mut self, name: &str, args: &[Expr], position: TextPosition) -> Type {
        let base = self
            .context
            .class
            .and_then(|class| self.process.classes.get_class(class))
            .and_then(|class| class.base_class);
        let Some(base) = base.filter(|_| !self.context.is_static) else {
            self.error("Cannot use super in a static context.", position);
            let args = self.gen_args(args);
            for _ in 0..args.len() {
                self.emit(Instruction::Pop, position);
            }
            return self.poison(position);
        };

        self.emit(Instruction::LoadLocal { offset: 0 }, position);
        let args = self.gen_args(args);
        let candidates: Vec<MethodId> = self
            .process
            .classes
            .find_methods(base, name)
            .into_iter()
            .filter(|id| self.process.classes.method(*id).map(|m| !m.is_static).unwrap_or(false))
            .collect();
        if candidates.is_empty() {
            let message = format!("Unknown method {} in class {}.", name, self.class_name(base));
            self.error(message, position);
            return self.abandon_call(args.len(), position);
        }
        let Some(method) = self.resolve_overload(&candidates, &args, name, position) else {
            return self.abandon_call(args.len(), position);
        };
        if self.process.classes.method(method).map(|m| m.is_abstract).unwrap_or(false) {
            let message = format!("Abstract method {} cannot be accessed directly.", name);
            self.error(message, position);
        }
        self.convert_args(method, &args);
        self.use_method(method, position);
        self.emit(
            Instruction::Call {
                method,
                arg_count: args.len(),
                dispatch: Dispatch::Super,
            },
            position,
        );
        self.return_type_of(method)
    }

    fn gen_new(&mut self, name: &str, args: &[Expr], position: TextPosition) -> Type {
        let Some(class) = self.class_by_name(name) else {
            self.error(format!("Unknown class {}.", name), position);
            let args = self.gen_args(args);
            for _ in 0..args.len() {
                self.emit(Instruction::Pop, position);
            }
            return self.poison(position);
        };
        let (kind, ty, constructors) = match self.process.classes.get_class(class) {
            Some(c) => (c.kind, c.ty(), c.overloads(Method::CONSTRUCTOR).to_vec()),
            None => return self.poison(position),
        };
        let refused = match kind {
            ClassKind::Interface => Some("interface"),
            ClassKind::Enum => Some("enum"),
            _ => None,
        };
        if let Some(what) = refused {
            self.error(format!("Cannot instantiate {} {}.", what, name), position);
            let args = self.gen_args(args);
            for _ in 0..args.len() {
                self.emit(Instruction::Pop, position);
            }
            return self.poison(position);
        }

        self.emit(Instruction::NewObject { class }, position);
        let args = self.gen_args(args);
        if constructors.is_empty() {
            if !args.is_empty() {
                let message = format!("Class {} has no constructor taking {} arguments.", name, args.len());
                self.error(message, position);
                return self.abandon_call(args.len(), position);
            }
            return ty;
        }
        let Some(constructor) = self.resolve_overload(&constructors, &args, name, position) else {
            return self.abandon_call(args.len(), position);
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
        ty
    }

    // ========================================================================
    // Arrays, casts, type tests
    // ========================================================================

    fn gen_new_array(
        &mut self,
        element: &TypeNode,
        dimensions: &[Expr],
        extra_dimensions: usize,
        position: TextPosition,
    ) -> Type {
        let element_ty = self.resolve_type(element, position);
        if dimensions.is_empty() {
            self.error("Array dimension missing.", position);
            return self.poison(position);
        }
        for dimension in dimensions {
            let ty = self.gen_expr(dimension);
            self.coerce(&ty, &Type::INT, dimension.position);
        }
        self.emit(
            Instruction::NewArray {
                element: element_ty.clone(),
                dimensions: dimensions.len(),
                extra_dimensions,
            },
            position,
        );
        (0..dimensions.len() + extra_dimensions).fold(element_ty, |ty, _| Type::array_of(ty))
    }

    fn gen_array_literal(&mut self, element: &TypeNode, elements: &[Expr], position: TextPosition) -> Type {
        let element_ty = self.resolve_type(element, position);
        for value in elements {
            let ty = self.gen_expr(value);
            self.coerce(&ty, &element_ty, value.position);
        }
        self.emit(
            Instruction::ArrayLiteral {
                element: element_ty.clone(),
                count: elements.len(),
            },
            position,
        );
        Type::array_of(element_ty)
    }

    fn gen_index(&mut self, array: &Expr, index: &Expr, position: TextPosition) -> Type {
        let array_ty = self.gen_expr(array);
        let index_ty = self.gen_expr(index);
        self.coerce(&index_ty, &Type::INT, index.position);
        match array_ty {
            Type::Array(element) => {
                self.emit(Instruction::LoadElement, position);
                *element
            }
            other => {
                if other != UNKNOWN {
                    let message = format!("Array required, but {} found.", self.type_name(&other));
                    self.error(message, position);
                }
                self.emit(Instruction::Pop, position);
                self.emit(Instruction::Pop, position);
                self.poison(position)
            }
        }
    }

    fn gen_cast(&mut self, ty: &TypeNode, operand: &Expr, position: TextPosition) -> Type {
        let target = self.resolve_type(ty, position);
        let from = self.gen_expr(operand);
        if from == UNKNOWN || target == UNKNOWN || from == target {
            return target;
        }
        match from.cast_rule(&target, &self.process.classes) {
            None => {
                let message = format!("Cannot cast from {} to {}.", self.type_name(&from), self.type_name(&target));
                self.error(message, position);
            }
            Some(rule) => match reference_cast(&from, &target) {
                // reference casts never convert, they only check
                Some((from_class, to_class)) => {
                    if !self.process.classes.is_subclass_of(from_class, to_class) {
                        self.emit(Instruction::CheckCast { target: to_class }, position);
                    }
                }
                None if rule.needs_statement => {
                    self.emit(
                        Instruction::Cast {
                            from,
                            to: target.clone(),
                        },
                        position,
                    );
                }
                None => {}
            },
        }
        target
    }

    fn gen_instance_of(&mut self, operand: &Expr, ty: &TypeNode, position: TextPosition) -> Type {
        let from = self.gen_expr(operand);
        let target = self.resolve_type(ty, position);
        if from == UNKNOWN || target == UNKNOWN {
            self.emit(Instruction::Pop, position);
            return self.poison(position);
        }
        let Some(class) = target.class_id() else {
            let message = format!("instanceof requires a class type, but {} found.", self.type_name(&target));
            self.error(message, position);
            self.emit(Instruction::Pop, position);
            return self.poison(position);
        };
        if !from.is_reference() || !from.can_cast_to(&target, &self.process.classes) {
            let message = format!(
                "Incompatible types: {} cannot be converted to {}.",
                self.type_name(&from),
                self.type_name(&target)
            );
            self.error(message, position);
        }
        self.emit(Instruction::InstanceOf { target: class }, position);
        Type::BOOLEAN
    }
}

/// Class ids of a cast between two non-boxed reference types
fn reference_cast(from: &Type, to: &Type) -> Option<(ClassId, ClassId)> {
    let class = |ty: &Type| match ty {
        Type::Class(id) if id.boxed_primitive().is_none() => Some(*id),
        Type::Interface(id) | Type::Enum(id) => Some(*id),
        _ => None,
    };
    Some((class(from)?, class(to)?))
}
