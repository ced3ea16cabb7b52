//! Declaration pass
//!
//! Registers every class of a module before any body is generated, so code
//! can refer to classes and members declared further down. Classes are
//! created base-first, then attributes, enum constants and method signatures
//! are added, layouts are finalized, and enum constants are instantiated into
//! their companion's slots.

use super::{Diagnostic, ErrorCollection, TYPE_RESOLUTION_PHASE};
use crate::ast::{self, ClassDecl, Expr, ExprKind, Literal, MethodDecl, Module, TextPosition, TypeNode};
use crate::types::{Operator, Type};
use crate::vm::builtins::install_enum_methods;
use crate::vm::{
    Attribute, ClassId, ClassKind, ClassRegistry, EnumValue, Method, MethodBody, MethodId, Parameter, Process,
    Value, VmError, VmResult,
};

/// Registry ids assigned to one class declaration
#[derive(Debug, Clone)]
pub struct DeclaredClass {
    /// Registered class
    pub class: ClassId,
    /// Method ids parallel to `ClassDecl::methods`, `None` where the
    /// declaration was rejected
    pub methods: Vec<Option<MethodId>>,
    /// Implicit no-argument constructor of a class that declares none
    pub default_constructor: Option<MethodId>,
}

/// Outcome of the declaration pass, parallel to `Module::classes`
#[derive(Debug, Clone, Default)]
pub struct Declarations {
    /// `None` for declarations that could not be registered
    pub classes: Vec<Option<DeclaredClass>>,
}

/// Resolve a written type against the registry
pub fn resolve_type(classes: &ClassRegistry, node: &TypeNode) -> Option<Type> {
    match node {
        TypeNode::Named(name) => classes.resolve_type_name(name),
        TypeNode::Array(inner) => resolve_type(classes, inner).map(Type::array_of),
    }
}

/// Value and type of a literal
pub(crate) fn literal_value(literal: &Literal) -> (Value, Type) {
    match literal {
        Literal::Int(v) => (Value::Int(*v), Type::INT),
        Literal::Float(v) => (Value::Float(*v), Type::FLOAT),
        Literal::Double(v) => (Value::Double(*v), Type::DOUBLE),
        Literal::Bool(v) => (Value::Bool(*v), Type::BOOLEAN),
        Literal::Char(v) => (Value::Char(*v), Type::CHAR),
        Literal::Str(v) => (Value::string(v), Type::STRING),
        Literal::Null => (Value::Null, Type::Null),
    }
}

/// Literal or negated numeric literal
fn constant(expr: &Expr) -> Option<(Value, Type)> {
    match &expr.kind {
        ExprKind::Literal(literal) => Some(literal_value(literal)),
        ExprKind::Unary {
            op: Operator::Minus | Operator::Negation,
            operand,
        } => match &operand.kind {
            ExprKind::Literal(Literal::Int(v)) => Some((Value::Int(v.wrapping_neg()), Type::INT)),
            ExprKind::Literal(Literal::Float(v)) => Some((Value::Float(-v), Type::FLOAT)),
            ExprKind::Literal(Literal::Double(v)) => Some((Value::Double(-v), Type::DOUBLE)),
            _ => None,
        },
        _ => None,
    }
}

/// Register all classes of `module`
///
/// Diagnostics go to the type resolution phase of `errors`.
pub fn declare_module(module: &Module, process: &mut Process, errors: &mut ErrorCollection) -> Declarations {
    let mut declarer = Declarer {
        module,
        process,
        errors,
    };
    let ids = declarer.create_classes();

    let mut classes = Vec::with_capacity(ids.len());
    for (decl, id) in module.classes.iter().zip(&ids) {
        let Some(id) = *id else {
            classes.push(None);
            continue;
        };
        declarer.resolve_interfaces(decl, id);
        declarer.declare_attributes(decl, id);
        declarer.declare_enum_values(decl, id);
        let (methods, default_constructor) = declarer.declare_methods(decl, id);
        if decl.kind == ast::ClassKind::Enum {
            install_enum_methods(&mut declarer.process.classes, id);
        }
        classes.push(Some(DeclaredClass {
            class: id,
            methods,
            default_constructor,
        }));
    }

    for (decl, id) in module.classes.iter().zip(&ids) {
        let Some(id) = *id else { continue };
        if !declarer.process.classes.is_finalized(id) {
            if let Err(error) = declarer.process.classes.finalize_layout(id) {
                declarer.internal(VmError::from(error), decl.position);
            }
        }
    }
    for (decl, id) in module.classes.iter().zip(&ids) {
        let Some(id) = *id else { continue };
        if let Err(error) = declarer.instantiate_enum_values(decl, id) {
            declarer.internal(error, decl.position);
        }
    }

    tracing::debug!(module = %module.name, classes = classes.len(), "module declared");
    Declarations { classes }
}

enum BaseState {
    Ready(Option<ClassId>),
    Waiting,
    Unknown,
}

struct Declarer<'a> {
    module: &'a Module,
    process: &'a mut Process,
    errors: &'a mut ErrorCollection,
}

impl<'a> Declarer<'a> {
    fn error(&mut self, message: impl Into<String>, position: TextPosition) {
        self.errors.push(TYPE_RESOLUTION_PHASE, Diagnostic::error(message, position));
    }

    fn internal(&mut self, error: VmError, position: TextPosition) {
        self.error(error.to_string(), position);
    }

    fn resolve(&mut self, node: &TypeNode, position: TextPosition) -> Type {
        match resolve_type(&self.process.classes, node) {
            Some(ty) => ty,
            None => {
                self.error(format!("Unknown type {}.", node.display_name()), position);
                Type::OBJECT
            }
        }
    }

    // ========================================================================
    // Classes
    // ========================================================================

    /// Create classes so that every base exists before its subclasses
    fn create_classes(&mut self) -> Vec<Option<ClassId>> {
        let module = self.module;
        let mut ids = vec![None; module.classes.len()];
        let mut pending = Vec::new();
        for (i, decl) in module.classes.iter().enumerate() {
            let redeclared = self.process.classes.get_class_by_name(&decl.identifier).is_some()
                || module.classes[..i].iter().any(|d| d.identifier == decl.identifier);
            if redeclared {
                self.error(format!("Class {} is already defined.", decl.identifier), decl.position);
            } else {
                pending.push(i);
            }
        }

        while !pending.is_empty() {
            let count = pending.len();
            let mut waiting = Vec::new();
            for i in pending {
                let decl = &module.classes[i];
                match self.base_state(decl) {
                    BaseState::Ready(base) => {
                        let base = base.filter(|b| self.check_base(decl, *b));
                        ids[i] = Some(self.create(decl, base));
                    }
                    BaseState::Unknown => {
                        let name = decl.extends.clone().unwrap_or_default();
                        self.error(format!("Unknown base class {}.", name), decl.position);
                        ids[i] = Some(self.create(decl, None));
                    }
                    BaseState::Waiting => waiting.push(i),
                }
            }
            if waiting.len() == count {
                for i in waiting {
                    let decl = &module.classes[i];
                    self.error(
                        format!("Cyclic inheritance involving class {}.", decl.identifier),
                        decl.position,
                    );
                    ids[i] = Some(self.create(decl, None));
                }
                break;
            }
            pending = waiting;
        }
        ids
    }

    fn base_state(&self, decl: &ClassDecl) -> BaseState {
        let Some(name) = &decl.extends else {
            return BaseState::Ready(None);
        };
        if let Some(base) = self.process.classes.get_class_by_name(name) {
            return BaseState::Ready(Some(base.id));
        }
        if self.module.classes.iter().any(|d| &d.identifier == name) {
            BaseState::Waiting
        } else {
            BaseState::Unknown
        }
    }

    fn check_base(&mut self, decl: &ClassDecl, base: ClassId) -> bool {
        let Some(base_kind) = self.process.classes.get_class(base).map(|c| c.kind) else {
            return false;
        };
        let legal = match decl.kind {
            ast::ClassKind::Class => base_kind == ClassKind::Class,
            ast::ClassKind::Interface => base_kind == ClassKind::Interface,
            ast::ClassKind::Enum => false,
        };
        if !legal {
            let name = decl.extends.clone().unwrap_or_default();
            self.error(format!("{} cannot extend {}.", decl.identifier, name), decl.position);
        }
        legal
    }

    fn create(&mut self, decl: &ClassDecl, base: Option<ClassId>) -> ClassId {
        let kind = match decl.kind {
            ast::ClassKind::Class => ClassKind::Class,
            ast::ClassKind::Interface => ClassKind::Interface,
            ast::ClassKind::Enum => ClassKind::Enum,
        };
        // interfaces name their super-interfaces through `extends` too
        let base = if kind == ClassKind::Interface { None } else { base };
        let id = self.process.classes.create_class(&decl.identifier, kind, base);
        let is_system = self.module.is_system;
        if let Some(class) = self.process.classes.get_class_mut(id) {
            class.position = decl.position;
            class.serializable = decl.serializable;
            class.is_system = is_system;
        }
        if let Some(companion) = self
            .process
            .classes
            .companion(id)
            .and_then(|c| self.process.classes.get_class_mut(c))
        {
            companion.position = decl.position;
            companion.is_system = is_system;
        }
        tracing::debug!(class = %decl.identifier, id = id.0, "class declared");
        id
    }

    fn resolve_interfaces(&mut self, decl: &ClassDecl, id: ClassId) {
        let inherited = match decl.kind {
            ast::ClassKind::Interface => decl.extends.as_ref(),
            _ => None,
        };
        let mut interfaces = Vec::new();
        for name in decl.implements.iter().chain(inherited) {
            match self.process.classes.get_class_by_name(name) {
                Some(class) if class.kind == ClassKind::Interface => interfaces.push(class.id),
                Some(_) => self.error(format!("{} is not an interface.", name), decl.position),
                None => self.error(format!("Unknown interface {}.", name), decl.position),
            }
        }
        if let Some(class) = self.process.classes.get_class_mut(id) {
            class.interfaces = interfaces;
        }
    }

    // ========================================================================
    // Attributes
    // ========================================================================

    fn declare_attributes(&mut self, decl: &ClassDecl, id: ClassId) {
        let mut seen: Vec<&str> = Vec::new();
        for attr in &decl.attributes {
            if decl.kind == ast::ClassKind::Interface && !attr.is_static {
                self.error("Interfaces cannot declare instance attributes.", attr.position);
                continue;
            }
            if seen.contains(&attr.identifier.as_str()) {
                self.error(
                    format!("Attribute {} is already defined in class {}.", attr.identifier, decl.identifier),
                    attr.position,
                );
                continue;
            }
            seen.push(&attr.identifier);

            let ty = self.resolve(&attr.ty, attr.position);
            let initial_value = attr
                .initializer
                .as_ref()
                .and_then(|init| self.constant_initializer(init, &ty));
            let attribute = Attribute {
                is_static: attr.is_static,
                is_transient: attr.is_transient,
                visibility: attr.visibility,
                initial_value,
                position: attr.position,
                ..Attribute::new(attr.identifier.clone(), ty)
            };
            if let Err(error) = self.process.classes.add_attribute(id, attribute) {
                self.internal(error.into(), attr.position);
            }
        }
    }

    /// Literal initializer baked into the layout template
    ///
    /// Anything that is not an implicitly convertible literal is left to the
    /// generated initializer code.
    fn constant_initializer(&mut self, init: &Expr, ty: &Type) -> Option<Value> {
        let (value, from) = constant(init)?;
        let rule = from.cast_rule(ty, &self.process.classes)?;
        if !rule.automatic {
            return None;
        }
        if rule.needs_statement {
            Some(from.cast_to(&value, ty, &mut self.process.heap))
        } else {
            Some(value)
        }
    }

    fn declare_enum_values(&mut self, decl: &ClassDecl, id: ClassId) {
        if decl.enum_values.is_empty() {
            return;
        }
        if decl.kind != ast::ClassKind::Enum {
            self.error(
                format!("Only enums can declare constants, {} is not an enum.", decl.identifier),
                decl.position,
            );
            return;
        }
        for value in &decl.enum_values {
            if decl.attributes.iter().any(|a| a.identifier == value.identifier) {
                self.error(
                    format!("Attribute {} is already defined in class {}.", value.identifier, decl.identifier),
                    value.position,
                );
                continue;
            }
            let attribute = Attribute {
                is_static: true,
                position: value.position,
                ..Attribute::new(value.identifier.clone(), Type::Enum(id))
            };
            if let Err(error) = self.process.classes.add_attribute(id, attribute) {
                self.internal(error.into(), value.position);
            }
        }
    }

    // ========================================================================
    // Methods
    // ========================================================================

    fn declare_methods(&mut self, decl: &ClassDecl, id: ClassId) -> (Vec<Option<MethodId>>, Option<MethodId>) {
        let class_type = self
            .process
            .classes
            .get_class(id)
            .map(|c| c.ty())
            .unwrap_or(Type::Class(id));
        let is_interface = decl.kind == ast::ClassKind::Interface;

        let mut ids = Vec::with_capacity(decl.methods.len());
        let mut has_constructor = false;
        for m in &decl.methods {
            if m.is_constructor && is_interface {
                self.error("Interfaces cannot declare constructors.", m.position);
                ids.push(None);
                continue;
            }
            if m.is_constructor && m.identifier != decl.identifier {
                self.error(
                    format!("Constructor {} does not match class name {}.", m.identifier, decl.identifier),
                    m.position,
                );
            }
            let method = self.method_signature(m, id, &class_type, is_interface);
            let duplicate = self
                .process
                .classes
                .get_class(id)
                .map(|c| {
                    c.overloads(&method.name)
                        .iter()
                        .filter_map(|other| self.process.classes.method(*other))
                        .any(|other| other.same_signature(&method))
                })
                .unwrap_or(false);
            if duplicate {
                let signature = self.signature_text(&m.identifier, &method.params);
                self.error(
                    format!("Method {} is already defined in class {}.", signature, decl.identifier),
                    m.position,
                );
                ids.push(None);
                continue;
            }
            has_constructor |= method.is_constructor;
            ids.push(Some(self.process.classes.add_method(id, method)));
        }

        let default_constructor = (!is_interface && !has_constructor).then(|| {
            let mut method = Method::new(Method::CONSTRUCTOR, id, Vec::new(), class_type.clone());
            method.is_constructor = true;
            method.declaration = decl.position;
            self.process.classes.add_method(id, method)
        });
        (ids, default_constructor)
    }

    fn method_signature(&mut self, m: &MethodDecl, id: ClassId, class_type: &Type, is_interface: bool) -> Method {
        let params = m
            .params
            .iter()
            .map(|p| Parameter {
                name: p.identifier.clone(),
                ty: self.resolve(&p.ty, p.position),
            })
            .collect();
        let (name, return_type) = if m.is_constructor {
            (Method::CONSTRUCTOR.to_string(), class_type.clone())
        } else {
            let return_type = match &m.return_type {
                Some(node) => self.resolve(node, m.position),
                None => Type::VOID,
            };
            (m.identifier.clone(), return_type)
        };

        let mut method = Method::new(name, id, params, return_type);
        method.is_static = m.is_static && !m.is_constructor;
        method.is_constructor = m.is_constructor;
        method.is_abstract = m.is_abstract || (is_interface && m.body.is_none());
        method.visibility = m.visibility;
        method.declaration = m.position;
        method.first_statement = m.body.as_ref().and_then(|b| b.first()).map(|s| s.position);
        if method.is_abstract {
            method.body = MethodBody::Abstract;
        } else if m.body.is_none() {
            self.error(format!("Method {} has no body.", m.identifier), m.position);
            method.is_abstract = true;
            method.body = MethodBody::Abstract;
        }
        method
    }

    fn signature_text(&self, name: &str, params: &[Parameter]) -> String {
        let types: Vec<String> = params
            .iter()
            .map(|p| p.ty.identifier(&self.process.classes))
            .collect();
        format!("{}({})", name, types.join(", "))
    }

    // ========================================================================
    // Enum constants
    // ========================================================================

    /// Allocate each constant and store it in its companion slot
    ///
    /// Constructor calls with the declared arguments run later, from the
    /// class's static initializer.
    fn instantiate_enum_values(&mut self, decl: &ClassDecl, id: ClassId) -> VmResult<()> {
        if decl.kind != ast::ClassKind::Enum {
            return Ok(());
        }
        for (ordinal, value) in decl.enum_values.iter().enumerate() {
            let Some(index) = self
                .process
                .classes
                .find_static_attribute(id, &value.identifier)
                .and_then(|(_, attribute)| attribute.index)
            else {
                continue;
            };
            let object = self.process.instantiate(id)?;
            self.process.heap.object_mut(object)?.ordinal = Some(ordinal);
            let companion = self.process.static_object(id)?;
            self.process
                .heap
                .object_mut(companion)?
                .set(index, Value::Object(object))?;
            if let Some(class) = self.process.classes.get_class_mut(id) {
                class.enum_values.push(EnumValue {
                    identifier: value.identifier.clone(),
                    ordinal,
                    object,
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::build::*;

    fn declare(module: &Module) -> (Process, Declarations, ErrorCollection) {
        let mut process = Process::new();
        let mut errors = ErrorCollection::default();
        let declarations = declare_module(module, &mut process, &mut errors);
        (process, declarations, errors)
    }

    #[test]
    fn test_subclass_declared_before_base() {
        let module = module(
            "m",
            vec![
                class("Dog").extends("Animal").attribute(attribute("barks", ty("boolean")).build()).build(),
                class("Animal")
                    .attribute(attribute("name", ty("String")).build())
                    .attribute(attribute("legs", ty("int")).init(int(4)).build())
                    .build(),
            ],
            vec![],
        );
        let (process, declarations, errors) = declare(&module);
        assert!(errors.is_empty(), "{:?}", errors);

        let dog = declarations.classes[0].as_ref().unwrap().class;
        let animal = declarations.classes[1].as_ref().unwrap().class;
        assert!(process.classes.is_subclass_of(dog, animal));

        let slots: Vec<_> = process
            .classes
            .instance_attributes(dog)
            .into_iter()
            .map(|(_, a)| (a.identifier.clone(), a.index))
            .collect();
        assert_eq!(
            slots,
            vec![
                ("name".to_string(), Some(0)),
                ("legs".to_string(), Some(1)),
                ("barks".to_string(), Some(2)),
            ]
        );
        let template = &process.classes.get_class(dog).unwrap().layout.as_ref().unwrap().template;
        assert_eq!(template, &vec![Value::Null, Value::Int(4), Value::Bool(false)]);
    }

    #[test]
    fn test_literal_initializer_is_converted() {
        let module = module(
            "m",
            vec![class("P").attribute(attribute("x", ty("double")).init(int(2)).build()).build()],
            vec![],
        );
        let (process, _, _) = declare(&module);
        let p = process.classes.get_class_by_name("P").unwrap();
        assert_eq!(p.attribute("x").unwrap().initial_value, Some(Value::Int(2)));
    }

    #[test]
    fn test_enum_constants_are_instantiated() {
        let module = module("m", vec![enumeration("Color").value("RED", vec![]).value("BLUE", vec![]).build()], vec![]);
        let (mut process, declarations, errors) = declare(&module);
        assert!(errors.is_empty());
        let color = declarations.classes[0].as_ref().unwrap().class;

        let class = process.classes.get_class(color).unwrap();
        assert_eq!(class.enum_values.len(), 2);
        let blue = class.enum_values[1].object;
        assert_eq!(process.heap.object(blue).unwrap().ordinal, Some(1));

        let (_, attribute) = process.classes.find_static_attribute(color, "BLUE").unwrap();
        let index = attribute.index.unwrap();
        let companion = process.static_object(color).unwrap();
        assert_eq!(
            process.heap.object(companion).unwrap().get(index).unwrap(),
            &Value::Object(blue)
        );
        assert!(!process.classes.find_methods(color, "getValues").is_empty());
    }

    #[test]
    fn test_default_constructor() {
        let module = module("m", vec![class("A").build(), class("B").method(constructor("B").build()).build()], vec![]);
        let (process, declarations, _) = declare(&module);
        let a = declarations.classes[0].as_ref().unwrap();
        let b = declarations.classes[1].as_ref().unwrap();
        let ctor = process.classes.method(a.default_constructor.unwrap()).unwrap();
        assert!(ctor.is_constructor);
        assert_eq!(ctor.name, Method::CONSTRUCTOR);
        assert!(b.default_constructor.is_none());
    }

    #[test]
    fn test_declaration_errors() {
        let module = module(
            "m",
            vec![
                class("A").extends("Missing").build(),
                class("A").build(),
                class("X").extends("Y").build(),
                class("Y").extends("X").build(),
                class("C")
                    .method(method("f").param("a", ty("int")).build())
                    .method(method("f").param("b", ty("int")).build())
                    .attribute(attribute("q", ty("Nope")).build())
                    .build(),
            ],
            vec![],
        );
        let (_, declarations, errors) = declare(&module);
        let messages: Vec<_> = errors.phase(TYPE_RESOLUTION_PHASE).iter().map(|d| d.message.as_str()).collect();
        assert!(messages.contains(&"Class A is already defined."));
        assert!(messages.contains(&"Unknown base class Missing."));
        assert!(messages.contains(&"Cyclic inheritance involving class X."));
        assert!(messages.contains(&"Method f(int) is already defined in class C."));
        assert!(messages.contains(&"Unknown type Nope."));
        assert!(declarations.classes[1].is_none());
        assert_eq!(declarations.classes[4].as_ref().unwrap().methods[1], None);
    }
}
