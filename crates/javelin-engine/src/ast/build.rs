//! Constructor helpers for syntax trees
//!
//! Tools that synthesize modules without a parser (tests, the benchmark,
//! embedding hosts) use these instead of spelling out every node. Nodes get a
//! default position of line 1; use [`Expr::at`] / [`Stmt::at`] where the
//! position matters.

use super::*;

fn default_position() -> TextPosition {
    TextPosition::new(1, 1, 0)
}

/// Shorthand for a source position
pub fn pos(line: u32, column: u32) -> TextPosition {
    TextPosition::new(line, column, 0)
}

impl Expr {
    /// Wrap an expression kind with the default position
    pub fn new(kind: ExprKind) -> Self {
        Self {
            kind,
            position: default_position(),
        }
    }

    /// Override the position
    pub fn at(mut self, line: u32, column: u32) -> Self {
        self.position = pos(line, column);
        self
    }
}

impl Stmt {
    /// Wrap a statement kind with the default position
    pub fn new(kind: StmtKind) -> Self {
        Self {
            kind,
            position: default_position(),
        }
    }

    /// Override the position
    pub fn at(mut self, line: u32, column: u32) -> Self {
        self.position = pos(line, column);
        self
    }
}

// ============================================================================
// Types
// ============================================================================

/// Named type (`int`, `String`, `Foo`)
pub fn ty(name: &str) -> TypeNode {
    TypeNode::Named(name.to_string())
}

/// Array type
pub fn array_of(element: TypeNode) -> TypeNode {
    TypeNode::Array(Box::new(element))
}

// ============================================================================
// Expressions
// ============================================================================

/// `int` literal
pub fn int(value: i32) -> Expr {
    Expr::new(ExprKind::Literal(Literal::Int(value)))
}

/// `float` literal
pub fn float(value: f32) -> Expr {
    Expr::new(ExprKind::Literal(Literal::Float(value)))
}

/// `double` literal
pub fn double(value: f64) -> Expr {
    Expr::new(ExprKind::Literal(Literal::Double(value)))
}

/// `boolean` literal
pub fn boolean(value: bool) -> Expr {
    Expr::new(ExprKind::Literal(Literal::Bool(value)))
}

/// `char` literal
pub fn chr(value: char) -> Expr {
    Expr::new(ExprKind::Literal(Literal::Char(value)))
}

/// String literal
pub fn string(value: &str) -> Expr {
    Expr::new(ExprKind::Literal(Literal::Str(value.to_string())))
}

/// `null`
pub fn null() -> Expr {
    Expr::new(ExprKind::Literal(Literal::Null))
}

/// Name reference
pub fn ident(name: &str) -> Expr {
    Expr::new(ExprKind::Identifier(name.to_string()))
}

/// `this`
pub fn this() -> Expr {
    Expr::new(ExprKind::This)
}

/// Binary operation
pub fn binary(op: Operator, lhs: Expr, rhs: Expr) -> Expr {
    Expr::new(ExprKind::Binary {
        op,
        lhs: Box::new(lhs),
        rhs: Box::new(rhs),
    })
}

/// Prefix unary operation
pub fn unary(op: Operator, operand: Expr) -> Expr {
    Expr::new(ExprKind::Unary {
        op,
        operand: Box::new(operand),
    })
}

/// `target = value`
pub fn assign(target: Expr, value: Expr) -> Expr {
    Expr::new(ExprKind::Assign {
        op: None,
        target: Box::new(target),
        value: Box::new(value),
    })
}

/// `target op= value`
pub fn compound(op: Operator, target: Expr, value: Expr) -> Expr {
    Expr::new(ExprKind::Assign {
        op: Some(op),
        target: Box::new(target),
        value: Box::new(value),
    })
}

fn inc_dec(increment: bool, prefix: bool, target: Expr) -> Expr {
    Expr::new(ExprKind::IncDec {
        increment,
        prefix,
        target: Box::new(target),
    })
}

/// `target++`
pub fn post_inc(target: Expr) -> Expr {
    inc_dec(true, false, target)
}

/// `++target`
pub fn pre_inc(target: Expr) -> Expr {
    inc_dec(true, true, target)
}

/// `target--`
pub fn post_dec(target: Expr) -> Expr {
    inc_dec(false, false, target)
}

/// `--target`
pub fn pre_dec(target: Expr) -> Expr {
    inc_dec(false, true, target)
}

/// `receiver.method(args)`
pub fn call(receiver: Expr, method: &str, args: Vec<Expr>) -> Expr {
    Expr::new(ExprKind::Call {
        receiver: Some(Box::new(receiver)),
        method: method.to_string(),
        args,
    })
}

/// `method(args)` inside the current class
pub fn call_here(method: &str, args: Vec<Expr>) -> Expr {
    Expr::new(ExprKind::Call {
        receiver: None,
        method: method.to_string(),
        args,
    })
}

/// `super(args)`
pub fn super_ctor(args: Vec<Expr>) -> Expr {
    Expr::new(ExprKind::SuperCall { method: None, args })
}

/// `super.method(args)`
pub fn super_call(method: &str, args: Vec<Expr>) -> Expr {
    Expr::new(ExprKind::SuperCall {
        method: Some(method.to_string()),
        args,
    })
}

/// `new Class(args)`
pub fn new_object(class: &str, args: Vec<Expr>) -> Expr {
    Expr::new(ExprKind::New {
        class: class.to_string(),
        args,
    })
}

/// `new T[d0][d1]...`
pub fn new_array(element: TypeNode, dimensions: Vec<Expr>) -> Expr {
    Expr::new(ExprKind::NewArray {
        element,
        dimensions,
        extra_dimensions: 0,
    })
}

/// `new T[]{elements}`
pub fn array_literal(element: TypeNode, elements: Vec<Expr>) -> Expr {
    Expr::new(ExprKind::ArrayLiteral { element, elements })
}

/// `array[index]`
pub fn index(array: Expr, index: Expr) -> Expr {
    Expr::new(ExprKind::Index {
        array: Box::new(array),
        index: Box::new(index),
    })
}

/// `receiver.name`
pub fn field(receiver: Expr, name: &str) -> Expr {
    Expr::new(ExprKind::Field {
        receiver: Box::new(receiver),
        name: name.to_string(),
    })
}

/// `(ty) operand`
pub fn cast(ty: TypeNode, operand: Expr) -> Expr {
    Expr::new(ExprKind::Cast {
        ty,
        operand: Box::new(operand),
    })
}

/// `operand instanceof ty`
pub fn instance_of(operand: Expr, ty: TypeNode) -> Expr {
    Expr::new(ExprKind::InstanceOf {
        operand: Box::new(operand),
        ty,
    })
}

/// `condition ? then_value : else_value`
pub fn ternary(condition: Expr, then_value: Expr, else_value: Expr) -> Expr {
    Expr::new(ExprKind::Ternary {
        condition: Box::new(condition),
        then_value: Box::new(then_value),
        else_value: Box::new(else_value),
    })
}

// ============================================================================
// Statements
// ============================================================================

/// `ty name = initializer;`
pub fn local(ty: TypeNode, name: &str, initializer: Option<Expr>) -> Stmt {
    Stmt::new(StmtKind::LocalVar {
        ty: Some(ty),
        identifier: name.to_string(),
        initializer,
    })
}

/// `var name = initializer;`
pub fn var(name: &str, initializer: Expr) -> Stmt {
    Stmt::new(StmtKind::LocalVar {
        ty: None,
        identifier: name.to_string(),
        initializer: Some(initializer),
    })
}

/// Expression statement
pub fn expr(expr: Expr) -> Stmt {
    Stmt::new(StmtKind::Expr(expr))
}

/// `if (condition) then_branch`
pub fn if_then(condition: Expr, then_branch: Stmt) -> Stmt {
    Stmt::new(StmtKind::If {
        condition,
        then_branch: Box::new(then_branch),
        else_branch: None,
    })
}

/// `if (condition) then_branch else else_branch`
pub fn if_else(condition: Expr, then_branch: Stmt, else_branch: Stmt) -> Stmt {
    Stmt::new(StmtKind::If {
        condition,
        then_branch: Box::new(then_branch),
        else_branch: Some(Box::new(else_branch)),
    })
}

/// `while (condition) body`
pub fn while_loop(condition: Expr, body: Stmt) -> Stmt {
    Stmt::new(StmtKind::While {
        condition,
        body: Box::new(body),
    })
}

/// `do body while (condition);`
pub fn do_while(body: Stmt, condition: Expr) -> Stmt {
    Stmt::new(StmtKind::DoWhile {
        body: Box::new(body),
        condition,
    })
}

/// `for (init; condition; update) body`
pub fn for_loop(init: Vec<Stmt>, condition: Option<Expr>, update: Vec<Expr>, body: Stmt) -> Stmt {
    Stmt::new(StmtKind::For {
        init,
        condition,
        update,
        body: Box::new(body),
    })
}

/// `for (ty name : iterable) body`
pub fn for_each(ty: TypeNode, name: &str, iterable: Expr, body: Stmt) -> Stmt {
    Stmt::new(StmtKind::ForEach {
        ty: Some(ty),
        identifier: name.to_string(),
        iterable,
        body: Box::new(body),
    })
}

/// `return value;`
pub fn ret(value: Expr) -> Stmt {
    Stmt::new(StmtKind::Return(Some(value)))
}

/// `return;`
pub fn ret_void() -> Stmt {
    Stmt::new(StmtKind::Return(None))
}

/// `{ statements }`
pub fn block(statements: Vec<Stmt>) -> Stmt {
    Stmt::new(StmtKind::Block(statements))
}

/// `break;`
pub fn brk() -> Stmt {
    Stmt::new(StmtKind::Break)
}

/// `continue;`
pub fn cont() -> Stmt {
    Stmt::new(StmtKind::Continue)
}

/// `System.out.println(value);`
pub fn println(value: Expr) -> Stmt {
    Stmt::new(StmtKind::Print {
        value: Some(value),
        newline: true,
    })
}

/// `System.out.print(value);`
pub fn print(value: Expr) -> Stmt {
    Stmt::new(StmtKind::Print {
        value: Some(value),
        newline: false,
    })
}

// ============================================================================
// Declarations
// ============================================================================

/// Module from classes and top-level statements
pub fn module(name: &str, classes: Vec<ClassDecl>, statements: Vec<Stmt>) -> Module {
    Module {
        name: name.to_string(),
        is_system: false,
        classes,
        statements,
    }
}

/// Builder for [`ClassDecl`]
#[derive(Debug, Clone)]
pub struct ClassBuilder {
    decl: ClassDecl,
}

/// Start a class declaration
pub fn class(name: &str) -> ClassBuilder {
    ClassBuilder::new(ClassKind::Class, name)
}

/// Start an interface declaration
pub fn interface(name: &str) -> ClassBuilder {
    ClassBuilder::new(ClassKind::Interface, name)
}

/// Start an enum declaration
pub fn enumeration(name: &str) -> ClassBuilder {
    ClassBuilder::new(ClassKind::Enum, name)
}

impl ClassBuilder {
    fn new(kind: ClassKind, name: &str) -> Self {
        Self {
            decl: ClassDecl {
                kind,
                identifier: name.to_string(),
                extends: None,
                implements: Vec::new(),
                attributes: Vec::new(),
                methods: Vec::new(),
                enum_values: Vec::new(),
                serializable: false,
                position: default_position(),
            },
        }
    }

    /// Set the base class
    pub fn extends(mut self, base: &str) -> Self {
        self.decl.extends = Some(base.to_string());
        self
    }

    /// Add an implemented interface
    pub fn implements(mut self, interface: &str) -> Self {
        self.decl.implements.push(interface.to_string());
        self
    }

    /// Add an attribute
    pub fn attribute(mut self, attribute: AttributeDecl) -> Self {
        self.decl.attributes.push(attribute);
        self
    }

    /// Add a method or constructor
    pub fn method(mut self, method: MethodDecl) -> Self {
        self.decl.methods.push(method);
        self
    }

    /// Add an enum value
    pub fn value(mut self, name: &str, args: Vec<Expr>) -> Self {
        self.decl.enum_values.push(EnumValueDecl {
            identifier: name.to_string(),
            args,
            position: default_position(),
        });
        self
    }

    /// Mark serializable
    pub fn serializable(mut self) -> Self {
        self.decl.serializable = true;
        self
    }

    /// Set the position
    pub fn at(mut self, line: u32, column: u32) -> Self {
        self.decl.position = pos(line, column);
        self
    }

    /// Finish the declaration
    pub fn build(self) -> ClassDecl {
        self.decl
    }
}

/// Builder for [`AttributeDecl`]
#[derive(Debug, Clone)]
pub struct AttributeBuilder {
    decl: AttributeDecl,
}

/// Start an attribute declaration
pub fn attribute(name: &str, ty: TypeNode) -> AttributeBuilder {
    AttributeBuilder {
        decl: AttributeDecl {
            identifier: name.to_string(),
            ty,
            is_static: false,
            is_transient: false,
            visibility: Visibility::Public,
            initializer: None,
            position: default_position(),
        },
    }
}

impl AttributeBuilder {
    /// Static attribute
    pub fn static_(mut self) -> Self {
        self.decl.is_static = true;
        self
    }

    /// Transient attribute
    pub fn transient(mut self) -> Self {
        self.decl.is_transient = true;
        self
    }

    /// Set visibility
    pub fn visibility(mut self, visibility: Visibility) -> Self {
        self.decl.visibility = visibility;
        self
    }

    /// Set the initializer
    pub fn init(mut self, initializer: Expr) -> Self {
        self.decl.initializer = Some(initializer);
        self
    }

    /// Finish the declaration
    pub fn build(self) -> AttributeDecl {
        self.decl
    }
}

/// Builder for [`MethodDecl`]
#[derive(Debug, Clone)]
pub struct MethodBuilder {
    decl: MethodDecl,
}

/// Start a method declaration (void, public, instance, empty body)
pub fn method(name: &str) -> MethodBuilder {
    MethodBuilder {
        decl: MethodDecl {
            identifier: name.to_string(),
            is_constructor: false,
            is_static: false,
            is_abstract: false,
            visibility: Visibility::Public,
            params: Vec::new(),
            return_type: None,
            body: Some(Vec::new()),
            position: default_position(),
        },
    }
}

/// Start a constructor declaration for `class`
pub fn constructor(class: &str) -> MethodBuilder {
    let mut builder = method(class);
    builder.decl.is_constructor = true;
    builder
}

/// `public static void main(String[] args)` with the given body
pub fn main_method(body: Vec<Stmt>) -> MethodDecl {
    method("main")
        .static_()
        .param("args", array_of(ty("String")))
        .body(body)
        .build()
}

impl MethodBuilder {
    /// Static method
    pub fn static_(mut self) -> Self {
        self.decl.is_static = true;
        self
    }

    /// Abstract method without body
    pub fn abstract_(mut self) -> Self {
        self.decl.is_abstract = true;
        self.decl.body = None;
        self
    }

    /// Set visibility
    pub fn visibility(mut self, visibility: Visibility) -> Self {
        self.decl.visibility = visibility;
        self
    }

    /// Append a parameter
    pub fn param(mut self, name: &str, ty: TypeNode) -> Self {
        self.decl.params.push(ParamDecl {
            identifier: name.to_string(),
            ty,
            position: default_position(),
        });
        self
    }

    /// Set the return type
    pub fn returns(mut self, ty: TypeNode) -> Self {
        self.decl.return_type = Some(ty);
        self
    }

    /// Set the body
    pub fn body(mut self, body: Vec<Stmt>) -> Self {
        self.decl.body = Some(body);
        self
    }

    /// Drop the body (interface signature)
    pub fn signature_only(mut self) -> Self {
        self.decl.body = None;
        self
    }

    /// Set the position
    pub fn at(mut self, line: u32, column: u32) -> Self {
        self.decl.position = pos(line, column);
        self
    }

    /// Finish the declaration
    pub fn build(self) -> MethodDecl {
        self.decl
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_main_method_shape() {
        let main = main_method(vec![]);
        assert!(main.is_static);
        assert_eq!(main.params.len(), 1);
        assert_eq!(main.params[0].ty, array_of(ty("String")));
        assert_eq!(main.return_type, None);
    }

    #[test]
    fn test_module_json_roundtrip() {
        let m = module(
            "demo",
            vec![class("Main").method(main_method(vec![println(string("hi"))])).build()],
            vec![],
        );
        let json = serde_json::to_string(&m).unwrap();
        let back: Module = serde_json::from_str(&json).unwrap();
        assert_eq!(back, m);
    }
}
