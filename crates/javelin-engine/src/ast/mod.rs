//! Abstract syntax tree consumed by the code generator
//!
//! The parser lives outside this crate. It hands over one [`Module`] per
//! source file; every node carries the [`TextPosition`] it was parsed from so
//! diagnostics and stack traces can point back into the source. All nodes are
//! serde-(de)serializable so a module can be passed in as JSON.

pub mod build;
mod position;

pub use position::TextPosition;

use crate::types::Operator;
use serde::{Deserialize, Serialize};

/// A parsed compilation unit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Module {
    /// Module name (usually the file name)
    pub name: String,
    /// Whether this module belongs to the system library
    #[serde(default)]
    pub is_system: bool,
    /// Class, interface and enum declarations in source order
    #[serde(default)]
    pub classes: Vec<ClassDecl>,
    /// Top-level statements forming the module's main program
    #[serde(default)]
    pub statements: Vec<Stmt>,
}

/// Kind of a type declaration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassKind {
    /// Ordinary class
    Class,
    /// Interface (method signatures only)
    Interface,
    /// Enum with a fixed set of values
    Enum,
}

/// Member visibility
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    /// Visible everywhere
    Public,
    /// Visible in the declaring class and its subclasses
    Protected,
    /// Visible only in the declaring class
    Private,
}

impl Default for Visibility {
    fn default() -> Self {
        Visibility::Public
    }
}

/// Class, interface or enum declaration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassDecl {
    /// Declaration kind
    pub kind: ClassKind,
    /// Class name
    pub identifier: String,
    /// Base class name
    #[serde(default)]
    pub extends: Option<String>,
    /// Implemented interfaces (or extended interfaces for an interface)
    #[serde(default)]
    pub implements: Vec<String>,
    /// Attribute declarations
    #[serde(default)]
    pub attributes: Vec<AttributeDecl>,
    /// Method and constructor declarations
    #[serde(default)]
    pub methods: Vec<MethodDecl>,
    /// Enum values in declaration order (enums only)
    #[serde(default)]
    pub enum_values: Vec<EnumValueDecl>,
    /// Opt this class into graph serialization even if it is a system class
    #[serde(default)]
    pub serializable: bool,
    /// Position of the class name
    pub position: TextPosition,
}

/// Attribute (field) declaration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeDecl {
    /// Attribute name
    pub identifier: String,
    /// Declared type
    pub ty: TypeNode,
    /// Static attribute
    #[serde(default)]
    pub is_static: bool,
    /// Excluded from serialization
    #[serde(default)]
    pub is_transient: bool,
    /// Visibility
    #[serde(default)]
    pub visibility: Visibility,
    /// Optional initializer expression
    #[serde(default)]
    pub initializer: Option<Expr>,
    /// Position of the attribute name
    pub position: TextPosition,
}

/// Method or constructor declaration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodDecl {
    /// Method name (the class name for constructors)
    pub identifier: String,
    /// Constructor
    #[serde(default)]
    pub is_constructor: bool,
    /// Static method
    #[serde(default)]
    pub is_static: bool,
    /// Abstract method (no body)
    #[serde(default)]
    pub is_abstract: bool,
    /// Visibility
    #[serde(default)]
    pub visibility: Visibility,
    /// Parameters in order
    #[serde(default)]
    pub params: Vec<ParamDecl>,
    /// Return type (`None` means void)
    #[serde(default)]
    pub return_type: Option<TypeNode>,
    /// Body statements (`None` for abstract and interface methods)
    #[serde(default)]
    pub body: Option<Vec<Stmt>>,
    /// Position of the method name
    pub position: TextPosition,
}

/// Method parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamDecl {
    /// Parameter name
    pub identifier: String,
    /// Parameter type
    pub ty: TypeNode,
    /// Position of the parameter name
    pub position: TextPosition,
}

/// One declared enum value with its constructor arguments
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnumValueDecl {
    /// Value name
    pub identifier: String,
    /// Constructor arguments
    #[serde(default)]
    pub args: Vec<Expr>,
    /// Position of the value name
    pub position: TextPosition,
}

/// Type as written in source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeNode {
    /// Primitive, class, interface or enum name
    Named(String),
    /// Array of the inner type
    Array(Box<TypeNode>),
}

impl TypeNode {
    /// Display name as it would appear in source
    pub fn display_name(&self) -> String {
        match self {
            TypeNode::Named(name) => name.clone(),
            TypeNode::Array(inner) => format!("{}[]", inner.display_name()),
        }
    }
}

/// Statement with its source position
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stmt {
    /// Statement kind
    pub kind: StmtKind,
    /// Source position
    pub position: TextPosition,
}

/// Statement kinds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StmtKind {
    /// Local variable declaration (`ty` is `None` for `var`)
    LocalVar {
        /// Declared type
        ty: Option<TypeNode>,
        /// Variable name
        identifier: String,
        /// Initializer
        initializer: Option<Expr>,
    },
    /// Expression statement
    Expr(Expr),
    /// `if` / `else`
    If {
        /// Condition
        condition: Expr,
        /// Then branch
        then_branch: Box<Stmt>,
        /// Optional else branch
        else_branch: Option<Box<Stmt>>,
    },
    /// `while` loop
    While {
        /// Loop condition
        condition: Expr,
        /// Loop body
        body: Box<Stmt>,
    },
    /// `do ... while` loop
    DoWhile {
        /// Loop body
        body: Box<Stmt>,
        /// Loop condition
        condition: Expr,
    },
    /// C-style `for` loop
    For {
        /// Init statements
        init: Vec<Stmt>,
        /// Optional condition
        condition: Option<Expr>,
        /// Update expressions
        update: Vec<Expr>,
        /// Loop body
        body: Box<Stmt>,
    },
    /// `for (T x : array)` loop
    ForEach {
        /// Element variable type (`None` for `var`)
        ty: Option<TypeNode>,
        /// Element variable name
        identifier: String,
        /// Array expression
        iterable: Expr,
        /// Loop body
        body: Box<Stmt>,
    },
    /// `return`
    Return(Option<Expr>),
    /// `{ ... }`
    Block(Vec<Stmt>),
    /// `break`
    Break,
    /// `continue`
    Continue,
    /// Console output (`System.out.print` / `println`)
    Print {
        /// Value to print
        value: Option<Expr>,
        /// Append a line break
        newline: bool,
    },
}

/// Expression with its source position
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expr {
    /// Expression kind
    pub kind: ExprKind,
    /// Source position
    pub position: TextPosition,
}

/// Literal constants
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Literal {
    /// `int` literal
    Int(i32),
    /// `float` literal
    Float(f32),
    /// `double` literal
    Double(f64),
    /// `boolean` literal
    Bool(bool),
    /// `char` literal
    Char(char),
    /// String literal
    Str(String),
    /// `null`
    Null,
}

/// Expression kinds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExprKind {
    /// Constant
    Literal(Literal),
    /// Variable, attribute or class name
    Identifier(String),
    /// `this`
    This,
    /// Binary operation (including `&&` and `||`)
    Binary {
        /// Operator
        op: Operator,
        /// Left operand
        lhs: Box<Expr>,
        /// Right operand
        rhs: Box<Expr>,
    },
    /// Prefix unary operation (`-x`, `!x`, `~x`)
    Unary {
        /// Operator
        op: Operator,
        /// Operand
        operand: Box<Expr>,
    },
    /// Assignment (`op` is set for compound assignments like `+=`)
    Assign {
        /// Compound operator
        op: Option<Operator>,
        /// Assignment target
        target: Box<Expr>,
        /// Assigned value
        value: Box<Expr>,
    },
    /// `++` / `--`
    IncDec {
        /// `++` when true, `--` otherwise
        increment: bool,
        /// Prefix form
        prefix: bool,
        /// Target
        target: Box<Expr>,
    },
    /// Method call
    Call {
        /// Receiver (`None` for calls inside the current class)
        receiver: Option<Box<Expr>>,
        /// Method name
        method: String,
        /// Arguments
        args: Vec<Expr>,
    },
    /// `super(...)` (`method` is `None`) or `super.m(...)`
    SuperCall {
        /// Method name
        method: Option<String>,
        /// Arguments
        args: Vec<Expr>,
    },
    /// `new C(...)`
    New {
        /// Class name
        class: String,
        /// Constructor arguments
        args: Vec<Expr>,
    },
    /// `new T[n][m]...`
    NewArray {
        /// Innermost element type
        element: TypeNode,
        /// Sizes of the given dimensions
        dimensions: Vec<Expr>,
        /// Trailing dimensions without size (`new int[3][]`)
        #[serde(default)]
        extra_dimensions: usize,
    },
    /// `new T[]{a, b, c}` or `{a, b, c}`
    ArrayLiteral {
        /// Element type
        element: TypeNode,
        /// Elements
        elements: Vec<Expr>,
    },
    /// `a[i]`
    Index {
        /// Array
        array: Box<Expr>,
        /// Index
        index: Box<Expr>,
    },
    /// `a.b`
    Field {
        /// Receiver (object, array, or class name)
        receiver: Box<Expr>,
        /// Attribute name
        name: String,
    },
    /// `(T) e`
    Cast {
        /// Target type
        ty: TypeNode,
        /// Operand
        operand: Box<Expr>,
    },
    /// `e instanceof T`
    InstanceOf {
        /// Operand
        operand: Box<Expr>,
        /// Tested type
        ty: TypeNode,
    },
    /// `c ? a : b`
    Ternary {
        /// Condition
        condition: Box<Expr>,
        /// Value if true
        then_value: Box<Expr>,
        /// Value if false
        else_value: Box<Expr>,
    },
}
