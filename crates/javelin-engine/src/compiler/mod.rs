//! Compiler: syntax tree to step programs
//!
//! Compilation runs in two passes over a parsed [`Module`](crate::ast::Module):
//!
//! 1. [`declare`] registers classes, attributes, methods and enum constants
//!    in the process's class registry and finalizes layouts.
//! 2. [`CodeGenerator`] type-checks every body and emits one [`Program`] per
//!    method, per static initializer and for the module's main program.
//!
//! Problems are collected as [`Diagnostic`]s instead of aborting, so a module
//! with errors still yields programs for the parts that compiled.

mod codegen;
pub mod declare;
mod diagnostic;
mod program;
mod symbols;

pub use codegen::{CodeGenerator, GeneratedModule};
pub use diagnostic::{
    Diagnostic, ErrorCollection, QuickFix, Severity, CODE_GENERATION_PHASE, LEXER_PHASE, PARSER_PHASE,
    TYPE_RESOLUTION_PHASE,
};
pub use program::{Dispatch, Instruction, Program, Step};
