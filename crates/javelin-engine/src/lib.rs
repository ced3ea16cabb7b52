//! Javelin Language Engine
//!
//! This crate provides the compiler and runtime core of Javelin, a small
//! Java-like teaching language:
//! - **Types**: the type lattice with operator, cast and format tables (`types` module)
//! - **Compiler**: declaration pass and code generator producing step programs (`compiler` module)
//! - **VM**: class registry, heap and the step interpreter (`vm` module)
//! - **Serialization**: instance graphs as JSON trees (`serialize` module)
//!
//! The parser is not part of this crate; modules arrive as [`ast::Module`]
//! trees, either built in code or deserialized from JSON.
//!
//! # Example
//!
//! ```rust,ignore
//! use javelin_engine::ast::build::*;
//! use javelin_engine::{CodeGenerator, Process};
//!
//! let module = module("hello", vec![], vec![println(string("hi"))]);
//! let mut process = Process::new();
//! let generated = CodeGenerator::generate(&module, &mut process);
//! generated.execute(&mut process)?;
//! assert_eq!(process.console.take(), "hi\n");
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

// ============================================================================
// Core Modules
// ============================================================================

/// Syntax tree handed over by the parser
pub mod ast;

/// Type lattice and per-type operation tables
pub mod types;

/// Compiler: declarations, code generation and step programs
pub mod compiler;

/// VM: object model, heap and interpreter
pub mod vm;

// ============================================================================
// Runtime Services
// ============================================================================

/// Text of collections built by synthesized programs
pub mod synthesis;

/// JSON serialization of instance graphs
pub mod serialize;

// ============================================================================
// Re-exports
// ============================================================================

pub use compiler::{CodeGenerator, Diagnostic, ErrorCollection, GeneratedModule, Program};
pub use types::Type;
pub use vm::{EngineOptions, ExecutionResult, Interpreter, Process, Value, VmError, VmResult};
