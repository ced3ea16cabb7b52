//! Shared helpers for the end-to-end tests

#![allow(dead_code)]

pub use javelin_engine::ast::build::*;
pub use javelin_engine::ast::{ClassDecl, Expr, Module, Stmt, Visibility};
pub use javelin_engine::types::Operator;

use javelin_engine::compiler::CODE_GENERATION_PHASE;
use javelin_engine::vm::ThreadFault;
use javelin_engine::{CodeGenerator, EngineOptions, ExecutionResult, GeneratedModule, Process};

/// Compile `module` into a fresh process
pub fn compile(module: &Module) -> (GeneratedModule, Process) {
    compile_with(module, EngineOptions::default())
}

/// Compile `module` into a fresh process with `options`
pub fn compile_with(module: &Module, options: EngineOptions) -> (GeneratedModule, Process) {
    let mut process = Process::with_options(options);
    let generated = CodeGenerator::generate(module, &mut process);
    (generated, process)
}

/// Compile and run, asserting that compilation succeeded
pub fn run(module: &Module) -> (ExecutionResult, Process) {
    let (generated, mut process) = compile(module);
    assert!(
        !generated.has_errors(),
        "unexpected diagnostics: {:?}",
        generated.errors.iter().map(|d| d.message.clone()).collect::<Vec<_>>()
    );
    let result = generated.execute(&mut process).expect("internal error");
    (result, process)
}

/// Run `module` and compare its console output
pub fn expect_output(module: &Module, expected: &str) {
    let (result, mut process) = run(module);
    if let ExecutionResult::Failed(fault) = &result {
        panic!("execution failed: {}", fault);
    }
    assert!(result.is_completed(), "execution did not complete: {:?}", result);
    assert_eq!(process.console.take(), expected);
}

/// Run top-level `statements` and compare the console output
pub fn expect_statements(statements: Vec<Stmt>, expected: &str) {
    expect_output(&module("test", vec![], statements), expected);
}

/// Run `classes` plus top-level `statements` and compare the console output
pub fn expect_program(classes: Vec<ClassDecl>, statements: Vec<Stmt>, expected: &str) {
    expect_output(&module("test", classes, statements), expected);
}

/// Run `module`, expecting a fault; returns it with the output printed before it
pub fn expect_fault(module: &Module) -> (ThreadFault, String) {
    let (result, mut process) = run(module);
    match result {
        ExecutionResult::Failed(fault) => (fault, process.console.take()),
        other => panic!("expected a fault, got {:?}", other),
    }
}

/// Messages of the code generation diagnostics of `module`
pub fn generation_errors(module: &Module) -> Vec<String> {
    let (generated, _) = compile(module);
    generated
        .errors
        .phase(CODE_GENERATION_PHASE)
        .iter()
        .map(|d| d.message.clone())
        .collect()
}

/// `lhs op rhs` shorthand
pub fn op(lhs: Expr, op: Operator, rhs: Expr) -> Expr {
    binary(op, lhs, rhs)
}

/// Current value of the static attribute `class.name`
pub fn static_value(process: &mut Process, class: &str, name: &str) -> javelin_engine::Value {
    let id = process.classes.get_class_by_name(class).expect("class").id;
    let index = process
        .classes
        .find_static_attribute(id, name)
        .and_then(|(_, attribute)| attribute.index)
        .expect("static attribute");
    let object = process.static_object(id).expect("static object");
    process.heap.object(object).unwrap().get(index).unwrap().clone()
}

/// Value of the instance attribute `name` of `value`
pub fn attribute_value(process: &Process, value: &javelin_engine::Value, name: &str) -> javelin_engine::Value {
    let object = process.heap.object(value.as_object().expect("object")).unwrap();
    let index = process
        .classes
        .find_attribute(object.class_id, name)
        .and_then(|attribute| attribute.index)
        .expect("attribute");
    object.get(index).unwrap().clone()
}
