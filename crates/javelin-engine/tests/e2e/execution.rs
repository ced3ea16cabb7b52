//! Thread execution: faults, budgets and breakpoints

use super::harness::*;
use javelin_engine::vm::PauseReason;
use javelin_engine::{EngineOptions, ExecutionResult, Value};

fn counting_loop() -> Module {
    module(
        "test",
        vec![],
        vec![for_loop(
            vec![local(ty("int"), "i", Some(int(0)))],
            Some(op(ident("i"), Operator::Lower, int(4))),
            vec![post_inc(ident("i"))],
            print(ident("i")),
        )],
    )
}

// ============================================================================
// Faults
// ============================================================================

#[test]
fn test_integer_division() {
    expect_statements(
        vec![println(op(op(int(7), Operator::Divide, int(2)), Operator::Equal, int(3)))],
        "true\n",
    );
}

#[test]
fn test_fault_stops_execution() {
    let m = module(
        "test",
        vec![],
        vec![
            println(string("before")).at(1, 1),
            var("zero", int(0)).at(2, 1),
            println(op(int(10), Operator::Divide, ident("zero")).at(3, 9)).at(3, 1),
            println(string("after")).at(4, 1),
        ],
    );
    let (fault, output) = expect_fault(&m);
    assert_eq!(output, "before\n");
    assert_eq!(fault.error.to_string(), "Division by zero");
    assert_eq!(fault.trace.len(), 1);
    assert_eq!(fault.trace[0].program, "main");
    assert_eq!(fault.trace[0].position.line, 3);
}

#[test]
fn test_fault_in_method_records_callers() {
    let calc = class("Calc")
        .method(
            method("f")
                .static_()
                .param("d", ty("int"))
                .returns(ty("int"))
                .body(vec![ret(op(int(10), Operator::Divide, ident("d")).at(2, 16)).at(2, 9)])
                .build(),
        )
        .build();
    let m = module(
        "test",
        vec![calc],
        vec![println(call(ident("Calc"), "f", vec![int(0)]).at(5, 9)).at(5, 1)],
    );
    let (fault, _) = expect_fault(&m);
    let programs: Vec<&str> = fault.trace.iter().map(|e| e.program.as_str()).collect();
    assert_eq!(programs, vec!["Calc.f", "main"]);
    assert_eq!(fault.trace[0].position.line, 2);
    assert_eq!(fault.trace[1].position.line, 5);

    let text = fault.to_string();
    assert!(text.starts_with("Exception: Division by zero"), "{}", text);
    assert!(text.contains("\n    at Calc.f (line 2"), "{}", text);
}

#[test]
fn test_null_dereference_faults() {
    let m = module(
        "test",
        vec![],
        vec![
            local(ty("String"), "s", Some(null())),
            println(call(ident("s"), "length", vec![])),
        ],
    );
    let (fault, _) = expect_fault(&m);
    assert_eq!(fault.error.to_string(), "Null pointer exception");
}

#[test]
fn test_array_index_out_of_bounds() {
    let m = module(
        "test",
        vec![],
        vec![
            var("a", new_array(ty("int"), vec![int(2)])),
            println(index(ident("a"), int(2))),
        ],
    );
    let (fault, _) = expect_fault(&m);
    assert_eq!(fault.error.to_string(), "Index 2 out of bounds for length 2");
}

#[test]
fn test_operand_stack_limit() {
    let m = counting_loop();
    let (generated, mut process) = compile_with(
        &m,
        EngineOptions {
            max_stack_size: 0,
            ..Default::default()
        },
    );
    match generated.execute(&mut process).unwrap() {
        ExecutionResult::Failed(fault) => assert_eq!(fault.error.to_string(), "Stack overflow"),
        other => panic!("expected a stack overflow, got {:?}", other),
    }
}

// ============================================================================
// Driving a Thread
// ============================================================================

#[test]
fn test_step_budget_suspends_and_resumes() {
    let m = counting_loop();
    let (generated, mut process) = compile_with(&m, EngineOptions::with_step_budget(5));
    let mut interpreter = generated.start(&mut process).unwrap().expect("entry program");

    let mut result = interpreter.run(&mut process);
    let mut suspensions = 0;
    while let ExecutionResult::Suspended(reason) = result {
        assert_eq!(reason, PauseReason::BudgetExhausted);
        suspensions += 1;
        result = interpreter.resume(&mut process).unwrap();
    }
    assert!(suspensions > 1);
    assert!(result.is_completed());
    assert_eq!(process.console.take(), "0123");
}

#[test]
fn test_line_breakpoint() {
    let m = module(
        "test",
        vec![],
        vec![
            println(string("a").at(1, 9)).at(1, 1),
            println(string("b").at(2, 9)).at(2, 1),
            println(string("c").at(3, 9)).at(3, 1),
        ],
    );
    let (generated, mut process) = compile(&m);
    let mut interpreter = generated.start(&mut process).unwrap().expect("entry program");
    interpreter.debug.add_line_breakpoint(2);

    let result = interpreter.run(&mut process);
    assert!(matches!(result, ExecutionResult::Suspended(PauseReason::Breakpoint)));
    assert_eq!(process.console.output(), "a\n");
    assert_eq!(interpreter.thread().position().line, 2);

    let result = interpreter.resume(&mut process).unwrap();
    assert!(result.is_completed());
    assert_eq!(process.console.take(), "a\nb\nc\n");
}

#[test]
fn test_single_step() {
    let m = module("test", vec![], vec![println(int(1))]);
    let (generated, mut process) = compile(&m);
    let mut interpreter = generated.start(&mut process).unwrap().expect("entry program");

    let result = interpreter.step(&mut process);
    assert!(matches!(result, ExecutionResult::Suspended(PauseReason::Step)));
    assert_eq!(interpreter.thread().stack().last(), Some(&Value::Int(1)));
    assert_eq!(process.console.output(), "");

    let result = interpreter.run(&mut process);
    assert!(result.is_completed());
    assert_eq!(process.console.take(), "1\n");
}
