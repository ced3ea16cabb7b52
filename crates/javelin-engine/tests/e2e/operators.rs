//! Arithmetic, comparison and string operators

use super::harness::*;

// ============================================================================
// Integer Arithmetic
// ============================================================================

#[test]
fn test_integer_division_truncates() {
    expect_statements(vec![println(op(int(7), Operator::Divide, int(2)))], "3\n");
}

#[test]
fn test_negative_division_truncates_toward_zero() {
    expect_statements(
        vec![
            println(op(int(-7), Operator::Divide, int(2))),
            println(op(int(-7), Operator::Modulo, int(2))),
        ],
        "-3\n-1\n",
    );
}

#[test]
fn test_precedence_is_in_the_tree() {
    // 2 + 3 * 4 and (2 + 3) * 4
    expect_statements(
        vec![
            println(op(int(2), Operator::Plus, op(int(3), Operator::Multiply, int(4)))),
            println(op(op(int(2), Operator::Plus, int(3)), Operator::Multiply, int(4))),
        ],
        "14\n20\n",
    );
}

#[test]
fn test_integer_overflow_wraps() {
    expect_statements(
        vec![println(op(int(i32::MAX), Operator::Plus, int(1)))],
        "-2147483648\n",
    );
}

#[test]
fn test_shifts_follow_32_bit_semantics() {
    expect_statements(
        vec![
            println(op(int(1), Operator::ShiftLeft, int(33))),
            println(op(int(-8), Operator::ShiftRight, int(1))),
            println(op(int(-1), Operator::ShiftRightUnsigned, int(28))),
        ],
        "2\n-4\n15\n",
    );
}

#[test]
fn test_compound_assignment_and_increments() {
    expect_statements(
        vec![
            var("x", int(5)),
            expr(compound(Operator::Plus, ident("x"), int(3))),
            expr(compound(Operator::Multiply, ident("x"), int(2))),
            println(ident("x")),
            println(post_inc(ident("x"))),
            println(pre_dec(ident("x"))),
        ],
        "16\n16\n16\n",
    );
}

// ============================================================================
// Mixed Numeric Domains
// ============================================================================

#[test]
fn test_int_divided_by_integral_double_truncates() {
    expect_statements(vec![println(op(int(7), Operator::Divide, double(2.0)))], "3\n");
}

#[test]
fn test_double_division_is_floating() {
    expect_statements(vec![println(op(double(7.0), Operator::Divide, int(2)))], "3.5\n");
}

#[test]
fn test_double_assigned_int_value() {
    expect_statements(
        vec![
            local(ty("double"), "d", Some(int(4))),
            println(op(ident("d"), Operator::Divide, int(8))),
        ],
        "0.5\n",
    );
}

// ============================================================================
// Comparison and Logic
// ============================================================================

#[test]
fn test_comparisons() {
    expect_statements(
        vec![
            println(op(int(3), Operator::Lower, int(4))),
            println(op(double(2.5), Operator::GreaterOrEqual, int(3))),
            println(op(int(3), Operator::Equal, double(3.0))),
        ],
        "true\nfalse\ntrue\n",
    );
}

#[test]
fn test_string_collation_puts_uppercase_first() {
    expect_statements(
        vec![
            println(op(string("A"), Operator::Lower, string("a"))),
            println(op(string("a"), Operator::Lower, string("B"))),
        ],
        "true\ntrue\n",
    );
}

#[test]
fn test_null_comparison() {
    expect_statements(
        vec![
            local(ty("String"), "s", Some(null())),
            println(op(ident("s"), Operator::Equal, null())),
            println(op(ident("s"), Operator::NotEqual, null())),
        ],
        "true\nfalse\n",
    );
}

// ============================================================================
// String Concatenation
// ============================================================================

#[test]
fn test_concatenation_converts_operands() {
    expect_statements(
        vec![
            println(op(string("n="), Operator::Plus, int(7))),
            println(op(op(string(""), Operator::Plus, boolean(true)), Operator::Plus, double(2.5))),
            println(op(op(int(1), Operator::Plus, int(2)), Operator::Plus, string("!"))),
        ],
        "n=7\ntrue2.5\n3!\n",
    );
}

#[test]
fn test_concatenation_with_null() {
    expect_statements(
        vec![
            local(ty("String"), "s", Some(null())),
            println(op(string("value: "), Operator::Plus, ident("s"))),
        ],
        "value: null\n",
    );
}

// ============================================================================
// Diagnostics
// ============================================================================

#[test]
fn test_operator_not_applicable() {
    let m = module(
        "test",
        vec![],
        vec![println(op(boolean(true), Operator::Minus, int(1)))],
    );
    assert_eq!(
        generation_errors(&m),
        vec!["Operator - cannot be applied to boolean and int.".to_string()]
    );
}

#[test]
fn test_narrowing_assignment_needs_cast() {
    let m = module(
        "test",
        vec![],
        vec![local(ty("int"), "i", Some(double(2.5)))],
    );
    let errors = generation_errors(&m);
    assert_eq!(errors.len(), 1);
    assert!(errors[0].starts_with("explicit cast required from double to int"));
}
