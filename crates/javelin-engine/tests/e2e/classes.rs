//! Classes, inheritance, interfaces and enums

use super::harness::*;

fn animal() -> ClassDecl {
    class("Animal")
        .method(
            method("sound")
                .returns(ty("String"))
                .body(vec![ret(string("..."))])
                .build(),
        )
        .build()
}

fn dog() -> ClassDecl {
    class("Dog")
        .extends("Animal")
        .method(
            method("sound")
                .returns(ty("String"))
                .body(vec![ret(op(super_call("sound", vec![]), Operator::Plus, string("woof")))])
                .build(),
        )
        .build()
}

// ============================================================================
// Inheritance
// ============================================================================

#[test]
fn test_virtual_dispatch_and_super_call() {
    expect_program(
        vec![animal(), dog()],
        vec![
            local(ty("Animal"), "a", Some(new_object("Dog", vec![]))),
            println(call(ident("a"), "sound", vec![])),
            println(call(new_object("Animal", vec![]), "sound", vec![])),
        ],
        "...woof\n...\n",
    );
}

#[test]
fn test_instance_of_and_downcast() {
    expect_program(
        vec![animal(), dog()],
        vec![
            local(ty("Object"), "o", Some(new_object("Dog", vec![]))),
            println(instance_of(ident("o"), ty("Animal"))),
            println(instance_of(ident("o"), ty("String"))),
            if_then(
                instance_of(ident("o"), ty("Dog")),
                println(call(cast(ty("Dog"), ident("o")), "sound", vec![])),
            ),
        ],
        "true\nfalse\n...woof\n",
    );
}

#[test]
fn test_failed_downcast_faults() {
    let m = module(
        "test",
        vec![animal(), dog()],
        vec![
            local(ty("Animal"), "a", Some(new_object("Animal", vec![]))),
            local(ty("Dog"), "d", Some(cast(ty("Dog"), ident("a")))),
            println(string("unreachable")),
        ],
    );
    let (fault, output) = expect_fault(&m);
    assert_eq!(fault.error.to_string(), "Animal cannot be cast to Dog");
    assert_eq!(output, "");
}

#[test]
fn test_interface_dispatch() {
    let shape = interface("Shape")
        .method(method("area").returns(ty("int")).signature_only().build())
        .build();
    let square = class("Square")
        .implements("Shape")
        .attribute(attribute("side", ty("int")).build())
        .method(
            constructor("Square")
                .param("side", ty("int"))
                .body(vec![expr(assign(field(this(), "side"), ident("side")))])
                .build(),
        )
        .method(
            method("area")
                .returns(ty("int"))
                .body(vec![ret(op(ident("side"), Operator::Multiply, ident("side")))])
                .build(),
        )
        .build();
    expect_program(
        vec![shape, square],
        vec![
            local(ty("Shape"), "s", Some(new_object("Square", vec![int(3)]))),
            println(call(ident("s"), "area", vec![])),
        ],
        "9\n",
    );
}

#[test]
fn test_to_string_override_is_used_by_print() {
    let point = class("Point")
        .attribute(attribute("x", ty("int")).init(int(4)).build())
        .method(
            method("toString")
                .returns(ty("String"))
                .body(vec![ret(op(string("P"), Operator::Plus, ident("x")))])
                .build(),
        )
        .build();
    expect_program(
        vec![point],
        vec![
            var("p", new_object("Point", vec![])),
            println(ident("p")),
            println(op(string("at "), Operator::Plus, ident("p"))),
        ],
        "P4\nat P4\n",
    );
}

// ============================================================================
// Static Members
// ============================================================================

#[test]
fn test_static_counter_shared_by_instances() {
    let counter = class("Counter")
        .attribute(attribute("count", ty("int")).static_().init(int(0)).build())
        .method(
            constructor("Counter")
                .body(vec![expr(compound(Operator::Plus, ident("count"), int(1)))])
                .build(),
        )
        .build();
    expect_program(
        vec![counter],
        vec![
            expr(new_object("Counter", vec![])),
            expr(new_object("Counter", vec![])),
            println(field(ident("Counter"), "count")),
        ],
        "2\n",
    );
}

#[test]
fn test_recursive_static_method() {
    let math = class("MathUtil")
        .method(
            method("fact")
                .static_()
                .param("n", ty("int"))
                .returns(ty("int"))
                .body(vec![
                    if_then(op(ident("n"), Operator::LowerOrEqual, int(1)), ret(int(1))),
                    ret(op(
                        ident("n"),
                        Operator::Multiply,
                        call_here("fact", vec![op(ident("n"), Operator::Minus, int(1))]),
                    )),
                ])
                .build(),
        )
        .build();
    expect_program(
        vec![math],
        vec![println(call(ident("MathUtil"), "fact", vec![int(5)]))],
        "120\n",
    );
}

#[test]
fn test_overload_resolution_prefers_exact_match() {
    let pick = class("Pick")
        .method(
            method("f")
                .static_()
                .param("x", ty("int"))
                .returns(ty("String"))
                .body(vec![ret(string("int"))])
                .build(),
        )
        .method(
            method("f")
                .static_()
                .param("x", ty("double"))
                .returns(ty("String"))
                .body(vec![ret(string("double"))])
                .build(),
        )
        .build();
    expect_program(
        vec![pick],
        vec![
            println(call(ident("Pick"), "f", vec![int(1)])),
            println(call(ident("Pick"), "f", vec![double(1.5)])),
        ],
        "int\ndouble\n",
    );
}

// ============================================================================
// Enums
// ============================================================================

#[test]
fn test_enum_constants() {
    let level = enumeration("Level").value("LOW", vec![]).value("HIGH", vec![]).build();
    expect_program(
        vec![level],
        vec![
            var("l", field(ident("Level"), "HIGH")),
            println(ident("l")),
            println(call(ident("l"), "toOrdinal", vec![])),
            println(op(ident("l"), Operator::Equal, field(ident("Level"), "HIGH"))),
        ],
        "HIGH\n1\ntrue\n",
    );
}

// ============================================================================
// Diagnostics
// ============================================================================

#[test]
fn test_private_attribute_is_not_accessible() {
    let vault = class("Vault")
        .attribute(attribute("secret", ty("int")).visibility(Visibility::Private).build())
        .build();
    let m = module(
        "test",
        vec![vault],
        vec![
            var("v", new_object("Vault", vec![])),
            println(field(ident("v"), "secret")),
        ],
    );
    assert_eq!(generation_errors(&m), vec!["secret has private access in Vault.".to_string()]);
}

#[test]
fn test_unknown_method_and_class() {
    let m = module(
        "test",
        vec![animal()],
        vec![
            var("a", new_object("Animal", vec![])),
            expr(call(ident("a"), "fly", vec![])),
            expr(new_object("Ghost", vec![])),
        ],
    );
    let errors = generation_errors(&m);
    assert_eq!(errors.len(), 2);
    assert_eq!(errors[0], "Unknown method fly in class Animal.");
    assert_eq!(errors[1], "Unknown class Ghost.");
}
