//! System collections and their text form

use super::harness::*;

fn put(map: &str, key: &str, value: i32) -> Stmt {
    expr(call(ident(map), "put", vec![string(key), int(value)]))
}

fn item_class() -> ClassDecl {
    class("Item")
        .attribute(attribute("n", ty("int")).build())
        .method(
            constructor("Item")
                .param("n", ty("int"))
                .body(vec![expr(assign(field(this(), "n"), ident("n")))])
                .build(),
        )
        .method(
            method("toString")
                .returns(ty("String"))
                .body(vec![ret(op(string("I"), Operator::Plus, ident("n")))])
                .build(),
        )
        .build()
}

#[test]
fn test_map_of_primitives_prints_in_insertion_order() {
    expect_statements(
        vec![
            var("m", new_object("HashMap", vec![])),
            put("m", "a", 1),
            put("m", "b", 2),
            println(ident("m")),
        ],
        "[a => 1, b => 2]\n",
    );
}

#[test]
fn test_map_put_replaces_in_place() {
    expect_statements(
        vec![
            var("m", new_object("HashMap", vec![])),
            put("m", "a", 1),
            put("m", "b", 2),
            put("m", "a", 3),
            println(call(ident("m"), "size", vec![])),
            println(call(ident("m"), "containsKey", vec![string("b")])),
            println(ident("m")),
        ],
        "2\ntrue\n[a => 3, b => 2]\n",
    );
}

#[test]
fn test_list_uses_element_to_string() {
    expect_program(
        vec![item_class()],
        vec![
            var("list", new_object("ArrayList", vec![])),
            expr(call(ident("list"), "add", vec![new_object("Item", vec![int(1)])])),
            expr(call(ident("list"), "add", vec![new_object("Item", vec![int(2)])])),
            println(ident("list")),
            println(op(string("list: "), Operator::Plus, call(ident("list"), "toString", vec![]))),
        ],
        "[I1, I2]\nlist: [I1, I2]\n",
    );
}

#[test]
fn test_list_elements_are_objects() {
    expect_statements(
        vec![
            var("list", new_object("ArrayList", vec![])),
            expr(call(ident("list"), "add", vec![string("word")])),
            local(ty("String"), "w", Some(cast(ty("String"), call(ident("list"), "get", vec![int(0)])))),
            println(call(ident("w"), "length", vec![])),
        ],
        "4\n",
    );
}

#[test]
fn test_list_index_out_of_range_faults() {
    let m = module(
        "test",
        vec![],
        vec![
            var("list", new_object("ArrayList", vec![])),
            println(call(ident("list"), "get", vec![int(0)])),
        ],
    );
    let (fault, _) = expect_fault(&m);
    assert!(!fault.error.is_internal());
}

#[test]
fn test_set_ignores_duplicates() {
    expect_statements(
        vec![
            var("s", new_object("HashSet", vec![])),
            expr(call(ident("s"), "add", vec![int(1)])),
            expr(call(ident("s"), "add", vec![int(1)])),
            expr(call(ident("s"), "add", vec![int(2)])),
            println(call(ident("s"), "size", vec![])),
            println(ident("s")),
        ],
        "2\n[1, 2]\n",
    );
}

#[test]
fn test_list_containing_itself() {
    expect_statements(
        vec![
            var("list", new_object("ArrayList", vec![])),
            expr(call(ident("list"), "add", vec![int(1)])),
            expr(call(ident("list"), "add", vec![ident("list")])),
            println(ident("list")),
        ],
        "[1, (this Collection)]\n",
    );
}

#[test]
fn test_map_holding_itself() {
    expect_statements(
        vec![
            var("m", new_object("HashMap", vec![])),
            expr(call(ident("m"), "put", vec![string("self"), ident("m")])),
            println(ident("m")),
        ],
        "[self => (this Map)]\n",
    );
}

#[test]
fn test_mutually_nested_lists_overflow() {
    let m = module(
        "test",
        vec![],
        vec![
            var("a", new_object("ArrayList", vec![])),
            var("b", new_object("ArrayList", vec![])),
            expr(call(ident("a"), "add", vec![ident("b")])),
            expr(call(ident("b"), "add", vec![ident("a")])),
            println(string("before")),
            println(ident("a")),
        ],
    );
    let (fault, output) = expect_fault(&m);
    assert_eq!(output, "before\n");
    assert_eq!(fault.error.to_string(), "Stack overflow");
    assert!(!fault.error.is_internal());
}
