//! JSON round trips of graphs built by running programs

use super::harness::*;
use javelin_engine::serialize::{from_json_str, serialize, to_json_string, DeserializeError};
use javelin_engine::{Process, Type, Value};
use serde_json::json;

fn node_class() -> ClassDecl {
    class("Node")
        .attribute(attribute("value", ty("int")).build())
        .attribute(attribute("next", ty("Node")).build())
        .attribute(attribute("cache", ty("String")).transient().build())
        .build()
}

fn holder_class() -> ClassDecl {
    class("Holder")
        .attribute(attribute("root", ty("Node")).static_().build())
        .build()
}

/// Runs `statements` and returns the process with `Holder.root` set
fn build_graph(statements: Vec<Stmt>) -> (Process, Value, Type) {
    let m = module("test", vec![node_class(), holder_class()], statements);
    let (result, mut process) = run(&m);
    assert!(result.is_completed(), "{:?}", result);
    let root = static_value(&mut process, "Holder", "root");
    let node = process.classes.get_class_by_name("Node").unwrap().id;
    (process, root, Type::Class(node))
}

fn cycle_statements() -> Vec<Stmt> {
    vec![
        var("a", new_object("Node", vec![])),
        var("b", new_object("Node", vec![])),
        expr(assign(field(ident("a"), "value"), int(1))),
        expr(assign(field(ident("b"), "value"), int(2))),
        expr(assign(field(ident("a"), "next"), ident("b"))),
        expr(assign(field(ident("b"), "next"), ident("a"))),
        expr(assign(field(ident("a"), "cache"), string("scratch"))),
        expr(assign(field(ident("Holder"), "root"), ident("a"))),
    ]
}

#[test]
fn test_cycle_serializes_as_reference() {
    let (process, root, ty) = build_graph(cycle_statements());
    let tree = serialize(&root, &ty, &process).unwrap();
    assert_eq!(
        tree,
        json!({
            "!k": "Node", "!i": 0,
            "Node": {
                "value": 1,
                "next": {"!k": "Node", "!i": 1, "Node": {"value": 2, "next": {"!i": 0}}}
            }
        })
    );
}

#[test]
fn test_cyclic_round_trip() {
    let (mut process, root, ty) = build_graph(cycle_statements());
    let text = to_json_string(&root, &ty, &process).unwrap();
    let copy = from_json_str(&text, &ty, &mut process).unwrap();

    assert_ne!(copy, root);
    let second = attribute_value(&process, &copy, "next");
    assert_eq!(attribute_value(&process, &copy, "value"), Value::Int(1));
    assert_eq!(attribute_value(&process, &second, "value"), Value::Int(2));
    assert_eq!(attribute_value(&process, &second, "next"), copy);
    // transient attributes come back with their default
    assert_eq!(attribute_value(&process, &copy, "cache"), Value::Null);

    assert_eq!(
        serialize(&copy, &ty, &process).unwrap(),
        serialize(&root, &ty, &process).unwrap()
    );
}

#[test]
fn test_sections_follow_base_chain() {
    let base = class("Base").attribute(attribute("a", ty("int")).init(int(1)).build()).build();
    let derived = class("Derived")
        .extends("Base")
        .attribute(attribute("b", ty("String")).init(string("x")).build())
        .attribute(attribute("total", ty("int")).static_().init(int(9)).build())
        .build();
    let keeper = class("Keeper")
        .attribute(attribute("kept", ty("Base")).static_().build())
        .build();
    let m = module(
        "test",
        vec![base, derived, keeper],
        vec![expr(assign(field(ident("Keeper"), "kept"), new_object("Derived", vec![])))],
    );
    let (_, mut process) = run(&m);
    let kept = static_value(&mut process, "Keeper", "kept");
    let base = process.classes.get_class_by_name("Base").unwrap().id;

    let tree = serialize(&kept, &Type::Class(base), &process).unwrap();
    assert_eq!(
        tree,
        json!({"!k": "Derived", "!i": 0, "Derived": {"b": "x"}, "Base": {"a": 1}})
    );

    let copy = from_json_str(&tree.to_string(), &Type::Class(base), &mut process).unwrap();
    assert_eq!(process.class_of(&copy), process.class_of(&kept));
    assert_eq!(attribute_value(&process, &copy, "b"), Value::string("x"));
}

#[test]
fn test_enums_and_arrays() {
    let level = enumeration("Level").value("LOW", vec![]).value("HIGH", vec![]).build();
    let store = class("Store")
        .attribute(attribute("levels", array_of(ty("Level"))).static_().build())
        .build();
    let m = module(
        "test",
        vec![level, store],
        vec![expr(assign(
            field(ident("Store"), "levels"),
            array_literal(
                ty("Level"),
                vec![field(ident("Level"), "HIGH"), null(), field(ident("Level"), "LOW")],
            ),
        ))],
    );
    let (_, mut process) = run(&m);
    let levels = static_value(&mut process, "Store", "levels");
    let level = process.classes.get_class_by_name("Level").unwrap().id;
    let ty = Type::array_of(Type::Enum(level));

    let tree = serialize(&levels, &ty, &process).unwrap();
    assert_eq!(tree, json!([1, null, 0]));

    let copy = from_json_str("[0, 1]", &ty, &mut process).unwrap();
    let elements = process.heap.array(copy.as_array().unwrap()).unwrap().elements.clone();
    let high = static_value(&mut process, "Level", "HIGH");
    assert_eq!(elements[1], high);
}

#[test]
fn test_rejects_foreign_class() {
    let (mut process, _, ty) = build_graph(vec![]);
    let result = from_json_str(r#"{"!k": "Holder", "!i": 0}"#, &ty, &mut process);
    assert!(matches!(result, Err(DeserializeError::TypeMismatch { .. })));
    let result = from_json_str("not json", &ty, &mut process);
    assert!(matches!(result, Err(DeserializeError::Json(_))));
}

#[test]
fn test_shared_list_round_trips_as_nulls() {
    let bag = class("Bag")
        .attribute(attribute("first", ty("ArrayList")).build())
        .attribute(attribute("second", ty("ArrayList")).build())
        .build();
    let keeper = class("Keeper")
        .attribute(attribute("kept", ty("Bag")).static_().build())
        .build();
    let m = module(
        "test",
        vec![bag, keeper],
        vec![
            var("items", new_object("ArrayList", vec![])),
            var("bag", new_object("Bag", vec![])),
            expr(assign(field(ident("bag"), "first"), ident("items"))),
            expr(assign(field(ident("bag"), "second"), ident("items"))),
            expr(assign(field(ident("Keeper"), "kept"), ident("bag"))),
        ],
    );
    let (_, mut process) = run(&m);
    let kept = static_value(&mut process, "Keeper", "kept");
    let ty = Type::Class(process.classes.get_class_by_name("Bag").unwrap().id);

    let text = to_json_string(&kept, &ty, &process).unwrap();
    assert_eq!(
        serde_json::from_str::<serde_json::Value>(&text).unwrap(),
        json!({"!k": "Bag", "!i": 0, "Bag": {"first": null, "second": null}})
    );
    let copy = from_json_str(&text, &ty, &mut process).unwrap();
    assert_eq!(attribute_value(&process, &copy, "first"), Value::Null);
    assert_eq!(attribute_value(&process, &copy, "second"), Value::Null);
}
