//! Choosing what a module runs

use super::harness::*;

fn app_with_main(name: &str, text: &str) -> ClassDecl {
    class(name).method(main_method(vec![println(string(text))])).build()
}

#[test]
fn test_static_main_runs_without_top_level_statements() {
    let m = module("test", vec![app_with_main("App", "from main")], vec![]);
    expect_output(&m, "from main\n");
}

#[test]
fn test_main_receives_empty_arguments() {
    let app = class("App")
        .method(main_method(vec![println(field(ident("args"), "length"))]))
        .build();
    expect_output(&module("test", vec![app], vec![]), "0\n");
}

#[test]
fn test_top_level_statements_take_precedence() {
    let m = module(
        "test",
        vec![app_with_main("App", "from main")],
        vec![println(string("top level"))],
    );
    expect_output(&m, "top level\n");
}

#[test]
fn test_module_without_entry_completes_silently() {
    let m = module("test", vec![class("Empty").build()], vec![]);
    let (generated, mut process) = compile(&m);
    assert!(generated.main_program.is_none());
    assert!(generated.execute(&mut process).unwrap().is_completed());
    assert_eq!(process.console.take(), "");
}

#[test]
fn test_non_public_main_is_not_an_entry() {
    let hidden = class("Hidden")
        .method(
            method("main")
                .static_()
                .visibility(Visibility::Private)
                .param("args", array_of(ty("String")))
                .build(),
        )
        .build();
    let (generated, _) = compile(&module("test", vec![hidden], vec![]));
    assert!(generated.main_program.is_none());
}

#[test]
fn test_instance_main_is_not_an_entry() {
    let app = class("App")
        .method(method("main").param("args", array_of(ty("String"))).build())
        .build();
    let (generated, _) = compile(&module("test", vec![app], vec![]));
    assert!(generated.main_program.is_none());
}

#[test]
fn test_ambiguous_main_is_reported() {
    let m = module(
        "test",
        vec![app_with_main("First", "1"), app_with_main("Second", "2")],
        vec![],
    );
    assert_eq!(
        generation_errors(&m),
        vec!["Multiple classes contain a static main method.".to_string()]
    );
    let (generated, _) = compile(&m);
    assert!(generated.main_program.is_none());
}

#[test]
fn test_static_initializers_run_before_main() {
    let config = class("Config")
        .attribute(
            attribute("greeting", ty("String"))
                .static_()
                .init(op(string("hel"), Operator::Plus, string("lo")))
                .build(),
        )
        .build();
    let app = class("App")
        .method(main_method(vec![println(field(ident("Config"), "greeting"))]))
        .build();
    expect_output(&module("test", vec![config, app], vec![]), "hello\n");
}
