use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use javelin_engine::ast::build::*;
use javelin_engine::ast::Module;
use javelin_engine::types::Operator;
use javelin_engine::{CodeGenerator, Process};

/// `int sum = 0; for (int i = 0; i < n; i++) sum += i % 7; print(sum);`
fn summing_loop(n: i32) -> Module {
    module(
        "bench",
        vec![],
        vec![
            local(ty("int"), "sum", Some(int(0))),
            for_loop(
                vec![local(ty("int"), "i", Some(int(0)))],
                Some(binary(Operator::Lower, ident("i"), int(n))),
                vec![post_inc(ident("i"))],
                expr(compound(
                    Operator::Plus,
                    ident("sum"),
                    binary(Operator::Modulo, ident("i"), int(7)),
                )),
            ),
            print(ident("sum")),
        ],
    )
}

/// Recursive `fib(n)` on a static method
fn fibonacci(n: i32) -> Module {
    let fib = method("fib")
        .static_()
        .param("n", ty("int"))
        .returns(ty("int"))
        .body(vec![
            if_then(binary(Operator::Lower, ident("n"), int(2)), ret(ident("n"))),
            ret(binary(
                Operator::Plus,
                call_here("fib", vec![binary(Operator::Minus, ident("n"), int(1))]),
                call_here("fib", vec![binary(Operator::Minus, ident("n"), int(2))]),
            )),
        ])
        .build();
    module(
        "bench",
        vec![class("Fib").method(fib).build()],
        vec![print(call(ident("Fib"), "fib", vec![int(n)]))],
    )
}

fn bench_codegen(c: &mut Criterion) {
    let source = fibonacci(10);
    c.bench_function("generate_module", |b| {
        b.iter(|| {
            let mut process = Process::new();
            CodeGenerator::generate(black_box(&source), &mut process)
        });
    });
}

fn bench_loop(c: &mut Criterion) {
    let mut group = c.benchmark_group("engine_loop");

    for n in [1_000, 10_000] {
        let source = summing_loop(n);
        group.bench_with_input(BenchmarkId::new("summing_loop", n), &source, |b, source| {
            b.iter(|| {
                let mut process = Process::new();
                let generated = CodeGenerator::generate(source, &mut process);
                generated.execute(&mut process).unwrap()
            });
        });
    }

    let source = fibonacci(15);
    group.bench_with_input(BenchmarkId::new("fibonacci", 15), &source, |b, source| {
        b.iter(|| {
            let mut process = Process::new();
            let generated = CodeGenerator::generate(source, &mut process);
            generated.execute(&mut process).unwrap()
        });
    });

    group.finish();
}

criterion_group!(benches, bench_codegen, bench_loop);
criterion_main!(benches);
