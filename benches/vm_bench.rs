use std::fmt::Write;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use cmel::runtime::vm::Vm;

struct Scenario {
    name: &'static str,
    source: String,
    key_ops: u64,
}

fn run_program(source: &str) {
    let mut vm = Vm::new();
    vm.capture_output();
    vm.interpret(source)
        .unwrap_or_else(|error| panic!("bench program failed: {:?}", error));
    black_box(vm.take_output());
}

fn build_fib_program(n: usize) -> String {
    format!(
        "fun fib(n) {{ if (n < 2) return n; return fib(n - 1) + fib(n - 2); }}\nprint fib({});\n",
        n
    )
}

fn build_closure_counter_program(calls: usize) -> String {
    let mut src = String::with_capacity(calls * 8 + 128);
    let _ = writeln!(
        src,
        "fun counter() {{ var n = 0; return fun() {{ n = n + 1; return n; }}; }}"
    );
    let _ = writeln!(src, "var bump = counter();");
    let _ = writeln!(
        src,
        "for (var i = 0; i < {}; i = i + 1) {{ bump(); }}",
        calls
    );
    let _ = writeln!(src, "print bump();");
    src
}

fn build_string_concat_program(rounds: usize) -> String {
    format!(
        "var s = \"\";\nfor (var i = 0; i < {}; i = i + 1) {{ s = s + \"x\" + i; }}\nprint s.length();\n",
        rounds
    )
}

fn build_method_dispatch_program(calls: usize) -> String {
    let mut src = String::with_capacity(calls * 4 + 256);
    let _ = writeln!(
        src,
        "class Counter {{\n  init() {{ this.n = 0; }}\n  bump() {{ this.n = this.n + 1; }}\n}}"
    );
    let _ = writeln!(src, "var c = Counter();");
    let _ = writeln!(
        src,
        "for (var i = 0; i < {}; i = i + 1) {{ c.bump(); }}",
        calls
    );
    let _ = writeln!(src, "print c.n;");
    src
}

fn build_scenarios() -> Vec<Scenario> {
    vec![
        Scenario {
            name: "fib_20",
            source: build_fib_program(20),
            key_ops: 21891, // call count for fib(20)
        },
        Scenario {
            name: "closure_counter_10k",
            source: build_closure_counter_program(10_000),
            key_ops: 10_000,
        },
        Scenario {
            name: "string_concat_2k",
            source: build_string_concat_program(2_000),
            key_ops: 2_000,
        },
        Scenario {
            name: "method_dispatch_10k",
            source: build_method_dispatch_program(10_000),
            key_ops: 10_000,
        },
    ]
}

fn bench_interpreter(c: &mut Criterion) {
    let scenarios = build_scenarios();
    let mut group = c.benchmark_group("vm/interpret");

    for scenario in scenarios {
        group.throughput(Throughput::Elements(scenario.key_ops));
        group.bench_with_input(
            BenchmarkId::from_parameter(scenario.name),
            &scenario.source,
            |b, source| {
                b.iter(|| {
                    run_program(black_box(source));
                });
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_interpreter);
criterion_main!(benches);
