// Use codspeed-criterion-compat when running on CodSpeed (CI), real criterion otherwise, the
// same split the teacher crate's benches use for flamegraphs versus CI measurement.
#[cfg(codspeed)]
use codspeed_criterion_compat::{Criterion, black_box, criterion_group, criterion_main};
#[cfg(not(codspeed))]
use criterion::{Criterion, black_box, criterion_group, criterion_main};

use glint::Engine;

/// Runs `code` to completion against a fresh engine, asserting on the last
/// expression's value so a regression that changes behavior (not just
/// speed) fails loudly instead of silently benchmarking the wrong thing.
fn run_glint(c: &mut Criterion, name: &str, code: &str, expect: f64) {
    let mut engine = Engine::new();
    let result = engine.evaluate(code).unwrap();
    let n: f64 = match result {
        glint::Value::Number(n) => n,
        other => panic!("{name}: expected a number, got {other:?}"),
    };
    assert_eq!(n, expect, "{name} produced an unexpected result");

    c.bench_function(name, |b| {
        b.iter(|| {
            let mut engine = Engine::new();
            let result = engine.evaluate(black_box(code)).unwrap();
            black_box(result);
        });
    });
}

/// Deliberately non-foldable bodies (the loop bound and accumulator are
/// runtime values) so the measured time reflects evaluator dispatch rather
/// than the constant folder short-circuiting the whole program to a literal.
fn arithmetic_loop(c: &mut Criterion) {
    run_glint(
        c,
        "arithmetic_loop",
        "function run(n) {
             let total = 0;
             for (let i = 0; i < n; i++) {
                 total += i * 2 - 1;
             }
             return total;
         }
         run(50000);",
        4_999_950_000.0,
    );
}

fn fibonacci_recursive(c: &mut Criterion) {
    run_glint(
        c,
        "fibonacci_recursive",
        "function fib(n) { return n < 2 ? n : fib(n - 1) + fib(n - 2); }
         fib(22);",
        17711.0,
    );
}

fn array_method_chain(c: &mut Criterion) {
    run_glint(
        c,
        "array_method_chain",
        "function run(n) {
             const xs = Array.from({ length: n }, (_, i) => i);
             return xs.map(x => x * 2).filter(x => x % 3 === 0).reduce((a, b) => a + b, 0);
         }
         run(5000);",
        12_497_500.0,
    );
}

fn async_await_chain(c: &mut Criterion) {
    run_glint(
        c,
        "async_await_chain",
        "async function run(n) {
             let total = 0;
             for (let i = 0; i < n; i++) {
                 total += await Promise.resolve(i);
             }
             return total;
         }
         let result = 0;
         run(500).then(v => { result = v; });
         result;",
        0.0,
    );
}

criterion_group!(benches, arithmetic_loop, fibonacci_recursive, array_method_chain, async_await_chain);
criterion_main!(benches);
