//! The `async`/`await → Promise` CPS rewrite (`§4.5`): await sequencing
//! inside loops, `try`/`catch`/`finally`, and conditionals.

use glint::Engine;
use glint::Value;

fn num(v: Value) -> f64 {
    match v {
        Value::Number(n) => n,
        other => panic!("expected number, got {other:?}"),
    }
}

fn string(v: Value) -> String {
    match v {
        Value::String(s) => s.to_string(),
        other => panic!("expected string, got {other:?}"),
    }
}

#[test]
fn awaits_inside_a_loop_run_sequentially_in_order() {
    let mut engine = Engine::new();
    engine
        .evaluate(
            "async function sumUp() {
                 let total = 0;
                 for (let i = 1; i <= 3; i++) {
                     total += await Promise.resolve(i);
                 }
                 return total;
             }
             sumUp().then(v => { globalThis.total = v; });",
        )
        .unwrap();
    let total = engine.evaluate("total").unwrap();
    assert_eq!(num(total), 6.0);
}

#[test]
fn a_rejected_await_inside_try_is_caught_and_finally_still_runs() {
    let mut engine = Engine::new();
    engine
        .evaluate(
            "let trace = [];
             async function risky() {
                 try {
                     await Promise.reject(new Error('nope'));
                 } catch (e) {
                     trace.push('caught:' + e.message);
                 } finally {
                     trace.push('finally');
                 }
                 return trace.join(',');
             }
             risky().then(v => { globalThis.result = v; });",
        )
        .unwrap();
    let result = engine.evaluate("result").unwrap();
    assert_eq!(string(result), "caught:nope,finally");
}

#[test]
fn await_inside_a_conditional_branch_only_runs_the_taken_branch() {
    let mut engine = Engine::new();
    engine
        .evaluate(
            "let touched = [];
             async function pick(flag) {
                 if (flag) {
                     touched.push(await Promise.resolve('left'));
                 } else {
                     touched.push(await Promise.resolve('right'));
                 }
                 return touched.join(',');
             }
             pick(true).then(v => { globalThis.first = v; });
             pick(false).then(v => { globalThis.second = v; });",
        )
        .unwrap();
    let first = engine.evaluate("first").unwrap();
    let second = engine.evaluate("second").unwrap();
    assert_eq!(string(first), "left");
    assert_eq!(string(second), "left,right");
}

#[test]
fn for_await_of_awaits_each_element_of_an_async_iterable_source() {
    let mut engine = Engine::new();
    engine
        .evaluate(
            "async function collect() {
                 let out = [];
                 for await (const x of [Promise.resolve(1), Promise.resolve(2), 3]) {
                     out.push(x);
                 }
                 return out.join(',');
             }
             collect().then(v => { globalThis.collected = v; });",
        )
        .unwrap();
    let collected = engine.evaluate("collected").unwrap();
    assert_eq!(string(collected), "1,2,3");
}

#[test]
fn an_unsupported_shape_falls_back_to_the_untyped_interpreter_instead_of_panicking() {
    let mut engine = Engine::new();
    let result = engine
        .evaluate(
            "async function weird() {
                 label: {
                     if (true) break label;
                     await Promise.resolve(1);
                 }
                 return 'ok';
             }
             weird().then(v => { globalThis.ok = v; });",
        );
    assert!(result.is_ok());
    let ok = engine.evaluate("ok").unwrap();
    assert_eq!(string(ok), "ok");
}
