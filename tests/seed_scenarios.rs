//! Integration coverage for the concrete seed scenarios and a few of the
//! universal invariants: each corresponds to one numbered example against
//! the public `Engine` API, the same "drive the whole pipeline through one
//! entry point" shape the teacher crate's `tests/main.rs` uses for `Runner`.

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
fn continue_and_break_in_a_for_loop() {
    let mut engine = Engine::new();
    let result = engine
        .evaluate(
            "let x = 0;
             for (let i = 0; i < 5; i++) {
                 if (i === 2) continue;
                 if (i === 4) break;
                 x += i;
             }
             x",
        )
        .unwrap();
    assert_eq!(num(result), 4.0);
}

#[test]
fn async_await_round_trips_through_a_promise() {
    let mut engine = Engine::new();
    engine
        .evaluate(
            "async function f() { return await Promise.resolve(41) + 1; }
             f().then(v => globalThis.r = v);",
        )
        .unwrap();
    let r = engine.evaluate("r").unwrap();
    assert_eq!(num(r), 42.0);
}

#[test]
fn function_declaration_in_a_block_hoists_its_name_but_not_its_value() {
    let mut engine = Engine::new();
    let result = engine
        .evaluate(
            "var before = typeof f;
             if (false) ; else function f(){ return 'else'; }
             var after = typeof f;
             [before, after, f()]",
        )
        .unwrap();
    let object = result.as_object().expect("array is an object");
    let before = string(engine.get_property(Value::Object(object), "0").unwrap());
    let after = string(engine.get_property(Value::Object(object), "1").unwrap());
    let called = string(engine.get_property(Value::Object(object), "2").unwrap());
    assert_eq!(before, "undefined");
    assert_eq!(after, "function");
    assert_eq!(called, "else");
}

#[test]
fn resizing_a_buffer_during_coercion_shrinks_the_view_to_zero() {
    let mut engine = Engine::new();
    let result = engine
        .evaluate(
            "const rab = new ArrayBuffer(4, { maxByteLength: 8 });
             const ta = new Int8Array(rab, 0, 4);
             const evil = { valueOf(){ rab.resize(2); return 2; } };
             const found = Array.prototype.lastIndexOf.call(ta, 0, evil);
             [found, ta.length]",
        )
        .unwrap();
    let object = result.as_object().expect("array is an object");
    let found = num(engine.get_property(Value::Object(object), "0").unwrap());
    let length = num(engine.get_property(Value::Object(object), "1").unwrap());
    assert_eq!(found, -1.0);
    assert_eq!(length, 0.0);
}

#[test]
fn constructor_calls_install_a_shared_prototype_method() {
    let mut engine = Engine::new();
    let result = engine
        .evaluate(
            "function Body(x){ this.x = x; }
             Body.prototype.dbl = function(){ return this.x*2; };
             [new Body(5), new Body(10)][0].dbl()",
        )
        .unwrap();
    assert_eq!(num(result), 10.0);
}

#[test]
fn timers_fire_after_the_synchronous_section_and_in_due_order() {
    let mut engine = Engine::new();
    let result = engine
        .evaluate(
            "let order = [];
             order.push('s');
             setTimeout(() => order.push('t'), 0);
             order.push('e');
             order",
        )
        .unwrap();
    let object = result.as_object().expect("array is an object");
    let first = string(engine.get_property(Value::Object(object), "0").unwrap());
    let second = string(engine.get_property(Value::Object(object), "1").unwrap());
    let third = string(engine.get_property(Value::Object(object), "2").unwrap());
    assert_eq!(first, "s");
    assert_eq!(second, "e");
    assert_eq!(third, "t");
}

#[test]
fn let_read_before_initialization_throws_reference_error_not_panic() {
    let mut engine = Engine::new();
    engine.evaluate("{ x; let x = 1; }").unwrap_err();
    let exceptions = engine.exceptions();
    assert!(exceptions.iter().any(|e| e.message.contains("ReferenceError")), "{exceptions:?}");
}

#[test]
fn const_reassignment_throws_type_error() {
    let mut engine = Engine::new();
    engine.evaluate("const c = 1; c = 2;").unwrap_err();
    let exceptions = engine.exceptions();
    assert!(exceptions.iter().any(|e| e.message.contains("TypeError")), "{exceptions:?}");
}

#[test]
fn event_loop_drains_before_evaluate_returns() {
    let mut engine = Engine::new();
    engine
        .evaluate("setTimeout(() => { globalThis.ran = true; }, 0); Promise.resolve().then(() => { globalThis.settled = true; });")
        .unwrap();
    let ran = engine.evaluate("globalThis.ran").unwrap();
    let settled = engine.evaluate("globalThis.settled").unwrap();
    assert!(ran.to_boolean());
    assert!(settled.to_boolean());
}

#[test]
fn call_apply_and_bind_rebind_this_and_prefix_arguments() {
    let mut engine = Engine::new();
    let result = engine
        .evaluate(
            "function sum3(a, b, c) { return this.base + a + b + c; }
             const ctx = { base: 100 };
             const viaCall = sum3.call(ctx, 1, 2, 3);
             const viaApply = sum3.apply(ctx, [1, 2, 3]);
             const bound = sum3.bind(ctx, 1);
             const viaBind = bound(2, 3);
             [viaCall, viaApply, viaBind]",
        )
        .unwrap();
    let object = result.as_object().expect("array is an object");
    let via_call = num(engine.get_property(Value::Object(object), "0").unwrap());
    let via_apply = num(engine.get_property(Value::Object(object), "1").unwrap());
    let via_bind = num(engine.get_property(Value::Object(object), "2").unwrap());
    assert_eq!(via_call, 106.0);
    assert_eq!(via_apply, 106.0);
    assert_eq!(via_bind, 106.0);
}

#[test]
fn the_function_and_bigint_constructors_are_reachable_as_bare_globals() {
    let mut engine = Engine::new();
    let result = engine
        .evaluate(
            "const add = new Function('a', 'b', 'return a + b;');
             const big = BigInt(9007199254740993);
             [add(2, 3), typeof big, big + 1n]",
        )
        .unwrap();
    let object = result.as_object().expect("array is an object");
    let sum = num(engine.get_property(Value::Object(object), "0").unwrap());
    let kind = string(engine.get_property(Value::Object(object), "1").unwrap());
    assert_eq!(sum, 5.0);
    assert_eq!(kind, "bigint");
}

#[test]
fn a_generator_object_is_directly_driveable_via_next_and_return() {
    let mut engine = Engine::new();
    let result = engine
        .evaluate(
            "function* counter() { yield 1; yield 2; yield 3; }
             const it = counter();
             const a = it.next();
             const b = it.next();
             const early = counter();
             const stopped = early.return(99);
             [a.value, a.done, b.value, b.done, stopped.value, stopped.done]",
        )
        .unwrap();
    let object = result.as_object().expect("array is an object");
    let a_value = num(engine.get_property(Value::Object(object), "0").unwrap());
    let a_done = engine.get_property(Value::Object(object), "1").unwrap();
    let b_value = num(engine.get_property(Value::Object(object), "2").unwrap());
    let stopped_value = num(engine.get_property(Value::Object(object), "4").unwrap());
    let stopped_done = engine.get_property(Value::Object(object), "5").unwrap();
    assert_eq!(a_value, 1.0);
    assert!(!a_done.to_boolean());
    assert_eq!(b_value, 2.0);
    assert_eq!(stopped_value, 99.0);
    assert!(stopped_done.to_boolean());
}

#[test]
fn engines_do_not_share_prototype_mutations() {
    let mut a = Engine::new();
    let mut b = Engine::new();
    a.evaluate("Array.prototype.poisoned = 'oh no';").unwrap();
    let in_b = b.evaluate("typeof Array.prototype.poisoned").unwrap();
    assert_eq!(string(in_b), "undefined");
}
