//! Promise resolution and event-loop ordering guarantees (`§4.8`, `§4.9`,
//! `§5` "Ordering guarantees").

use glint::Engine;
use glint::Value;

fn string(v: Value) -> String {
    match v {
        Value::String(s) => s.to_string(),
        other => panic!("expected string, got {other:?}"),
    }
}

#[test]
fn all_microtasks_drain_before_the_next_macrotask() {
    let mut engine = Engine::new();
    let result = engine
        .evaluate(
            "let order = [];
             setTimeout(() => order.push('macro'), 0);
             Promise.resolve().then(() => order.push('micro1'));
             Promise.resolve().then(() => order.push('micro2'));
             order.join(',')",
        )
        .unwrap();
    assert_eq!(string(result), "");
    let after_drain = engine.evaluate("order.join(',')").unwrap();
    assert_eq!(string(after_drain), "micro1,micro2,macro");
}

#[test]
fn resolving_with_a_thenable_attaches_to_its_then() {
    let mut engine = Engine::new();
    engine
        .evaluate(
            "const inner = { then(resolve) { resolve(7); } };
             new Promise(resolve => resolve(inner)).then(v => { globalThis.got = v; });",
        )
        .unwrap();
    let got = engine.evaluate("got").unwrap();
    assert!(matches!(got, Value::Number(n) if n == 7.0));
}

#[test]
fn a_rejected_promise_propagates_through_then_chains_to_the_catch_handler() {
    let mut engine = Engine::new();
    engine
        .evaluate(
            "Promise.reject(new Error('boom'))
                 .then(() => 'unreachable')
                 .catch(e => { globalThis.caught = e.message; });",
        )
        .unwrap();
    let caught = engine.evaluate("caught").unwrap();
    assert_eq!(string(caught), "boom");
}

#[test]
fn clearing_a_timeout_before_it_fires_prevents_it_from_running() {
    let mut engine = Engine::new();
    let fired = engine
        .evaluate(
            "let fired = false;
             const id = setTimeout(() => { fired = true; }, 0);
             clearTimeout(id);
             fired",
        )
        .unwrap();
    assert!(!fired.to_boolean());
}

#[test]
fn an_unhandled_rejection_is_surfaced_on_the_exception_channel() {
    let mut engine = Engine::new();
    engine.evaluate("Promise.reject(new Error('unobserved'));").unwrap();
    let exceptions = engine.exceptions();
    assert!(exceptions.iter().any(|e| e.message.contains("unobserved")), "{exceptions:?}");
}

#[test]
fn promise_all_resolves_once_every_input_settles_preserving_order() {
    let mut engine = Engine::new();
    engine
        .evaluate(
            "Promise.all([
                 new Promise(r => setTimeout(() => r(1), 0)),
                 Promise.resolve(2),
                 new Promise(r => setTimeout(() => r(3), 0)),
             ]).then(values => { globalThis.results = values; });",
        )
        .unwrap();
    let result = engine.evaluate("[results[0], results[1], results[2]]").unwrap();
    let object = result.as_object().unwrap();
    let a = engine.get_property(Value::Object(object), "0").unwrap();
    let b = engine.get_property(Value::Object(object), "1").unwrap();
    let c = engine.get_property(Value::Object(object), "2").unwrap();
    assert!(matches!(a, Value::Number(n) if n == 1.0));
    assert!(matches!(b, Value::Number(n) if n == 2.0));
    assert!(matches!(c, Value::Number(n) if n == 3.0));
}

#[test]
fn a_thrown_exception_inside_a_timer_callback_is_routed_to_the_exception_channel_without_crashing() {
    let mut engine = Engine::new();
    engine.evaluate("setTimeout(() => { throw new Error('timer blew up'); }, 0);").unwrap();
    let exceptions = engine.exceptions();
    assert!(exceptions.iter().any(|e| e.message.contains("timer blew up")), "{exceptions:?}");
    let still_alive = engine.evaluate("1 + 1").unwrap();
    assert!(matches!(still_alive, Value::Number(n) if n == 2.0));
}
