//! Destructuring in declarations, assignments, and parameters (`§4.6`
//! "Destructuring").

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
fn array_pattern_with_default_and_rest_collects_the_remainder() {
    let mut engine = Engine::new();
    let result = engine
        .evaluate(
            "const [a, b = 10, ...rest] = [1, undefined, 2, 3];
             [a, b, rest.length, rest[0], rest[1]]",
        )
        .unwrap();
    let object = result.as_object().unwrap();
    assert_eq!(num(engine.get_property(Value::Object(object), "0").unwrap()), 1.0);
    assert_eq!(num(engine.get_property(Value::Object(object), "1").unwrap()), 10.0);
    assert_eq!(num(engine.get_property(Value::Object(object), "2").unwrap()), 2.0);
    assert_eq!(num(engine.get_property(Value::Object(object), "3").unwrap()), 2.0);
    assert_eq!(num(engine.get_property(Value::Object(object), "4").unwrap()), 3.0);
}

#[test]
fn object_pattern_with_renaming_default_and_rest() {
    let mut engine = Engine::new();
    let result = engine
        .evaluate(
            "const { x: renamed, y = 99, ...others } = { x: 1, z: 2, w: 3 };
             [renamed, y, others.z, others.w, others.x]",
        )
        .unwrap();
    let object = result.as_object().unwrap();
    assert_eq!(num(engine.get_property(Value::Object(object), "0").unwrap()), 1.0);
    assert_eq!(num(engine.get_property(Value::Object(object), "1").unwrap()), 99.0);
    assert_eq!(num(engine.get_property(Value::Object(object), "2").unwrap()), 2.0);
    assert_eq!(num(engine.get_property(Value::Object(object), "3").unwrap()), 3.0);
    assert!(engine.get_property(Value::Object(object), "4").unwrap().is_undefined());
}

#[test]
fn nested_patterns_in_function_parameters_bind_correctly() {
    let mut engine = Engine::new();
    let result = engine
        .evaluate(
            "function f({ a: [first, second], b: { c } }) { return first + second + c; }
             f({ a: [1, 2], b: { c: 3 } })",
        )
        .unwrap();
    assert_eq!(num(result), 6.0);
}

#[test]
fn defaults_apply_only_when_the_bound_value_is_undefined_not_for_null_or_falsy() {
    let mut engine = Engine::new();
    let result = engine
        .evaluate(
            "function f(a = 'default') { return a; }
             [f(undefined), f(null), f(0), f('')]",
        )
        .unwrap();
    let object = result.as_object().unwrap();
    assert_eq!(string(engine.get_property(Value::Object(object), "0").unwrap()), "default");
    assert!(engine.get_property(Value::Object(object), "1").unwrap().is_null());
    assert_eq!(num(engine.get_property(Value::Object(object), "2").unwrap()), 0.0);
    assert_eq!(string(engine.get_property(Value::Object(object), "3").unwrap()), "");
}

#[test]
fn destructuring_assignment_without_a_declaration_uses_parenthesized_object_pattern() {
    let mut engine = Engine::new();
    let result = engine
        .evaluate(
            "let a, b;
             ({ a, b } = { a: 5, b: 6 });
             [a, b]",
        )
        .unwrap();
    let object = result.as_object().unwrap();
    assert_eq!(num(engine.get_property(Value::Object(object), "0").unwrap()), 5.0);
    assert_eq!(num(engine.get_property(Value::Object(object), "1").unwrap()), 6.0);
}

#[test]
fn for_of_destructuring_iterates_pairs_from_an_entries_like_source() {
    let mut engine = Engine::new();
    let result = engine
        .evaluate(
            "let total = 0;
             for (const [k, v] of [[1, 10], [2, 20], [3, 30]]) { total += k * v; }
             total",
        )
        .unwrap();
    assert_eq!(num(result), 10.0 + 40.0 + 90.0);
}
