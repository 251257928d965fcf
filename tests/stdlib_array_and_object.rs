//! Non-mutating array copy methods and descriptor-aware `Object` statics
//! (`§4.7`, §8 "Round-trips / laws").

use glint::Engine;
use glint::Value;

fn num(v: Value) -> f64 {
    match v {
        Value::Number(n) => n,
        other => panic!("expected number, got {other:?}"),
    }
}

fn boolean(v: Value) -> bool {
    match v {
        Value::Bool(b) => b,
        other => panic!("expected bool, got {other:?}"),
    }
}

#[test]
fn to_sorted_returns_a_sorted_copy_leaving_the_original_unchanged() {
    let mut engine = Engine::new();
    let result = engine
        .evaluate(
            "const arr = [3, 1, 2];
             const sorted = arr.toSorted((a, b) => a - b);
             [sorted[0], sorted[1], sorted[2], arr[0], arr[1], arr[2]]",
        )
        .unwrap();
    let object = result.as_object().unwrap();
    assert_eq!(num(engine.get_property(Value::Object(object), "0").unwrap()), 1.0);
    assert_eq!(num(engine.get_property(Value::Object(object), "1").unwrap()), 2.0);
    assert_eq!(num(engine.get_property(Value::Object(object), "2").unwrap()), 3.0);
    assert_eq!(num(engine.get_property(Value::Object(object), "3").unwrap()), 3.0);
    assert_eq!(num(engine.get_property(Value::Object(object), "4").unwrap()), 1.0);
    assert_eq!(num(engine.get_property(Value::Object(object), "5").unwrap()), 2.0);
}

#[test]
fn with_returns_a_copy_with_one_element_replaced() {
    let mut engine = Engine::new();
    let result = engine
        .evaluate(
            "const arr = [1, 2, 3];
             const copy = arr.with(1, 99);
             [copy[1], arr[1]]",
        )
        .unwrap();
    let object = result.as_object().unwrap();
    assert_eq!(num(engine.get_property(Value::Object(object), "0").unwrap()), 99.0);
    assert_eq!(num(engine.get_property(Value::Object(object), "1").unwrap()), 2.0);
}

#[test]
fn flat_and_flat_map_respect_depth_and_mapping() {
    let mut engine = Engine::new();
    let result = engine
        .evaluate(
            "const nested = [1, [2, [3, 4]], 5];
             const flatOne = nested.flat();
             const flatDeep = nested.flat(2);
             const mapped = [1, 2, 3].flatMap(x => [x, x * 10]);
             [flatOne.length, flatDeep.length, mapped.length, mapped[1], mapped[3]]",
        )
        .unwrap();
    let object = result.as_object().unwrap();
    assert_eq!(num(engine.get_property(Value::Object(object), "0").unwrap()), 4.0);
    assert_eq!(num(engine.get_property(Value::Object(object), "1").unwrap()), 5.0);
    assert_eq!(num(engine.get_property(Value::Object(object), "2").unwrap()), 6.0);
    assert_eq!(num(engine.get_property(Value::Object(object), "3").unwrap()), 10.0);
    assert_eq!(num(engine.get_property(Value::Object(object), "4").unwrap()), 20.0);
}

#[test]
fn find_last_and_find_last_index_search_from_the_end() {
    let mut engine = Engine::new();
    let result = engine
        .evaluate(
            "const arr = [1, 4, 2, 4, 3];
             [arr.findLast(x => x === 4), arr.findLastIndex(x => x === 4)]",
        )
        .unwrap();
    let object = result.as_object().unwrap();
    assert_eq!(num(engine.get_property(Value::Object(object), "0").unwrap()), 4.0);
    assert_eq!(num(engine.get_property(Value::Object(object), "1").unwrap()), 3.0);
}

#[test]
fn frozen_object_writes_are_ignored_in_sloppy_mode_and_is_frozen_reports_true() {
    let mut engine = Engine::new();
    let result = engine
        .evaluate(
            "const o = Object.freeze({ a: 1 });
             o.a = 2;
             [o.a, Object.isFrozen(o)]",
        )
        .unwrap();
    let object = result.as_object().unwrap();
    assert_eq!(num(engine.get_property(Value::Object(object), "0").unwrap()), 1.0);
    assert!(boolean(engine.get_property(Value::Object(object), "1").unwrap()));
}

#[test]
fn frozen_object_writes_throw_in_strict_mode() {
    let mut engine = Engine::new();
    engine
        .evaluate(
            "'use strict';
             const o = Object.freeze({ a: 1 });
             o.a = 2;",
        )
        .unwrap_err();
}

#[test]
fn frozen_array_index_and_length_writes_are_ignored_in_sloppy_mode() {
    let mut engine = Engine::new();
    let result = engine
        .evaluate(
            "const arr = Object.freeze([1, 2, 3]);
             arr[0] = 99;
             arr.length = 0;
             [arr[0], arr.length, Object.isFrozen(arr)]",
        )
        .unwrap();
    let object = result.as_object().unwrap();
    assert_eq!(num(engine.get_property(Value::Object(object), "0").unwrap()), 1.0);
    assert_eq!(num(engine.get_property(Value::Object(object), "1").unwrap()), 3.0);
    assert!(boolean(engine.get_property(Value::Object(object), "2").unwrap()));
}

#[test]
fn frozen_array_index_write_throws_in_strict_mode() {
    let mut engine = Engine::new();
    engine
        .evaluate(
            "'use strict';
             const arr = Object.freeze([1, 2, 3]);
             arr[0] = 99;",
        )
        .unwrap_err();
}

#[test]
fn object_from_entries_and_has_own_round_trip_through_entries() {
    let mut engine = Engine::new();
    let result = engine
        .evaluate(
            "const src = { a: 1, b: 2 };
             const rebuilt = Object.fromEntries(Object.entries(src));
             [rebuilt.a, rebuilt.b, Object.hasOwn(rebuilt, 'a'), Object.hasOwn(rebuilt, 'z')]",
        )
        .unwrap();
    let object = result.as_object().unwrap();
    assert_eq!(num(engine.get_property(Value::Object(object), "0").unwrap()), 1.0);
    assert_eq!(num(engine.get_property(Value::Object(object), "1").unwrap()), 2.0);
    assert!(boolean(engine.get_property(Value::Object(object), "2").unwrap()));
    assert!(!boolean(engine.get_property(Value::Object(object), "3").unwrap()));
}

#[test]
fn json_stringify_then_parse_yields_a_structurally_equal_value_for_json_safe_input() {
    let mut engine = Engine::new();
    let result = engine
        .evaluate(
            "const original = { a: 1, b: [1, 2, 3], c: { nested: true }, d: null, e: 'text' };
             const round = JSON.parse(JSON.stringify(original));
             [round.a, round.b.length, round.b[2], round.c.nested, round.d, round.e]",
        )
        .unwrap();
    let object = result.as_object().unwrap();
    assert_eq!(num(engine.get_property(Value::Object(object), "0").unwrap()), 1.0);
    assert_eq!(num(engine.get_property(Value::Object(object), "1").unwrap()), 3.0);
    assert_eq!(num(engine.get_property(Value::Object(object), "2").unwrap()), 3.0);
    assert!(boolean(engine.get_property(Value::Object(object), "3").unwrap()));
    assert!(engine.get_property(Value::Object(object), "4").unwrap().is_null());
}

#[test]
fn property_insertion_order_is_preserved_for_string_keys_but_integer_keys_sort_first() {
    let mut engine = Engine::new();
    let result = engine
        .evaluate(
            "const o = {};
             o.b = 1;
             o[2] = 'two';
             o.a = 3;
             o[1] = 'one';
             Object.keys(o).join(',')",
        )
        .unwrap();
    match result {
        Value::String(s) => assert_eq!(&*s, "1,2,b,a"),
        other => panic!("expected string, got {other:?}"),
    }
}
