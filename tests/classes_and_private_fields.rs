//! Class desugaring (`§4.6` "Classes"): constructor, instance/static
//! methods, accessors, `extends`/`super`, and private fields.

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
fn constructor_methods_and_static_members_are_installed_where_spec_says() {
    let mut engine = Engine::new();
    let result = engine
        .evaluate(
            "class Point {
                 static origin() { return new Point(0, 0); }
                 constructor(x, y) { this.x = x; this.y = y; }
                 sum() { return this.x + this.y; }
             }
             const p = new Point(3, 4);
             [p.sum(), Point.origin().sum(), p instanceof Point]",
        )
        .unwrap();
    let object = result.as_object().unwrap();
    assert_eq!(num(engine.get_property(Value::Object(object), "0").unwrap()), 7.0);
    assert_eq!(num(engine.get_property(Value::Object(object), "1").unwrap()), 0.0);
    assert!(engine.get_property(Value::Object(object), "2").unwrap().to_boolean());
}

#[test]
fn getters_and_setters_are_installed_as_accessor_descriptors() {
    let mut engine = Engine::new();
    let result = engine
        .evaluate(
            "class Box {
                 #value = 0;
                 get value() { return this.#value; }
                 set value(v) { this.#value = v * 2; }
             }
             const b = new Box();
             b.value = 21;
             b.value",
        )
        .unwrap();
    assert_eq!(num(result), 42.0);
}

#[test]
fn extends_wires_the_prototype_chain_and_super_calls_the_parent() {
    let mut engine = Engine::new();
    let result = engine
        .evaluate(
            "class Animal {
                 constructor(name) { this.name = name; }
                 speak() { return this.name + ' makes a sound'; }
             }
             class Dog extends Animal {
                 constructor(name) { super(name); }
                 speak() { return super.speak() + ', specifically a bark'; }
             }
             const d = new Dog('Rex');
             [d.speak(), d instanceof Animal, d instanceof Dog]",
        )
        .unwrap();
    let object = result.as_object().unwrap();
    assert_eq!(string(engine.get_property(Value::Object(object), "0").unwrap()), "Rex makes a sound, specifically a bark");
    assert!(engine.get_property(Value::Object(object), "1").unwrap().to_boolean());
    assert!(engine.get_property(Value::Object(object), "2").unwrap().to_boolean());
}

#[test]
fn reading_a_private_field_an_object_never_declared_throws_type_error() {
    let mut engine = Engine::new();
    engine
        .evaluate(
            "class Secret { #data = 1; }
             class Other { read(o) { return o.#data; } }
             new Other().read(new Secret());",
        )
        .unwrap_err();
    let exceptions = engine.exceptions();
    assert!(exceptions.iter().any(|e| e.message.contains("TypeError")), "{exceptions:?}");
}

#[test]
fn private_fields_are_per_instance_and_do_not_leak_across_instances() {
    let mut engine = Engine::new();
    let result = engine
        .evaluate(
            "class Counter {
                 #n = 0;
                 inc() { this.#n += 1; return this.#n; }
             }
             const a = new Counter();
             const b = new Counter();
             a.inc(); a.inc();
             b.inc();
             [a.inc(), b.inc()]",
        )
        .unwrap();
    let object = result.as_object().unwrap();
    assert_eq!(num(engine.get_property(Value::Object(object), "0").unwrap()), 3.0);
    assert_eq!(num(engine.get_property(Value::Object(object), "1").unwrap()), 2.0);
}

#[test]
fn a_constructor_returning_an_object_replaces_the_freshly_allocated_this() {
    let mut engine = Engine::new();
    let result = engine
        .evaluate(
            "function Overridden() {
                 this.normal = true;
                 return { overridden: true };
             }
             const o = new Overridden();
             [o.normal, o.overridden]",
        )
        .unwrap();
    let object = result.as_object().unwrap();
    assert!(engine.get_property(Value::Object(object), "0").unwrap().is_undefined());
    assert!(engine.get_property(Value::Object(object), "1").unwrap().to_boolean());
}
