//! `Symbol` factory function and prototype (`§3` "Symbol (unique identity,
//! optional description)", `§4.7`). `Symbol` is deliberately not
//! constructible with `new` (`§4.7` throws `TypeError`), matching how every
//! other primitive-wrapper constructor here is `new`-only except this one.
//!
//! The global symbol registry `Symbol.for`/`Symbol.keyFor` needs is kept as
//! an ordinary hidden array on the global object (`%symbol_registry%`)
//! rather than a new `Realm` field — it's guest-observable state scoped to
//! one `Engine`, not an intrinsic every submodule needs a handle to.

use std::rc::Rc;

use crate::heap::HeapData;
use crate::intern::new_symbol;
use crate::object::{PropertyDescriptor, PropertyKey};
use crate::value::Value;

use crate::evaluator::Evaluator;

const REGISTRY_KEY: &str = "%symbol_registry%";

fn registry(ev: &mut Evaluator) -> crate::heap::HeapId {
    let global = ev.global_object();
    if let Ok(Value::Object(id)) = ev.get_property(Value::Object(global), REGISTRY_KEY) {
        if matches!(ev.heap().get(id), HeapData::Array(_)) {
            return id;
        }
    }
    let id = ev.new_array(Vec::new());
    if let Some(obj) = ev.heap_mut().get_mut(global).as_object_mut() {
        obj.set_own(PropertyKey::from_str(REGISTRY_KEY), PropertyDescriptor::non_enumerable(Value::Object(id)));
    }
    id
}

pub(crate) fn install(ev: &mut Evaluator) {
    let proto = ev.realm().symbol_proto;

    super::def_method(ev, proto, "toString", 0, Rc::new(|ev, this, _args| {
        let Value::Symbol(sym) = this else { return ev.throw_type_error("Symbol.prototype.toString requires a symbol") };
        Ok(Value::string(format!("Symbol({})", sym.description.as_deref().unwrap_or(""))))
    }));

    super::def_method(ev, proto, "valueOf", 0, Rc::new(|ev, this, _args| {
        if matches!(this, Value::Symbol(_)) { Ok(this) } else { ev.throw_type_error("Symbol.prototype.valueOf requires a symbol") }
    }));

    let description_getter = ev.make_host_function("get description", 0, Rc::new(|ev, this, _args| {
        let Value::Symbol(sym) = this else { return ev.throw_type_error("Symbol.prototype.description requires a symbol") };
        Ok(match &sym.description {
            Some(d) => Value::string(d.as_str()),
            None => Value::Undefined,
        })
    }));
    if let Some(obj) = ev.heap_mut().get_mut(proto).as_object_mut() {
        obj.set_own(
            PropertyKey::from_str("description"),
            PropertyDescriptor::Accessor { get: Some(description_getter), set: None, enumerable: false, configurable: true },
        );
    }

    let ctor = ev.make_host_function("Symbol", 0, Rc::new(|ev, _this, args| {
        let description = match args.first() {
            Some(v) if !v.is_undefined() => Some(crate::ops::to_js_string(ev, v)?.to_string()),
            _ => None,
        };
        Ok(Value::Symbol(new_symbol(description)))
    }));
    let Value::Object(ctor_id) = &ctor else { unreachable!() };
    if let Some(obj) = ev.heap_mut().get_mut(*ctor_id).as_object_mut() {
        obj.set_own(PropertyKey::from_str("prototype"), PropertyDescriptor::non_enumerable(Value::Object(proto)));
    }
    if let Some(proto_obj) = ev.heap_mut().get_mut(proto).as_object_mut() {
        proto_obj.set_own(PropertyKey::from_str("constructor"), PropertyDescriptor::non_enumerable(ctor.clone()));
    }
    let ctor_id = *ctor_id;

    for (name, sym) in [
        ("iterator", ev.symbols().iterator.clone()),
        ("asyncIterator", ev.symbols().async_iterator.clone()),
        ("toStringTag", ev.symbols().to_string_tag.clone()),
        ("hasInstance", ev.symbols().has_instance.clone()),
    ] {
        super::def_value(ev, ctor_id, name, Value::Symbol(sym));
    }

    super::def_method(ev, ctor_id, "for", 1, Rc::new(|ev, _this, args| {
        let key = crate::ops::to_js_string(ev, args.first().unwrap_or(&Value::Undefined))?;
        let registry_id = registry(ev);
        let len = match ev.heap().get(registry_id) {
            HeapData::Array(arr) => arr.elements.len(),
            _ => 0,
        };
        for i in 0..len {
            let entry = ev.get_property(Value::Object(registry_id), &i.to_string())?;
            let entry_key = ev.get_property(entry.clone(), "key")?;
            if matches!(&entry_key, Value::String(s) if s.as_ref() == key.as_ref()) {
                return ev.get_property(entry, "symbol");
            }
        }
        let sym = new_symbol(Some(key.to_string()));
        let entry = ev.new_plain_object();
        ev.set_property(Value::Object(entry), "key", Value::string(key.to_string()))?;
        ev.set_property(Value::Object(entry), "symbol", Value::Symbol(sym.clone()))?;
        ev.set_property(Value::Object(registry_id), &len.to_string(), Value::Object(entry))?;
        Ok(Value::Symbol(sym))
    }));

    super::def_method(ev, ctor_id, "keyFor", 1, Rc::new(|ev, _this, args| {
        let Some(Value::Symbol(target)) = args.first() else { return ev.throw_type_error("Symbol.keyFor requires a symbol") };
        let target = target.clone();
        let registry_id = registry(ev);
        let len = match ev.heap().get(registry_id) {
            HeapData::Array(arr) => arr.elements.len(),
            _ => 0,
        };
        for i in 0..len {
            let entry = ev.get_property(Value::Object(registry_id), &i.to_string())?;
            let entry_sym = ev.get_property(entry.clone(), "symbol")?;
            if matches!(&entry_sym, Value::Symbol(s) if Rc::ptr_eq(s, &target)) {
                return ev.get_property(entry, "key");
            }
        }
        Ok(Value::Undefined)
    }));

    let global = ev.global_object();
    let _ = ev.set_property(Value::Object(global), "Symbol", ctor);
}

#[cfg(test)]
mod tests {
    use crate::engine::Engine;
    use crate::value::Value;

    #[test]
    fn symbols_are_unique_even_with_same_description() {
        let mut engine = Engine::new();
        let result = engine.evaluate("Symbol('a') === Symbol('a')").unwrap();
        assert!(matches!(result, Value::Bool(false)));
    }

    #[test]
    fn symbol_for_interns_by_key() {
        let mut engine = Engine::new();
        let result = engine.evaluate("Symbol.for('x') === Symbol.for('x')").unwrap();
        assert!(matches!(result, Value::Bool(true)));
    }

    #[test]
    fn key_for_round_trips() {
        let mut engine = Engine::new();
        let result = engine.evaluate("Symbol.keyFor(Symbol.for('y'))").unwrap();
        assert!(matches!(result, Value::String(s) if &*s == "y"));
    }
}
