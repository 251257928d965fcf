//! `Map`/`Set`/`WeakMap`/`WeakSet` (`§4.7`). Entries are a flat
//! `Vec<(Value, Value)>`/`Vec<Value>` scanned with `SameValueZero`
//! (`§4.6`) rather than hashed — the engine has no `Value` `Hash`/`Eq`
//! impl (NaN/`-0`/object identity make that non-trivial), and these
//! collections are never asked to scale past what linear scan handles.
//! `WeakMap`/`WeakSet` share the same storage and never actually collect
//! garbage (`§4.7` Non-goals): the arena keeps every object alive for the
//! `Engine`'s lifetime regardless, so "weak" here means only "no iteration
//! API", matching real semantics closely enough for this engine's scope.

use std::rc::Rc;

use crate::exception::RunResult;
use crate::heap::HeapData;
use crate::object::{PropertyDescriptor, PropertyKey};
use crate::value::Value;

use crate::evaluator::Evaluator;

fn arg(args: &[Value], i: usize) -> Value {
    args.get(i).cloned().unwrap_or(Value::Undefined)
}

fn install_ctor(ev: &mut Evaluator, name: &str, proto: crate::heap::HeapId, make: impl Fn() -> HeapData + 'static) -> Value {
    let make = Rc::new(make);
    let ctor = ev.make_host_function(name, 0, Rc::new(move |ev, _this, args| {
        let id = ev.heap_mut().alloc(make());
        let iterable = arg(args, 0);
        if !iterable.is_nullish() {
            let items = ev.iterate_to_vec(iterable)?;
            let add_name = if matches!(ev.heap().get(id), HeapData::Set(_) | HeapData::WeakSet(_)) { "add" } else { "set" };
            let add_fn = ev.get_property(Value::Object(id), add_name)?;
            for item in items {
                if add_name == "set" {
                    let k = ev.get_property(item.clone(), "0")?;
                    let v = ev.get_property(item, "1")?;
                    ev.call_function(add_fn.clone(), Value::Object(id), &[k, v])?;
                } else {
                    ev.call_function(add_fn.clone(), Value::Object(id), &[item])?;
                }
            }
        }
        Ok(Value::Object(id))
    }));
    let Value::Object(ctor_id) = &ctor else { unreachable!() };
    if let Some(obj) = ev.heap_mut().get_mut(*ctor_id).as_object_mut() {
        obj.set_own(PropertyKey::from_str("prototype"), PropertyDescriptor::non_enumerable(Value::Object(proto)));
    }
    if let Some(proto_obj) = ev.heap_mut().get_mut(proto).as_object_mut() {
        proto_obj.set_own(PropertyKey::from_str("constructor"), PropertyDescriptor::non_enumerable(ctor.clone()));
    }
    ctor
}

pub(crate) fn install(ev: &mut Evaluator) {
    install_map(ev);
    install_set(ev);
    install_weak_map(ev);
    install_weak_set(ev);
}

fn install_map(ev: &mut Evaluator) {
    let proto = ev.realm().map_proto;

    super::def_method(ev, proto, "get", 1, Rc::new(|ev, this, args| {
        let Value::Object(id) = this else { return Ok(Value::Undefined) };
        let key = arg(args, 0);
        match ev.heap().get(id) {
            HeapData::Map(m) => Ok(m.entries.iter().find(|(k, _)| k.same_value_zero(&key)).map_or(Value::Undefined, |(_, v)| v.clone())),
            _ => Ok(Value::Undefined),
        }
    }));

    super::def_method(ev, proto, "set", 2, Rc::new(|ev, this, args| {
        let Value::Object(id) = this else { return ev.throw_type_error("Map.prototype.set called on non-Map") };
        let key = arg(args, 0);
        let value = arg(args, 1);
        if let HeapData::Map(m) = ev.heap_mut().get_mut(id) {
            if let Some(entry) = m.entries.iter_mut().find(|(k, _)| k.same_value_zero(&key)) {
                entry.1 = value;
            } else {
                m.entries.push((key, value));
            }
        }
        Ok(this)
    }));

    super::def_method(ev, proto, "has", 1, Rc::new(|ev, this, args| {
        let Value::Object(id) = this else { return Ok(Value::Bool(false)) };
        let key = arg(args, 0);
        match ev.heap().get(id) {
            HeapData::Map(m) => Ok(Value::Bool(m.entries.iter().any(|(k, _)| k.same_value_zero(&key)))),
            _ => Ok(Value::Bool(false)),
        }
    }));

    super::def_method(ev, proto, "delete", 1, Rc::new(|ev, this, args| {
        let Value::Object(id) = this else { return Ok(Value::Bool(false)) };
        let key = arg(args, 0);
        if let HeapData::Map(m) = ev.heap_mut().get_mut(id) {
            let before = m.entries.len();
            m.entries.retain(|(k, _)| !k.same_value_zero(&key));
            return Ok(Value::Bool(m.entries.len() != before));
        }
        Ok(Value::Bool(false))
    }));

    super::def_method(ev, proto, "clear", 0, Rc::new(|ev, this, _args| {
        let Value::Object(id) = this else { return Ok(Value::Undefined) };
        if let HeapData::Map(m) = ev.heap_mut().get_mut(id) {
            m.entries.clear();
        }
        Ok(Value::Undefined)
    }));

    super::def_method(ev, proto, "forEach", 1, Rc::new(|ev, this, args| {
        let Value::Object(id) = &this else { return Ok(Value::Undefined) };
        let callback = arg(args, 0);
        let this_arg = arg(args, 1);
        let entries = match ev.heap().get(*id) {
            HeapData::Map(m) => m.entries.clone(),
            _ => return Ok(Value::Undefined),
        };
        for (k, v) in entries {
            ev.call_function(callback.clone(), this_arg.clone(), &[v, k, this.clone()])?;
        }
        Ok(Value::Undefined)
    }));

    super::def_method(ev, proto, "entries", 0, Rc::new(|ev, this, _args| {
        let Value::Object(id) = this else { return Ok(Value::Undefined) };
        let entries = match ev.heap().get(id) {
            HeapData::Map(m) => m.entries.clone(),
            _ => Vec::new(),
        };
        let items = entries.into_iter().map(|(k, v)| Value::Object(ev.new_array(vec![Some(k), Some(v)]))).collect();
        Ok(super::array_builtin::make_array_iterator(ev, items))
    }));

    super::def_method(ev, proto, "keys", 0, Rc::new(|ev, this, _args| {
        let Value::Object(id) = this else { return Ok(Value::Undefined) };
        let items = match ev.heap().get(id) {
            HeapData::Map(m) => m.entries.iter().map(|(k, _)| k.clone()).collect(),
            _ => Vec::new(),
        };
        Ok(super::array_builtin::make_array_iterator(ev, items))
    }));

    super::def_method(ev, proto, "values", 0, Rc::new(|ev, this, _args| {
        let Value::Object(id) = this else { return Ok(Value::Undefined) };
        let items = match ev.heap().get(id) {
            HeapData::Map(m) => m.entries.iter().map(|(_, v)| v.clone()).collect(),
            _ => Vec::new(),
        };
        Ok(super::array_builtin::make_array_iterator(ev, items))
    }));

    let size_getter = ev.make_host_function("size", 0, Rc::new(|ev, this, _args| {
        let Value::Object(id) = this else { return Ok(Value::Number(0.0)) };
        match ev.heap().get(id) {
            HeapData::Map(m) => Ok(Value::Number(m.entries.len() as f64)),
            _ => Ok(Value::Number(0.0)),
        }
    }));
    if let Some(obj) = ev.heap_mut().get_mut(proto).as_object_mut() {
        obj.set_own(PropertyKey::from_str("size"), PropertyDescriptor::Accessor { get: Some(size_getter), set: None, enumerable: false, configurable: true });
    }

    let iterator_sym = ev.symbols().iterator.clone();
    let entries_fn = ev.get_property(Value::Object(proto), "entries").expect("entries just installed");
    if let Some(obj) = ev.heap_mut().get_mut(proto).as_object_mut() {
        obj.set_own(PropertyKey::symbol(iterator_sym), PropertyDescriptor::builtin_method(entries_fn));
    }

    let ctor = install_ctor(ev, "Map", proto, move || HeapData::Map(crate::heap::MapData { object: crate::object::JsObject::new(None), entries: Vec::new() }));
    let global = ev.global_object();
    let _ = ev.set_property(Value::Object(global), "Map", ctor);
}

fn install_set(ev: &mut Evaluator) {
    let proto = ev.realm().set_proto;

    super::def_method(ev, proto, "add", 1, Rc::new(|ev, this, args| {
        let Value::Object(id) = this else { return ev.throw_type_error("Set.prototype.add called on non-Set") };
        let value = arg(args, 0);
        if let HeapData::Set(s) = ev.heap_mut().get_mut(id) {
            if !s.entries.iter().any(|v| v.same_value_zero(&value)) {
                s.entries.push(value);
            }
        }
        Ok(this)
    }));

    super::def_method(ev, proto, "has", 1, Rc::new(|ev, this, args| {
        let Value::Object(id) = this else { return Ok(Value::Bool(false)) };
        let value = arg(args, 0);
        match ev.heap().get(id) {
            HeapData::Set(s) => Ok(Value::Bool(s.entries.iter().any(|v| v.same_value_zero(&value)))),
            _ => Ok(Value::Bool(false)),
        }
    }));

    super::def_method(ev, proto, "delete", 1, Rc::new(|ev, this, args| {
        let Value::Object(id) = this else { return Ok(Value::Bool(false)) };
        let value = arg(args, 0);
        if let HeapData::Set(s) = ev.heap_mut().get_mut(id) {
            let before = s.entries.len();
            s.entries.retain(|v| !v.same_value_zero(&value));
            return Ok(Value::Bool(s.entries.len() != before));
        }
        Ok(Value::Bool(false))
    }));

    super::def_method(ev, proto, "clear", 0, Rc::new(|ev, this, _args| {
        let Value::Object(id) = this else { return Ok(Value::Undefined) };
        if let HeapData::Set(s) = ev.heap_mut().get_mut(id) {
            s.entries.clear();
        }
        Ok(Value::Undefined)
    }));

    super::def_method(ev, proto, "forEach", 1, Rc::new(|ev, this, args| {
        let Value::Object(id) = &this else { return Ok(Value::Undefined) };
        let callback = arg(args, 0);
        let this_arg = arg(args, 1);
        let entries = match ev.heap().get(*id) {
            HeapData::Set(s) => s.entries.clone(),
            _ => return Ok(Value::Undefined),
        };
        for v in entries {
            ev.call_function(callback.clone(), this_arg.clone(), &[v.clone(), v, this.clone()])?;
        }
        Ok(Value::Undefined)
    }));

    super::def_method(ev, proto, "values", 0, Rc::new(|ev, this, _args| {
        let Value::Object(id) = this else { return Ok(Value::Undefined) };
        let items = match ev.heap().get(id) {
            HeapData::Set(s) => s.entries.clone(),
            _ => Vec::new(),
        };
        Ok(super::array_builtin::make_array_iterator(ev, items))
    }));

    super::def_method(ev, proto, "entries", 0, Rc::new(|ev, this, _args| {
        let Value::Object(id) = this else { return Ok(Value::Undefined) };
        let entries = match ev.heap().get(id) {
            HeapData::Set(s) => s.entries.clone(),
            _ => Vec::new(),
        };
        let items = entries.into_iter().map(|v| Value::Object(ev.new_array(vec![Some(v.clone()), Some(v)]))).collect();
        Ok(super::array_builtin::make_array_iterator(ev, items))
    }));

    let size_getter = ev.make_host_function("size", 0, Rc::new(|ev, this, _args| {
        let Value::Object(id) = this else { return Ok(Value::Number(0.0)) };
        match ev.heap().get(id) {
            HeapData::Set(s) => Ok(Value::Number(s.entries.len() as f64)),
            _ => Ok(Value::Number(0.0)),
        }
    }));
    if let Some(obj) = ev.heap_mut().get_mut(proto).as_object_mut() {
        obj.set_own(PropertyKey::from_str("size"), PropertyDescriptor::Accessor { get: Some(size_getter), set: None, enumerable: false, configurable: true });
    }

    let iterator_sym = ev.symbols().iterator.clone();
    let values_fn = ev.get_property(Value::Object(proto), "values").expect("values just installed");
    if let Some(obj) = ev.heap_mut().get_mut(proto).as_object_mut() {
        obj.set_own(PropertyKey::symbol(iterator_sym), PropertyDescriptor::builtin_method(values_fn));
    }

    let ctor = install_ctor(ev, "Set", proto, move || HeapData::Set(crate::heap::SetData { object: crate::object::JsObject::new(None), entries: Vec::new() }));
    let global = ev.global_object();
    let _ = ev.set_property(Value::Object(global), "Set", ctor);
}

fn install_weak_map(ev: &mut Evaluator) {
    let proto = ev.realm().weak_map_proto;

    super::def_method(ev, proto, "get", 1, Rc::new(|ev, this, args| {
        let Value::Object(id) = this else { return Ok(Value::Undefined) };
        let key = arg(args, 0);
        match ev.heap().get(id) {
            HeapData::WeakMap(m) => Ok(m.entries.iter().find(|(k, _)| k.same_value_zero(&key)).map_or(Value::Undefined, |(_, v)| v.clone())),
            _ => Ok(Value::Undefined),
        }
    }));

    super::def_method(ev, proto, "set", 2, Rc::new(|ev, this, args| {
        let Value::Object(id) = this else { return ev.throw_type_error("WeakMap.prototype.set called on non-WeakMap") };
        let key = arg(args, 0);
        if !matches!(key, Value::Object(_)) {
            return ev.throw_type_error("Invalid value used as weak map key");
        }
        let value = arg(args, 1);
        if let HeapData::WeakMap(m) = ev.heap_mut().get_mut(id) {
            if let Some(entry) = m.entries.iter_mut().find(|(k, _)| k.same_value_zero(&key)) {
                entry.1 = value;
            } else {
                m.entries.push((key, value));
            }
        }
        Ok(this)
    }));

    super::def_method(ev, proto, "has", 1, Rc::new(|ev, this, args| {
        let Value::Object(id) = this else { return Ok(Value::Bool(false)) };
        let key = arg(args, 0);
        match ev.heap().get(id) {
            HeapData::WeakMap(m) => Ok(Value::Bool(m.entries.iter().any(|(k, _)| k.same_value_zero(&key)))),
            _ => Ok(Value::Bool(false)),
        }
    }));

    super::def_method(ev, proto, "delete", 1, Rc::new(|ev, this, args| {
        let Value::Object(id) = this else { return Ok(Value::Bool(false)) };
        let key = arg(args, 0);
        if let HeapData::WeakMap(m) = ev.heap_mut().get_mut(id) {
            let before = m.entries.len();
            m.entries.retain(|(k, _)| !k.same_value_zero(&key));
            return Ok(Value::Bool(m.entries.len() != before));
        }
        Ok(Value::Bool(false))
    }));

    let ctor = install_ctor(ev, "WeakMap", proto, move || HeapData::WeakMap(crate::heap::MapData { object: crate::object::JsObject::new(None), entries: Vec::new() }));
    let global = ev.global_object();
    let _ = ev.set_property(Value::Object(global), "WeakMap", ctor);
}

fn install_weak_set(ev: &mut Evaluator) {
    let proto = ev.realm().weak_set_proto;

    super::def_method(ev, proto, "add", 1, Rc::new(|ev, this, args| {
        let Value::Object(id) = this else { return ev.throw_type_error("WeakSet.prototype.add called on non-WeakSet") };
        let value = arg(args, 0);
        if !matches!(value, Value::Object(_)) {
            return ev.throw_type_error("Invalid value used in weak set");
        }
        if let HeapData::WeakSet(s) = ev.heap_mut().get_mut(id) {
            if !s.entries.iter().any(|v| v.same_value_zero(&value)) {
                s.entries.push(value);
            }
        }
        Ok(this)
    }));

    super::def_method(ev, proto, "has", 1, Rc::new(|ev, this, args| {
        let Value::Object(id) = this else { return Ok(Value::Bool(false)) };
        let value = arg(args, 0);
        match ev.heap().get(id) {
            HeapData::WeakSet(s) => Ok(Value::Bool(s.entries.iter().any(|v| v.same_value_zero(&value)))),
            _ => Ok(Value::Bool(false)),
        }
    }));

    super::def_method(ev, proto, "delete", 1, Rc::new(|ev, this, args| {
        let Value::Object(id) = this else { return Ok(Value::Bool(false)) };
        let value = arg(args, 0);
        if let HeapData::WeakSet(s) = ev.heap_mut().get_mut(id) {
            let before = s.entries.len();
            s.entries.retain(|v| !v.same_value_zero(&value));
            return Ok(Value::Bool(s.entries.len() != before));
        }
        Ok(Value::Bool(false))
    }));

    let ctor = install_ctor(ev, "WeakSet", proto, move || HeapData::WeakSet(crate::heap::SetData { object: crate::object::JsObject::new(None), entries: Vec::new() }));
    let global = ev.global_object();
    let _ = ev.set_property(Value::Object(global), "WeakSet", ctor);
}
