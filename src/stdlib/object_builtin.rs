//! `Object` constructor and prototype (`§4.7`, `§4.6` "Descriptor-aware
//! operations").

use std::rc::Rc;

use crate::heap::HeapData;
use crate::object::{PropertyDescriptor, PropertyKey};
use crate::value::Value;

use crate::evaluator::Evaluator;

fn own_enumerable_string_entries(ev: &Evaluator, id: crate::heap::HeapId) -> Vec<(String, Value)> {
    let mut out = Vec::new();
    if let HeapData::Array(arr) = ev.heap().get(id) {
        for (i, slot) in arr.elements.iter().enumerate() {
            if let Some(v) = slot {
                out.push((i.to_string(), v.clone()));
            }
        }
    }
    if let Some(obj) = ev.heap().get(id).as_object() {
        for key in obj.own_keys_ordered() {
            let PropertyKey::String(name) = key else { continue };
            if let Some(desc) = obj.get_own(&PropertyKey::String(name.clone())) {
                if desc.enumerable() {
                    if let PropertyDescriptor::Data { value, .. } = desc {
                        out.push((name.to_string(), value.clone()));
                    }
                }
            }
        }
    }
    out
}

pub(crate) fn install(ev: &mut Evaluator) {
    let proto = ev.realm().object_proto;

    super::def_method(ev, proto, "hasOwnProperty", 1, Rc::new(|ev, this, args| {
        let key = crate::ops::to_js_string(ev, args.first().unwrap_or(&Value::Undefined))?;
        let Value::Object(id) = this else { return Ok(Value::Bool(false)) };
        if let HeapData::Array(arr) = ev.heap().get(id) {
            if key.as_ref() == "length" {
                return Ok(Value::Bool(true));
            }
            if let Ok(idx) = key.parse::<usize>() {
                return Ok(Value::Bool(arr.elements.get(idx).is_some_and(Option::is_some)));
            }
        }
        let has = ev.heap().get(id).as_object().is_some_and(|o| o.has_own(&PropertyKey::from_str(&key)));
        Ok(Value::Bool(has))
    }));

    super::def_method(ev, proto, "isPrototypeOf", 1, Rc::new(|ev, this, args| {
        let Some(Value::Object(candidate)) = args.first().cloned() else { return Ok(Value::Bool(false)) };
        let Value::Object(target) = this else { return Ok(Value::Bool(false)) };
        let mut current = ev.heap().get(candidate).as_object().and_then(|o| o.prototype);
        while let Some(id) = current {
            if id == target {
                return Ok(Value::Bool(true));
            }
            current = ev.heap().get(id).as_object().and_then(|o| o.prototype);
        }
        Ok(Value::Bool(false))
    }));

    super::def_method(ev, proto, "toString", 0, Rc::new(|ev, this, _args| {
        let tag = match &this {
            Value::Object(id) => ev.heap().class_name(*id),
            _ => "Object",
        };
        Ok(Value::string(format!("[object {tag}]")))
    }));

    super::def_method(ev, proto, "valueOf", 0, Rc::new(|_ev, this, _args| Ok(this)));

    let object_ctor = ev.make_host_function("Object", 1, Rc::new(|ev, _this, args| match args.first() {
        Some(Value::Object(id)) => Ok(Value::Object(*id)),
        Some(Value::Undefined) | Some(Value::Null) | None => Ok(Value::Object(ev.new_plain_object())),
        Some(v) => Ok(v.clone()),
    }));
    let Value::Object(ctor_id) = object_ctor else { unreachable!() };
    link_ctor_proto(ev, ctor_id, proto);

    super::def_method(ev, ctor_id, "keys", 1, Rc::new(|ev, _this, args| {
        let Some(Value::Object(id)) = args.first().copied() else { return Ok(Value::Object(ev.new_array(Vec::new()))) };
        let entries = own_enumerable_string_entries(ev, id);
        let arr = entries.into_iter().map(|(k, _)| Some(Value::string(k))).collect();
        Ok(Value::Object(ev.new_array(arr)))
    }));

    super::def_method(ev, ctor_id, "values", 1, Rc::new(|ev, _this, args| {
        let Some(Value::Object(id)) = args.first().copied() else { return Ok(Value::Object(ev.new_array(Vec::new()))) };
        let entries = own_enumerable_string_entries(ev, id);
        let arr = entries.into_iter().map(|(_, v)| Some(v)).collect();
        Ok(Value::Object(ev.new_array(arr)))
    }));

    super::def_method(ev, ctor_id, "entries", 1, Rc::new(|ev, _this, args| {
        let Some(Value::Object(id)) = args.first().copied() else { return Ok(Value::Object(ev.new_array(Vec::new()))) };
        let entries = own_enumerable_string_entries(ev, id);
        let arr = entries
            .into_iter()
            .map(|(k, v)| Some(Value::Object(ev.new_array(vec![Some(Value::string(k)), Some(v)]))))
            .collect();
        Ok(Value::Object(ev.new_array(arr)))
    }));

    super::def_method(ev, ctor_id, "assign", 2, Rc::new(|ev, _this, args| {
        let Some(Value::Object(target)) = args.first().copied() else {
            return ev.throw_type_error("Object.assign target must be an object");
        };
        for source in &args[1.min(args.len())..] {
            if !source.is_nullish() {
                ev.copy_own_enumerable(source.clone(), target)?;
            }
        }
        Ok(Value::Object(target))
    }));

    super::def_method(ev, ctor_id, "freeze", 1, Rc::new(|ev, _this, args| {
        if let Some(Value::Object(id)) = args.first().copied() {
            if let Some(obj) = ev.heap_mut().get_mut(id).as_object_mut() {
                obj.extensible = false;
                let keys: Vec<_> = obj.properties.keys().cloned().collect();
                for key in keys {
                    if let Some(desc) = obj.properties.get_mut(&key) {
                        if let PropertyDescriptor::Data { writable, configurable, .. } = desc {
                            *writable = false;
                            *configurable = false;
                        } else if let PropertyDescriptor::Accessor { configurable, .. } = desc {
                            *configurable = false;
                        }
                    }
                }
            }
            return Ok(Value::Object(id));
        }
        Ok(args.first().cloned().unwrap_or(Value::Undefined))
    }));

    super::def_method(ev, ctor_id, "seal", 1, Rc::new(|ev, _this, args| {
        if let Some(Value::Object(id)) = args.first().copied() {
            if let Some(obj) = ev.heap_mut().get_mut(id).as_object_mut() {
                obj.extensible = false;
                let keys: Vec<_> = obj.properties.keys().cloned().collect();
                for key in keys {
                    if let Some(desc) = obj.properties.get_mut(&key) {
                        match desc {
                            PropertyDescriptor::Data { configurable, .. } | PropertyDescriptor::Accessor { configurable, .. } => {
                                *configurable = false;
                            }
                        }
                    }
                }
            }
            return Ok(Value::Object(id));
        }
        Ok(args.first().cloned().unwrap_or(Value::Undefined))
    }));

    super::def_method(ev, ctor_id, "isFrozen", 1, Rc::new(|ev, _this, args| {
        let Some(Value::Object(id)) = args.first().copied() else { return Ok(Value::Bool(true)) };
        let Some(obj) = ev.heap().get(id).as_object() else { return Ok(Value::Bool(true)) };
        let frozen = !obj.extensible
            && obj.properties.values().all(|d| match d {
                PropertyDescriptor::Data { writable, configurable, .. } => !writable && !configurable,
                PropertyDescriptor::Accessor { configurable, .. } => !configurable,
            });
        Ok(Value::Bool(frozen))
    }));

    super::def_method(ev, ctor_id, "isSealed", 1, Rc::new(|ev, _this, args| {
        let Some(Value::Object(id)) = args.first().copied() else { return Ok(Value::Bool(true)) };
        let Some(obj) = ev.heap().get(id).as_object() else { return Ok(Value::Bool(true)) };
        let sealed = !obj.extensible && obj.properties.values().all(|d| !d.configurable());
        Ok(Value::Bool(sealed))
    }));

    super::def_method(ev, ctor_id, "create", 2, Rc::new(|ev, _this, args| {
        let proto = match args.first() {
            Some(Value::Object(id)) => Some(*id),
            Some(Value::Null) | None => None,
            Some(_) => return ev.throw_type_error("Object prototype may only be an Object or null"),
        };
        let id = ev.new_object_with_proto(proto);
        if let Some(Value::Object(props)) = args.get(1) {
            let entries = own_enumerable_string_entries(ev, *props);
            for (key, desc_value) in entries {
                apply_descriptor(ev, id, &key, desc_value)?;
            }
        }
        Ok(Value::Object(id))
    }));

    super::def_method(ev, ctor_id, "fromEntries", 1, Rc::new(|ev, _this, args| {
        let id = ev.new_plain_object();
        if let Some(iterable) = args.first().cloned() {
            let pairs = ev.iterate_to_vec(iterable)?;
            for pair in pairs {
                let key = ev.get_property(pair.clone(), "0")?;
                let value = ev.get_property(pair, "1")?;
                let key = crate::ops::to_js_string(ev, &key)?;
                ev.set_property(Value::Object(id), &key, value)?;
            }
        }
        Ok(Value::Object(id))
    }));

    super::def_method(ev, ctor_id, "hasOwn", 2, Rc::new(|ev, _this, args| {
        let Some(Value::Object(id)) = args.first().copied() else { return Ok(Value::Bool(false)) };
        let key = crate::ops::to_js_string(ev, args.get(1).unwrap_or(&Value::Undefined))?;
        if let HeapData::Array(arr) = ev.heap().get(id) {
            if key.as_ref() == "length" {
                return Ok(Value::Bool(true));
            }
            if let Ok(idx) = key.parse::<usize>() {
                return Ok(Value::Bool(arr.elements.get(idx).is_some_and(Option::is_some)));
            }
        }
        Ok(Value::Bool(ev.heap().get(id).as_object().is_some_and(|o| o.has_own(&PropertyKey::from_str(&key)))))
    }));

    super::def_method(ev, ctor_id, "getPrototypeOf", 1, Rc::new(|ev, _this, args| {
        let Some(Value::Object(id)) = args.first().copied() else { return Ok(Value::Null) };
        Ok(ev.heap().get(id).as_object().and_then(|o| o.prototype).map_or(Value::Null, Value::Object))
    }));

    super::def_method(ev, ctor_id, "setPrototypeOf", 2, Rc::new(|ev, _this, args| {
        let Some(Value::Object(id)) = args.first().copied() else {
            return Ok(args.first().cloned().unwrap_or(Value::Undefined));
        };
        let proto = match args.get(1) {
            Some(Value::Object(p)) => Some(*p),
            _ => None,
        };
        if let Some(obj) = ev.heap_mut().get_mut(id).as_object_mut() {
            obj.prototype = proto;
        }
        Ok(Value::Object(id))
    }));

    super::def_method(ev, ctor_id, "defineProperty", 3, Rc::new(|ev, _this, args| {
        let Some(Value::Object(id)) = args.first().copied() else {
            return ev.throw_type_error("Object.defineProperty called on non-object");
        };
        let key = crate::ops::to_js_string(ev, args.get(1).unwrap_or(&Value::Undefined))?;
        let desc_value = args.get(2).cloned().unwrap_or(Value::Undefined);
        apply_descriptor(ev, id, &key, desc_value)?;
        Ok(Value::Object(id))
    }));

    super::def_method(ev, ctor_id, "getOwnPropertyDescriptor", 2, Rc::new(|ev, _this, args| {
        let Some(Value::Object(id)) = args.first().copied() else { return Ok(Value::Undefined) };
        let key = crate::ops::to_js_string(ev, args.get(1).unwrap_or(&Value::Undefined))?;
        let Some(desc) = ev.heap().get(id).as_object().and_then(|o| o.get_own(&PropertyKey::from_str(&key)).cloned()) else {
            return Ok(Value::Undefined);
        };
        let out = ev.new_plain_object();
        match desc {
            PropertyDescriptor::Data { value, writable, enumerable, configurable } => {
                ev.set_property(Value::Object(out), "value", value)?;
                ev.set_property(Value::Object(out), "writable", Value::Bool(writable))?;
                ev.set_property(Value::Object(out), "enumerable", Value::Bool(enumerable))?;
                ev.set_property(Value::Object(out), "configurable", Value::Bool(configurable))?;
            }
            PropertyDescriptor::Accessor { get, set, enumerable, configurable } => {
                ev.set_property(Value::Object(out), "get", get.unwrap_or(Value::Undefined))?;
                ev.set_property(Value::Object(out), "set", set.unwrap_or(Value::Undefined))?;
                ev.set_property(Value::Object(out), "enumerable", Value::Bool(enumerable))?;
                ev.set_property(Value::Object(out), "configurable", Value::Bool(configurable))?;
            }
        }
        Ok(Value::Object(out))
    }));

    let global = ev.global_object();
    let _ = ev.set_property(Value::Object(global), "Object", Value::Object(ctor_id));
}

fn link_ctor_proto(ev: &mut Evaluator, ctor_id: crate::heap::HeapId, proto: crate::heap::HeapId) {
    if let Some(obj) = ev.heap_mut().get_mut(ctor_id).as_object_mut() {
        obj.set_own(PropertyKey::from_str("prototype"), PropertyDescriptor::non_enumerable(Value::Object(proto)));
    }
    if let Some(proto_obj) = ev.heap_mut().get_mut(proto).as_object_mut() {
        proto_obj.set_own(PropertyKey::from_str("constructor"), PropertyDescriptor::non_enumerable(Value::Object(ctor_id)));
    }
}

/// `Object.defineProperty`/`Object.create`'s per-key application: reads
/// `value`/`get`/`set`/`writable`/`enumerable`/`configurable` off the
/// descriptor object, defaulting every flag to `false` per spec (unlike a
/// plain assignment, which defaults to all-`true`).
fn apply_descriptor(ev: &mut Evaluator, target: crate::heap::HeapId, key: &str, desc_value: Value) -> crate::exception::RunResult<()> {
    let get = ev.get_property(desc_value.clone(), "get")?;
    let set = ev.get_property(desc_value.clone(), "set")?;
    let enumerable = ev.get_property(desc_value.clone(), "enumerable")?.to_boolean();
    let configurable = ev.get_property(desc_value.clone(), "configurable")?.to_boolean();
    let desc = if !get.is_undefined() || !set.is_undefined() {
        PropertyDescriptor::Accessor {
            get: (!get.is_undefined()).then_some(get),
            set: (!set.is_undefined()).then_some(set),
            enumerable,
            configurable,
        }
    } else {
        let value = ev.get_property(desc_value.clone(), "value")?;
        let writable = ev.get_property(desc_value, "writable")?.to_boolean();
        PropertyDescriptor::Data { value, writable, enumerable, configurable }
    };
    if let Some(obj) = ev.heap_mut().get_mut(target).as_object_mut() {
        obj.set_own(PropertyKey::from_str(key), desc);
    }
    Ok(())
}
