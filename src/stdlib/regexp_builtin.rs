//! `RegExp` constructor and prototype (`§4.7`), built on [`super::regexp`]'s
//! compiled-pattern layer.

use std::rc::Rc;

use crate::exception::{ExcType, RunResult};
use crate::heap::{HeapData, RegExpData};
use crate::object::{JsObject, PropertyDescriptor, PropertyKey};
use crate::value::Value;

use super::regexp::CompiledRegex;
use crate::evaluator::Evaluator;

pub(crate) fn construct_regexp(ev: &mut Evaluator, pattern: &str, flags: &str) -> RunResult<Value> {
    let compiled = match CompiledRegex::compile(pattern, flags) {
        Ok(c) => c,
        Err(e) => return ev.throw_error(ExcType::SyntaxError, e.message()),
    };
    let proto = ev.realm().regexp_proto;
    let data = RegExpData {
        object: JsObject::with_class(Some(proto), "RegExp"),
        source: Rc::from(pattern),
        flags: Rc::from(flags),
        global: flags.contains('g'),
        sticky: flags.contains('y'),
        last_index: 0,
        compiled: Rc::new(compiled),
    };
    let id = ev.heap_mut().alloc(HeapData::RegExp(data));
    ev.set_property(Value::Object(id), "lastIndex", Value::Number(0.0))?;
    ev.set_property(Value::Object(id), "source", Value::string(pattern))?;
    ev.set_property(Value::Object(id), "flags", Value::string(flags))?;
    ev.set_property(Value::Object(id), "global", Value::Bool(flags.contains('g')))?;
    Ok(Value::Object(id))
}

pub(crate) fn install(ev: &mut Evaluator) {
    let proto = ev.realm().regexp_proto;

    super::def_method(ev, proto, "test", 1, Rc::new(|ev, this, args| {
        let Value::Object(id) = this else { return ev.throw_type_error("RegExp.prototype.test called on non-RegExp") };
        let text = crate::ops::to_js_string(ev, args.first().unwrap_or(&Value::Undefined))?;
        let matched = match ev.heap().get(id) {
            HeapData::RegExp(r) => r.compiled.is_match(&text),
            _ => return ev.throw_type_error("RegExp.prototype.test called on non-RegExp"),
        };
        Ok(Value::Bool(matched))
    }));

    super::def_method(ev, proto, "exec", 1, Rc::new(|ev, this, args| {
        let Value::Object(id) = this else { return ev.throw_type_error("RegExp.prototype.exec called on non-RegExp") };
        let text = crate::ops::to_js_string(ev, args.first().unwrap_or(&Value::Undefined))?;
        let (global_or_sticky, last_index) = match ev.heap().get(id) {
            HeapData::RegExp(r) => (r.global || r.sticky, r.last_index as usize),
            _ => return ev.throw_type_error("RegExp.prototype.exec called on non-RegExp"),
        };
        let from = if global_or_sticky { last_index } else { 0 };
        let found = match ev.heap().get(id) {
            HeapData::RegExp(r) => r.compiled.find_from(&text, from),
            _ => None,
        };
        match found {
            Some(m) => {
                if global_or_sticky {
                    if let HeapData::RegExp(r) = ev.heap_mut().get_mut(id) {
                        r.last_index = m.end as u32;
                    }
                    ev.set_property(Value::Object(id), "lastIndex", Value::Number(m.end as f64))?;
                }
                let elements: Vec<Option<Value>> =
                    m.groups.iter().map(|g| Some(g.map_or(Value::Undefined, |(s, e)| Value::string(text[s..e].to_string())))).collect();
                let arr = ev.new_array(elements);
                ev.set_property(Value::Object(arr), "index", Value::Number(m.start as f64))?;
                ev.set_property(Value::Object(arr), "input", Value::string(text.to_string()))?;
                Ok(Value::Object(arr))
            }
            None => {
                if global_or_sticky {
                    if let HeapData::RegExp(r) = ev.heap_mut().get_mut(id) {
                        r.last_index = 0;
                    }
                    ev.set_property(Value::Object(id), "lastIndex", Value::Number(0.0))?;
                }
                Ok(Value::Null)
            }
        }
    }));

    super::def_method(ev, proto, "toString", 0, Rc::new(|ev, this, _args| {
        let Value::Object(id) = this else { return Ok(Value::string("/(?:)/")) };
        match ev.heap().get(id) {
            HeapData::RegExp(r) => Ok(Value::string(format!("/{}/{}", r.source, r.flags))),
            _ => Ok(Value::string("/(?:)/")),
        }
    }));

    let ctor = ev.make_host_function("RegExp", 2, Rc::new(|ev, _this, args| {
        let pattern = match args.first() {
            Some(Value::Object(id)) if matches!(ev.heap().get(*id), HeapData::RegExp(_)) => {
                let HeapData::RegExp(r) = ev.heap().get(*id) else { unreachable!() };
                r.source.to_string()
            }
            Some(v) => crate::ops::to_js_string(ev, v)?.to_string(),
            None => String::new(),
        };
        let flags = match args.get(1) {
            Some(v) if !v.is_undefined() => crate::ops::to_js_string(ev, v)?.to_string(),
            _ => String::new(),
        };
        construct_regexp(ev, &pattern, &flags)
    }));
    if let Value::Object(ctor_id) = &ctor {
        if let Some(obj) = ev.heap_mut().get_mut(*ctor_id).as_object_mut() {
            obj.set_own(PropertyKey::from_str("prototype"), PropertyDescriptor::non_enumerable(Value::Object(proto)));
        }
        if let Some(proto_obj) = ev.heap_mut().get_mut(proto).as_object_mut() {
            proto_obj.set_own(PropertyKey::from_str("constructor"), PropertyDescriptor::non_enumerable(ctor.clone()));
        }
    }
    let global = ev.global_object();
    let _ = ev.set_property(Value::Object(global), "RegExp", ctor);
}
