//! Free-standing globals with no constructor/prototype of their own
//! (`§4.7`, `§4.9`): `console`, the timer/microtask scheduling functions,
//! the URI encode/decode family, and the `globalThis` self-reference.
//! `parseInt`/`parseFloat`/`isNaN`/`isFinite` are *not* installed here —
//! `number_builtin` already registers those alongside `Number`'s statics of
//! the same name.

use std::rc::Rc;

use crate::io::ConsoleLevel;
use crate::object::{PropertyDescriptor, PropertyKey};
use crate::ops;
use crate::value::Value;

use crate::evaluator::Evaluator;

fn install_console(ev: &mut Evaluator) {
    let console = ev.new_plain_object();

    fn logger(level: ConsoleLevel) -> crate::function::HostFn {
        Rc::new(move |ev, _this, args| {
            let mut parts = Vec::with_capacity(args.len());
            for a in args {
                parts.push(ops::to_js_string(ev, a)?.to_string());
            }
            ev.console_write(level, &parts.join(" "));
            Ok(Value::Undefined)
        })
    }

    for (name, level) in [
        ("log", ConsoleLevel::Log),
        ("info", ConsoleLevel::Info),
        ("warn", ConsoleLevel::Warn),
        ("error", ConsoleLevel::Error),
        ("debug", ConsoleLevel::Debug),
    ] {
        super::def_method(ev, console, name, 0, logger(level));
    }

    let global = ev.global_object();
    let _ = ev.set_property(Value::Object(global), "console", Value::Object(console));
}

fn install_timers(ev: &mut Evaluator) {
    let global = ev.global_object();

    let set_timeout = ev.make_host_function("setTimeout", 1, Rc::new(|ev, _this, args| {
        let callback = args.first().cloned().unwrap_or(Value::Undefined);
        if !ev.heap().is_callable_value(&callback) {
            return ev.throw_type_error("setTimeout callback is not a function");
        }
        let delay = match args.get(1) {
            Some(v) if !v.is_undefined() => ops::to_number(ev, v)?.max(0.0) as u64,
            _ => 0,
        };
        let active_timers = ev.event_loop.active_timer_count() as u32;
        if let Err(e) = ev.resource().check_timer_count(active_timers) {
            return ev.throw_range_error(e.to_string());
        }
        let extra = args.get(2..).unwrap_or(&[]).to_vec();
        let id = ev.event_loop.set_timer(callback, extra, delay, false);
        Ok(Value::Number(id as f64))
    }));
    let _ = ev.set_property(Value::Object(global), "setTimeout", set_timeout);

    let set_interval = ev.make_host_function("setInterval", 1, Rc::new(|ev, _this, args| {
        let callback = args.first().cloned().unwrap_or(Value::Undefined);
        if !ev.heap().is_callable_value(&callback) {
            return ev.throw_type_error("setInterval callback is not a function");
        }
        let delay = match args.get(1) {
            Some(v) if !v.is_undefined() => ops::to_number(ev, v)?.max(0.0) as u64,
            _ => 0,
        };
        let active_timers = ev.event_loop.active_timer_count() as u32;
        if let Err(e) = ev.resource().check_timer_count(active_timers) {
            return ev.throw_range_error(e.to_string());
        }
        let extra = args.get(2..).unwrap_or(&[]).to_vec();
        let id = ev.event_loop.set_timer(callback, extra, delay, true);
        Ok(Value::Number(id as f64))
    }));
    let _ = ev.set_property(Value::Object(global), "setInterval", set_interval);

    let clear_timeout = ev.make_host_function("clearTimeout", 1, Rc::new(|ev, _this, args| {
        if let Some(v) = args.first() {
            let id = ops::to_number(ev, v)?;
            if id.is_finite() {
                ev.event_loop.clear_timer(id as u64);
            }
        }
        Ok(Value::Undefined)
    }));
    let _ = ev.set_property(Value::Object(global), "clearTimeout", clear_timeout.clone());
    let _ = ev.set_property(Value::Object(global), "clearInterval", clear_timeout);

    let queue_microtask = ev.make_host_function("queueMicrotask", 1, Rc::new(|ev, _this, args| {
        let callback = args.first().cloned().unwrap_or(Value::Undefined);
        if !ev.heap().is_callable_value(&callback) {
            return ev.throw_type_error("queueMicrotask callback is not a function");
        }
        ev.event_loop.queue_microtask(callback, Vec::new());
        Ok(Value::Undefined)
    }));
    let _ = ev.set_property(Value::Object(global), "queueMicrotask", queue_microtask);
}

/// Percent-encodes every byte of `s` not in `safe`, UTF-8 first (`§4.7`
/// `encodeURIComponent`/`encodeURI`).
fn percent_encode(s: &str, safe: impl Fn(u8) -> bool) -> String {
    let mut out = String::with_capacity(s.len());
    for byte in s.bytes() {
        if safe(byte) {
            out.push(byte as char);
        } else {
            out.push('%');
            out.push_str(&format!("{byte:02X}"));
        }
    }
    out
}

/// Decodes `%XX` escapes back to UTF-8, throwing `URIError` on a malformed
/// escape or an invalid resulting byte sequence (`§4.7` `decodeURIComponent`/
/// `decodeURI`).
fn percent_decode(ev: &mut Evaluator, s: &str) -> crate::exception::RunResult<String> {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = bytes.get(i + 1..i + 3).and_then(|h| std::str::from_utf8(h).ok()).and_then(|h| u8::from_str_radix(h, 16).ok());
            match hex {
                Some(b) => {
                    out.push(b);
                    i += 3;
                }
                None => return ev.throw_uri_error("URI malformed"),
            }
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(out).map_err(|_| ()).or_else(|_| ev.throw_uri_error("URI malformed"))
}

fn is_unreserved(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.' | b'!' | b'~' | b'*' | b'\'' | b'(' | b')')
}

fn is_uri_reserved_or_unreserved(b: u8) -> bool {
    is_unreserved(b) || matches!(b, b';' | b'/' | b'?' | b':' | b'@' | b'&' | b'=' | b'+' | b'$' | b',' | b'#')
}

fn install_uri_functions(ev: &mut Evaluator) {
    let global = ev.global_object();

    let encode_component = ev.make_host_function("encodeURIComponent", 1, Rc::new(|ev, _this, args| {
        let s = ops::to_js_string(ev, &args.first().cloned().unwrap_or(Value::Undefined))?;
        Ok(Value::string(percent_encode(&s, is_unreserved)))
    }));
    let _ = ev.set_property(Value::Object(global), "encodeURIComponent", encode_component);

    let encode_uri = ev.make_host_function("encodeURI", 1, Rc::new(|ev, _this, args| {
        let s = ops::to_js_string(ev, &args.first().cloned().unwrap_or(Value::Undefined))?;
        Ok(Value::string(percent_encode(&s, is_uri_reserved_or_unreserved)))
    }));
    let _ = ev.set_property(Value::Object(global), "encodeURI", encode_uri);

    let decode_component = ev.make_host_function("decodeURIComponent", 1, Rc::new(|ev, _this, args| {
        let s = ops::to_js_string(ev, &args.first().cloned().unwrap_or(Value::Undefined))?;
        Ok(Value::string(percent_decode(ev, &s)?))
    }));
    let _ = ev.set_property(Value::Object(global), "decodeURIComponent", decode_component);

    let decode_uri = ev.make_host_function("decodeURI", 1, Rc::new(|ev, _this, args| {
        let s = ops::to_js_string(ev, &args.first().cloned().unwrap_or(Value::Undefined))?;
        Ok(Value::string(percent_decode(ev, &s)?))
    }));
    let _ = ev.set_property(Value::Object(global), "decodeURI", decode_uri);
}

fn install_global_this(ev: &mut Evaluator) {
    let global = ev.global_object();
    if let Some(obj) = ev.heap_mut().get_mut(global).as_object_mut() {
        obj.set_own(PropertyKey::from_str("globalThis"), PropertyDescriptor::non_enumerable(Value::Object(global)));
    }
}

fn install_structured_clone(ev: &mut Evaluator) {
    // `structuredClone` (`§4.7`, best-effort): round-trips through the same
    // deep-copy routine `JSON.parse(JSON.stringify(...))`-style cloning
    // would use, skipping functions/symbols the spec's algorithm would
    // otherwise need a full serialization format to carry.
    let global = ev.global_object();
    let structured_clone = ev.make_host_function("structuredClone", 1, Rc::new(|ev, _this, args| {
        let value = args.first().cloned().unwrap_or(Value::Undefined);
        deep_clone(ev, &value, &mut Vec::new())
    }));
    let _ = ev.set_property(Value::Object(global), "structuredClone", structured_clone);
}

fn deep_clone(ev: &mut Evaluator, value: &Value, seen: &mut Vec<(crate::heap::HeapId, Value)>) -> crate::exception::RunResult<Value> {
    let Value::Object(id) = value else { return Ok(value.clone()) };
    if let Some((_, cloned)) = seen.iter().find(|(seen_id, _)| seen_id == id) {
        return Ok(cloned.clone());
    }
    use crate::heap::HeapData;
    match ev.heap().get(*id) {
        HeapData::Array(arr) => {
            let len = arr.elements.len();
            let placeholder = ev.new_array(vec![None; len]);
            seen.push((*id, Value::Object(placeholder)));
            for i in 0..len {
                let element = ev.get_property(value.clone(), &i.to_string())?;
                let cloned = deep_clone(ev, &element, seen)?;
                ev.set_property(Value::Object(placeholder), &i.to_string(), cloned)?;
            }
            Ok(Value::Object(placeholder))
        }
        HeapData::Function(_) => ev.throw_type_error("could not be cloned"),
        _ => {
            let placeholder = ev.new_plain_object();
            seen.push((*id, Value::Object(placeholder)));
            ev.copy_own_enumerable(value.clone(), Value::Object(placeholder))?;
            let keys: Vec<String> = match ev.heap().get(placeholder).as_object() {
                Some(obj) => obj
                    .own_keys_ordered()
                    .into_iter()
                    .filter_map(|k| match k {
                        PropertyKey::String(s) => Some(s.to_string()),
                        PropertyKey::Symbol(_) => None,
                    })
                    .collect(),
                None => Vec::new(),
            };
            for key in keys {
                let v = ev.get_property(Value::Object(placeholder), &key)?;
                let cloned = deep_clone(ev, &v, seen)?;
                ev.set_property(Value::Object(placeholder), &key, cloned)?;
            }
            Ok(Value::Object(placeholder))
        }
    }
}

pub(crate) fn install(ev: &mut Evaluator) {
    install_console(ev);
    install_timers(ev);
    install_uri_functions(ev);
    install_global_this(ev);
    install_structured_clone(ev);
}

#[cfg(test)]
mod tests {
    use crate::engine::Engine;
    use crate::value::Value;

    #[test]
    fn global_this_is_global_object() {
        let mut engine = Engine::new();
        let result = engine.evaluate("globalThis === this").unwrap();
        assert!(matches!(result, Value::Bool(true)));
    }

    #[test]
    fn set_timeout_fires_during_event_loop_drain() {
        let mut engine = Engine::new();
        let result = engine.evaluate("let ran = false; setTimeout(() => { ran = true; }, 0); ran").unwrap();
        assert!(matches!(result, Value::Bool(false)));
    }

    #[test]
    fn uri_component_round_trips() {
        let mut engine = Engine::new();
        let result = engine.evaluate("decodeURIComponent(encodeURIComponent('a b&c'))").unwrap();
        assert!(matches!(result, Value::String(s) if &*s == "a b&c"));
    }
}
