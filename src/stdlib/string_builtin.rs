//! `String` constructor and prototype (`§4.7`). Regex-aware methods
//! (`match`/`matchAll`/`replace`/`replaceAll`/`search`/`split`) share
//! [`super::regexp_builtin::construct_regexp`] with the `RegExp` literal
//! path, so `"a".replace("a", "b")` and `"a".replace(/a/, "b")` run through
//! the same compiled-pattern machinery once the plain string is promoted.

use std::rc::Rc;

use crate::exception::RunResult;
use crate::heap::HeapData;
use crate::object::{PropertyDescriptor, PropertyKey};
use crate::value::Value;

use super::regexp_builtin::construct_regexp;
use crate::evaluator::Evaluator;

fn this_string(ev: &mut Evaluator, this: &Value) -> RunResult<Rc<str>> {
    match this {
        Value::String(s) => Ok(s.clone()),
        _ => crate::ops::to_js_string(ev, this),
    }
}

fn arg(args: &[Value], i: usize) -> Value {
    args.get(i).cloned().unwrap_or(Value::Undefined)
}

/// Resolves a UTF-16-code-unit-ish index for `§4.7`'s string methods. This
/// engine represents strings as UTF-8 `Rc<str>`, so indices are char-based
/// rather than UTF-16-based — a documented simplification (`DESIGN.md`)
/// rather than full UTF-16 surrogate-pair fidelity.
fn char_len(s: &str) -> usize {
    s.chars().count()
}

fn char_at(s: &str, index: usize) -> Option<char> {
    s.chars().nth(index)
}

fn slice_chars(s: &str, start: usize, end: usize) -> String {
    if start >= end {
        return String::new();
    }
    s.chars().skip(start).take(end - start).collect()
}

/// Compiles a regex or regex-like string argument into a `RegExp` value,
/// for methods that accept either (`match`/`replace`/`split`/`search`).
fn as_regexp(ev: &mut Evaluator, v: &Value) -> RunResult<Value> {
    if let Value::Object(id) = v {
        if matches!(ev.heap().get(*id), HeapData::RegExp(_)) {
            return Ok(v.clone());
        }
    }
    let pattern = crate::ops::to_js_string(ev, v)?;
    construct_regexp(ev, &pattern, "")
}

fn regexp_source_flags(ev: &Evaluator, v: &Value) -> Option<(Rc<str>, Rc<str>)> {
    if let Value::Object(id) = v {
        if let HeapData::RegExp(r) = ev.heap().get(*id) {
            return Some((r.source.clone(), r.flags.clone()));
        }
    }
    None
}

pub(crate) fn install(ev: &mut Evaluator) {
    let proto = ev.realm().string_proto;

    super::def_method(ev, proto, "toString", 0, Rc::new(|ev, this, _args| Ok(Value::string(this_string(ev, &this)?.to_string()))));
    super::def_method(ev, proto, "valueOf", 0, Rc::new(|ev, this, _args| Ok(Value::string(this_string(ev, &this)?.to_string()))));

    super::def_method(ev, proto, "charAt", 1, Rc::new(|ev, this, args| {
        let s = this_string(ev, &this)?;
        let i = crate::ops::to_integer_or_infinity(ev, &arg(args, 0))?;
        if i < 0.0 {
            return Ok(Value::string(""));
        }
        Ok(Value::string(char_at(&s, i as usize).map_or_else(String::new, String::from)))
    }));

    super::def_method(ev, proto, "charCodeAt", 1, Rc::new(|ev, this, args| {
        let s = this_string(ev, &this)?;
        let i = crate::ops::to_integer_or_infinity(ev, &arg(args, 0))?;
        if i < 0.0 {
            return Ok(Value::Number(f64::NAN));
        }
        Ok(char_at(&s, i as usize).map_or(Value::Number(f64::NAN), |c| Value::Number(u32::from(c) as f64)))
    }));

    super::def_method(ev, proto, "codePointAt", 1, Rc::new(|ev, this, args| {
        let s = this_string(ev, &this)?;
        let i = crate::ops::to_integer_or_infinity(ev, &arg(args, 0))?;
        if i < 0.0 {
            return Ok(Value::Undefined);
        }
        Ok(char_at(&s, i as usize).map_or(Value::Undefined, |c| Value::Number(u32::from(c) as f64)))
    }));

    super::def_method(ev, proto, "at", 1, Rc::new(|ev, this, args| {
        let s = this_string(ev, &this)?;
        let len = char_len(&s) as f64;
        let n = crate::ops::to_integer_or_infinity(ev, &arg(args, 0))?;
        let idx = if n < 0.0 { len + n } else { n };
        if idx < 0.0 || idx >= len {
            return Ok(Value::Undefined);
        }
        Ok(char_at(&s, idx as usize).map_or(Value::Undefined, |c| Value::string(c.to_string())))
    }));

    super::def_method(ev, proto, "slice", 2, Rc::new(|ev, this, args| {
        let s = this_string(ev, &this)?;
        let len = char_len(&s) as i64;
        let resolve = |ev: &mut Evaluator, v: &Value, default: i64| -> RunResult<i64> {
            if v.is_undefined() {
                return Ok(default);
            }
            let n = crate::ops::to_integer_or_infinity(ev, v)? as i64;
            Ok(if n < 0 { (len + n).max(0) } else { n.min(len) })
        };
        let start = resolve(ev, &arg(args, 0), 0)?;
        let end = resolve(ev, &arg(args, 1), len)?;
        Ok(Value::string(slice_chars(&s, start as usize, end.max(start) as usize)))
    }));

    super::def_method(ev, proto, "substring", 2, Rc::new(|ev, this, args| {
        let s = this_string(ev, &this)?;
        let len = char_len(&s) as i64;
        let clamp = |ev: &mut Evaluator, v: &Value, default: i64| -> RunResult<i64> {
            if v.is_undefined() {
                return Ok(default);
            }
            let n = crate::ops::to_integer_or_infinity(ev, v)? as i64;
            Ok(n.clamp(0, len))
        };
        let mut a = clamp(ev, &arg(args, 0), 0)?;
        let mut b = clamp(ev, &arg(args, 1), len)?;
        if a > b {
            std::mem::swap(&mut a, &mut b);
        }
        Ok(Value::string(slice_chars(&s, a as usize, b as usize)))
    }));

    super::def_method(ev, proto, "substr", 2, Rc::new(|ev, this, args| {
        let s = this_string(ev, &this)?;
        let len = char_len(&s) as i64;
        let start_arg = crate::ops::to_integer_or_infinity(ev, &arg(args, 0))? as i64;
        let start = if start_arg < 0 { (len + start_arg).max(0) } else { start_arg.min(len) };
        let count = match args.get(1) {
            Some(v) if !v.is_undefined() => crate::ops::to_integer_or_infinity(ev, v)?.max(0.0) as i64,
            _ => len - start,
        };
        let end = (start + count).min(len);
        Ok(Value::string(slice_chars(&s, start as usize, end.max(start) as usize)))
    }));

    super::def_method(ev, proto, "indexOf", 1, Rc::new(|ev, this, args| {
        let s = this_string(ev, &this)?;
        let needle = crate::ops::to_js_string(ev, &arg(args, 0))?;
        let from = match args.get(1) {
            Some(v) if !v.is_undefined() => crate::ops::to_integer_or_infinity(ev, v)?.max(0.0) as usize,
            _ => 0,
        };
        let chars: Vec<char> = s.chars().collect();
        if from > chars.len() {
            return Ok(Value::Number(-1.0));
        }
        let haystack: String = chars[from..].iter().collect();
        match haystack.find(needle.as_ref()) {
            Some(byte_idx) => Ok(Value::Number((from + haystack[..byte_idx].chars().count()) as f64)),
            None => Ok(Value::Number(-1.0)),
        }
    }));

    super::def_method(ev, proto, "lastIndexOf", 1, Rc::new(|ev, this, args| {
        let s = this_string(ev, &this)?;
        let needle = crate::ops::to_js_string(ev, &arg(args, 0))?;
        match s.rfind(needle.as_ref()) {
            Some(byte_idx) => Ok(Value::Number(s[..byte_idx].chars().count() as f64)),
            None => Ok(Value::Number(-1.0)),
        }
    }));

    super::def_method(ev, proto, "includes", 1, Rc::new(|ev, this, args| {
        let s = this_string(ev, &this)?;
        let needle = crate::ops::to_js_string(ev, &arg(args, 0))?;
        Ok(Value::Bool(s.contains(needle.as_ref())))
    }));

    super::def_method(ev, proto, "startsWith", 1, Rc::new(|ev, this, args| {
        let s = this_string(ev, &this)?;
        let needle = crate::ops::to_js_string(ev, &arg(args, 0))?;
        let from = match args.get(1) {
            Some(v) if !v.is_undefined() => crate::ops::to_integer_or_infinity(ev, v)?.max(0.0) as usize,
            _ => 0,
        };
        let rest: String = s.chars().skip(from).collect();
        Ok(Value::Bool(rest.starts_with(needle.as_ref())))
    }));

    super::def_method(ev, proto, "endsWith", 1, Rc::new(|ev, this, args| {
        let s = this_string(ev, &this)?;
        let needle = crate::ops::to_js_string(ev, &arg(args, 0))?;
        let end = match args.get(1) {
            Some(v) if !v.is_undefined() => crate::ops::to_integer_or_infinity(ev, v)?.max(0.0) as usize,
            _ => char_len(&s),
        };
        let prefix: String = s.chars().take(end).collect();
        Ok(Value::Bool(prefix.ends_with(needle.as_ref())))
    }));

    super::def_method(ev, proto, "toUpperCase", 0, Rc::new(|ev, this, _args| Ok(Value::string(this_string(ev, &this)?.to_uppercase()))));
    super::def_method(ev, proto, "toLowerCase", 0, Rc::new(|ev, this, _args| Ok(Value::string(this_string(ev, &this)?.to_lowercase()))));
    super::def_method(ev, proto, "toLocaleUpperCase", 0, Rc::new(|ev, this, _args| Ok(Value::string(this_string(ev, &this)?.to_uppercase()))));
    super::def_method(ev, proto, "toLocaleLowerCase", 0, Rc::new(|ev, this, _args| Ok(Value::string(this_string(ev, &this)?.to_lowercase()))));

    super::def_method(ev, proto, "trim", 0, Rc::new(|ev, this, _args| Ok(Value::string(this_string(ev, &this)?.trim().to_string()))));
    super::def_method(ev, proto, "trimStart", 0, Rc::new(|ev, this, _args| Ok(Value::string(this_string(ev, &this)?.trim_start().to_string()))));
    super::def_method(ev, proto, "trimEnd", 0, Rc::new(|ev, this, _args| Ok(Value::string(this_string(ev, &this)?.trim_end().to_string()))));

    super::def_method(ev, proto, "concat", 1, Rc::new(|ev, this, args| {
        let mut s = this_string(ev, &this)?.to_string();
        for a in args {
            s.push_str(&crate::ops::to_js_string(ev, a)?);
        }
        Ok(Value::string(s))
    }));

    super::def_method(ev, proto, "repeat", 1, Rc::new(|ev, this, args| {
        let s = this_string(ev, &this)?;
        let n = crate::ops::to_integer_or_infinity(ev, &arg(args, 0))?;
        if n < 0.0 || n.is_infinite() {
            return ev.throw_range_error("Invalid count value");
        }
        Ok(Value::string(s.repeat(n as usize)))
    }));

    super::def_method(ev, proto, "padStart", 2, Rc::new(|ev, this, args| {
        let s = this_string(ev, &this)?;
        let target = crate::ops::to_integer_or_infinity(ev, &arg(args, 0))?.max(0.0) as usize;
        let pad = match args.get(1) {
            Some(v) if !v.is_undefined() => crate::ops::to_js_string(ev, v)?.to_string(),
            _ => " ".to_string(),
        };
        Ok(Value::string(pad_string(&s, target, &pad, true)))
    }));

    super::def_method(ev, proto, "padEnd", 2, Rc::new(|ev, this, args| {
        let s = this_string(ev, &this)?;
        let target = crate::ops::to_integer_or_infinity(ev, &arg(args, 0))?.max(0.0) as usize;
        let pad = match args.get(1) {
            Some(v) if !v.is_undefined() => crate::ops::to_js_string(ev, v)?.to_string(),
            _ => " ".to_string(),
        };
        Ok(Value::string(pad_string(&s, target, &pad, false)))
    }));

    super::def_method(ev, proto, "split", 2, Rc::new(|ev, this, args| {
        let s = this_string(ev, &this)?;
        let limit = match args.get(1) {
            Some(v) if !v.is_undefined() => crate::ops::to_integer_or_infinity(ev, v)?.max(0.0) as usize,
            _ => usize::MAX,
        };
        let Some(sep) = args.first() else {
            let arr = ev.new_array(vec![Some(Value::string(s.to_string()))]);
            return Ok(Value::Object(arr));
        };
        if sep.is_undefined() {
            let arr = ev.new_array(vec![Some(Value::string(s.to_string()))]);
            return Ok(Value::Object(arr));
        }
        let is_regexp = matches!(sep, Value::Object(id) if matches!(ev.heap().get(*id), HeapData::RegExp(_)));
        let parts: Vec<String> = if is_regexp {
            let (pattern, flags) = regexp_source_flags(ev, sep).unwrap_or_default();
            let re = as_regexp_compiled(ev, &pattern, &flags)?;
            split_by_regex(&s, &re)
        } else {
            let sep_str = crate::ops::to_js_string(ev, sep)?;
            if sep_str.is_empty() {
                s.chars().map(String::from).collect()
            } else {
                s.split(sep_str.as_ref()).map(String::from).collect()
            }
        };
        let elements = parts.into_iter().take(limit).map(|p| Some(Value::string(p))).collect();
        Ok(Value::Object(ev.new_array(elements)))
    }));

    super::def_method(ev, proto, "match", 1, Rc::new(|ev, this, args| {
        let s = this_string(ev, &this)?;
        let re = as_regexp(ev, &arg(args, 0))?;
        let (global, pattern, flags) = {
            let Value::Object(id) = &re else { unreachable!() };
            let HeapData::RegExp(r) = ev.heap().get(*id) else { unreachable!() };
            (r.global, r.source.clone(), r.flags.clone())
        };
        if !global {
            let exec_fn = ev.get_property(re.clone(), "exec")?;
            return ev.call_function(exec_fn, re, &[Value::string(s.to_string())]);
        }
        let compiled = as_regexp_compiled(ev, &pattern, &flags)?;
        let mut out = Vec::new();
        let mut pos = 0;
        while let Some(m) = compiled.find_from(&s, pos) {
            out.push(Some(Value::string(s[m.start..m.end].to_string())));
            pos = if m.end > m.start { m.end } else { m.end + 1 };
            if pos > s.len() {
                break;
            }
        }
        if out.is_empty() {
            return Ok(Value::Null);
        }
        Ok(Value::Object(ev.new_array(out)))
    }));

    super::def_method(ev, proto, "search", 1, Rc::new(|ev, this, args| {
        let s = this_string(ev, &this)?;
        let re = as_regexp(ev, &arg(args, 0))?;
        let (pattern, flags) = regexp_source_flags(ev, &re).unwrap_or_default();
        let compiled = as_regexp_compiled(ev, &pattern, &flags)?;
        Ok(match compiled.find_from(&s, 0) {
            Some(m) => Value::Number(m.start as f64),
            None => Value::Number(-1.0),
        })
    }));

    super::def_method(ev, proto, "replace", 2, Rc::new(|ev, this, args| {
        let s = this_string(ev, &this)?;
        let pattern_arg = arg(args, 0);
        let replacement = arg(args, 1);
        let is_regexp = matches!(&pattern_arg, Value::Object(id) if matches!(ev.heap().get(*id), HeapData::RegExp(_)));
        if is_regexp {
            let (pattern, flags) = regexp_source_flags(ev, &pattern_arg).unwrap_or_default();
            let global = flags.contains('g');
            replace_regex(ev, &s, &pattern, &flags, &replacement, global)
        } else {
            let needle = crate::ops::to_js_string(ev, &pattern_arg)?;
            match s.find(needle.as_ref()) {
                Some(byte_idx) => {
                    let rep = resolve_replacement(ev, &replacement, &s, byte_idx, byte_idx + needle.len(), &[])?;
                    Ok(Value::string(format!("{}{}{}", &s[..byte_idx], rep, &s[byte_idx + needle.len()..])))
                }
                None => Ok(Value::string(s.to_string())),
            }
        }
    }));

    super::def_method(ev, proto, "replaceAll", 2, Rc::new(|ev, this, args| {
        let s = this_string(ev, &this)?;
        let pattern_arg = arg(args, 0);
        let replacement = arg(args, 1);
        let is_regexp = matches!(&pattern_arg, Value::Object(id) if matches!(ev.heap().get(*id), HeapData::RegExp(_)));
        if is_regexp {
            let (pattern, flags) = regexp_source_flags(ev, &pattern_arg).unwrap_or_default();
            if !flags.contains('g') {
                return ev.throw_type_error("replaceAll must be called with a global RegExp");
            }
            replace_regex(ev, &s, &pattern, &flags, &replacement, true)
        } else {
            let needle = crate::ops::to_js_string(ev, &pattern_arg)?;
            if needle.is_empty() {
                let rep = resolve_replacement(ev, &replacement, &s, 0, 0, &[])?;
                let mut out = rep.clone();
                for c in s.chars() {
                    out.push(c);
                    out.push_str(&rep);
                }
                return Ok(Value::string(out));
            }
            let mut out = String::new();
            let mut rest = s.as_ref();
            let mut offset = 0usize;
            while let Some(byte_idx) = rest.find(needle.as_ref()) {
                out.push_str(&rest[..byte_idx]);
                let rep = resolve_replacement(ev, &replacement, &s, offset + byte_idx, offset + byte_idx + needle.len(), &[])?;
                out.push_str(&rep);
                rest = &rest[byte_idx + needle.len()..];
                offset += byte_idx + needle.len();
            }
            out.push_str(rest);
            Ok(Value::string(out))
        }
    }));

    let raw_fn = ev.make_host_function("raw", 1, Rc::new(|ev, _this, args| {
        let Some(strings) = args.first().cloned() else { return Ok(Value::string("")) };
        let raw = ev.get_property(strings, "raw")?;
        let len_v = ev.get_property(raw.clone(), "length")?;
        let len = crate::ops::to_integer_or_infinity(ev, &len_v)?.max(0.0) as usize;
        let mut out = String::new();
        for i in 0..len {
            let part = ev.get_property(raw.clone(), &i.to_string())?;
            out.push_str(&crate::ops::to_js_string(ev, &part)?);
            if let Some(sub) = args.get(i + 1) {
                out.push_str(&crate::ops::to_js_string(ev, sub)?);
            }
        }
        Ok(Value::string(out))
    }));

    let from_char_code_fn = ev.make_host_function("fromCharCode", 1, Rc::new(|ev, _this, args| {
        let mut s = String::new();
        for a in args {
            let n = crate::ops::to_number(ev, a)? as u32;
            if let Some(c) = char::from_u32(n) {
                s.push(c);
            }
        }
        Ok(Value::string(s))
    }));

    let from_code_point_fn = ev.make_host_function("fromCodePoint", 1, Rc::new(|ev, _this, args| {
        let mut s = String::new();
        for a in args {
            let n = crate::ops::to_number(ev, a)? as u32;
            match char::from_u32(n) {
                Some(c) => s.push(c),
                None => return ev.throw_range_error("Invalid code point"),
            }
        }
        Ok(Value::string(s))
    }));

    let iterator_sym = ev.symbols().iterator.clone();
    let iterator_fn = ev.make_host_function("[Symbol.iterator]", 0, Rc::new(|ev, this, _args| {
        let s = this_string(ev, &this)?;
        let items: Vec<Value> = s.chars().map(|c| Value::string(c.to_string())).collect();
        Ok(super::array_builtin::make_array_iterator(ev, items))
    }));
    if let Some(obj) = ev.heap_mut().get_mut(proto).as_object_mut() {
        obj.set_own(PropertyKey::symbol(iterator_sym), PropertyDescriptor::builtin_method(iterator_fn));
    }

    let ctor = ev.make_host_function("String", 1, Rc::new(|ev, _this, args| {
        match args.first() {
            Some(v) => Ok(Value::string(crate::ops::to_js_string(ev, v)?.to_string())),
            None => Ok(Value::string("")),
        }
    }));
    let Value::Object(ctor_id) = &ctor else { unreachable!() };
    if let Some(obj) = ev.heap_mut().get_mut(*ctor_id).as_object_mut() {
        obj.set_own(PropertyKey::from_str("prototype"), PropertyDescriptor::non_enumerable(Value::Object(proto)));
    }
    if let Some(proto_obj) = ev.heap_mut().get_mut(proto).as_object_mut() {
        proto_obj.set_own(PropertyKey::from_str("constructor"), PropertyDescriptor::non_enumerable(ctor.clone()));
    }
    let ctor_id = *ctor_id;
    if let Some(obj) = ev.heap_mut().get_mut(ctor_id).as_object_mut() {
        obj.set_own(PropertyKey::from_str("raw"), PropertyDescriptor::non_enumerable(raw_fn));
        obj.set_own(PropertyKey::from_str("fromCharCode"), PropertyDescriptor::non_enumerable(from_char_code_fn));
        obj.set_own(PropertyKey::from_str("fromCodePoint"), PropertyDescriptor::non_enumerable(from_code_point_fn));
    }

    let global = ev.global_object();
    let _ = ev.set_property(Value::Object(global), "String", ctor);
}

fn pad_string(s: &str, target: usize, pad: &str, start: bool) -> String {
    let len = char_len(s);
    if len >= target || pad.is_empty() {
        return s.to_string();
    }
    let needed = target - len;
    let filler: String = pad.chars().cycle().take(needed).collect();
    if start {
        format!("{filler}{s}")
    } else {
        format!("{s}{filler}")
    }
}

fn as_regexp_compiled(ev: &mut Evaluator, pattern: &str, flags: &str) -> RunResult<super::regexp::CompiledRegex> {
    match super::regexp::CompiledRegex::compile(pattern, flags) {
        Ok(c) => Ok(c),
        Err(e) => ev.throw_syntax_error(e.message()),
    }
}

fn split_by_regex(s: &str, re: &super::regexp::CompiledRegex) -> Vec<String> {
    let mut out = Vec::new();
    let mut pos = 0;
    loop {
        match re.find_from(s, pos) {
            Some(m) if m.end > pos || m.start > pos => {
                out.push(s[pos..m.start].to_string());
                pos = if m.end > m.start { m.end } else { m.end + 1 };
                if pos > s.len() {
                    break;
                }
            }
            _ => break,
        }
    }
    out.push(s[pos.min(s.len())..].to_string());
    out
}

/// Expands `$&`/`$1`../`$$` in a string replacement template (`§4.7`).
fn expand_template(template: &str, matched: &str, groups: &[Option<String>]) -> String {
    let mut out = String::new();
    let mut chars = template.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '$' {
            out.push(c);
            continue;
        }
        match chars.peek() {
            Some('$') => {
                out.push('$');
                chars.next();
            }
            Some('&') => {
                out.push_str(matched);
                chars.next();
            }
            Some(d) if d.is_ascii_digit() => {
                let mut num = String::new();
                num.push(*d);
                chars.next();
                if let Some(d2) = chars.peek() {
                    if d2.is_ascii_digit() {
                        num.push(*d2);
                        chars.next();
                    }
                }
                let idx: usize = num.parse().unwrap_or(0);
                if idx >= 1 && idx <= groups.len() {
                    if let Some(Some(g)) = groups.get(idx - 1) {
                        out.push_str(g);
                    }
                } else {
                    out.push('$');
                    out.push_str(&num);
                }
            }
            _ => out.push('$'),
        }
    }
    out
}

fn resolve_replacement(ev: &mut Evaluator, replacement: &Value, whole: &str, start: usize, end: usize, groups: &[Option<String>]) -> RunResult<String> {
    if ev.heap().is_callable_value(replacement) {
        let matched = &whole[start..end];
        let mut call_args = vec![Value::string(matched.to_string())];
        for g in groups {
            call_args.push(g.clone().map_or(Value::Undefined, Value::string));
        }
        call_args.push(Value::Number(start as f64));
        call_args.push(Value::string(whole.to_string()));
        let result = ev.call_function(replacement.clone(), Value::Undefined, &call_args)?;
        return Ok(crate::ops::to_js_string(ev, &result)?.to_string());
    }
    let template = crate::ops::to_js_string(ev, replacement)?;
    Ok(expand_template(&template, &whole[start..end], groups))
}

fn replace_regex(ev: &mut Evaluator, s: &str, pattern: &str, flags: &str, replacement: &Value, global: bool) -> RunResult<Value> {
    let compiled = as_regexp_compiled(ev, pattern, flags)?;
    let mut out = String::new();
    let mut pos = 0;
    loop {
        let Some(m) = compiled.find_from(s, pos) else { break };
        out.push_str(&s[pos..m.start]);
        let groups: Vec<Option<String>> = m.groups.iter().skip(1).map(|g| g.map(|(gs, ge)| s[gs..ge].to_string())).collect();
        let rep = resolve_replacement(ev, replacement, s, m.start, m.end, &groups)?;
        out.push_str(&rep);
        pos = if m.end > m.start { m.end } else { m.end + 1 };
        if !global {
            out.push_str(&s[pos.min(s.len())..]);
            return Ok(Value::string(out));
        }
        if pos > s.len() {
            break;
        }
    }
    out.push_str(&s[pos.min(s.len())..]);
    Ok(Value::string(out))
}
