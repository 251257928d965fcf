//! `Array` constructor and prototype (`§4.7`, `§4.6` "Tie-breaks").
//!
//! Methods read/write through [`Evaluator::get_property`]/`set_property`
//! rather than reaching into [`crate::heap::JsArray`] directly wherever
//! that's affordable: per `§4.7` ("`indexOf` must observe properties added
//! by getters during iteration") and the typed-array bounds-recheck
//! scenario in `§8`, this engine's array methods are specified to work on
//! any array-like `this` (a real `Array`, a `TypedArray`, or a plain
//! object with a numeric `length`), not just dense `JsArray` storage.

use std::cmp::Ordering;
use std::rc::Rc;

use crate::exception::RunResult;
use crate::heap::HeapData;
use crate::ops;
use crate::value::Value;

use crate::evaluator::Evaluator;

fn arg(args: &[Value], i: usize) -> Value {
    args.get(i).cloned().unwrap_or(Value::Undefined)
}

/// `ToLength`-ish: clamps `this.length` to a non-negative integer. Lives
/// here rather than `ops.rs` since every caller is an `Array.prototype`
/// method reading an array-like's length, not a general coercion.
fn length_of(ev: &mut Evaluator, this: &Value) -> RunResult<usize> {
    let v = ev.get_property(this.clone(), "length")?;
    let n = ops::to_number(ev, &v)?;
    Ok(if n.is_nan() || n <= 0.0 { 0 } else { n as usize })
}

fn idx_get(ev: &mut Evaluator, this: &Value, i: usize) -> RunResult<Value> {
    ev.get_property(this.clone(), &i.to_string())
}

fn idx_set(ev: &mut Evaluator, this: &Value, i: usize, v: Value) -> RunResult<()> {
    ev.set_property(this.clone(), &i.to_string(), v)
}

/// Resolves a `start`/`end`-style index argument (possibly negative,
/// possibly `undefined`) against `len`, per the relative-index clamping
/// every `slice`/`splice`/`copyWithin`/`fill`/`at` style method shares.
pub(crate) fn relative_index(ev: &mut Evaluator, value: &Value, len: usize, default: i64) -> RunResult<i64> {
    if value.is_undefined() {
        return Ok(default);
    }
    let n = ops::to_integer_or_infinity(ev, value)?;
    let len = len as f64;
    let resolved = if n < 0.0 { (len + n).max(0.0) } else { n.min(len) };
    Ok(resolved as i64)
}

fn new_array_of(ev: &mut Evaluator, values: Vec<Value>) -> Value {
    Value::Object(ev.new_array(values.into_iter().map(Some).collect()))
}

pub(crate) fn install(ev: &mut Evaluator) {
    let proto = ev.realm().array_proto;

    super::def_method(ev, proto, "push", 1, Rc::new(|ev, this, args| {
        let Value::Object(id) = &this else { return ev.throw_type_error("Array.prototype.push called on non-object") };
        if let HeapData::Array(arr) = ev.heap_mut().get_mut(*id) {
            for v in args {
                arr.elements.push(Some(v.clone()));
            }
            return Ok(Value::Number(arr.elements.len() as f64));
        }
        let mut len = length_of(ev, &this)?;
        for v in args {
            idx_set(ev, &this, len, v.clone())?;
            len += 1;
        }
        ev.set_property(this.clone(), "length", Value::Number(len as f64))?;
        Ok(Value::Number(len as f64))
    }));

    super::def_method(ev, proto, "pop", 0, Rc::new(|ev, this, _args| {
        let Value::Object(id) = &this else { return Ok(Value::Undefined) };
        if let HeapData::Array(arr) = ev.heap_mut().get_mut(*id) {
            return Ok(arr.elements.pop().flatten().unwrap_or(Value::Undefined));
        }
        let len = length_of(ev, &this)?;
        if len == 0 {
            return Ok(Value::Undefined);
        }
        let last = idx_get(ev, &this, len - 1)?;
        ev.set_property(this.clone(), "length", Value::Number((len - 1) as f64))?;
        Ok(last)
    }));

    super::def_method(ev, proto, "shift", 0, Rc::new(|ev, this, _args| {
        let Value::Object(id) = &this else { return Ok(Value::Undefined) };
        if let HeapData::Array(arr) = ev.heap_mut().get_mut(*id) {
            if arr.elements.is_empty() {
                return Ok(Value::Undefined);
            }
            return Ok(arr.elements.remove(0).unwrap_or(Value::Undefined));
        }
        Ok(Value::Undefined)
    }));

    super::def_method(ev, proto, "unshift", 1, Rc::new(|ev, this, args| {
        let Value::Object(id) = &this else { return ev.throw_type_error("Array.prototype.unshift called on non-object") };
        if let HeapData::Array(arr) = ev.heap_mut().get_mut(*id) {
            for (i, v) in args.iter().enumerate() {
                arr.elements.insert(i, Some(v.clone()));
            }
            return Ok(Value::Number(arr.elements.len() as f64));
        }
        Ok(Value::Number(0.0))
    }));

    super::def_method(ev, proto, "slice", 2, Rc::new(|ev, this, args| {
        let len = length_of(ev, &this)?;
        let start = relative_index(ev, &arg(args, 0), len, 0)? as usize;
        let end = relative_index(ev, &arg(args, 1), len, len as i64)? as usize;
        let mut out = Vec::new();
        for i in start..end.max(start) {
            out.push(idx_get(ev, &this, i)?);
        }
        Ok(new_array_of(ev, out))
    }));

    super::def_method(ev, proto, "splice", 2, Rc::new(|ev, this, args| {
        let Value::Object(id) = &this else { return ev.throw_type_error("Array.prototype.splice called on non-object") };
        let len = length_of(ev, &this)?;
        let start = relative_index(ev, &arg(args, 0), len, 0)? as usize;
        let delete_count = match args.get(1) {
            None => len - start,
            Some(v) => {
                let n = ops::to_integer_or_infinity(ev, v)?;
                (n.max(0.0) as usize).min(len - start)
            }
        };
        let items: Vec<Value> = args.get(2..).unwrap_or(&[]).to_vec();
        let id = *id;
        let removed = if let HeapData::Array(arr) = ev.heap_mut().get_mut(id) {
            let end = (start + delete_count).min(arr.elements.len());
            let removed: Vec<Option<Value>> = arr.elements.splice(start.min(arr.elements.len())..end, items.into_iter().map(Some)).collect();
            removed
        } else {
            Vec::new()
        };
        Ok(Value::Object(ev.new_array(removed)))
    }));

    super::def_method(ev, proto, "concat", 1, Rc::new(|ev, this, args| {
        let mut out = Vec::new();
        let mut push_all = |ev: &mut Evaluator, v: &Value, out: &mut Vec<Value>| -> RunResult<()> {
            if let Value::Object(id) = v {
                if matches!(ev.heap().get(*id), HeapData::Array(_)) {
                    let len = length_of(ev, v)?;
                    for i in 0..len {
                        out.push(idx_get(ev, v, i)?);
                    }
                    return Ok(());
                }
            }
            out.push(v.clone());
            Ok(())
        };
        push_all(ev, &this, &mut out)?;
        for a in args {
            push_all(ev, a, &mut out)?;
        }
        Ok(new_array_of(ev, out))
    }));

    super::def_method(ev, proto, "join", 1, Rc::new(|ev, this, args| {
        let len = length_of(ev, &this)?;
        let sep = match args.first() {
            Some(v) if !v.is_undefined() => crate::ops::to_js_string(ev, v)?.to_string(),
            _ => ",".to_string(),
        };
        let mut parts = Vec::with_capacity(len);
        for i in 0..len {
            let v = idx_get(ev, &this, i)?;
            parts.push(if v.is_nullish() { String::new() } else { crate::ops::to_js_string(ev, &v)?.to_string() });
        }
        Ok(Value::string(parts.join(&sep)))
    }));

    super::def_method(ev, proto, "toString", 0, Rc::new(|ev, this, _args| {
        let join = ev.get_property(this.clone(), "join")?;
        if ev.heap().is_callable_value(&join) {
            return ev.call_function(join, this, &[]);
        }
        Ok(Value::string("[object Array]"))
    }));

    super::def_method(ev, proto, "forEach", 1, Rc::new(|ev, this, args| {
        let callback = arg(args, 0);
        let this_arg = arg(args, 1);
        let len = length_of(ev, &this)?;
        for i in 0..len {
            let v = idx_get(ev, &this, i)?;
            ev.call_function(callback.clone(), this_arg.clone(), &[v, Value::Number(i as f64), this.clone()])?;
        }
        Ok(Value::Undefined)
    }));

    super::def_method(ev, proto, "map", 1, Rc::new(|ev, this, args| {
        let callback = arg(args, 0);
        let this_arg = arg(args, 1);
        let len = length_of(ev, &this)?;
        let mut out = Vec::with_capacity(len);
        for i in 0..len {
            let v = idx_get(ev, &this, i)?;
            out.push(ev.call_function(callback.clone(), this_arg.clone(), &[v, Value::Number(i as f64), this.clone()])?);
        }
        Ok(new_array_of(ev, out))
    }));

    super::def_method(ev, proto, "filter", 1, Rc::new(|ev, this, args| {
        let callback = arg(args, 0);
        let this_arg = arg(args, 1);
        let len = length_of(ev, &this)?;
        let mut out = Vec::new();
        for i in 0..len {
            let v = idx_get(ev, &this, i)?;
            if ev.call_function(callback.clone(), this_arg.clone(), &[v.clone(), Value::Number(i as f64), this.clone()])?.to_boolean() {
                out.push(v);
            }
        }
        Ok(new_array_of(ev, out))
    }));

    super::def_method(ev, proto, "reduce", 1, Rc::new(|ev, this, args| {
        let callback = arg(args, 0);
        let len = length_of(ev, &this)?;
        let mut i = 0;
        let mut acc = match args.get(1) {
            Some(v) => v.clone(),
            None => {
                if len == 0 {
                    return ev.throw_type_error("Reduce of empty array with no initial value");
                }
                let first = idx_get(ev, &this, 0)?;
                i = 1;
                first
            }
        };
        while i < len {
            let v = idx_get(ev, &this, i)?;
            acc = ev.call_function(callback.clone(), Value::Undefined, &[acc, v, Value::Number(i as f64), this.clone()])?;
            i += 1;
        }
        Ok(acc)
    }));

    super::def_method(ev, proto, "reduceRight", 1, Rc::new(|ev, this, args| {
        let callback = arg(args, 0);
        let len = length_of(ev, &this)?;
        if len == 0 && args.len() < 2 {
            return ev.throw_type_error("Reduce of empty array with no initial value");
        }
        let mut i = len as i64 - 1;
        let mut acc = match args.get(1) {
            Some(v) => v.clone(),
            None => {
                let last = idx_get(ev, &this, i as usize)?;
                i -= 1;
                last
            }
        };
        while i >= 0 {
            let v = idx_get(ev, &this, i as usize)?;
            acc = ev.call_function(callback.clone(), Value::Undefined, &[acc, v, Value::Number(i as f64), this.clone()])?;
            i -= 1;
        }
        Ok(acc)
    }));

    super::def_method(ev, proto, "find", 1, Rc::new(|ev, this, args| {
        let callback = arg(args, 0);
        let len = length_of(ev, &this)?;
        for i in 0..len {
            let v = idx_get(ev, &this, i)?;
            if ev.call_function(callback.clone(), Value::Undefined, &[v.clone(), Value::Number(i as f64), this.clone()])?.to_boolean() {
                return Ok(v);
            }
        }
        Ok(Value::Undefined)
    }));

    super::def_method(ev, proto, "findIndex", 1, Rc::new(|ev, this, args| {
        let callback = arg(args, 0);
        let len = length_of(ev, &this)?;
        for i in 0..len {
            let v = idx_get(ev, &this, i)?;
            if ev.call_function(callback.clone(), Value::Undefined, &[v, Value::Number(i as f64), this.clone()])?.to_boolean() {
                return Ok(Value::Number(i as f64));
            }
        }
        Ok(Value::Number(-1.0))
    }));

    super::def_method(ev, proto, "findLast", 1, Rc::new(|ev, this, args| {
        let callback = arg(args, 0);
        let len = length_of(ev, &this)?;
        for i in (0..len).rev() {
            let v = idx_get(ev, &this, i)?;
            if ev.call_function(callback.clone(), Value::Undefined, &[v.clone(), Value::Number(i as f64), this.clone()])?.to_boolean() {
                return Ok(v);
            }
        }
        Ok(Value::Undefined)
    }));

    super::def_method(ev, proto, "findLastIndex", 1, Rc::new(|ev, this, args| {
        let callback = arg(args, 0);
        let len = length_of(ev, &this)?;
        for i in (0..len).rev() {
            let v = idx_get(ev, &this, i)?;
            if ev.call_function(callback.clone(), Value::Undefined, &[v, Value::Number(i as f64), this.clone()])?.to_boolean() {
                return Ok(Value::Number(i as f64));
            }
        }
        Ok(Value::Number(-1.0))
    }));

    super::def_method(ev, proto, "includes", 1, Rc::new(|ev, this, args| {
        let needle = arg(args, 0);
        let len = length_of(ev, &this)?;
        for i in 0..len {
            if crate::ops::same_value_zero(&idx_get(ev, &this, i)?, &needle) {
                return Ok(Value::Bool(true));
            }
        }
        Ok(Value::Bool(false))
    }));

    super::def_method(ev, proto, "indexOf", 1, Rc::new(|ev, this, args| {
        let needle = arg(args, 0);
        let len = length_of(ev, &this)?;
        let start = match args.get(1) {
            Some(v) => relative_index(ev, v, len, 0)? as usize,
            None => 0,
        };
        for i in start..len {
            if idx_get(ev, &this, i)?.strict_eq(&needle) {
                return Ok(Value::Number(i as f64));
            }
        }
        Ok(Value::Number(-1.0))
    }));

    // `lastIndexOf`'s `fromIndex` is resolved against the length observed
    // *before* any coercion side effect (`§4.6` "TypedArrays" bounds-recheck
    // scenario); each element read below goes through `idx_get`, which
    // recomputes a `TypedArray`'s effective length fresh every call, so a
    // `valueOf` that shrinks the backing buffer mid-scan is observed.
    super::def_method(ev, proto, "lastIndexOf", 1, Rc::new(|ev, this, args| {
        let needle = arg(args, 0);
        let len = length_of(ev, &this)?;
        if len == 0 {
            return Ok(Value::Number(-1.0));
        }
        let start = match args.get(1) {
            Some(v) if !v.is_undefined() => {
                let n = ops::to_integer_or_infinity(ev, v)?;
                if n < 0.0 { (len as f64 + n).max(-1.0) as i64 } else { n.min((len - 1) as f64) as i64 }
            }
            _ => (len - 1) as i64,
        };
        let mut i = start;
        while i >= 0 {
            let idx = i as usize;
            if (idx as usize) < length_of(ev, &this)? && idx_get(ev, &this, idx)?.strict_eq(&needle) {
                return Ok(Value::Number(idx as f64));
            }
            i -= 1;
        }
        Ok(Value::Number(-1.0))
    }));

    super::def_method(ev, proto, "some", 1, Rc::new(|ev, this, args| {
        let callback = arg(args, 0);
        let len = length_of(ev, &this)?;
        for i in 0..len {
            let v = idx_get(ev, &this, i)?;
            if ev.call_function(callback.clone(), Value::Undefined, &[v, Value::Number(i as f64), this.clone()])?.to_boolean() {
                return Ok(Value::Bool(true));
            }
        }
        Ok(Value::Bool(false))
    }));

    super::def_method(ev, proto, "every", 1, Rc::new(|ev, this, args| {
        let callback = arg(args, 0);
        let len = length_of(ev, &this)?;
        for i in 0..len {
            let v = idx_get(ev, &this, i)?;
            if !ev.call_function(callback.clone(), Value::Undefined, &[v, Value::Number(i as f64), this.clone()])?.to_boolean() {
                return Ok(Value::Bool(false));
            }
        }
        Ok(Value::Bool(true))
    }));

    super::def_method(ev, proto, "at", 1, Rc::new(|ev, this, args| {
        let len = length_of(ev, &this)?;
        let n = ops::to_integer_or_infinity(ev, &arg(args, 0))?;
        let idx = if n < 0.0 { len as f64 + n } else { n };
        if idx < 0.0 || idx >= len as f64 {
            return Ok(Value::Undefined);
        }
        idx_get(ev, &this, idx as usize)
    }));

    super::def_method(ev, proto, "reverse", 0, Rc::new(|ev, this, _args| {
        let Value::Object(id) = &this else { return Ok(this) };
        if let HeapData::Array(arr) = ev.heap_mut().get_mut(*id) {
            arr.elements.reverse();
        }
        Ok(this)
    }));

    super::def_method(ev, proto, "fill", 1, Rc::new(|ev, this, args| {
        let len = length_of(ev, &this)?;
        let value = arg(args, 0);
        let start = relative_index(ev, &arg(args, 1), len, 0)? as usize;
        let end = relative_index(ev, &arg(args, 2), len, len as i64)? as usize;
        for i in start..end.max(start) {
            idx_set(ev, &this, i, value.clone())?;
        }
        Ok(this)
    }));

    super::def_method(ev, proto, "copyWithin", 2, Rc::new(|ev, this, args| {
        let len = length_of(ev, &this)?;
        let target = relative_index(ev, &arg(args, 0), len, 0)? as usize;
        let start = relative_index(ev, &arg(args, 1), len, 0)? as usize;
        let end = relative_index(ev, &arg(args, 2), len, len as i64)? as usize;
        let count = end.saturating_sub(start).min(len.saturating_sub(target));
        let slice: Vec<Value> = (0..count).map(|i| idx_get(ev, &this, start + i)).collect::<RunResult<_>>()?;
        for (i, v) in slice.into_iter().enumerate() {
            idx_set(ev, &this, target + i, v)?;
        }
        Ok(this)
    }));

    super::def_method(ev, proto, "sort", 1, Rc::new(|ev, this, args| {
        let comparator = args.first().cloned();
        let len = length_of(ev, &this)?;
        let mut values: Vec<Value> = (0..len).map(|i| idx_get(ev, &this, i)).collect::<RunResult<_>>()?;
        sort_values(ev, &mut values, comparator.as_ref())?;
        for (i, v) in values.into_iter().enumerate() {
            idx_set(ev, &this, i, v)?;
        }
        Ok(this)
    }));

    super::def_method(ev, proto, "toSorted", 1, Rc::new(|ev, this, args| {
        let comparator = args.first().cloned();
        let len = length_of(ev, &this)?;
        let mut values: Vec<Value> = (0..len).map(|i| idx_get(ev, &this, i)).collect::<RunResult<_>>()?;
        sort_values(ev, &mut values, comparator.as_ref())?;
        Ok(new_array_of(ev, values))
    }));

    super::def_method(ev, proto, "toReversed", 0, Rc::new(|ev, this, _args| {
        let len = length_of(ev, &this)?;
        let mut values: Vec<Value> = (0..len).map(|i| idx_get(ev, &this, i)).collect::<RunResult<_>>()?;
        values.reverse();
        Ok(new_array_of(ev, values))
    }));

    super::def_method(ev, proto, "toSpliced", 2, Rc::new(|ev, this, args| {
        let len = length_of(ev, &this)?;
        let start = relative_index(ev, &arg(args, 0), len, 0)? as usize;
        let delete_count = match args.get(1) {
            None => len - start,
            Some(v) => {
                let n = ops::to_integer_or_infinity(ev, v)?;
                (n.max(0.0) as usize).min(len - start)
            }
        };
        let mut values: Vec<Value> = (0..len).map(|i| idx_get(ev, &this, i)).collect::<RunResult<_>>()?;
        let items: Vec<Value> = args.get(2..).unwrap_or(&[]).to_vec();
        let end = (start + delete_count).min(values.len());
        values.splice(start.min(values.len())..end, items);
        Ok(new_array_of(ev, values))
    }));

    super::def_method(ev, proto, "with", 2, Rc::new(|ev, this, args| {
        let len = length_of(ev, &this)?;
        let n = ops::to_integer_or_infinity(ev, &arg(args, 0))?;
        let idx = if n < 0.0 { len as f64 + n } else { n };
        if idx < 0.0 || idx >= len as f64 {
            return ev.throw_range_error("Invalid index");
        }
        let mut values: Vec<Value> = (0..len).map(|i| idx_get(ev, &this, i)).collect::<RunResult<_>>()?;
        values[idx as usize] = arg(args, 1);
        Ok(new_array_of(ev, values))
    }));

    super::def_method(ev, proto, "flat", 0, Rc::new(|ev, this, args| {
        let depth = match args.first() {
            Some(v) if !v.is_undefined() => ops::to_integer_or_infinity(ev, v)?,
            _ => 1.0,
        };
        let mut out = Vec::new();
        flatten_into(ev, &this, depth, &mut out)?;
        Ok(new_array_of(ev, out))
    }));

    super::def_method(ev, proto, "flatMap", 1, Rc::new(|ev, this, args| {
        let callback = arg(args, 0);
        let this_arg = arg(args, 1);
        let len = length_of(ev, &this)?;
        let mut out = Vec::new();
        for i in 0..len {
            let v = idx_get(ev, &this, i)?;
            let mapped = ev.call_function(callback.clone(), this_arg.clone(), &[v, Value::Number(i as f64), this.clone()])?;
            flatten_into(ev, &mapped, 0.0, &mut out)?;
        }
        Ok(new_array_of(ev, out))
    }));

    super::def_method(ev, proto, "entries", 0, Rc::new(|ev, this, _args| {
        let len = length_of(ev, &this)?;
        let mut out = Vec::with_capacity(len);
        for i in 0..len {
            let v = idx_get(ev, &this, i)?;
            out.push(Value::Object(ev.new_array(vec![Some(Value::Number(i as f64)), Some(v)])));
        }
        Ok(make_array_iterator(ev, out))
    }));

    super::def_method(ev, proto, "keys", 0, Rc::new(|ev, this, _args| {
        let len = length_of(ev, &this)?;
        let out = (0..len).map(|i| Value::Number(i as f64)).collect();
        Ok(make_array_iterator(ev, out))
    }));

    super::def_method(ev, proto, "values", 0, Rc::new(|ev, this, _args| {
        let len = length_of(ev, &this)?;
        let mut out = Vec::with_capacity(len);
        for i in 0..len {
            out.push(idx_get(ev, &this, i)?);
        }
        Ok(make_array_iterator(ev, out))
    }));

    let iterator_sym = ev.symbols().iterator.clone();
    let values_fn = ev.get_property(Value::Object(proto), "values").expect("values just installed");
    if let Some(obj) = ev.heap_mut().get_mut(proto).as_object_mut() {
        obj.set_own(
            crate::object::PropertyKey::symbol(iterator_sym),
            crate::object::PropertyDescriptor::builtin_method(values_fn),
        );
    }

    // ---- constructor -------------------------------------------------

    let ctor = ev.make_host_function("Array", 1, Rc::new(|ev, _this, args| {
        if args.len() == 1 {
            if let Value::Number(n) = args[0] {
                if n.fract() != 0.0 || n < 0.0 || n > u32::MAX as f64 {
                    return ev.throw_range_error("Invalid array length");
                }
                return Ok(Value::Object(ev.new_array(vec![None; n as usize])));
            }
        }
        Ok(Value::Object(ev.new_array(args.iter().cloned().map(Some).collect())))
    }));
    let Value::Object(ctor_id) = &ctor else { unreachable!() };
    if let Some(obj) = ev.heap_mut().get_mut(*ctor_id).as_object_mut() {
        obj.set_own(crate::object::PropertyKey::from_str("prototype"), crate::object::PropertyDescriptor::non_enumerable(Value::Object(proto)));
    }
    if let Some(proto_obj) = ev.heap_mut().get_mut(proto).as_object_mut() {
        proto_obj.set_own(crate::object::PropertyKey::from_str("constructor"), crate::object::PropertyDescriptor::non_enumerable(ctor.clone()));
    }
    let ctor_id = *ctor_id;

    super::def_method(ev, ctor_id, "isArray", 1, Rc::new(|ev, _this, args| {
        Ok(Value::Bool(matches!(args.first(), Some(Value::Object(id)) if matches!(ev.heap().get(*id), HeapData::Array(_)))))
    }));

    super::def_method(ev, ctor_id, "of", 0, Rc::new(|ev, _this, args| Ok(new_array_of(ev, args.to_vec()))));

    super::def_method(ev, ctor_id, "from", 1, Rc::new(|ev, _this, args| {
        let Some(source) = args.first().cloned() else { return Ok(new_array_of(ev, Vec::new())) };
        let map_fn = args.get(1).cloned();
        // Real arrays and genuinely iterable objects go through the
        // iterator protocol; anything else falls back to reading `.length`
        // and numeric indices, covering array-like `arguments`-style
        // objects that never implement `Symbol.iterator`.
        let items = match ev.iterate_to_vec(source.clone()) {
            Ok(v) => v,
            Err(_) if matches!(source, Value::Object(_)) => {
                let len_v = ev.get_property(source.clone(), "length")?;
                let len = ops::to_integer_or_infinity(ev, &len_v)?.max(0.0) as usize;
                (0..len).map(|i| idx_get(ev, &source, i)).collect::<RunResult<Vec<_>>>()?
            }
            Err(e) => return Err(e),
        };
        match map_fn {
            Some(f) if ev.heap().is_callable_value(&f) => {
                let mut out = Vec::with_capacity(items.len());
                for (i, v) in items.into_iter().enumerate() {
                    out.push(ev.call_function(f.clone(), Value::Undefined, &[v, Value::Number(i as f64)])?);
                }
                Ok(new_array_of(ev, out))
            }
            _ => Ok(new_array_of(ev, items)),
        }
    }));

    let global = ev.global_object();
    let _ = ev.set_property(Value::Object(global), "Array", ctor);
}

fn flatten_into(ev: &mut Evaluator, value: &Value, depth: f64, out: &mut Vec<Value>) -> RunResult<()> {
    if depth >= 0.0 {
        if let Value::Object(id) = value {
            if matches!(ev.heap().get(*id), HeapData::Array(_)) {
                let len = length_of(ev, value)?;
                for i in 0..len {
                    let v = idx_get(ev, value, i)?;
                    flatten_into(ev, &v, depth - 1.0, out)?;
                }
                return Ok(());
            }
        }
    }
    out.push(value.clone());
    Ok(())
}

/// `undefined` elements always sort to the end regardless of comparator
/// (`§4.7`/ECMAScript `Array.prototype.sort`); everything else goes through
/// the user comparator (string comparison if none given). Plain insertion
/// sort rather than `slice::sort_by`, since the comparator is a guest
/// callback that can throw and `ev` needs a fresh `&mut` borrow per call.
pub(crate) fn sort_values(ev: &mut Evaluator, values: &mut [Value], comparator: Option<&Value>) -> RunResult<()> {
    fn compare(ev: &mut Evaluator, a: &Value, b: &Value, comparator: Option<&Value>) -> RunResult<Ordering> {
        match (a.is_undefined(), b.is_undefined()) {
            (true, true) => return Ok(Ordering::Equal),
            (true, false) => return Ok(Ordering::Greater),
            (false, true) => return Ok(Ordering::Less),
            _ => {}
        }
        match comparator {
            Some(f) => {
                let result = ev.call_function(f.clone(), Value::Undefined, &[a.clone(), b.clone()])?;
                let n = ops::to_number(ev, &result)?;
                Ok(if n < 0.0 { Ordering::Less } else if n > 0.0 { Ordering::Greater } else { Ordering::Equal })
            }
            None => {
                let sa = crate::ops::to_js_string(ev, a)?;
                let sb = crate::ops::to_js_string(ev, b)?;
                Ok(sa.as_ref().cmp(sb.as_ref()))
            }
        }
    }

    for i in 1..values.len() {
        let mut j = i;
        while j > 0 && compare(ev, &values[j - 1], &values[j], comparator)? == Ordering::Greater {
            values.swap(j - 1, j);
            j -= 1;
        }
    }
    Ok(())
}

pub(crate) fn make_array_iterator(ev: &mut Evaluator, items: Vec<Value>) -> Value {
    let object_proto = ev.realm().object_proto;
    let iter_obj = ev.new_object_with_proto(Some(object_proto));
    let next_index = std::rc::Rc::new(std::cell::Cell::new(0usize));
    let next_items = std::rc::Rc::new(items);
    super::def_method(ev, iter_obj, "next", 0, Rc::new(move |ev, _this, _args| {
        let i = next_index.get();
        let result = ev.new_plain_object();
        if i < next_items.len() {
            next_index.set(i + 1);
            ev.set_property(Value::Object(result), "value", next_items[i].clone())?;
            ev.set_property(Value::Object(result), "done", Value::Bool(false))?;
        } else {
            ev.set_property(Value::Object(result), "value", Value::Undefined)?;
            ev.set_property(Value::Object(result), "done", Value::Bool(true))?;
        }
        Ok(Value::Object(result))
    }));
    let iterator_sym = ev.symbols().iterator.clone();
    let self_fn = ev.make_host_function("[Symbol.iterator]", 0, Rc::new(|_ev, this, _args| Ok(this)));
    if let Some(obj) = ev.heap_mut().get_mut(iter_obj).as_object_mut() {
        obj.set_own(crate::object::PropertyKey::symbol(iterator_sym), crate::object::PropertyDescriptor::builtin_method(self_fn));
    }
    Value::Object(iter_obj)
}
