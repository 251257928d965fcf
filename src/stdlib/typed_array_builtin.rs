//! `ArrayBuffer` and the eleven `TypedArray` constructors (`§4.6`/`§4.7`
//! "TypedArrays"). Generic index get/set/`length` already route through
//! [`crate::heap::Heap::typed_array_get`]/`typed_array_set`/`typed_array_length`
//! at the property-access layer (`evaluator::access`), so the prototype
//! methods here read/write through the ordinary `get_property`/
//! `set_property` calls every `Array.prototype` method uses, sharing
//! `array_builtin`'s array-like helpers rather than reaching into the
//! buffer's bytes directly.

use std::rc::Rc;

use crate::exception::RunResult;
use crate::heap::{ArrayBufferData, HeapData, TypedArrayData, TypedArrayKind};
use crate::object::{JsObject, PropertyDescriptor, PropertyKey};
use crate::ops;
use crate::value::Value;

use crate::evaluator::Evaluator;

fn arg(args: &[Value], i: usize) -> Value {
    args.get(i).cloned().unwrap_or(Value::Undefined)
}

fn length_of(ev: &mut Evaluator, this: &Value) -> RunResult<usize> {
    let v = ev.get_property(this.clone(), "length")?;
    let n = ops::to_number(ev, &v)?;
    Ok(if n.is_nan() || n <= 0.0 { 0 } else { n as usize })
}

fn idx_get(ev: &mut Evaluator, this: &Value, i: usize) -> RunResult<Value> {
    ev.get_property(this.clone(), &i.to_string())
}

// ---- ArrayBuffer ---------------------------------------------------------

fn install_array_buffer(ev: &mut Evaluator) {
    let proto = ev.realm().array_buffer_proto;

    super::def_method(ev, proto, "slice", 2, Rc::new(|ev, this, args| {
        let Value::Object(id) = this else { return ev.throw_type_error("ArrayBuffer.prototype.slice called on non-buffer") };
        let len = match ev.heap().get(id) {
            HeapData::ArrayBuffer(b) => b.bytes.len(),
            _ => return ev.throw_type_error("ArrayBuffer.prototype.slice called on non-buffer"),
        };
        let start = super::array_builtin::relative_index(ev, &arg(args, 0), len, 0)? as usize;
        let end = super::array_builtin::relative_index(ev, &arg(args, 1), len, len as i64)? as usize;
        let bytes = match ev.heap().get(id) {
            HeapData::ArrayBuffer(b) => b.bytes.get(start.min(end)..end.max(start)).unwrap_or(&[]).to_vec(),
            _ => Vec::new(),
        };
        let proto = ev.realm().array_buffer_proto;
        let new_id = ev.heap_mut().alloc(HeapData::ArrayBuffer(ArrayBufferData {
            object: JsObject::with_class(Some(proto), "ArrayBuffer"),
            bytes,
            max_byte_length: None,
            detached: false,
        }));
        Ok(Value::Object(new_id))
    }));

    super::def_method(ev, proto, "resize", 1, Rc::new(|ev, this, args| {
        let Value::Object(id) = this else { return ev.throw_type_error("ArrayBuffer.prototype.resize called on non-buffer") };
        let new_len = ops::to_integer_or_infinity(ev, &arg(args, 0))?;
        if new_len < 0.0 {
            return ev.throw_range_error("Invalid buffer length");
        }
        let ok = match ev.heap_mut().get_mut(id) {
            HeapData::ArrayBuffer(b) => b.resize(new_len as usize),
            _ => false,
        };
        if !ok {
            return ev.throw_range_error("ArrayBuffer is not resizable or length out of range");
        }
        Ok(Value::Undefined)
    }));

    // `byteLength`/`maxByteLength`/`resizable`/`detached` are accessor
    // getters per spec, not plain data properties (length tracks live
    // mutation after `resize`).
    let byte_length_getter = ev.make_host_function("get byteLength", 0, Rc::new(|ev, this, _args| {
        let Value::Object(id) = this else { return Ok(Value::Number(0.0)) };
        Ok(match ev.heap().get(id) {
            HeapData::ArrayBuffer(b) => Value::Number(b.bytes.len() as f64),
            _ => Value::Number(0.0),
        })
    }));
    if let Some(obj) = ev.heap_mut().get_mut(proto).as_object_mut() {
        obj.set_own(
            PropertyKey::from_str("byteLength"),
            PropertyDescriptor::Accessor { get: Some(byte_length_getter), set: None, enumerable: false, configurable: true },
        );
    }

    let detached_getter = ev.make_host_function("get detached", 0, Rc::new(|ev, this, _args| {
        let Value::Object(id) = this else { return Ok(Value::Bool(false)) };
        Ok(match ev.heap().get(id) {
            HeapData::ArrayBuffer(b) => Value::Bool(b.detached),
            _ => Value::Bool(false),
        })
    }));
    if let Some(obj) = ev.heap_mut().get_mut(proto).as_object_mut() {
        obj.set_own(
            PropertyKey::from_str("detached"),
            PropertyDescriptor::Accessor { get: Some(detached_getter), set: None, enumerable: false, configurable: true },
        );
    }

    let ctor = ev.make_host_function("ArrayBuffer", 1, Rc::new(|ev, _this, args| {
        let len = ops::to_integer_or_infinity(ev, &arg(args, 0))?;
        if len < 0.0 {
            return ev.throw_range_error("Invalid array buffer length");
        }
        let max_byte_length = match arg(args, 1) {
            Value::Undefined => None,
            options => {
                let v = ev.get_property(options, "maxByteLength")?;
                if v.is_undefined() { None } else { Some(ops::to_integer_or_infinity(ev, &v)?.max(0.0) as usize) }
            }
        };
        let proto = ev.realm().array_buffer_proto;
        let id = ev.heap_mut().alloc(HeapData::ArrayBuffer(ArrayBufferData {
            object: JsObject::with_class(Some(proto), "ArrayBuffer"),
            bytes: vec![0; len as usize],
            max_byte_length,
            detached: false,
        }));
        Ok(Value::Object(id))
    }));
    let Value::Object(ctor_id) = &ctor else { unreachable!() };
    if let Some(obj) = ev.heap_mut().get_mut(*ctor_id).as_object_mut() {
        obj.set_own(PropertyKey::from_str("prototype"), PropertyDescriptor::non_enumerable(Value::Object(proto)));
    }
    if let Some(proto_obj) = ev.heap_mut().get_mut(proto).as_object_mut() {
        proto_obj.set_own(PropertyKey::from_str("constructor"), PropertyDescriptor::non_enumerable(ctor.clone()));
    }
    let ctor_id = *ctor_id;
    super::def_method(ev, ctor_id, "isView", 1, Rc::new(|ev, _this, args| {
        Ok(Value::Bool(matches!(args.first(), Some(Value::Object(id)) if matches!(ev.heap().get(*id), HeapData::TypedArray(_)))))
    }));
    let global = ev.global_object();
    let _ = ev.set_property(Value::Object(global), "ArrayBuffer", ctor);
}

// ---- TypedArray kinds -----------------------------------------------------

fn install_kind(ev: &mut Evaluator, kind: TypedArrayKind) {
    let proto = ev.realm().typed_array_protos[&kind];

    super::def_method(ev, proto, "at", 1, Rc::new(move |ev, this, args| {
        let len = length_of(ev, &this)?;
        let n = ops::to_integer_or_infinity(ev, &arg(args, 0))?;
        let idx = if n < 0.0 { n + len as f64 } else { n };
        if idx < 0.0 || idx >= len as f64 { Ok(Value::Undefined) } else { idx_get(ev, &this, idx as usize) }
    }));

    super::def_method(ev, proto, "fill", 3, Rc::new(move |ev, this, args| {
        let len = length_of(ev, &this)?;
        let value = coerce_element(ev, kind, &arg(args, 0))?;
        let start = super::array_builtin::relative_index(ev, &arg(args, 1), len, 0)? as usize;
        let end = super::array_builtin::relative_index(ev, &arg(args, 2), len, len as i64)? as usize;
        for i in start..end.max(start) {
            ev.set_property(this.clone(), &i.to_string(), value.clone())?;
        }
        Ok(this)
    }));

    super::def_method(ev, proto, "set", 2, Rc::new(move |ev, this, args| {
        let source = arg(args, 0);
        let offset = ops::to_integer_or_infinity(ev, &arg(args, 1))?.max(0.0) as usize;
        let items = ev.iterate_to_vec(source)?;
        for (i, item) in items.into_iter().enumerate() {
            let coerced = coerce_element(ev, kind, &item)?;
            ev.set_property(this.clone(), &(offset + i).to_string(), coerced)?;
        }
        Ok(Value::Undefined)
    }));

    super::def_method(ev, proto, "subarray", 2, Rc::new(move |ev, this, args| {
        let Value::Object(id) = &this else { return ev.throw_type_error("not a TypedArray") };
        let (buffer, byte_offset) = match ev.heap().get(*id) {
            HeapData::TypedArray(ta) => (ta.buffer, ta.byte_offset),
            _ => return ev.throw_type_error("not a TypedArray"),
        };
        let len = length_of(ev, &this)?;
        let start = super::array_builtin::relative_index(ev, &arg(args, 0), len, 0)? as usize;
        let end = super::array_builtin::relative_index(ev, &arg(args, 1), len, len as i64)? as usize;
        let bpe = kind.bytes_per_element();
        let new_offset = byte_offset + start * bpe;
        let new_len = end.saturating_sub(start);
        let proto = ev.realm().typed_array_protos[&kind];
        let new_id = ev.heap_mut().alloc(HeapData::TypedArray(TypedArrayData {
            object: JsObject::with_class(Some(proto), kind.constructor_name()),
            buffer,
            kind,
            byte_offset: new_offset,
            fixed_length: Some(new_len),
        }));
        Ok(Value::Object(new_id))
    }));

    super::def_method(ev, proto, "slice", 2, Rc::new(move |ev, this, args| {
        let len = length_of(ev, &this)?;
        let start = super::array_builtin::relative_index(ev, &arg(args, 0), len, 0)? as usize;
        let end = super::array_builtin::relative_index(ev, &arg(args, 1), len, len as i64)? as usize;
        let mut values = Vec::new();
        for i in start..end.max(start) {
            values.push(idx_get(ev, &this, i)?);
        }
        Ok(new_typed_array_of(ev, kind, values))
    }));

    super::def_method(ev, proto, "forEach", 1, Rc::new(move |ev, this, args| {
        let f = arg(args, 0);
        let len = length_of(ev, &this)?;
        for i in 0..len {
            let v = idx_get(ev, &this, i)?;
            ev.call_function(f.clone(), Value::Undefined, &[v, Value::Number(i as f64), this.clone()])?;
        }
        Ok(Value::Undefined)
    }));

    super::def_method(ev, proto, "map", 1, Rc::new(move |ev, this, args| {
        let f = arg(args, 0);
        let len = length_of(ev, &this)?;
        let mut out = Vec::with_capacity(len);
        for i in 0..len {
            let v = idx_get(ev, &this, i)?;
            out.push(ev.call_function(f.clone(), Value::Undefined, &[v, Value::Number(i as f64), this.clone()])?);
        }
        Ok(new_typed_array_of(ev, kind, out))
    }));

    super::def_method(ev, proto, "filter", 1, Rc::new(move |ev, this, args| {
        let f = arg(args, 0);
        let len = length_of(ev, &this)?;
        let mut out = Vec::new();
        for i in 0..len {
            let v = idx_get(ev, &this, i)?;
            let keep = ev.call_function(f.clone(), Value::Undefined, &[v.clone(), Value::Number(i as f64), this.clone()])?;
            if keep.to_boolean() {
                out.push(v);
            }
        }
        Ok(new_typed_array_of(ev, kind, out))
    }));

    super::def_method(ev, proto, "reduce", 2, Rc::new(|ev, this, args| {
        let f = arg(args, 0);
        let len = length_of(ev, &this)?;
        let mut iter = 0;
        let mut acc = match args.get(1) {
            Some(v) => v.clone(),
            None => {
                if len == 0 {
                    return ev.throw_type_error("Reduce of empty array with no initial value");
                }
                iter = 1;
                idx_get(ev, &this, 0)?
            }
        };
        for i in iter..len {
            let v = idx_get(ev, &this, i)?;
            acc = ev.call_function(f.clone(), Value::Undefined, &[acc, v, Value::Number(i as f64), this.clone()])?;
        }
        Ok(acc)
    }));

    super::def_method(ev, proto, "indexOf", 1, Rc::new(|ev, this, args| {
        let target = arg(args, 0);
        let len = length_of(ev, &this)?;
        for i in 0..len {
            if idx_get(ev, &this, i)?.strict_eq(&target) {
                return Ok(Value::Number(i as f64));
            }
        }
        Ok(Value::Number(-1.0))
    }));

    super::def_method(ev, proto, "lastIndexOf", 1, Rc::new(|ev, this, args| {
        let target = arg(args, 0);
        let len = length_of(ev, &this)?;
        for i in (0..len).rev() {
            if idx_get(ev, &this, i)?.strict_eq(&target) {
                return Ok(Value::Number(i as f64));
            }
        }
        Ok(Value::Number(-1.0))
    }));

    super::def_method(ev, proto, "includes", 1, Rc::new(|ev, this, args| {
        let target = arg(args, 0);
        let len = length_of(ev, &this)?;
        for i in 0..len {
            if crate::ops::same_value_zero(&idx_get(ev, &this, i)?, &target) {
                return Ok(Value::Bool(true));
            }
        }
        Ok(Value::Bool(false))
    }));

    super::def_method(ev, proto, "join", 1, Rc::new(|ev, this, args| {
        let sep_v = arg(args, 0);
        let sep = if sep_v.is_undefined() { ",".to_string() } else { ops::to_js_string(ev, &sep_v)?.to_string() };
        let len = length_of(ev, &this)?;
        let mut parts = Vec::with_capacity(len);
        for i in 0..len {
            parts.push(ops::to_js_string(ev, &idx_get(ev, &this, i)?)?.to_string());
        }
        Ok(Value::string(parts.join(&sep)))
    }));

    super::def_method(ev, proto, "reverse", 0, Rc::new(|ev, this, _args| {
        let len = length_of(ev, &this)?;
        let mut values = Vec::with_capacity(len);
        for i in 0..len {
            values.push(idx_get(ev, &this, i)?);
        }
        values.reverse();
        for (i, v) in values.into_iter().enumerate() {
            ev.set_property(this.clone(), &i.to_string(), v)?;
        }
        Ok(this)
    }));

    super::def_method(ev, proto, "sort", 1, Rc::new(move |ev, this, args| {
        let comparator = args.first().cloned().filter(|v| !v.is_undefined());
        let len = length_of(ev, &this)?;
        let mut values = Vec::with_capacity(len);
        for i in 0..len {
            values.push(idx_get(ev, &this, i)?);
        }
        super::array_builtin::sort_values(ev, &mut values, comparator.as_ref())?;
        for (i, v) in values.into_iter().enumerate() {
            ev.set_property(this.clone(), &i.to_string(), v)?;
        }
        Ok(this)
    }));

    super::def_method(ev, proto, "values", 0, Rc::new(|ev, this, _args| {
        let len = length_of(ev, &this)?;
        let mut items = Vec::with_capacity(len);
        for i in 0..len {
            items.push(idx_get(ev, &this, i)?);
        }
        Ok(super::array_builtin::make_array_iterator(ev, items))
    }));
    let iterator_sym = ev.symbols().iterator.clone();
    let values_fn = ev.get_property(Value::Object(proto), "values").expect("just installed");
    if let Some(obj) = ev.heap_mut().get_mut(proto).as_object_mut() {
        obj.set_own(PropertyKey::symbol(iterator_sym), PropertyDescriptor::builtin_method(values_fn));
    }

    let length_getter = ev.make_host_function("get length", 0, Rc::new(|ev, this, _args| {
        let Value::Object(id) = this else { return Ok(Value::Number(0.0)) };
        Ok(Value::Number(ev.heap().typed_array_length(id) as f64))
    }));
    if let Some(obj) = ev.heap_mut().get_mut(proto).as_object_mut() {
        obj.set_own(
            PropertyKey::from_str("length"),
            PropertyDescriptor::Accessor { get: Some(length_getter), set: None, enumerable: false, configurable: true },
        );
    }

    // ---- constructor ---------------------------------------------------

    let ctor = ev.make_host_function(kind.constructor_name(), 1, Rc::new(move |ev, _this, args| construct_typed_array(ev, kind, args)));
    let Value::Object(ctor_id) = &ctor else { unreachable!() };
    if let Some(obj) = ev.heap_mut().get_mut(*ctor_id).as_object_mut() {
        obj.set_own(PropertyKey::from_str("prototype"), PropertyDescriptor::non_enumerable(Value::Object(proto)));
        obj.set_own(PropertyKey::from_str("BYTES_PER_ELEMENT"), PropertyDescriptor::non_enumerable(Value::Number(kind.bytes_per_element() as f64)));
    }
    if let Some(proto_obj) = ev.heap_mut().get_mut(proto).as_object_mut() {
        proto_obj.set_own(PropertyKey::from_str("constructor"), PropertyDescriptor::non_enumerable(ctor.clone()));
    }
    let ctor_id = *ctor_id;
    super::def_method(ev, ctor_id, "of", 0, Rc::new(move |ev, _this, args| Ok(new_typed_array_of(ev, kind, args.to_vec()))));
    super::def_method(ev, ctor_id, "from", 1, Rc::new(move |ev, _this, args| {
        let source = arg(args, 0);
        let map_fn = args.get(1).cloned();
        let items = ev.iterate_to_vec(source)?;
        let mut out = Vec::with_capacity(items.len());
        for (i, item) in items.into_iter().enumerate() {
            out.push(match &map_fn {
                Some(f) => ev.call_function(f.clone(), Value::Undefined, &[item, Value::Number(i as f64)])?,
                None => item,
            });
        }
        Ok(new_typed_array_of(ev, kind, out))
    }));

    let global = ev.global_object();
    let _ = ev.set_property(Value::Object(global), kind.constructor_name(), ctor);
}

/// `new Int8Array(length | typedArray | arrayLike | buffer, ...)` (`§4.7`):
/// covers all four overloads `§4.6` "TypedArrays" lists, always allocating a
/// fresh backing `ArrayBuffer` except for the explicit-buffer form.
fn construct_typed_array(ev: &mut Evaluator, kind: TypedArrayKind, args: &[Value]) -> RunResult<Value> {
    let bpe = kind.bytes_per_element();
    match args.first() {
        None => Ok(new_typed_array_of(ev, kind, Vec::new())),
        Some(Value::Number(n)) => {
            if *n < 0.0 || n.fract() != 0.0 {
                return ev.throw_range_error("Invalid typed array length");
            }
            let len = *n as usize;
            let proto = ev.realm().typed_array_protos[&kind];
            let buffer_proto = ev.realm().array_buffer_proto;
            let buffer = ev.heap_mut().alloc(HeapData::ArrayBuffer(ArrayBufferData {
                object: JsObject::with_class(Some(buffer_proto), "ArrayBuffer"),
                bytes: vec![0; len * bpe],
                max_byte_length: None,
                detached: false,
            }));
            let id = ev.heap_mut().alloc(HeapData::TypedArray(TypedArrayData {
                object: JsObject::with_class(Some(proto), kind.constructor_name()),
                buffer,
                kind,
                byte_offset: 0,
                fixed_length: Some(len),
            }));
            Ok(Value::Object(id))
        }
        Some(Value::Object(id)) if matches!(ev.heap().get(*id), HeapData::ArrayBuffer(_)) => {
            let buffer = *id;
            let buf_len = match ev.heap().get(buffer) {
                HeapData::ArrayBuffer(b) => b.bytes.len(),
                _ => 0,
            };
            let byte_offset = args.get(1).filter(|v| !v.is_undefined()).map(|v| ops::to_integer_or_infinity(ev, v)).transpose()?.unwrap_or(0.0).max(0.0) as usize;
            let fixed_length = match args.get(2) {
                Some(v) if !v.is_undefined() => Some(ops::to_integer_or_infinity(ev, v)?.max(0.0) as usize),
                _ => {
                    if (buf_len.saturating_sub(byte_offset)) % bpe != 0 {
                        return ev.throw_range_error("byte length of ArrayBuffer minus the byteOffset must be a multiple of the element size");
                    }
                    None
                }
            };
            let proto = ev.realm().typed_array_protos[&kind];
            let id = ev.heap_mut().alloc(HeapData::TypedArray(TypedArrayData {
                object: JsObject::with_class(Some(proto), kind.constructor_name()),
                buffer,
                kind,
                byte_offset,
                fixed_length,
            }));
            Ok(Value::Object(id))
        }
        Some(source) => {
            let source = source.clone();
            let items = match ev.iterate_to_vec(source.clone()) {
                Ok(v) => v,
                Err(_) => {
                    let len_v = ev.get_property(source.clone(), "length")?;
                    let len = ops::to_integer_or_infinity(ev, &len_v)?.max(0.0) as usize;
                    (0..len).map(|i| ev.get_property(source.clone(), &i.to_string())).collect::<RunResult<Vec<_>>>()?
                }
            };
            Ok(new_typed_array_of(ev, kind, items))
        }
    }
}

fn new_typed_array_of(ev: &mut Evaluator, kind: TypedArrayKind, values: Vec<Value>) -> Value {
    let bpe = kind.bytes_per_element();
    let proto = ev.realm().typed_array_protos[&kind];
    let buffer_proto = ev.realm().array_buffer_proto;
    let buffer = ev.heap_mut().alloc(HeapData::ArrayBuffer(ArrayBufferData {
        object: JsObject::with_class(Some(buffer_proto), "ArrayBuffer"),
        bytes: vec![0; values.len() * bpe],
        max_byte_length: None,
        detached: false,
    }));
    let id = ev.heap_mut().alloc(HeapData::TypedArray(TypedArrayData {
        object: JsObject::with_class(Some(proto), kind.constructor_name()),
        buffer,
        kind,
        byte_offset: 0,
        fixed_length: Some(values.len()),
    }));
    for (i, v) in values.into_iter().enumerate() {
        if let Ok(Value::Number(n)) = coerce_element(ev, kind, &v) {
            ev.heap_mut().typed_array_set(id, i, n);
        }
    }
    Value::Object(id)
}

/// Coerces an arbitrary argument to the `f64` raw form `typed_array_set`
/// expects, per element kind (`§4.6` "TypedArrays" numeric coercion).
fn coerce_element(ev: &mut Evaluator, _kind: TypedArrayKind, value: &Value) -> RunResult<Value> {
    let n = ops::to_number(ev, value)?;
    Ok(Value::Number(n))
}

pub(crate) fn install(ev: &mut Evaluator) {
    install_array_buffer(ev);
    for kind in [
        TypedArrayKind::Int8,
        TypedArrayKind::Uint8,
        TypedArrayKind::Uint8Clamped,
        TypedArrayKind::Int16,
        TypedArrayKind::Uint16,
        TypedArrayKind::Int32,
        TypedArrayKind::Uint32,
        TypedArrayKind::Float32,
        TypedArrayKind::Float64,
        TypedArrayKind::BigInt64,
        TypedArrayKind::BigUint64,
    ] {
        install_kind(ev, kind);
    }
}

#[cfg(test)]
mod tests {
    use crate::engine::Engine;
    use crate::value::Value;

    #[test]
    fn constructs_from_length_and_indexes() {
        let mut engine = Engine::new();
        let result = engine.evaluate("const a = new Uint8Array(4); a[0] = 5; a[1] = 300; a.length").unwrap();
        assert!(matches!(result, Value::Number(n) if n == 4.0));
    }

    #[test]
    fn map_preserves_kind_and_length() {
        let mut engine = Engine::new();
        let result = engine.evaluate("const a = new Int32Array([1, 2, 3]); a.map(x => x * 2).join(',')").unwrap();
        assert!(matches!(result, Value::String(s) if &*s == "2,4,6"));
    }

    #[test]
    fn subarray_shares_buffer() {
        let mut engine = Engine::new();
        let result = engine.evaluate("const a = new Uint8Array([1,2,3,4]); const b = a.subarray(1,3); b[0] = 9; a[1]").unwrap();
        assert!(matches!(result, Value::Number(n) if n == 9.0));
    }
}
