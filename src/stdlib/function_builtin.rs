//! `Function` constructor and `Function.prototype` (`§4.7`).
//!
//! `call`/`apply`/`bind` are the only three methods every other value in
//! the engine already assumes exist (`Callable::Bound` in `function.rs` was
//! allocated and unwrapped by `evaluator::calls::call_function` from the
//! start, waiting for something to actually construct one). `new
//! Function(...)` compiles its body the same way `eval` does, against the
//! global environment rather than the caller's, matching ordinary
//! `Function` constructor scoping.

use std::rc::Rc;

use crate::function::{Callable, FunctionData, FunctionKind, ThisMode};
use crate::heap::HeapData;
use crate::object::{JsObject, PropertyDescriptor, PropertyKey};
use crate::ops;
use crate::value::Value;

use crate::evaluator::Evaluator;

fn arg(args: &[Value], i: usize) -> Value {
    args.get(i).cloned().unwrap_or(Value::Undefined)
}

/// Reads an array-like's elements through ordinary property gets, the way
/// `Array.prototype` methods already treat their `this` (`§4.7` "Methods
/// are specified to match the behaviors used by the test suite").
fn array_like_to_vec(ev: &mut Evaluator, value: &Value) -> Result<Vec<Value>, crate::exception::Exception> {
    if matches!(value, Value::Undefined | Value::Null) {
        return Ok(Vec::new());
    }
    let len_value = ev.get_property(value.clone(), "length")?;
    let len = ops::to_number(ev, &len_value)?;
    let len = if len.is_nan() || len <= 0.0 { 0 } else { len as usize };
    let mut out = Vec::with_capacity(len);
    for i in 0..len {
        out.push(ev.get_property(value.clone(), &i.to_string())?);
    }
    Ok(out)
}

pub(crate) fn install(ev: &mut Evaluator) {
    let proto = ev.realm().function_proto;

    super::def_method(ev, proto, "call", 1, Rc::new(|ev, this, args| {
        let bound_this = arg(args, 0);
        let rest = if args.is_empty() { &[][..] } else { &args[1..] };
        ev.call_function(this, bound_this, rest)
    }));

    super::def_method(ev, proto, "apply", 2, Rc::new(|ev, this, args| {
        let bound_this = arg(args, 0);
        let arg_list = array_like_to_vec(ev, &arg(args, 1))?;
        ev.call_function(this, bound_this, &arg_list)
    }));

    super::def_method(ev, proto, "bind", 1, Rc::new(|ev, this, args| {
        let Value::Object(target) = this else {
            return ev.throw_type_error("Bind must be called on a function");
        };
        if !matches!(ev.heap().get(target), HeapData::Function(_)) {
            return ev.throw_type_error("Bind must be called on a function");
        }
        let bound_this = arg(args, 0);
        let bound_args = if args.is_empty() { Vec::new() } else { args[1..].to_vec() };
        let target_name = match ev.heap().get(target) {
            HeapData::Function(f) => f.name.to_string(),
            _ => String::new(),
        };
        let func_proto = ev.realm().function_proto;
        let mut object = JsObject::with_class(Some(func_proto), "Function");
        object.set_own(PropertyKey::from_str("name"), PropertyDescriptor::non_enumerable(Value::string(format!("bound {target_name}"))));
        object.set_own(PropertyKey::from_str("length"), PropertyDescriptor::non_enumerable(Value::Number(0.0)));
        let data = FunctionData {
            object,
            name: Rc::from(format!("bound {target_name}").as_str()),
            kind: FunctionKind::Normal,
            this_mode: ThisMode::Dynamic,
            is_async: false,
            is_generator: false,
            callable: Callable::Bound { target, bound_this, bound_args },
            home_object: None,
            parent_constructor: None,
            class_fields: None,
        };
        Ok(Value::Object(ev.heap_mut().alloc(HeapData::Function(data))))
    }));

    super::def_method(ev, proto, "toString", 0, Rc::new(|ev, this, _args| {
        let name = match &this {
            Value::Object(id) => match ev.heap().get(*id) {
                HeapData::Function(f) => f.display_name().to_string(),
                _ => String::new(),
            },
            _ => String::new(),
        };
        Ok(Value::string(format!("function {name}() {{ [native code] }}")))
    }));

    let ctor = ev.make_host_function("Function", 1, Rc::new(|ev, _this, args| {
        let body = args.last().map(|v| ops::to_js_string(ev, v)).transpose()?.unwrap_or_else(|| Rc::from(""));
        let mut params = Vec::new();
        for a in args.iter().take(args.len().saturating_sub(1)) {
            params.push(ops::to_js_string(ev, a)?.to_string());
        }
        let source = format!("(function anonymous({}) {{\n{}\n}})", params.join(","), body);
        let global_env = ev.global_env();
        ev.eval_as_function_body(&source, global_env)
    }));
    let global = ev.global_object();
    if let Value::Object(ctor_id) = &ctor {
        if let Some(obj) = ev.heap_mut().get_mut(*ctor_id).as_object_mut() {
            obj.set_own(PropertyKey::from_str("prototype"), PropertyDescriptor::non_enumerable(Value::Object(proto)));
        }
        if let Some(proto_obj) = ev.heap_mut().get_mut(proto).as_object_mut() {
            proto_obj.set_own(PropertyKey::from_str("constructor"), PropertyDescriptor::non_enumerable(ctor.clone()));
        }
    }
    let _ = ev.set_property(Value::Object(global), "Function", ctor);
}
