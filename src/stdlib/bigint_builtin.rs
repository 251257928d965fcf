//! `BigInt` constructor and prototype (`§4.7`, `§3` "Runtime Values").
//!
//! `§4.6`'s "operator coercion rules including BigInt restrictions" already
//! forbid implicit `Number`/`BigInt` mixing everywhere else; the
//! constructor is the one place an explicit, deliberate conversion from a
//! `Number` or digit string is allowed through.

use std::rc::Rc;

use num_bigint::BigInt;

use crate::object::{PropertyDescriptor, PropertyKey};
use crate::value::Value;

use crate::evaluator::Evaluator;

pub(crate) fn install(ev: &mut Evaluator) {
    let proto = ev.realm().bigint_proto;

    super::def_method(ev, proto, "toString", 0, Rc::new(|_ev, this, _args| match &this {
        Value::BigInt(b) => Ok(Value::string(b.to_string())),
        _ => Ok(Value::string("0")),
    }));
    super::def_method(ev, proto, "valueOf", 0, Rc::new(|ev, this, _args| match this {
        Value::BigInt(_) => Ok(this),
        _ => ev.throw_type_error("BigInt.prototype.valueOf called on incompatible receiver"),
    }));

    let ctor = ev.make_host_function("BigInt", 1, Rc::new(|ev, _this, args| {
        let value = args.first().cloned().unwrap_or(Value::Undefined);
        match value {
            Value::BigInt(_) => Ok(value),
            Value::Number(n) => {
                if n.fract() != 0.0 || !n.is_finite() {
                    return ev.throw_range_error("The number is not a safe integer");
                }
                Ok(Value::BigInt(Rc::new(BigInt::from(n as i64))))
            }
            Value::String(s) => {
                let trimmed = s.trim();
                match trimmed.parse::<BigInt>() {
                    Ok(b) => Ok(Value::BigInt(Rc::new(b))),
                    Err(_) => {
                        let error = ev.make_error_value(crate::exception::ExcType::SyntaxError, format!("Cannot convert {trimmed} to a BigInt"));
                        Err(ev.make_exception(error))
                    }
                }
            }
            Value::Bool(b) => Ok(Value::BigInt(Rc::new(BigInt::from(if b { 1i64 } else { 0i64 })))),
            _ => ev.throw_type_error("Cannot convert value to a BigInt"),
        }
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
    let _ = ev.set_property(Value::Object(global), "BigInt", ctor);
}
