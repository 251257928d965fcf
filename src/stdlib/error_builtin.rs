//! `Error` and its built-in subclasses (`§4.7`): one shared prototype
//! toString, one constructor factory instantiated per [`ExcType`] so
//! `TypeError`/`RangeError`/etc. each get their own constructor function
//! while sharing the `message`/`name`/`stack` assignment `make_error_value`
//! already performs for engine-raised throws.

use std::rc::Rc;

use crate::exception::ExcType;
use crate::object::{PropertyDescriptor, PropertyKey};
use crate::value::Value;

use crate::evaluator::Evaluator;

fn install_one(ev: &mut Evaluator, kind: ExcType) {
    let proto = ev.realm().error_protos[&kind];

    super::def_method(ev, proto, "toString", 0, Rc::new(|ev, this, _args| {
        let name = ev.get_property(this.clone(), "name")?;
        let name = crate::ops::to_js_string(ev, &name)?;
        let message = ev.get_property(this, "message")?;
        let message = crate::ops::to_js_string(ev, &message)?;
        if message.is_empty() {
            Ok(Value::string(name.to_string()))
        } else {
            Ok(Value::string(format!("{name}: {message}")))
        }
    }));
    super::def_value(ev, proto, "name", Value::string(kind.name()));
    super::def_value(ev, proto, "message", Value::string(""));

    let ctor = ev.make_host_function(kind.name(), 1, Rc::new(move |ev, this, args| {
        let message = match args.first() {
            Some(v) if !v.is_undefined() => crate::ops::to_js_string(ev, v)?.to_string(),
            _ => String::new(),
        };
        // `new TypeError(msg)` and plain `TypeError(msg)` both build a fresh
        // error object rather than coercing `this` (`§4.7`); a subclass
        // constructor calling `super(msg)` supplies its own instance as
        // `this` instead, so that path writes the properties in place.
        let target = match this {
            Value::Object(id) => Value::Object(id),
            _ => {
                let error = ev.make_error_value(kind, message.clone());
                return Ok(configure_cause(ev, error, args));
            }
        };
        ev.set_property(target.clone(), "message", Value::string(message))?;
        ev.set_property(target.clone(), "name", Value::string(kind.name()))?;
        let stack_name = crate::ops::to_js_string(ev, &ev.get_property(target.clone(), "name")?)?;
        let stack_msg = crate::ops::to_js_string(ev, &ev.get_property(target.clone(), "message")?)?;
        let stack = if stack_msg.is_empty() { stack_name.to_string() } else { format!("{stack_name}: {stack_msg}") };
        ev.set_property(target.clone(), "stack", Value::string(stack))?;
        Ok(configure_cause(ev, target, args))
    }));
    let Value::Object(ctor_id) = &ctor else { unreachable!() };
    if let Some(obj) = ev.heap_mut().get_mut(*ctor_id).as_object_mut() {
        obj.set_own(PropertyKey::from_str("prototype"), PropertyDescriptor::non_enumerable(Value::Object(proto)));
    }
    if let Some(proto_obj) = ev.heap_mut().get_mut(proto).as_object_mut() {
        proto_obj.set_own(PropertyKey::from_str("constructor"), PropertyDescriptor::non_enumerable(ctor.clone()));
    }
    let global = ev.global_object();
    let _ = ev.set_property(Value::Object(global), kind.name(), ctor);
}

/// `new Error(msg, { cause })` (`§4.7`): copies `options.cause` onto the new
/// error if present, a no-op otherwise.
fn configure_cause(ev: &mut Evaluator, error: Value, args: &[Value]) -> Value {
    if let Some(options) = args.get(1) {
        if let Ok(cause) = ev.get_property(options.clone(), "cause") {
            if !matches!(options, Value::Undefined | Value::Null) {
                let _ = ev.set_property(error.clone(), "cause", cause);
            }
        }
    }
    error
}

pub(crate) fn install(ev: &mut Evaluator) {
    install_one(ev, ExcType::Error);
    for kind in [ExcType::TypeError, ExcType::RangeError, ExcType::ReferenceError, ExcType::SyntaxError, ExcType::EvalError, ExcType::UriError] {
        install_one(ev, kind);
    }
}
