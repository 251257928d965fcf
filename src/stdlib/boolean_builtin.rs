//! `Boolean` constructor and prototype (`§4.7`).

use std::rc::Rc;

use crate::object::{PropertyDescriptor, PropertyKey};
use crate::value::Value;

use crate::evaluator::Evaluator;

pub(crate) fn install(ev: &mut Evaluator) {
    let proto = ev.realm().boolean_proto;

    super::def_method(ev, proto, "toString", 0, Rc::new(|_ev, this, _args| {
        Ok(Value::string(if this.to_boolean() { "true" } else { "false" }))
    }));
    super::def_method(ev, proto, "valueOf", 0, Rc::new(|_ev, this, _args| Ok(Value::Bool(this.to_boolean()))));

    let ctor = ev.make_host_function("Boolean", 1, Rc::new(|_ev, _this, args| {
        Ok(Value::Bool(args.first().is_some_and(Value::to_boolean)))
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
    let _ = ev.set_property(Value::Object(global), "Boolean", ctor);
}
