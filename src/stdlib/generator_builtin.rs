//! `Generator.prototype` (`§4.6` "Generators": "returns an iterator with
//! `next(value)`, `return(value)`, `throw(value)`").
//!
//! Every method here just unwraps its `this` down to the `HeapId` the
//! actual driver functions in `evaluator/generator.rs` already take, then
//! repackages their `(value, done)` pair as a `{value, done}` object the
//! way `array_builtin::make_array_iterator`'s `next` does.

use std::rc::Rc;

use crate::heap::HeapData;
use crate::value::Value;

use crate::evaluator::Evaluator;

fn generator_id(ev: &mut Evaluator, this: &Value) -> Result<crate::heap::HeapId, crate::exception::Exception> {
    if let Value::Object(id) = this {
        if matches!(ev.heap().get(*id), HeapData::Generator(_)) {
            return Ok(*id);
        }
    }
    ev.throw_type_error("method called on incompatible receiver")
}

fn make_result(ev: &mut Evaluator, value: Value, done: bool) -> Value {
    let result = ev.new_plain_object();
    let _ = ev.set_property(Value::Object(result), "value", value);
    let _ = ev.set_property(Value::Object(result), "done", Value::Bool(done));
    Value::Object(result)
}

pub(crate) fn install(ev: &mut Evaluator) {
    let proto = ev.realm().generator_proto;

    super::def_method(ev, proto, "next", 1, Rc::new(|ev, this, _args| {
        let id = generator_id(ev, &this)?;
        let (value, done) = crate::evaluator::generator::next(ev, id)?;
        Ok(make_result(ev, value, done))
    }));

    super::def_method(ev, proto, "return", 1, Rc::new(|ev, this, args| {
        let id = generator_id(ev, &this)?;
        let value = args.first().cloned().unwrap_or(Value::Undefined);
        let (value, done) = crate::evaluator::generator::return_(ev, id, value)?;
        Ok(make_result(ev, value, done))
    }));

    super::def_method(ev, proto, "throw", 1, Rc::new(|ev, this, args| {
        let id = generator_id(ev, &this)?;
        let value = args.first().cloned().unwrap_or(Value::Undefined);
        let (value, done) = crate::evaluator::generator::throw(ev, id, value)?;
        Ok(make_result(ev, value, done))
    }));

    let iterator_sym = ev.symbols().iterator.clone();
    let self_fn = ev.make_host_function("[Symbol.iterator]", 0, Rc::new(|_ev, this, _args| Ok(this)));
    if let Some(obj) = ev.heap_mut().get_mut(proto).as_object_mut() {
        obj.set_own(crate::object::PropertyKey::symbol(iterator_sym), crate::object::PropertyDescriptor::builtin_method(self_fn));
    }
}
