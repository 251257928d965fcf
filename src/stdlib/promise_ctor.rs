//! `Promise` constructor, prototype methods, and statics (`§4.7`/`§4.8`).
//!
//! The actual settlement machinery (reaction scheduling, the thenable
//! adoption job, `await`'s blocking-drive fallback) lives in
//! `evaluator::promise`; this module only wires guest-callable surface onto
//! it through the thin delegating methods `Evaluator` exposes for that
//! private submodule.

use std::cell::Cell;
use std::rc::Rc;

use crate::exception::ExcType;
use crate::heap::HeapData;
use crate::object::{PropertyDescriptor, PropertyKey};
use crate::value::Value;

use crate::evaluator::Evaluator;

fn arg(args: &[Value], i: usize) -> Value {
    args.get(i).cloned().unwrap_or(Value::Undefined)
}

pub(crate) fn install(ev: &mut Evaluator) {
    let proto = ev.realm().promise_proto;

    super::def_method(ev, proto, "then", 2, Rc::new(|ev, this, args| {
        let Value::Object(id) = this else { return ev.throw_type_error("Promise.prototype.then called on non-Promise") };
        if !matches!(ev.heap().get(id), HeapData::Promise(_)) {
            return ev.throw_type_error("Promise.prototype.then called on non-Promise");
        }
        let on_fulfilled = Some(arg(args, 0)).filter(|v| !v.is_undefined());
        let on_rejected = Some(arg(args, 1)).filter(|v| !v.is_undefined());
        let result = ev.promise_then(id, on_fulfilled, on_rejected);
        Ok(Value::Object(result))
    }));

    super::def_method(ev, proto, "catch", 1, Rc::new(|ev, this, args| {
        let then = ev.get_property(this.clone(), "then")?;
        ev.call_function(then, this, &[Value::Undefined, arg(args, 0)])
    }));

    super::def_method(ev, proto, "finally", 1, Rc::new(|ev, this, args| {
        let on_finally = arg(args, 0);
        let is_callable = ev.heap().is_callable_value(&on_finally);
        let then = ev.get_property(this.clone(), "then")?;
        if !is_callable {
            return ev.call_function(then, this, &[on_finally.clone(), on_finally]);
        }
        let on_finally_ok = on_finally.clone();
        let wrapped_fulfilled = ev.make_host_function("", 1, Rc::new(move |ev, _this, args| {
            ev.call_function(on_finally_ok.clone(), Value::Undefined, &[])?;
            Ok(arg(args, 0))
        }));
        let on_finally_err = on_finally;
        let wrapped_rejected = ev.make_host_function("", 1, Rc::new(move |ev, _this, args| {
            ev.call_function(on_finally_err.clone(), Value::Undefined, &[])?;
            Err(ev.make_exception(arg(args, 0)))
        }));
        ev.call_function(then, this, &[wrapped_fulfilled, wrapped_rejected])
    }));

    // ---- constructor ---------------------------------------------------

    let ctor = ev.make_host_function("Promise", 1, Rc::new(|ev, _this, args| {
        let executor = arg(args, 0);
        if !ev.heap().is_callable_value(&executor) {
            return ev.throw_type_error("Promise resolver is not a function");
        }
        let id = ev.new_promise();
        let resolve = make_settle_fn(ev, id, true);
        let reject = make_settle_fn(ev, id, false);
        if let Err(e) = ev.call_function(executor, Value::Undefined, &[resolve, reject]) {
            ev.reject_promise(id, e.value);
        }
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

    super::def_method(ev, ctor_id, "resolve", 1, Rc::new(|ev, _this, args| Ok(Value::Object(ev.promise_resolve(arg(args, 0))))));

    super::def_method(ev, ctor_id, "reject", 1, Rc::new(|ev, _this, args| {
        let id = ev.new_promise();
        ev.reject_promise(id, arg(args, 0));
        Ok(Value::Object(id))
    }));

    super::def_method(ev, ctor_id, "all", 1, Rc::new(|ev, _this, args| combinator(ev, arg(args, 0), Combinator::All)));
    super::def_method(ev, ctor_id, "allSettled", 1, Rc::new(|ev, _this, args| combinator(ev, arg(args, 0), Combinator::AllSettled)));
    super::def_method(ev, ctor_id, "race", 1, Rc::new(|ev, _this, args| combinator(ev, arg(args, 0), Combinator::Race)));
    super::def_method(ev, ctor_id, "any", 1, Rc::new(|ev, _this, args| combinator(ev, arg(args, 0), Combinator::Any)));

    let global = ev.global_object();
    let _ = ev.set_property(Value::Object(global), "Promise", ctor);
}

fn make_settle_fn(ev: &mut Evaluator, id: crate::heap::HeapId, is_resolve: bool) -> Value {
    let name = if is_resolve { "resolve" } else { "reject" };
    ev.make_host_function(name, 1, Rc::new(move |ev, _this, args| {
        let value = arg(args, 0);
        if is_resolve {
            ev.resolve_promise(id, value);
        } else {
            ev.reject_promise(id, value);
        }
        Ok(Value::Undefined)
    }))
}

#[derive(Clone, Copy)]
enum Combinator {
    All,
    AllSettled,
    Race,
    Any,
}

/// Shared machinery for `Promise.all`/`allSettled`/`race`/`any` (`§4.7`):
/// iterates `iterable` eagerly into a `Vec`, then attaches a `then` reaction
/// to every entry (coerced via [`Evaluator::promise_resolve`]) that fills in
/// a results slot and resolves/rejects the combined promise once the
/// relevant stopping condition is met.
fn combinator(ev: &mut Evaluator, iterable: Value, kind: Combinator) -> crate::exception::RunResult<Value> {
    let items = ev.iterate_to_vec(iterable)?;
    let result = ev.new_promise();
    if items.is_empty() {
        match kind {
            Combinator::All | Combinator::AllSettled => ev.resolve_promise(result, Value::Object(ev.new_array(Vec::new()))),
            Combinator::Race => {}
            Combinator::Any => {
                let err = ev.make_error_value(ExcType::Error, "All promises were rejected".to_string());
                ev.reject_promise(result, err);
            }
        }
        return Ok(Value::Object(result));
    }
    let total = items.len();
    let slots: Rc<std::cell::RefCell<Vec<Value>>> = Rc::new(std::cell::RefCell::new(vec![Value::Undefined; total]));
    let remaining = Rc::new(Cell::new(total));
    for (index, item) in items.into_iter().enumerate() {
        let promise_id = ev.promise_resolve(item);
        let slots_ok = slots.clone();
        let remaining_ok = remaining.clone();
        let on_fulfilled = ev.make_host_function("", 1, Rc::new(move |ev, _this, args| {
            let value = arg(args, 0);
            match kind {
                Combinator::Race | Combinator::Any => ev.resolve_promise(result, value),
                Combinator::All => {
                    slots_ok.borrow_mut()[index] = value;
                    remaining_ok.set(remaining_ok.get() - 1);
                    if remaining_ok.get() == 0 {
                        let arr = ev.new_array(slots_ok.borrow().iter().cloned().map(Some).collect());
                        ev.resolve_promise(result, Value::Object(arr));
                    }
                }
                Combinator::AllSettled => {
                    let entry = ev.new_plain_object();
                    let _ = ev.set_property(Value::Object(entry), "status", Value::string("fulfilled"));
                    let _ = ev.set_property(Value::Object(entry), "value", value);
                    slots_ok.borrow_mut()[index] = Value::Object(entry);
                    remaining_ok.set(remaining_ok.get() - 1);
                    if remaining_ok.get() == 0 {
                        let arr = ev.new_array(slots_ok.borrow().iter().cloned().map(Some).collect());
                        ev.resolve_promise(result, Value::Object(arr));
                    }
                }
            }
            Ok(Value::Undefined)
        }));
        let slots_err = slots.clone();
        let remaining_err = remaining.clone();
        let on_rejected = ev.make_host_function("", 1, Rc::new(move |ev, _this, args| {
            let reason = arg(args, 0);
            match kind {
                Combinator::All => ev.reject_promise(result, reason),
                Combinator::Race => ev.reject_promise(result, reason),
                Combinator::AllSettled => {
                    let entry = ev.new_plain_object();
                    let _ = ev.set_property(Value::Object(entry), "status", Value::string("rejected"));
                    let _ = ev.set_property(Value::Object(entry), "reason", reason);
                    slots_err.borrow_mut()[index] = Value::Object(entry);
                    remaining_err.set(remaining_err.get() - 1);
                    if remaining_err.get() == 0 {
                        let arr = ev.new_array(slots_err.borrow().iter().cloned().map(Some).collect());
                        ev.resolve_promise(result, Value::Object(arr));
                    }
                }
                Combinator::Any => {
                    slots_err.borrow_mut()[index] = reason;
                    remaining_err.set(remaining_err.get() - 1);
                    if remaining_err.get() == 0 {
                        let errors = ev.new_array(slots_err.borrow().iter().cloned().map(Some).collect());
                        let aggregate = ev.make_error_value(ExcType::Error, "All promises were rejected".to_string());
                        let _ = ev.set_property(aggregate.clone(), "errors", Value::Object(errors));
                        ev.reject_promise(result, aggregate);
                    }
                }
            }
            Ok(Value::Undefined)
        }));
        ev.promise_then(promise_id, Some(on_fulfilled), Some(on_rejected));
    }
    Ok(Value::Object(result))
}

#[cfg(test)]
mod tests {
    use crate::engine::Engine;
    use crate::value::Value;

    #[test]
    fn then_chain_resolves() {
        let mut engine = Engine::new();
        engine
            .evaluate("globalThis.result = undefined; Promise.resolve(1).then(v => v + 1).then(v => { globalThis.result = v; });")
            .expect("evaluate");
        let result = engine.get_property(Value::Object(engine.global_object()), "result").expect("global");
        assert!(matches!(result, Value::Number(n) if n == 2.0));
    }

    #[test]
    fn all_settled_never_rejects() {
        let mut engine = Engine::new();
        engine
            .evaluate(
                "globalThis.out = undefined; Promise.allSettled([Promise.resolve(1), Promise.reject('x')]).then(arr => { globalThis.out = arr.length; });",
            )
            .expect("evaluate");
        let result = engine.get_property(Value::Object(engine.global_object()), "out").expect("global");
        assert!(matches!(result, Value::Number(n) if n == 2.0));
    }

    #[test]
    fn race_settles_with_first() {
        let mut engine = Engine::new();
        engine
            .evaluate("globalThis.out = undefined; Promise.race([Promise.resolve('first'), Promise.resolve('second')]).then(v => { globalThis.out = v; });")
            .expect("evaluate");
        let result = engine.get_property(Value::Object(engine.global_object()), "out").expect("global");
        assert!(matches!(result, Value::String(s) if &*s == "first"));
    }
}
