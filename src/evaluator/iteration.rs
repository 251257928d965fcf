//! Iterator protocol consumption (`for...of`, spread, destructuring,
//! `yield*`), `for...in` enumeration, and generator-value construction
//! (`§4.6` "Iteration protocol", "Generators").
//!
//! Consistent with the generator driver's "eager drive" trade-off
//! (`generator.rs`), every consumer here also materializes the whole
//! sequence up front via [`iterate_to_vec`] rather than pulling one value at
//! a time through a live iterator object — see `DESIGN.md` ("Iteration") for
//! what this gives up: an early `break`/`return` out of a `for...of` won't
//! call the iterator's own `.return()` to let it clean up, and a genuinely
//! infinite custom iterable hangs instead of yielding lazily.

use std::rc::Rc;

use crate::ast::{ForBindingKind, ForInOf, FunctionBody, Param, VarKind};
use crate::exception::RunResult;
use crate::heap::{GeneratorData, GeneratorStatus, HeapData, HeapId};
use crate::object::{JsObject, PropertyDescriptor, PropertyKey};
use crate::value::Value;

use super::{Completion, Evaluator};

/// Realizes any iterable value into a plain `Vec<Value>`: arrays walk their
/// own elements directly, strings iterate by Unicode scalar value, and
/// everything else goes through `[Symbol.iterator]()` + repeated `next()`
/// calls, covering generators, Maps/Sets, and user-defined iterables alike.
pub(crate) fn iterate_to_vec(ev: &mut Evaluator, value: Value) -> RunResult<Vec<Value>> {
    match &value {
        Value::String(s) => return Ok(s.chars().map(|c| Value::string(c.to_string())).collect()),
        Value::Object(id) => {
            if let HeapData::Array(arr) = ev.heap().get(*id) {
                return Ok(arr.elements.iter().map(|slot| slot.clone().unwrap_or(Value::Undefined)).collect());
            }
            if super::generator::is_generator(ev, *id) {
                return drain_generator(ev, *id);
            }
        }
        _ => {}
    }
    let Value::Object(id) = value else {
        return ev.throw_type_error("value is not iterable");
    };
    let iter_sym = ev.symbols().iterator.clone();
    let Some(iter_fn) = lookup_symbol_method(ev, id, &iter_sym) else {
        return ev.throw_type_error("value is not iterable");
    };
    let iterator = ev.call_function(iter_fn, Value::Object(id), &[])?;
    drain_iterator(ev, iterator)
}

fn drain_generator(ev: &mut Evaluator, id: HeapId) -> RunResult<Vec<Value>> {
    let mut out = Vec::new();
    loop {
        let (value, done) = super::generator::next(ev, id)?;
        if done {
            break;
        }
        out.push(value);
    }
    Ok(out)
}

fn lookup_symbol_method(ev: &Evaluator, id: HeapId, symbol: &crate::intern::SymbolId) -> Option<Value> {
    let key = PropertyKey::symbol(symbol.clone());
    match ev.heap().lookup_property(id, &key) {
        Some((_, PropertyDescriptor::Data { value, .. })) if ev.heap().is_callable_value(&value) => Some(value),
        _ => None,
    }
}

fn drain_iterator(ev: &mut Evaluator, iterator: Value) -> RunResult<Vec<Value>> {
    let mut out = Vec::new();
    loop {
        let next_fn = ev.get_property(iterator.clone(), "next")?;
        let result = ev.call_function(next_fn, iterator.clone(), &[])?;
        if ev.get_property(result.clone(), "done")?.to_boolean() {
            break;
        }
        out.push(ev.get_property(result, "value")?);
    }
    Ok(out)
}

/// Own-and-inherited enumerable string keys, in prototype-chain order,
/// de-duplicated by name (a key shadowed further up the chain is only
/// visited once, at its nearest occurrence) — `for...in`'s enumeration
/// order (`§4.6` "Tie-breaks").
fn enumerable_keys_in_chain(ev: &Evaluator, id: HeapId) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::new();
    let mut current = Some(id);
    while let Some(obj_id) = current {
        if let HeapData::Array(arr) = ev.heap().get(obj_id) {
            for (i, slot) in arr.elements.iter().enumerate() {
                if slot.is_some() {
                    let key = i.to_string();
                    if seen.insert(key.clone()) {
                        out.push(key);
                    }
                }
            }
        }
        let Some(obj) = ev.heap().get(obj_id).as_object() else { break };
        for key in obj.own_keys_ordered() {
            if let PropertyKey::String(name) = &key {
                if obj.get_own(&key).is_some_and(PropertyDescriptor::enumerable) && seen.insert(name.to_string()) {
                    out.push(name.to_string());
                }
            }
        }
        current = obj.prototype;
    }
    out
}

pub(crate) fn exec_for_in(ev: &mut Evaluator, inner: &ForInOf, env: HeapId, label: Option<&str>) -> RunResult<Completion> {
    let right = super::statements::eval_expr(ev, &inner.right, env)?;
    let Value::Object(id) = right else { return Ok(Completion::Normal(Value::Undefined)) };
    let keys = enumerable_keys_in_chain(ev, id);
    for key in keys {
        let loop_env = crate::environment::create(ev.heap_mut(), Some(env), false);
        bind_for_target(ev, inner, Value::string(key), env, loop_env)?;
        let completion = super::statements::exec_stmt(ev, &inner.body, loop_env)?;
        if let Some(stop) = super::statements::loop_should_stop(completion, label)? {
            return Ok(stop);
        }
    }
    Ok(Completion::Normal(Value::Undefined))
}

pub(crate) fn exec_for_of(ev: &mut Evaluator, inner: &ForInOf, is_await: bool, env: HeapId, label: Option<&str>) -> RunResult<Completion> {
    let right = super::statements::eval_expr(ev, &inner.right, env)?;
    let items = iterate_to_vec(ev, right)?;
    for item in items {
        let item = if is_await { super::promise::await_value(ev, item)? } else { item };
        let loop_env = crate::environment::create(ev.heap_mut(), Some(env), false);
        bind_for_target(ev, inner, item, env, loop_env)?;
        let completion = super::statements::exec_stmt(ev, &inner.body, loop_env)?;
        if let Some(stop) = super::statements::loop_should_stop(completion, label)? {
            return Ok(stop);
        }
    }
    Ok(Completion::Normal(Value::Undefined))
}

/// `var`/plain-assignment targets write through to wherever that binding
/// already lives (the hoisted function-scope slot for `var`, whatever
/// `assign` resolves to for a bare identifier/member target); `let`/`const`
/// targets get a fresh declaration in this iteration's own block scope, so
/// a closure captured in the body sees that iteration's value.
fn bind_for_target(ev: &mut Evaluator, inner: &ForInOf, value: Value, outer_env: HeapId, loop_env: HeapId) -> RunResult<()> {
    match inner.binding_kind {
        ForBindingKind::Var | ForBindingKind::Assign => super::destructure::assign_pattern(ev, &inner.pattern, value, outer_env),
        ForBindingKind::Let => super::destructure::bind_declaration(ev, &inner.pattern, value, loop_env, VarKind::Let),
        ForBindingKind::Const => super::destructure::bind_declaration(ev, &inner.pattern, value, loop_env, VarKind::Const),
    }
}

/// Allocates a suspended generator object for a `function*`/`async
/// function*` call; its body doesn't run until first driven (`next`/
/// `return`/`throw`/iteration), per `generator.rs`.
pub(crate) fn make_generator_value(
    ev: &mut Evaluator,
    body: Rc<FunctionBody>,
    params: Rc<[Param]>,
    args: Vec<Value>,
    closure: HeapId,
) -> RunResult<Value> {
    let proto = ev.realm().generator_proto;
    let object = JsObject::with_class(Some(proto), "Generator");
    let frame = super::generator::GeneratorFrame { body, params, args, closure, queue: None, return_value: Value::Undefined };
    let data = GeneratorData { object, status: GeneratorStatus::SuspendedStart, frame: Some(frame) };
    Ok(Value::Object(ev.heap_mut().alloc(HeapData::Generator(data))))
}
