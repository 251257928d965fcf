//! Promise internals (`§4.8`) and `await` (`§4.5`/`§4.6`).
//!
//! `await` is evaluated natively rather than through a synthesized `.then()`
//! chain: `eval_await`/`await_value` register a reaction on the operand (via
//! [`promise_resolve`]/[`promise_then`]) the same way a real `.then()` call
//! would, then block-drain the event loop — microtasks first, then one
//! macrotask/timer at a time — until that reaction fires, exactly mirroring
//! `evaluator::generator`'s documented run-to-completion trade-off for
//! `yield`. See `cps.rs` for the half of `§4.5` this module doesn't own (the
//! outer `return`/fallthrough → `resolve`/`reject` reification).

use std::rc::Rc;

use crate::ast::Expr;
use crate::diagnostics::{ExceptionInfo, ExceptionKind};
use crate::exception::{ExcType, RunResult};
use crate::heap::{HeapData, HeapId, PromiseReaction, PromiseState};
use crate::object::JsObject;
use crate::value::Value;

use super::Evaluator;

pub(crate) fn new_promise(ev: &mut Evaluator) -> HeapId {
    let proto = ev.realm().promise_proto;
    ev.heap_mut().alloc(HeapData::Promise(crate::heap::PromiseData {
        object: JsObject::with_class(Some(proto), "Promise"),
        state: PromiseState::Pending,
        value: Value::Undefined,
        reactions: Vec::new(),
        handled: false,
    }))
}

fn is_pending(ev: &Evaluator, id: HeapId) -> bool {
    matches!(ev.heap().get(id), HeapData::Promise(p) if p.state == PromiseState::Pending)
}

/// The resolution procedure a `Promise` executor's `resolve` callback runs
/// (`§4.8`): chains onto `value` if it's thenable, otherwise fulfills
/// directly. A no-op once `id` has already settled — calling `resolve`/
/// `reject` more than once is a silently ignored no-op, per spec.
pub(crate) fn resolve_promise(ev: &mut Evaluator, id: HeapId, value: Value) {
    if !is_pending(ev, id) {
        return;
    }
    if let Value::Object(value_id) = &value {
        if *value_id == id {
            let err = super::access::make_error_value(ev, ExcType::TypeError, "Chaining cycle detected for promise".to_string());
            reject_promise(ev, id, err);
            return;
        }
    }
    if matches!(value, Value::Object(_)) {
        match ev.get_property(value.clone(), "then") {
            Ok(then_val @ Value::Object(then_id)) if ev.heap().is_callable(then_id) => {
                schedule_thenable_job(ev, id, value, then_val);
                return;
            }
            Ok(_) => {}
            Err(e) => {
                reject_promise(ev, id, e.value);
                return;
            }
        }
    }
    settle(ev, id, PromiseState::Fulfilled, value);
}

pub(crate) fn reject_promise(ev: &mut Evaluator, id: HeapId, reason: Value) {
    if !is_pending(ev, id) {
        return;
    }
    settle(ev, id, PromiseState::Rejected, reason);
}

fn settle(ev: &mut Evaluator, id: HeapId, state: PromiseState, value: Value) {
    let reactions = match ev.heap_mut().get_mut(id) {
        HeapData::Promise(p) if p.state == PromiseState::Pending => {
            p.state = state;
            p.value = value.clone();
            std::mem::take(&mut p.reactions)
        }
        _ => return,
    };
    let had_no_reactions = reactions.is_empty();
    for reaction in reactions {
        schedule_reaction(ev, reaction, state, value.clone());
    }
    if state == PromiseState::Rejected && had_no_reactions {
        schedule_unhandled_check(ev, id);
    }
}

/// Queues the microtask job that invokes `thenable.then(resolve, reject)`,
/// rejecting `id` if obtaining/calling `then` itself throws.
fn schedule_thenable_job(ev: &mut Evaluator, id: HeapId, thenable: Value, then_fn: Value) {
    let resolve_cb = make_settle_callback(ev, id, true);
    let reject_cb = make_settle_callback(ev, id, false);
    let job = super::calls::make_host_function(
        ev,
        "",
        0,
        Rc::new(move |ev: &mut Evaluator, _this: Value, _args: &[Value]| {
            if let Err(e) = ev.call_function(then_fn.clone(), thenable.clone(), &[resolve_cb.clone(), reject_cb.clone()]) {
                reject_promise(ev, id, e.value);
            }
            Ok(Value::Undefined)
        }),
    );
    ev.event_loop.queue_microtask(job, Vec::new());
}

fn make_settle_callback(ev: &mut Evaluator, id: HeapId, is_resolve: bool) -> Value {
    let name = if is_resolve { "resolve" } else { "reject" };
    super::calls::make_host_function(
        ev,
        name,
        1,
        Rc::new(move |ev: &mut Evaluator, _this: Value, args: &[Value]| {
            let value = args.first().cloned().unwrap_or(Value::Undefined);
            if is_resolve {
                resolve_promise(ev, id, value);
            } else {
                reject_promise(ev, id, value);
            }
            Ok(Value::Undefined)
        }),
    )
}

/// `promise.then(onFulfilled, onRejected)` (`§4.7`/`§4.8`): always returns a
/// fresh promise, and always settles its reaction as a microtask job — even
/// when `promise` is already settled — matching `await`'s "at least one
/// microtask turn" guarantee.
pub(crate) fn promise_then(ev: &mut Evaluator, promise_id: HeapId, on_fulfilled: Option<Value>, on_rejected: Option<Value>) -> HeapId {
    let result = new_promise(ev);
    if on_rejected.is_some() {
        if let HeapData::Promise(p) = ev.heap_mut().get_mut(promise_id) {
            p.handled = true;
        }
    }
    let state = match ev.heap().get(promise_id) {
        HeapData::Promise(p) => Some((p.state, p.value.clone())),
        _ => None,
    };
    let reaction = PromiseReaction { on_fulfilled, on_rejected, result_promise: result };
    match state {
        Some((PromiseState::Pending, _)) => {
            if let HeapData::Promise(p) = ev.heap_mut().get_mut(promise_id) {
                p.reactions.push(reaction);
            }
        }
        Some((state, value)) => schedule_reaction(ev, reaction, state, value),
        None => {}
    }
    result
}

fn schedule_reaction(ev: &mut Evaluator, reaction: PromiseReaction, state: PromiseState, value: Value) {
    let PromiseReaction { on_fulfilled, on_rejected, result_promise } = reaction;
    let handler = if state == PromiseState::Fulfilled { on_fulfilled } else { on_rejected };
    let job = super::calls::make_host_function(
        ev,
        "",
        1,
        Rc::new(move |ev: &mut Evaluator, _this: Value, _args: &[Value]| {
            let outcome = match &handler {
                Some(f) => ev.call_function(f.clone(), Value::Undefined, std::slice::from_ref(&value)),
                None if state == PromiseState::Fulfilled => Ok(value.clone()),
                None => Err(ev.make_exception(value.clone())),
            };
            match outcome {
                Ok(v) => resolve_promise(ev, result_promise, v),
                Err(e) => reject_promise(ev, result_promise, e.value),
            }
            Ok(Value::Undefined)
        }),
    );
    ev.event_loop.queue_microtask(job, Vec::new());
}

/// Mirrors a rejection with no attached handler onto the diagnostics channel
/// one microtask turn later (`§7` "Policy"), giving a `.catch()` registered
/// in the same synchronous turn a chance to attach first.
fn schedule_unhandled_check(ev: &mut Evaluator, id: HeapId) {
    let job = super::calls::make_host_function(
        ev,
        "",
        0,
        Rc::new(move |ev: &mut Evaluator, _this: Value, _args: &[Value]| {
            let still_unhandled =
                matches!(ev.heap().get(id), HeapData::Promise(p) if p.state == PromiseState::Rejected && !p.handled && p.reactions.is_empty());
            if still_unhandled {
                let reason = match ev.heap().get(id) {
                    HeapData::Promise(p) => p.value.clone(),
                    _ => Value::Undefined,
                };
                let message = super::access::describe_exception_value(ev, &reason);
                ev.record_exception(ExceptionInfo {
                    kind: ExceptionKind::UnhandledRejection,
                    message,
                    context: None,
                    call_stack: Vec::new(),
                });
            }
            Ok(Value::Undefined)
        }),
    );
    ev.event_loop.queue_microtask(job, Vec::new());
}

/// `PromiseResolve` (`§4.8`): wraps a plain value in an already-settling
/// promise, or passes an existing promise through unchanged.
pub(crate) fn promise_resolve(ev: &mut Evaluator, value: Value) -> HeapId {
    if let Value::Object(id) = &value {
        if matches!(ev.heap().get(*id), HeapData::Promise(_)) {
            return *id;
        }
    }
    let id = new_promise(ev);
    resolve_promise(ev, id, value);
    id
}

pub(crate) fn eval_await(ev: &mut Evaluator, argument: &Expr, env: HeapId) -> RunResult<Value> {
    let value = super::statements::eval_expr(ev, argument, env)?;
    await_value(ev, value)
}

/// Blocking-drive fallback for `await` (`cps.rs`'s header documents why the
/// suspension half of `§4.5` is delegated here rather than synthesized as an
/// explicit `.then()` chain). Reads `value` (coerced to a promise via
/// [`promise_resolve`]) directly off the heap rather than registering a
/// `.then` reaction and waiting for it to run: a promise that's already
/// settled — by far the common case, e.g. `await` of a literal, of
/// `Promise.resolve(x)`, or of anything resolved synchronously inside its
/// own executor — is read back with zero event-loop interaction, so it
/// never touches, let alone drains, whatever unrelated work is already
/// queued (`§5` ordering guarantees (a)/(c)). A still-pending promise is
/// advanced one job at a time — one microtask if any are queued, else one
/// macrotask/timer — re-checking this promise's own state after each step
/// and stopping the instant it settles, rather than unconditionally
/// emptying the whole microtask queue the way a single `drain_microtasks`
/// call would; this still runs any unrelated job that happens to be queued
/// ahead of whatever settles `value` (FIFO order leaves no way to skip
/// ahead of it without reordering unrelated reactions relative to each
/// other), but it never runs unrelated work queued *after* settlement the
/// way an unconditional full drain previously did. See `SPEC_FULL.md`
/// §4.5/§5 for the residual ordering cost this still carries relative to a
/// real suspend-and-resume `await`. Bails to `undefined` if the loop runs
/// completely dry first, since a `Promise` nothing will ever settle would
/// otherwise hang the host forever (`evaluator::generator` documents the
/// analogous trade-off for `yield`).
pub(crate) fn await_value(ev: &mut Evaluator, value: Value) -> RunResult<Value> {
    let promise_id = promise_resolve(ev, value);
    // `await` always counts as handling the promise, settled or not, the
    // same way passing an `on_rejected` to `.then` does just above.
    if let HeapData::Promise(p) = ev.heap_mut().get_mut(promise_id) {
        p.handled = true;
    }
    loop {
        match ev.heap().get(promise_id) {
            HeapData::Promise(p) if p.state == PromiseState::Fulfilled => return Ok(p.value.clone()),
            HeapData::Promise(p) if p.state == PromiseState::Rejected => {
                let reason = p.value.clone();
                return Err(ev.make_exception(reason));
            }
            _ => {}
        }
        if super::event_loop::step_microtask(ev) {
            continue;
        }
        if ev.event_loop.is_idle() {
            return Ok(Value::Undefined);
        }
        super::event_loop::step_macrotask(ev);
    }
}
