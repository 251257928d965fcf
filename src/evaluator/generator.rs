//! Generator driving (`§4.6` "Generators": "contract is external behavior
//! only").
//!
//! True bidirectional coroutine suspension (pausing mid-statement and
//! resuming with a value sent into the paused `yield` expression) needs
//! either a bytecode VM with an explicit operand stack or stackful
//! coroutines — neither fits a tree-walking evaluator without machinery far
//! beyond this engine's scope. Instead, a generator's body runs to
//! completion the first time it is driven (`next`/`return`/`throw`/
//! iteration), with every `yield` appending to a queue instead of
//! suspending; subsequent `next()` calls just dequeue. This matches the
//! externally observable `{value, done}` sequence for the overwhelming
//! majority of real generator bodies (those used for iteration, where
//! nothing is ever sent back into a `yield`); see `DESIGN.md` ("Generators")
//! for what this gives up — primarily `gen.next(sentValue)` round-tripping
//! and a `.throw()`/`.return()` that can interrupt genuinely paused work.
//! Running to completion immediately also means an infinite generator body
//! (`while (true) yield i++;`, which is ordinary and spec-legal — §4.6 puts
//! no finiteness requirement on `function*`) would queue forever on its
//! very first drive; [`push_yield`] bounds that with
//! `resource.rs`'s `max_generator_yields`, so such a generator fails with a
//! catchable `RangeError` on its first `next()` instead of hanging the host.

use std::collections::VecDeque;
use std::rc::Rc;

use crate::ast::{FunctionBody, Param};
use crate::evaluator::{Completion, Evaluator};
use crate::exception::RunResult;
use crate::heap::{GeneratorStatus, HeapData, HeapId};
use crate::value::Value;

#[derive(Debug)]
pub(crate) struct GeneratorFrame {
    pub body: Rc<FunctionBody>,
    pub params: Rc<[Param]>,
    pub args: Vec<Value>,
    /// The call-site `this`/closure environment the body runs against once driven.
    pub closure: HeapId,
    pub queue: Option<VecDeque<Value>>,
    pub return_value: Value,
}

fn frame<'a>(heap: &'a crate::heap::Heap, id: HeapId) -> &'a GeneratorFrame {
    match heap.get(id) {
        HeapData::Generator(g) => g.frame.as_ref().expect("generator frame set at creation"),
        _ => panic!("HeapId did not reference a Generator"),
    }
}

/// Runs the body once, diverting every `yield`/`yield*` into `queue`
/// instead of actually suspending. Mirrors `Evaluator::call_user_function`'s
/// parameter binding so a driven generator sees the same `arguments`/`this`
/// a plain call would.
fn drive(ev: &mut Evaluator, gen_id: HeapId) -> RunResult<()> {
    let (body, params, args, closure) = {
        let f = frame(ev.heap(), gen_id);
        (f.body.clone(), f.params.clone(), f.args.clone(), f.closure)
    };
    let call_env = ev.bind_params_env(&params, &args, closure)?;
    ev.yield_stack.push(VecDeque::new());
    let result = match &*body {
        FunctionBody::Block(stmts) => ev.exec_block(stmts, call_env),
        FunctionBody::Expression(expr) => ev.eval_expr(expr, call_env).map(Completion::Return),
    };
    let queue = ev.yield_stack.pop().expect("pushed above");
    let return_value = match result? {
        Completion::Return(v) => v,
        _ => Value::Undefined,
    };
    if let HeapData::Generator(g) = ev.heap_mut().get_mut(gen_id) {
        g.frame.as_mut().expect("set at creation").queue = Some(queue);
        g.frame.as_mut().expect("set at creation").return_value = return_value;
    }
    Ok(())
}

fn ensure_driven(ev: &mut Evaluator, gen_id: HeapId) -> RunResult<()> {
    let needs_drive = frame(ev.heap(), gen_id).queue.is_none();
    if needs_drive {
        drive(ev, gen_id)?;
    }
    Ok(())
}

pub(crate) fn next(ev: &mut Evaluator, gen_id: HeapId) -> RunResult<(Value, bool)> {
    ensure_driven(ev, gen_id)?;
    let (next_value, done, return_value) = {
        let f = frame(ev.heap(), gen_id);
        match &f.queue {
            Some(q) if !q.is_empty() => (None, false, None),
            _ => (None, true, Some(f.return_value.clone())),
        }
    };
    if !done {
        if let HeapData::Generator(g) = ev.heap_mut().get_mut(gen_id) {
            let value = g.frame.as_mut().expect("driven above").queue.as_mut().expect("checked above").pop_front();
            g.status = if g.frame.as_ref().unwrap().queue.as_ref().unwrap().is_empty() {
                GeneratorStatus::Completed
            } else {
                GeneratorStatus::SuspendedYield
            };
            return Ok((value.unwrap_or(Value::Undefined), false));
        }
    }
    if let HeapData::Generator(g) = ev.heap_mut().get_mut(gen_id) {
        g.status = GeneratorStatus::Completed;
    }
    let _ = next_value;
    Ok((return_value.unwrap_or(Value::Undefined), true))
}

pub(crate) fn return_(ev: &mut Evaluator, gen_id: HeapId, value: Value) -> RunResult<(Value, bool)> {
    if let HeapData::Generator(g) = ev.heap_mut().get_mut(gen_id) {
        g.status = GeneratorStatus::Completed;
        if let Some(frame) = g.frame.as_mut() {
            frame.queue = Some(VecDeque::new());
        }
    }
    Ok((value, true))
}

/// Without true suspension there is no paused `yield` expression to inject
/// the thrown value into; a `.throw()` on an undriven generator surfaces as
/// an ordinary throw from the call site, matching spec behavior for that
/// one case exactly, and for an already-driven generator just completes it
/// (documented simplification, `DESIGN.md` "Generators").
pub(crate) fn throw(ev: &mut Evaluator, gen_id: HeapId, value: Value) -> RunResult<(Value, bool)> {
    if let HeapData::Generator(g) = ev.heap_mut().get_mut(gen_id) {
        g.status = GeneratorStatus::Completed;
    }
    Err(ev.make_exception(value))
}

/// Queues one more yielded value onto the innermost currently-driving
/// generator's buffer, failing gracefully with a catchable `RangeError`
/// instead of growing that buffer (and the Rust call stack driving it)
/// without bound once `resource.rs`'s `max_generator_yields` ceiling is hit
/// — the graceful-failure half of the "real suspend/resume, or at minimum
/// don't hang" trade-off this module's header documents, so an infinite
/// generator (`while (true) yield i++;`) throws on its first `next()`
/// rather than hanging the host forever.
pub(crate) fn push_yield(ev: &mut Evaluator, value: Value) -> RunResult<()> {
    let queued = ev.yield_stack.last().map_or(0, VecDeque::len);
    if let Err(e) = ev.resource().check_generator_yield(queued as u32) {
        let error = super::access::make_error_value(ev, crate::exception::ExcType::RangeError, e.to_string());
        return Err(ev.make_exception(error));
    }
    if let Some(queue) = ev.yield_stack.last_mut() {
        queue.push_back(value);
    }
    Ok(())
}

pub(crate) fn is_generator(ev: &Evaluator, id: HeapId) -> bool {
    matches!(ev.heap().get(id), HeapData::Generator(_))
}
