//! Single-threaded job scheduler (`§4.9` "Event Loop"): a microtask FIFO
//! queue, a macrotask FIFO queue, and a virtual timer clock for
//! `setTimeout`/`setInterval`.
//!
//! There is no real wall clock — a timer's delay is virtual milliseconds
//! against a clock this loop advances itself, jumping straight to the
//! earliest pending timer's due time once both task queues run dry. That
//! keeps `Engine::run`'s drain fully deterministic and synchronous from the
//! host's point of view, matching `§5`'s single-threaded, no-shared-memory
//! posture: nothing here ever blocks on real time passing.

use std::collections::VecDeque;

use crate::diagnostics::ExceptionInfo;
use crate::value::Value;

use super::Evaluator;

/// A queued job: a callback plus the arguments it runs with. Used for both
/// microtasks (promise reactions, `queueMicrotask`) and macrotasks (timer
/// callbacks, host-injected tasks) — the two queues differ only in which
/// one drains first and how entries arrive.
#[derive(Clone)]
pub(crate) struct MacroTask {
    pub callback: Value,
    pub args: Vec<Value>,
}

type Microtask = MacroTask;

struct Timer {
    id: u64,
    due: u64,
    interval: Option<u64>,
    callback: Value,
    args: Vec<Value>,
    cancelled: bool,
}

pub(crate) struct EventLoop {
    microtasks: VecDeque<Microtask>,
    macrotasks: VecDeque<MacroTask>,
    timers: Vec<Timer>,
    next_timer_id: u64,
    clock: u64,
}

impl EventLoop {
    pub(crate) fn new() -> Self {
        Self {
            microtasks: VecDeque::new(),
            macrotasks: VecDeque::new(),
            timers: Vec::new(),
            next_timer_id: 1,
            clock: 0,
        }
    }

    /// Enqueues a promise reaction / `queueMicrotask` job — drained ahead of
    /// every macrotask, and ahead of the next iteration of this same drain.
    pub(crate) fn queue_microtask(&mut self, callback: Value, args: Vec<Value>) {
        self.microtasks.push_back(MacroTask { callback, args });
    }

    /// Host-injected task (`Engine::schedule_task`, `§6`): appended directly
    /// to the macrotask queue, after whatever timers are already due.
    pub(crate) fn schedule_task(&mut self, callback: Value, args: Vec<Value>) {
        self.macrotasks.push_back(MacroTask { callback, args });
    }

    /// `setTimeout`/`setInterval`: registers a timer due `delay_ms` virtual
    /// milliseconds from now, returning the id `clearTimeout`/`clearInterval`
    /// cancels it with.
    pub(crate) fn set_timer(&mut self, callback: Value, args: Vec<Value>, delay_ms: u64, repeating: bool) -> u64 {
        let id = self.next_timer_id;
        self.next_timer_id += 1;
        self.timers.push(Timer {
            id,
            due: self.clock + delay_ms,
            interval: repeating.then_some(delay_ms.max(1)),
            callback,
            args,
            cancelled: false,
        });
        id
    }

    pub(crate) fn clear_timer(&mut self, id: u64) {
        if let Some(timer) = self.timers.iter_mut().find(|t| t.id == id) {
            timer.cancelled = true;
        }
    }

    /// True once every queue and every live timer is empty/cancelled —
    /// `Engine::run`'s "drive until idle" stopping condition.
    pub(crate) fn is_idle(&self) -> bool {
        self.microtasks.is_empty() && self.macrotasks.is_empty() && self.timers.iter().all(|t| t.cancelled)
    }

    pub(crate) fn active_timer_count(&self) -> usize {
        self.timers.iter().filter(|t| !t.cancelled).count()
    }

    /// `Engine::close` (`§6`): drops every queued job and live timer without
    /// running any of them. Idempotent — closing twice is just two no-ops.
    pub(crate) fn close(&mut self) {
        self.microtasks.clear();
        self.macrotasks.clear();
        self.timers.clear();
    }

    /// When the macrotask queue is empty but timers remain, advances the
    /// virtual clock to the earliest due timer and moves every timer due at
    /// or before that moment into the macrotask queue, in due-time order
    /// with ties broken by id (`§4.9` "Ordering guarantees" (c)). Repeating
    /// timers are rescheduled `interval` ms out; one-shot timers are
    /// dropped after firing.
    fn promote_due_timers(&mut self) {
        self.timers.retain(|t| !(t.cancelled && t.interval.is_none()));
        if !self.macrotasks.is_empty() {
            return;
        }
        let Some(next_due) = self.timers.iter().filter(|t| !t.cancelled).map(|t| t.due).min() else {
            return;
        };
        self.clock = self.clock.max(next_due);
        let mut ready: Vec<usize> = self
            .timers
            .iter()
            .enumerate()
            .filter(|(_, t)| !t.cancelled && t.due <= self.clock)
            .map(|(i, _)| i)
            .collect();
        ready.sort_by_key(|&i| (self.timers[i].due, self.timers[i].id));
        for i in ready {
            let t = &self.timers[i];
            self.macrotasks.push_back(MacroTask { callback: t.callback.clone(), args: t.args.clone() });
        }
        for timer in &mut self.timers {
            if timer.cancelled || timer.due > self.clock {
                continue;
            }
            match timer.interval {
                Some(interval) => timer.due = self.clock + interval,
                None => timer.cancelled = true,
            }
        }
        self.timers.retain(|t| !(t.cancelled && t.interval.is_none()));
    }
}

/// Drives the loop to completion per `§4.9`'s algorithm: drain microtasks,
/// promote any due timers into the macrotask queue, run one macrotask to
/// completion, repeat — until both queues and every timer are exhausted.
/// `Engine::run`'s top-level entry point after the initial `evaluate`.
pub(crate) fn run_to_completion(ev: &mut Evaluator) -> RunResult<()> {
    loop {
        drain_microtasks(ev);
        ev.event_loop.promote_due_timers();
        let Some(task) = ev.event_loop.macrotasks.pop_front() else { break };
        run_job(ev, task);
    }
    Ok(())
}

/// Drains only the microtask queue, leaving macrotasks/timers untouched —
/// the half-step `await_value`'s blocking-drive fallback uses to make a
/// resolved promise's reactions observable without also firing unrelated
/// timers out from under the guest script.
pub(crate) fn drain_microtasks(ev: &mut Evaluator) {
    while let Some(job) = ev.event_loop.microtasks.pop_front() {
        run_job(ev, job);
    }
}

/// Runs a single queued microtask, if one is pending, without touching any
/// other job — the incremental half-step `await_value`'s blocking-drive
/// fallback takes so it can re-check the awaited promise's own state after
/// every individual job rather than emptying the whole queue in one call.
/// Returns whether a microtask actually ran.
pub(crate) fn step_microtask(ev: &mut Evaluator) -> bool {
    let Some(job) = ev.event_loop.microtasks.pop_front() else { return false };
    run_job(ev, job);
    true
}

/// Promotes any due timers and runs a single macrotask, if one is queued —
/// the incremental half-step `await_value`'s blocking-drive fallback takes
/// when draining microtasks alone isn't enough to settle the awaited
/// promise. Returns whether a macrotask actually ran.
pub(crate) fn step_macrotask(ev: &mut Evaluator) -> bool {
    ev.event_loop.promote_due_timers();
    let Some(task) = ev.event_loop.macrotasks.pop_front() else { return false };
    run_job(ev, task);
    true
}

fn run_job(ev: &mut Evaluator, job: MacroTask) {
    if let Err(exception) = ev.call_function(job.callback, Value::Undefined, &job.args) {
        let info = ExceptionInfo {
            kind: crate::diagnostics::ExceptionKind::HostCallbackFailure,
            message: super::access::describe_exception_value(ev, &exception.value),
            context: None,
            call_stack: exception
                .call_stack
                .iter()
                .map(|f| crate::diagnostics::StackFrame { function_name: f.function_name.clone(), line: f.line, column: f.column })
                .collect(),
        };
        ev.record_exception(info);
    }
}

use crate::exception::RunResult;
