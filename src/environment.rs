//! Lexical environment operations (`§3` "Environment", `§4.6` "Scoping").
//!
//! Environments themselves are heap slots (see [`crate::heap::EnvironmentData`])
//! so closures capture them the same way they capture any other handle;
//! this module is the free-function API the evaluator calls to create,
//! look up, and mutate them — mirroring how `ir.rs`/`heap.rs` keep their
//! data shape and its operations in separate, composable layers.

use std::rc::Rc;

use crate::heap::{BindingKind, EnvironmentData, Heap, HeapData, HeapId, Slot};
use crate::value::Value;

/// Outcome of [`assign`]: the evaluator turns `ConstReassignment` into a
/// proper `TypeError` (it has realm/prototype access this module doesn't)
/// and `NotFound` into either a `ReferenceError` or an implicit global
/// creation, depending on strict mode.
pub(crate) enum AssignOutcome {
    Assigned,
    NotFound,
    ConstReassignment,
}

pub(crate) fn create(heap: &mut Heap, parent: Option<HeapId>, is_function_scope: bool) -> HeapId {
    heap.alloc(HeapData::Environment(EnvironmentData::new(parent, is_function_scope)))
}

fn env(heap: &Heap, id: HeapId) -> &EnvironmentData {
    heap.get(id).as_environment().expect("HeapId did not reference an Environment")
}

fn env_mut(heap: &mut Heap, id: HeapId) -> &mut EnvironmentData {
    heap.get_mut(id).as_environment_mut().expect("HeapId did not reference an Environment")
}

/// Declares a new binding in `id`'s own frame (not walking parents). Used
/// for `let`/`const`/`param`/function-decl bindings, which are always
/// introduced in the frame the declaring construct creates.
pub(crate) fn declare(heap: &mut Heap, id: HeapId, name: Rc<str>, kind: BindingKind, initialized: bool, value: Value) {
    let mutable = !matches!(kind, BindingKind::Const);
    env_mut(heap, id).bindings.insert(name, Slot { value, kind, initialized, mutable });
}

/// `var` hoisting (`§4.6` "Scoping"): walks up to the nearest enclosing
/// function-scope frame (or the top-level/global frame) and declares the
/// binding there, pre-initialized to `undefined` if not already present —
/// re-declaring an existing `var` is a no-op that doesn't clobber its value.
pub(crate) fn hoist_var(heap: &mut Heap, id: HeapId, name: Rc<str>) {
    let mut target = id;
    loop {
        let data = env(heap, target);
        if data.is_function_scope || data.parent.is_none() {
            break;
        }
        target = data.parent.expect("checked above");
    }
    let data = env_mut(heap, target);
    data.bindings.entry(name).or_insert(Slot {
        value: Value::Undefined,
        kind: BindingKind::Var,
        initialized: true,
        mutable: true,
    });
}

/// Resolves an identifier by walking the scope chain from `id` outward.
/// Returns the frame the binding lives in plus a clone of its slot, so
/// callers can both read the value and, for TDZ checks, see whether it's
/// initialized yet.
pub(crate) fn resolve(heap: &Heap, id: HeapId, name: &str) -> Option<(HeapId, Slot)> {
    let mut current = Some(id);
    while let Some(frame) = current {
        let data = env(heap, frame);
        if let Some(slot) = data.bindings.get(name) {
            return Some((frame, slot.clone()));
        }
        current = data.parent;
    }
    None
}

/// Outcome of resolving a binding for read: distinguishes "doesn't exist"
/// from "exists but is in its TDZ" so the evaluator can throw the right
/// flavor of `ReferenceError` for each (`§4.6` "Scoping").
pub(crate) enum GetOutcome {
    Value(Value),
    Uninitialized,
    NotFound,
}

pub(crate) fn get(heap: &Heap, id: HeapId, name: &str) -> GetOutcome {
    match resolve(heap, id, name) {
        Some((_, slot)) if slot.initialized => GetOutcome::Value(slot.value),
        Some(_) => GetOutcome::Uninitialized,
        None => GetOutcome::NotFound,
    }
}

/// Assigns to an existing binding, walking the scope chain.
pub(crate) fn assign(heap: &mut Heap, id: HeapId, name: &str, value: Value) -> AssignOutcome {
    let mut current = Some(id);
    while let Some(frame) = current {
        let data = env(heap, frame);
        if data.bindings.contains_key(name) {
            let slot = env_mut(heap, frame).bindings.get_mut(name).expect("checked above");
            if !slot.mutable {
                return AssignOutcome::ConstReassignment;
            }
            slot.value = value;
            slot.initialized = true;
            return AssignOutcome::Assigned;
        }
        current = env(heap, frame).parent;
    }
    AssignOutcome::NotFound
}

pub(crate) fn initialize(heap: &mut Heap, id: HeapId, name: &str, value: Value) {
    if let Some(slot) = env_mut(heap, id).bindings.get_mut(name) {
        slot.value = value;
        slot.initialized = true;
    }
}

/// The nearest `this`-owning frame's value, per `§4.6`: arrow functions
/// have no `this` slot of their own and transparently see the enclosing
/// function's.
pub(crate) fn resolve_this(heap: &Heap, id: HeapId) -> Option<Value> {
    let mut current = Some(id);
    while let Some(frame) = current {
        let data = env(heap, frame);
        if data.has_this_binding {
            return data.this_value.clone();
        }
        current = data.parent;
    }
    None
}

pub(crate) fn set_this(heap: &mut Heap, id: HeapId, value: Value) {
    let data = env_mut(heap, id);
    data.has_this_binding = true;
    data.this_value = Some(value);
}

/// Snapshot of every binding visible from `id`, innermost frame first —
/// the shape `__debug()` captures for [`crate::diagnostics::DebugMessage`].
pub(crate) fn visible_bindings(heap: &Heap, id: HeapId) -> Vec<(String, Value)> {
    let mut out = Vec::new();
    let mut seen = std::collections::HashSet::new();
    let mut current = Some(id);
    while let Some(frame) = current {
        let data = env(heap, frame);
        for (name, slot) in &data.bindings {
            if slot.initialized && seen.insert(name.clone()) {
                out.push((name.to_string(), slot.value.clone()));
            }
        }
        current = data.parent;
    }
    out
}
