//! The guest-visible error taxonomy and the `Result` alias the evaluator
//! threads everywhere a JS `throw` can surface (`§7` "Error Handling
//! Design").
//!
//! Mirrors the shape of the teacher crate's `ExcType`/`RunResult` (an
//! `is_subclass_of` relation over a closed error enum plus a thin
//! `Result<T, Exception>` alias) but sized to ECMAScript's error hierarchy
//! instead of CPython's.

use std::fmt;

use crate::value::Value;

/// ECMAScript's built-in `Error` subclasses, used internally to pick which
/// constructor/prototype an engine-raised exception gets wrapped in before
/// it becomes observable to guest code. A guest `throw "boom"` or
/// `throw new MyError()` carries no `ExcType` at all — it is plain
/// `Exception { value, .. }` with whatever value the guest threw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum ExcType {
    Error,
    TypeError,
    RangeError,
    ReferenceError,
    SyntaxError,
    EvalError,
    UriError,
}

impl ExcType {
    pub fn name(self) -> &'static str {
        match self {
            Self::Error => "Error",
            Self::TypeError => "TypeError",
            Self::RangeError => "RangeError",
            Self::ReferenceError => "ReferenceError",
            Self::SyntaxError => "SyntaxError",
            Self::EvalError => "EvalError",
            Self::UriError => "URIError",
        }
    }

    /// Every built-in error type is a subclass of `Error` (`§4.7`); nothing
    /// else overlaps, since `§2` doesn't ask for `AggregateError`'s
    /// multi-error semantics beyond what `Promise.any` needs directly.
    pub fn is_subclass_of(self, other: Self) -> bool {
        self == other || other == Self::Error
    }
}

impl fmt::Display for ExcType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// One evaluator call frame, named for the enclosing function (or
/// `<anonymous>`), carried for `§7`'s "Stack frames name the enclosing
/// function... and include source position when available."
#[derive(Debug, Clone)]
pub struct StackFrame {
    pub function_name: String,
    pub line: Option<u32>,
    pub column: Option<u32>,
}

/// A propagating guest-level throw. `value` is arbitrary — per `§7` "Guest-
/// level throw... value is arbitrary (often an Error object)" — so this
/// wraps a [`Value`], not a Rust error type. `call_stack` is snapshotted at
/// the throw site so `evaluate`'s top-level re-raise and the exception
/// channel mirror (`§7` "Policy") both get accurate frames.
#[derive(Debug, Clone)]
pub struct Exception {
    pub value: Value,
    pub call_stack: Vec<StackFrame>,
}

impl Exception {
    pub fn new(value: Value) -> Self {
        Self { value, call_stack: Vec::new() }
    }

    pub fn with_stack(value: Value, call_stack: Vec<StackFrame>) -> Self {
        Self { value, call_stack }
    }
}

/// Every fallible evaluator operation threads a [`Exception`] as its error
/// channel — `§4.6`'s "Throw" signal, reified as a Rust `Result` so `?`
/// composes the way the evaluator's happy-path dispatch does.
pub(crate) type RunResult<T> = Result<T, Exception>;
