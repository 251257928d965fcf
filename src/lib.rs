//! An embeddable JavaScript execution engine core.
//!
//! `glint` turns source text into values through a fixed pipeline — lexer →
//! parser → typed AST → constant folder → async/await CPS rewrite →
//! tree-walking evaluator — and drives a single-threaded promise/event-loop
//! runtime over the result. [`Engine`] is the whole embedding surface; every
//! other public type (`Value`, `HeapId`, the `ast` tree, the diagnostic
//! channels) is something an `Engine` call hands back or takes in.
//!
//! Mirrors the teacher crate's split between a public `Runner` (`run.rs`)
//! and the machinery it delegates to: [`Engine`] plays `Runner`'s role,
//! `evaluator`/`stdlib` play `bytecode`/`builtins`'s.
#![expect(clippy::cast_possible_truncation, reason = "arena/string indices are bounds-checked at alloc time")]
#![expect(clippy::cast_sign_loss, reason = "ToUint32/typed-array coercions intentionally reinterpret bit patterns")]
#![expect(clippy::cast_possible_wrap, reason = "ToInt32 wrapping is the ECMAScript-defined conversion")]

mod ast;
mod build;
mod cps;
mod diagnostics;
mod engine;
mod environment;
mod evaluator;
mod exception;
mod fold;
mod function;
mod heap;
mod intern;
mod io;
mod ir;
mod lexer;
mod object;
mod ops;
mod parser;
mod resource;
mod source;
mod stdlib;
mod token;
mod value;

pub use crate::{
    ast::Program,
    diagnostics::{DebugMessage, ExceptionInfo, ExceptionKind, ParseError},
    engine::{Engine, EngineError},
    exception::{Exception, StackFrame},
    function::HostFn,
    heap::HeapId,
    io::{CollectStringPrint, ConsoleLevel, NoPrint, PrintWriter, StdPrint},
    resource::{
        DEFAULT_MAX_LIVE_TIMERS, DEFAULT_MAX_RECURSION_DEPTH, MAX_DATA_RECURSION_DEPTH, ResourceError,
        ResourceLimits,
    },
    value::Value,
};
