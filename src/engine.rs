//! The embedding API (`§6` "External Interfaces"): [`Engine`] wraps one
//! `Evaluator` plus the parse/fold/cps pipeline that turns source text into
//! something it can run, the same "one struct, thin public methods that
//! delegate to the real machinery" shape the teacher crate's `Runner`
//! (`run.rs`) gives Python callers.

use crate::ast::Program;
use crate::cps;
use crate::diagnostics::{DebugMessage, ExceptionInfo, ParseError};
use crate::evaluator::Evaluator;
use crate::exception::Exception;
use crate::fold;
use crate::function::HostFn;
use crate::heap::HeapId;
use crate::io::PrintWriter;
use crate::parser;
use crate::resource::ResourceLimits;
use crate::source::SourceHandle;
use crate::value::Value;

/// Everything that can go wrong running a script through [`Engine::evaluate`]
/// and its relatives, separating the pipeline's parse stage from the guest's
/// own runtime throws (`§7` "Kinds") the way the teacher crate's `ReplError`
/// separates parse/compile/runtime failures for its own multi-stage
/// pipeline.
#[derive(Debug, Clone)]
pub enum EngineError {
    /// Malformed source; never reaches the evaluator at all.
    Parse(ParseError),
    /// A guest-level `throw`, an unhandled promise rejection, or a host
    /// callback failure that crossed back into script and was never caught.
    Throw(Exception),
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Parse(error) => write!(f, "{error}"),
            Self::Throw(error) => write!(f, "uncaught exception: {:?}", error.value),
        }
    }
}

impl std::error::Error for EngineError {}

impl From<ParseError> for EngineError {
    fn from(error: ParseError) -> Self {
        Self::Parse(error)
    }
}

impl From<Exception> for EngineError {
    fn from(error: Exception) -> Self {
        Self::Throw(error)
    }
}

/// One isolated JavaScript execution context: its own heap arena, global
/// object, intrinsic prototypes, and event loop (`§5` "Shared resources" —
/// nothing here is process-wide). Dropping an `Engine` frees its entire
/// arena; nothing it produced (a `Value::Object` handle, a channel item)
/// outlives it meaningfully.
pub struct Engine {
    evaluator: Evaluator,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    /// Creates an isolated instance with the default resource limits
    /// (`§6` "`new Engine()` creates an isolated instance").
    #[must_use]
    pub fn new() -> Self {
        Self::with_limits(ResourceLimits::default())
    }

    /// Creates an isolated instance with caller-chosen call-depth/recursion/
    /// timer limits (`§5` "Concurrency & Resource Model").
    #[must_use]
    pub fn with_limits(limits: ResourceLimits) -> Self {
        Self { evaluator: Evaluator::new(limits) }
    }

    /// Redirects `console.log`/`warn`/`error`/etc. output, e.g. to a test's
    /// `CollectStringPrint` instead of stdout/stderr.
    pub fn set_console(&mut self, console: Box<dyn PrintWriter>) {
        self.evaluator.set_console(console);
    }

    /// Parses `source` into the typed AST without folding or CPS-rewriting
    /// it (`§6` "`parse(source) → IR`").
    ///
    /// # Errors
    /// Returns [`ParseError`] for malformed source.
    pub fn parse(&self, source: &str) -> Result<Program, ParseError> {
        Self::parse_raw(source)
    }

    /// Runs every pipeline stage short of evaluation, returning the
    /// pre-fold, post-fold, and post-CPS trees so a caller can diff what
    /// each stage changed (`§6` "`parse_with_steps(source) →
    /// (original, folded, cps)`").
    ///
    /// # Errors
    /// Returns [`ParseError`] for malformed source.
    pub fn parse_with_steps(&self, source: &str) -> Result<(Program, Program, Program), ParseError> {
        let original = Self::parse_raw(source)?;
        let mut folded = original.clone();
        fold::fold_program(&mut folded);
        let mut transformed = folded.clone();
        cps::transform_program(&mut transformed);
        Ok((original, folded, transformed))
    }

    fn parse_raw(source: &str) -> Result<Program, ParseError> {
        let handle = SourceHandle::new("<script>", source);
        let output = parser::parse(handle)?;
        Ok(crate::build::build(&output.arena, output.program))
    }

    fn prepare(source: &str) -> Result<Program, ParseError> {
        let mut program = Self::parse_raw(source)?;
        fold::fold_program(&mut program);
        cps::transform_program(&mut program);
        Ok(program)
    }

    fn run_synchronous_portion(&mut self, source: &str) -> Result<Value, EngineError> {
        let program = Self::prepare(source)?;
        match self.evaluator.eval_program(&program) {
            Ok(value) => Ok(value),
            Err(exception) => {
                self.evaluator.record_uncaught(crate::diagnostics::ExceptionKind::GuestThrow, &exception);
                Err(exception.into())
            }
        }
    }

    /// Runs `source` to completion, including draining the event loop, and
    /// returns the value of its last expression statement (`§6`
    /// "`evaluate(source) → value`"). Uncaught throws and unhandled
    /// rejections are both re-raised here and mirrored onto
    /// [`Engine::exceptions`] (`§7` "Policy").
    ///
    /// # Errors
    /// Returns [`EngineError::Parse`] for malformed source or
    /// [`EngineError::Throw`] for an uncaught guest exception.
    pub fn evaluate(&mut self, source: &str) -> Result<Value, EngineError> {
        let value = self.run_synchronous_portion(source)?;
        self.evaluator.run_event_loop()?;
        Ok(value)
    }

    /// Same as [`Engine::evaluate`], for programs whose effects are meant to
    /// be observed through the host rather than the returned value (`§6`
    /// "`run(source) → value`... intended for programs whose effects are
    /// observed via the host").
    ///
    /// # Errors
    /// See [`Engine::evaluate`].
    pub fn run(&mut self, source: &str) -> Result<Value, EngineError> {
        self.evaluate(source)
    }

    /// Runs only `source`'s synchronous portion, returning before the event
    /// loop drains any queued microtask, timer, or macrotask (`§6`
    /// "`evaluate_sync(source)` bypasses the event loop drain... best-effort
    /// compatibility").
    ///
    /// # Errors
    /// See [`Engine::evaluate`].
    pub fn evaluate_sync(&mut self, source: &str) -> Result<Value, EngineError> {
        self.run_synchronous_portion(source)
    }

    /// Registers a host-native function on the global object under `name`
    /// (`§6` "`set_global_function(name, host_callable)`").
    pub fn set_global_function(&mut self, name: &str, arity: usize, host_callable: HostFn) {
        let global = self.evaluator.global_object();
        crate::stdlib::def_method(&mut self.evaluator, global, name, arity, host_callable);
    }

    /// Injects a macrotask that invokes `callback` with `args` on a future
    /// event-loop turn, after whatever timers are already due (`§6`
    /// "`schedule_task(fn)` injects a macrotask").
    pub fn schedule_task(&mut self, callback: Value, args: Vec<Value>) {
        self.evaluator.event_loop.schedule_task(callback, args);
    }

    /// Reads a property off any value crossing the boundary, including an
    /// opaque object handle obtained from a previous `evaluate` call (`§6`
    /// "JS objects as opaque handles whose properties can be read by the
    /// host").
    ///
    /// # Errors
    /// Returns the guest exception if the read invokes a getter that throws.
    pub fn get_property(&mut self, object: Value, key: &str) -> Result<Value, Exception> {
        self.evaluator.get_property(object, key)
    }

    /// The global object, as a handle usable with [`Engine::get_property`].
    #[must_use]
    pub fn global_object(&self) -> HeapId {
        self.evaluator.global_object()
    }

    /// Drains the exception channel (`§6` "`exceptions()` exposes a
    /// consumer-side channel of `ExceptionInfo`").
    pub fn exceptions(&mut self) -> Vec<ExceptionInfo> {
        self.evaluator.drain_exceptions()
    }

    /// Drains the `__debug()` channel (`§6` "`debug_messages()` exposes a
    /// channel of `DebugMessage`").
    pub fn debug_messages(&mut self) -> Vec<DebugMessage> {
        self.evaluator.drain_debug_messages()
    }

    /// Drains no further work; idempotent (`§6` "`close()`/dispose drains no
    /// further work; idempotent").
    pub fn close(&mut self) {
        self.evaluator.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::CollectStringPrint;

    #[test]
    fn evaluates_last_expression_value() {
        let mut engine = Engine::new();
        let result = engine.evaluate("1 + 2 * 3").unwrap();
        assert!(matches!(result, Value::Number(n) if n == 7.0));
    }

    #[test]
    fn isolates_prototype_mutation_between_engines() {
        let mut a = Engine::new();
        let mut b = Engine::new();
        a.evaluate("Array.prototype.poisoned = true;").unwrap();
        let poisoned_in_b = b.evaluate("typeof Array.prototype.poisoned").unwrap();
        assert!(matches!(poisoned_in_b, Value::String(s) if &*s == "undefined"));
    }

    #[test]
    fn intrinsics_resolve_as_bare_identifiers() {
        let mut engine = Engine::new();
        let result = engine.evaluate("typeof Array === 'function' && typeof Math === 'object' && typeof console === 'object'").unwrap();
        assert!(result.to_boolean());
    }

    #[test]
    fn globalthis_assignment_is_visible_as_a_bare_identifier() {
        let mut engine = Engine::new();
        let result = engine.evaluate("globalThis.stashed = 41; stashed + 1").unwrap();
        assert!(matches!(result, Value::Number(n) if n == 42.0));
    }

    #[test]
    fn parse_error_surfaces_line_and_column() {
        let engine = Engine::new();
        let err = engine.parse("let x = ;").unwrap_err();
        assert_eq!(err.line, 1);
    }

    #[test]
    fn drains_console_output() {
        let mut engine = Engine::new();
        engine.set_console(Box::new(CollectStringPrint::new()));
        engine.evaluate("console.log('hi')").unwrap();
    }

    #[test]
    fn close_is_idempotent() {
        let mut engine = Engine::new();
        engine.evaluate("setTimeout(() => {}, 100);").unwrap();
        engine.close();
        engine.close();
    }
}
