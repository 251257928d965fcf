//! Parse-time diagnostics and the host-facing instrumentation channels:
//! [`ExceptionInfo`] and [`DebugMessage`]. Playing the role `tracer.rs`
//! plays for `ouros`, these are bounded queues the embedder drains — not a
//! `log`/`tracing` facade, since a guest script's exceptions and `__debug()`
//! snapshots are structured data the host consumes programmatically, not
//! free-text log lines.

use std::collections::VecDeque;
use std::fmt;

use crate::source::SourceHandle;

/// Upper bound on the exception/debug channels so a runaway script that
/// throws in a tight loop cannot grow the host's memory without bound.
const CHANNEL_CAPACITY: usize = 1024;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum ParseErrorKind {
    UnexpectedChar(char),
    UnexpectedToken(String),
    UnterminatedString,
    UnterminatedTemplate,
    UnterminatedRegex,
    InvalidEscape,
    InvalidNumber(String),
    /// `const` bindings require an initializer at parse time (data-model
    /// invariant (a)).
    ConstWithoutInitializer,
    NestingTooDeep,
    Other(String),
}

impl fmt::Display for ParseErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnexpectedChar(c) => write!(f, "unexpected character {c:?}"),
            Self::UnexpectedToken(t) => write!(f, "unexpected token {t}"),
            Self::UnterminatedString => write!(f, "unterminated string literal"),
            Self::UnterminatedTemplate => write!(f, "unterminated template literal"),
            Self::UnterminatedRegex => write!(f, "unterminated regular expression literal"),
            Self::InvalidEscape => write!(f, "invalid escape sequence"),
            Self::InvalidNumber(s) => write!(f, "invalid numeric literal: {s}"),
            Self::ConstWithoutInitializer => write!(f, "missing initializer in const declaration"),
            Self::NestingTooDeep => write!(f, "nesting too deep"),
            Self::Other(s) => write!(f, "{s}"),
        }
    }
}

/// A malformed-source diagnostic. Carries enough to render the ECMAScript
/// parser's customary `line:column: message` plus a caret-annotated source
/// snippet (`§4.2`).
#[derive(Debug, Clone)]
pub struct ParseError {
    pub(crate) kind: ParseErrorKind,
    pub line: u32,
    pub column: u32,
    handle: SourceHandle,
}

impl ParseError {
    pub(crate) fn new(kind: ParseErrorKind, handle: SourceHandle, line: u32, column: u32) -> Self {
        Self { kind, line, column, handle }
    }

    pub fn message(&self) -> String {
        self.kind.to_string()
    }

    /// The offending line(s) with a caret indicator, truncated with
    /// ellipses on both sides for very long lines.
    pub fn context_snippet(&self) -> String {
        crate::source::render_snippet(&self.handle, self.line, self.column)
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "SyntaxError: {} ({}:{}:{})", self.kind, self.handle.name, self.line, self.column)?;
        write!(f, "{}", self.context_snippet())
    }
}

impl std::error::Error for ParseError {}

/// Severity/origin tag for a host-visible exception, mirroring the kinds
/// enumerated in spec §7.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExceptionKind {
    Parse,
    GuestThrow,
    InvariantViolation,
    HostCallbackFailure,
    UnhandledRejection,
}

/// A single stack frame, named for the enclosing function (or `<anonymous>`),
/// with source position when available.
#[derive(Debug, Clone)]
pub struct StackFrame {
    pub function_name: String,
    pub line: Option<u32>,
    pub column: Option<u32>,
}

/// Observability record mirrored onto the exception channel for every
/// unhandled throw/rejection, per spec §7's "Policy".
#[derive(Debug, Clone)]
pub struct ExceptionInfo {
    pub kind: ExceptionKind,
    pub message: String,
    pub context: Option<String>,
    pub call_stack: Vec<StackFrame>,
}

/// A snapshot captured by the guest-visible `__debug()` global: the current
/// lexical-scope variable bindings (rendered as `name -> display`), the
/// call stack, and a short description of the active control-flow signal.
#[derive(Debug, Clone)]
pub struct DebugMessage {
    pub variables: Vec<(String, String)>,
    pub call_stack: Vec<StackFrame>,
    pub control_flow_state: String,
}

/// Single-producer/single-consumer bounded channel of `T`. The producer
/// (the evaluator) drops the oldest entry rather than block or panic when
/// full — matching `§5`'s "bounded queue" without adding a blocking
/// dependency the embedding contract doesn't ask for.
#[derive(Debug, Default)]
pub(crate) struct Channel<T> {
    items: VecDeque<T>,
}

impl<T> Channel<T> {
    pub fn push(&mut self, item: T) {
        if self.items.len() >= CHANNEL_CAPACITY {
            self.items.pop_front();
        }
        self.items.push_back(item);
    }

    pub fn drain(&mut self) -> Vec<T> {
        self.items.drain(..).collect()
    }
}
