//! `console` output plumbing (`§4.7`'s `console.log`/`info`/`warn`/`error`/
//! `debug`). Mirrors the teacher crate's `PrintWriter` trait — hosts and
//! tests supply their own sink instead of the engine coupling to stdout
//! directly — trimmed of the Python-specific `redirect_stdout` stack, which
//! this spec has no counterpart for.

use std::io::{self, Write as _};

/// Which `console` method produced a line, so a custom [`PrintWriter`] can
/// route warnings/errors differently than `log`/`info` without the engine
/// prescribing a format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleLevel {
    Log,
    Info,
    Warn,
    Error,
    Debug,
}

/// Implement this to capture or redirect `console.*` output from guest
/// code. The default [`StdPrint`] writes to stdout (warn/error to stderr).
pub trait PrintWriter {
    /// Called once per `console.*` call with the space-joined, already
    /// stringified arguments (no trailing newline).
    fn write_line(&mut self, level: ConsoleLevel, line: &str);
}

/// Default writer: `log`/`info`/`debug` go to stdout, `warn`/`error` to
/// stderr, matching how `console` behaves in every common JS host.
#[derive(Debug, Default)]
pub struct StdPrint;

impl PrintWriter for StdPrint {
    fn write_line(&mut self, level: ConsoleLevel, line: &str) {
        match level {
            ConsoleLevel::Warn | ConsoleLevel::Error => {
                let _ = writeln!(io::stderr(), "{line}");
            }
            ConsoleLevel::Log | ConsoleLevel::Info | ConsoleLevel::Debug => {
                let _ = writeln!(io::stdout(), "{line}");
            }
        }
    }
}

/// Collects every `console.*` line (tagged by level) into memory. Useful
/// for embedding tests that assert on what a script printed.
#[derive(Debug, Default)]
pub struct CollectStringPrint {
    lines: Vec<(ConsoleLevel, String)>,
}

impl CollectStringPrint {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> &[(ConsoleLevel, String)] {
        &self.lines
    }

    /// All collected lines joined with `\n`, ignoring level — convenient
    /// for tests that only care about `console.log` output.
    pub fn output(&self) -> String {
        self.lines.iter().map(|(_, l)| l.as_str()).collect::<Vec<_>>().join("\n")
    }
}

impl PrintWriter for CollectStringPrint {
    fn write_line(&mut self, level: ConsoleLevel, line: &str) {
        self.lines.push((level, line.to_string()));
    }
}

/// Discards all `console.*` output.
#[derive(Debug, Default)]
pub struct NoPrint;

impl PrintWriter for NoPrint {
    fn write_line(&mut self, _level: ConsoleLevel, _line: &str) {}
}
