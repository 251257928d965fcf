//! Per-`Engine` resource ceilings (`SPEC_FULL.md` §3/§5 "ambient"): a
//! runaway guest program fails with a catchable `RangeError` instead of
//! exhausting the Rust stack or growing memory without bound. Mirrors the
//! teacher crate's `ResourceLimits`/`ResourceTracker` split — a plain-data
//! limits record plus a tracker that charges against it — sized down to
//! what this engine actually needs (call depth and live timer count).

use std::fmt;

/// Mirrors `resource.rs`'s `DEFAULT_MAX_RECURSION_DEPTH`: deep enough for
/// realistic recursive guest code, shallow enough to fail before the Rust
/// call stack itself would overflow.
pub const DEFAULT_MAX_RECURSION_DEPTH: u32 = 1024;

/// Mirrors `resource.rs`'s `MAX_DATA_RECURSION_DEPTH`: the separate, lower
/// ceiling used by recursive data-structure walks (`JSON.stringify` on a
/// cyclic object, deep-equality checks) that aren't bounded by the call
/// stack shape the evaluator itself uses.
pub const MAX_DATA_RECURSION_DEPTH: u32 = 512;

/// Default cap on concurrently live (uncancelled) timers, so a guest loop
/// that calls `setInterval` without ever clearing it can't grow the event
/// loop's timer set without bound.
pub const DEFAULT_MAX_LIVE_TIMERS: u32 = 10_000;

/// Default cap on how many `yield`s a single `function*` drive may queue up
/// (`evaluator::generator` runs a generator's body to completion rather than
/// truly suspending at each `yield`, so an unconditionally-looping generator
/// body — `while (true) yield i++;`, an ordinary and spec-legal pattern —
/// would otherwise queue forever on the very first `next()` and hang the
/// host). Generous enough that no realistic finite generator ever hits it.
pub const DEFAULT_MAX_GENERATOR_YIELDS: u32 = 100_000;

#[derive(Debug, Clone, Copy)]
pub struct ResourceLimits {
    pub max_call_depth: u32,
    pub max_data_recursion_depth: u32,
    pub max_live_timers: u32,
    pub max_generator_yields: u32,
}

impl Default for ResourceLimits {
    fn default() -> Self {
        Self {
            max_call_depth: DEFAULT_MAX_RECURSION_DEPTH,
            max_data_recursion_depth: MAX_DATA_RECURSION_DEPTH,
            max_live_timers: DEFAULT_MAX_LIVE_TIMERS,
            max_generator_yields: DEFAULT_MAX_GENERATOR_YIELDS,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceError {
    CallDepth { limit: u32, depth: u32 },
    DataRecursion { limit: u32, depth: u32 },
    TooManyTimers { limit: u32 },
    GeneratorYieldLimit { limit: u32 },
}

impl fmt::Display for ResourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CallDepth { limit, depth } => {
                write!(f, "Maximum call stack size exceeded (depth {depth} > limit {limit})")
            }
            Self::DataRecursion { limit, depth } => {
                write!(
                    f,
                    "Maximum recursion depth exceeded while walking a data structure (depth {depth} > limit {limit})"
                )
            }
            Self::TooManyTimers { limit } => write!(f, "Too many live timers (limit {limit})"),
            Self::GeneratorYieldLimit { limit } => {
                write!(
                    f,
                    "Generator exceeded the maximum of {limit} queued yields without the consumer catching up (possible infinite generator; this engine drives a generator body to completion rather than suspending at each yield)"
                )
            }
        }
    }
}

/// Tracks live call depth against an `Engine`'s [`ResourceLimits`]. Every
/// `enter_call`/`exit_call` pair brackets one evaluator call frame; `?`-
/// propagated throws still reach the matching `exit_call` because the
/// evaluator's call-dispatch wraps both in the same function, not a guard
/// object — simpler than the teacher's RAII guards since this tracker has
/// only counters, no borrowed heap state to release.
pub(crate) struct ResourceTracker {
    limits: ResourceLimits,
    call_depth: u32,
    data_depth: u32,
}

impl ResourceTracker {
    pub fn new(limits: ResourceLimits) -> Self {
        Self { limits, call_depth: 0, data_depth: 0 }
    }

    pub fn enter_call(&mut self) -> Result<(), ResourceError> {
        if self.call_depth >= self.limits.max_call_depth {
            return Err(ResourceError::CallDepth { limit: self.limits.max_call_depth, depth: self.call_depth + 1 });
        }
        self.call_depth += 1;
        Ok(())
    }

    pub fn exit_call(&mut self) {
        self.call_depth = self.call_depth.saturating_sub(1);
    }

    pub fn enter_data_recursion(&mut self) -> Result<(), ResourceError> {
        if self.data_depth >= self.limits.max_data_recursion_depth {
            return Err(ResourceError::DataRecursion {
                limit: self.limits.max_data_recursion_depth,
                depth: self.data_depth + 1,
            });
        }
        self.data_depth += 1;
        Ok(())
    }

    pub fn exit_data_recursion(&mut self) {
        self.data_depth = self.data_depth.saturating_sub(1);
    }

    pub fn check_timer_count(&self, live: u32) -> Result<(), ResourceError> {
        if live >= self.limits.max_live_timers {
            return Err(ResourceError::TooManyTimers { limit: self.limits.max_live_timers });
        }
        Ok(())
    }

    pub fn call_depth(&self) -> u32 {
        self.call_depth
    }

    /// Checked by `evaluator::generator::push_yield` before queuing one more
    /// yielded value onto a generator drive's buffer.
    pub fn check_generator_yield(&self, queued: u32) -> Result<(), ResourceError> {
        if queued >= self.limits.max_generator_yields {
            return Err(ResourceError::GeneratorYieldLimit { limit: self.limits.max_generator_yields });
        }
        Ok(())
    }
}
