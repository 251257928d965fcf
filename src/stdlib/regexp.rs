//! `RegExp` compilation (`§4.7`). ECMAScript regex syntax is close enough to
//! `regex`'s that most patterns compile directly; patterns using
//! lookaround/backreferences fall back to `fancy-regex`, which accepts a
//! near-identical syntax at the cost of losing the linear-time guarantee —
//! the same two-crate split the teacher's pattern-matching layer uses for
//! the same reason (`Cargo.toml` already carries both).

use crate::diagnostics::{ParseError, ParseErrorKind};
use crate::source::SourceHandle;

pub(crate) enum CompiledRegex {
    Fast(regex::Regex),
    Fancy(fancy_regex::Regex),
}

impl std::fmt::Debug for CompiledRegex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("CompiledRegex")
    }
}

impl CompiledRegex {
    pub fn compile(pattern: &str, flags: &str) -> Result<Self, ParseError> {
        let translated = translate_pattern(pattern);
        let mut builder = regex::RegexBuilder::new(&translated);
        builder.case_insensitive(flags.contains('i'));
        builder.multi_line(flags.contains('m'));
        builder.dot_matches_new_line(flags.contains('s'));
        match builder.build() {
            Ok(re) => Ok(Self::Fast(re)),
            Err(_) => {
                let mut fancy = fancy_regex::RegexBuilder::new(&translated);
                fancy.case_insensitive(flags.contains('i'));
                fancy.multi_line(flags.contains('m'));
                fancy.dot_matches_new_line(flags.contains('s'));
                fancy.build().map(Self::Fancy).map_err(|e| {
                    ParseError::new(
                        ParseErrorKind::Other(format!("invalid regular expression: {e}")),
                        SourceHandle::new("<regexp>", pattern.to_string()),
                        1,
                        0,
                    )
                })
            }
        }
    }

    pub fn is_match(&self, text: &str) -> bool {
        match self {
            Self::Fast(re) => re.is_match(text),
            Self::Fancy(re) => re.is_match(text).unwrap_or(false),
        }
    }

    /// `(match_start, match_end, captures)` for the first match at or after
    /// `from` (byte offset) — the shape both `exec` and `String.prototype`
    /// match methods build on.
    pub fn find_from(&self, text: &str, from: usize) -> Option<RegexMatch> {
        if from > text.len() {
            return None;
        }
        match self {
            Self::Fast(re) => {
                let caps = re.captures(&text[from..])?;
                Some(RegexMatch::from_fast(&caps, from))
            }
            Self::Fancy(re) => {
                let caps = re.captures(&text[from..]).ok()??;
                Some(RegexMatch::from_fancy(&caps, from))
            }
        }
    }
}

pub(crate) struct RegexMatch {
    pub start: usize,
    pub end: usize,
    /// Group 0 is the whole match; `None` entries are unmatched optional groups.
    pub groups: Vec<Option<(usize, usize)>>,
    pub names: Vec<Option<String>>,
}

impl RegexMatch {
    fn from_fast(caps: &regex::Captures, offset: usize) -> Self {
        let groups = caps.iter().map(|m| m.map(|m| (m.start() + offset, m.end() + offset))).collect();
        Self { start: caps.get(0).unwrap().start() + offset, end: caps.get(0).unwrap().end() + offset, groups, names: Vec::new() }
    }

    fn from_fancy(caps: &fancy_regex::Captures, offset: usize) -> Self {
        let groups = caps.iter().map(|m| m.map(|m| (m.start() + offset, m.end() + offset))).collect();
        Self { start: caps.get(0).unwrap().start() + offset, end: caps.get(0).unwrap().end() + offset, groups, names: Vec::new() }
    }
}

/// ECMAScript regex syntax deviates from `regex`'s in a handful of spots;
/// translate the common ones rather than rejecting them outright.
fn translate_pattern(pattern: &str) -> String {
    // `regex` already accepts `\d`, `\w`, `\s`, non-capturing groups, etc. The
    // one routine JS-ism it doesn't accept is inline case-insensitive groups
    // like `(?i)`, which JS doesn't have either, so no translation is needed
    // in the common case — this function exists as the seam future escape-
    // sequence translations (e.g. `\cX` control escapes) would hang off of.
    pattern.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compiles_simple_pattern() {
        let re = CompiledRegex::compile(r"\d+", "").unwrap();
        assert!(re.is_match("abc123"));
    }

    #[test]
    fn falls_back_to_fancy_for_lookaround() {
        let re = CompiledRegex::compile(r"foo(?=bar)", "").unwrap();
        assert!(re.is_match("foobar"));
        assert!(!re.is_match("foobaz"));
    }

    #[test]
    fn find_from_reports_offsets() {
        let re = CompiledRegex::compile(r"b", "").unwrap();
        let m = re.find_from("abab", 1).unwrap();
        assert_eq!((m.start, m.end), (1, 2));
    }
}
