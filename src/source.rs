//! Source provenance: positions, spans, and the caret-annotated snippets used
//! by parse diagnostics and exception stack frames.

use std::fmt;
use std::sync::Arc;

/// Handle to a source buffer. Cheap to copy; every [`SourceRef`] carries one
/// so diagnostics never need to thread a separate "which file" parameter.
#[derive(Clone)]
pub struct SourceHandle {
    pub name: Arc<str>,
    pub text: Arc<str>,
}

impl fmt::Debug for SourceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceHandle").field("name", &self.name).finish_non_exhaustive()
    }
}

impl PartialEq for SourceHandle {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.text, &other.text)
    }
}

impl SourceHandle {
    pub fn new(name: impl Into<Arc<str>>, text: impl Into<Arc<str>>) -> Self {
        Self { name: name.into(), text: text.into() }
    }
}

/// `(start_offset, end_offset, start_line, start_column, source_handle)`.
///
/// Every IR node and typed AST node carries an optional `SourceRef`.
/// Invariant: offsets are always valid byte offsets into `handle.text`.
#[derive(Clone, PartialEq)]
pub struct SourceRef {
    pub start_offset: u32,
    pub end_offset: u32,
    pub start_line: u32,
    pub start_column: u32,
    pub handle: SourceHandle,
}

impl fmt::Debug for SourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.handle.name, self.start_line, self.start_column)
    }
}

impl SourceRef {
    pub fn new(handle: SourceHandle, start_offset: u32, end_offset: u32, start_line: u32, start_column: u32) -> Self {
        Self { start_offset, end_offset, start_line, start_column, handle }
    }

    /// Returns the substring of the owning source this reference spans.
    pub fn get_text(&self) -> &str {
        &self.handle.text[self.start_offset as usize..self.end_offset as usize]
    }

    /// Spans from the start of `self` to the end of `other`, keeping `self`'s
    /// start position. Used when combining a sequence of sub-expressions into
    /// one enclosing span (e.g. a binary expression spanning both operands).
    pub fn merge(&self, other: &Self) -> Self {
        Self {
            start_offset: self.start_offset,
            end_offset: other.end_offset,
            start_line: self.start_line,
            start_column: self.start_column,
            handle: self.handle.clone(),
        }
    }
}

/// Maximum total length of a formatted context snippet before both ends are
/// truncated with an ellipsis. Keeps multi-megabyte one-line sources from
/// producing unreadable diagnostics.
const SNIPPET_MAX_LEN: usize = 200;
/// How much of the snippet to keep visible on each side of the error column
/// once truncation kicks in.
const SNIPPET_SIDE_BUDGET: usize = (SNIPPET_MAX_LEN - 3) / 2;

/// Renders the line containing `source_ref` with a caret under the error
/// column, truncating very long lines from both ends while keeping the
/// error column visible.
///
/// ```text
/// 1 | let x = ...(very long expression)... +;
///                                           ^
/// ```
pub(crate) fn render_snippet(handle: &SourceHandle, line: u32, column: u32) -> String {
    let text = &*handle.text;
    let line_text = nth_line(text, line).unwrap_or("");
    let (shown, caret_offset, truncated_left) = truncate_around_column(line_text, column as usize);

    let prefix = format!("{line} | ");
    let mut out = String::new();
    out.push_str(&prefix);
    if truncated_left {
        out.push_str("...");
    }
    out.push_str(shown);
    out.push('\n');
    out.push_str(&" ".repeat(prefix.len() + usize::from(truncated_left) * 3 + caret_offset));
    out.push('^');
    out
}

fn nth_line(text: &str, line: u32) -> Option<&str> {
    text.lines().nth(line.saturating_sub(1) as usize)
}

/// Truncates `line` so the rendered snippet never exceeds `SNIPPET_MAX_LEN`,
/// keeping `column` inside the visible window. Returns the visible slice,
/// the caret's offset within that slice, and whether the left side was cut.
fn truncate_around_column(line: &str, column: usize) -> (&str, usize, bool) {
    if line.len() <= SNIPPET_MAX_LEN {
        return (line, column.min(line.len()), false);
    }
    let start = column.saturating_sub(SNIPPET_SIDE_BUDGET);
    let end = (column + SNIPPET_SIDE_BUDGET).min(line.len());
    // Snap to char boundaries so we never slice through a multi-byte codepoint.
    let start = (start..=column.min(line.len())).find(|&i| line.is_char_boundary(i)).unwrap_or(0);
    let end = (end..=line.len()).find(|&i| line.is_char_boundary(i)).unwrap_or(line.len());
    (&line[start..end], column - start, start > 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snippet_points_at_column() {
        let handle = SourceHandle::new("t.js", "let x = 1\nlet y = ;\n");
        let snippet = render_snippet(&handle, 2, 8);
        assert!(snippet.contains("let y = ;"));
        assert_eq!(snippet.lines().nth(1).unwrap().trim_end().len() - 0, snippet.lines().nth(1).unwrap().len());
        assert!(snippet.ends_with('^'));
    }

    #[test]
    fn snippet_truncates_long_lines() {
        let long = format!("let x = {};", "1 + ".repeat(200));
        let handle = SourceHandle::new("t.js", &long);
        let snippet = render_snippet(&handle, 1, 400);
        assert!(snippet.lines().next().unwrap().len() < long.len());
        assert!(snippet.contains("..."));
    }
}
