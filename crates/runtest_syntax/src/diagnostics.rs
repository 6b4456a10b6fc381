//! Diagnostics for the syntax frontend.
//!
//! [`CompileError`] is the single error type produced by the lexer and parser. It implements
//! [`miette::Diagnostic`] so callers can render it with source context, and [`LineIndex`] maps
//! byte offsets back to 1-based lines for tracebacks and report headers.

use std::fmt;

use miette::{LabeledSpan, NamedSource, Report};

use crate::ast::Span;

/// A syntax-level error with location information.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{message}")]
pub struct CompileError {
    pub message: String,
    pub span: Span,
    pub kind: ErrorKind,
    pub notes: Vec<String>,
    pub hints: Vec<String>,
}

impl CompileError {
    pub fn new(message: String, span: Span) -> Self {
        Self {
            message,
            span,
            kind: ErrorKind::Error,
            notes: Vec::new(),
            hints: Vec::new(),
        }
    }

    pub fn syntax(message: String, span: Span) -> Self {
        Self {
            kind: ErrorKind::Syntax,
            ..Self::new(message, span)
        }
    }

    pub fn indentation(message: String, span: Span) -> Self {
        Self {
            kind: ErrorKind::Indentation,
            ..Self::new(message, span)
        }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hints.push(hint.into());
        self
    }

    /// Name of the exception type the runtime raises for this error.
    pub fn exception_name(&self) -> &'static str {
        match self.kind {
            ErrorKind::Indentation => "IndentationError",
            ErrorKind::Error | ErrorKind::Syntax => "SyntaxError",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Error,
    Syntax,
    Indentation,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::Error => write!(f, "error"),
            ErrorKind::Syntax => write!(f, "syntax error"),
            ErrorKind::Indentation => write!(f, "indentation error"),
        }
    }
}

impl miette::Diagnostic for CompileError {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        Some(Box::new(self.kind))
    }

    fn help<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        if self.notes.is_empty() && self.hints.is_empty() {
            return None;
        }
        let lines: Vec<&str> = self.notes.iter().chain(self.hints.iter()).map(String::as_str).collect();
        Some(Box::new(lines.join("\n")))
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        let len = self.span.end.saturating_sub(self.span.start).max(1);
        Some(Box::new(std::iter::once(LabeledSpan::new_with_span(
            None,
            (self.span.start, len),
        ))))
    }
}

/// Render an error with its source context through miette's report handler.
pub fn render(file_name: &str, source: &str, error: &CompileError) -> String {
    let report = Report::new(error.clone()).with_source_code(NamedSource::new(file_name, source.to_string()));
    format!("{report:?}")
}

// ============================================================================
// Line lookup
// ============================================================================

/// Precomputed line starts for one source text.
///
/// ## Examples
/// ```rust
/// use runtest_syntax::LineIndex;
///
/// let index = LineIndex::new("a\nbc\n");
/// assert_eq!(index.line(0), 1);
/// assert_eq!(index.line(3), 2);
/// assert_eq!(index.line_col(3), (2, 2));
/// ```
#[derive(Debug, Clone)]
pub struct LineIndex {
    starts: Vec<usize>,
    len: usize,
}

impl LineIndex {
    pub fn new(source: &str) -> Self {
        let mut starts = vec![0];
        starts.extend(source.match_indices('\n').map(|(i, _)| i + 1));
        Self {
            starts,
            len: source.len(),
        }
    }

    /// 1-based line containing byte `offset`.
    pub fn line(&self, offset: usize) -> usize {
        let offset = offset.min(self.len);
        match self.starts.binary_search(&offset) {
            Ok(idx) => idx + 1,
            Err(idx) => idx,
        }
    }

    /// 1-based (line, column) of byte `offset`.
    pub fn line_col(&self, offset: usize) -> (usize, usize) {
        let line = self.line(offset);
        let start = self.starts[line - 1];
        (line, offset.min(self.len) - start + 1)
    }

    /// Byte range of a 1-based line, without its newline.
    pub fn line_range(&self, line: usize, source: &str) -> Option<(usize, usize)> {
        let start = *self.starts.get(line.checked_sub(1)?)?;
        if start > self.len {
            return None;
        }
        let end = source[start..].find('\n').map(|i| start + i).unwrap_or(self.len);
        Some((start, end))
    }

    pub fn line_count(&self) -> usize {
        if self.starts.last() == Some(&self.len) {
            self.starts.len() - 1
        } else {
            self.starts.len()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_index_boundaries() {
        let src = "first\nsecond\n\nfourth";
        let index = LineIndex::new(src);
        assert_eq!(index.line(0), 1);
        assert_eq!(index.line(5), 1);
        assert_eq!(index.line(6), 2);
        assert_eq!(index.line(13), 3);
        assert_eq!(index.line(14), 4);
        assert_eq!(index.line_count(), 4);
        assert_eq!(index.line_range(2, src), Some((6, 12)));
        assert_eq!(index.line_range(9, src), None);
    }

    #[test]
    fn test_exception_name_follows_kind() {
        let err = CompileError::indentation("unexpected indent".into(), Span::new(0, 1));
        assert_eq!(err.exception_name(), "IndentationError");
        let err = CompileError::syntax("invalid syntax".into(), Span::new(0, 1)).with_hint("check the brackets");
        assert_eq!(err.exception_name(), "SyntaxError");
        assert_eq!(err.hints.len(), 1);
    }

    #[test]
    fn test_render_mentions_message() {
        let err = CompileError::syntax("invalid syntax".into(), Span::new(2, 3));
        let rendered = render("mod.py", "x = )\n", &err);
        assert!(rendered.contains("invalid syntax"));
    }
}
