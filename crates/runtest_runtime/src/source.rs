//! Source text registered with the interpreter, for tracebacks and line tracing.

use std::path::{Path, PathBuf};

use runtest_syntax::LineIndex;

/// One unit of executed source: a module file or an example snippet.
#[derive(Debug)]
pub struct SourceFile {
    /// Name shown in tracebacks (`/abs/pkg/mod.py` or `<doctest pkg.mod.f[0]>`).
    pub name: String,
    /// Present for files loaded from disk; only those are line traced.
    pub path: Option<PathBuf>,
    pub text: String,
    pub lines: LineIndex,
}

impl SourceFile {
    pub fn new(name: impl Into<String>, path: Option<&Path>, text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            name: name.into(),
            path: path.map(Path::to_path_buf),
            lines: LineIndex::new(&text),
            text,
        }
    }

    /// 1-based line containing byte `offset`.
    pub fn line_of(&self, offset: usize) -> usize {
        self.lines.line(offset)
    }

    /// Text of a 1-based line without its newline.
    pub fn line_text(&self, line: usize) -> Option<&str> {
        let (start, end) = self.lines.line_range(line, &self.text)?;
        Some(&self.text[start..end])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_lookup() {
        let file = SourceFile::new("<test>", None, "a = 1\nb = 2\n");
        assert_eq!(file.line_of(6), 2);
        assert_eq!(file.line_text(2), Some("b = 2"));
        assert_eq!(file.line_text(9), None);
    }
}
