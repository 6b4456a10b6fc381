//! Documentation examples: extraction and output comparison.
//!
//! ## Modules
//!
//! - `parser` - [`ExampleExtractor`], text to [`ExampleRecord`]s
//! - `checker` - [`OutputChecker`], expected vs. actual output

pub mod checker;
pub mod parser;

use std::path::PathBuf;

pub use checker::OutputChecker;
pub use parser::{ExampleExtractor, Examples};

use crate::config::OptionFlags;

/// One interactive example.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExampleRecord {
    /// Source with prompts stripped, always ending in a newline.
    pub source: String,
    /// Expected output; empty, or ending in a newline.
    pub want: String,
    /// Expected `Type: message` when `want` is a traceback.
    pub exc_msg: Option<String>,
    /// 0-based line of the prompt, relative to the start of the owning block.
    pub lineno: usize,
    /// Column of the prompt.
    pub indent: usize,
    /// Inline directives: flag and whether it is switched on.
    pub options: Vec<(OptionFlags, bool)>,
}

impl ExampleRecord {
    /// Flags in effect for this example, starting from the run-wide ones.
    pub fn flags(&self, base: OptionFlags) -> OptionFlags {
        self.options.iter().fold(base, |flags, &(flag, enable)| {
            if enable { flags | flag } else { flags - flag }
        })
    }

    /// First source line, the way report lines show it.
    pub fn summary(&self) -> &str {
        self.source.trim_end_matches('\n')
    }
}

/// The examples of one documentation block, executed in order in a shared namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExampleBlock {
    /// Dotted owner name (`pkg.mod.func`), or the file stem for plain-text files.
    pub name: String,
    pub file: PathBuf,
    /// 0-based line where the block starts in `file`; `None` when it has no source position.
    pub lineno: Option<usize>,
    pub examples: Vec<ExampleRecord>,
}

impl ExampleBlock {
    /// 1-based source line of `example`.
    pub fn example_line(&self, example: &ExampleRecord) -> usize {
        self.lineno.unwrap_or(0) + example.lineno + 1
    }

    /// 1-based line shown in the block header.
    pub fn header_line(&self) -> usize {
        self.lineno.map_or(0, |line| line + 1)
    }
}

/// Malformed example text.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, miette::Diagnostic)]
#[error("line {} of the block: {message}", .line + 1)]
#[diagnostic(code(runtest::extract))]
pub struct ParseFailure {
    /// 0-based line within the block
    pub line: usize,
    pub message: String,
}

impl ParseFailure {
    pub fn new(line: usize, message: String) -> Self {
        Self { line, message }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(lineno: usize) -> ExampleRecord {
        ExampleRecord {
            source: "x\n".to_string(),
            want: String::new(),
            exc_msg: None,
            lineno,
            indent: 0,
            options: vec![(OptionFlags::ELLIPSIS, true), (OptionFlags::NORMALIZE_WHITESPACE, false)],
        }
    }

    #[test]
    fn test_flags_apply_directives_in_order() {
        let flags = record(0).flags(OptionFlags::NORMALIZE_WHITESPACE);
        assert_eq!(flags, OptionFlags::ELLIPSIS);
    }

    #[test]
    fn test_example_line_is_absolute() {
        let block = ExampleBlock {
            name: "mod.f".to_string(),
            file: PathBuf::from("mod.py"),
            lineno: Some(9),
            examples: vec![record(3)],
        };
        assert_eq!(block.example_line(&block.examples[0]), 13);
        assert_eq!(block.header_line(), 10);
    }
}
