//! Interactive example extraction.
//!
//! A block of text is scanned line by line. A prompt line (`>>> `) opens an example, continuation
//! lines (`... `) at the same indentation extend its source, and the following non-blank,
//! non-prompt lines are its expected output. A blank line or the next prompt ends the output.

use runtest_core::conventions::{CONTINUATION, DIRECTIVE_MARKER, PROMPT};

use super::{ExampleRecord, ParseFailure};
use crate::config::OptionFlags;

const TAB_WIDTH: usize = 8;

/// Traceback headers that announce an expected exception.
const TRACEBACK_HEADERS: &[&str] = &["Traceback (most recent call last):", "Traceback (innermost last):"];

/// Extracts [`ExampleRecord`]s from documentation text.
///
/// The extractor holds no state: extracting the same text twice yields the same records.
///
/// ## Examples
/// ```rust
/// use runtest::doctest::ExampleExtractor;
///
/// let text = "Adding:\n\n>>> 1 + 1\n2\n\n>>> print('a')\na\n";
/// let examples = ExampleExtractor.extract(text).unwrap();
/// assert_eq!(examples.len(), 2);
/// assert_eq!(examples[0].source, "1 + 1\n");
/// assert_eq!(examples[0].want, "2\n");
/// assert_eq!(examples[1].lineno, 5);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct ExampleExtractor;

impl ExampleExtractor {
    /// Lazily iterate over the examples of `text`.
    pub fn examples(&self, text: &str) -> Examples {
        Examples {
            lines: text.lines().map(expand_tabs).collect(),
            pos: 0,
            failed: false,
        }
    }

    /// Every example of `text`, or the first malformed one.
    #[tracing::instrument(skip_all, fields(len = text.len()))]
    pub fn extract(&self, text: &str) -> Result<Vec<ExampleRecord>, ParseFailure> {
        self.examples(text).collect()
    }
}

/// Iterator returned by [`ExampleExtractor::examples`]; stops after the first error.
#[derive(Debug, Clone)]
pub struct Examples {
    lines: Vec<String>,
    pos: usize,
    failed: bool,
}

impl Iterator for Examples {
    type Item = Result<ExampleRecord, ParseFailure>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        loop {
            let start = self.pos;
            let line = self.lines.get(start)?;
            let Some(indent) = marker_indent(line, PROMPT) else {
                self.pos += 1;
                continue;
            };
            match self.example_at(start, indent) {
                Ok(Some(example)) => return Some(Ok(example)),
                Ok(None) => continue,
                Err(err) => {
                    self.failed = true;
                    return Some(Err(err));
                }
            }
        }
    }
}

impl Examples {
    /// Parse the example whose prompt is on line `start`; `None` for a prompt with nothing to run.
    fn example_at(&mut self, start: usize, indent: usize) -> Result<Option<ExampleRecord>, ParseFailure> {
        let mut source_lines = vec![self.source_part(start, indent, PROMPT)?];
        self.pos = start + 1;

        while let Some(line) = self.lines.get(self.pos) {
            match marker_indent(line, CONTINUATION) {
                Some(other) if other == indent => {}
                Some(_) => {
                    return Err(ParseFailure::new(
                        self.pos,
                        format!("inconsistent leading whitespace: {line:?}"),
                    ));
                }
                None => break,
            }
            source_lines.push(self.source_part(self.pos, indent, CONTINUATION)?);
            self.pos += 1;
        }

        let mut want_lines = Vec::new();
        while let Some(line) = self.lines.get(self.pos) {
            if line.trim().is_empty() || marker_indent(line, PROMPT).is_some() {
                break;
            }
            if leading_spaces(line) < indent {
                return Err(ParseFailure::new(
                    self.pos,
                    format!("inconsistent leading whitespace: {line:?}"),
                ));
            }
            want_lines.push(&line[indent..]);
            self.pos += 1;
        }

        let mut source = source_lines.join("\n");
        source.push('\n');
        let options = parse_directives(&source_lines).map_err(|message| ParseFailure::new(start, message))?;
        if is_blank_or_comment(&source_lines) {
            if !options.is_empty() {
                return Err(ParseFailure::new(
                    start,
                    "option directive on a line with no example".to_string(),
                ));
            }
            return Ok(None);
        }

        let mut want = want_lines.join("\n");
        if !want.is_empty() {
            want.push('\n');
        }
        let exc_msg = expected_exception(&want);
        Ok(Some(ExampleRecord {
            source,
            want,
            exc_msg,
            lineno: start,
            indent,
            options,
        }))
    }

    /// Text after the marker on line `index`, which must be followed by a space or end the line.
    fn source_part(&self, index: usize, indent: usize, marker: &str) -> Result<String, ParseFailure> {
        let line = &self.lines[index];
        let after = indent + marker.len();
        match line[after..].chars().next() {
            None => Ok(String::new()),
            Some(' ') => Ok(line[after + 1..].to_string()),
            Some(_) => Err(ParseFailure::new(index, format!("lacks blank after {marker}: {line:?}"))),
        }
    }
}

/// Column of `marker` when the line, after leading spaces, starts with it.
fn marker_indent(line: &str, marker: &str) -> Option<usize> {
    let indent = leading_spaces(line);
    line[indent..].starts_with(marker).then_some(indent)
}

fn leading_spaces(line: &str) -> usize {
    line.len() - line.trim_start_matches(' ').len()
}

fn expand_tabs(line: &str) -> String {
    if !line.contains('\t') {
        return line.to_string();
    }
    let mut out = String::with_capacity(line.len() + TAB_WIDTH);
    let mut column = 0;
    for ch in line.chars() {
        if ch == '\t' {
            let pad = TAB_WIDTH - column % TAB_WIDTH;
            out.extend(std::iter::repeat_n(' ', pad));
            column += pad;
        } else {
            out.push(ch);
            column += 1;
        }
    }
    out
}

fn is_blank_or_comment(source_lines: &[String]) -> bool {
    let first = source_lines.first().map(|l| l.trim_start_matches(' ')).unwrap_or("");
    source_lines.len() == 1 && (first.trim_end().is_empty() || first.starts_with('#'))
}

/// Inline `# doctest: +FLAG, -FLAG` directives of an example, in order of appearance.
fn parse_directives(source_lines: &[String]) -> Result<Vec<(OptionFlags, bool)>, String> {
    let mut options = Vec::new();
    for line in source_lines {
        let Some(spec) = directive_of(line) else {
            continue;
        };
        for option in spec.replace(',', " ").split_whitespace() {
            let (enable, name) = match option.split_at_checked(1) {
                Some(("+", name)) => (true, name),
                Some(("-", name)) => (false, name),
                _ => return Err(format!("invalid option: {option:?}")),
            };
            let flag = OptionFlags::parse_name(name).ok_or_else(|| format!("invalid option: {option:?}"))?;
            options.push((flag, enable));
        }
    }
    Ok(options)
}

fn directive_of(line: &str) -> Option<&str> {
    for (at, _) in line.match_indices('#') {
        let rest = line[at + 1..].trim_start();
        if let Some(spec) = rest.strip_prefix(DIRECTIVE_MARKER) {
            if !spec.contains(['\'', '"']) {
                return Some(spec.trim());
            }
        }
    }
    None
}

/// The `Type: message` part of an expected traceback, from its first unindented word line onward.
fn expected_exception(want: &str) -> Option<String> {
    let mut lines = want.split_inclusive('\n');
    let header = lines.next()?.trim_end();
    if !TRACEBACK_HEADERS.contains(&header) {
        return None;
    }
    let mut rest = lines.skip_while(|l| !l.starts_with(|c: char| c.is_alphanumeric() || c == '_'));
    let first = rest.next()?;
    let mut msg = first.to_string();
    rest.for_each(|l| msg.push_str(l));
    Some(msg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn extract(text: &str) -> Vec<ExampleRecord> {
        ExampleExtractor.extract(text).unwrap()
    }

    #[test]
    fn test_empty_block_has_no_examples() {
        assert!(extract("").is_empty());
        assert!(extract("Just prose.\nNo prompts here.\n").is_empty());
    }

    #[test]
    fn test_two_examples_with_offsets() {
        let text = ">>> a = 1\n>>> a + 1\n2\n\ntext\n>>> print('x')\nx\n";
        let examples = extract(text);
        assert_eq!(examples.len(), 3);
        assert_eq!(examples[0].lineno, 0);
        assert_eq!(examples[0].want, "");
        assert_eq!(examples[1].lineno, 1);
        assert_eq!(examples[1].want, "2\n");
        assert_eq!(examples[2].lineno, 5);
        assert_eq!(examples[2].source, "print('x')\n");
    }

    #[test]
    fn test_indented_docstring_examples() {
        let text = "Area.\n\n    >>> area(2, 3)\n    6\n    ";
        let examples = extract(text);
        assert_eq!(examples.len(), 1);
        assert_eq!(examples[0].indent, 4);
        assert_eq!(examples[0].lineno, 2);
        assert_eq!(examples[0].want, "6\n");
    }

    #[test]
    fn test_continuation_lines_join_the_source() {
        let text = ">>> def f(x):\n...     return x * 2\n...\n>>> f(2)\n4\n";
        let examples = extract(text);
        assert_eq!(examples[0].source, "def f(x):\n    return x * 2\n\n");
        assert_eq!(examples[1].want, "4\n");
    }

    #[test]
    fn test_prompt_with_trailing_whitespace_is_valid() {
        let examples = extract(">>> x = 1   \n>>> x\n1\n");
        assert_eq!(examples.len(), 2);
        assert_eq!(examples[0].source, "x = 1   \n");
    }

    #[test]
    fn test_output_runs_to_end_of_block() {
        let examples = extract(">>> print('a\\nb')\na\nb");
        assert_eq!(examples[0].want, "a\nb\n");
    }

    #[test]
    fn test_comment_only_prompt_is_skipped() {
        let examples = extract(">>> # setup follows\n>>> 1\n1\n");
        assert_eq!(examples.len(), 1);
        assert_eq!(examples[0].source, "1\n");
    }

    #[test]
    fn test_missing_blank_after_prompt_fails() {
        let err = ExampleExtractor.extract("ok\n>>>x = 1\n").unwrap_err();
        assert_eq!(err.line, 1);
        assert!(err.message.contains("lacks blank after >>>"));
    }

    #[test]
    fn test_under_indented_output_fails() {
        let err = ExampleExtractor.extract("    >>> 1\n  1\n").unwrap_err();
        assert_eq!(err.line, 1);
        assert!(err.message.contains("inconsistent leading whitespace"));
    }

    #[test]
    fn test_misaligned_continuation_fails() {
        let err = ExampleExtractor.extract(">>> x = (1,\n    ... 2)\n").unwrap_err();
        assert_eq!(err.line, 1);
        assert!(err.message.contains("inconsistent leading whitespace"));

        let err = ExampleExtractor.extract("    >>> f(1,\n  ... 2)\n").unwrap_err();
        assert_eq!(err.line, 1);
    }

    #[test]
    fn test_directives() {
        let examples = extract(">>> list(range(20))  # doctest: +ELLIPSIS, -NORMALIZE_WHITESPACE\n[0, 1, ..., 19]\n");
        assert_eq!(
            examples[0].options,
            vec![(OptionFlags::ELLIPSIS, true), (OptionFlags::NORMALIZE_WHITESPACE, false)]
        );
        assert!(ExampleExtractor.extract(">>> 1  # doctest: +BOGUS\n1\n").is_err());
        assert!(ExampleExtractor.extract(">>> # doctest: +ELLIPSIS\n").is_err());
    }

    #[test]
    fn test_expected_exception_message() {
        let text = ">>> 1 / 0\nTraceback (most recent call last):\n  ...\nZeroDivisionError: division by zero\n";
        let examples = extract(text);
        assert_eq!(examples[0].exc_msg.as_deref(), Some("ZeroDivisionError: division by zero\n"));
        assert_eq!(extract(">>> 1\n1\n")[0].exc_msg, None);
    }

    #[test]
    fn test_tabs_are_expanded() {
        let examples = extract("\t>>> 1\n\t1\n");
        assert_eq!(examples[0].indent, 8);
        assert_eq!(examples[0].want, "1\n");
    }

    proptest! {
        #[test]
        fn prop_extraction_is_restartable(text in "([ >.a-z0-9\n]{0,40})") {
            let first = ExampleExtractor.extract(&text);
            let second = ExampleExtractor.extract(&text);
            prop_assert_eq!(first, second);
        }
    }
}
