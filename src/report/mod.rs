//! Report rendering.
//!
//! The formatter writes one header per documentation block or test class and one status line per
//! example or test method. A header is only written when it differs from the last one written;
//! suppressing a header never suppresses a result line.
//!
//! ## Modules
//!
//! - `style` - glyphs and the ANSI [`Palette`]
//! - `terminal` - terminal size and interactivity
//! - `wrap` - wrapping and truncation

pub mod style;
pub mod terminal;
pub mod wrap;

use std::io::{self, Write};
use std::path::Path;
use std::time::Duration;

pub use style::{CHAR_FAILED, CHAR_OK, CHAR_SKIP, Palette};
pub use terminal::TerminalSize;

use crate::doctest::{ExampleBlock, ExampleRecord};
use crate::runner::outcome::{ExampleOutcome, Fault, LastSeen, MethodOutcome, RunState};
use crate::unittest::{TestGroup, TestMethodRecord};
use wrap::{truncate, wrap_text};

/// Writes the line-oriented report and keeps the run's counters current.
pub struct ReportFormatter<W: Write> {
    out: W,
    palette: Palette,
    width: usize,
}

impl<W: Write> ReportFormatter<W> {
    pub fn new(out: W, palette: Palette, width: usize) -> Self {
        Self { out, palette, width }
    }

    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn writer(&mut self) -> &mut W {
        &mut self.out
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    // ========================================================================
    // Documentation examples
    // ========================================================================

    /// Count an example as attempted and write its block header if needed.
    pub fn start_example(&mut self, state: &mut RunState, block: &ExampleBlock, display_name: &str) -> io::Result<()> {
        state.record_attempt();
        let seen = LastSeen::Block {
            name: block.name.clone(),
            file: block.file.clone(),
        };
        if state.last_seen != seen {
            writeln!(
                self.out,
                "{}>>> {} <{}:{}>{}",
                self.palette.doctest_header,
                display_name,
                block.file.display(),
                block.header_line(),
                self.palette.reset
            )?;
            state.last_seen = seen;
        }
        Ok(())
    }

    pub fn example_result(
        &mut self,
        state: &mut RunState,
        block: &ExampleBlock,
        example: &ExampleRecord,
        outcome: &ExampleOutcome,
    ) -> io::Result<()> {
        let line = block.example_line(example);
        let text = example_text(example);
        match outcome {
            ExampleOutcome::Success => self.result_line(CHAR_OK, &text, line),
            ExampleOutcome::Failure { got } => {
                state.record_failure();
                self.result_line(CHAR_FAILED, &text, line)?;
                self.expected_got(&example.want, got)
            }
            ExampleOutcome::UnexpectedException(fault) => {
                state.record_failure();
                self.result_line(CHAR_FAILED, &text, line)?;
                self.traceback(fault)
            }
        }
    }

    fn expected_got(&mut self, want: &str, got: &str) -> io::Result<()> {
        let prefix = self.palette.failure_prefix();
        for (label, text) in [("Expected", want), ("Got", got)] {
            if text.is_empty() {
                writeln!(self.out, "{prefix} {label} nothing")?;
                continue;
            }
            writeln!(self.out, "{prefix} {label}:")?;
            for line in wrap_text(text, self.width, "  ") {
                writeln!(self.out, "{prefix} {line}")?;
            }
        }
        Ok(())
    }

    // ========================================================================
    // Test methods
    // ========================================================================

    /// Count a test method as attempted and write its class header if needed.
    pub fn start_test(&mut self, state: &mut RunState, group: &TestGroup, file: &Path) -> io::Result<()> {
        state.record_attempt();
        self.class_header(state, group, file)
    }

    fn class_header(&mut self, state: &mut RunState, group: &TestGroup, file: &Path) -> io::Result<()> {
        let seen = LastSeen::Class {
            name: group.class_name.clone(),
            file: file.to_path_buf(),
            line: group.line,
        };
        if state.last_seen != seen {
            writeln!(
                self.out,
                "{}::: {} <{}:{}>{}",
                self.palette.unittest_header,
                group.class_name,
                file.display(),
                group.line,
                self.palette.reset
            )?;
            state.last_seen = seen;
        }
        Ok(())
    }

    pub fn test_result(
        &mut self,
        state: &mut RunState,
        method: &TestMethodRecord,
        outcome: &MethodOutcome,
    ) -> io::Result<()> {
        let line = method.line;
        match outcome {
            MethodOutcome::Success => self.result_line(CHAR_OK, &method.name, line),
            MethodOutcome::Failure(fault) | MethodOutcome::Error(fault) => {
                state.record_failure();
                self.result_line(CHAR_FAILED, &method.name, line)?;
                self.traceback(fault)
            }
            MethodOutcome::Skip(reason) => {
                state.record_skip();
                writeln!(
                    self.out,
                    "{} {CHAR_SKIP} SKIP: {}{} <line {line}>",
                    self.palette.skip, method.name, self.palette.reset
                )?;
                let prefix = self.palette.skip_prefix();
                for text in wrap_text(&format!("REASON: {reason}"), self.width, "") {
                    writeln!(self.out, "{prefix}{text}")?;
                }
                Ok(())
            }
            MethodOutcome::ExpectedFailure(_) => {
                self.result_line(CHAR_OK, &format!("EXPECTED FAILURE: {}", method.name), line)
            }
            MethodOutcome::UnexpectedSuccess => {
                state.record_failure();
                self.result_line(CHAR_FAILED, &format!("UNEXPECTED SUCCESS: {}", method.name), line)
            }
        }
    }

    /// A class-level fixture (`setUpClass`/`tearDownClass`) raised; counts as one failed test.
    pub fn class_error(
        &mut self,
        state: &mut RunState,
        group: &TestGroup,
        file: &Path,
        hook: &str,
        fault: &Fault,
    ) -> io::Result<()> {
        state.record_attempt();
        self.class_header(state, group, file)?;
        state.record_failure();
        self.result_line(CHAR_FAILED, hook, group.line)?;
        self.traceback(fault)
    }

    // ========================================================================
    // Shared pieces
    // ========================================================================

    fn result_line(&mut self, glyph: char, text: &str, line: usize) -> io::Result<()> {
        let color = if glyph == CHAR_OK {
            self.palette.ok
        } else {
            self.palette.failed
        };
        let lineno = format!(" <line {line}>");
        let text = truncate(text, self.width.saturating_sub(4 + lineno.len()));
        writeln!(self.out, "{color} {glyph} {text}{}{lineno}", self.palette.reset)
    }

    fn traceback(&mut self, fault: &Fault) -> io::Result<()> {
        let prefix = self.palette.failure_prefix();
        for line in wrap_text(&fault.traceback, self.width, " ") {
            writeln!(self.out, "{prefix}{line}")?;
        }
        Ok(())
    }

    /// An explicitly requested file that does not exist.
    pub fn missing_file(&mut self, path: &Path) -> io::Result<()> {
        writeln!(
            self.out,
            "{}*** {}: No such file{}",
            self.palette.failed,
            path.display(),
            self.palette.reset
        )
    }

    /// Final `Ran N tests ...` line; nothing when no test was attempted.
    pub fn summary(&mut self, state: &RunState, elapsed: Duration) -> io::Result<()> {
        let counters = state.counters;
        if counters.attempted == 0 {
            return Ok(());
        }
        let mut msg = format!("Ran {} tests in {:.3}s", counters.attempted, elapsed.as_secs_f64());
        if counters.skipped > 0 {
            msg.push_str(&format!(", {} skipped", counters.skipped));
        }
        let color = if counters.failed > 0 {
            msg.push_str(&format!(", {} failed", counters.failed));
            self.palette.result_failed
        } else {
            msg.push_str(", all passed");
            self.palette.result_ok
        };
        let banner = self.palette.banner(color, &msg, self.width);
        self.out.write_all(banner.as_bytes())?;
        self.out.flush()
    }
}

/// An example's source on one line: continuation lines joined with spaces.
fn example_text(example: &ExampleRecord) -> String {
    let mut lines = example.summary().lines();
    let mut text = lines.next().unwrap_or("").trim_end().to_string();
    for line in lines.map(str::trim).filter(|l| !l.is_empty()) {
        text.push(' ');
        text.push_str(line);
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn formatter() -> ReportFormatter<Vec<u8>> {
        ReportFormatter::new(Vec::new(), Palette::PLAIN, 80)
    }

    fn output(report: ReportFormatter<Vec<u8>>) -> String {
        String::from_utf8(report.into_inner()).unwrap()
    }

    fn block(want: &str) -> ExampleBlock {
        ExampleBlock {
            name: "pkg.mod.f".to_string(),
            file: PathBuf::from("pkg/mod.py"),
            lineno: Some(4),
            examples: vec![ExampleRecord {
                source: "f(3)\n".to_string(),
                want: want.to_string(),
                exc_msg: None,
                lineno: 2,
                indent: 4,
                options: Vec::new(),
            }],
        }
    }

    fn group() -> TestGroup {
        TestGroup {
            class_id: 0,
            class_name: "MathTest".to_string(),
            line: 10,
            methods: vec![TestMethodRecord {
                name: "test_add".to_string(),
                line: 11,
            }],
        }
    }

    #[test]
    fn test_header_printed_once_per_block() {
        let mut report = formatter();
        let mut state = RunState::default();
        let block = block("7\n");
        let example = &block.examples[0];
        for _ in 0..2 {
            report.start_example(&mut state, &block, "mod.f").unwrap();
            report
                .example_result(&mut state, &block, example, &ExampleOutcome::Success)
                .unwrap();
        }
        let text = output(report);
        assert_eq!(text, ">>> mod.f <pkg/mod.py:5>\n ✓ f(3) <line 7>\n ✓ f(3) <line 7>\n");
        assert_eq!(state.counters.attempted, 2);
    }

    #[test]
    fn test_failure_shows_expected_and_got() {
        let mut report = formatter();
        let mut state = RunState::default();
        let block = block("7\n");
        report.start_example(&mut state, &block, "mod.f").unwrap();
        let outcome = ExampleOutcome::Failure { got: "8\n".to_string() };
        report
            .example_result(&mut state, &block, &block.examples[0], &outcome)
            .unwrap();
        let text = output(report);
        assert!(text.contains(" ✗ f(3) <line 7>\n"));
        assert!(text.contains("   Expected:\n     7\n   Got:\n     8\n"));
        assert_eq!(state.counters.failed, 1);
    }

    #[test]
    fn test_method_outcomes() {
        let mut report = formatter();
        let mut state = RunState::default();
        let group = group();
        let method = &group.methods[0];
        let fault = Fault {
            exception_only: "AssertionError: 1 != 2".to_string(),
            traceback: "Traceback (most recent call last):\n  File \"t.py\", line 12, in test_add\nAssertionError: 1 != 2"
                .to_string(),
        };
        let outcomes = [
            MethodOutcome::Success,
            MethodOutcome::Failure(fault.clone()),
            MethodOutcome::Skip("not today".to_string()),
            MethodOutcome::ExpectedFailure(fault),
            MethodOutcome::UnexpectedSuccess,
        ];
        for outcome in &outcomes {
            report.start_test(&mut state, &group, Path::new("t.py")).unwrap();
            report.test_result(&mut state, method, outcome).unwrap();
        }
        let text = output(report);
        let expected = "\
::: MathTest <t.py:10>
 ✓ test_add <line 11>
 ✗ test_add <line 11>
   Traceback (most recent call last):
     File \"t.py\", line 12, in test_add
   AssertionError: 1 != 2
 - SKIP: test_add <line 11>
   REASON: not today
 ✓ EXPECTED FAILURE: test_add <line 11>
 ✗ UNEXPECTED SUCCESS: test_add <line 11>
";
        assert_eq!(text, expected);
        assert_eq!(state.counters.attempted, 5);
        assert_eq!(state.counters.failed, 2);
        assert_eq!(state.counters.skipped, 1);
    }

    #[test]
    fn test_long_example_is_truncated() {
        let mut report = ReportFormatter::new(Vec::new(), Palette::PLAIN, 30);
        let mut state = RunState::default();
        let mut block = block("");
        block.examples[0].source = "a_very_long_function_name(with, many, arguments)\n".to_string();
        let example = block.examples[0].clone();
        report
            .example_result(&mut state, &block, &example, &ExampleOutcome::Success)
            .unwrap();
        let text = output(report);
        assert_eq!(text, " ✓ a_very_long_fu... <line 7>\n");
    }

    #[test]
    fn test_summary() {
        let mut report = formatter();
        let mut state = RunState::default();
        report.summary(&state, Duration::from_millis(5)).unwrap();
        state.counters.attempted = 3;
        state.counters.skipped = 1;
        state.counters.failed = 1;
        report.summary(&state, Duration::from_millis(1250)).unwrap();
        assert_eq!(output(report), "\nRan 3 tests in 1.250s, 1 skipped, 1 failed\n\n");
    }

    #[test]
    fn test_missing_file() {
        let mut report = formatter();
        report.missing_file(Path::new("/work/nope.py")).unwrap();
        assert_eq!(output(report), "*** /work/nope.py: No such file\n");
    }
}
