//! CLI module for the runtest harness
//!
//! `runtest [OPTIONS] [FILE]...` scans a directory tree (or the given files) for documentation
//! examples and test-case classes, runs them and prints a line-oriented report.
//!
//! ## Modules
//!
//! - `commands` - The test run itself
//!
//! ## Design
//!
//! The CLI uses clap for argument parsing with derive macros.
//! Command functions return `CliResult<T>` instead of calling `process::exit`.
//! Only the top-level `run()` function handles errors and exits.

// Enforce explicit error handling - no panicking in production code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

pub mod commands;

use std::fmt;
use std::path::PathBuf;
use std::process;

use clap::Parser;

use crate::config::{ColorChoice, CoverageOptions, OptionFlags, RunConfig};
use crate::version::RUNTEST_VERSION;

// ============================================================================
// CLI Error handling
// ============================================================================

/// Exit code for CLI operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitCode(pub i32);

impl ExitCode {
    pub const SUCCESS: ExitCode = ExitCode(0);
    pub const FAILURE: ExitCode = ExitCode(1);
    /// Invalid command line, as clap reports it.
    pub const USAGE: ExitCode = ExitCode(2);
}

/// Error type for CLI operations.
///
/// Contains a user-facing message and an exit code. The CLI entry point
/// catches these errors, prints the message, and exits with the code.
#[derive(Debug)]
pub struct CliError {
    /// User-facing error message (already formatted for display)
    pub message: String,
    /// Exit code to return to the shell
    pub exit_code: ExitCode,
}

impl CliError {
    pub fn new(message: impl Into<String>, exit_code: ExitCode) -> Self {
        Self {
            message: message.into(),
            exit_code,
        }
    }

    /// Create a failure error (exit code 1).
    pub fn failure(message: impl Into<String>) -> Self {
        Self::new(message, ExitCode::FAILURE)
    }

    pub fn usage(message: impl Into<String>) -> Self {
        Self::new(message, ExitCode::USAGE)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;

// ============================================================================
// Clap CLI definition
// ============================================================================

/// Run the documentation examples and unit tests of a source tree
#[derive(Parser, Debug)]
#[command(name = "runtest")]
#[command(version = RUNTEST_VERSION)]
#[command(about = "Run the documentation examples and unit tests of a source tree", long_about = None)]
pub struct Cli {
    /// Files to test, relative to the working directory (default: scan the whole tree)
    #[arg(value_name = "FILE")]
    pub files: Vec<PathBuf>,

    /// Working directory and scan root
    #[arg(short = 'd', long = "dir", value_name = "DIR", default_value = ".")]
    pub dir: PathBuf,

    /// Comparison flag applied to every example (e.g. ELLIPSIS); repeatable
    #[arg(short = 'o', long = "option", value_name = "FLAG")]
    pub options: Vec<String>,

    /// When to color the report
    #[arg(long, value_enum, default_value_t = ColorChoice::Auto)]
    pub color: ColorChoice,

    /// Report width in columns (default: terminal width)
    #[arg(long, value_name = "N")]
    pub width: Option<usize>,

    /// Stop after the first failure
    #[arg(short = 'x', long = "exitfirst")]
    pub exit_first: bool,

    /// Measure statement coverage
    #[arg(long)]
    pub coverage: bool,

    /// Also write the coverage table to FILE (implies --coverage)
    #[arg(long = "coverage-text", value_name = "FILE")]
    pub coverage_text: Option<PathBuf>,
}

impl Cli {
    /// Translate the flags into a [`RunConfig`].
    pub fn to_config(&self) -> CliResult<RunConfig> {
        let mut flags = OptionFlags::empty();
        for name in &self.options {
            let flag = OptionFlags::parse_name(name)
                .ok_or_else(|| CliError::usage(format!("error: unknown option flag '{name}'")))?;
            flags |= flag;
        }
        Ok(RunConfig::new()
            .with_root(&self.dir)
            .with_files(self.files.clone())
            .with_option_flags(flags)
            .with_color(self.color)
            .with_width(self.width)
            .with_fail_fast(self.exit_first)
            .with_coverage(CoverageOptions {
                enabled: self.coverage || self.coverage_text.is_some(),
                text_file: self.coverage_text.clone(),
            }))
    }
}

// ============================================================================
// CLI entry point
// ============================================================================

/// Main CLI entry point.
///
/// This is the only place where `process::exit` is called. All command
/// implementations return `CliResult` and errors are handled here.
pub fn run() {
    let cli = Cli::parse();

    match execute(cli) {
        Ok(exit_code) => {
            if exit_code.0 != 0 {
                process::exit(exit_code.0);
            }
        }
        Err(e) => {
            if !e.message.is_empty() {
                eprintln!("{}", e.message);
            }
            process::exit(e.exit_code.0);
        }
    }
}

/// Execute the CLI command and return result.
fn execute(cli: Cli) -> CliResult<ExitCode> {
    let config = cli.to_config()?;
    commands::run_tests(config)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::try_parse_from(["runtest"]).unwrap();
        assert!(cli.files.is_empty());
        assert_eq!(cli.dir, PathBuf::from("."));
        assert_eq!(cli.color, ColorChoice::Auto);
        let config = cli.to_config().unwrap();
        assert!(!config.coverage.enabled);
        assert!(config.option_flags.is_empty());
    }

    #[test]
    fn test_cli_parse_files_and_dir() {
        let cli = Cli::try_parse_from(["runtest", "-d", "src", "pkg/mod.py", "README.txt"]).unwrap();
        assert_eq!(cli.dir, PathBuf::from("src"));
        assert_eq!(cli.files, vec![PathBuf::from("pkg/mod.py"), PathBuf::from("README.txt")]);
    }

    #[test]
    fn test_cli_parse_options() {
        let cli = Cli::try_parse_from(["runtest", "-o", "ELLIPSIS", "--option", "NORMALIZE_WHITESPACE", "-x"]).unwrap();
        let config = cli.to_config().unwrap();
        assert_eq!(
            config.option_flags,
            OptionFlags::ELLIPSIS | OptionFlags::NORMALIZE_WHITESPACE
        );
        assert!(config.fail_fast);
    }

    #[test]
    fn test_cli_unknown_option_flag() {
        let cli = Cli::try_parse_from(["runtest", "-o", "FUZZY"]).unwrap();
        let err = cli.to_config().unwrap_err();
        assert_eq!(err.exit_code, ExitCode::USAGE);
        assert!(err.message.contains("FUZZY"));
    }

    #[test]
    fn test_cli_coverage_text_implies_coverage() {
        let cli = Cli::try_parse_from(["runtest", "--coverage-text", "cov.txt", "--color", "never"]).unwrap();
        let config = cli.to_config().unwrap();
        assert!(config.coverage.enabled);
        assert_eq!(config.coverage.text_file, Some(PathBuf::from("cov.txt")));
        assert_eq!(config.color, ColorChoice::Never);
    }

    #[test]
    fn test_cli_rejects_bad_width() {
        assert!(Cli::try_parse_from(["runtest", "--width", "wide"]).is_err());
    }
}
