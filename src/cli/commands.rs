//! CLI command implementations
//!
//! All command functions return `CliResult<ExitCode>` instead of calling
//! `process::exit`. Error handling and exits happen in the top-level `run()`.

use std::io;
use std::path::PathBuf;
use std::thread;

use crate::config::RunConfig;
use crate::coverage::LineCoverage;
use crate::driver::ScanDriver;
use crate::report::terminal::{self, stdout_is_terminal, use_color};
use crate::report::{Palette, ReportFormatter};
use crate::runner::{EmbeddedLoader, TestError};

use super::{CliError, CliResult, ExitCode};

/// Stack of the thread that runs the tests; deep recursion in test code needs more than the
/// platform default.
const RUN_STACK_SIZE: usize = 256 * 1024 * 1024;

// ============================================================================
// Test run
// ============================================================================

/// Scan, run and report; the exit code says whether anything failed.
pub fn run_tests(config: RunConfig) -> CliResult<ExitCode> {
    let handle = thread::Builder::new()
        .name("runtest".to_string())
        .stack_size(RUN_STACK_SIZE)
        .spawn(move || scan(config))
        .map_err(|e| CliError::failure(format!("error: cannot start the test thread: {e}")))?;
    handle
        .join()
        .map_err(|_| CliError::failure("error: the test run panicked"))?
}

fn scan(config: RunConfig) -> CliResult<ExitCode> {
    let root = config
        .root
        .canonicalize()
        .map_err(|e| CliError::failure(format!("error: {}: {e}", config.root.display())))?;
    let config = config.with_root(&root);

    let interactive = stdout_is_terminal();
    let size = terminal::detect(config.width, interactive);
    let palette = Palette::new(use_color(config.color, interactive));
    tracing::debug!(width = size.width, colored = palette.is_colored(), "report settings");

    let loader = EmbeddedLoader::new(&root);
    let mut coverage = config.coverage.enabled.then(|| {
        LineCoverage::new(loader.interpreter().clone()).with_text_file(config.coverage.text_file.clone())
    });

    let stdout = io::stdout();
    let mut report = ReportFormatter::new(stdout.lock(), palette, size.width);
    let mut driver = ScanDriver::new(&config, &loader);
    if let Some(coverage) = coverage.as_mut() {
        driver = driver.with_coverage(coverage, own_executable());
    }

    let summary = driver.run(&mut report).map_err(render_error)?;
    Ok(ExitCode(summary.exit_code()))
}

/// The running binary, left out of coverage.
fn own_executable() -> Vec<PathBuf> {
    std::env::current_exe().ok().into_iter().collect()
}

fn render_error(err: TestError) -> CliError {
    CliError::failure(format!("{:?}", miette::Report::new(err)))
}
