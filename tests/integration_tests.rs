//! End-to-end runs over temporary source trees.

use std::fs;
use std::path::Path;
use std::process::Command;

use runtest::driver::{ScanDriver, ScanSummary};
use runtest::report::{Palette, ReportFormatter};
use runtest::runner::EmbeddedLoader;
use runtest::RunConfig;
use tempfile::TempDir;

fn write(dir: &Path, rel: &str, text: &str) {
    let path = dir.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, text).unwrap();
}

/// Run a scan of `config` and return its summary and plain report.
fn scan(config: RunConfig) -> (ScanSummary, String) {
    let root = config.root.canonicalize().unwrap();
    let config = config.with_root(&root);
    let loader = EmbeddedLoader::new(&root);
    let mut report = ReportFormatter::new(Vec::new(), Palette::PLAIN, 80);
    let summary = ScanDriver::new(&config, &loader).run(&mut report).unwrap();
    (summary, String::from_utf8(report.into_inner()).unwrap())
}

fn scan_dir(dir: &TempDir) -> (ScanSummary, String) {
    scan(RunConfig::new().with_root(dir.path()))
}

const CALC: &str = r#""""Arithmetic helpers."""

import unittest


def double(x):
    """Twice `x`.

    >>> double(21)
    42
    """
    return 2 * x


class DoubleTest(unittest.TestCase):
    def test_negative(self):
        self.assertEqual(double(-2), -3)
"#;

#[test]
fn test_passing_example_and_failing_method() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "pkg/__init__.py", "");
    write(dir.path(), "pkg/calc.py", CALC);

    let (summary, report) = scan_dir(&dir);

    assert_eq!(summary.counters.attempted, 2);
    assert_eq!(summary.counters.failed, 1);
    assert_ne!(summary.exit_code(), 0);
    assert!(report.contains(">>> calc.double <pkg/calc.py:7>\n ✓ double(21) <line 9>\n"));
    assert!(report.contains("::: DoubleTest <pkg/calc.py:15>\n ✗ test_negative <line 16>\n"));
    assert!(report.contains("AssertionError: -4 != -3"));
    assert!(report.contains("Ran 2 tests in "));
    assert!(report.contains(", 1 failed"));
}

#[test]
fn test_empty_tree_reports_nothing() {
    let dir = TempDir::new().unwrap();
    let (summary, report) = scan_dir(&dir);
    assert_eq!(summary.counters.attempted, 0);
    assert_eq!(summary.exit_code(), 0);
    assert!(report.is_empty());
}

#[test]
fn test_print_example_passes() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "pkg/__init__.py", "");
    write(dir.path(), "pkg/hello.py", "\"\"\"\n>>> print('for test')\nfor test\n\"\"\"\n");

    let (summary, report) = scan_dir(&dir);

    assert_eq!(summary.counters.attempted, 1);
    assert_eq!(summary.counters.failed, 0);
    assert!(report.contains(" ✓ print('for test') <line 2>\n"));
    assert!(report.ends_with(", all passed\n\n"));
}

#[test]
fn test_mismatch_shows_expected_and_got() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "pkg/__init__.py", "");
    write(
        dir.path(),
        "pkg/nums.py",
        "def seven():\n    \"\"\"Return seven.\n\n    >>> seven()\n    7\n    \"\"\"\n    return 8\n",
    );

    let (summary, report) = scan_dir(&dir);

    assert_eq!(summary.counters.attempted, 1);
    assert_eq!(summary.counters.failed, 1);
    assert!(report.contains(">>> nums.seven <pkg/nums.py:2>\n ✗ seven() <line 4>\n"));
    assert!(report.contains("   Expected:\n     7\n   Got:\n     8\n"));
}

#[test]
fn test_unexpected_exception_shows_traceback() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "notes.txt", ">>> {}['k']\n1\n");

    let (summary, report) = scan_dir(&dir);

    assert_eq!(summary.counters.failed, 1);
    assert!(report.contains("   Traceback (most recent call last):\n"));
    assert!(report.contains("   KeyError: 'k'\n"));
}

#[test]
fn test_missing_file_does_not_stop_the_list() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "README.txt", ">>> 3 * 3\n9\n");
    let root = dir.path().canonicalize().unwrap();

    let config = RunConfig::new()
        .with_root(dir.path())
        .with_files(vec!["nope.txt".into(), "README.txt".into()]);
    let (summary, report) = scan(config);

    let missing = format!("*** {}: No such file\n", root.join("nope.txt").display());
    assert!(report.starts_with(&missing));
    assert!(report.contains(">>> README <README.txt:1>\n ✓ 3 * 3 <line 1>\n"));
    assert_eq!(summary.counters.attempted, 1);
    assert_eq!(summary.counters.failed, 0);
}

#[test]
fn test_source_outside_a_package_is_plain_text() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "tools/util.py", "\"\"\"Utilities.\n\n>>> 2 + 3\n5\n\n\"\"\"\n");

    let (summary, report) = scan_dir(&dir);

    assert_eq!(summary.counters.attempted, 1);
    assert_eq!(summary.counters.failed, 0);
    assert!(report.contains(">>> util <tools/util.py:1>\n ✓ 2 + 3 <line 3>\n"));
}

#[test]
fn test_broken_module_degrades_to_plain_text() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "pkg/__init__.py", "");
    write(dir.path(), "pkg/broken.py", "import does_not_exist\n\n\"\"\"\n>>> 1 + 1\n2\n\n\"\"\"\n");

    let (summary, report) = scan_dir(&dir);

    assert_eq!(summary.counters.attempted, 1);
    assert_eq!(summary.counters.failed, 0);
    assert!(report.contains(">>> broken <pkg/broken.py:1>\n"));
}

#[test]
fn test_ignored_directories_are_pruned() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), ".git/notes.txt", ">>> 1\n2\n");
    write(dir.path(), "__pycache__/cache.txt", ">>> 1\n2\n");
    write(dir.path(), "image.png", ">>> 1\n2\n");

    let (summary, report) = scan_dir(&dir);

    assert_eq!(summary.counters.attempted, 0);
    assert!(report.is_empty());
}

#[test]
fn test_option_flags_apply_to_every_example() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "doc.md", ">>> list(range(20))\n[0, 1, ..., 19]\n");

    let (failing, _) = scan_dir(&dir);
    assert_eq!(failing.counters.failed, 1);

    let config = RunConfig::new()
        .with_root(dir.path())
        .with_option_flags(runtest::OptionFlags::ELLIPSIS);
    let (passing, _) = scan(config);
    assert_eq!(passing.counters.failed, 0);
}

// ============================================================================
// Binary
// ============================================================================

fn runtest(dir: &Path, args: &[&str]) -> std::process::Output {
    Command::new(env!("CARGO_BIN_EXE_runtest"))
        .arg("--dir")
        .arg(dir)
        .arg("--color")
        .arg("never")
        .args(args)
        .output()
        .unwrap()
}

#[test]
fn test_binary_exit_status() {
    let dir = TempDir::new().unwrap();
    let empty = runtest(dir.path(), &[]);
    assert!(empty.status.success());
    assert!(empty.stdout.is_empty());

    write(dir.path(), "pkg/__init__.py", "");
    write(dir.path(), "pkg/calc.py", CALC);
    let failed = runtest(dir.path(), &[]);
    assert_eq!(failed.status.code(), Some(1));
    let stdout = String::from_utf8(failed.stdout).unwrap();
    assert!(stdout.contains("Ran 2 tests in "));
}

#[test]
fn test_binary_rejects_unknown_flag_name() {
    let dir = TempDir::new().unwrap();
    let output = runtest(dir.path(), &["-o", "FUZZY"]);
    assert_eq!(output.status.code(), Some(2));
}
