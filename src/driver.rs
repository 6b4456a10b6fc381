//! Scan orchestration.
//!
//! [`ScanDriver::run`] walks the scan root (or the explicit file list), classifies every file and
//! hands it to the [`ExecutionEngine`]. A failure while processing one file is logged and the scan
//! moves on; only an unusable scan root or a broken report stream ends a run early.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use walkdir::WalkDir;

use crate::config::RunConfig;
use crate::coverage::CoverageCollector;
use crate::discovery::{PathClassifier, ScanUnit, normalize};
use crate::report::ReportFormatter;
use crate::runner::{ExecutionEngine, NamespaceLoader, ResultCounters, RunState, TestError};

/// Totals of a finished run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanSummary {
    pub counters: ResultCounters,
    pub elapsed: Duration,
}

impl ScanSummary {
    /// 0 when nothing failed (including when nothing ran), 1 otherwise.
    pub fn exit_code(&self) -> i32 {
        if self.counters.failed > 0 { 1 } else { 0 }
    }
}

/// Drives one scan from traversal to the final summary line.
pub struct ScanDriver<'a> {
    config: &'a RunConfig,
    loader: &'a dyn NamespaceLoader,
    coverage: Option<(&'a mut dyn CoverageCollector, Vec<PathBuf>)>,
}

impl<'a> ScanDriver<'a> {
    pub fn new(config: &'a RunConfig, loader: &'a dyn NamespaceLoader) -> Self {
        Self {
            config,
            loader,
            coverage: None,
        }
    }

    /// Measure coverage of the run, leaving out the files in `omit`.
    pub fn with_coverage(mut self, collector: &'a mut dyn CoverageCollector, omit: Vec<PathBuf>) -> Self {
        self.coverage = Some((collector, omit));
        self
    }

    #[tracing::instrument(skip_all, fields(root = %self.config.root.display()))]
    pub fn run<W: Write>(&mut self, report: &mut ReportFormatter<W>) -> Result<ScanSummary, TestError> {
        let root = self
            .config
            .root
            .canonicalize()
            .map_err(|err| TestError::Discovery(format!("{}: {err}", self.config.root.display())))?;
        let started = Instant::now();
        let mut state = RunState::new(self.config.fail_fast);

        if let Some((collector, omit)) = self.coverage.as_mut() {
            collector.start(&root, omit);
        }

        let classifier = PathClassifier::new(self.config, &root);
        let engine = ExecutionEngine::new(self.loader, self.config);

        for path in self.targets(&root, report)? {
            if state.should_stop() {
                break;
            }
            let Some(unit) = ScanUnit::new(&root, &path) else {
                tracing::debug!(path = %path.display(), "outside the scan root; skipped");
                continue;
            };
            let classification = classifier.classify(&unit);
            match engine.run_file(&unit, &classification, report, &mut state) {
                Ok(()) => {}
                Err(TestError::Report(err)) => return Err(TestError::Report(err)),
                Err(err) => tracing::warn!(file = %unit.rel_path().display(), error = %err, "file skipped"),
            }
        }

        let elapsed = started.elapsed();
        if state.counters.attempted > 0 {
            if let Some((collector, _)) = self.coverage.as_mut() {
                let palette = *report.palette();
                let width = report.width();
                collector.stop_and_report(report.writer(), &palette, width)?;
            }
            report.summary(&state, elapsed)?;
        }
        report.writer().flush()?;

        tracing::debug!(
            attempted = state.counters.attempted,
            failed = state.counters.failed,
            skipped = state.counters.skipped,
            "scan finished"
        );
        Ok(ScanSummary {
            counters: state.counters,
            elapsed,
        })
    }

    /// Files to process, in order. Missing explicit files are reported here.
    fn targets<W: Write>(&self, root: &Path, report: &mut ReportFormatter<W>) -> Result<Vec<PathBuf>, TestError> {
        if self.config.files.is_empty() {
            return Ok(self.walk(root));
        }
        let mut targets = Vec::new();
        for file in &self.config.files {
            let path = normalize(&root.join(file));
            if path.is_file() {
                targets.push(path);
            } else {
                report.missing_file(&path)?;
            }
        }
        Ok(targets)
    }

    /// Every file under `root`, files before subdirectories, each level sorted by name.
    fn walk(&self, root: &Path) -> Vec<PathBuf> {
        let config = self.config;
        WalkDir::new(root)
            .sort_by(|a, b| {
                let a_dir = a.file_type().is_dir();
                let b_dir = b.file_type().is_dir();
                a_dir.cmp(&b_dir).then_with(|| a.file_name().cmp(b.file_name()))
            })
            .into_iter()
            .filter_entry(|entry| {
                entry.depth() == 0
                    || !entry.file_type().is_dir()
                    || !config.is_ignored_dir(&entry.file_name().to_string_lossy())
            })
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(err) => {
                    tracing::warn!(error = %err, "cannot read directory entry");
                    None
                }
            })
            .filter(|entry| entry.file_type().is_file())
            .map(|entry| entry.into_path())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::Palette;
    use crate::runner::EmbeddedLoader;
    use std::fs;
    use tempfile::TempDir;

    fn write(dir: &Path, rel: &str, text: &str) {
        let path = dir.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, text).unwrap();
    }

    fn config(dir: &TempDir) -> RunConfig {
        RunConfig::new().with_root(dir.path())
    }

    #[test]
    fn test_walk_order_and_pruning() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "b.txt", "");
        write(dir.path(), "a.txt", "");
        write(dir.path(), "a/z.txt", "");
        write(dir.path(), ".git/config", "");
        write(dir.path(), "__pycache__/m.txt", "");
        let config = config(&dir);
        let loader = EmbeddedLoader::new(dir.path());
        let driver = ScanDriver::new(&config, &loader);
        let root = dir.path().canonicalize().unwrap();
        let names: Vec<PathBuf> = driver
            .walk(&root)
            .into_iter()
            .map(|p| p.strip_prefix(&root).unwrap().to_path_buf())
            .collect();
        assert_eq!(
            names,
            vec![PathBuf::from("a.txt"), PathBuf::from("b.txt"), PathBuf::from("a/z.txt")]
        );
    }

    #[test]
    fn test_missing_root_is_a_discovery_error() {
        let config = RunConfig::new().with_root("/definitely/not/here");
        let loader = EmbeddedLoader::new(Path::new("."));
        let mut report = ReportFormatter::new(Vec::new(), Palette::PLAIN, 80);
        let err = ScanDriver::new(&config, &loader).run(&mut report).unwrap_err();
        assert!(matches!(err, TestError::Discovery(_)));
    }

    #[test]
    fn test_plain_text_file() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "guide.txt", "Intro\n\n>>> 1 + 1\n2\n>>> print('hi')\nhi\n");
        let config = config(&dir);
        let loader = EmbeddedLoader::new(dir.path());
        let mut report = ReportFormatter::new(Vec::new(), Palette::PLAIN, 80);
        let summary = ScanDriver::new(&config, &loader).run(&mut report).unwrap();
        let text = String::from_utf8(report.into_inner()).unwrap();
        assert_eq!(summary.counters.attempted, 2);
        assert_eq!(summary.exit_code(), 0);
        assert!(text.starts_with(">>> guide <guide.txt:1>\n ✓ 1 + 1 <line 3>\n ✓ print('hi') <line 5>\n"));
        assert!(text.contains("Ran 2 tests in"));
        assert!(text.ends_with(", all passed\n\n"));
    }

    struct Recorder {
        events: Vec<String>,
    }

    impl CoverageCollector for Recorder {
        fn start(&mut self, _root: &Path, omit: &[PathBuf]) {
            self.events.push(format!("start {}", omit.len()));
        }
        fn stop_and_report(&mut self, out: &mut dyn Write, _palette: &Palette, _width: usize) -> std::io::Result<()> {
            self.events.push("stop".to_string());
            writeln!(out, "coverage table")
        }
    }

    #[test]
    fn test_coverage_reported_before_summary() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "notes.md", ">>> 2 * 3\n6\n");
        let config = config(&dir);
        let loader = EmbeddedLoader::new(dir.path());
        let mut recorder = Recorder { events: Vec::new() };
        let mut report = ReportFormatter::new(Vec::new(), Palette::PLAIN, 80);
        ScanDriver::new(&config, &loader)
            .with_coverage(&mut recorder, vec![PathBuf::from("/bin/runtest")])
            .run(&mut report)
            .unwrap();
        let text = String::from_utf8(report.into_inner()).unwrap();
        let table = text.find("coverage table").unwrap();
        let summary = text.find("Ran 1 tests").unwrap();
        assert!(table < summary);
        assert_eq!(recorder.events, vec!["start 1", "stop"]);
    }

    #[test]
    fn test_no_coverage_report_when_nothing_ran() {
        let dir = TempDir::new().unwrap();
        let config = config(&dir);
        let loader = EmbeddedLoader::new(dir.path());
        let mut recorder = Recorder { events: Vec::new() };
        let mut report = ReportFormatter::new(Vec::new(), Palette::PLAIN, 80);
        ScanDriver::new(&config, &loader)
            .with_coverage(&mut recorder, Vec::new())
            .run(&mut report)
            .unwrap();
        assert!(report.into_inner().is_empty());
        assert_eq!(recorder.events, vec!["start 0"]);
    }
}
