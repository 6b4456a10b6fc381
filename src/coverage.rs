//! Statement coverage of the code a run executes.
//!
//! The driver only knows the [`CoverageCollector`] trait: it calls [`CoverageCollector::start`]
//! before traversal and [`CoverageCollector::stop_and_report`] after it. [`LineCoverage`] is the
//! bundled implementation on top of the interpreter's line tracer.

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use runtest_runtime::{FileCoverage, Interpreter, LineTracer};

use crate::report::Palette;

/// Measures execution between `start` and `stop_and_report`.
pub trait CoverageCollector {
    /// Begin measuring; files under `root` are reported, files in `omit` never are.
    fn start(&mut self, root: &Path, omit: &[PathBuf]);

    /// Stop measuring and write the report.
    fn stop_and_report(&mut self, out: &mut dyn Write, palette: &Palette, width: usize) -> io::Result<()>;
}

/// Line coverage of source files loaded by the embedded interpreter.
pub struct LineCoverage {
    interp: Interpreter,
    tracer: LineTracer,
    root: PathBuf,
    omit: Vec<PathBuf>,
    text_file: Option<PathBuf>,
}

impl LineCoverage {
    pub fn new(interp: Interpreter) -> Self {
        Self {
            interp,
            tracer: LineTracer::new(),
            root: PathBuf::new(),
            omit: Vec::new(),
            text_file: None,
        }
    }

    /// Also write the table to `path`.
    pub fn with_text_file(mut self, path: Option<PathBuf>) -> Self {
        self.text_file = path;
        self
    }

    fn measured(&self) -> Vec<FileCoverage> {
        self.tracer
            .snapshot()
            .into_iter()
            .filter(|file| file.path.starts_with(&self.root) && !self.omit.contains(&file.path))
            .map(|file| FileCoverage {
                path: file.path.strip_prefix(&self.root).unwrap_or(&file.path).to_path_buf(),
                ..file
            })
            .collect()
    }
}

impl CoverageCollector for LineCoverage {
    #[tracing::instrument(skip_all, fields(root = %root.display()))]
    fn start(&mut self, root: &Path, omit: &[PathBuf]) {
        self.root = root.to_path_buf();
        self.omit = omit.to_vec();
        self.interp.set_tracer(Some(self.tracer.clone()));
    }

    fn stop_and_report(&mut self, out: &mut dyn Write, palette: &Palette, width: usize) -> io::Result<()> {
        self.interp.set_tracer(None);
        let table = render_table(&self.measured());

        if palette.is_colored() {
            out.write_all(palette.banner(palette.coverage, "COVERAGE SUMMARY", width).as_bytes())?;
        } else {
            out.write_all(b"\nCOVERAGE SUMMARY:\n\n")?;
        }
        out.write_all(table.as_bytes())?;

        if let Some(path) = &self.text_file {
            match std::fs::write(path, &table) {
                Ok(()) => tracing::debug!(path = %path.display(), "coverage table written"),
                Err(err) => tracing::warn!(path = %path.display(), error = %err, "could not write coverage table"),
            }
        }
        Ok(())
    }
}

/// `Name  Stmts  Miss  Cover` table with a `TOTAL` row.
pub fn render_table(files: &[FileCoverage]) -> String {
    let names: Vec<String> = files.iter().map(|f| f.path.display().to_string()).collect();
    let name_width = names.iter().map(String::len).chain(["TOTAL".len()]).max().unwrap_or(5);
    let rule = "-".repeat(name_width + 22);

    let mut out = format!("{:<name_width$}  {:>5}  {:>5}  {:>6}\n{rule}\n", "Name", "Stmts", "Miss", "Cover");
    let mut total = FileCoverage {
        path: PathBuf::from("TOTAL"),
        statements: 0,
        missed: 0,
    };
    for (file, name) in files.iter().zip(&names) {
        out.push_str(&row(name, file, name_width));
        total.statements += file.statements;
        total.missed += file.missed;
    }
    out.push_str(&rule);
    out.push('\n');
    out.push_str(&row("TOTAL", &total, name_width));
    out
}

fn row(name: &str, file: &FileCoverage, name_width: usize) -> String {
    let cover = format!("{:.0}%", file.percent().floor());
    format!(
        "{name:<name_width$}  {:>5}  {:>5}  {cover:>6}\n",
        file.statements, file.missed
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(path: &str, statements: usize, missed: usize) -> FileCoverage {
        FileCoverage {
            path: PathBuf::from(path),
            statements,
            missed,
        }
    }

    #[test]
    fn test_table_has_total() {
        let table = render_table(&[file("pkg/a.py", 10, 1), file("pkg/b.py", 4, 4)]);
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines[0], "Name      Stmts   Miss   Cover");
        assert_eq!(lines[2], "pkg/a.py     10      1     90%");
        assert_eq!(lines[3], "pkg/b.py      4      4      0%");
        assert_eq!(lines[5], "TOTAL        14      5     64%");
    }

    #[test]
    fn test_unwritable_text_file_still_prints_table() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut coverage = LineCoverage::new(Interpreter::new(dir.path()))
            .with_text_file(Some(dir.path().join("missing").join("coverage.txt")));
        coverage.start(dir.path(), &[]);

        let mut out = Vec::new();
        coverage.stop_and_report(&mut out, &Palette::PLAIN, 80).unwrap();
        let out = String::from_utf8(out).unwrap();
        assert!(out.starts_with("\nCOVERAGE SUMMARY:\n\n"));
        assert!(out.ends_with("TOTAL      0      0    100%\n"));
    }

    #[test]
    fn test_written_text_file_matches_table() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("coverage.txt");
        let mut coverage = LineCoverage::new(Interpreter::new(dir.path())).with_text_file(Some(path.clone()));
        coverage.start(dir.path(), &[]);

        coverage.stop_and_report(&mut Vec::new(), &Palette::PLAIN, 80).unwrap();
        assert_eq!(std::fs::read_to_string(path).unwrap(), render_table(&[]));
    }

    #[test]
    fn test_empty_table() {
        let table = render_table(&[]);
        assert!(table.ends_with("TOTAL      0      0    100%\n"));
    }
}
