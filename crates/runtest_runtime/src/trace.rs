//! Line tracing for statement coverage.

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::rc::Rc;

use runtest_syntax::ast::{Block, Program, Stmt};

use crate::source::SourceFile;

#[derive(Default)]
struct FileLines {
    statements: BTreeSet<usize>,
    executed: BTreeSet<usize>,
}

/// Statement and executed-line sets per loaded source file.
///
/// Cloning shares the underlying sets, so a host keeps one handle while the interpreter records
/// into another.
#[derive(Clone, Default)]
pub struct LineTracer {
    files: Rc<RefCell<BTreeMap<PathBuf, FileLines>>>,
}

/// Coverage of one source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileCoverage {
    pub path: PathBuf,
    pub statements: usize,
    pub missed: usize,
}

impl FileCoverage {
    /// Percentage of statements executed; 100 for a file without statements.
    pub fn percent(&self) -> f64 {
        if self.statements == 0 {
            return 100.0;
        }
        let covered = self.statements - self.missed;
        covered as f64 * 100.0 / self.statements as f64
    }
}

impl LineTracer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare the statement lines of a file as it is loaded.
    pub fn register(&self, path: &Path, lines: Vec<usize>) {
        let mut files = self.files.borrow_mut();
        files.entry(path.to_path_buf()).or_default().statements.extend(lines);
    }

    pub fn record(&self, path: &Path, line: usize) {
        let mut files = self.files.borrow_mut();
        if let Some(file) = files.get_mut(path) {
            file.executed.insert(line);
        }
    }

    /// Coverage of every registered file, ordered by path.
    pub fn snapshot(&self) -> Vec<FileCoverage> {
        self.files
            .borrow()
            .iter()
            .map(|(path, lines)| FileCoverage {
                path: path.clone(),
                statements: lines.statements.len(),
                missed: lines.statements.difference(&lines.executed).count(),
            })
            .collect()
    }
}

/// 1-based lines of every statement in `program`, nested bodies included.
pub fn statement_lines(program: &Program, file: &SourceFile) -> Vec<usize> {
    let mut lines = BTreeSet::new();
    collect(&program.body, file, &mut lines);
    lines.into_iter().collect()
}

fn collect(block: &Block, file: &SourceFile, lines: &mut BTreeSet<usize>) {
    for stmt in block {
        lines.insert(file.line_of(stmt.span.start));
        match &stmt.node {
            Stmt::FunctionDef(def) => collect(&def.body, file, lines),
            Stmt::ClassDef(class) => collect(&class.body, file, lines),
            Stmt::If(s) => {
                collect(&s.body, file, lines);
                collect(&s.orelse, file, lines);
            }
            Stmt::While(s) => {
                collect(&s.body, file, lines);
                collect(&s.orelse, file, lines);
            }
            Stmt::For(s) => {
                collect(&s.body, file, lines);
                collect(&s.orelse, file, lines);
            }
            Stmt::Try(s) => {
                collect(&s.body, file, lines);
                for handler in &s.handlers {
                    collect(&handler.body, file, lines);
                }
                collect(&s.orelse, file, lines);
                collect(&s.finalbody, file, lines);
            }
            Stmt::With(s) => collect(&s.body, file, lines),
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use runtest_syntax::parse_source;

    #[test]
    fn test_statement_lines_include_nested_bodies() {
        let text = "x = 1\ndef f():\n    if x:\n        return 1\n    return 2\n";
        let file = SourceFile::new("m.py", None, text);
        let program = parse_source(text).unwrap();
        assert_eq!(statement_lines(&program, &file), vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_tracer_counts_missed_lines() {
        let tracer = LineTracer::new();
        let path = Path::new("/tmp/m.py");
        tracer.register(path, vec![1, 2, 3, 4]);
        let other = tracer.clone();
        other.record(path, 1);
        other.record(path, 3);
        other.record(Path::new("/tmp/unregistered.py"), 1);
        let snapshot = tracer.snapshot();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].statements, 4);
        assert_eq!(snapshot[0].missed, 2);
        assert!((snapshot[0].percent() - 50.0).abs() < f64::EPSILON);
    }
}
