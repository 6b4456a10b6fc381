//! Capability boundary between the scan core and whatever executes Python code.
//!
//! The core never loads modules or evaluates source itself. It asks a [`NamespaceLoader`] for a
//! [`LoadedModule`] by dotted identity, and runs example source in an [`ExecutionContext`].
//! [`super::embedded`] provides the default implementations backed by `runtest_runtime`.

use std::path::{Path, PathBuf};

use thiserror::Error;

use super::outcome::{Fault, MethodOutcome};
use crate::discovery::ModuleIdentity;
use crate::doctest::ParseFailure;

/// Errors crossing the per-file boundary of a scan.
///
/// None of these abort a scan: the driver logs them and moves on to the next file.
#[derive(Debug, Error, miette::Diagnostic)]
pub enum TestError {
    #[error("failed to discover tests: {0}")]
    #[diagnostic(code(runtest::discovery))]
    Discovery(String),

    #[error("malformed examples: {0}")]
    #[diagnostic(code(runtest::extract))]
    Extraction(#[from] ParseFailure),

    #[error("failed to load module {module}: {message}")]
    #[diagnostic(code(runtest::load))]
    Load { module: String, message: String },

    #[error("cannot read {}: {source}", path.display())]
    #[diagnostic(code(runtest::io))]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot write report: {0}")]
    #[diagnostic(code(runtest::report))]
    Report(#[from] std::io::Error),
}

/// What running one piece of example source produced.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Execution {
    /// Everything printed, including echoed expression values.
    pub output: String,
    pub exception: Option<Fault>,
}

/// A mutable namespace that example source runs in.
pub trait ExecutionContext {
    /// Run `source` (one example) and capture what it printed or raised.
    fn execute(&mut self, source: &str, name: &str) -> Execution;
}

/// A documentation block of a loaded module, before extraction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocSource {
    /// Dotted owner name (`pkg.mod.Class.method`).
    pub name: String,
    pub text: String,
    /// 0-based line where the docstring starts.
    pub lineno: Option<usize>,
}

/// A class the loader recognizes as a test case, with its candidate methods.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateClass {
    /// Handle passed back to [`LoadedModule`] to address this class.
    pub id: usize,
    pub name: String,
    /// 1-based line of the class statement.
    pub line: usize,
    /// Method names and their 1-based lines, in declaration order.
    pub methods: Vec<(String, usize)>,
}

/// A module loaded by identity.
pub trait LoadedModule {
    fn identity(&self) -> &str;

    /// Documentation blocks reachable from the module.
    fn doc_sources(&self) -> Vec<DocSource>;

    /// A fresh namespace seeded with the module's globals, for one documentation block.
    fn block_context(&self) -> Box<dyn ExecutionContext>;

    /// Classes recognized as test cases.
    fn test_case_classes(&self) -> Vec<CandidateClass>;

    /// Reason the whole class is skipped, when it is.
    fn class_skip_reason(&self, class: usize) -> Option<String>;

    fn set_up_class(&self, class: usize) -> Result<(), Fault>;

    fn tear_down_class(&self, class: usize) -> Result<(), Fault>;

    /// Run one test method under the class's setUp/tearDown contract.
    fn run_test_method(&self, class: usize, method: &str) -> MethodOutcome;
}

/// Loads modules by identity and hands out scratch namespaces.
pub trait NamespaceLoader {
    fn load(&self, identity: &ModuleIdentity, path: &Path) -> Result<Box<dyn LoadedModule>, TestError>;

    /// An empty namespace for a plain-text document.
    fn scratch_context(&self, name: &str) -> Box<dyn ExecutionContext>;
}
