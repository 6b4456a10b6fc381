//! Errors crossing the runtime's public boundary.
//!
//! Inside the interpreter, exceptions are ordinary values carried by `Flow::Raise`. When one escapes
//! to a host (a failed import, an example that raised, a test method that failed) it is rendered
//! into an [`ExceptionReport`] so the host never needs to look at interpreter values.

use std::path::PathBuf;

/// A failure of a host-level operation such as loading a module.
#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    #[error("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The module (or something it imported) raised while executing its body.
    #[error("{}", .0.exception_only)]
    Raised(ExceptionReport),
}

/// What kind of exception a report describes, as far as test outcomes are concerned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FaultKind {
    /// Derives from `AssertionError` (a test failure).
    Assertion,
    /// `unittest.SkipTest` with its reason.
    Skip(String),
    Other,
}

/// A rendered exception.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExceptionReport {
    /// Class name, qualified with its module unless builtin (`pkg.mod.MyError`).
    pub type_name: String,
    /// `str(exception)`.
    pub message: String,
    /// Final traceback line: `Type: message`, or just `Type` when the message is empty.
    pub exception_only: String,
    /// Full `Traceback (most recent call last):` text, ending with `exception_only`.
    pub traceback: String,
    pub kind: FaultKind,
}

impl ExceptionReport {
    pub fn is_assertion(&self) -> bool {
        self.kind == FaultKind::Assertion
    }

    pub fn skip_reason(&self) -> Option<&str> {
        match &self.kind {
            FaultKind::Skip(reason) => Some(reason),
            _ => None,
        }
    }
}
