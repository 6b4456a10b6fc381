#![forbid(unsafe_code)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
//! Embedded interpreter behind runtest's module-loading and example-execution capabilities.
//!
//! An [`Interpreter`] loads a module by dotted identity from a scan root, exposes its documentation
//! blocks ([`introspect::doc_blocks`]) and `unittest.TestCase` subclasses
//! ([`introspect::test_case_classes`]), runs interactive examples in a namespace
//! ([`Interpreter::run_example`]), and runs test methods under the `setUp`/`tearDown` contract
//! ([`unittest::run_test_method`]).
//!
//! ## Notes
//! - The interpreter is single-threaded: values are `Rc`-shared and never cross threads.
//! - Exceptions raised by Python code never become Rust errors; they are rendered into
//!   [`ExceptionReport`]s at the boundary.
//!
//! ## Examples
//! ```rust
//! use runtest_runtime::Interpreter;
//!
//! let interp = Interpreter::new(".");
//! let globals = interp.scratch_namespace("example");
//! let run = interp.run_example(&globals, "print(1 + 1)\n", "example");
//! assert_eq!(run.output, "2\n");
//! assert!(run.exception.is_none());
//! ```

mod builtins;
pub mod error;
mod format;
mod interp;
pub mod introspect;
pub mod source;
pub mod trace;
pub mod unittest;
pub mod value;

pub use error::{ExceptionReport, FaultKind, RuntimeError};
pub use interp::{ExampleRun, Interpreter, MAX_CALL_DEPTH};
pub use introspect::{DocBlock, TestClass, TestMethod};
pub use trace::{FileCoverage, LineTracer};
pub use unittest::MethodOutcome;
pub use value::{Class, Module, Namespace};
