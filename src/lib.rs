#![forbid(unsafe_code)]
//! runtest: a documentation-example and unit-test runner for Python source trees.
//!
//! A run walks a directory tree, classifies each file, extracts interactive examples from
//! documentation blocks and plain-text files, collects `unittest.TestCase` methods, executes them
//! in an embedded interpreter and prints a line-oriented report with a final summary.
//!
//! ## Panic Policy
//!
//! This codebase follows explicit error handling:
//!
//! - **Production code**: Use `Result` or `Option` with `?` / `ok_or` / `map_err`. The `cli` module
//!   enforces `#![deny(clippy::unwrap_used)]`.
//!
//! - **Test code**: `.unwrap()` and `.expect()` are acceptable in tests.
//!
//! ## Pipeline
//!
//! `driver` (traversal) → `discovery` (classification, module identity) → `doctest` / `unittest`
//! (extraction, collection) → `runner` (execution) → `report` (rendering).

pub mod cli;
pub mod config;
pub mod coverage;
pub mod discovery;
pub mod doctest;
pub mod driver;
pub mod report;
pub mod runner;
pub mod unittest;
pub mod version;

pub use config::{OptionFlags, RunConfig};
pub use driver::{ScanDriver, ScanSummary};
pub use runner::{EmbeddedLoader, ExecutionEngine, RunState, TestError};
