//! Syntax frontend for the Python subset executed by runtest: lexer, parser, AST, diagnostics.
//!
//! ## Notes
//! - This crate is syntax-only: no name resolution and no evaluation.
//! - Vocabulary identity (keywords/operators/punctuation) comes from `runtest_core::lang` registries.
//!
//! ## Examples
//! ```rust
//! use runtest_syntax::{lexer, parser};
//!
//! let tokens = lexer::lex("x = 1\n").unwrap();
//! let program = parser::parse(&tokens).unwrap();
//! assert_eq!(program.body.len(), 1);
//! ```

pub mod ast;
pub mod diagnostics;
pub mod lexer;
pub mod parser;
pub mod token_helpers;

pub use diagnostics::{CompileError, ErrorKind, LineIndex};
pub use parser::parse_source;
