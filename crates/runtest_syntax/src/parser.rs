//! Parser for the Python subset.
//!
//! Converts a token stream into a [`Program`]. The grammar follows Python's: simple statements
//! separated by `;`, compound statements with indented suites, and the usual expression
//! precedence ladder (with binary-operator precedence read from `runtest_core::lang::operators`).
//!
//! ## Examples
//!
//! ```rust
//! use runtest_syntax::{lexer, parser};
//!
//! let source = "def add(a, b=1):\n    return a + b\n";
//! let tokens = lexer::lex(source).unwrap();
//! let program = parser::parse(&tokens).unwrap();
//! assert_eq!(program.body.len(), 1);
//! ```

use std::rc::Rc;

use crate::ast::*;
use crate::diagnostics::CompileError;
use crate::lexer::{self, FStringPart as LexFStringPart, Token, TokenKind};
use runtest_core::lang::keywords::KeywordId;
use runtest_core::lang::operators::{self, OperatorId};
use runtest_core::lang::punctuation::PunctuationId;

// NOTE: This module is split across multiple files using `include!` to keep all parser
// methods in the same Rust module (preserving privacy + call patterns) while avoiding
// a single large source file.

include!("parser/core.rs");
include!("parser/helpers.rs");
include!("parser/decl.rs");
include!("parser/stmts.rs");
include!("parser/expr.rs");
include!("parser/api.rs");
include!("parser/tests.rs");
