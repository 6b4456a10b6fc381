//! Vocabulary registries for the Python subset the runtime accepts.
//!
//! Callers work with stable ids (`KeywordId`, `OperatorId`, `PunctuationId`) and look up spellings
//! and metadata through the registry tables instead of matching on strings.
//!
//! ## Examples
//! ```rust
//! use runtest_core::lang::keywords::{self, KeywordId};
//!
//! assert_eq!(keywords::from_str("def"), Some(KeywordId::Def));
//! assert_eq!(keywords::as_str(KeywordId::Def), "def");
//! ```

pub mod exceptions;
pub mod keywords;
pub mod operators;
pub mod punctuation;
