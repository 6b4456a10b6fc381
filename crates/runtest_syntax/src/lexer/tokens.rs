//! Token types for the lexer.
//!
//! Vocabulary tokens carry registry ids:
//! - `Keyword(KeywordId)` for reserved words
//! - `Operator(OperatorId)` for operators (including word operators like `and`)
//! - `Punctuation(PunctuationId)` for delimiters and separators
//!
//! Use `crate::token_helpers` for ergonomic matching at call sites.

use crate::ast::Span;
use runtest_core::lang::keywords::{self, KeywordId};
use runtest_core::lang::operators::OperatorId;
use runtest_core::lang::punctuation::PunctuationId;

/// Kind of token produced by the lexer.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // ========== Keyword / operator / punctuation (ID-based) ==========
    Keyword(KeywordId),
    Operator(OperatorId),
    Punctuation(PunctuationId),

    // ========== Identifiers and Literals ==========
    Ident(String),
    Int(i64),
    Float(f64),
    String(String),
    FString(Vec<FStringPart>),

    // ========== Indentation ==========
    Newline,
    Indent,
    Dedent,

    // ========== Special ==========
    Ellipsis, // ...
    Eof,
}

/// Part of an f-string.
#[derive(Debug, Clone, PartialEq)]
pub enum FStringPart {
    Literal(String),
    /// Raw expression text, parsed later by the parser. `offset` is the byte position of the
    /// expression in the enclosing source.
    Expr {
        source: String,
        offset: usize,
        conversion: Option<char>,
        spec: Option<String>,
    },
}

/// A token with its kind and source span.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

impl Token {
    pub fn new(kind: TokenKind, span: Span) -> Self {
        Self { kind, span }
    }
}

/// Resolve an identifier spelling to a keyword id, if reserved.
pub fn keyword_id(name: &str) -> Option<KeywordId> {
    keywords::from_str(name)
}
