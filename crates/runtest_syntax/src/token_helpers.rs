//! Small helper APIs for working with `Token` / `TokenKind`.

use crate::lexer::{Token, TokenKind};
use runtest_core::lang::keywords::KeywordId;
use runtest_core::lang::operators::OperatorId;
use runtest_core::lang::punctuation::PunctuationId;

impl TokenKind {
    /// Return the keyword id, if this is a keyword token.
    pub fn keyword_id(&self) -> Option<KeywordId> {
        match self {
            TokenKind::Keyword(id) => Some(*id),
            _ => None,
        }
    }

    pub fn is_keyword(&self, id: KeywordId) -> bool {
        matches!(self, TokenKind::Keyword(k) if *k == id)
    }

    /// Return the operator id, if this is an operator token.
    pub fn operator_id(&self) -> Option<OperatorId> {
        match self {
            TokenKind::Operator(id) => Some(*id),
            _ => None,
        }
    }

    pub fn is_operator(&self, id: OperatorId) -> bool {
        matches!(self, TokenKind::Operator(o) if *o == id)
    }

    /// Return the punctuation id, if this is a punctuation token.
    pub fn punctuation_id(&self) -> Option<PunctuationId> {
        match self {
            TokenKind::Punctuation(id) => Some(*id),
            _ => None,
        }
    }

    pub fn is_punctuation(&self, id: PunctuationId) -> bool {
        matches!(self, TokenKind::Punctuation(p) if *p == id)
    }

    /// Return `true` for NEWLINE / INDENT / DEDENT.
    pub fn is_layout(&self) -> bool {
        matches!(self, TokenKind::Newline | TokenKind::Indent | TokenKind::Dedent)
    }

    /// Short human-readable description used in "expected ..., found ..." messages.
    pub fn describe(&self) -> String {
        use runtest_core::lang::{keywords, operators, punctuation};
        match self {
            TokenKind::Keyword(id) => format!("'{}'", keywords::as_str(*id)),
            TokenKind::Operator(id) => format!("'{}'", operators::as_str(*id)),
            TokenKind::Punctuation(id) => format!("'{}'", punctuation::as_str(*id)),
            TokenKind::Ident(name) => format!("name '{name}'"),
            TokenKind::Int(_) | TokenKind::Float(_) => "number".to_string(),
            TokenKind::String(_) | TokenKind::FString(_) => "string".to_string(),
            TokenKind::Newline => "end of line".to_string(),
            TokenKind::Indent => "indent".to_string(),
            TokenKind::Dedent => "dedent".to_string(),
            TokenKind::Ellipsis => "'...'".to_string(),
            TokenKind::Eof => "end of input".to_string(),
        }
    }
}

impl Token {
    pub fn keyword_id(&self) -> Option<KeywordId> {
        self.kind.keyword_id()
    }

    pub fn operator_id(&self) -> Option<OperatorId> {
        self.kind.operator_id()
    }

    pub fn punctuation_id(&self) -> Option<PunctuationId> {
        self.kind.punctuation_id()
    }
}
