//! Lexer for the Python subset.
//!
//! Handles tokenization including:
//! - Keywords and identifiers
//! - Numeric literals (decimal, hex/octal/binary, floats with exponents, `_` separators)
//! - String literals (single/double/triple quoted, raw, byte, f-strings)
//! - Operators and punctuation
//! - Indentation-based blocks (INDENT/DEDENT tokens)
//! - Implicit line continuation inside brackets and explicit `\` continuation
//!
//! ## Module Structure
//!
//! - `tokens` - Token types (TokenKind, Token, FStringPart)
//! - `strings` - String/f-string scanning and escape processing
//! - `numbers` - Numeric literal scanning
//! - `indent` - INDENT/DEDENT handling

mod indent;
mod numbers;
mod strings;
pub mod tokens;

pub use tokens::{FStringPart, Token, TokenKind, keyword_id};

use crate::ast::Span;
use crate::diagnostics::CompileError;
use runtest_core::lang::operators::OperatorId;
use runtest_core::lang::punctuation::PunctuationId;

// ============================================================================
// LEXER STATE
// ----------------------------------------------------------------------------
// [Start of line] → measure indentation → [Inside code]
//                                              ↓
//                                             see '(' → [bracket_depth++]
//                                              ↓
//                                             see '\n' → skip (inside brackets)
//                                              ↓
//                                             see ')' → [bracket_depth--]
// ============================================================================

/// Lexer for Python source text.
pub struct Lexer<'a> {
    source: &'a str,
    chars: std::iter::Peekable<std::str::CharIndices<'a>>,
    current_pos: usize,
    indent_stack: Vec<usize>,
    pending_dedents: usize,
    at_line_start: bool,
    /// Bracket depth for implicit line continuation (parens, brackets, braces)
    bracket_depth: usize,
    open_brackets: Vec<(char, usize)>,
    tokens: Vec<Token>,
    errors: Vec<CompileError>,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            chars: source.char_indices().peekable(),
            current_pos: 0,
            indent_stack: vec![0],
            pending_dedents: 0,
            at_line_start: true,
            bracket_depth: 0,
            open_brackets: Vec::new(),
            tokens: Vec::new(),
            errors: Vec::new(),
        }
    }

    /// Tokenize the entire source.
    ///
    /// The token stream always ends with `Newline` (when any code was seen), the remaining
    /// `Dedent`s, and `Eof`.
    pub fn tokenize(mut self) -> Result<Vec<Token>, Vec<CompileError>> {
        while !self.is_at_end() || self.pending_dedents > 0 {
            self.scan_token();
        }

        if let Some((open, pos)) = self.open_brackets.last() {
            self.errors.push(CompileError::syntax(
                format!("'{open}' was never closed"),
                Span::new(*pos, pos + 1),
            ));
        }

        let eof = Span::new(self.current_pos, self.current_pos);
        if self
            .tokens
            .last()
            .is_some_and(|t| !matches!(t.kind, TokenKind::Newline | TokenKind::Dedent))
        {
            self.tokens.push(Token::new(TokenKind::Newline, eof));
        }
        while self.indent_stack.len() > 1 {
            self.indent_stack.pop();
            self.tokens.push(Token::new(TokenKind::Dedent, eof));
        }
        self.tokens.push(Token::new(TokenKind::Eof, eof));

        if self.errors.is_empty() {
            Ok(self.tokens)
        } else {
            Err(self.errors)
        }
    }

    // ========================================================================
    // Core character handling
    // ========================================================================

    fn is_at_end(&mut self) -> bool {
        self.chars.peek().is_none()
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().map(|(_, c)| *c)
    }

    fn peek_next(&self) -> Option<char> {
        let mut iter = self.source[self.current_pos..].chars();
        iter.next();
        iter.next()
    }

    fn advance(&mut self) -> Option<char> {
        if let Some((pos, c)) = self.chars.next() {
            self.current_pos = pos + c.len_utf8();
            Some(c)
        } else {
            None
        }
    }

    // ========================================================================
    // Main scanning dispatch
    // ========================================================================

    fn scan_token(&mut self) {
        if self.pending_dedents > 0 {
            self.pending_dedents -= 1;
            self.tokens.push(Token::new(
                TokenKind::Dedent,
                Span::new(self.current_pos, self.current_pos),
            ));
            return;
        }

        if self.at_line_start && self.bracket_depth == 0 {
            self.handle_indentation();
            return;
        }

        while let Some(c) = self.peek() {
            if c == ' ' || c == '\t' || c == '\x0c' {
                self.advance();
            } else {
                break;
            }
        }

        let start = self.current_pos;
        let Some(c) = self.advance() else {
            return;
        };

        match c {
            '#' => {
                while let Some(c) = self.peek() {
                    if c == '\n' {
                        break;
                    }
                    self.advance();
                }
            }

            '\\' => {
                if self.peek() == Some('\r') {
                    self.advance();
                }
                if !self.match_char('\n') {
                    self.errors.push(CompileError::syntax(
                        "unexpected character after line continuation character".to_string(),
                        Span::new(start, self.current_pos),
                    ));
                }
            }

            '\n' => {
                if self.bracket_depth > 0 {
                    return;
                }
                self.tokens
                    .push(Token::new(TokenKind::Newline, Span::new(start, self.current_pos)));
                self.at_line_start = true;
            }

            '\r' => {}

            '+' => self.operator(start, OperatorId::Plus, &[('=', OperatorId::PlusEq)]),
            '-' => {
                if self.match_char('>') {
                    self.add_punct(PunctuationId::Arrow, start);
                } else if self.match_char('=') {
                    self.add_op(OperatorId::MinusEq, start);
                } else {
                    self.add_op(OperatorId::Minus, start);
                }
            }
            '*' => {
                if self.match_char('*') {
                    self.operator(start, OperatorId::StarStar, &[('=', OperatorId::StarStarEq)]);
                } else {
                    self.operator(start, OperatorId::Star, &[('=', OperatorId::StarEq)]);
                }
            }
            '/' => self.scan_slash(start),
            '%' => self.operator(start, OperatorId::Percent, &[('=', OperatorId::PercentEq)]),
            '&' => self.operator(start, OperatorId::Amp, &[('=', OperatorId::AmpEq)]),
            '|' => self.operator(start, OperatorId::Pipe, &[('=', OperatorId::PipeEq)]),
            '^' => self.operator(start, OperatorId::Caret, &[('=', OperatorId::CaretEq)]),
            '~' => self.add_op(OperatorId::Tilde, start),
            '@' => self.add_punct(PunctuationId::At, start),
            ',' => self.add_punct(PunctuationId::Comma, start),
            ';' => self.add_punct(PunctuationId::Semicolon, start),
            ':' => self.add_punct(PunctuationId::Colon, start),
            '(' => self.open_bracket(PunctuationId::LParen, '(', start),
            ')' => self.close_bracket(PunctuationId::RParen, ')', start),
            '[' => self.open_bracket(PunctuationId::LBracket, '[', start),
            ']' => self.close_bracket(PunctuationId::RBracket, ']', start),
            '{' => self.open_bracket(PunctuationId::LBrace, '{', start),
            '}' => self.close_bracket(PunctuationId::RBrace, '}', start),
            '=' => self.operator(start, OperatorId::Eq, &[('=', OperatorId::EqEq)]),
            '!' => {
                if self.match_char('=') {
                    self.add_op(OperatorId::NotEq, start);
                } else {
                    self.errors.push(CompileError::syntax(
                        "invalid syntax".to_string(),
                        Span::new(start, self.current_pos),
                    ));
                }
            }
            '<' => self.operator(
                start,
                OperatorId::Lt,
                &[('<', OperatorId::LShift), ('=', OperatorId::LtEq)],
            ),
            '>' => self.operator(
                start,
                OperatorId::Gt,
                &[('>', OperatorId::RShift), ('=', OperatorId::GtEq)],
            ),
            '.' => {
                if self.peek().is_some_and(|c| c.is_ascii_digit()) {
                    self.scan_number(start, c);
                } else if self.peek() == Some('.') && self.peek_next() == Some('.') {
                    self.advance();
                    self.advance();
                    self.add_token(TokenKind::Ellipsis, start);
                } else {
                    self.add_punct(PunctuationId::Dot, start);
                }
            }

            '"' | '\'' => self.scan_string(start, c, ""),

            '0'..='9' => self.scan_number(start, c),

            _ if is_ident_start(c) => self.scan_identifier(start),

            _ => {
                self.errors.push(CompileError::syntax(
                    format!("invalid character '{c}' (U+{:04X})", c as u32),
                    Span::new(start, self.current_pos),
                ));
            }
        }
    }

    // ========================================================================
    // Operator helpers
    // ========================================================================

    fn match_char(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn add_token(&mut self, kind: TokenKind, start: usize) {
        self.tokens.push(Token::new(kind, Span::new(start, self.current_pos)));
    }

    fn add_op(&mut self, id: OperatorId, start: usize) {
        self.add_token(TokenKind::Operator(id), start);
    }

    fn add_punct(&mut self, id: PunctuationId, start: usize) {
        self.add_token(TokenKind::Punctuation(id), start);
    }

    /// Try to match compound operator, fallback to simple.
    fn operator(&mut self, start: usize, simple: OperatorId, compounds: &[(char, OperatorId)]) {
        for (c, id) in compounds {
            if self.match_char(*c) {
                self.add_op(*id, start);
                return;
            }
        }
        self.add_op(simple, start);
    }

    /// Scan slash operators: `/`, `/=`, `//`, `//=`.
    fn scan_slash(&mut self, start: usize) {
        if self.match_char('/') {
            self.operator(start, OperatorId::SlashSlash, &[('=', OperatorId::SlashSlashEq)]);
        } else {
            self.operator(start, OperatorId::Slash, &[('=', OperatorId::SlashEq)]);
        }
    }

    fn open_bracket(&mut self, kind: PunctuationId, ch: char, start: usize) {
        self.bracket_depth += 1;
        self.open_brackets.push((ch, start));
        self.add_punct(kind, start);
    }

    /// Emit a closing bracket token; an unmatched closer is an error.
    fn close_bracket(&mut self, kind: PunctuationId, ch: char, start: usize) {
        if self.bracket_depth == 0 {
            self.errors.push(CompileError::syntax(
                format!("unmatched '{ch}'"),
                Span::new(start, self.current_pos),
            ));
        } else {
            self.bracket_depth -= 1;
            self.open_brackets.pop();
        }
        self.add_punct(kind, start);
    }

    // ========================================================================
    // Identifier scanning
    // ========================================================================

    fn scan_identifier(&mut self, start: usize) {
        while let Some(c) = self.peek() {
            if is_ident_continue(c) {
                self.advance();
            } else {
                break;
            }
        }

        let spelling = &self.source[start..self.current_pos];

        if is_string_prefix(spelling) {
            if let Some(quote) = self.peek().filter(|c| *c == '"' || *c == '\'') {
                self.advance();
                self.scan_string(start, quote, spelling);
                return;
            }
        }

        if let Some(id) = keyword_id(spelling) {
            self.add_token(TokenKind::Keyword(id), start);
        } else {
            self.add_token(TokenKind::Ident(spelling.to_string()), start);
        }
    }
}

// ============================================================================
// Helper functions
// ============================================================================

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_ident_continue(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn is_string_prefix(spelling: &str) -> bool {
    matches!(
        spelling.to_ascii_lowercase().as_str(),
        "r" | "u" | "b" | "f" | "br" | "rb" | "fr" | "rf"
    )
}

/// Convenience function to lex a source string.
#[tracing::instrument(skip_all, fields(source_len = source.len()))]
pub fn lex(source: &str) -> Result<Vec<Token>, Vec<CompileError>> {
    Lexer::new(source).tokenize()
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use runtest_core::lang::keywords::{self, KeywordId};

    fn kinds(source: &str) -> Vec<TokenKind> {
        lex(source).unwrap().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_keyword_registry_parity() {
        use runtest_core::lang::keywords;

        for k in keywords::KEYWORDS {
            let tokens = lex(k.canonical).unwrap_or_else(|errs| panic!("lex({:?}) failed: {:?}", k.canonical, errs));
            assert!(tokens[0].kind.is_keyword(k.id), "{:?}", tokens);
        }
    }

    #[test]
    fn test_operator_registry_parity() {
        use runtest_core::lang::operators;

        for o in operators::OPERATORS {
            let tokens = lex(o.spelling).unwrap_or_else(|errs| panic!("lex({:?}) failed: {:?}", o.spelling, errs));
            if o.is_keyword_spelling {
                assert!(tokens[0].kind.keyword_id().is_some(), "{:?}", tokens);
            } else {
                assert!(tokens[0].kind.is_operator(o.id), "{:?} lexed as {:?}", o.spelling, tokens);
            }
        }
    }

    #[test]
    fn test_indent_and_dedent() {
        let src = "if x:\n    y = 1\n    if z:\n        pass\nw\n";
        let k = kinds(src);
        let indents = k.iter().filter(|t| matches!(t, TokenKind::Indent)).count();
        let dedents = k.iter().filter(|t| matches!(t, TokenKind::Dedent)).count();
        assert_eq!(indents, 2);
        assert_eq!(dedents, 2);
        assert!(matches!(k.last(), Some(TokenKind::Eof)));
    }

    #[test]
    fn test_blank_and_comment_lines_do_not_change_indentation() {
        let src = "def f():\n    a = 1\n\n# note\n    return a\n";
        let k = kinds(src);
        assert_eq!(k.iter().filter(|t| matches!(t, TokenKind::Indent)).count(), 1);
        assert_eq!(k.iter().filter(|t| matches!(t, TokenKind::Dedent)).count(), 1);
    }

    #[test]
    fn test_inconsistent_dedent_is_an_error() {
        let errs = lex("if x:\n    a\n  b\n").unwrap_err();
        assert!(errs[0].message.contains("unindent"));
        assert_eq!(errs[0].exception_name(), "IndentationError");
    }

    #[test]
    fn test_newlines_inside_brackets_are_skipped() {
        let k = kinds("f(1,\n  2)\n");
        assert_eq!(k.iter().filter(|t| matches!(t, TokenKind::Newline)).count(), 1);
        assert!(!k.iter().any(|t| matches!(t, TokenKind::Indent)));
    }

    #[test]
    fn test_backslash_continuation() {
        let k = kinds("x = 1 + \\\n    2\n");
        assert_eq!(k.iter().filter(|t| matches!(t, TokenKind::Newline)).count(), 1);
        assert!(k.contains(&TokenKind::Int(2)));
    }

    #[test]
    fn test_unmatched_and_unclosed_brackets() {
        assert!(lex("x)\n").unwrap_err()[0].message.contains("unmatched ')'"));
        assert!(lex("f(1,\n").unwrap_err()[0].message.contains("never closed"));
    }

    #[test]
    fn test_string_prefixes_and_keywords() {
        let k = kinds("r'\\d' b'x' rb\"y\" not_a_prefix\n");
        assert_eq!(k[0], TokenKind::String("\\d".to_string()));
        assert_eq!(k[1], TokenKind::String("x".to_string()));
        assert_eq!(k[2], TokenKind::String("y".to_string()));
        assert_eq!(k[3], TokenKind::Ident("not_a_prefix".to_string()));
        assert!(kinds("lambda")[0].is_keyword(KeywordId::Lambda));
    }

    #[test]
    fn test_ellipsis_and_dot() {
        let k = kinds("a.b ...\n");
        assert!(k[1].is_punctuation(PunctuationId::Dot));
        assert_eq!(k[3], TokenKind::Ellipsis);
    }

    proptest! {
        #[test]
        fn prop_integer_literals_round_trip(n in 0..=i64::MAX) {
            let k = kinds(&format!("{n}\n"));
            prop_assert_eq!(&k[0], &TokenKind::Int(n));
        }

        #[test]
        fn prop_names_lex_as_identifiers_or_keywords(name in "[a-z_][a-z0-9_]{0,12}") {
            let k = kinds(&name);
            match keywords::from_str(&name) {
                Some(id) => prop_assert!(k[0].is_keyword(id)),
                None => prop_assert_eq!(&k[0], &TokenKind::Ident(name.clone())),
            }
        }
    }
}
