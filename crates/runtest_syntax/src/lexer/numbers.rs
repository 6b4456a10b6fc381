//! Numeric literal scanning.

use super::{Lexer, TokenKind, is_ident_continue};
use crate::ast::Span;
use crate::diagnostics::CompileError;

impl<'a> Lexer<'a> {
    /// Scan a numeric literal whose first character (`first`) was just consumed.
    pub(super) fn scan_number(&mut self, start: usize, first: char) {
        if first == '0' {
            let radix = match self.peek() {
                Some('x' | 'X') => Some(16),
                Some('o' | 'O') => Some(8),
                Some('b' | 'B') => Some(2),
                _ => None,
            };
            if let Some(radix) = radix {
                self.advance();
                self.scan_radix_int(start, radix);
                return;
            }
        }

        let mut is_float = first == '.';
        self.consume_digits();

        if !is_float && self.peek() == Some('.') {
            let after = self.peek_next();
            let fraction = after.is_some_and(|c| c.is_ascii_digit());
            let bare_point = after.is_none_or(|c| !is_ident_continue(c) && c != '.');
            if fraction || bare_point {
                self.advance();
                self.consume_digits();
                is_float = true;
            }
        }

        if matches!(self.peek(), Some('e' | 'E'))
            && self
                .peek_next()
                .is_some_and(|c| c.is_ascii_digit() || c == '+' || c == '-')
        {
            self.advance();
            if matches!(self.peek(), Some('+' | '-')) {
                self.advance();
            }
            self.consume_digits();
            is_float = true;
        }

        if matches!(self.peek(), Some('j' | 'J')) {
            self.advance();
            self.errors.push(CompileError::syntax(
                "complex literals are not supported".to_string(),
                Span::new(start, self.current_pos),
            ));
            return;
        }

        let text: String = self.source[start..self.current_pos]
            .chars()
            .filter(|c| *c != '_')
            .collect();
        let span = Span::new(start, self.current_pos);
        if is_float {
            match text.parse::<f64>() {
                Ok(value) => self.add_token(TokenKind::Float(value), start),
                Err(_) => self
                    .errors
                    .push(CompileError::syntax(format!("invalid float literal '{text}'"), span)),
            }
        } else {
            match text.parse::<i64>() {
                Ok(value) => self.add_token(TokenKind::Int(value), start),
                Err(_) => self.errors.push(
                    CompileError::syntax(format!("integer literal '{text}' is too large"), span)
                        .with_note("integers are limited to 64 bits"),
                ),
            }
        }
    }

    fn consume_digits(&mut self) {
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() || c == '_' {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn scan_radix_int(&mut self, start: usize, radix: u32) {
        let digits_start = self.current_pos;
        while let Some(c) = self.peek() {
            if c.is_digit(radix) || c == '_' {
                self.advance();
            } else {
                break;
            }
        }
        let digits: String = self.source[digits_start..self.current_pos]
            .chars()
            .filter(|c| *c != '_')
            .collect();
        match i64::from_str_radix(&digits, radix) {
            Ok(value) => self.add_token(TokenKind::Int(value), start),
            Err(_) => self.errors.push(CompileError::syntax(
                format!("invalid base-{radix} literal"),
                Span::new(start, self.current_pos),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::lexer::{TokenKind, lex};

    fn first(source: &str) -> TokenKind {
        lex(source).unwrap().remove(0).kind
    }

    #[test]
    fn test_integer_forms() {
        assert_eq!(first("1_000"), TokenKind::Int(1000));
        assert_eq!(first("0x_ff"), TokenKind::Int(255));
        assert_eq!(first("0o17"), TokenKind::Int(15));
        assert_eq!(first("0b101"), TokenKind::Int(5));
    }

    #[test]
    fn test_float_forms() {
        assert_eq!(first("1.5"), TokenKind::Float(1.5));
        assert_eq!(first(".25"), TokenKind::Float(0.25));
        assert_eq!(first("2e3"), TokenKind::Float(2000.0));
        assert_eq!(first("1.5E-2"), TokenKind::Float(0.015));
        assert_eq!(first("3."), TokenKind::Float(3.0));
    }

    #[test]
    fn test_attribute_after_int_is_not_a_float() {
        let tokens = lex("1 .real").unwrap();
        assert_eq!(tokens[0].kind, TokenKind::Int(1));
    }

    #[test]
    fn test_oversized_literal_is_rejected() {
        let errs = lex("99999999999999999999").unwrap_err();
        assert!(errs[0].message.contains("too large"));
    }
}
