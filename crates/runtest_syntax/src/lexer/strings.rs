//! String, raw-string and f-string scanning.
//!
//! The body of a literal is first located verbatim (so an escaped quote never terminates it),
//! then either unescaped, kept raw, or split into f-string parts.

use super::{FStringPart, Lexer, TokenKind};
use crate::ast::Span;
use crate::diagnostics::CompileError;

impl<'a> Lexer<'a> {
    /// Scan a string literal whose opening quote was just consumed.
    ///
    /// `prefix` is the (possibly empty) literal prefix such as `r`, `b` or `f`.
    pub(super) fn scan_string(&mut self, start: usize, quote: char, prefix: &str) {
        let prefix = prefix.to_ascii_lowercase();
        let raw = prefix.contains('r');
        let formatted = prefix.contains('f');

        let triple = self.peek() == Some(quote) && self.peek_next() == Some(quote);
        if triple {
            self.advance();
            self.advance();
        }

        let body_start = self.current_pos;
        let Some(body_end) = self.read_string_body(quote, triple) else {
            let message = if triple {
                "unterminated triple-quoted string literal"
            } else {
                "unterminated string literal"
            };
            self.errors
                .push(CompileError::syntax(message.to_string(), Span::new(start, self.current_pos)));
            return;
        };
        let body = &self.source[body_start..body_end];

        if formatted {
            match split_fstring(body, raw, body_start) {
                Ok(parts) => self.add_token(TokenKind::FString(parts), start),
                Err(err) => self.errors.push(err),
            }
        } else {
            let text = if raw { body.to_string() } else { unescape(body) };
            self.add_token(TokenKind::String(text), start);
        }
    }

    /// Consume through the closing quote and return the byte offset where the body ends.
    fn read_string_body(&mut self, quote: char, triple: bool) -> Option<usize> {
        loop {
            let pos = self.current_pos;
            match self.advance()? {
                '\\' => {
                    self.advance()?;
                }
                '\n' if !triple => return None,
                c if c == quote => {
                    if !triple {
                        return Some(pos);
                    }
                    if self.peek() == Some(quote) && self.peek_next() == Some(quote) {
                        self.advance();
                        self.advance();
                        return Some(pos);
                    }
                }
                _ => {}
            }
        }
    }
}

/// Process backslash escapes in a non-raw literal body.
///
/// Unknown escapes are kept verbatim (backslash included).
pub(crate) fn unescape(body: &str) -> String {
    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        let Some(next) = chars.next() else {
            out.push('\\');
            break;
        };
        match next {
            '\n' => {}
            'n' => out.push('\n'),
            't' => out.push('\t'),
            'r' => out.push('\r'),
            '\\' => out.push('\\'),
            '\'' => out.push('\''),
            '"' => out.push('"'),
            'a' => out.push('\x07'),
            'b' => out.push('\x08'),
            'f' => out.push('\x0c'),
            'v' => out.push('\x0b'),
            '0'..='7' => {
                let mut value = next.to_digit(8).unwrap_or(0);
                for _ in 0..2 {
                    match chars.peek().and_then(|c| c.to_digit(8)) {
                        Some(d) => {
                            value = value * 8 + d;
                            chars.next();
                        }
                        None => break,
                    }
                }
                out.extend(char::from_u32(value));
            }
            'x' | 'u' | 'U' => {
                let width = match next {
                    'x' => 2,
                    'u' => 4,
                    _ => 8,
                };
                let mut digits = String::new();
                while digits.len() < width {
                    match chars.peek() {
                        Some(c) if c.is_ascii_hexdigit() => {
                            digits.push(*c);
                            chars.next();
                        }
                        _ => break,
                    }
                }
                let decoded = (digits.len() == width)
                    .then(|| u32::from_str_radix(&digits, 16).ok())
                    .flatten()
                    .and_then(char::from_u32);
                match decoded {
                    Some(ch) => out.push(ch),
                    None => {
                        out.push('\\');
                        out.push(next);
                        out.push_str(&digits);
                    }
                }
            }
            other => {
                out.push('\\');
                out.push(other);
            }
        }
    }
    out
}

/// Split an f-string body into literal and expression parts.
fn split_fstring(body: &str, raw: bool, body_start: usize) -> Result<Vec<FStringPart>, CompileError> {
    let chars: Vec<(usize, char)> = body.char_indices().collect();
    let mut parts = Vec::new();
    let mut literal = String::new();
    let mut i = 0;

    let flush = |literal: &mut String, parts: &mut Vec<FStringPart>| {
        if !literal.is_empty() {
            let text = if raw { literal.clone() } else { unescape(literal) };
            parts.push(FStringPart::Literal(text));
            literal.clear();
        }
    };

    while i < chars.len() {
        let (pos, c) = chars[i];
        let next = chars.get(i + 1).map(|(_, c)| *c);
        match c {
            '{' if next == Some('{') => {
                literal.push('{');
                i += 2;
            }
            '}' if next == Some('}') => {
                literal.push('}');
                i += 2;
            }
            '}' => {
                return Err(CompileError::syntax(
                    "f-string: single '}' is not allowed".to_string(),
                    Span::new(body_start + pos, body_start + pos + 1),
                ));
            }
            '{' => {
                flush(&mut literal, &mut parts);
                let (part, consumed) = scan_fstring_field(body, &chars[i + 1..], body_start).ok_or_else(|| {
                    CompileError::syntax(
                        "f-string: expecting '}'".to_string(),
                        Span::new(body_start + pos, body_start + body.len()),
                    )
                })?;
                parts.push(part);
                i += consumed + 1;
            }
            _ => {
                literal.push(c);
                i += 1;
            }
        }
    }
    flush(&mut literal, &mut parts);
    Ok(parts)
}

/// Scan one `{expr!c:spec}` replacement field. `chars` starts right after the `{`.
///
/// ## Returns
/// - The parsed part and the number of chars consumed (including the closing `}`), or `None`
///   when the field is never closed.
fn scan_fstring_field(body: &str, chars: &[(usize, char)], body_start: usize) -> Option<(FStringPart, usize)> {
    let expr_start = chars.first()?.0;
    let mut depth = 0usize;
    let mut in_quote: Option<char> = None;
    let mut expr_end = None;
    let mut conversion = None;
    let mut spec: Option<String> = None;
    let mut i = 0;

    while i < chars.len() {
        let (pos, c) = chars[i];
        if let Some(q) = in_quote {
            if c == q {
                in_quote = None;
            }
            i += 1;
            continue;
        }
        match c {
            '\'' | '"' if expr_end.is_none() => in_quote = Some(c),
            '(' | '[' | '{' if expr_end.is_none() => depth += 1,
            ')' | ']' if depth > 0 => depth -= 1,
            '}' if depth > 0 => depth -= 1,
            '}' => {
                let end = expr_end.unwrap_or(pos);
                let part = FStringPart::Expr {
                    source: body[expr_start..end].to_string(),
                    offset: body_start + expr_start,
                    conversion,
                    spec,
                };
                return Some((part, i + 1));
            }
            '!' if depth == 0 && expr_end.is_none() && chars.get(i + 1).is_some_and(|(_, n)| *n != '=') => {
                expr_end = Some(pos);
                conversion = chars.get(i + 1).map(|(_, n)| *n);
                i += 2;
                continue;
            }
            ':' if depth == 0 && spec.is_none() => {
                if expr_end.is_none() {
                    expr_end = Some(pos);
                }
                spec = Some(String::new());
            }
            _ => {
                if let Some(spec) = spec.as_mut() {
                    spec.push(c);
                }
            }
        }
        i += 1;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::lex;

    fn string(source: &str) -> String {
        match lex(source).unwrap().remove(0).kind {
            TokenKind::String(s) => s,
            other => panic!("expected string, got {other:?}"),
        }
    }

    fn fstring(source: &str) -> Vec<FStringPart> {
        match lex(source).unwrap().remove(0).kind {
            TokenKind::FString(parts) => parts,
            other => panic!("expected f-string, got {other:?}"),
        }
    }

    #[test]
    fn test_escapes() {
        assert_eq!(string(r#""a\tb\n""#), "a\tb\n");
        assert_eq!(string(r#"'it\'s'"#), "it's");
        assert_eq!(string(r#""\x41é\101""#), "AéA");
        assert_eq!(string(r#""\d""#), "\\d");
    }

    #[test]
    fn test_empty_and_triple_quoted() {
        assert_eq!(string("''"), "");
        assert_eq!(string("\"\"\"line one\n'quoted' \"x\"\n\"\"\""), "line one\n'quoted' \"x\"\n");
        assert_eq!(string("''''''"), "");
    }

    #[test]
    fn test_docstring_with_prompts_keeps_backslashes_raw() {
        assert_eq!(string("r'''>>> print('\\n')'''"), ">>> print('\\n')");
    }

    #[test]
    fn test_unterminated_string() {
        let errs = lex("x = 'abc\n").unwrap_err();
        assert!(errs[0].message.contains("unterminated string literal"));
        let errs = lex("'''abc").unwrap_err();
        assert!(errs[0].message.contains("triple-quoted"));
    }

    #[test]
    fn test_fstring_parts() {
        let parts = fstring("f'a{x!r:>4}b{{c}}{d[\"k\"]}'");
        assert_eq!(parts.len(), 4);
        assert_eq!(parts[0], FStringPart::Literal("a".to_string()));
        match &parts[1] {
            FStringPart::Expr {
                source,
                conversion,
                spec,
                offset,
            } => {
                assert_eq!(source, "x");
                assert_eq!(*conversion, Some('r'));
                assert_eq!(spec.as_deref(), Some(">4"));
                assert_eq!(*offset, 4);
            }
            other => panic!("unexpected part {other:?}"),
        }
        assert_eq!(parts[2], FStringPart::Literal("b{c}".to_string()));
        match &parts[3] {
            FStringPart::Expr { source, .. } => assert_eq!(source, "d[\"k\"]"),
            other => panic!("unexpected part {other:?}"),
        }
    }

    #[test]
    fn test_fstring_errors() {
        assert!(lex("f'{x'").unwrap_err()[0].message.contains("expecting '}'"));
        assert!(lex("f'x}'").unwrap_err()[0].message.contains("single '}'"));
    }
}
