//! INDENT/DEDENT handling at the start of each logical line.

use super::{Lexer, Token, TokenKind};
use crate::ast::Span;
use crate::diagnostics::CompileError;

/// Tabs advance to the next multiple of this column.
const TAB_WIDTH: usize = 8;

impl<'a> Lexer<'a> {
    /// Measure the indentation of the current line and emit layout tokens.
    ///
    /// Blank and comment-only lines are consumed whole and never affect the indent stack.
    pub(super) fn handle_indentation(&mut self) {
        let line_start = self.current_pos;
        let mut width = 0usize;
        while let Some(c) = self.peek() {
            match c {
                ' ' => width += 1,
                '\t' => width = (width / TAB_WIDTH + 1) * TAB_WIDTH,
                '\x0c' => width = 0,
                _ => break,
            }
            self.advance();
        }

        match self.peek() {
            None => {
                self.at_line_start = false;
                return;
            }
            Some('\n' | '\r' | '#') => {
                while let Some(c) = self.advance() {
                    if c == '\n' {
                        break;
                    }
                }
                return;
            }
            _ => {}
        }

        self.at_line_start = false;
        let current = self.indent_stack.last().copied().unwrap_or(0);
        let span = Span::new(line_start, self.current_pos);

        if width > current {
            self.indent_stack.push(width);
            self.tokens.push(Token::new(TokenKind::Indent, span));
        } else if width < current {
            let mut dedents = 0;
            while self.indent_stack.len() > 1 && self.indent_stack.last().is_some_and(|w| *w > width) {
                self.indent_stack.pop();
                dedents += 1;
            }
            if self.indent_stack.last().copied().unwrap_or(0) != width {
                self.errors.push(CompileError::indentation(
                    "unindent does not match any outer indentation level".to_string(),
                    span,
                ));
            }
            self.tokens.push(Token::new(TokenKind::Dedent, span));
            self.pending_dedents += dedents - 1;
        }
    }
}
