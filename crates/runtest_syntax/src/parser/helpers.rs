/// Token-stream helpers and error recovery.
///
/// This chunk contains the low-level primitives used throughout parsing:
/// - Peeking/consuming tokens (`peek`, `advance`)
/// - Matching / expecting keywords, operators, and punctuation
/// - Layout handling (`skip_newlines`, `end_of_statement`)
/// - Error recovery (`synchronize`)
impl<'a> Parser<'a> {
    // ========================================================================
    // Helpers
    // ========================================================================

    fn is_at_end(&self) -> bool {
        matches!(self.peek().kind, TokenKind::Eof)
    }

    /// Return the current token without consuming it.
    fn peek(&self) -> &Token {
        let last = self.tokens.len().saturating_sub(1);
        &self.tokens[self.pos.min(last)]
    }

    /// Return the token after the current token without consuming it.
    fn peek_next(&self) -> &Token {
        let last = self.tokens.len().saturating_sub(1);
        &self.tokens[(self.pos + 1).min(last)]
    }

    /// Advance to the next token and return the token we just consumed.
    fn advance(&mut self) -> &Token {
        if !self.is_at_end() {
            self.pos += 1;
        }
        &self.tokens[self.pos.saturating_sub(1)]
    }

    fn check(&self, kind: &TokenKind) -> bool {
        std::mem::discriminant(kind) == std::mem::discriminant(&self.peek().kind)
    }

    fn check_keyword(&self, id: KeywordId) -> bool {
        self.peek().kind.is_keyword(id)
    }

    fn check_punct(&self, id: PunctuationId) -> bool {
        self.peek().kind.is_punctuation(id)
    }

    fn check_op(&self, id: OperatorId) -> bool {
        self.peek().kind.is_operator(id)
    }

    fn match_token(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn match_keyword(&mut self, id: KeywordId) -> bool {
        if self.check_keyword(id) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn match_punct(&mut self, id: PunctuationId) -> bool {
        if self.check_punct(id) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn match_op(&mut self, id: OperatorId) -> bool {
        if self.check_op(id) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect_keyword(&mut self, id: KeywordId, msg: &str) -> Result<Span, CompileError> {
        if self.check_keyword(id) {
            Ok(self.advance().span)
        } else {
            Err(self.error_here(msg))
        }
    }

    fn expect_punct(&mut self, id: PunctuationId, msg: &str) -> Result<Span, CompileError> {
        if self.check_punct(id) {
            Ok(self.advance().span)
        } else {
            Err(self.error_here(msg))
        }
    }

    fn expect_ident(&mut self, msg: &str) -> Result<Ident, CompileError> {
        match &self.peek().kind {
            TokenKind::Ident(name) => {
                let name = name.clone();
                self.advance();
                Ok(name)
            }
            _ => Err(self.error_here(msg)),
        }
    }

    /// Build a syntax error at the current token.
    fn error_here(&self, msg: &str) -> CompileError {
        let token = self.peek();
        CompileError::syntax(msg.to_string(), token.span).with_note(format!("found {}", token.kind.describe()))
    }

    fn skip_newlines(&mut self) {
        while self.match_token(&TokenKind::Newline) {}
    }

    /// Consume the end of a simple-statement line.
    fn end_of_statement(&mut self) -> Result<(), CompileError> {
        if self.match_token(&TokenKind::Newline) || self.is_at_end() || self.check(&TokenKind::Dedent) {
            Ok(())
        } else {
            Err(self.error_here("invalid syntax"))
        }
    }

    /// Skip to the start of the next line after an error.
    fn synchronize(&mut self) {
        let mut depth = 0usize;
        while !self.is_at_end() {
            match self.peek().kind {
                TokenKind::Newline => {
                    self.advance();
                    return;
                }
                TokenKind::Indent => depth += 1,
                TokenKind::Dedent if depth == 0 => {
                    self.advance();
                    return;
                }
                TokenKind::Dedent => depth -= 1,
                _ => {}
            }
            self.advance();
        }
    }

    fn current_span(&self) -> Span {
        self.peek().span
    }

    /// End offset of the most recently consumed token.
    fn previous_end(&self) -> usize {
        self.tokens[self.pos.saturating_sub(1)].span.end
    }

    /// Check if the current token can start an expression.
    fn is_at_expr_start(&self) -> bool {
        matches!(
            self.peek().kind,
            TokenKind::Ident(_)
                | TokenKind::Int(_)
                | TokenKind::Float(_)
                | TokenKind::String(_)
                | TokenKind::FString(_)
                | TokenKind::Ellipsis
        ) || self.check_keyword(KeywordId::True)
            || self.check_keyword(KeywordId::False)
            || self.check_keyword(KeywordId::None)
            || self.check_keyword(KeywordId::Not)
            || self.check_keyword(KeywordId::Lambda)
            || self.check_punct(PunctuationId::LParen)
            || self.check_punct(PunctuationId::LBracket)
            || self.check_punct(PunctuationId::LBrace)
            || self.check_op(OperatorId::Minus)
            || self.check_op(OperatorId::Plus)
            || self.check_op(OperatorId::Tilde)
            || self.check_op(OperatorId::Star)
    }
}

/// Take the first of a non-empty error list.
fn first_error(errors: Vec<CompileError>, offset: usize) -> CompileError {
    errors
        .into_iter()
        .next()
        .unwrap_or_else(|| CompileError::syntax("invalid syntax".to_string(), Span::new(offset, offset)))
}
