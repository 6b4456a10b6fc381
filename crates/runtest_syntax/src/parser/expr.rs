/// Expression parsing methods.
///
/// Precedence, loosest first:
///
/// `lambda` < `x if c else y` < `or` < `and` < `not` < comparisons < `|` < `^` < `&`
/// < shifts < `+ -` < `* / // %` < unary `+ - ~` < `**` < calls/attributes/subscripts
///
/// The binary operators between `|` and `*` are parsed by one precedence-climbing loop that
/// reads precedence from the operator registry.
impl<'a> Parser<'a> {
    // ========================================================================
    // Lists of expressions
    // ========================================================================

    /// `expr (',' expr)* [',']`, producing a tuple when a comma is present.
    fn expression_list(&mut self) -> Result<Spanned<Expr>, CompileError> {
        self.comma_list(Self::expression)
    }

    /// Like [`Self::expression_list`], but items may be `*starred`.
    fn star_expression_list(&mut self) -> Result<Spanned<Expr>, CompileError> {
        self.comma_list(Self::star_or_expression)
    }

    /// Loop targets: stops before `in` instead of parsing it as a comparison.
    fn target_list(&mut self) -> Result<Spanned<Expr>, CompileError> {
        let target = self.comma_list(Self::star_or_bit_or)?;
        self.validate_target(&target)?;
        Ok(target)
    }

    fn comma_list(
        &mut self,
        item: fn(&mut Self) -> Result<Spanned<Expr>, CompileError>,
    ) -> Result<Spanned<Expr>, CompileError> {
        let start = self.current_span().start;
        let first = item(self)?;
        if !self.check_punct(PunctuationId::Comma) {
            return Ok(first);
        }
        let mut items = vec![first];
        while self.match_punct(PunctuationId::Comma) {
            if !self.is_at_expr_start() {
                break;
            }
            items.push(item(self)?);
        }
        Ok(Spanned::new(Expr::Tuple(items), Span::new(start, self.previous_end())))
    }

    fn star_or_expression(&mut self) -> Result<Spanned<Expr>, CompileError> {
        if self.check_op(OperatorId::Star) {
            let start = self.advance().span.start;
            let inner = self.bit_or()?;
            return Ok(Spanned::new(
                Expr::Starred(Box::new(inner)),
                Span::new(start, self.previous_end()),
            ));
        }
        self.expression()
    }

    fn star_or_bit_or(&mut self) -> Result<Spanned<Expr>, CompileError> {
        if self.check_op(OperatorId::Star) {
            let start = self.advance().span.start;
            let inner = self.bit_or()?;
            return Ok(Spanned::new(
                Expr::Starred(Box::new(inner)),
                Span::new(start, self.previous_end()),
            ));
        }
        self.bit_or()
    }

    // ========================================================================
    // Expression ladder
    // ========================================================================

    /// Parse a full expression (`test` in Python's grammar).
    fn expression(&mut self) -> Result<Spanned<Expr>, CompileError> {
        if self.check_keyword(KeywordId::Lambda) {
            return self.lambda();
        }
        let start = self.current_span().start;
        let body = self.or_test()?;
        if !self.check_keyword(KeywordId::If) {
            return Ok(body);
        }
        self.advance();
        let test = self.or_test()?;
        self.expect_keyword(KeywordId::Else, "expected 'else' after conditional expression")?;
        let orelse = self.expression()?;
        Ok(Spanned::new(
            Expr::Conditional {
                test: Box::new(test),
                body: Box::new(body),
                orelse: Box::new(orelse),
            },
            Span::new(start, self.previous_end()),
        ))
    }

    fn lambda(&mut self) -> Result<Spanned<Expr>, CompileError> {
        let start = self.expect_keyword(KeywordId::Lambda, "expected 'lambda'")?.start;
        let params = self.parameters(true)?;
        self.expect_punct(PunctuationId::Colon, "expected ':' after lambda parameters")?;
        let body = self.expression()?;
        Ok(Spanned::new(
            Expr::Lambda(Rc::new(Lambda { params, body })),
            Span::new(start, self.previous_end()),
        ))
    }

    fn or_test(&mut self) -> Result<Spanned<Expr>, CompileError> {
        let mut left = self.and_test()?;
        while self.match_keyword(KeywordId::Or) {
            let right = self.and_test()?;
            let span = left.span.merge(right.span);
            left = Spanned::new(Expr::BoolOp(BoolOp::Or, Box::new(left), Box::new(right)), span);
        }
        Ok(left)
    }

    fn and_test(&mut self) -> Result<Spanned<Expr>, CompileError> {
        let mut left = self.not_test()?;
        while self.match_keyword(KeywordId::And) {
            let right = self.not_test()?;
            let span = left.span.merge(right.span);
            left = Spanned::new(Expr::BoolOp(BoolOp::And, Box::new(left), Box::new(right)), span);
        }
        Ok(left)
    }

    fn not_test(&mut self) -> Result<Spanned<Expr>, CompileError> {
        if self.check_keyword(KeywordId::Not) {
            let start = self.advance().span.start;
            let operand = self.not_test()?;
            return Ok(Spanned::new(
                Expr::Unary(UnaryOp::Not, Box::new(operand)),
                Span::new(start, self.previous_end()),
            ));
        }
        self.comparison()
    }

    fn comparison(&mut self) -> Result<Spanned<Expr>, CompileError> {
        let left = self.bit_or()?;
        let mut links = Vec::new();
        while let Some(op) = self.comparison_operator() {
            let right = self.bit_or()?;
            links.push((op, right));
        }
        if links.is_empty() {
            return Ok(left);
        }
        let end = links.last().map_or(left.span.end, |(_, r)| r.span.end);
        let span = Span::new(left.span.start, end);
        Ok(Spanned::new(Expr::Compare(Box::new(left), links), span))
    }

    /// Consume a comparison operator, including the two-word forms `not in` and `is not`.
    fn comparison_operator(&mut self) -> Option<CompareOp> {
        let op = match &self.peek().kind {
            TokenKind::Operator(OperatorId::EqEq) => CompareOp::Eq,
            TokenKind::Operator(OperatorId::NotEq) => CompareOp::NotEq,
            TokenKind::Operator(OperatorId::Lt) => CompareOp::Lt,
            TokenKind::Operator(OperatorId::LtEq) => CompareOp::LtEq,
            TokenKind::Operator(OperatorId::Gt) => CompareOp::Gt,
            TokenKind::Operator(OperatorId::GtEq) => CompareOp::GtEq,
            TokenKind::Keyword(KeywordId::In) => CompareOp::In,
            TokenKind::Keyword(KeywordId::Not) if self.peek_next().kind.is_keyword(KeywordId::In) => {
                self.advance();
                CompareOp::NotIn
            }
            TokenKind::Keyword(KeywordId::Is) => {
                self.advance();
                return Some(if self.match_keyword(KeywordId::Not) {
                    CompareOp::IsNot
                } else {
                    CompareOp::Is
                });
            }
            _ => return None,
        };
        self.advance();
        Some(op)
    }

    fn bit_or(&mut self) -> Result<Spanned<Expr>, CompileError> {
        self.binary(operators::info_for(OperatorId::Pipe).precedence)
    }

    /// Precedence climbing over the infix arithmetic and bitwise operators.
    fn binary(&mut self, min_prec: u8) -> Result<Spanned<Expr>, CompileError> {
        let mut left = self.unary()?;
        loop {
            let Some(id) = self.peek().operator_id() else {
                break;
            };
            let Some(op) = BinaryOp::from_operator(id) else {
                break;
            };
            let info = operators::info_for(id);
            if op == BinaryOp::Pow || info.precedence < min_prec {
                break;
            }
            self.advance();
            let right = self.binary(info.precedence + 1)?;
            let span = left.span.merge(right.span);
            left = Spanned::new(Expr::Binary(Box::new(left), op, Box::new(right)), span);
        }
        Ok(left)
    }

    fn unary(&mut self) -> Result<Spanned<Expr>, CompileError> {
        let op = match self.peek().operator_id() {
            Some(OperatorId::Minus) => UnaryOp::Neg,
            Some(OperatorId::Plus) => UnaryOp::Pos,
            Some(OperatorId::Tilde) => UnaryOp::Invert,
            _ => return self.power(),
        };
        let start = self.advance().span.start;
        let operand = self.unary()?;
        Ok(Spanned::new(
            Expr::Unary(op, Box::new(operand)),
            Span::new(start, self.previous_end()),
        ))
    }

    /// `primary ['**' unary]` (right-associative, binds tighter than unary minus on its left)
    fn power(&mut self) -> Result<Spanned<Expr>, CompileError> {
        let base = self.primary()?;
        if !self.match_op(OperatorId::StarStar) {
            return Ok(base);
        }
        let exponent = self.unary()?;
        let span = base.span.merge(exponent.span);
        Ok(Spanned::new(
            Expr::Binary(Box::new(base), BinaryOp::Pow, Box::new(exponent)),
            span,
        ))
    }

    /// An atom followed by any number of calls, attribute accesses and subscripts.
    fn primary(&mut self) -> Result<Spanned<Expr>, CompileError> {
        let mut expr = self.atom()?;
        loop {
            let start = expr.span.start;
            if self.match_punct(PunctuationId::LParen) {
                let args = self.call_arguments()?;
                expr = Spanned::new(Expr::Call(Box::new(expr), args), Span::new(start, self.previous_end()));
            } else if self.match_punct(PunctuationId::LBracket) {
                let index = self.subscript()?;
                self.expect_punct(PunctuationId::RBracket, "expected ']'")?;
                expr = Spanned::new(
                    Expr::Subscript(Box::new(expr), Box::new(index)),
                    Span::new(start, self.previous_end()),
                );
            } else if self.match_punct(PunctuationId::Dot) {
                let name = self.expect_ident("expected attribute name after '.'")?;
                expr = Spanned::new(Expr::Attribute(Box::new(expr), name), Span::new(start, self.previous_end()));
            } else {
                break;
            }
        }
        Ok(expr)
    }

    /// Parse call arguments after `(`; consumes the closing `)`.
    fn call_arguments(&mut self) -> Result<Vec<CallArg>, CompileError> {
        let mut args = Vec::new();
        while !self.check_punct(PunctuationId::RParen) {
            if self.match_op(OperatorId::StarStar) {
                args.push(CallArg::DoubleStar(self.expression()?));
            } else if self.match_op(OperatorId::Star) {
                args.push(CallArg::Star(self.expression()?));
            } else if matches!(self.peek().kind, TokenKind::Ident(_)) && self.peek_next().kind.is_operator(OperatorId::Eq) {
                let name = self.expect_ident("expected keyword name")?;
                self.advance(); // `=`
                args.push(CallArg::Keyword(name, self.expression()?));
            } else {
                let value = self.expression()?;
                if self.check_keyword(KeywordId::For) {
                    let start = value.span.start;
                    let clauses = self.comprehension_clauses()?;
                    let comp = Comprehension {
                        kind: ComprehensionKind::Generator,
                        element: value,
                        clauses,
                    };
                    args.push(CallArg::Positional(Spanned::new(
                        Expr::Comprehension(Box::new(comp)),
                        Span::new(start, self.previous_end()),
                    )));
                } else {
                    if args.iter().any(|a| matches!(a, CallArg::Keyword(..) | CallArg::DoubleStar(_))) {
                        return Err(CompileError::syntax(
                            "positional argument follows keyword argument".to_string(),
                            value.span,
                        ));
                    }
                    args.push(CallArg::Positional(value));
                }
            }
            if !self.match_punct(PunctuationId::Comma) {
                break;
            }
        }
        self.expect_punct(PunctuationId::RParen, "expected ')' after arguments")?;
        Ok(args)
    }

    /// Parse the inside of `[...]`: an index, a slice, or a tuple of them.
    fn subscript(&mut self) -> Result<Spanned<Expr>, CompileError> {
        let start = self.current_span().start;
        let first = self.slice_item()?;
        if !self.check_punct(PunctuationId::Comma) {
            return Ok(first);
        }
        let mut items = vec![first];
        while self.match_punct(PunctuationId::Comma) {
            if self.check_punct(PunctuationId::RBracket) {
                break;
            }
            items.push(self.slice_item()?);
        }
        Ok(Spanned::new(Expr::Tuple(items), Span::new(start, self.previous_end())))
    }

    fn slice_item(&mut self) -> Result<Spanned<Expr>, CompileError> {
        let start = self.current_span().start;
        let lower = if self.check_punct(PunctuationId::Colon) {
            None
        } else {
            let expr = self.expression()?;
            if !self.check_punct(PunctuationId::Colon) {
                return Ok(expr);
            }
            Some(expr)
        };
        self.expect_punct(PunctuationId::Colon, "expected ':' in slice")?;
        let bound = |p: &mut Self| -> Result<Option<Spanned<Expr>>, CompileError> {
            if p.check_punct(PunctuationId::Colon)
                || p.check_punct(PunctuationId::Comma)
                || p.check_punct(PunctuationId::RBracket)
            {
                Ok(None)
            } else {
                p.expression().map(Some)
            }
        };
        let upper = bound(self)?;
        let step = if self.match_punct(PunctuationId::Colon) {
            bound(self)?
        } else {
            None
        };
        Ok(Spanned::new(
            Expr::Slice(Box::new(SliceExpr { lower, upper, step })),
            Span::new(start, self.previous_end()),
        ))
    }

    /// `('for' targets 'in' or_test ('if' or_test)*)+`
    fn comprehension_clauses(&mut self) -> Result<Vec<ComprehensionClause>, CompileError> {
        let mut clauses = Vec::new();
        while self.match_keyword(KeywordId::For) {
            let target = self.target_list()?;
            self.expect_keyword(KeywordId::In, "expected 'in' in comprehension")?;
            let iter = self.or_test()?;
            let mut conditions = Vec::new();
            while self.match_keyword(KeywordId::If) {
                conditions.push(self.or_test()?);
            }
            clauses.push(ComprehensionClause {
                target,
                iter,
                conditions,
            });
        }
        Ok(clauses)
    }

    // ========================================================================
    // Atoms
    // ========================================================================

    fn atom(&mut self) -> Result<Spanned<Expr>, CompileError> {
        let token = self.peek().clone();
        let start = token.span.start;
        let node = match token.kind {
            TokenKind::Ident(name) => {
                self.advance();
                Expr::Name(name)
            }
            TokenKind::Int(value) => {
                self.advance();
                Expr::Int(value)
            }
            TokenKind::Float(value) => {
                self.advance();
                Expr::Float(value)
            }
            TokenKind::String(_) | TokenKind::FString(_) => return self.string_literal(),
            TokenKind::Ellipsis => {
                self.advance();
                Expr::Ellipsis
            }
            TokenKind::Keyword(KeywordId::True) => {
                self.advance();
                Expr::Bool(true)
            }
            TokenKind::Keyword(KeywordId::False) => {
                self.advance();
                Expr::Bool(false)
            }
            TokenKind::Keyword(KeywordId::None) => {
                self.advance();
                Expr::None
            }
            TokenKind::Punctuation(PunctuationId::LParen) => return self.paren_expr(),
            TokenKind::Punctuation(PunctuationId::LBracket) => return self.list_display(),
            TokenKind::Punctuation(PunctuationId::LBrace) => return self.brace_display(),
            TokenKind::Indent => {
                return Err(CompileError::indentation("unexpected indent".to_string(), token.span));
            }
            _ => return Err(self.error_here("invalid syntax")),
        };
        Ok(Spanned::new(node, Span::new(start, self.previous_end())))
    }

    /// Adjacent string literals concatenate; any f-string makes the whole run an f-string.
    fn string_literal(&mut self) -> Result<Spanned<Expr>, CompileError> {
        let start = self.current_span().start;
        let mut parts: Vec<FStringPart> = Vec::new();
        let mut formatted = false;
        loop {
            match self.peek().kind.clone() {
                TokenKind::String(text) => {
                    self.advance();
                    push_literal(&mut parts, text);
                }
                TokenKind::FString(lex_parts) => {
                    self.advance();
                    formatted = true;
                    for part in lex_parts {
                        match part {
                            LexFStringPart::Literal(text) => push_literal(&mut parts, text),
                            LexFStringPart::Expr {
                                source,
                                offset,
                                conversion,
                                spec,
                            } => {
                                let expr = parse_embedded_expression(&source, offset)?;
                                parts.push(FStringPart::Expr {
                                    expr: Box::new(expr),
                                    conversion,
                                    spec,
                                });
                            }
                        }
                    }
                }
                _ => break,
            }
        }
        let span = Span::new(start, self.previous_end());
        if formatted {
            return Ok(Spanned::new(Expr::FString(parts), span));
        }
        let text = parts
            .into_iter()
            .map(|p| match p {
                FStringPart::Literal(text) => text,
                FStringPart::Expr { .. } => String::new(),
            })
            .collect();
        Ok(Spanned::new(Expr::Str(text), span))
    }

    /// `()`, `(expr)`, `(a, b)`, or `(x for x in xs)`
    fn paren_expr(&mut self) -> Result<Spanned<Expr>, CompileError> {
        let start = self.expect_punct(PunctuationId::LParen, "expected '('")?.start;
        if self.match_punct(PunctuationId::RParen) {
            return Ok(Spanned::new(Expr::Tuple(Vec::new()), Span::new(start, self.previous_end())));
        }
        let first = self.star_or_expression()?;
        if self.check_keyword(KeywordId::For) {
            let clauses = self.comprehension_clauses()?;
            self.expect_punct(PunctuationId::RParen, "expected ')' after generator expression")?;
            let comp = Comprehension {
                kind: ComprehensionKind::Generator,
                element: first,
                clauses,
            };
            return Ok(Spanned::new(
                Expr::Comprehension(Box::new(comp)),
                Span::new(start, self.previous_end()),
            ));
        }
        if !self.check_punct(PunctuationId::Comma) {
            self.expect_punct(PunctuationId::RParen, "expected ')'")?;
            return Ok(Spanned::new(first.node, Span::new(start, self.previous_end())));
        }
        let mut items = vec![first];
        while self.match_punct(PunctuationId::Comma) {
            if self.check_punct(PunctuationId::RParen) {
                break;
            }
            items.push(self.star_or_expression()?);
        }
        self.expect_punct(PunctuationId::RParen, "expected ')'")?;
        Ok(Spanned::new(Expr::Tuple(items), Span::new(start, self.previous_end())))
    }

    /// `[...]`: list display or list comprehension.
    fn list_display(&mut self) -> Result<Spanned<Expr>, CompileError> {
        let start = self.expect_punct(PunctuationId::LBracket, "expected '['")?.start;
        if self.match_punct(PunctuationId::RBracket) {
            return Ok(Spanned::new(Expr::List(Vec::new()), Span::new(start, self.previous_end())));
        }
        let first = self.star_or_expression()?;
        if self.check_keyword(KeywordId::For) {
            let clauses = self.comprehension_clauses()?;
            self.expect_punct(PunctuationId::RBracket, "expected ']' after list comprehension")?;
            let comp = Comprehension {
                kind: ComprehensionKind::List,
                element: first,
                clauses,
            };
            return Ok(Spanned::new(
                Expr::Comprehension(Box::new(comp)),
                Span::new(start, self.previous_end()),
            ));
        }
        let mut items = vec![first];
        while self.match_punct(PunctuationId::Comma) {
            if self.check_punct(PunctuationId::RBracket) {
                break;
            }
            items.push(self.star_or_expression()?);
        }
        self.expect_punct(PunctuationId::RBracket, "expected ']'")?;
        Ok(Spanned::new(Expr::List(items), Span::new(start, self.previous_end())))
    }

    /// `{...}`: dict or set display, or the matching comprehension.
    fn brace_display(&mut self) -> Result<Spanned<Expr>, CompileError> {
        let start = self.expect_punct(PunctuationId::LBrace, "expected '{'")?.start;
        if self.match_punct(PunctuationId::RBrace) {
            return Ok(Spanned::new(Expr::Dict(Vec::new()), Span::new(start, self.previous_end())));
        }

        let first_entry = if self.match_op(OperatorId::StarStar) {
            DictEntry::Spread(self.bit_or()?)
        } else {
            let key = self.star_or_expression()?;
            if !self.match_punct(PunctuationId::Colon) {
                return self.set_display(start, key);
            }
            let value = self.expression()?;
            if self.check_keyword(KeywordId::For) {
                let clauses = self.comprehension_clauses()?;
                self.expect_punct(PunctuationId::RBrace, "expected '}' after dict comprehension")?;
                let comp = Comprehension {
                    kind: ComprehensionKind::Dict(value),
                    element: key,
                    clauses,
                };
                return Ok(Spanned::new(
                    Expr::Comprehension(Box::new(comp)),
                    Span::new(start, self.previous_end()),
                ));
            }
            DictEntry::Pair(key, value)
        };

        let mut entries = vec![first_entry];
        while self.match_punct(PunctuationId::Comma) {
            if self.check_punct(PunctuationId::RBrace) {
                break;
            }
            if self.match_op(OperatorId::StarStar) {
                entries.push(DictEntry::Spread(self.bit_or()?));
                continue;
            }
            let key = self.expression()?;
            self.expect_punct(PunctuationId::Colon, "expected ':' in dict display")?;
            let value = self.expression()?;
            entries.push(DictEntry::Pair(key, value));
        }
        self.expect_punct(PunctuationId::RBrace, "expected '}'")?;
        Ok(Spanned::new(Expr::Dict(entries), Span::new(start, self.previous_end())))
    }

    fn set_display(&mut self, start: usize, first: Spanned<Expr>) -> Result<Spanned<Expr>, CompileError> {
        if self.check_keyword(KeywordId::For) {
            let clauses = self.comprehension_clauses()?;
            self.expect_punct(PunctuationId::RBrace, "expected '}' after set comprehension")?;
            let comp = Comprehension {
                kind: ComprehensionKind::Set,
                element: first,
                clauses,
            };
            return Ok(Spanned::new(
                Expr::Comprehension(Box::new(comp)),
                Span::new(start, self.previous_end()),
            ));
        }
        let mut items = vec![first];
        while self.match_punct(PunctuationId::Comma) {
            if self.check_punct(PunctuationId::RBrace) {
                break;
            }
            items.push(self.star_or_expression()?);
        }
        self.expect_punct(PunctuationId::RBrace, "expected '}'")?;
        Ok(Spanned::new(Expr::Set(items), Span::new(start, self.previous_end())))
    }
}

/// Append literal text, merging with a preceding literal part.
fn push_literal(parts: &mut Vec<FStringPart>, text: String) {
    if let Some(FStringPart::Literal(prev)) = parts.last_mut() {
        prev.push_str(&text);
    } else {
        parts.push(FStringPart::Literal(text));
    }
}
