/// Statement parsing methods.
///
/// This chunk parses compound statements (`if`, `while`, `for`, `try`, `with`) with their
/// indented suites, and the simple statements that share a line separated by `;`.
///
/// ## Notes
/// - Block parsing relies on `Indent` / `Dedent` layout tokens produced by the lexer.
impl<'a> Parser<'a> {
    // ========================================================================
    // Lines and suites
    // ========================================================================

    /// Parse one logical line: a compound statement, or one or more simple statements.
    fn statement_line(&mut self) -> Result<Vec<Spanned<Stmt>>, CompileError> {
        if self.check(&TokenKind::Indent) {
            let span = self.current_span();
            return Err(CompileError::indentation("unexpected indent".to_string(), span));
        }
        if self.check(&TokenKind::Dedent) {
            self.advance();
            return Ok(Vec::new());
        }
        if let Some(stmt) = self.compound_statement()? {
            return Ok(vec![stmt]);
        }
        self.simple_statements()
    }

    /// `small_stmt (';' small_stmt)* [';'] NEWLINE`
    fn simple_statements(&mut self) -> Result<Vec<Spanned<Stmt>>, CompileError> {
        let mut stmts = vec![self.small_statement()?];
        while self.match_punct(PunctuationId::Semicolon) {
            if self.check(&TokenKind::Newline) || self.is_at_end() {
                break;
            }
            stmts.push(self.small_statement()?);
        }
        self.end_of_statement()?;
        Ok(stmts)
    }

    /// Parse the suite after a `:`: an indented block, or simple statements on the same line.
    fn suite(&mut self) -> Result<Block, CompileError> {
        if !self.match_token(&TokenKind::Newline) {
            return self.simple_statements();
        }
        self.skip_newlines();
        if !self.match_token(&TokenKind::Indent) {
            let span = self.current_span();
            return Err(CompileError::indentation("expected an indented block".to_string(), span));
        }
        let mut body = Vec::new();
        self.skip_newlines();
        while !self.check(&TokenKind::Dedent) && !self.is_at_end() {
            body.extend(self.statement_line()?);
            self.skip_newlines();
        }
        self.match_token(&TokenKind::Dedent);
        Ok(body)
    }

    /// `':' suite`
    fn colon_suite(&mut self, context: &str) -> Result<Block, CompileError> {
        self.expect_punct(PunctuationId::Colon, &format!("expected ':' after {context}"))?;
        self.suite()
    }

    fn compound_statement(&mut self) -> Result<Option<Spanned<Stmt>>, CompileError> {
        let start = self.current_span().start;
        let stmt = match self.peek().keyword_id() {
            Some(KeywordId::If) => self.if_stmt()?,
            Some(KeywordId::While) => self.while_stmt()?,
            Some(KeywordId::For) => self.for_stmt()?,
            Some(KeywordId::Try) => self.try_stmt()?,
            Some(KeywordId::With) => self.with_stmt()?,
            Some(KeywordId::Def) => Stmt::FunctionDef(Rc::new(self.function_def(Vec::new())?)),
            Some(KeywordId::Class) => Stmt::ClassDef(Rc::new(self.class_def(Vec::new())?)),
            _ if self.check_punct(PunctuationId::At) => self.decorated()?,
            _ => return Ok(None),
        };
        Ok(Some(Spanned::new(stmt, Span::new(start, self.previous_end()))))
    }

    // ========================================================================
    // Compound statements
    // ========================================================================

    fn if_stmt(&mut self) -> Result<Stmt, CompileError> {
        self.advance(); // `if` or `elif`
        let test = self.expression()?;
        let body = self.colon_suite("if condition")?;
        let orelse = if self.check_keyword(KeywordId::Elif) {
            let start = self.current_span().start;
            let nested = self.if_stmt()?;
            vec![Spanned::new(nested, Span::new(start, self.previous_end()))]
        } else if self.match_keyword(KeywordId::Else) {
            self.colon_suite("else")?
        } else {
            Vec::new()
        };
        Ok(Stmt::If(IfStmt { test, body, orelse }))
    }

    fn while_stmt(&mut self) -> Result<Stmt, CompileError> {
        self.expect_keyword(KeywordId::While, "expected 'while'")?;
        let test = self.expression()?;
        let body = self.colon_suite("while condition")?;
        let orelse = self.else_suite()?;
        Ok(Stmt::While(WhileStmt { test, body, orelse }))
    }

    fn for_stmt(&mut self) -> Result<Stmt, CompileError> {
        self.expect_keyword(KeywordId::For, "expected 'for'")?;
        let target = self.target_list()?;
        self.expect_keyword(KeywordId::In, "expected 'in' in for loop")?;
        let iter = self.expression_list()?;
        let body = self.colon_suite("for clause")?;
        let orelse = self.else_suite()?;
        Ok(Stmt::For(ForStmt {
            target,
            iter,
            body,
            orelse,
        }))
    }

    fn else_suite(&mut self) -> Result<Block, CompileError> {
        if self.match_keyword(KeywordId::Else) {
            self.colon_suite("else")
        } else {
            Ok(Vec::new())
        }
    }

    fn try_stmt(&mut self) -> Result<Stmt, CompileError> {
        let try_span = self.expect_keyword(KeywordId::Try, "expected 'try'")?;
        let body = self.colon_suite("try")?;

        let mut handlers = Vec::new();
        while self.check_keyword(KeywordId::Except) {
            let start = self.advance().span.start;
            let (kind, name) = if self.check_punct(PunctuationId::Colon) {
                (None, None)
            } else {
                let kind = self.expression()?;
                let name = if self.match_keyword(KeywordId::As) {
                    Some(self.expect_ident("expected a name after 'as'")?)
                } else {
                    None
                };
                (Some(kind), name)
            };
            let handler_body = self.colon_suite("except clause")?;
            handlers.push(ExceptHandler {
                kind,
                name,
                body: handler_body,
                span: Span::new(start, self.previous_end()),
            });
        }

        let orelse = if !handlers.is_empty() {
            self.else_suite()?
        } else {
            Vec::new()
        };
        let finalbody = if self.match_keyword(KeywordId::Finally) {
            self.colon_suite("finally")?
        } else {
            Vec::new()
        };

        if handlers.is_empty() && finalbody.is_empty() {
            return Err(CompileError::syntax(
                "expected 'except' or 'finally' block".to_string(),
                try_span,
            ));
        }
        Ok(Stmt::Try(TryStmt {
            body,
            handlers,
            orelse,
            finalbody,
        }))
    }

    fn with_stmt(&mut self) -> Result<Stmt, CompileError> {
        self.expect_keyword(KeywordId::With, "expected 'with'")?;
        let mut items = Vec::new();
        loop {
            let context = self.expression()?;
            let target = if self.match_keyword(KeywordId::As) {
                let target = self.bit_or()?;
                self.validate_target(&target)?;
                Some(target)
            } else {
                None
            };
            items.push(WithItem { context, target });
            if !self.match_punct(PunctuationId::Comma) {
                break;
            }
        }
        let body = self.colon_suite("with statement")?;
        Ok(Stmt::With(WithStmt { items, body }))
    }

    // ========================================================================
    // Simple statements
    // ========================================================================

    fn small_statement(&mut self) -> Result<Spanned<Stmt>, CompileError> {
        let start = self.current_span().start;
        let stmt = match self.peek().keyword_id() {
            Some(KeywordId::Pass) => {
                self.advance();
                Stmt::Pass
            }
            Some(KeywordId::Break) => {
                self.advance();
                Stmt::Break
            }
            Some(KeywordId::Continue) => {
                self.advance();
                Stmt::Continue
            }
            Some(KeywordId::Return) => {
                self.advance();
                let value = if self.is_at_expr_start() {
                    Some(self.expression_list()?)
                } else {
                    None
                };
                Stmt::Return(value)
            }
            Some(KeywordId::Raise) => self.raise_stmt()?,
            Some(KeywordId::Assert) => {
                self.advance();
                let test = self.expression()?;
                let msg = if self.match_punct(PunctuationId::Comma) {
                    Some(self.expression()?)
                } else {
                    None
                };
                Stmt::Assert(AssertStmt { test, msg })
            }
            Some(KeywordId::Import) => self.import_stmt()?,
            Some(KeywordId::From) => self.from_import_stmt()?,
            Some(KeywordId::Global) => {
                self.advance();
                Stmt::Global(self.name_list()?)
            }
            Some(KeywordId::Nonlocal) => {
                self.advance();
                Stmt::Nonlocal(self.name_list()?)
            }
            Some(KeywordId::Del) => {
                self.advance();
                let mut targets = Vec::new();
                loop {
                    let target = self.bit_or()?;
                    self.validate_target(&target)?;
                    targets.push(target);
                    if !self.match_punct(PunctuationId::Comma) || !self.is_at_expr_start() {
                        break;
                    }
                }
                Stmt::Delete(targets)
            }
            _ => self.expr_or_assign()?,
        };
        Ok(Spanned::new(stmt, Span::new(start, self.previous_end())))
    }

    fn raise_stmt(&mut self) -> Result<Stmt, CompileError> {
        self.expect_keyword(KeywordId::Raise, "expected 'raise'")?;
        if !self.is_at_expr_start() {
            return Ok(Stmt::Raise(RaiseStmt { exc: None, cause: None }));
        }
        let exc = self.expression()?;
        let cause = if self.match_keyword(KeywordId::From) {
            Some(self.expression()?)
        } else {
            None
        };
        Ok(Stmt::Raise(RaiseStmt { exc: Some(exc), cause }))
    }

    fn name_list(&mut self) -> Result<Vec<Ident>, CompileError> {
        let mut names = vec![self.expect_ident("expected a name")?];
        while self.match_punct(PunctuationId::Comma) {
            names.push(self.expect_ident("expected a name")?);
        }
        Ok(names)
    }

    fn dotted_name(&mut self) -> Result<Vec<Ident>, CompileError> {
        let mut path = vec![self.expect_ident("expected a module name")?];
        while self.match_punct(PunctuationId::Dot) {
            path.push(self.expect_ident("expected a name after '.'")?);
        }
        Ok(path)
    }

    /// `import a.b [as c], d`
    fn import_stmt(&mut self) -> Result<Stmt, CompileError> {
        self.expect_keyword(KeywordId::Import, "expected 'import'")?;
        let mut aliases = Vec::new();
        loop {
            let path = self.dotted_name()?;
            let alias = if self.match_keyword(KeywordId::As) {
                Some(self.expect_ident("expected a name after 'as'")?)
            } else {
                None
            };
            aliases.push(ImportAlias { path, alias });
            if !self.match_punct(PunctuationId::Comma) {
                break;
            }
        }
        Ok(Stmt::Import(aliases))
    }

    /// `from [.]*module import (*|names|(names))`
    fn from_import_stmt(&mut self) -> Result<Stmt, CompileError> {
        self.expect_keyword(KeywordId::From, "expected 'from'")?;
        let mut level = 0;
        loop {
            if self.match_punct(PunctuationId::Dot) {
                level += 1;
            } else if self.match_token(&TokenKind::Ellipsis) {
                level += 3;
            } else {
                break;
            }
        }
        let module = if self.check_keyword(KeywordId::Import) && level > 0 {
            Vec::new()
        } else {
            self.dotted_name()?
        };
        self.expect_keyword(KeywordId::Import, "expected 'import'")?;

        if self.match_op(OperatorId::Star) {
            return Ok(Stmt::ImportFrom(ImportFromStmt {
                level,
                module,
                names: ImportNames::Star,
            }));
        }

        let parenthesized = self.match_punct(PunctuationId::LParen);
        let mut names = Vec::new();
        loop {
            if parenthesized && self.check_punct(PunctuationId::RParen) {
                break;
            }
            let name = self.expect_ident("expected a name to import")?;
            let alias = if self.match_keyword(KeywordId::As) {
                Some(self.expect_ident("expected a name after 'as'")?)
            } else {
                None
            };
            names.push((name, alias));
            if !self.match_punct(PunctuationId::Comma) {
                break;
            }
        }
        if parenthesized {
            self.expect_punct(PunctuationId::RParen, "expected ')'")?;
        }
        Ok(Stmt::ImportFrom(ImportFromStmt {
            level,
            module,
            names: ImportNames::List(names),
        }))
    }

    /// Expression statement, (chained) assignment, augmented or annotated assignment.
    fn expr_or_assign(&mut self) -> Result<Stmt, CompileError> {
        let first = self.star_expression_list()?;

        // Annotated assignment: `x: int = 1` / `x: int`
        if self.check_punct(PunctuationId::Colon) {
            if !matches!(first.node, Expr::Name(_) | Expr::Attribute(..) | Expr::Subscript(..)) {
                return Err(CompileError::syntax(
                    "illegal target for annotation".to_string(),
                    first.span,
                ));
            }
            self.advance();
            self.expression()?;
            if self.match_op(OperatorId::Eq) {
                let value = self.star_expression_list()?;
                return Ok(Stmt::Assign(AssignStmt {
                    targets: vec![first],
                    value,
                }));
            }
            return Ok(Stmt::Pass);
        }

        if let Some(op) = self
            .peek()
            .operator_id()
            .and_then(operators::augmented_base)
            .and_then(BinaryOp::from_operator)
        {
            if !matches!(first.node, Expr::Name(_) | Expr::Attribute(..) | Expr::Subscript(..)) {
                return Err(CompileError::syntax(
                    "illegal expression for augmented assignment".to_string(),
                    first.span,
                ));
            }
            self.advance();
            let value = self.expression_list()?;
            return Ok(Stmt::AugAssign(AugAssignStmt {
                target: first,
                op,
                value,
            }));
        }

        if !self.check_op(OperatorId::Eq) {
            return Ok(Stmt::Expr(first));
        }

        let mut targets = vec![first];
        while self.match_op(OperatorId::Eq) {
            targets.push(self.star_expression_list()?);
        }
        let Some(value) = targets.pop() else {
            return Err(self.error_here("invalid syntax"));
        };
        for target in &targets {
            self.validate_target(target)?;
        }
        Ok(Stmt::Assign(AssignStmt { targets, value }))
    }

    /// Reject expressions that cannot be bound to.
    fn validate_target(&self, target: &Spanned<Expr>) -> Result<(), CompileError> {
        match &target.node {
            Expr::Name(_) | Expr::Attribute(..) | Expr::Subscript(..) => Ok(()),
            Expr::Tuple(items) | Expr::List(items) => {
                let starred = items.iter().filter(|i| matches!(i.node, Expr::Starred(_))).count();
                if starred > 1 {
                    return Err(CompileError::syntax(
                        "multiple starred expressions in assignment".to_string(),
                        target.span,
                    ));
                }
                items.iter().try_for_each(|item| self.validate_target(item))
            }
            Expr::Starred(inner) => self.validate_target(inner),
            other => Err(CompileError::syntax(
                format!("cannot assign to {}", describe_expr(other)),
                target.span,
            )),
        }
    }
}

/// Name an expression form the way assignment errors do.
fn describe_expr(expr: &Expr) -> &'static str {
    match expr {
        Expr::Int(_) | Expr::Float(_) | Expr::Str(_) | Expr::Bool(_) | Expr::None | Expr::Ellipsis => "literal",
        Expr::FString(_) => "f-string expression",
        Expr::Call(..) => "function call",
        Expr::Binary(..) | Expr::Unary(..) => "expression",
        Expr::Compare(..) => "comparison",
        Expr::BoolOp(..) => "expression",
        Expr::Lambda(_) => "lambda",
        Expr::Conditional { .. } => "conditional expression",
        Expr::Dict(_) => "dict literal",
        Expr::Set(_) => "set display",
        Expr::Comprehension(_) => "comprehension",
        _ => "expression",
    }
}
