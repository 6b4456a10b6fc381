/// Definition parsing: decorators, `def`, `class`, and parameter lists.
///
/// ## Notes
/// - Annotations are parsed and discarded; the runtime is dynamically typed.
/// - A definition's docstring is lifted from the first statement of its body.
impl<'a> Parser<'a> {
    /// `('@' expression NEWLINE)+ (def | class)`
    fn decorated(&mut self) -> Result<Stmt, CompileError> {
        let mut decorators = Vec::new();
        while self.match_punct(PunctuationId::At) {
            decorators.push(self.expression()?);
            if !self.match_token(&TokenKind::Newline) {
                return Err(self.error_here("expected newline after decorator"));
            }
            self.skip_newlines();
        }
        if self.check_keyword(KeywordId::Def) {
            Ok(Stmt::FunctionDef(Rc::new(self.function_def(decorators)?)))
        } else if self.check_keyword(KeywordId::Class) {
            Ok(Stmt::ClassDef(Rc::new(self.class_def(decorators)?)))
        } else {
            Err(self.error_here("expected 'def' or 'class' after decorator"))
        }
    }

    /// `def name(params) [-> annotation]: suite`
    fn function_def(&mut self, decorators: Vec<Spanned<Expr>>) -> Result<FunctionDef, CompileError> {
        self.expect_keyword(KeywordId::Def, "expected 'def'")?;
        let name = self.expect_ident("expected function name after 'def'")?;
        self.expect_punct(PunctuationId::LParen, "expected '(' after function name")?;
        let params = self.parameters(false)?;
        self.expect_punct(PunctuationId::RParen, "expected ')' after parameters")?;
        if self.match_punct(PunctuationId::Arrow) {
            self.expression()?;
        }
        let body = self.colon_suite("function signature")?;
        let doc = docstring_of(&body);
        Ok(FunctionDef {
            name,
            params,
            body,
            decorators,
            doc,
        })
    }

    /// `class Name[(bases)]: suite`
    fn class_def(&mut self, decorators: Vec<Spanned<Expr>>) -> Result<ClassDef, CompileError> {
        self.expect_keyword(KeywordId::Class, "expected 'class'")?;
        let name = self.expect_ident("expected class name after 'class'")?;
        let mut bases = Vec::new();
        if self.match_punct(PunctuationId::LParen) {
            for arg in self.call_arguments()? {
                match arg {
                    CallArg::Positional(base) => bases.push(base),
                    // `metaclass=...` and friends have no effect here.
                    CallArg::Keyword(..) => {}
                    CallArg::Star(expr) | CallArg::DoubleStar(expr) => {
                        return Err(CompileError::syntax(
                            "unpacking in a class base list is not supported".to_string(),
                            expr.span,
                        ));
                    }
                }
            }
        }
        let body = self.colon_suite("class definition")?;
        let doc = docstring_of(&body);
        Ok(ClassDef {
            name,
            bases,
            body,
            decorators,
            doc,
        })
    }

    /// Parse a parameter list up to (not including) `)` or, for lambdas, `:`.
    fn parameters(&mut self, lambda: bool) -> Result<Vec<Param>, CompileError> {
        let mut params: Vec<Param> = Vec::new();
        let mut keyword_only = false;
        let mut seen_default = false;

        loop {
            let at_close = if lambda {
                self.check_punct(PunctuationId::Colon)
            } else {
                self.check_punct(PunctuationId::RParen)
            };
            if at_close {
                break;
            }

            let start = self.current_span();
            if self.match_op(OperatorId::Slash) {
                // positional-only marker
            } else if self.match_op(OperatorId::StarStar) {
                let name = self.expect_ident("expected a name after '**'")?;
                self.parameter_annotation(lambda)?;
                params.push(Param {
                    name,
                    kind: ParamKind::VarKeywords,
                    default: None,
                });
            } else if self.match_op(OperatorId::Star) {
                keyword_only = true;
                if let TokenKind::Ident(_) = self.peek().kind {
                    let name = self.expect_ident("expected a name after '*'")?;
                    self.parameter_annotation(lambda)?;
                    params.push(Param {
                        name,
                        kind: ParamKind::VarArgs,
                        default: None,
                    });
                }
            } else {
                let name = self.expect_ident("expected a parameter name")?;
                self.parameter_annotation(lambda)?;
                let default = if self.match_op(OperatorId::Eq) {
                    Some(self.expression()?)
                } else {
                    None
                };
                if default.is_some() {
                    seen_default = true;
                } else if seen_default && !keyword_only {
                    return Err(CompileError::syntax(
                        "non-default argument follows default argument".to_string(),
                        start,
                    ));
                }
                if params.iter().any(|p| p.name == name) {
                    return Err(CompileError::syntax(
                        format!("duplicate argument '{name}' in function definition"),
                        start,
                    ));
                }
                let kind = if keyword_only {
                    ParamKind::KeywordOnly
                } else {
                    ParamKind::Normal
                };
                params.push(Param { name, kind, default });
            }

            if !self.match_punct(PunctuationId::Comma) {
                break;
            }
        }
        Ok(params)
    }

    fn parameter_annotation(&mut self, lambda: bool) -> Result<(), CompileError> {
        if !lambda && self.match_punct(PunctuationId::Colon) {
            self.expression()?;
        }
        Ok(())
    }
}
