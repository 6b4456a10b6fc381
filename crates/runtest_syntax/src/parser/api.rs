/// Parse a token stream into an AST [`Program`].
///
/// This is the main public entrypoint for parsing.
///
/// ## Errors
/// Returns `Err(Vec<CompileError>)` if parsing fails.
#[tracing::instrument(skip_all, fields(token_count = tokens.len()))]
pub fn parse(tokens: &[Token]) -> Result<Program, Vec<CompileError>> {
    Parser::new(tokens).parse()
}

/// Lex and parse a source text in one step.
///
/// ## Errors
/// Returns the lexer's errors if tokenization fails, otherwise the parser's.
pub fn parse_source(source: &str) -> Result<Program, Vec<CompileError>> {
    let tokens = lexer::lex(source)?;
    parse(&tokens)
}

/// Parse the expression of an f-string replacement field.
///
/// `offset` is the byte position of `source` inside the enclosing file; spans (including error
/// spans) are shifted by it.
fn parse_embedded_expression(source: &str, offset: usize) -> Result<Spanned<Expr>, CompileError> {
    let shift = |e: CompileError| CompileError {
        span: e.span.shifted(offset),
        ..e
    };
    let trimmed = source.trim_start();
    let offset = offset + (source.len() - trimmed.len());
    if trimmed.trim().is_empty() {
        return Err(CompileError::syntax(
            "f-string: empty expression not allowed".to_string(),
            Span::new(offset, offset),
        ));
    }
    let tokens = lexer::lex(trimmed.trim_end()).map_err(|errs| shift(first_error(errs, 0)))?;
    let mut parser = Parser::new(&tokens);
    let expr = parser.expression_list().map_err(shift)?;
    parser.skip_newlines();
    if !parser.is_at_end() {
        let span = parser.current_span();
        return Err(shift(CompileError::syntax("f-string: invalid syntax".to_string(), span)));
    }
    Ok(shift_expr(expr, offset))
}

/// Shift the outer span of an embedded expression into file coordinates.
///
/// Inner spans stay relative to the field.
fn shift_expr(expr: Spanned<Expr>, offset: usize) -> Spanned<Expr> {
    Spanned::new(expr.node, expr.span.shifted(offset))
}
