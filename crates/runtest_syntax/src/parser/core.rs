/// Parser core types and entrypoint.
///
/// This chunk defines the [`Parser`] type and its top-level `parse()` entrypoint.
///
/// ## Notes
/// - This file is `include!`'d into `crate::parser`.

/// Parser state.
///
/// ## Notes
/// - The parser is single-pass and recovers from errors by synchronizing at line boundaries,
///   so one pass can report several problems.
pub struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    errors: Vec<CompileError>,
}

impl<'a> Parser<'a> {
    /// Create a new parser for a token stream produced by [`crate::lexer::lex`].
    pub fn new(tokens: &'a [Token]) -> Self {
        Self {
            tokens,
            pos: 0,
            errors: Vec::new(),
        }
    }

    /// Parse the entire token stream into a [`Program`].
    ///
    /// ## Errors
    /// Returns every [`CompileError`] collected while parsing.
    pub fn parse(mut self) -> Result<Program, Vec<CompileError>> {
        let mut body = Vec::new();

        self.skip_newlines();
        while !self.is_at_end() {
            match self.statement_line() {
                Ok(stmts) => body.extend(stmts),
                Err(e) => {
                    self.errors.push(e);
                    self.synchronize();
                }
            }
            self.skip_newlines();
        }

        if self.errors.is_empty() {
            let doc = docstring_of(&body);
            Ok(Program { body, doc })
        } else {
            Err(self.errors)
        }
    }
}
