//! Recursive-descent parser for the contract language.
//!
//! The parser reads a [`TokenStream`] with one token of lookahead and
//! produces the arena AST from `sol_ir`, routing identifier resolution and
//! typed expression construction through the [`Sema`] actions facade.
//!
//! Function bodies are not parsed in place: when a definition reaches `{`,
//! the balanced token run is buffered as a [`LexedMethod`] and replayed
//! after every contract-level declaration is registered, so bodies can
//! reference members declared textually later.

mod error;
mod grammar;
mod literal;
mod sema;

#[cfg(test)]
mod tests;

pub use error::ParseError;
pub use sema::{scope_flags, Sema};

use sol_diagnostic::DiagCode;
use sol_ir::{
    Ast, FunctionId, Name, SourceUnit, Span, StringInterner, Token, TokenKind, TokenList,
    TypeTable,
};
use sol_lexer::TokenStream;

/// A buffered function body: the tokens from `{` to its matching `}`,
/// owned until the body is re-parsed and attached.
struct LexedMethod {
    func: FunctionId,
    toks: Vec<Token>,
}

/// Everything parsing produces: the source unit, its node arenas, the
/// interned types, and the accumulated errors.
pub struct ParseOutput {
    pub unit: SourceUnit,
    pub ast: Ast,
    pub types: TypeTable,
    pub errors: Vec<ParseError>,
}

impl ParseOutput {
    /// True if any error-tier diagnostic was produced.
    pub fn has_errors(&self) -> bool {
        self.errors
            .iter()
            .any(|e| e.code.severity() >= sol_diagnostic::Severity::Error)
    }
}

/// Parse a token list into a source unit.
pub fn parse(tokens: TokenList, interner: &StringInterner) -> ParseOutput {
    let parser = Parser::new(tokens, interner);
    parser.parse_source_unit()
}

/// Parser state.
pub struct Parser<'a> {
    stream: TokenStream,
    /// Cached current token.
    pub(crate) tok: Token,
    pub(crate) interner: &'a StringInterner,
    pub(crate) ast: Ast,
    pub(crate) types: TypeTable,
    pub(crate) sema: Sema,
    pub(crate) errors: Vec<ParseError>,
    late_parsed: Vec<LexedMethod>,
}

impl<'a> Parser<'a> {
    pub fn new(tokens: TokenList, interner: &'a StringInterner) -> Self {
        let mut stream = TokenStream::new(tokens);
        let tok = stream.cached_lex();
        Parser {
            stream,
            tok,
            interner,
            ast: Ast::new(),
            types: TypeTable::new(),
            sema: Sema::new(),
            errors: Vec::new(),
            late_parsed: Vec::new(),
        }
    }

    // --- Token plumbing ---

    #[inline]
    pub(crate) fn current_span(&self) -> Span {
        self.tok.span
    }

    /// One-token lookahead past the current token.
    #[inline]
    pub(crate) fn next_token(&self) -> Token {
        self.stream.peek()
    }

    /// Advance to the next token, returning the one consumed.
    #[inline]
    pub(crate) fn advance(&mut self) -> Token {
        let consumed = self.tok;
        self.tok = self.stream.cached_lex();
        consumed
    }

    /// Consume the current token if it matches.
    pub(crate) fn try_consume(&mut self, kind: TokenKind) -> bool {
        if self.tok.is(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Expect and consume a specific token, or fail with `err_expected`.
    pub(crate) fn expect_and_consume(&mut self, kind: TokenKind) -> Result<Token, ParseError> {
        if self.tok.is(kind) {
            Ok(self.advance())
        } else {
            Err(self.expected(kind))
        }
    }

    #[cold]
    pub(crate) fn expected(&self, kind: TokenKind) -> ParseError {
        ParseError::new(
            DiagCode::ExpectedToken,
            format!(
                "expected `{}`, found `{}`",
                kind.display_name(),
                self.tok.kind.display_name()
            ),
            self.current_span(),
        )
    }

    #[cold]
    pub(crate) fn expected_ident(&self) -> ParseError {
        ParseError::new(
            DiagCode::ExpectedToken,
            format!(
                "expected identifier, found `{}`",
                self.tok.kind.display_name()
            ),
            self.current_span(),
        )
    }

    #[cold]
    pub(crate) fn unimplemented(&self, what: &str) -> ParseError {
        ParseError::new(
            DiagCode::UnimplementedToken,
            format!("`{what}` is not supported"),
            self.current_span(),
        )
    }

    /// Expect a statement-terminating `;`.
    ///
    /// Recovers from a stray `)` or `]` sitting directly before the
    /// semicolon by reporting `err_extraneous_token_before_semi` and
    /// consuming both.
    pub(crate) fn expect_and_consume_semi(&mut self) -> Result<(), ParseError> {
        if self.try_consume(TokenKind::Semi) {
            return Ok(());
        }
        if matches!(self.tok.kind, TokenKind::RParen | TokenKind::RBracket)
            && self.next_token().is(TokenKind::Semi)
        {
            self.record(ParseError::new(
                DiagCode::ExtraneousTokenBeforeSemi,
                format!("extraneous `{}` before `;`", self.tok.kind.display_name()),
                self.current_span(),
            ));
            self.advance(); // the ')' or ']'
            self.advance(); // the ';'
            return Ok(());
        }
        Err(ParseError::new(
            DiagCode::ExpectedAfter,
            format!(
                "expected `;` after statement, found `{}`",
                self.tok.kind.display_name()
            ),
            self.current_span(),
        ))
    }

    /// Record a diagnostic without failing the current production.
    pub(crate) fn record(&mut self, error: ParseError) {
        self.errors.push(error);
    }

    /// Expect and consume an identifier, returning its name.
    pub(crate) fn expect_identifier(&mut self) -> Result<(Name, Span), ParseError> {
        match self.tok.identifier() {
            Some(name) => {
                let span = self.current_span();
                self.advance();
                Ok((name, span))
            }
            None => Err(self.expected_ident()),
        }
    }

    // --- Deferred bodies ---

    /// Buffer tokens up to and including the matching `close`, descending
    /// into nested `()`, `[]` and `{}` runs. Returns false on EOF.
    pub(crate) fn consume_and_store_until(
        &mut self,
        close: TokenKind,
        toks: &mut Vec<Token>,
    ) -> bool {
        loop {
            if self.tok.is(close) {
                toks.push(self.tok);
                self.advance();
                return true;
            }
            match self.tok.kind {
                TokenKind::Eof => return false,
                TokenKind::LParen => {
                    toks.push(self.tok);
                    self.advance();
                    self.consume_and_store_until(TokenKind::RParen, toks);
                }
                TokenKind::LBracket => {
                    toks.push(self.tok);
                    self.advance();
                    self.consume_and_store_until(TokenKind::RBracket, toks);
                }
                TokenKind::LBrace => {
                    toks.push(self.tok);
                    self.advance();
                    self.consume_and_store_until(TokenKind::RBrace, toks);
                }
                _ => {
                    toks.push(self.tok);
                    self.advance();
                }
            }
        }
    }

    /// Queue a buffered body for replay after the contract member loop.
    pub(crate) fn queue_lexed_method(&mut self, func: FunctionId, toks: Vec<Token>) {
        self.late_parsed.push(LexedMethod { func, toks });
    }

    /// Drop bodies queued by a contract that failed to parse; they must
    /// not replay inside the next contract's scope.
    pub(crate) fn discard_lexed_methods(&mut self) {
        self.late_parsed.clear();
    }

    /// Replay every queued body. Called at the end of a contract
    /// definition, while the contract scope is still live.
    pub(crate) fn parse_lexed_method_defs(&mut self) {
        let queued = std::mem::take(&mut self.late_parsed);
        for lm in queued {
            self.parse_lexed_method_def(lm);
        }
    }

    fn parse_lexed_method_def(&mut self, mut lm: LexedMethod) {
        // Terminate the buffer, then stash the current token behind it so
        // it is not lost when the buffer drains.
        let end = lm.toks.last().map(|t| t.span.end).unwrap_or(0);
        lm.toks.push(Token::new(TokenKind::Eof, Span::point(end)));
        lm.toks.push(self.tok);
        self.stream.enter_token_stream(lm.toks);
        // Load the first buffered token.
        self.advance();

        self.sema.push_scope(0);
        let (param_ids, return_tys): (Vec<_>, Vec<_>) = {
            let func = self.ast.function(lm.func);
            (
                func.params.params.clone(),
                func.returns
                    .params
                    .iter()
                    .map(|&p| self.ast.var(p).ty)
                    .collect(),
            )
        };
        for param in param_ids {
            let name = self.ast.var(param).name;
            self.sema.add_decl(name, sol_ir::DeclRef::Var(param));
        }
        self.sema.set_fn_return_types(return_tys);

        self.sema.push_scope(scope_flags::FUNCTION);
        match self.parse_block() {
            Ok(body) => {
                self.ast.function_mut(lm.func).body = Some(body);
            }
            Err(err) => self.record(err),
        }
        self.sema.pop_scope();
        self.sema.pop_scope();

        // Drain anything a failed parse left behind, then step over the
        // buffer's EOF back onto the stashed token.
        while self.tok.is_not(TokenKind::Eof) {
            self.advance();
        }
        self.advance();
        self.sema.erase_fn_return_types();
    }

    // --- Top level ---

    /// Consume tokens to EOF, collecting top-level declarations.
    pub fn parse_source_unit(mut self) -> ParseOutput {
        self.sema.push_scope(0);
        let mut unit = SourceUnit::default();

        while self.tok.is_not(TokenKind::Eof) {
            match self.tok.kind {
                TokenKind::Pragma => match self.parse_pragma_directive() {
                    Ok(pragma) => unit.items.push(sol_ir::SourceItem::Pragma(pragma)),
                    Err(err) => self.record(err),
                },
                TokenKind::Import => {
                    // Imports are accepted and ignored.
                    self.advance();
                }
                TokenKind::Contract | TokenKind::Interface | TokenKind::Library => {
                    match self.parse_contract_definition() {
                        Ok(contract) => unit.items.push(sol_ir::SourceItem::Contract(contract)),
                        Err(err) => self.record(err),
                    }
                }
                _ => {
                    self.advance();
                }
            }
        }

        self.sema.pop_scope();
        ParseOutput {
            unit,
            ast: self.ast,
            types: self.types,
            errors: self.errors,
        }
    }
}
