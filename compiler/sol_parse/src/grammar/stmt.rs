//! Statement grammar, including the declaration/expression
//! disambiguation via index-accessed paths.
//!
//! The hard case: `x[7 * 20 + 3] a;` declares `a` with an array type while
//! `x[7 * 20 + 3] = 9;` assigns through an index expression. The run up to
//! the decision point is parsed once into an [`Iap`] and then converted to
//! either a type or an expression tree.

use sol_diagnostic::DiagCode;
use sol_ir::{Expr, ExprId, ExprKind, Name, Span, Stmt, StmtId, StmtKind, TokenKind, Ty, TyId};

use crate::sema::scope_flags;
use crate::{ParseError, Parser};

use super::VarDeclOptions;

/// Classification of the statement head.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
enum LookAhead {
    VariableDeclaration,
    Expression,
    IndexAccessStructure,
}

/// An index-accessed path: `Identifier ("." Identifier)* ("[" Expr "]")*`
/// or `ElementaryType ("[" Expr "]")*`, parsed before we know whether it
/// is a type or an expression.
#[derive(Default)]
struct Iap {
    path: Vec<(Name, Span)>,
    elem_type: Option<TyId>,
    indices: Vec<(ExprId, Span)>,
}

impl Iap {
    fn is_empty(&self) -> bool {
        self.path.is_empty() && self.elem_type.is_none() && self.indices.is_empty()
    }
}

impl<'a> Parser<'a> {
    /// `{ stmt* }` in a fresh anonymous scope.
    pub(crate) fn parse_block(&mut self) -> Result<StmtId, ParseError> {
        self.sema.push_scope(0);
        let result = self.block_inner();
        self.sema.pop_scope();
        result
    }

    fn block_inner(&mut self) -> Result<StmtId, ParseError> {
        let start = self.current_span();
        self.expect_and_consume(TokenKind::LBrace)?;
        let mut stmts = Vec::new();
        while self.tok.is_not(TokenKind::RBrace) {
            if self.tok.is(TokenKind::Eof) {
                return Err(self.expected(TokenKind::RBrace));
            }
            // A stray `;` (e.g. `return (1);;`) is swallowed with a
            // diagnostic and parsing continues.
            if self.tok.is(TokenKind::Semi) {
                self.record(ParseError::new(
                    DiagCode::ExtraneousTokenBeforeSemi,
                    "extraneous `;`",
                    self.current_span(),
                ));
                self.advance();
                continue;
            }
            match self.parse_statement() {
                Ok(stmt) => stmts.push(stmt),
                Err(err) => {
                    self.record(err);
                    self.recover_to_statement_boundary();
                }
            }
        }
        let end = self.current_span();
        self.advance(); // '}'
        Ok(self
            .ast
            .alloc_stmt(Stmt::new(StmtKind::Block(stmts), start.merge(end))))
    }

    /// Skip to just past the next `;`, or to a `}`/EOF, after a failed
    /// statement parse.
    fn recover_to_statement_boundary(&mut self) {
        loop {
            match self.tok.kind {
                TokenKind::Semi => {
                    self.advance();
                    return;
                }
                TokenKind::RBrace | TokenKind::Eof => return,
                _ => {
                    self.advance();
                }
            }
        }
    }

    pub(crate) fn parse_statement(&mut self) -> Result<StmtId, ParseError> {
        let start = self.current_span();
        let stmt = match self.tok.kind {
            TokenKind::If => return self.parse_if_statement(),
            TokenKind::While => return self.parse_while_statement(),
            TokenKind::Do => return self.parse_do_while_statement(),
            TokenKind::For => return self.parse_for_statement(),
            TokenKind::LBrace => return self.parse_block(),
            TokenKind::Continue => {
                self.advance();
                self.ast.alloc_stmt(Stmt::new(StmtKind::Continue, start))
            }
            TokenKind::Break => {
                self.advance();
                self.ast.alloc_stmt(Stmt::new(StmtKind::Break, start))
            }
            TokenKind::Return => {
                self.advance();
                let value = if self.tok.is_not(TokenKind::Semi) {
                    Some(self.parse_expression(None)?)
                } else {
                    None
                };
                self.sema
                    .create_return_stmt(&mut self.ast, &mut self.types, value, start)?
            }
            TokenKind::Assembly => {
                // Unsupported; skip the keyword and any balanced block so
                // parsing resumes cleanly afterwards.
                let err = self.unimplemented("assembly");
                self.record(err);
                self.advance();
                if matches!(self.tok.kind, TokenKind::Str(_)) {
                    self.advance(); // dialect string, e.g. "evmasm"
                }
                if self.tok.is(TokenKind::LBrace) {
                    let mut sink = Vec::new();
                    self.advance();
                    self.consume_and_store_until(TokenKind::RBrace, &mut sink);
                }
                return Ok(self
                    .ast
                    .alloc_stmt(Stmt::new(StmtKind::Block(Vec::new()), start)));
            }
            TokenKind::Emit => self.parse_emit_statement()?,
            _ => self.parse_simple_statement()?,
        };
        self.expect_and_consume_semi()?;
        Ok(stmt)
    }

    fn parse_if_statement(&mut self) -> Result<StmtId, ParseError> {
        let start = self.current_span();
        self.advance(); // 'if'
        self.expect_and_consume(TokenKind::LParen)?;
        let cond = self.parse_expression(None)?;
        let cond = self.sema.rvalue(&mut self.ast, cond);
        self.expect_and_consume(TokenKind::RParen)?;
        let then_stmt = self.parse_statement()?;
        let else_stmt = if self.try_consume(TokenKind::Else) {
            Some(self.parse_statement()?)
        } else {
            None
        };
        Ok(self.ast.alloc_stmt(Stmt::new(
            StmtKind::If {
                cond,
                then_stmt,
                else_stmt,
            },
            start,
        )))
    }

    fn parse_while_statement(&mut self) -> Result<StmtId, ParseError> {
        let start = self.current_span();
        self.advance(); // 'while'
        self.expect_and_consume(TokenKind::LParen)?;
        let cond = self.parse_expression(None)?;
        let cond = self.sema.rvalue(&mut self.ast, cond);
        self.expect_and_consume(TokenKind::RParen)?;
        let body = self.in_loop_scope(Self::parse_statement)?;
        Ok(self.ast.alloc_stmt(Stmt::new(
            StmtKind::While {
                cond,
                body,
                is_do_while: false,
            },
            start,
        )))
    }

    fn parse_do_while_statement(&mut self) -> Result<StmtId, ParseError> {
        let start = self.current_span();
        self.advance(); // 'do'
        let body = self.in_loop_scope(Self::parse_statement)?;
        self.expect_and_consume(TokenKind::While)?;
        self.expect_and_consume(TokenKind::LParen)?;
        let cond = self.parse_expression(None)?;
        let cond = self.sema.rvalue(&mut self.ast, cond);
        self.expect_and_consume(TokenKind::RParen)?;
        self.expect_and_consume_semi()?;
        Ok(self.ast.alloc_stmt(Stmt::new(
            StmtKind::While {
                cond,
                body,
                is_do_while: true,
            },
            start,
        )))
    }

    fn parse_for_statement(&mut self) -> Result<StmtId, ParseError> {
        let start = self.current_span();
        self.advance(); // 'for'
        self.expect_and_consume(TokenKind::LParen)?;

        let init = if self.tok.is_not(TokenKind::Semi) {
            Some(self.parse_simple_statement()?)
        } else {
            None
        };
        self.expect_and_consume_semi()?;

        let cond = if self.tok.is_not(TokenKind::Semi) {
            let cond = self.parse_expression(None)?;
            Some(self.sema.rvalue(&mut self.ast, cond))
        } else {
            None
        };
        self.expect_and_consume_semi()?;

        let step = if self.tok.is_not(TokenKind::RParen) {
            Some(self.parse_expression(None)?)
        } else {
            None
        };
        self.expect_and_consume(TokenKind::RParen)?;

        let body = self.in_loop_scope(Self::parse_statement)?;
        Ok(self.ast.alloc_stmt(Stmt::new(
            StmtKind::For {
                init,
                cond,
                step,
                body,
            },
            start,
        )))
    }

    fn in_loop_scope<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<T, ParseError>,
    ) -> Result<T, ParseError> {
        self.sema
            .push_scope(scope_flags::BREAK | scope_flags::CONTINUE);
        let result = f(self);
        self.sema.pop_scope();
        result
    }

    /// `emit EventName(args)` — the event reference is an identifier path.
    fn parse_emit_statement(&mut self) -> Result<StmtId, ParseError> {
        let start = self.current_span();
        self.advance(); // 'emit'

        let mut iap = Iap::default();
        loop {
            if !self.tok.is_any_identifier() {
                return Err(ParseError::new(
                    DiagCode::ExpectedEvent,
                    "expected an event name after `emit`",
                    self.current_span(),
                ));
            }
            let (name, span) = self.expect_identifier()?;
            iap.path.push((name, span));
            if !self.try_consume(TokenKind::Period) {
                break;
            }
        }
        let event_ref = self
            .expression_from_index_access_structure(iap)?
            .expect("emit path is never empty");

        self.expect_and_consume(TokenKind::LParen)?;
        let (args, _names) = self.parse_function_call_arguments()?;
        self.expect_and_consume(TokenKind::RParen)?;
        let call =
            self.sema
                .create_call_expr(&mut self.ast, &mut self.types, event_ref, args, start)?;
        Ok(self
            .ast
            .alloc_stmt(Stmt::new(StmtKind::Emit { call }, start)))
    }

    // --- Simple statements ---

    pub(crate) fn parse_simple_statement(&mut self) -> Result<StmtId, ParseError> {
        let start = self.current_span();
        let is_paren_expr = self.try_consume(TokenKind::LParen);

        let (look_ahead, iap) = self.try_parse_index_accessed_path()?;
        match look_ahead {
            LookAhead::VariableDeclaration => {
                let lookahead_ty = self.type_name_from_index_access_structure(iap)?;
                self.parse_variable_declaration_statement(lookahead_ty, start)
            }
            LookAhead::Expression => {
                let partial = self.expression_from_index_access_structure(iap)?;
                let expr = self.parse_expression(partial)?;
                let expr = if is_paren_expr {
                    self.expect_and_consume(TokenKind::RParen)?;
                    let span = self.ast.expr(expr).span;
                    let ty = self.ast.expr(expr).ty;
                    let mut paren = Expr::new(ExprKind::Paren(expr), span);
                    paren.ty = ty;
                    let paren = self.ast.alloc_expr(paren);
                    self.parse_expression(Some(paren))?
                } else {
                    expr
                };
                Ok(self
                    .ast
                    .alloc_stmt(Stmt::new(StmtKind::Expr(expr), start)))
            }
            LookAhead::IndexAccessStructure => unreachable!("resolved by try_parse"),
        }
    }

    fn parse_variable_declaration_statement(
        &mut self,
        lookahead_ty: Option<TyId>,
        start: Span,
    ) -> Result<StmtId, ParseError> {
        if lookahead_ty.is_none() && self.tok.is(TokenKind::Var) {
            // The var keyword was deprecated for security reasons.
            return Err(self.unimplemented("var"));
        }
        let options = VarDeclOptions {
            allow_location_specifier: true,
            ..VarDeclOptions::default()
        };
        let var = self.parse_variable_declaration(options, lookahead_ty)?;

        let mut init = None;
        if self.try_consume(TokenKind::Eq) {
            let value = self.parse_expression(None)?;
            let value = self.sema.rvalue(&mut self.ast, value);
            let target = self.ast.var(var).ty;
            init = Some(
                self.sema
                    .coerce(&mut self.ast, &mut self.types, value, target)?,
            );
        }

        Ok(self.ast.alloc_stmt(Stmt::new(
            StmtKind::Decl {
                vars: vec![var],
                init,
            },
            start,
        )))
    }

    // --- Index-accessed-path disambiguation ---

    fn try_parse_index_accessed_path(&mut self) -> Result<(LookAhead, Iap), ParseError> {
        match self.peek_statement_type() {
            LookAhead::VariableDeclaration => Ok((LookAhead::VariableDeclaration, Iap::default())),
            LookAhead::Expression => Ok((LookAhead::Expression, Iap::default())),
            LookAhead::IndexAccessStructure => {
                let iap = self.parse_index_accessed_path()?;
                // What follows decides: a declarator name or data location
                // means the path was a type.
                let decides_decl = matches!(
                    self.tok.kind,
                    TokenKind::Ident(_)
                        | TokenKind::Memory
                        | TokenKind::Storage
                        | TokenKind::CallData
                );
                if decides_decl {
                    Ok((LookAhead::VariableDeclaration, iap))
                } else {
                    Ok((LookAhead::Expression, iap))
                }
            }
        }
    }

    /// Classify the statement head from the first two tokens.
    fn peek_statement_type(&self) -> LookAhead {
        if matches!(
            self.tok.kind,
            TokenKind::Mapping | TokenKind::Function | TokenKind::Var
        ) {
            return LookAhead::VariableDeclaration;
        }

        let might_be_type_name = self.tok.is_elementary_type_name() || self.tok.is_any_identifier();
        if might_be_type_name {
            let next = self.next_token();
            if self.tok.is_elementary_type_name()
                && matches!(
                    next.kind,
                    TokenKind::Pure | TokenKind::View | TokenKind::Payable
                )
            {
                return LookAhead::VariableDeclaration;
            }
            if matches!(
                next.kind,
                TokenKind::Ident(_) | TokenKind::Memory | TokenKind::Storage | TokenKind::CallData
            ) {
                return LookAhead::VariableDeclaration;
            }
            if matches!(next.kind, TokenKind::LBracket | TokenKind::Period) {
                return LookAhead::IndexAccessStructure;
            }
        }
        LookAhead::Expression
    }

    /// `Identifier ("." Identifier)* ("[" Expr "]")*` or
    /// `ElementaryType ("[" Expr "]")*` (type suffixes are folded into the
    /// elementary type by `parse_type_name`).
    fn parse_index_accessed_path(&mut self) -> Result<Iap, ParseError> {
        let mut iap = Iap::default();
        if self.tok.is_any_identifier() {
            loop {
                let (name, span) = self.expect_identifier()?;
                iap.path.push((name, span));
                if !self.try_consume(TokenKind::Period) {
                    break;
                }
            }
        } else {
            iap.elem_type = Some(self.parse_type_name(false)?);
        }

        while self.tok.is(TokenKind::LBracket) {
            let span = self.current_span();
            self.advance();
            let index = self.parse_expression(None)?;
            iap.indices.push((index, span));
            self.expect_and_consume(TokenKind::RBracket)?;
        }
        Ok(iap)
    }

    /// Synthesize a type from a path classified as a declaration head.
    fn type_name_from_index_access_structure(
        &mut self,
        iap: Iap,
    ) -> Result<Option<TyId>, ParseError> {
        if iap.is_empty() {
            return Ok(None);
        }

        let mut ty = match iap.elem_type {
            Some(ty) => ty,
            None => {
                // A dotted path names a user-defined type.
                let joined = iap
                    .path
                    .iter()
                    .map(|(name, _)| self.interner.lookup(*name))
                    .collect::<Vec<_>>()
                    .join(".");
                let name = self.interner.intern(&joined);
                self.types.intern(Ty::UserDefined(name))
            }
        };

        for (index, span) in iap.indices {
            let len = match self.ast.expr(index).kind {
                ExprKind::NumberLit(value) => u64::try_from(value).map_err(|_| {
                    ParseError::new(
                        DiagCode::NumberLiteralOverflow,
                        "array length does not fit",
                        span,
                    )
                })?,
                _ => {
                    return Err(ParseError::new(
                        DiagCode::ExpectedToken,
                        "array length must be a number literal",
                        span,
                    ));
                }
            };
            let loc = self.parse_data_location();
            ty = self.types.intern(Ty::Array {
                elem: ty,
                len: Some(len),
                loc,
            });
        }
        Ok(Some(ty))
    }

    /// Synthesize an expression tree from a path classified as an
    /// expression head.
    fn expression_from_index_access_structure(
        &mut self,
        iap: Iap,
    ) -> Result<Option<ExprId>, ParseError> {
        if iap.is_empty() {
            return Ok(None);
        }
        let Some(&(first, first_span)) = iap.path.first() else {
            return Err(ParseError::new(
                DiagCode::ExpectedToken,
                "expected an expression",
                self.current_span(),
            ));
        };

        let mut expr = self.sema.create_identifier(
            &mut self.ast,
            &mut self.types,
            self.interner,
            first,
            first_span,
        )?;
        for &(member, span) in &iap.path[1..] {
            expr = self
                .sema
                .create_member_expr(&mut self.ast, expr, member, span)?;
        }
        for (index, span) in iap.indices {
            expr = self.sema.create_index_access(
                &mut self.ast,
                &mut self.types,
                expr,
                Some(index),
                span,
            )?;
        }
        Ok(Some(expr))
    }
}
