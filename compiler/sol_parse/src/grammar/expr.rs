//! Expression grammar.
//!
//! Precedence climbing over the binary operators, with assignment and the
//! ternary handled above the climb (both right-associative), prefix and
//! postfix unary forms, the `[index]` / `.member` / `(args)` suffix loop,
//! and the elementary-cast lookahead (`uint64(x)`, `address(x)`).

use sol_diagnostic::DiagCode;
use sol_ir::{
    BinaryOp, CastKind, Expr, ExprId, ExprKind, IntKind, Name, StateMutability, TokenKind, Ty,
    UnaryOp,
};

use crate::literal::{hex_unquote, parse_number, string_unquote};
use crate::{ParseError, Parser};

/// Binary-operator precedence, matching the source language: assignment
/// lowest among operators, `**` highest. Zero means "not a binary
/// operator" and stops the climb.
fn bin_op_precedence(kind: TokenKind) -> u8 {
    match kind {
        kind if kind.is_assignment_op() => 2,
        TokenKind::Question => 3,
        TokenKind::PipePipe => 4,
        TokenKind::AmpAmp => 5,
        TokenKind::EqEq | TokenKind::NotEq => 6,
        TokenKind::Lt | TokenKind::Gt | TokenKind::LtEq | TokenKind::GtEq => 7,
        TokenKind::Pipe => 8,
        TokenKind::Caret => 9,
        TokenKind::Amp => 10,
        TokenKind::Shl | TokenKind::Shr => 11,
        TokenKind::Plus | TokenKind::Minus => 12,
        TokenKind::Star | TokenKind::Slash | TokenKind::Percent => 13,
        TokenKind::StarStar => 14,
        _ => 0,
    }
}

fn token_to_bin_op(kind: TokenKind) -> Option<BinaryOp> {
    Some(match kind {
        TokenKind::StarStar => BinaryOp::Exp,
        TokenKind::Star => BinaryOp::Mul,
        TokenKind::Slash => BinaryOp::Div,
        TokenKind::Percent => BinaryOp::Rem,
        TokenKind::Plus => BinaryOp::Add,
        TokenKind::Minus => BinaryOp::Sub,
        TokenKind::Shl => BinaryOp::Shl,
        TokenKind::Shr => BinaryOp::Shr,
        TokenKind::Amp => BinaryOp::BitAnd,
        TokenKind::Caret => BinaryOp::BitXor,
        TokenKind::Pipe => BinaryOp::BitOr,
        TokenKind::Lt => BinaryOp::Lt,
        TokenKind::Gt => BinaryOp::Gt,
        TokenKind::LtEq => BinaryOp::Le,
        TokenKind::GtEq => BinaryOp::Ge,
        TokenKind::EqEq => BinaryOp::Eq,
        TokenKind::NotEq => BinaryOp::Ne,
        TokenKind::AmpAmp => BinaryOp::LogicalAnd,
        TokenKind::PipePipe => BinaryOp::LogicalOr,
        TokenKind::Eq => BinaryOp::Assign,
        TokenKind::StarEq => BinaryOp::MulAssign,
        TokenKind::SlashEq => BinaryOp::DivAssign,
        TokenKind::PercentEq => BinaryOp::RemAssign,
        TokenKind::PlusEq => BinaryOp::AddAssign,
        TokenKind::MinusEq => BinaryOp::SubAssign,
        TokenKind::ShlEq => BinaryOp::ShlAssign,
        TokenKind::ShrEq => BinaryOp::ShrAssign,
        TokenKind::AmpEq => BinaryOp::AndAssign,
        TokenKind::CaretEq => BinaryOp::XorAssign,
        TokenKind::PipeEq => BinaryOp::OrAssign,
        _ => return None,
    })
}

fn token_to_unary_op(kind: TokenKind) -> Option<UnaryOp> {
    Some(match kind {
        TokenKind::PlusPlus => UnaryOp::Inc,
        TokenKind::MinusMinus => UnaryOp::Dec,
        TokenKind::Plus => UnaryOp::Plus,
        TokenKind::Minus => UnaryOp::Minus,
        TokenKind::Tilde => UnaryOp::BitNot,
        TokenKind::Bang => UnaryOp::Not,
        TokenKind::Amp => UnaryOp::AddrOf,
        TokenKind::Star => UnaryOp::Deref,
        _ => return None,
    })
}

impl<'a> Parser<'a> {
    /// Full expression: binary climb from minimum precedence 4, then the
    /// assignment family (right-associative), then the ternary
    /// (right-associative).
    pub(crate) fn parse_expression(
        &mut self,
        partially_parsed: Option<ExprId>,
    ) -> Result<ExprId, ParseError> {
        let expr = self.parse_binary_expression(4, partially_parsed)?;

        if self.tok.kind.is_assignment_op() {
            let op = token_to_bin_op(self.tok.kind).expect("assignment family maps to an operator");
            let span = self.current_span();
            self.advance();
            let rhs = self.parse_expression(None)?;
            return self
                .sema
                .create_bin_op(&mut self.ast, &mut self.types, op, expr, rhs, span);
        }

        if self.try_consume(TokenKind::Question) {
            let span = self.current_span();
            let then_expr = self.parse_expression(None)?;
            self.expect_and_consume(TokenKind::Colon)?;
            // The else branch re-enters the full expression grammar, so
            // `a ? b : c ? d : e` groups as `a ? b : (c ? d : e)`.
            let else_expr = self.parse_expression(None)?;
            return self.sema.create_conditional(
                &mut self.ast,
                &mut self.types,
                expr,
                then_expr,
                else_expr,
                span,
            );
        }

        Ok(expr)
    }

    /// Precedence climbing: consume operators of precedence >= `min`,
    /// right-recursing at `prec + 1` for left associativity.
    fn parse_binary_expression(
        &mut self,
        min_precedence: u8,
        partially_parsed: Option<ExprId>,
    ) -> Result<ExprId, ParseError> {
        let mut expr = self.parse_unary_expression(partially_parsed)?;
        let mut precedence = bin_op_precedence(self.tok.kind);
        while precedence >= min_precedence {
            while bin_op_precedence(self.tok.kind) == precedence {
                let op =
                    token_to_bin_op(self.tok.kind).expect("precedence implies a binary operator");
                let span = self.current_span();
                self.advance();
                let rhs = self.parse_binary_expression(precedence + 1, None)?;
                expr = self
                    .sema
                    .create_bin_op(&mut self.ast, &mut self.types, op, expr, rhs, span)?;
            }
            precedence -= 1;
        }
        Ok(expr)
    }

    /// Prefix operators, then the postfix `++`/`--` after the
    /// left-hand-side suffix chain.
    fn parse_unary_expression(
        &mut self,
        partially_parsed: Option<ExprId>,
    ) -> Result<ExprId, ParseError> {
        if partially_parsed.is_none() && self.tok.kind.is_unary_op() {
            let op = token_to_unary_op(self.tok.kind).expect("unary set maps to an operator");
            let span = self.current_span();
            self.advance();
            let sub = self.parse_unary_expression(None)?;
            return self
                .sema
                .create_unary_op(&mut self.ast, &mut self.types, op, sub, true, span);
        }

        let expr = self.parse_left_hand_side_expression(partially_parsed)?;
        match self.tok.kind {
            TokenKind::PlusPlus | TokenKind::MinusMinus => {
                let op = if self.tok.is(TokenKind::PlusPlus) {
                    UnaryOp::Inc
                } else {
                    UnaryOp::Dec
                };
                let span = self.current_span();
                self.advance();
                self.sema
                    .create_unary_op(&mut self.ast, &mut self.types, op, expr, false, span)
            }
            _ => Ok(expr),
        }
    }

    /// Suffix chain: `[index]`, `.member`, `(args)`.
    fn parse_left_hand_side_expression(
        &mut self,
        partially_parsed: Option<ExprId>,
    ) -> Result<ExprId, ParseError> {
        let mut expr = match partially_parsed {
            Some(expr) => expr,
            None if self.tok.is(TokenKind::New) => {
                let span = self.current_span();
                self.advance();
                let ty = self.parse_type_name(false)?;
                let mut node = Expr::new(ExprKind::New(ty), span);
                node.ty = Some(ty);
                self.ast.alloc_expr(node)
            }
            None => self.parse_primary_expression()?,
        };

        loop {
            match self.tok.kind {
                TokenKind::LBracket => {
                    let span = self.current_span();
                    self.advance();
                    let index = if self.tok.is_not(TokenKind::RBracket) {
                        Some(self.parse_expression(None)?)
                    } else {
                        None
                    };
                    self.expect_and_consume(TokenKind::RBracket)?;
                    expr = self.sema.create_index_access(
                        &mut self.ast,
                        &mut self.types,
                        expr,
                        index,
                        span,
                    )?;
                }
                TokenKind::Period => {
                    self.advance();
                    let (member, span) = self.expect_identifier()?;
                    expr = self
                        .sema
                        .create_member_expr(&mut self.ast, expr, member, span)?;
                }
                TokenKind::LParen => {
                    let span = self.current_span();
                    self.advance();
                    let (args, _names) = self.parse_function_call_arguments()?;
                    self.expect_and_consume(TokenKind::RParen)?;
                    expr = self.sema.create_call_expr(
                        &mut self.ast,
                        &mut self.types,
                        expr,
                        args,
                        span,
                    )?;
                }
                _ => return Ok(expr),
            }
        }
    }

    fn parse_primary_expression(&mut self) -> Result<ExprId, ParseError> {
        // Elementary type name followed by `(` is an explicit cast.
        if self.tok.is_elementary_type_name() && self.next_token().is(TokenKind::LParen) {
            return self.parse_elementary_cast();
        }

        let span = self.current_span();
        let expr = match self.tok.kind {
            TokenKind::True => {
                self.advance();
                let ty = self.types.bool();
                Expr::typed(ExprKind::BoolLit(true), span, ty)
            }
            TokenKind::False => {
                self.advance();
                let ty = self.types.bool();
                Expr::typed(ExprKind::BoolLit(false), span, ty)
            }
            TokenKind::Number(lexeme) => {
                let text = self.interner.lookup(lexeme);
                let Some(value) = parse_number(text) else {
                    return Err(ParseError::new(
                        DiagCode::NumberLiteralOverflow,
                        format!("numeric constant `{text}` is too large"),
                        span,
                    ));
                };
                self.advance();
                let ty = self.types.uint256();
                Expr::typed(ExprKind::NumberLit(value), span, ty)
            }
            TokenKind::Str(lexeme) => {
                let raw = self.interner.lookup(lexeme);
                let bytes = string_unquote(raw);
                let content = String::from_utf8_lossy(&bytes).into_owned();
                self.advance();
                let name = self.interner.intern_owned(content);
                let ty = self.types.intern(Ty::String);
                Expr::typed(ExprKind::StringLit(name), span, ty)
            }
            TokenKind::HexStr(lexeme) => {
                let digits = self.interner.lookup(lexeme);
                let bytes = hex_unquote(digits);
                self.advance();
                let ty = self.types.intern(Ty::Bytes);
                Expr::typed(ExprKind::HexLit(bytes), span, ty)
            }
            TokenKind::Ident(name) => {
                self.advance();
                return self.sema.create_identifier(
                    &mut self.ast,
                    &mut self.types,
                    self.interner,
                    name,
                    span,
                );
            }
            TokenKind::Type => {
                return Err(self.unimplemented("type expression"));
            }
            TokenKind::LParen | TokenKind::LBracket => {
                let close = if self.tok.is(TokenKind::LParen) {
                    TokenKind::RParen
                } else {
                    TokenKind::RBracket
                };
                self.advance();
                let inner = self.parse_expression(None)?;
                self.expect_and_consume(close)?;
                let ty = self.ast.expr(inner).ty;
                let mut node = Expr::new(ExprKind::Paren(inner), span);
                node.ty = ty;
                node
            }
            _ => {
                return Err(ParseError::new(
                    DiagCode::ExpectedToken,
                    format!(
                        "expected an expression, found `{}`",
                        self.tok.kind.display_name()
                    ),
                    span,
                ));
            }
        };
        Ok(self.ast.alloc_expr(expr))
    }

    /// `T(expr)` for elementary `T`. `address(x)` yields payable address;
    /// integer casts are integral, the rest reinterpret.
    fn parse_elementary_cast(&mut self) -> Result<ExprId, ParseError> {
        let type_tok = self.tok;
        let span = self.current_span();
        self.advance(); // elementary type name
        self.advance(); // '('
        let inner = self.parse_expression(None)?;
        let inner = self.sema.rvalue(&mut self.ast, inner);
        self.expect_and_consume(TokenKind::RParen)?;

        let (target, cast_kind) = match type_tok.kind {
            TokenKind::Address => (
                self.types.address(StateMutability::Payable),
                CastKind::TypeCast,
            ),
            TokenKind::Uint(bits) => (
                self.types.integer(IntKind::unsigned(bits)),
                CastKind::IntegralCast,
            ),
            TokenKind::Int(bits) => (
                self.types.integer(IntKind::signed(bits)),
                CastKind::IntegralCast,
            ),
            TokenKind::FixedBytes(n) => (self.types.intern(Ty::FixedBytes(n)), CastKind::TypeCast),
            TokenKind::Bytes => (self.types.intern(Ty::Bytes), CastKind::TypeCast),
            TokenKind::String => (self.types.intern(Ty::String), CastKind::TypeCast),
            TokenKind::Bool => (self.types.bool(), CastKind::TypeCast),
            _ => unreachable!("guarded by is_elementary_type_name"),
        };

        let mut node = Expr::new(
            ExprKind::ExplicitCast {
                kind: cast_kind,
                sub: inner,
            },
            span,
        );
        node.ty = Some(target);
        Ok(self.ast.alloc_expr(node))
    }

    // --- Call arguments ---

    /// Positional list: `expr ("," expr)*`, closed by `)` (not consumed).
    pub(crate) fn parse_function_call_list_arguments(
        &mut self,
    ) -> Result<Vec<ExprId>, ParseError> {
        let mut args = Vec::new();
        if self.tok.is_not(TokenKind::RParen) {
            args.push(self.parse_expression(None)?);
            while self.tok.is_not(TokenKind::RParen) {
                self.expect_and_consume(TokenKind::Comma)?;
                args.push(self.parse_expression(None)?);
            }
        }
        Ok(args)
    }

    /// Either a positional list or the braced named-argument form
    /// `({name: expr, …})`. A trailing comma before `}` is diagnosed and
    /// swallowed.
    pub(crate) fn parse_function_call_arguments(
        &mut self,
    ) -> Result<(Vec<ExprId>, Vec<Name>), ParseError> {
        let mut args = Vec::new();
        let mut names = Vec::new();

        if self.tok.is(TokenKind::LBrace) {
            self.advance();
            let mut first = true;
            while self.tok.is_not(TokenKind::RBrace) {
                if !first {
                    self.expect_and_consume(TokenKind::Comma)?;
                }
                let (name, _) = self.expect_identifier()?;
                names.push(name);
                self.expect_and_consume(TokenKind::Colon)?;
                args.push(self.parse_expression(None)?);
                if self.tok.is(TokenKind::Comma) && self.next_token().is(TokenKind::RBrace) {
                    self.record(ParseError::new(
                        DiagCode::TrailingComma,
                        "trailing comma in named argument list",
                        self.current_span(),
                    ));
                    self.advance();
                }
                first = false;
            }
            self.advance(); // '}'
        } else {
            args = self.parse_function_call_list_arguments()?;
        }
        Ok((args, names))
    }
}
