//! Scope stack and the actions facade.
//!
//! The parser never constructs identifier, call, member, index-access or
//! binary-operator nodes directly; it goes through [`Sema`], which resolves
//! names against the live scope stack, assigns result types by promotion,
//! and inserts the implicit casts the code generator relies on
//! (lvalue-to-rvalue reads, integral widenings).

use rustc_hash::FxHashMap;
use sol_diagnostic::DiagCode;
use sol_ir::{
    Ast, CastKind, DeclRef, EventDecl, EventId, Expr, ExprId, ExprKind, FunctionDecl, FunctionId,
    ModifierInvocation, Name, ParamList, Span, StateMutability, Stmt, StmtId, StmtKind,
    StringInterner, Ty, TyId, TypeTable, UnaryOp, Visibility,
};
use sol_ir::{BinaryOp, IntKind};

use crate::ParseError;

/// Scope flag bits.
pub mod scope_flags {
    /// The body scope of a function.
    pub const FUNCTION: u32 = 1 << 0;
    /// `break` may target this scope.
    pub const BREAK: u32 = 1 << 1;
    /// `continue` may target this scope.
    pub const CONTINUE: u32 = 1 << 2;
}

/// One lexical scope: registered declarations plus flag bits.
struct Scope {
    decls: FxHashMap<Name, DeclRef>,
    flags: u32,
}

/// Declaration bookkeeping and on-the-fly expression construction.
pub struct Sema {
    scopes: Vec<Scope>,
    /// Return types of the function body currently being parsed.
    fn_return_tys: Vec<TyId>,
}

impl Sema {
    pub fn new() -> Self {
        Sema {
            scopes: Vec::new(),
            fn_return_tys: Vec::new(),
        }
    }

    // --- Scope stack ---

    pub fn push_scope(&mut self, flags: u32) {
        self.scopes.push(Scope {
            decls: FxHashMap::default(),
            flags,
        });
    }

    pub fn pop_scope(&mut self) {
        let popped = self.scopes.pop();
        debug_assert!(popped.is_some(), "scope stack underflow");
    }

    /// Register a declaration in the top scope. Unnamed declarations
    /// (anonymous parameters) are skipped.
    pub fn add_decl(&mut self, name: Name, decl: DeclRef) {
        if name.is_empty() {
            return;
        }
        let top = self.scopes.last_mut().expect("no scope to declare into");
        top.decls.insert(name, decl);
    }

    /// Resolve a name against the scope stack, innermost first.
    pub fn lookup(&self, name: Name) -> Option<DeclRef> {
        self.scopes
            .iter()
            .rev()
            .find_map(|scope| scope.decls.get(&name).copied())
    }

    /// True if any live scope carries the given flag bit.
    pub fn in_scope_with(&self, flag: u32) -> bool {
        self.scopes.iter().any(|scope| scope.flags & flag != 0)
    }

    // --- Function return types ---

    pub fn set_fn_return_types(&mut self, tys: Vec<TyId>) {
        self.fn_return_tys = tys;
    }

    pub fn erase_fn_return_types(&mut self) {
        self.fn_return_tys.clear();
    }

    // --- Expression construction ---

    /// Resolve an identifier token into a typed reference expression.
    pub fn create_identifier(
        &mut self,
        ast: &mut Ast,
        types: &mut TypeTable,
        interner: &StringInterner,
        name: Name,
        span: Span,
    ) -> Result<ExprId, ParseError> {
        let Some(decl) = self.lookup(name) else {
            return Err(ParseError::new(
                DiagCode::UndeclaredIdentifier,
                format!("use of undeclared identifier `{}`", interner.lookup(name)),
                span,
            ));
        };
        let ty = match decl {
            DeclRef::Var(id) => Some(ast.var(id).ty),
            DeclRef::Function(id) => {
                let func = ast.function(id);
                let params = func.params.params.iter().map(|&p| ast.var(p).ty).collect();
                let returns = func.returns.params.iter().map(|&p| ast.var(p).ty).collect();
                let mutability = func.mutability;
                Some(types.intern(Ty::Function {
                    params,
                    returns,
                    mutability,
                }))
            }
            DeclRef::Event(_) | DeclRef::Contract(_) => None,
        };
        let mut expr = Expr::new(
            ExprKind::Ident {
                name,
                decl: Some(decl),
            },
            span,
        );
        expr.ty = ty;
        Ok(ast.alloc_expr(expr))
    }

    /// Build a call, reading each argument as an rvalue and coercing to
    /// the callee's parameter types when they are known.
    pub fn create_call_expr(
        &mut self,
        ast: &mut Ast,
        types: &mut TypeTable,
        callee: ExprId,
        args: Vec<ExprId>,
        span: Span,
    ) -> Result<ExprId, ParseError> {
        let callee_ty = ast.expr(callee).ty.map(|id| types.get(id).clone());
        let (param_tys, result_ty) = match callee_ty {
            Some(Ty::Function {
                params, returns, ..
            }) => (Some(params), returns.first().copied()),
            _ => (None, None),
        };

        let mut lowered = Vec::with_capacity(args.len());
        for (i, arg) in args.into_iter().enumerate() {
            let value = self.rvalue(ast, arg);
            let value = match param_tys.as_ref().and_then(|tys| tys.get(i)) {
                Some(&target) => self.coerce(ast, types, value, target)?,
                None => value,
            };
            lowered.push(value);
        }

        let mut expr = Expr::new(
            ExprKind::Call {
                callee,
                args: lowered,
            },
            span,
        );
        expr.ty = result_ty;
        Ok(ast.alloc_expr(expr))
    }

    /// Member access. No aggregate types are implemented yet, so the
    /// result is untyped; it still participates in index-accessed paths.
    pub fn create_member_expr(
        &mut self,
        ast: &mut Ast,
        base: ExprId,
        member: Name,
        span: Span,
    ) -> Result<ExprId, ParseError> {
        Ok(ast.alloc_expr(Expr::new(ExprKind::Member { base, member }, span)))
    }

    /// Index access; typed by the base's element/value type.
    pub fn create_index_access(
        &mut self,
        ast: &mut Ast,
        types: &mut TypeTable,
        base: ExprId,
        index: Option<ExprId>,
        span: Span,
    ) -> Result<ExprId, ParseError> {
        let index = index.map(|idx| self.rvalue(ast, idx));
        let result_ty = ast.expr(base).ty.and_then(|id| match types.get(id) {
            Ty::Array { elem, .. } => Some(*elem),
            Ty::Mapping { value, .. } => Some(*value),
            Ty::Bytes => Some(types.intern(Ty::FixedBytes(1))),
            _ => None,
        });
        let mut expr = Expr::new(ExprKind::Index { base, index }, span);
        expr.ty = result_ty;
        Ok(ast.alloc_expr(expr))
    }

    /// Unary operator. `++`/`--` operate on a place; the value operators
    /// read their operand first. `!` yields bool, the rest keep their
    /// operand's type.
    pub fn create_unary_op(
        &mut self,
        ast: &mut Ast,
        types: &mut TypeTable,
        op: UnaryOp,
        sub: ExprId,
        prefix: bool,
        span: Span,
    ) -> Result<ExprId, ParseError> {
        let sub = match op {
            UnaryOp::Inc | UnaryOp::Dec | UnaryOp::AddrOf | UnaryOp::Deref => sub,
            _ => self.rvalue(ast, sub),
        };
        let ty = match op {
            UnaryOp::Not => Some(types.bool()),
            _ => ast.expr(sub).ty,
        };
        let mut expr = Expr::new(ExprKind::Unary { op, sub, prefix }, span);
        expr.ty = ty;
        Ok(ast.alloc_expr(expr))
    }

    /// Binary operator with type assignment by promotion.
    ///
    /// Integer operands widen to the common bit-width; mixing signed with
    /// unsigned is invalid unless one side is an adaptable number literal.
    /// Comparisons yield `bool`. Assignments adopt the left-hand type and
    /// coerce the right-hand side to it.
    pub fn create_bin_op(
        &mut self,
        ast: &mut Ast,
        types: &mut TypeTable,
        op: BinaryOp,
        lhs: ExprId,
        rhs: ExprId,
        span: Span,
    ) -> Result<ExprId, ParseError> {
        if op.is_assignment() {
            let target_ty = ast.expr(lhs).ty;
            let value = self.rvalue(ast, rhs);
            let value = match target_ty {
                Some(target) => self.coerce(ast, types, value, target)?,
                None => value,
            };
            let mut expr = Expr::new(
                ExprKind::Binary {
                    op,
                    lhs,
                    rhs: value,
                },
                span,
            );
            expr.ty = target_ty;
            return Ok(ast.alloc_expr(expr));
        }

        let lhs = self.rvalue(ast, lhs);
        let rhs = self.rvalue(ast, rhs);
        let bool_ty = types.bool();

        let result_ty = match (ast.expr(lhs).ty, ast.expr(rhs).ty) {
            (Some(lt), Some(rt)) => {
                let lk = types.get(lt).as_integer();
                let rk = types.get(rt).as_integer();
                match (lk, rk) {
                    (Some(lk), Some(rk)) => {
                        let (lhs, rhs, common) =
                            self.unify_integers(ast, types, lhs, lk, rhs, rk, span)?;
                        let ty = if op.is_comparison() { bool_ty } else { common };
                        let mut expr = Expr::new(ExprKind::Binary { op, lhs, rhs }, span);
                        expr.ty = Some(ty);
                        return Ok(ast.alloc_expr(expr));
                    }
                    _ if lt == rt => {
                        if op.is_comparison() {
                            bool_ty
                        } else if op.is_logical() {
                            if lt != bool_ty {
                                return Err(invalid_operands(op, span));
                            }
                            bool_ty
                        } else {
                            lt
                        }
                    }
                    _ => return Err(invalid_operands(op, span)),
                }
            }
            // One side unresolved: leave the result untyped for a later pass.
            _ => {
                let mut expr = Expr::new(ExprKind::Binary { op, lhs, rhs }, span);
                expr.ty = None;
                return Ok(ast.alloc_expr(expr));
            }
        };

        let mut expr = Expr::new(ExprKind::Binary { op, lhs, rhs }, span);
        expr.ty = Some(result_ty);
        Ok(ast.alloc_expr(expr))
    }

    /// Ternary conditional; branches must agree (after literal adaption).
    pub fn create_conditional(
        &mut self,
        ast: &mut Ast,
        types: &mut TypeTable,
        cond: ExprId,
        then_expr: ExprId,
        else_expr: ExprId,
        span: Span,
    ) -> Result<ExprId, ParseError> {
        let cond = self.rvalue(ast, cond);
        let then_expr = self.rvalue(ast, then_expr);
        let else_expr = self.rvalue(ast, else_expr);
        let ty = match (ast.expr(then_expr).ty, ast.expr(else_expr).ty) {
            (Some(t), Some(e)) if t == e => Some(t),
            (Some(t), Some(_)) => {
                // Try to adapt a literal branch to the other side.
                let else_expr = self.coerce(ast, types, else_expr, t)?;
                let mut expr = Expr::new(
                    ExprKind::Conditional {
                        cond,
                        then_expr,
                        else_expr,
                    },
                    span,
                );
                expr.ty = Some(t);
                return Ok(ast.alloc_expr(expr));
            }
            (t, e) => t.or(e),
        };
        let mut expr = Expr::new(
            ExprKind::Conditional {
                cond,
                then_expr,
                else_expr,
            },
            span,
        );
        expr.ty = ty;
        Ok(ast.alloc_expr(expr))
    }

    /// Build a return statement, checking the value against the active
    /// return type vector.
    pub fn create_return_stmt(
        &mut self,
        ast: &mut Ast,
        types: &mut TypeTable,
        value: Option<ExprId>,
        span: Span,
    ) -> Result<StmtId, ParseError> {
        let value = match value {
            Some(v) => {
                let v = self.rvalue(ast, v);
                match self.fn_return_tys.first().copied() {
                    Some(ret_ty) => {
                        let coerced = self.coerce(ast, types, v, ret_ty).map_err(|_| {
                            ParseError::new(
                                DiagCode::ReturnTypeMismatch,
                                "returned value does not match the declared return type",
                                span,
                            )
                        })?;
                        Some(coerced)
                    }
                    // No declared return types: leave the value as-is for
                    // a later pass to judge.
                    None => Some(v),
                }
            }
            None => None,
        };
        Ok(ast.alloc_stmt(Stmt::new(StmtKind::Return { value }, span)))
    }

    /// Allocate a function declaration node. Registration in the
    /// enclosing scope stays with the caller, as does body attachment for
    /// deferred parsing.
    #[allow(clippy::too_many_arguments)]
    pub fn create_function_decl(
        &mut self,
        ast: &mut Ast,
        name: Name,
        visibility: Visibility,
        mutability: StateMutability,
        is_constructor: bool,
        is_fallback: bool,
        params: ParamList,
        modifiers: Vec<ModifierInvocation>,
        returns: ParamList,
        body: Option<StmtId>,
        span: Span,
    ) -> FunctionId {
        ast.alloc_function(FunctionDecl {
            name,
            visibility,
            mutability,
            is_constructor,
            is_fallback,
            params,
            returns,
            modifiers,
            body,
            span,
        })
    }

    /// Allocate an event declaration node and register it.
    pub fn create_event_decl(
        &mut self,
        ast: &mut Ast,
        name: Name,
        params: ParamList,
        anonymous: bool,
        span: Span,
    ) -> EventId {
        let id = ast.alloc_event(EventDecl {
            name,
            params,
            anonymous,
            span,
        });
        self.add_decl(name, DeclRef::Event(id));
        id
    }

    // --- Conversions ---

    /// Read a value out of a place. Non-lvalues pass through.
    pub fn rvalue(&mut self, ast: &mut Ast, expr: ExprId) -> ExprId {
        if !ast.expr(expr).is_lvalue() {
            return expr;
        }
        let span = ast.expr(expr).span;
        let ty = ast.expr(expr).ty;
        let mut cast = Expr::new(
            ExprKind::ImplicitCast {
                kind: CastKind::LValueToRValue,
                sub: expr,
            },
            span,
        );
        cast.ty = ty;
        ast.alloc_expr(cast)
    }

    /// Coerce `expr` to `target`: identity, literal adaption, or integral
    /// widening/narrowing of matching signedness.
    pub fn coerce(
        &mut self,
        ast: &mut Ast,
        types: &mut TypeTable,
        expr: ExprId,
        target: TyId,
    ) -> Result<ExprId, ParseError> {
        let Some(have) = ast.expr(expr).ty else {
            return Ok(expr);
        };
        if have == target {
            return Ok(expr);
        }
        if self.retype_literal(ast, expr, target) {
            return Ok(expr);
        }
        let span = ast.expr(expr).span;
        match (types.get(have).as_integer(), types.get(target).as_integer()) {
            (Some(from), Some(to)) if from.signed == to.signed => {
                let mut cast = Expr::new(
                    ExprKind::ImplicitCast {
                        kind: CastKind::IntegralCast,
                        sub: expr,
                    },
                    span,
                );
                cast.ty = Some(target);
                Ok(ast.alloc_expr(cast))
            }
            _ => Err(ParseError::new(
                DiagCode::InvalidOperands,
                "no implicit conversion between these types",
                span,
            )),
        }
    }

    /// Number literals are adaptable: give the literal the target type
    /// instead of inserting a cast. Returns true if adapted.
    fn retype_literal(&self, ast: &mut Ast, expr: ExprId, target: TyId) -> bool {
        if matches!(ast.expr(expr).kind, ExprKind::NumberLit(_)) {
            ast.expr_mut(expr).ty = Some(target);
            return true;
        }
        false
    }

    /// Widen two integer operands to their common width. Sign mixing is
    /// rejected unless one side is an adaptable literal.
    #[allow(clippy::too_many_arguments)]
    fn unify_integers(
        &mut self,
        ast: &mut Ast,
        types: &mut TypeTable,
        lhs: ExprId,
        lk: IntKind,
        rhs: ExprId,
        rk: IntKind,
        span: Span,
    ) -> Result<(ExprId, ExprId, TyId), ParseError> {
        if lk.signed != rk.signed {
            // A literal can take on the other operand's signedness.
            let l_ty = types.integer(lk);
            let r_ty = types.integer(rk);
            if self.retype_literal(ast, rhs, l_ty) {
                return Ok((lhs, rhs, l_ty));
            }
            if self.retype_literal(ast, lhs, r_ty) {
                return Ok((lhs, rhs, r_ty));
            }
            return Err(ParseError::new(
                DiagCode::InvalidOperands,
                "cannot mix signed and unsigned operands",
                span,
            ));
        }
        let common = IntKind {
            signed: lk.signed,
            bits: lk.bits.max(rk.bits),
        };
        let common_ty = types.integer(common);
        let lhs = self.widen(ast, types, lhs, lk, common_ty)?;
        let rhs = self.widen(ast, types, rhs, rk, common_ty)?;
        Ok((lhs, rhs, common_ty))
    }

    fn widen(
        &mut self,
        ast: &mut Ast,
        types: &mut TypeTable,
        expr: ExprId,
        kind: IntKind,
        common_ty: TyId,
    ) -> Result<ExprId, ParseError> {
        let common = types
            .get(common_ty)
            .as_integer()
            .expect("common type is integral");
        if kind.bits == common.bits {
            return Ok(expr);
        }
        self.coerce(ast, types, expr, common_ty)
    }
}

impl Default for Sema {
    fn default() -> Self {
        Self::new()
    }
}

#[cold]
fn invalid_operands(op: BinaryOp, span: Span) -> ParseError {
    ParseError::new(
        DiagCode::InvalidOperands,
        format!("invalid operands to binary operator {op:?}"),
        span,
    )
}
