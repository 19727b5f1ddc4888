//! Non-mutating AST traversal.
//!
//! Consumers override the `visit_*` hooks they care about and delegate the
//! rest to the `walk_*` helpers, which descend in source order.

use super::{Ast, ExprId, ExprKind, StmtId, StmtKind};

pub trait Visit {
    fn visit_stmt(&mut self, ast: &Ast, id: StmtId) {
        walk_stmt(self, ast, id);
    }

    fn visit_expr(&mut self, ast: &Ast, id: ExprId) {
        walk_expr(self, ast, id);
    }
}

/// Descend into the children of a statement.
pub fn walk_stmt<V: Visit + ?Sized>(v: &mut V, ast: &Ast, id: StmtId) {
    match &ast.stmt(id).kind {
        StmtKind::Block(stmts) => {
            for &s in stmts {
                v.visit_stmt(ast, s);
            }
        }
        StmtKind::If {
            cond,
            then_stmt,
            else_stmt,
        } => {
            v.visit_expr(ast, *cond);
            v.visit_stmt(ast, *then_stmt);
            if let Some(else_stmt) = else_stmt {
                v.visit_stmt(ast, *else_stmt);
            }
        }
        StmtKind::While { cond, body, .. } => {
            v.visit_expr(ast, *cond);
            v.visit_stmt(ast, *body);
        }
        StmtKind::For {
            init,
            cond,
            step,
            body,
        } => {
            if let Some(init) = init {
                v.visit_stmt(ast, *init);
            }
            if let Some(cond) = cond {
                v.visit_expr(ast, *cond);
            }
            if let Some(step) = step {
                v.visit_expr(ast, *step);
            }
            v.visit_stmt(ast, *body);
        }
        StmtKind::Continue | StmtKind::Break => {}
        StmtKind::Return { value } => {
            if let Some(value) = value {
                v.visit_expr(ast, *value);
            }
        }
        StmtKind::Decl { vars, init } => {
            for &var in vars {
                if let Some(initializer) = ast.var(var).initializer {
                    v.visit_expr(ast, initializer);
                }
            }
            if let Some(init) = init {
                v.visit_expr(ast, *init);
            }
        }
        StmtKind::Emit { call } => v.visit_expr(ast, *call),
        StmtKind::Expr(expr) => v.visit_expr(ast, *expr),
    }
}

/// Descend into the children of an expression.
pub fn walk_expr<V: Visit + ?Sized>(v: &mut V, ast: &Ast, id: ExprId) {
    match &ast.expr(id).kind {
        ExprKind::Ident { .. }
        | ExprKind::BoolLit(_)
        | ExprKind::NumberLit(_)
        | ExprKind::StringLit(_)
        | ExprKind::HexLit(_)
        | ExprKind::New(_) => {}
        ExprKind::Unary { sub, .. } => v.visit_expr(ast, *sub),
        ExprKind::Binary { lhs, rhs, .. } => {
            v.visit_expr(ast, *lhs);
            v.visit_expr(ast, *rhs);
        }
        ExprKind::Paren(sub)
        | ExprKind::ImplicitCast { sub, .. }
        | ExprKind::ExplicitCast { sub, .. } => v.visit_expr(ast, *sub),
        ExprKind::Call { callee, args } => {
            v.visit_expr(ast, *callee);
            for &arg in args {
                v.visit_expr(ast, arg);
            }
        }
        ExprKind::Member { base, .. } => v.visit_expr(ast, *base),
        ExprKind::Index { base, index } => {
            v.visit_expr(ast, *base);
            if let Some(index) = index {
                v.visit_expr(ast, *index);
            }
        }
        ExprKind::Conditional {
            cond,
            then_expr,
            else_expr,
        } => {
            v.visit_expr(ast, *cond);
            v.visit_expr(ast, *then_expr);
            v.visit_expr(ast, *else_expr);
        }
    }
}
