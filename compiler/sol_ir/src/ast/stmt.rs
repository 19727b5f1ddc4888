//! Statement nodes.

use crate::Span;

use super::{ExprId, StmtId, VarId};

#[derive(Debug)]
pub struct Stmt {
    pub kind: StmtKind,
    pub span: Span,
}

impl Stmt {
    pub fn new(kind: StmtKind, span: Span) -> Self {
        Stmt { kind, span }
    }
}

#[derive(Debug)]
pub enum StmtKind {
    Block(Vec<StmtId>),
    If {
        cond: ExprId,
        then_stmt: StmtId,
        else_stmt: Option<StmtId>,
    },
    /// `while` and `do-while`; the flag selects tail-tested form.
    While {
        cond: ExprId,
        body: StmtId,
        is_do_while: bool,
    },
    For {
        init: Option<StmtId>,
        cond: Option<ExprId>,
        step: Option<ExprId>,
        body: StmtId,
    },
    Continue,
    Break,
    Return {
        value: Option<ExprId>,
    },
    /// Local declaration statement, e.g. `uint256 x = 1;`.
    Decl {
        vars: Vec<VarId>,
        init: Option<ExprId>,
    },
    /// `emit Event(args);` — the payload is the built call expression.
    Emit {
        call: ExprId,
    },
    Expr(ExprId),
}
