//! Expression nodes and operators.

use crate::{Name, Span, TyId};

use super::{DeclRef, ExprId};

/// An expression node.
///
/// `ty` is populated by the actions layer during parsing (or a later pass);
/// it is `None` only while the node is under construction and must be
/// resolved before code generation.
#[derive(Debug)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
    pub ty: Option<TyId>,
}

impl Expr {
    pub fn new(kind: ExprKind, span: Span) -> Self {
        Expr {
            kind,
            span,
            ty: None,
        }
    }

    pub fn typed(kind: ExprKind, span: Span, ty: TyId) -> Self {
        Expr {
            kind,
            span,
            ty: Some(ty),
        }
    }

    /// Lvalue expressions denote a place; everything else is a value.
    pub fn is_lvalue(&self) -> bool {
        matches!(
            self.kind,
            ExprKind::Ident { .. } | ExprKind::Member { .. } | ExprKind::Index { .. }
        )
    }
}

#[derive(Debug)]
pub enum ExprKind {
    /// Identifier reference; `decl` is attached at creation by scope lookup.
    Ident {
        name: Name,
        decl: Option<DeclRef>,
    },
    BoolLit(bool),
    NumberLit(u128),
    /// String literal (content after unescaping, interned).
    StringLit(Name),
    /// Hex string literal `hex"…"`; payload is the decoded byte run.
    HexLit(Vec<u8>),
    Unary {
        op: UnaryOp,
        sub: ExprId,
        prefix: bool,
    },
    Binary {
        op: BinaryOp,
        lhs: ExprId,
        rhs: ExprId,
    },
    Paren(ExprId),
    /// Compiler-inserted cast; the target type is the node's `ty`.
    ImplicitCast {
        kind: CastKind,
        sub: ExprId,
    },
    /// Source-level cast `T(e)`; the target type is the node's `ty`.
    ExplicitCast {
        kind: CastKind,
        sub: ExprId,
    },
    Call {
        callee: ExprId,
        args: Vec<ExprId>,
    },
    Member {
        base: ExprId,
        member: Name,
    },
    Index {
        base: ExprId,
        /// `None` for the type-suffix form `T[]` appearing in expressions.
        index: Option<ExprId>,
    },
    /// Ternary `cond ? then : else`, right-associative.
    Conditional {
        cond: ExprId,
        then_expr: ExprId,
        else_expr: ExprId,
    },
    New(TyId),
}

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum UnaryOp {
    /// `++`
    Inc,
    /// `--`
    Dec,
    /// Unary `+`
    Plus,
    /// Unary `-`
    Minus,
    /// `~`
    BitNot,
    /// `!`
    Not,
    /// `&`
    AddrOf,
    /// `*`
    Deref,
}

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum BinaryOp {
    Exp,
    Mul,
    Div,
    Rem,
    Add,
    Sub,
    Shl,
    Shr,
    BitAnd,
    BitXor,
    BitOr,
    Lt,
    Gt,
    Le,
    Ge,
    Eq,
    Ne,
    LogicalAnd,
    LogicalOr,
    Assign,
    MulAssign,
    DivAssign,
    RemAssign,
    AddAssign,
    SubAssign,
    ShlAssign,
    ShrAssign,
    AndAssign,
    XorAssign,
    OrAssign,
}

impl BinaryOp {
    pub fn is_assignment(self) -> bool {
        matches!(
            self,
            BinaryOp::Assign
                | BinaryOp::MulAssign
                | BinaryOp::DivAssign
                | BinaryOp::RemAssign
                | BinaryOp::AddAssign
                | BinaryOp::SubAssign
                | BinaryOp::ShlAssign
                | BinaryOp::ShrAssign
                | BinaryOp::AndAssign
                | BinaryOp::XorAssign
                | BinaryOp::OrAssign
        )
    }

    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinaryOp::Lt | BinaryOp::Gt | BinaryOp::Le | BinaryOp::Ge | BinaryOp::Eq | BinaryOp::Ne
        )
    }

    pub fn is_logical(self) -> bool {
        matches!(self, BinaryOp::LogicalAnd | BinaryOp::LogicalOr)
    }

    /// The arithmetic operator a compound assignment applies, e.g. `+=` → `+`.
    pub fn compound_base(self) -> Option<BinaryOp> {
        match self {
            BinaryOp::MulAssign => Some(BinaryOp::Mul),
            BinaryOp::DivAssign => Some(BinaryOp::Div),
            BinaryOp::RemAssign => Some(BinaryOp::Rem),
            BinaryOp::AddAssign => Some(BinaryOp::Add),
            BinaryOp::SubAssign => Some(BinaryOp::Sub),
            BinaryOp::ShlAssign => Some(BinaryOp::Shl),
            BinaryOp::ShrAssign => Some(BinaryOp::Shr),
            BinaryOp::AndAssign => Some(BinaryOp::BitAnd),
            BinaryOp::XorAssign => Some(BinaryOp::BitXor),
            BinaryOp::OrAssign => Some(BinaryOp::BitOr),
            _ => None,
        }
    }
}

/// Cast flavours carried by cast expressions.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum CastKind {
    /// Read a value out of a place.
    LValueToRValue,
    /// Integer width/signedness change (zext/sext/trunc).
    IntegralCast,
    /// Source-level type reinterpretation, e.g. `address(x)`.
    TypeCast,
}
