//! Shared front-end data structures.
//!
//! Spans, interned names, tokens, the source type system and the arena AST.
//! Everything downstream of the lexer speaks in the handles defined here:
//! `Name` for identifiers, `TyId` for types, `ExprId`/`StmtId`/… for AST
//! nodes.

mod ast;
mod interner;
mod name;
mod span;
mod token;
mod ty;

pub use ast::{
    walk_expr, walk_stmt, Ast, BinaryOp, CastKind, ContractDecl, ContractId, ContractKind,
    DeclRef, EventDecl, EventId, Expr, ExprId, ExprKind, FunctionDecl, FunctionId,
    InheritanceSpecifier, ModifierInvocation, ParamList, PragmaDirective, SourceItem, SourceUnit,
    Stmt, StmtId, StmtKind, UnaryOp, VarDecl, VarId, Visibility, Visit,
};
pub use interner::StringInterner;
pub use name::Name;
pub use span::Span;
pub use token::{Token, TokenKind, TokenList};
pub use ty::{DataLocation, IntKind, StateMutability, Ty, TyId, TypeTable};
