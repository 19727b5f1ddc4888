//! The abstract syntax tree.
//!
//! Nodes live in flat arenas inside [`Ast`] and reference each other through
//! `u32` ids. The parser is the only producer; after parsing the tree is
//! read-only (the code generator performs no structural mutation).

mod decl;
mod expr;
mod stmt;
mod visit;

pub use decl::{
    ContractDecl, ContractKind, EventDecl, FunctionDecl, InheritanceSpecifier, ModifierInvocation,
    ParamList, PragmaDirective, SourceItem, SourceUnit, VarDecl, Visibility,
};
pub use expr::{BinaryOp, CastKind, Expr, ExprKind, UnaryOp};
pub use stmt::{Stmt, StmtKind};
pub use visit::{walk_expr, walk_stmt, Visit};

macro_rules! define_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
        #[repr(transparent)]
        pub struct $name(u32);

        impl $name {
            #[inline]
            pub const fn from_raw(raw: u32) -> Self {
                $name(raw)
            }

            #[inline]
            pub const fn raw(self) -> u32 {
                self.0
            }
        }
    };
}

define_id!(
    /// Handle to an expression node.
    ExprId
);
define_id!(
    /// Handle to a statement node.
    StmtId
);
define_id!(
    /// Handle to a variable declaration.
    VarId
);
define_id!(
    /// Handle to a function declaration.
    FunctionId
);
define_id!(
    /// Handle to an event declaration.
    EventId
);
define_id!(
    /// Handle to a contract declaration.
    ContractId
);

/// A resolved reference to a declaration, attached to identifier
/// expressions by the actions layer.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum DeclRef {
    Var(VarId),
    Function(FunctionId),
    Event(EventId),
    Contract(ContractId),
}

/// Node arenas for one source unit.
#[derive(Default, Debug)]
pub struct Ast {
    exprs: Vec<Expr>,
    stmts: Vec<Stmt>,
    vars: Vec<VarDecl>,
    functions: Vec<FunctionDecl>,
    events: Vec<EventDecl>,
    contracts: Vec<ContractDecl>,
}

impl Ast {
    pub fn new() -> Self {
        Ast::default()
    }

    pub fn alloc_expr(&mut self, expr: Expr) -> ExprId {
        let id = ExprId::from_raw(self.exprs.len() as u32);
        self.exprs.push(expr);
        id
    }

    pub fn alloc_stmt(&mut self, stmt: Stmt) -> StmtId {
        let id = StmtId::from_raw(self.stmts.len() as u32);
        self.stmts.push(stmt);
        id
    }

    pub fn alloc_var(&mut self, var: VarDecl) -> VarId {
        let id = VarId::from_raw(self.vars.len() as u32);
        self.vars.push(var);
        id
    }

    pub fn alloc_function(&mut self, func: FunctionDecl) -> FunctionId {
        let id = FunctionId::from_raw(self.functions.len() as u32);
        self.functions.push(func);
        id
    }

    pub fn alloc_event(&mut self, event: EventDecl) -> EventId {
        let id = EventId::from_raw(self.events.len() as u32);
        self.events.push(event);
        id
    }

    pub fn alloc_contract(&mut self, contract: ContractDecl) -> ContractId {
        let id = ContractId::from_raw(self.contracts.len() as u32);
        self.contracts.push(contract);
        id
    }

    #[inline]
    pub fn expr(&self, id: ExprId) -> &Expr {
        &self.exprs[id.raw() as usize]
    }

    #[inline]
    pub fn expr_mut(&mut self, id: ExprId) -> &mut Expr {
        &mut self.exprs[id.raw() as usize]
    }

    #[inline]
    pub fn stmt(&self, id: StmtId) -> &Stmt {
        &self.stmts[id.raw() as usize]
    }

    #[inline]
    pub fn var(&self, id: VarId) -> &VarDecl {
        &self.vars[id.raw() as usize]
    }

    #[inline]
    pub fn function(&self, id: FunctionId) -> &FunctionDecl {
        &self.functions[id.raw() as usize]
    }

    #[inline]
    pub fn function_mut(&mut self, id: FunctionId) -> &mut FunctionDecl {
        &mut self.functions[id.raw() as usize]
    }

    #[inline]
    pub fn event(&self, id: EventId) -> &EventDecl {
        &self.events[id.raw() as usize]
    }

    #[inline]
    pub fn contract(&self, id: ContractId) -> &ContractDecl {
        &self.contracts[id.raw() as usize]
    }

    #[inline]
    pub fn contract_mut(&mut self, id: ContractId) -> &mut ContractDecl {
        &mut self.contracts[id.raw() as usize]
    }
}
