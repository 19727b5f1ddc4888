//! Declaration nodes.

use crate::ty::DataLocation;
use crate::{Name, Span, StateMutability, Token, TyId};

use super::{ContractId, EventId, ExprId, FunctionId, StmtId, VarId};

/// Declaration visibility.
///
/// `Default` is what an omitted specifier parses to; downstream treats it
/// as externally callable.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
pub enum Visibility {
    #[default]
    Default,
    Private,
    Internal,
    Public,
    External,
}

impl Visibility {
    /// Reachable through the contract dispatcher.
    pub fn is_externally_callable(self) -> bool {
        matches!(
            self,
            Visibility::Default | Visibility::Public | Visibility::External
        )
    }
}

/// An ordered source unit: pragmas and contracts in order of appearance.
#[derive(Default, Debug)]
pub struct SourceUnit {
    pub items: Vec<SourceItem>,
}

#[derive(Debug)]
pub enum SourceItem {
    Pragma(PragmaDirective),
    Contract(ContractId),
}

/// A pragma directive. Accepted but unenforced; the token run between
/// `pragma` and `;` is kept verbatim.
#[derive(Debug)]
pub struct PragmaDirective {
    pub tokens: Vec<Token>,
    pub span: Span,
}

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum ContractKind {
    Interface,
    Contract,
    Library,
}

/// A contract, interface or library declaration.
///
/// Holds at most one constructor and at most one fallback; both are kept
/// out of `functions`.
#[derive(Debug)]
pub struct ContractDecl {
    pub kind: ContractKind,
    pub name: Name,
    pub bases: Vec<InheritanceSpecifier>,
    pub constructor: Option<FunctionId>,
    pub fallback: Option<FunctionId>,
    pub functions: Vec<FunctionId>,
    pub state_vars: Vec<VarId>,
    pub events: Vec<EventId>,
    pub span: Span,
}

/// One entry of an `is Base(args), …` list. Recorded verbatim for a later
/// inheritance pass.
#[derive(Debug)]
pub struct InheritanceSpecifier {
    pub base_name: Name,
    pub args: Vec<ExprId>,
    pub span: Span,
}

/// A function declaration (including constructors and the fallback).
///
/// Constructors are named `solidity.constructor`, fallbacks
/// `solidity.fallback` with an empty parameter list.
#[derive(Debug)]
pub struct FunctionDecl {
    pub name: Name,
    pub visibility: Visibility,
    pub mutability: StateMutability,
    pub is_constructor: bool,
    pub is_fallback: bool,
    pub params: ParamList,
    pub returns: ParamList,
    pub modifiers: Vec<ModifierInvocation>,
    /// Block statement; `None` until the deferred body is parsed, or for
    /// bodyless declarations.
    pub body: Option<StmtId>,
    pub span: Span,
}

/// Ordered parameter list; names may be empty.
#[derive(Debug, Default)]
pub struct ParamList {
    pub params: Vec<VarId>,
}

impl ParamList {
    pub fn new(params: Vec<VarId>) -> Self {
        ParamList { params }
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }
}

#[derive(Debug)]
pub struct ModifierInvocation {
    pub name: Name,
    pub args: Vec<ExprId>,
}

/// An event declaration.
#[derive(Debug)]
pub struct EventDecl {
    pub name: Name,
    pub params: ParamList,
    pub anonymous: bool,
    pub span: Span,
}

/// A variable declaration: state variable, parameter, or local.
///
/// `location` is only ever set for reference-kind types.
#[derive(Debug)]
pub struct VarDecl {
    pub ty: TyId,
    pub name: Name,
    pub initializer: Option<ExprId>,
    pub visibility: Visibility,
    pub is_state: bool,
    pub is_indexed: bool,
    pub is_constant: bool,
    pub location: DataLocation,
    pub span: Span,
}
