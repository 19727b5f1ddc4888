//! Item-level grammar: pragmas, contracts, functions, events, variables
//! and type names.

use sol_diagnostic::DiagCode;
use sol_ir::{
    ContractDecl, ContractId, ContractKind, DataLocation, DeclRef, EventId, FunctionId,
    InheritanceSpecifier, IntKind, ModifierInvocation, Name, ParamList, PragmaDirective, Span,
    StateMutability, Ty, TyId, TokenKind, VarDecl, VarId, Visibility,
};

use crate::{ParseError, Parser};

/// Recognized flags for variable-declaration parsing.
#[derive(Copy, Clone, Default)]
pub(crate) struct VarDeclOptions {
    pub allow_var: bool,
    pub allow_indexed: bool,
    pub allow_empty_name: bool,
    pub allow_initial_value: bool,
    pub allow_location_specifier: bool,
    pub is_state_variable: bool,
}

/// Result of parsing a function header, before the body decision.
pub(crate) struct FunctionHeader {
    pub name: Name,
    pub span: Span,
    pub visibility: Visibility,
    pub mutability: StateMutability,
    pub is_constructor: bool,
    pub is_fallback: bool,
    pub params: ParamList,
    pub returns: ParamList,
    pub modifiers: Vec<ModifierInvocation>,
}

impl<'a> Parser<'a> {
    /// `pragma anything* ;` — accepted, recorded verbatim, unenforced.
    pub(crate) fn parse_pragma_directive(&mut self) -> Result<PragmaDirective, ParseError> {
        let start = self.current_span();
        self.advance(); // 'pragma'
        let mut tokens = Vec::new();
        loop {
            match self.tok.kind {
                TokenKind::Semi | TokenKind::Eof => break,
                TokenKind::Ident(_) | TokenKind::Number(_) => {
                    tokens.push(self.advance());
                }
                kind if kind.is_punctuator() => {
                    tokens.push(self.advance());
                }
                _ => {
                    self.record(ParseError::new(
                        DiagCode::UnknownPragma,
                        format!(
                            "unexpected `{}` in pragma directive",
                            self.tok.kind.display_name()
                        ),
                        self.current_span(),
                    ));
                    self.advance();
                }
            }
        }
        let end = self.current_span();
        self.expect_and_consume_semi()?;
        Ok(PragmaDirective {
            tokens,
            span: start.merge(end),
        })
    }

    fn parse_contract_kind(&mut self) -> ContractKind {
        match self.tok.kind {
            TokenKind::Interface => {
                self.advance();
                ContractKind::Interface
            }
            TokenKind::Contract => {
                self.advance();
                ContractKind::Contract
            }
            TokenKind::Library => {
                self.advance();
                ContractKind::Library
            }
            _ => {
                self.record(ParseError::new(
                    DiagCode::ExpectedContractKind,
                    "expected `contract`, `interface` or `library`",
                    self.current_span(),
                ));
                self.advance();
                ContractKind::Contract
            }
        }
    }

    fn parse_visibility_specifier(&mut self) -> Visibility {
        match self.tok.kind {
            TokenKind::Public => {
                self.advance();
                Visibility::Public
            }
            TokenKind::Internal => {
                self.advance();
                Visibility::Internal
            }
            TokenKind::Private => {
                self.advance();
                Visibility::Private
            }
            TokenKind::External => {
                self.advance();
                Visibility::External
            }
            _ => {
                self.record(ParseError::new(
                    DiagCode::ExpectedVisibility,
                    "expected a visibility specifier",
                    self.current_span(),
                ));
                self.advance();
                Visibility::Default
            }
        }
    }

    pub(crate) fn parse_state_mutability(&mut self) -> StateMutability {
        match self.tok.kind {
            TokenKind::Payable => {
                self.advance();
                StateMutability::Payable
            }
            TokenKind::View => {
                self.advance();
                StateMutability::View
            }
            TokenKind::Pure => {
                self.advance();
                StateMutability::Pure
            }
            TokenKind::Constant => {
                self.record(ParseError::new(
                    DiagCode::ConstantRemoved,
                    "`constant` on functions was replaced by `view`",
                    self.current_span(),
                ));
                self.advance();
                StateMutability::View
            }
            _ => {
                self.record(ParseError::new(
                    DiagCode::ExpectedStateMutability,
                    "expected a state-mutability specifier",
                    self.current_span(),
                ));
                self.advance();
                StateMutability::NonPayable
            }
        }
    }

    /// Optional trailing data location; defaults to storage without
    /// consuming anything.
    pub(crate) fn parse_data_location(&mut self) -> DataLocation {
        match self.tok.kind {
            TokenKind::Storage => {
                self.advance();
                DataLocation::Storage
            }
            TokenKind::Memory => {
                self.advance();
                DataLocation::Memory
            }
            TokenKind::CallData => {
                self.advance();
                DataLocation::CallData
            }
            _ => DataLocation::Storage,
        }
    }

    // --- Contracts ---

    pub(crate) fn parse_contract_definition(&mut self) -> Result<ContractId, ParseError> {
        self.sema.push_scope(0);
        let result = self.contract_definition_inner();
        self.sema.pop_scope();
        match result {
            Ok(id) => {
                // The contract itself is visible at source-unit scope.
                let name = self.ast.contract(id).name;
                self.sema.add_decl(name, DeclRef::Contract(id));
            }
            Err(_) => self.discard_lexed_methods(),
        }
        result
    }

    fn contract_definition_inner(&mut self) -> Result<ContractId, ParseError> {
        let start = self.current_span();
        let kind = self.parse_contract_kind();
        let (name, _) = self.expect_identifier()?;

        let mut bases = Vec::new();
        if self.try_consume(TokenKind::Is) {
            loop {
                let (base_name, base_span) = self.expect_identifier()?;
                let mut args = Vec::new();
                if self.try_consume(TokenKind::LParen) {
                    args = self.parse_function_call_list_arguments()?;
                    self.expect_and_consume(TokenKind::RParen)?;
                }
                bases.push(InheritanceSpecifier {
                    base_name,
                    args,
                    span: base_span,
                });
                if !self.try_consume(TokenKind::Comma) {
                    break;
                }
            }
        }

        self.expect_and_consume(TokenKind::LBrace)?;

        let mut constructor: Option<FunctionId> = None;
        let mut fallback: Option<FunctionId> = None;
        let mut functions = Vec::new();
        let mut state_vars = Vec::new();
        let mut events = Vec::new();

        while self.tok.is_not(TokenKind::Eof) {
            if self.try_consume(TokenKind::RBrace) {
                break;
            }

            match self.tok.kind {
                TokenKind::Function | TokenKind::Constructor => {
                    match self.parse_function_definition_or_function_type_state_variable() {
                        Ok(fd) => {
                            let (fd_name, is_ctor, is_fallback) = {
                                let func = self.ast.function(fd);
                                (func.name, func.is_constructor, func.is_fallback)
                            };
                            self.sema.add_decl(fd_name, DeclRef::Function(fd));
                            if is_ctor {
                                if constructor.is_some() {
                                    self.record(ParseError::new(
                                        DiagCode::DuplicateSpecialFunction,
                                        "contract declares more than one constructor",
                                        self.ast.function(fd).span,
                                    ));
                                } else {
                                    constructor = Some(fd);
                                }
                            } else if is_fallback {
                                if fallback.is_some() {
                                    self.record(ParseError::new(
                                        DiagCode::DuplicateSpecialFunction,
                                        "contract declares more than one fallback",
                                        self.ast.function(fd).span,
                                    ));
                                } else {
                                    fallback = Some(fd);
                                }
                            } else {
                                functions.push(fd);
                            }
                        }
                        Err(err) => {
                            self.record(err);
                            self.recover_to_contract_member();
                        }
                    }
                    self.sema.erase_fn_return_types();
                }
                TokenKind::Struct | TokenKind::Enum | TokenKind::Modifier | TokenKind::Using => {
                    // Unsupported member: diagnose and abort this contract.
                    let what = self.tok.kind.display_name();
                    return Err(self.unimplemented(what));
                }
                TokenKind::Event => {
                    self.advance();
                    match self.parse_event_definition() {
                        Ok(ev) => events.push(ev),
                        Err(err) => {
                            self.record(err);
                            self.recover_to_contract_member();
                        }
                    }
                }
                TokenKind::Mapping | TokenKind::Ident(_) => {
                    match self.parse_state_variable() {
                        Ok(var) => state_vars.push(var),
                        Err(err) => {
                            self.record(err);
                            self.recover_to_contract_member();
                        }
                    }
                }
                kind if kind.is_elementary_type_name() => match self.parse_state_variable() {
                    Ok(var) => state_vars.push(var),
                    Err(err) => {
                        self.record(err);
                        self.recover_to_contract_member();
                    }
                },
                _ => {
                    return Err(ParseError::new(
                        DiagCode::ExpectedContractPart,
                        format!(
                            "expected a contract member, found `{}`",
                            self.tok.kind.display_name()
                        ),
                        self.current_span(),
                    ));
                }
            }
        }

        let end = self.current_span();
        let id = self.ast.alloc_contract(ContractDecl {
            kind,
            name,
            bases,
            constructor,
            fallback,
            functions,
            state_vars,
            events,
            span: start.merge(end),
        });

        // Re-parse every deferred body now that all members are known.
        self.parse_lexed_method_defs();
        Ok(id)
    }

    fn parse_state_variable(&mut self) -> Result<VarId, ParseError> {
        let options = VarDeclOptions {
            is_state_variable: true,
            allow_initial_value: true,
            ..VarDeclOptions::default()
        };
        let var = self.parse_variable_declaration(options, None)?;
        self.expect_and_consume_semi()?;
        Ok(var)
    }

    /// Skip to a plausible member boundary after a failed member parse.
    fn recover_to_contract_member(&mut self) {
        loop {
            match self.tok.kind {
                TokenKind::Semi => {
                    self.advance();
                    return;
                }
                TokenKind::RBrace
                | TokenKind::Function
                | TokenKind::Constructor
                | TokenKind::Event
                | TokenKind::Eof => return,
                _ => {
                    self.advance();
                }
            }
        }
    }

    // --- Functions ---

    pub(crate) fn parse_function_definition_or_function_type_state_variable(
        &mut self,
    ) -> Result<FunctionId, ParseError> {
        self.sema.push_scope(0);
        let result = self.function_definition_inner();
        self.sema.pop_scope();
        result
    }

    fn function_definition_inner(&mut self) -> Result<FunctionId, ParseError> {
        let header = self.parse_function_header(false, true)?;
        if header.is_constructor
            || header.is_fallback
            || !header.modifiers.is_empty()
            || !header.name.is_empty()
            || matches!(self.tok.kind, TokenKind::Semi | TokenKind::LBrace)
        {
            let fd = self.sema.create_function_decl(
                &mut self.ast,
                header.name,
                header.visibility,
                header.mutability,
                header.is_constructor,
                header.is_fallback,
                header.params,
                header.modifiers,
                header.returns,
                None,
                header.span,
            );
            if self.tok.is(TokenKind::LBrace) {
                let mut toks = vec![self.tok];
                self.advance(); // '{'
                if !self.consume_and_store_until(TokenKind::RBrace, &mut toks) {
                    return Err(ParseError::new(
                        DiagCode::ExpectedToken,
                        "unterminated function body",
                        self.current_span(),
                    ));
                }
                self.queue_lexed_method(fd, toks);
            } else {
                self.expect_and_consume_semi()?;
            }
            Ok(fd)
        } else {
            // Function-type state variable: not supported.
            Err(self.unimplemented("function-type state variable"))
        }
    }

    pub(crate) fn parse_function_header(
        &mut self,
        force_empty_name: bool,
        allow_modifiers: bool,
    ) -> Result<FunctionHeader, ParseError> {
        let start = self.current_span();
        let is_constructor = self.tok.is(TokenKind::Constructor);
        debug_assert!(
            is_constructor || self.tok.is(TokenKind::Function),
            "function header entered on the wrong token"
        );
        self.advance();

        let mut is_fallback = false;
        let name = if is_constructor {
            self.interner.intern("solidity.constructor")
        } else if force_empty_name || self.tok.is(TokenKind::LParen) {
            is_fallback = true;
            self.interner.intern("solidity.fallback")
        } else {
            let (name, _) = self.expect_identifier()?;
            name
        };

        let options = VarDeclOptions {
            allow_location_specifier: true,
            ..VarDeclOptions::default()
        };
        let params = self.parse_parameter_list(options, true)?;

        let mut visibility = Visibility::Default;
        let mut mutability = StateMutability::NonPayable;
        let mut modifiers = Vec::new();
        loop {
            match self.tok.kind {
                TokenKind::Ident(modifier_name) if allow_modifiers => {
                    self.advance();
                    let mut args = Vec::new();
                    if self.try_consume(TokenKind::LParen) {
                        args = self.parse_function_call_list_arguments()?;
                        self.expect_and_consume(TokenKind::RParen)?;
                    }
                    modifiers.push(ModifierInvocation {
                        name: modifier_name,
                        args,
                    });
                }
                TokenKind::Public
                | TokenKind::Private
                | TokenKind::Internal
                | TokenKind::External => {
                    visibility = self.parse_visibility_specifier();
                }
                TokenKind::Constant | TokenKind::Pure | TokenKind::View | TokenKind::Payable => {
                    mutability = self.parse_state_mutability();
                }
                _ => break,
            }
        }

        let returns = if self.try_consume(TokenKind::Returns) {
            let returns = self.parse_parameter_list(options, false)?;
            let tys = returns.params.iter().map(|&p| self.ast.var(p).ty).collect();
            self.sema.set_fn_return_types(tys);
            returns
        } else {
            ParamList::default()
        };

        Ok(FunctionHeader {
            name,
            span: start,
            visibility,
            mutability,
            is_constructor,
            is_fallback,
            params,
            returns,
            modifiers,
        })
    }

    // --- Events ---

    /// Called with the `event` keyword already consumed.
    pub(crate) fn parse_event_definition(&mut self) -> Result<EventId, ParseError> {
        let (name, span) = self.expect_identifier()?;
        let options = VarDeclOptions {
            allow_indexed: true,
            ..VarDeclOptions::default()
        };
        let params = self.parse_parameter_list(options, true)?;
        let anonymous = self.try_consume(TokenKind::Anonymous);
        self.expect_and_consume_semi()?;
        Ok(self
            .sema
            .create_event_decl(&mut self.ast, name, params, anonymous, span))
    }

    // --- Variables ---

    /// Parse a variable declaration. `lookahead_ty` carries a type already
    /// synthesized by the index-accessed-path disambiguation.
    pub(crate) fn parse_variable_declaration(
        &mut self,
        options: VarDeclOptions,
        lookahead_ty: Option<TyId>,
    ) -> Result<VarId, ParseError> {
        let start = self.current_span();
        let mut ty = match lookahead_ty {
            Some(ty) => Some(ty),
            None => match self.parse_type_name(options.allow_var) {
                Ok(ty) => Some(ty),
                Err(err) => {
                    // Keep scanning the specifier run so follow-up
                    // diagnostics land in the right place.
                    self.record(err);
                    None
                }
            },
        };

        let mut is_indexed = false;
        let mut is_constant = false;
        let mut visibility = Visibility::Default;
        let mut location = DataLocation::Unspecified;

        while self.tok.is_not(TokenKind::Eof) {
            match self.tok.kind {
                TokenKind::Public | TokenKind::Private | TokenKind::Internal
                    if options.is_state_variable =>
                {
                    visibility = self.parse_visibility_specifier();
                }
                TokenKind::Indexed if options.allow_indexed => {
                    is_indexed = true;
                    self.advance();
                }
                TokenKind::Constant => {
                    is_constant = true;
                    self.advance();
                }
                TokenKind::Memory | TokenKind::Storage | TokenKind::CallData
                    if options.allow_location_specifier =>
                {
                    if location != DataLocation::Unspecified {
                        return Err(ParseError::new(
                            DiagCode::MultipleVariableLocation,
                            "only one data location may be given",
                            self.current_span(),
                        ));
                    }
                    if ty.is_none() {
                        return Err(ParseError::new(
                            DiagCode::LocationWithoutTypeName,
                            "data location requires a preceding type name",
                            self.current_span(),
                        ));
                    }
                    location = match self.tok.kind {
                        TokenKind::Storage => DataLocation::Storage,
                        TokenKind::Memory => DataLocation::Memory,
                        _ => DataLocation::CallData,
                    };
                    self.advance();
                }
                _ => break,
            }
        }

        let name = if options.allow_empty_name && !self.tok.is_any_identifier() {
            Name::EMPTY
        } else {
            self.expect_identifier()?.0
        };

        let mut initializer = None;
        if options.allow_initial_value && self.try_consume(TokenKind::Eq) {
            let value = self.parse_expression(None)?;
            initializer = Some(value);
        }

        let Some(ty) = ty else {
            return Err(ParseError::new(
                DiagCode::ExpectedTypeName,
                "variable declaration lacks a type",
                start,
            ));
        };

        // Coerce the initializer to the declared type.
        let initializer = match initializer {
            Some(value) => {
                let value = self.sema.rvalue(&mut self.ast, value);
                Some(self.sema.coerce(&mut self.ast, &mut self.types, value, ty)?)
            }
            None => None,
        };

        let id = self.ast.alloc_var(VarDecl {
            ty,
            name,
            initializer,
            visibility,
            is_state: options.is_state_variable,
            is_indexed,
            is_constant,
            location,
            span: start,
        });
        self.sema.add_decl(name, DeclRef::Var(id));
        Ok(id)
    }

    // --- Type names ---

    /// `_allow_var` is part of the production's interface; `var` is
    /// rejected as deprecated regardless.
    pub(crate) fn parse_type_name(&mut self, _allow_var: bool) -> Result<TyId, ParseError> {
        let ty = match self.tok.kind {
            TokenKind::Bool => {
                self.advance();
                self.types.bool()
            }
            TokenKind::Uint(bits) => {
                self.advance();
                self.types.integer(IntKind::unsigned(bits))
            }
            TokenKind::Int(bits) => {
                self.advance();
                self.types.integer(IntKind::signed(bits))
            }
            TokenKind::FixedBytes(n) => {
                self.advance();
                self.types.intern(Ty::FixedBytes(n))
            }
            TokenKind::Bytes => {
                self.advance();
                self.types.intern(Ty::Bytes)
            }
            TokenKind::String => {
                self.advance();
                self.types.intern(Ty::String)
            }
            TokenKind::Address => {
                self.advance();
                let mutability = if matches!(
                    self.tok.kind,
                    TokenKind::Constant | TokenKind::Pure | TokenKind::View | TokenKind::Payable
                ) {
                    self.parse_state_mutability()
                } else {
                    StateMutability::NonPayable
                };
                self.types.address(mutability)
            }
            TokenKind::Var => {
                return Err(self.unimplemented("var"));
            }
            TokenKind::Function => {
                return Err(self.unimplemented("function type"));
            }
            TokenKind::Mapping => self.parse_mapping()?,
            TokenKind::Ident(_) => {
                return Err(self.unimplemented("user-defined type name"));
            }
            _ => {
                return Err(ParseError::new(
                    DiagCode::ExpectedTypeName,
                    format!(
                        "expected a type name, found `{}`",
                        self.tok.kind.display_name()
                    ),
                    self.current_span(),
                ));
            }
        };
        self.parse_type_name_suffix(ty)
    }

    /// `T[n]`/`T[]` suffixes, innermost first.
    pub(crate) fn parse_type_name_suffix(&mut self, mut ty: TyId) -> Result<TyId, ParseError> {
        while self.try_consume(TokenKind::LBracket) {
            if let TokenKind::Number(lexeme) = self.tok.kind {
                let text = self.interner.lookup(lexeme);
                let len = crate::literal::parse_number(text)
                    .and_then(|n| u64::try_from(n).ok())
                    .ok_or_else(|| {
                        ParseError::new(
                            DiagCode::NumberLiteralOverflow,
                            "array length does not fit",
                            self.current_span(),
                        )
                    })?;
                self.advance();
                self.expect_and_consume(TokenKind::RBracket)?;
                let loc = self.parse_data_location();
                ty = self.types.intern(Ty::Array {
                    elem: ty,
                    len: Some(len),
                    loc,
                });
            } else {
                self.expect_and_consume(TokenKind::RBracket)?;
                let loc = self.parse_data_location();
                ty = self.types.intern(Ty::Array {
                    elem: ty,
                    len: None,
                    loc,
                });
            }
        }
        Ok(ty)
    }

    /// `mapping ( KeyType => ValueType )`; keys must be elementary.
    fn parse_mapping(&mut self) -> Result<TyId, ParseError> {
        self.expect_and_consume(TokenKind::Mapping)?;
        self.expect_and_consume(TokenKind::LParen)?;
        if !self.tok.is_elementary_type_name() {
            return Err(ParseError::new(
                DiagCode::ExpectedTypeName,
                "mapping keys must be elementary types",
                self.current_span(),
            ));
        }
        let key = self.parse_type_name(false)?;
        self.expect_and_consume(TokenKind::Arrow)?;
        let value = self.parse_type_name(false)?;
        self.expect_and_consume(TokenKind::RParen)?;
        Ok(self.types.intern(Ty::Mapping { key, value }))
    }

    // --- Parameter lists ---

    pub(crate) fn parse_parameter_list(
        &mut self,
        options: VarDeclOptions,
        allow_empty: bool,
    ) -> Result<ParamList, ParseError> {
        let mut options = options;
        options.allow_empty_name = true;
        let mut params = Vec::new();

        self.expect_and_consume(TokenKind::LParen)?;
        if !allow_empty || self.tok.is_not(TokenKind::RParen) {
            params.push(self.parse_variable_declaration(options, None)?);
            while self.tok.is_not(TokenKind::RParen) {
                self.expect_and_consume(TokenKind::Comma)?;
                params.push(self.parse_variable_declaration(options, None)?);
            }
        }
        self.expect_and_consume(TokenKind::RParen)?;
        Ok(ParamList::new(params))
    }
}
