//! Parser integration tests: real scanner, real parser, arena inspection.

use sol_diagnostic::DiagCode;
use sol_ir::{
    Ast, BinaryOp, ContractId, DataLocation, DeclRef, ExprId, ExprKind, IntKind, StateMutability,
    StmtId, StmtKind, StringInterner, Ty, TyId,
};

use crate::{parse, ParseOutput};

fn parse_source(source: &str) -> (ParseOutput, StringInterner) {
    let interner = StringInterner::new();
    let tokens = sol_lexer::lex(source, &interner);
    let output = parse(tokens, &interner);
    (output, interner)
}

fn only_contract(output: &ParseOutput) -> ContractId {
    let contracts: Vec<_> = output
        .unit
        .items
        .iter()
        .filter_map(|item| match item {
            sol_ir::SourceItem::Contract(id) => Some(*id),
            sol_ir::SourceItem::Pragma(_) => None,
        })
        .collect();
    assert_eq!(contracts.len(), 1, "expected exactly one contract");
    contracts[0]
}

/// Strip parens and implicit casts to reach the interesting node.
fn strip(ast: &Ast, mut id: ExprId) -> ExprId {
    loop {
        match &ast.expr(id).kind {
            ExprKind::Paren(sub) | ExprKind::ImplicitCast { sub, .. } => id = *sub,
            _ => return id,
        }
    }
}

fn body_stmts(ast: &Ast, body: StmtId) -> Vec<StmtId> {
    match &ast.stmt(body).kind {
        StmtKind::Block(stmts) => stmts.clone(),
        other => panic!("function body is not a block: {other:?}"),
    }
}

/// Parse a contract with one function wrapping `body_src`, and return the
/// statements of that function's body.
fn parse_body(body_src: &str) -> (ParseOutput, Vec<StmtId>) {
    let source = format!(
        "contract T {{ function f(uint256 a, uint256 b, uint256 c, uint256 d, uint256 e) public {{ {body_src} }} }}"
    );
    let (output, _interner) = parse_source(&source);
    assert!(
        !output.has_errors(),
        "unexpected errors: {:?}",
        output.errors
    );
    let contract = only_contract(&output);
    let func = output.ast.contract(contract).functions[0];
    let body = output.ast.function(func).body.expect("body parsed");
    let stmts = body_stmts(&output.ast, body);
    (output, stmts)
}

fn expect_binary(ast: &Ast, id: ExprId, op: BinaryOp) -> (ExprId, ExprId) {
    match &ast.expr(strip(ast, id)).kind {
        ExprKind::Binary {
            op: actual,
            lhs,
            rhs,
        } => {
            assert_eq!(*actual, op, "wrong operator");
            (*lhs, *rhs)
        }
        other => panic!("expected binary {op:?}, got {other:?}"),
    }
}

// --- Precedence and associativity ---

#[test]
fn precedence_groups_mul_before_add() {
    let source = "contract T { function f(uint256 a, uint256 b, uint256 c, uint256 d, uint256 e) public { a = b + c * d - e; } }";
    let (output, _) = parse_source(source);
    assert!(!output.has_errors(), "{:?}", output.errors);
    let contract = only_contract(&output);
    let func = output.ast.contract(contract).functions[0];
    let body = output.ast.function(func).body.unwrap();
    let stmts = body_stmts(&output.ast, body);
    let StmtKind::Expr(expr) = output.ast.stmt(stmts[0]).kind else {
        panic!("expected expression statement");
    };

    // Assign(a, Sub(Add(b, Mul(c, d)), e))
    let ast = &output.ast;
    let (_, rhs) = expect_binary(ast, expr, BinaryOp::Assign);
    let (sub_lhs, _e) = expect_binary(ast, rhs, BinaryOp::Sub);
    let (_b, add_rhs) = expect_binary(ast, sub_lhs, BinaryOp::Add);
    expect_binary(ast, add_rhs, BinaryOp::Mul);
}

#[test]
fn assignment_is_right_associative() {
    let (output, stmts) = parse_body("a = b = c;");
    let ast = &output.ast;
    let StmtKind::Expr(expr) = ast.stmt(stmts[0]).kind else {
        panic!("expected expression statement");
    };
    let (_a, rhs) = expect_binary(ast, expr, BinaryOp::Assign);
    // Inner assignment sits on the right.
    expect_binary(ast, rhs, BinaryOp::Assign);
}

#[test]
fn ternary_is_right_associative() {
    let (output, stmts) = parse_body("a = a == b ? b : c == d ? d : e;");
    let ast = &output.ast;
    let StmtKind::Expr(expr) = ast.stmt(stmts[0]).kind else {
        panic!("expected expression statement");
    };
    let (_a, rhs) = expect_binary(ast, expr, BinaryOp::Assign);
    match &ast.expr(strip(ast, rhs)).kind {
        ExprKind::Conditional { else_expr, .. } => {
            match &ast.expr(strip(ast, *else_expr)).kind {
                ExprKind::Conditional { .. } => {}
                other => panic!("else branch should be the nested conditional, got {other:?}"),
            }
        }
        other => panic!("expected conditional, got {other:?}"),
    }
}

#[test]
fn exponent_binds_tighter_than_multiply() {
    let (output, stmts) = parse_body("a = b * c ** d;");
    let ast = &output.ast;
    let StmtKind::Expr(expr) = ast.stmt(stmts[0]).kind else {
        panic!("expected expression statement");
    };
    let (_, rhs) = expect_binary(ast, expr, BinaryOp::Assign);
    let (_, mul_rhs) = expect_binary(ast, rhs, BinaryOp::Mul);
    expect_binary(ast, mul_rhs, BinaryOp::Exp);
}

// --- Declaration vs. expression disambiguation ---

#[test]
fn array_declaration_vs_index_assignment() {
    let (output, stmts) = parse_body("uint256[3] memory x; x[0] = 1;");
    let ast = &output.ast;

    let StmtKind::Decl { vars, .. } = &ast.stmt(stmts[0]).kind else {
        panic!("first statement should declare");
    };
    let var = ast.var(vars[0]);
    match output.types.get(var.ty) {
        Ty::Array { elem, len, loc } => {
            assert_eq!(*len, Some(3));
            assert_eq!(*loc, DataLocation::Memory);
            assert_eq!(
                output.types.get(*elem),
                &Ty::Integer(IntKind::unsigned(256))
            );
        }
        other => panic!("expected array type, got {other:?}"),
    }

    let StmtKind::Expr(expr) = ast.stmt(stmts[1]).kind else {
        panic!("second statement should be an expression");
    };
    let (lhs, _) = expect_binary(ast, expr, BinaryOp::Assign);
    match &ast.expr(strip(ast, lhs)).kind {
        ExprKind::Index { .. } => {}
        other => panic!("expected index access, got {other:?}"),
    }
}

#[test]
fn dotted_path_with_index_declares() {
    // `lib.Position[9] x;` — a recognized type path with an index is a
    // declaration with a synthesized array-of-user-defined type.
    let (output, stmts) = parse_body("lib.Position[9] x;");
    let ast = &output.ast;
    let StmtKind::Decl { vars, .. } = &ast.stmt(stmts[0]).kind else {
        panic!("expected a declaration statement");
    };
    match output.types.get(ast.var(vars[0]).ty) {
        Ty::Array { elem, len, .. } => {
            assert_eq!(*len, Some(9));
            assert!(matches!(output.types.get(*elem), Ty::UserDefined(_)));
        }
        other => panic!("expected array of user-defined type, got {other:?}"),
    }
}

#[test]
fn member_index_assignment_is_expression() {
    let (output, stmts) = parse_body("a = 1; e.el[3] = 7;");
    let ast = &output.ast;
    let StmtKind::Expr(expr) = ast.stmt(stmts[1]).kind else {
        panic!("expected an expression statement");
    };
    let (lhs, _) = expect_binary(ast, expr, BinaryOp::Assign);
    match &ast.expr(strip(ast, lhs)).kind {
        ExprKind::Index { base, .. } => match &ast.expr(strip(ast, *base)).kind {
            ExprKind::Member { .. } => {}
            other => panic!("expected member base, got {other:?}"),
        },
        other => panic!("expected index access, got {other:?}"),
    }
}

// --- Deferred body parsing ---

#[test]
fn bodies_see_later_declarations() {
    let source = "contract C { function a() public { b(); } function b() public {} }";
    let (output, interner) = parse_source(source);
    assert!(!output.has_errors(), "{:?}", output.errors);

    let contract = only_contract(&output);
    let func_a = output.ast.contract(contract).functions[0];
    let body = output.ast.function(func_a).body.expect("body attached");
    let stmts = body_stmts(&output.ast, body);
    let StmtKind::Expr(call) = output.ast.stmt(stmts[0]).kind else {
        panic!("expected a call statement");
    };
    let ExprKind::Call { callee, .. } = &output.ast.expr(call).kind else {
        panic!("expected call expression");
    };
    // `b` resolved to the function declared after `a`.
    match &output.ast.expr(strip(&output.ast, *callee)).kind {
        ExprKind::Ident { name, decl } => {
            assert_eq!(interner.lookup(*name), "b");
            assert!(matches!(decl, Some(DeclRef::Function(_))));
        }
        other => panic!("expected resolved identifier, got {other:?}"),
    }
}

#[test]
fn state_variables_resolve_inside_bodies() {
    let source = "pragma solidity ^0.5.0;\ncontract C { uint256 x; function set(uint256 v) public { x = v; } function get() public view returns (uint256) { return x; } }";
    let (output, _) = parse_source(source);
    assert!(!output.has_errors(), "{:?}", output.errors);
    let contract = only_contract(&output);
    assert_eq!(output.ast.contract(contract).functions.len(), 2);
    assert_eq!(output.ast.contract(contract).state_vars.len(), 1);
}

// --- Error recovery ---

#[test]
fn stray_semicolon_is_swallowed_once() {
    let source = "contract C { function f() public { return (1);; } }";
    let (output, _) = parse_source(source);
    let extraneous: Vec<_> = output
        .errors
        .iter()
        .filter(|e| e.code == DiagCode::ExtraneousTokenBeforeSemi)
        .collect();
    assert_eq!(extraneous.len(), 1, "{:?}", output.errors);
    // Parsing continued: the function body is attached.
    let contract = only_contract(&output);
    let func = output.ast.contract(contract).functions[0];
    assert!(output.ast.function(func).body.is_some());
}

#[test]
fn stray_rparen_before_semi_recovers() {
    let source = "contract C { function f(uint256 a) public { a = 1); a = 2; } }";
    let (output, _) = parse_source(source);
    assert!(output
        .errors
        .iter()
        .any(|e| e.code == DiagCode::ExtraneousTokenBeforeSemi));
    let contract = only_contract(&output);
    let func = output.ast.contract(contract).functions[0];
    let body = output.ast.function(func).body.unwrap();
    assert_eq!(body_stmts(&output.ast, body).len(), 2);
}

#[test]
fn unsupported_member_aborts_contract() {
    let source = "contract C { struct S { uint256 a; } }";
    let (output, _) = parse_source(source);
    assert!(output
        .errors
        .iter()
        .any(|e| e.code == DiagCode::UnimplementedToken));
}

#[test]
fn undeclared_identifier_is_reported() {
    let source = "contract C { function f() public { ghost = 1; } }";
    let (output, _) = parse_source(source);
    assert!(output
        .errors
        .iter()
        .any(|e| e.code == DiagCode::UndeclaredIdentifier));
}

// --- Declarations ---

#[test]
fn contract_header_with_bases_is_recorded() {
    let source = "contract C is A(1, 2), B { }";
    let (output, interner) = parse_source(source);
    assert!(!output.has_errors(), "{:?}", output.errors);
    let contract = only_contract(&output);
    let decl = output.ast.contract(contract);
    assert_eq!(decl.bases.len(), 2);
    assert_eq!(interner.lookup(decl.bases[0].base_name), "A");
    assert_eq!(decl.bases[0].args.len(), 2);
    assert!(decl.bases[1].args.is_empty());
}

#[test]
fn empty_contract_parses() {
    let (output, _) = parse_source("contract Empty {}");
    assert!(!output.has_errors());
    let contract = only_contract(&output);
    let decl = output.ast.contract(contract);
    assert!(decl.functions.is_empty());
    assert!(decl.state_vars.is_empty());
}

#[test]
fn constructor_and_fallback_are_separated() {
    let source =
        "contract C { constructor() public {} function () external {} function f() public {} }";
    let (output, interner) = parse_source(source);
    assert!(!output.has_errors(), "{:?}", output.errors);
    let contract = only_contract(&output);
    let decl = output.ast.contract(contract);
    let ctor = decl.constructor.expect("constructor recorded");
    let fallback = decl.fallback.expect("fallback recorded");
    assert_eq!(
        interner.lookup(output.ast.function(ctor).name),
        "solidity.constructor"
    );
    assert_eq!(
        interner.lookup(output.ast.function(fallback).name),
        "solidity.fallback"
    );
    assert!(output.ast.function(fallback).params.is_empty());
    assert_eq!(decl.functions.len(), 1);
}

#[test]
fn duplicate_constructor_is_fatal() {
    let source = "contract C { constructor() public {} constructor() public {} }";
    let (output, _) = parse_source(source);
    assert!(output
        .errors
        .iter()
        .any(|e| e.code == DiagCode::DuplicateSpecialFunction));
}

#[test]
fn address_payable_distinct_from_address() {
    let (output, stmts) = parse_body("address payable p; address q;");
    let ast = &output.ast;
    let ty_of = |stmt: StmtId| -> TyId {
        match &ast.stmt(stmt).kind {
            StmtKind::Decl { vars, .. } => ast.var(vars[0]).ty,
            other => panic!("expected declaration, got {other:?}"),
        }
    };
    assert_eq!(
        output.types.get(ty_of(stmts[0])),
        &Ty::Address(StateMutability::Payable)
    );
    assert_eq!(
        output.types.get(ty_of(stmts[1])),
        &Ty::Address(StateMutability::NonPayable)
    );
}

#[test]
fn constant_function_warns_and_means_view() {
    let source = "contract C { uint256 x; function f() public constant returns (uint256) { return x; } }";
    let (output, _) = parse_source(source);
    assert!(output
        .errors
        .iter()
        .any(|e| e.code == DiagCode::ConstantRemoved));
    let contract = only_contract(&output);
    let func = output.ast.contract(contract).functions[0];
    assert_eq!(
        output.ast.function(func).mutability,
        StateMutability::View
    );
}

#[test]
fn event_declaration_with_indexed_params() {
    let source = "contract C { event Transfer(address indexed from, address indexed to, uint256 value); }";
    let (output, interner) = parse_source(source);
    assert!(!output.has_errors(), "{:?}", output.errors);
    let contract = only_contract(&output);
    let event = output.ast.contract(contract).events[0];
    let decl = output.ast.event(event);
    assert_eq!(interner.lookup(decl.name), "Transfer");
    assert_eq!(decl.params.params.len(), 3);
    assert!(output.ast.var(decl.params.params[0]).is_indexed);
    assert!(!output.ast.var(decl.params.params[2]).is_indexed);
}

#[test]
fn mapping_state_variable() {
    let source = "contract C { mapping(address => uint256) balances; }";
    let (output, _) = parse_source(source);
    assert!(!output.has_errors(), "{:?}", output.errors);
    let contract = only_contract(&output);
    let var = output.ast.contract(contract).state_vars[0];
    match output.types.get(output.ast.var(var).ty) {
        Ty::Mapping { key, value } => {
            assert!(matches!(output.types.get(*key), Ty::Address(_)));
            assert_eq!(
                output.types.get(*value),
                &Ty::Integer(IntKind::unsigned(256))
            );
        }
        other => panic!("expected mapping, got {other:?}"),
    }
}

#[test]
fn multiple_data_locations_rejected() {
    let source = "contract C { function f(uint256 memory storage a) public {} }";
    let (output, _) = parse_source(source);
    assert!(output
        .errors
        .iter()
        .any(|e| e.code == DiagCode::MultipleVariableLocation));
}

// --- Statements ---

#[test]
fn while_condition_uses_parentheses() {
    let (output, stmts) = parse_body("while (a < b) { a = a + 1; }");
    let ast = &output.ast;
    match &ast.stmt(stmts[0]).kind {
        StmtKind::While {
            is_do_while: false, ..
        } => {}
        other => panic!("expected while statement, got {other:?}"),
    }
}

#[test]
fn do_while_condition_uses_parentheses() {
    let (output, stmts) = parse_body("do { a = a + 1; } while (a < b);");
    let ast = &output.ast;
    match &ast.stmt(stmts[0]).kind {
        StmtKind::While {
            is_do_while: true, ..
        } => {}
        other => panic!("expected do-while statement, got {other:?}"),
    }
}

#[test]
fn for_statement_with_all_clauses() {
    let (output, stmts) = parse_body("for (uint256 i = 0; i < a; i++) { b = b + i; }");
    let ast = &output.ast;
    match &ast.stmt(stmts[0]).kind {
        StmtKind::For {
            init: Some(_),
            cond: Some(_),
            step: Some(_),
            ..
        } => {}
        other => panic!("expected fully-populated for, got {other:?}"),
    }
}

#[test]
fn break_and_continue_parse_inside_loops() {
    let (_, stmts) = parse_body("while (a < b) { if (a == c) { break; } continue; }");
    assert_eq!(stmts.len(), 1);
}

#[test]
fn emit_statement_builds_a_call() {
    let source = r#"contract C { event E(uint256 k, bytes v); function f() public { emit E(1, hex"aa"); } }"#;
    let (output, _) = parse_source(source);
    assert!(!output.has_errors(), "{:?}", output.errors);
    let contract = only_contract(&output);
    let func = output.ast.contract(contract).functions[0];
    let body = output.ast.function(func).body.unwrap();
    let stmts = body_stmts(&output.ast, body);
    let StmtKind::Emit { call } = output.ast.stmt(stmts[0]).kind else {
        panic!("expected emit statement");
    };
    let ExprKind::Call { args, .. } = &output.ast.expr(call).kind else {
        panic!("emit payload should be a call");
    };
    assert_eq!(args.len(), 2);
    // The hex literal decoded to bytes.
    match &output.ast.expr(strip(&output.ast, args[1])).kind {
        ExprKind::HexLit(bytes) => assert_eq!(bytes, &[0xAA]),
        other => panic!("expected hex literal, got {other:?}"),
    }
}

// --- Literals and casts ---

#[test]
fn number_literal_overflow_is_fatal() {
    let source =
        "contract C { function f(uint256 a) public { a = 340282366920938463463374607431768211456; } }";
    let (output, _) = parse_source(source);
    assert!(output
        .errors
        .iter()
        .any(|e| e.code == DiagCode::NumberLiteralOverflow));
}

#[test]
fn elementary_cast_of_address_is_payable() {
    let (output, stmts) = parse_body("a = uint256(b); address payable p = address(a);");
    let ast = &output.ast;
    // Second statement: initializer is an address(…) cast to payable.
    let StmtKind::Decl {
        init: Some(init), ..
    } = &ast.stmt(stmts[1]).kind
    else {
        panic!("expected declaration with initializer");
    };
    let cast = strip(ast, *init);
    match &ast.expr(cast).kind {
        ExprKind::ExplicitCast { .. } => {
            assert_eq!(
                output.types.get(ast.expr(cast).ty.unwrap()),
                &Ty::Address(StateMutability::Payable)
            );
        }
        other => panic!("expected explicit cast, got {other:?}"),
    }
}

#[test]
fn prefix_and_postfix_increment() {
    let (output, stmts) = parse_body("++a; a++;");
    let ast = &output.ast;
    let unary = |stmt: StmtId| match &ast.stmt(stmt).kind {
        StmtKind::Expr(e) => match &ast.expr(strip(ast, *e)).kind {
            ExprKind::Unary { prefix, .. } => *prefix,
            other => panic!("expected unary, got {other:?}"),
        },
        other => panic!("expected expression statement, got {other:?}"),
    };
    assert!(unary(stmts[0]));
    assert!(!unary(stmts[1]));
}

#[test]
fn string_literal_unescapes() {
    let (output, stmts) = parse_body(r#"string memory s = "a\nb";"#);
    let ast = &output.ast;
    let StmtKind::Decl {
        init: Some(init), ..
    } = &ast.stmt(stmts[0]).kind
    else {
        panic!("expected declaration with initializer");
    };
    match &ast.expr(strip(ast, *init)).kind {
        ExprKind::StringLit(_) => {}
        other => panic!("expected string literal, got {other:?}"),
    }
}

#[test]
fn pragma_is_accepted_and_ignored() {
    let (output, _) = parse_source("pragma solidity ^0.5.0;\ncontract C {}");
    assert!(!output.has_errors(), "{:?}", output.errors);
    assert_eq!(output.unit.items.len(), 2);
}

// --- Scope-lookup soundness ---

struct ResolutionChecker {
    idents: usize,
    unresolved: usize,
}

impl sol_ir::Visit for ResolutionChecker {
    fn visit_expr(&mut self, ast: &Ast, id: ExprId) {
        if let ExprKind::Ident { decl, .. } = &ast.expr(id).kind {
            self.idents += 1;
            if decl.is_none() {
                self.unresolved += 1;
            }
        }
        sol_ir::walk_expr(self, ast, id);
    }
}

#[test]
fn every_surviving_identifier_is_resolved() {
    let source = "contract C { uint256 x; \
        event E(uint256 v); \
        function set(uint256 v) public { x = v; emit E(v); } \
        function bump() public { set(x + 1); } }";
    let (output, _) = parse_source(source);
    assert!(!output.has_errors(), "{:?}", output.errors);

    let contract = only_contract(&output);
    let mut checker = ResolutionChecker {
        idents: 0,
        unresolved: 0,
    };
    for &func in &output.ast.contract(contract).functions {
        let body = output.ast.function(func).body.expect("body parsed");
        sol_ir::walk_stmt(&mut checker, &output.ast, body);
    }
    assert!(checker.idents > 0, "walker saw no identifiers");
    assert_eq!(checker.unresolved, 0, "unresolved identifiers survived");
}

// --- Round-trip idempotence ---

/// Canonical, fully parenthesized rendering of an expression. Implicit
/// casts and source parens are invisible, so printing is stable across a
/// print → parse → print cycle.
fn render_expr(output: &ParseOutput, interner: &StringInterner, id: ExprId) -> String {
    let ast = &output.ast;
    match &ast.expr(id).kind {
        ExprKind::Paren(sub) | ExprKind::ImplicitCast { sub, .. } => {
            render_expr(output, interner, *sub)
        }
        ExprKind::Ident { name, .. } => interner.lookup(*name).to_owned(),
        ExprKind::BoolLit(v) => v.to_string(),
        ExprKind::NumberLit(v) => v.to_string(),
        ExprKind::StringLit(name) => format!("{:?}", interner.lookup(*name)),
        ExprKind::HexLit(bytes) => {
            let digits: String = bytes.iter().map(|b| format!("{b:02x}")).collect();
            format!("hex\"{digits}\"")
        }
        ExprKind::Unary { op, sub, prefix } => {
            let sub = render_expr(output, interner, *sub);
            let op = match op {
                sol_ir::UnaryOp::Inc => "++",
                sol_ir::UnaryOp::Dec => "--",
                sol_ir::UnaryOp::Plus => "+",
                sol_ir::UnaryOp::Minus => "-",
                sol_ir::UnaryOp::BitNot => "~",
                sol_ir::UnaryOp::Not => "!",
                sol_ir::UnaryOp::AddrOf => "&",
                sol_ir::UnaryOp::Deref => "*",
            };
            if *prefix {
                format!("({op}{sub})")
            } else {
                format!("({sub}{op})")
            }
        }
        ExprKind::Binary { op, lhs, rhs } => {
            let lhs = render_expr(output, interner, *lhs);
            let rhs = render_expr(output, interner, *rhs);
            let op = match op {
                BinaryOp::Exp => "**",
                BinaryOp::Mul => "*",
                BinaryOp::Div => "/",
                BinaryOp::Rem => "%",
                BinaryOp::Add => "+",
                BinaryOp::Sub => "-",
                BinaryOp::Shl => "<<",
                BinaryOp::Shr => ">>",
                BinaryOp::BitAnd => "&",
                BinaryOp::BitXor => "^",
                BinaryOp::BitOr => "|",
                BinaryOp::Lt => "<",
                BinaryOp::Gt => ">",
                BinaryOp::Le => "<=",
                BinaryOp::Ge => ">=",
                BinaryOp::Eq => "==",
                BinaryOp::Ne => "!=",
                BinaryOp::LogicalAnd => "&&",
                BinaryOp::LogicalOr => "||",
                BinaryOp::Assign => "=",
                BinaryOp::MulAssign => "*=",
                BinaryOp::DivAssign => "/=",
                BinaryOp::RemAssign => "%=",
                BinaryOp::AddAssign => "+=",
                BinaryOp::SubAssign => "-=",
                BinaryOp::ShlAssign => "<<=",
                BinaryOp::ShrAssign => ">>=",
                BinaryOp::AndAssign => "&=",
                BinaryOp::XorAssign => "^=",
                BinaryOp::OrAssign => "|=",
            };
            format!("({lhs} {op} {rhs})")
        }
        ExprKind::ExplicitCast { sub, .. } => {
            let target = output
                .types
                .canonical_name(ast.expr(id).ty.expect("casts are typed"), interner);
            let sub = render_expr(output, interner, *sub);
            format!("{target}({sub})")
        }
        ExprKind::Call { callee, args } => {
            let callee = render_expr(output, interner, *callee);
            let args = args
                .iter()
                .map(|&a| render_expr(output, interner, a))
                .collect::<Vec<_>>()
                .join(", ");
            format!("{callee}({args})")
        }
        ExprKind::Member { base, member } => {
            format!(
                "{}.{}",
                render_expr(output, interner, *base),
                interner.lookup(*member)
            )
        }
        ExprKind::Index { base, index } => {
            let base = render_expr(output, interner, *base);
            match index {
                Some(index) => format!("{base}[{}]", render_expr(output, interner, *index)),
                None => format!("{base}[]"),
            }
        }
        ExprKind::Conditional {
            cond,
            then_expr,
            else_expr,
        } => format!(
            "({} ? {} : {})",
            render_expr(output, interner, *cond),
            render_expr(output, interner, *then_expr),
            render_expr(output, interner, *else_expr)
        ),
        ExprKind::New(ty) => format!("new {}", output.types.canonical_name(*ty, interner)),
    }
}

/// Parse a single expression statement and render it canonically.
fn render_of(expr_src: &str) -> String {
    let source = format!(
        "contract T {{ function f(uint256 a, uint256 b, uint256 c, uint256 d, uint256 e) public {{ {expr_src}; }} }}"
    );
    let (output, interner) = parse_source(&source);
    assert!(!output.has_errors(), "{:?}", output.errors);
    let contract = only_contract(&output);
    let func = output.ast.contract(contract).functions[0];
    let body = output.ast.function(func).body.expect("body parsed");
    let stmts = body_stmts(&output.ast, body);
    let StmtKind::Expr(expr) = output.ast.stmt(stmts[0]).kind else {
        panic!("expected an expression statement for `{expr_src}`");
    };
    render_expr(&output, &interner, expr)
}

#[test]
fn reparsing_the_rendering_is_idempotent() {
    // For every accepted expression, rendering and re-parsing the
    // rendering reproduces the same tree (modulo positions).
    let cases = [
        "a = b + c * d - e",
        "a = b = c",
        "a + b * c ** d",
        "(a + b) * c",
        "a < b && c >= d || !e",
        "a & b | c ^ d << e",
        "-a + ~b",
        "a == b ? c : d == e ? a : b",
        "c(a, b)",
        "a++",
        "--b",
    ];
    for case in cases {
        let first = render_of(case);
        // Re-parse the canonical form and render again.
        let second = render_of(&first);
        assert_eq!(first, second, "round-trip diverged for `{case}`");
    }
}
