//! Compilation pipeline: source text → tokens → AST → IR text.
//!
//! The driver stages are synchronous and single-threaded; one invocation
//! owns its interner, AST and IR module exclusively. On any error-tier
//! diagnostic the pipeline renders the collected diagnostics and produces
//! no IR.

use sol_diagnostic::{DiagCode, Diagnostic, DiagnosticEngine};
use sol_ir::StringInterner;
use sol_ssa::Target;
use tracing::debug;

/// Outcome of a failed compilation: rendered diagnostics and counts.
#[derive(Debug)]
pub struct CompileFailure {
    pub rendered: String,
    pub error_count: usize,
}

/// Compile source text to textual IR.
pub fn compile_source(
    source: &str,
    file_name: &str,
    target: Target,
) -> Result<String, CompileFailure> {
    let interner = StringInterner::new();

    debug!(file = file_name, "scanning");
    let tokens = sol_lexer::lex(source, &interner);

    debug!(file = file_name, "parsing");
    let output = sol_parse::parse(tokens, &interner);

    let mut engine = DiagnosticEngine::new();
    for error in &output.errors {
        engine.report(error.clone().into_diagnostic());
    }
    if engine.has_errors() {
        return Err(failure(&engine, source, file_name));
    }

    debug!(file = file_name, "lowering");
    let module_name = module_name_of(file_name);
    match sol_codegen::emit_source_unit(
        &output.unit,
        &output.ast,
        &output.types,
        &interner,
        &module_name,
        target,
    ) {
        Ok(module) => {
            // Surface accumulated warnings even on success.
            if !engine.is_empty() {
                eprint!("{}", sol_diagnostic::render(&engine, source, file_name));
            }
            Ok(module.to_string())
        }
        Err(err) => {
            engine.report(Diagnostic::new(
                DiagCode::UnimplementedToken,
                err.to_string(),
                err.span,
            ));
            Err(failure(&engine, source, file_name))
        }
    }
}

/// Parse only; report diagnostics without lowering.
pub fn check_source(source: &str, file_name: &str) -> Result<(), CompileFailure> {
    let interner = StringInterner::new();
    let tokens = sol_lexer::lex(source, &interner);
    let output = sol_parse::parse(tokens, &interner);

    let mut engine = DiagnosticEngine::new();
    for error in &output.errors {
        engine.report(error.clone().into_diagnostic());
    }
    if engine.has_errors() {
        return Err(failure(&engine, source, file_name));
    }
    if !engine.is_empty() {
        eprint!("{}", sol_diagnostic::render(&engine, source, file_name));
    }
    Ok(())
}

/// Render a token dump, one token per line.
pub fn lex_source(source: &str) -> String {
    let interner = StringInterner::new();
    let tokens = sol_lexer::lex(source, &interner);
    let mut out = String::new();
    for token in tokens.iter() {
        out.push_str(&format!(
            "{:>5}..{:<5} {}\n",
            token.span.start,
            token.span.end,
            describe_token(token, &interner)
        ));
    }
    out
}

/// Render a parse summary: declarations per contract.
pub fn parse_summary(source: &str, file_name: &str) -> Result<String, CompileFailure> {
    let interner = StringInterner::new();
    let tokens = sol_lexer::lex(source, &interner);
    let output = sol_parse::parse(tokens, &interner);

    let mut engine = DiagnosticEngine::new();
    for error in &output.errors {
        engine.report(error.clone().into_diagnostic());
    }
    if engine.has_errors() {
        return Err(failure(&engine, source, file_name));
    }

    let mut out = String::new();
    for item in &output.unit.items {
        match item {
            sol_ir::SourceItem::Pragma(_) => out.push_str("pragma directive\n"),
            sol_ir::SourceItem::Contract(id) => {
                let decl = output.ast.contract(*id);
                out.push_str(&format!(
                    "{:?} {}: {} function(s), {} state variable(s), {} event(s)\n",
                    decl.kind,
                    interner.lookup(decl.name),
                    decl.functions.len()
                        + usize::from(decl.constructor.is_some())
                        + usize::from(decl.fallback.is_some()),
                    decl.state_vars.len(),
                    decl.events.len()
                ));
            }
        }
    }
    Ok(out)
}

fn failure(engine: &DiagnosticEngine, source: &str, file_name: &str) -> CompileFailure {
    CompileFailure {
        rendered: sol_diagnostic::render(engine, source, file_name),
        error_count: engine.error_count(),
    }
}

fn module_name_of(file_name: &str) -> String {
    std::path::Path::new(file_name)
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or("module")
        .to_owned()
}

fn describe_token(token: &sol_ir::Token, interner: &StringInterner) -> String {
    use sol_ir::TokenKind;
    match token.kind {
        TokenKind::Ident(name) => format!("identifier `{}`", interner.lookup(name)),
        TokenKind::Number(name) => format!("number `{}`", interner.lookup(name)),
        TokenKind::Str(name) => format!("string {}", interner.lookup(name)),
        TokenKind::HexStr(name) => format!("hex string `{}`", interner.lookup(name)),
        kind => format!("`{}`", kind.display_name()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compile_produces_ir_text() {
        let source = "contract C { uint256 x; function get() public view returns (uint256) { return x; } }";
        let ir = compile_source(source, "demo.sol", Target::Evm).expect("compiles");
        assert!(ir.contains("define i256 @C.get()"));
    }

    #[test]
    fn errors_produce_rendered_diagnostics_and_no_ir() {
        let source = "contract C { function f() public { ghost = 1; } }";
        let failure = compile_source(source, "demo.sol", Target::Evm).unwrap_err();
        assert!(failure.error_count > 0);
        assert!(failure.rendered.contains("err_undeclared_identifier"));
    }

    #[test]
    fn check_accepts_valid_source() {
        assert!(check_source("contract C {}", "demo.sol").is_ok());
    }

    #[test]
    fn lex_dump_lists_tokens() {
        let dump = lex_source("contract C {}");
        assert!(dump.contains("`contract`"));
        assert!(dump.contains("identifier `C`"));
        assert!(dump.contains("`end of file`"));
    }

    #[test]
    fn parse_summary_counts_members() {
        let source =
            "contract C { uint256 x; event E(uint256 v); function f() public {} }";
        let summary = parse_summary(source, "demo.sol").expect("parses");
        assert!(summary.contains("1 function(s)"));
        assert!(summary.contains("1 state variable(s)"));
        assert!(summary.contains("1 event(s)"));
    }
}
