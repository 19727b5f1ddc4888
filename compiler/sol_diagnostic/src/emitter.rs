//! Terminal rendering.

use crate::DiagnosticEngine;

/// 1-based line and column of a byte offset.
fn line_col(source: &str, offset: u32) -> (u32, u32) {
    let offset = (offset as usize).min(source.len());
    let mut line = 1u32;
    let mut col = 1u32;
    for byte in source.as_bytes()[..offset].iter() {
        if *byte == b'\n' {
            line += 1;
            col = 1;
        } else {
            col += 1;
        }
    }
    (line, col)
}

/// Render every collected diagnostic, sorted by source position:
///
/// ```text
/// error[err_expected]: expected `;`
///   --> demo.sol:3:14
/// ```
pub fn render(engine: &DiagnosticEngine, source: &str, file: &str) -> String {
    let mut out = String::new();
    for diag in engine.sorted() {
        let (line, col) = line_col(source, diag.span.start);
        out.push_str(&format!(
            "{}[{}]: {}\n  --> {}:{}:{}\n",
            diag.severity, diag.code, diag.message, file, line, col
        ));
    }
    if engine.has_errors() {
        out.push_str(&format!(
            "{} error(s), {} warning(s) emitted\n",
            engine.error_count(),
            engine.warning_count()
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DiagCode, Diagnostic};
    use sol_ir::Span;

    #[test]
    fn renders_line_and_column() {
        let source = "contract C {\n  uint256 x\n}\n";
        let mut engine = DiagnosticEngine::new();
        // Points at the `}` on line 3.
        engine.report(Diagnostic::new(
            DiagCode::ExpectedToken,
            "expected `;`",
            Span::new(25, 26),
        ));
        let rendered = render(&engine, source, "demo.sol");
        assert!(rendered.contains("error[err_expected]: expected `;`"));
        assert!(rendered.contains("demo.sol:3:1"));
        assert!(rendered.contains("1 error(s)"));
    }

    #[test]
    fn warnings_alone_have_no_summary_line() {
        let mut engine = DiagnosticEngine::new();
        engine.report(Diagnostic::new(
            DiagCode::ConstantRemoved,
            "use view instead",
            Span::new(0, 1),
        ));
        let rendered = render(&engine, "constant", "demo.sol");
        assert!(rendered.contains("warning[warn_constant_removed]"));
        assert!(!rendered.contains("error(s)"));
    }
}
