//! Diagnostic collection.

use crate::{Diagnostic, Severity};

/// Collects diagnostics for one compiler invocation.
#[derive(Default, Debug)]
pub struct DiagnosticEngine {
    diagnostics: Vec<Diagnostic>,
    error_count: usize,
    warning_count: usize,
    saw_fatal: bool,
}

impl DiagnosticEngine {
    pub fn new() -> Self {
        DiagnosticEngine::default()
    }

    /// Record a diagnostic.
    pub fn report(&mut self, diagnostic: Diagnostic) {
        match diagnostic.severity {
            Severity::Warning => self.warning_count += 1,
            Severity::Error => self.error_count += 1,
            Severity::Fatal => {
                self.error_count += 1;
                self.saw_fatal = true;
            }
        }
        self.diagnostics.push(diagnostic);
    }

    /// True if any error- or fatal-tier diagnostic was reported.
    pub fn has_errors(&self) -> bool {
        self.error_count > 0
    }

    /// True if a fatal-tier diagnostic was reported; the driver stops
    /// after the current source unit.
    pub fn is_fatal(&self) -> bool {
        self.saw_fatal
    }

    pub fn error_count(&self) -> usize {
        self.error_count
    }

    pub fn warning_count(&self) -> usize {
        self.warning_count
    }

    /// Diagnostics sorted by source position, warnings and errors
    /// interleaved the way they appear in the file.
    pub fn sorted(&self) -> Vec<&Diagnostic> {
        let mut out: Vec<&Diagnostic> = self.diagnostics.iter().collect();
        out.sort_by_key(|d| (d.span.start, d.span.end));
        out
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Diagnostic> {
        self.diagnostics.iter()
    }

    pub fn len(&self) -> usize {
        self.diagnostics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DiagCode;
    use sol_ir::Span;

    #[test]
    fn counts_by_severity() {
        let mut engine = DiagnosticEngine::new();
        engine.report(Diagnostic::new(
            DiagCode::ConstantRemoved,
            "constant was removed",
            Span::new(0, 5),
        ));
        engine.report(Diagnostic::new(
            DiagCode::ExpectedToken,
            "expected `;`",
            Span::new(10, 11),
        ));
        assert_eq!(engine.warning_count(), 1);
        assert_eq!(engine.error_count(), 1);
        assert!(engine.has_errors());
        assert!(!engine.is_fatal());
    }

    #[test]
    fn fatal_is_sticky() {
        let mut engine = DiagnosticEngine::new();
        engine.report(Diagnostic::new(
            DiagCode::NumberLiteralOverflow,
            "number too large",
            Span::new(3, 9),
        ));
        assert!(engine.is_fatal());
        assert!(engine.has_errors());
    }

    #[test]
    fn sorted_orders_by_position() {
        let mut engine = DiagnosticEngine::new();
        engine.report(Diagnostic::new(
            DiagCode::ExpectedToken,
            "later",
            Span::new(40, 41),
        ));
        engine.report(Diagnostic::new(
            DiagCode::ExpectedToken,
            "earlier",
            Span::new(4, 5),
        ));
        let sorted = engine.sorted();
        assert_eq!(sorted[0].message, "earlier");
        assert_eq!(sorted[1].message, "later");
    }
}
