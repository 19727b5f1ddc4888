//! Parse error type.

use sol_diagnostic::{DiagCode, Diagnostic};
use sol_ir::Span;

/// Error produced by a failing parser production or actions operation.
///
/// Productions return `Err(ParseError)` one frame up; the enclosing
/// member/statement loop records the error and resynchronizes.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct ParseError {
    pub code: DiagCode,
    pub message: String,
    pub span: Span,
}

impl ParseError {
    #[cold]
    pub fn new(code: DiagCode, message: impl Into<String>, span: Span) -> Self {
        ParseError {
            code,
            message: message.into(),
            span,
        }
    }

    /// Convert into a diagnostic at the code's default severity.
    pub fn into_diagnostic(self) -> Diagnostic {
        Diagnostic::new(self.code, self.message, self.span)
    }
}
