//! Diagnostic code catalogue.
//!
//! All codes are declared in a single [`define_diag_codes!`] invocation,
//! which generates the enum, `ALL`, `as_str()`, `description()` and the
//! default severity mapping.

use crate::Severity;
use std::fmt;

/// Declare all diagnostic codes in one place.
///
/// Each entry is `$variant, $id, $severity, $desc`:
/// - `$variant` — enum variant name
/// - `$id` — stable identifier string (used by `--explain`-style lookups)
/// - `$severity` — default severity
/// - `$desc` — one-line summary
macro_rules! define_diag_codes {
    ($( $variant:ident, $id:literal, $severity:ident, $desc:literal );+ $(;)?) => {
        /// Stable diagnostic identities.
        #[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
        pub enum DiagCode {
            $(
                #[doc = $desc]
                $variant,
            )+
        }

        impl DiagCode {
            /// All codes, for iteration and testing.
            pub const ALL: &'static [DiagCode] = &[ $( DiagCode::$variant, )+ ];

            /// Stable identifier string, e.g. `"err_expected"`.
            pub fn as_str(&self) -> &'static str {
                match self {
                    $( DiagCode::$variant => $id, )+
                }
            }

            /// One-line summary.
            pub fn description(&self) -> &'static str {
                match self {
                    $( DiagCode::$variant => $desc, )+
                }
            }

            /// Default severity of this code.
            pub fn severity(&self) -> Severity {
                match self {
                    $( DiagCode::$variant => Severity::$severity, )+
                }
            }
        }
    };
}

define_diag_codes! {
    // Parse errors
    ExpectedToken, "err_expected", Error, "expected a particular token";
    ExpectedAfter, "err_expected_after", Error, "expected a particular token after a construct";
    ExpectedContractKind, "err_expected_contract_kind", Error, "expected contract, interface or library";
    ExpectedVisibility, "err_expected_visibility", Error, "expected a visibility specifier";
    ExpectedStateMutability, "err_expected_state_mutability", Error, "expected a state-mutability specifier";
    ExpectedContractPart, "err_expected_contract_part", Error, "expected a contract member";
    ExpectedEvent, "err_expected_event", Error, "expected an event name";
    ExpectedTypeName, "err_expected_type_name", Error, "expected a type name";
    UnknownPragma, "err_unknown_pragma", Error, "unrecognized pragma fragment";
    UnimplementedToken, "err_unimplemented_token", Error, "construct is not supported";
    MultipleVariableLocation, "err_multiple_variable_location", Error, "more than one data location given";
    LocationWithoutTypeName, "err_location_without_typename", Error, "data location requires a type name";
    ExtraneousTokenBeforeSemi, "err_extraneous_token_before_semi", Error, "stray token before `;`";
    TrailingComma, "err_trailing_comma", Error, "trailing comma in argument list";
    NumberLiteralOverflow, "err_number_literal_overflow", Fatal, "numeric constant does not fit";
    DuplicateSpecialFunction, "err_duplicate_special_function", Fatal, "contract declares more than one constructor or fallback";

    // Semantic (actions) errors
    UndeclaredIdentifier, "err_undeclared_identifier", Error, "name does not resolve to a declaration";
    InvalidOperands, "err_invalid_operands", Error, "operand types do not combine under this operator";
    ReturnTypeMismatch, "err_return_type_mismatch", Error, "returned value does not match the declared return type";

    // Warnings
    ConstantRemoved, "warn_constant_removed", Warning, "`constant` on functions was replaced by `view`";
}

impl fmt::Display for DiagCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_unique() {
        let mut seen = std::collections::HashSet::new();
        for code in DiagCode::ALL {
            assert!(seen.insert(code.as_str()), "duplicate id {}", code.as_str());
        }
    }

    #[test]
    fn severity_mapping() {
        assert_eq!(DiagCode::ConstantRemoved.severity(), Severity::Warning);
        assert_eq!(DiagCode::ExpectedToken.severity(), Severity::Error);
        assert_eq!(DiagCode::NumberLiteralOverflow.severity(), Severity::Fatal);
    }
}
