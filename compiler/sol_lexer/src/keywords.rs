//! Keyword resolution.
//!
//! Two-stage lookup:
//! 1. **Reserved keywords** — length-bucketed table, 2–11 characters.
//! 2. **Sized elementary types** — `uintN`/`intN` for N a multiple of 8 in
//!    8..=256, `bytesN` for N in 1..=32, classified by parsing the suffix.
//!
//! Anything that misses both stages is an ordinary identifier. In
//! particular `uint0`, `uint7`, `uint257`, `bytes0` and `bytes33` are plain
//! identifiers, not keywords.

use sol_ir::TokenKind;

/// Look up a reserved keyword or sized type name by text.
///
/// Returns `None` for regular identifiers. Length-bucketing gives fast
/// rejection: all fixed keywords are 2–11 characters.
pub(crate) fn lookup(text: &str) -> Option<TokenKind> {
    let len = text.len();
    if !(2..=11).contains(&len) {
        return None;
    }

    let fixed = match len {
        2 => match text {
            "do" => Some(TokenKind::Do),
            "if" => Some(TokenKind::If),
            "is" => Some(TokenKind::Is),
            _ => None,
        },
        3 => match text {
            "for" => Some(TokenKind::For),
            "int" => Some(TokenKind::Int(256)),
            "new" => Some(TokenKind::New),
            "var" => Some(TokenKind::Var),
            _ => None,
        },
        4 => match text {
            "bool" => Some(TokenKind::Bool),
            "else" => Some(TokenKind::Else),
            "emit" => Some(TokenKind::Emit),
            "enum" => Some(TokenKind::Enum),
            "pure" => Some(TokenKind::Pure),
            "true" => Some(TokenKind::True),
            "type" => Some(TokenKind::Type),
            "uint" => Some(TokenKind::Uint(256)),
            "view" => Some(TokenKind::View),
            _ => None,
        },
        5 => match text {
            "break" => Some(TokenKind::Break),
            "bytes" => Some(TokenKind::Bytes),
            "event" => Some(TokenKind::Event),
            "false" => Some(TokenKind::False),
            "using" => Some(TokenKind::Using),
            "while" => Some(TokenKind::While),
            _ => None,
        },
        6 => match text {
            "import" => Some(TokenKind::Import),
            "memory" => Some(TokenKind::Memory),
            "pragma" => Some(TokenKind::Pragma),
            "public" => Some(TokenKind::Public),
            "return" => Some(TokenKind::Return),
            "string" => Some(TokenKind::String),
            "struct" => Some(TokenKind::Struct),
            _ => None,
        },
        7 => match text {
            "address" => Some(TokenKind::Address),
            "indexed" => Some(TokenKind::Indexed),
            "library" => Some(TokenKind::Library),
            "mapping" => Some(TokenKind::Mapping),
            "payable" => Some(TokenKind::Payable),
            "private" => Some(TokenKind::Private),
            "returns" => Some(TokenKind::Returns),
            "storage" => Some(TokenKind::Storage),
            _ => None,
        },
        8 => match text {
            "assembly" => Some(TokenKind::Assembly),
            "calldata" => Some(TokenKind::CallData),
            "constant" => Some(TokenKind::Constant),
            "continue" => Some(TokenKind::Continue),
            "contract" => Some(TokenKind::Contract),
            "external" => Some(TokenKind::External),
            "function" => Some(TokenKind::Function),
            "internal" => Some(TokenKind::Internal),
            "modifier" => Some(TokenKind::Modifier),
            _ => None,
        },
        9 => match text {
            "anonymous" => Some(TokenKind::Anonymous),
            "interface" => Some(TokenKind::Interface),
            _ => None,
        },
        11 => match text {
            "constructor" => Some(TokenKind::Constructor),
            _ => None,
        },
        _ => None,
    };

    fixed.or_else(|| sized_type(text))
}

/// Classify a sized elementary type name.
fn sized_type(text: &str) -> Option<TokenKind> {
    if let Some(digits) = text.strip_prefix("uint") {
        integer_width(digits).map(TokenKind::Uint)
    } else if let Some(digits) = text.strip_prefix("int") {
        integer_width(digits).map(TokenKind::Int)
    } else if let Some(digits) = text.strip_prefix("bytes") {
        bytes_width(digits).map(TokenKind::FixedBytes)
    } else {
        None
    }
}

/// Integer widths: multiples of 8 in 8..=256, canonically spelled
/// (no leading zeros).
fn integer_width(digits: &str) -> Option<u16> {
    if digits.is_empty() || digits.len() > 3 || digits.starts_with('0') {
        return None;
    }
    let n: u16 = digits.parse().ok()?;
    ((8..=256).contains(&n) && n % 8 == 0).then_some(n)
}

/// Fixed-bytes widths: 1..=32, canonically spelled.
fn bytes_width(digits: &str) -> Option<u8> {
    if digits.is_empty() || digits.len() > 2 || digits.starts_with('0') {
        return None;
    }
    let n: u8 = digits.parse().ok()?;
    (1..=32).contains(&n).then_some(n)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_keywords() {
        assert_eq!(lookup("contract"), Some(TokenKind::Contract));
        assert_eq!(lookup("constructor"), Some(TokenKind::Constructor));
        assert_eq!(lookup("calldata"), Some(TokenKind::CallData));
        assert_eq!(lookup("balance"), None);
    }

    #[test]
    fn default_width_spellings() {
        assert_eq!(lookup("uint"), Some(TokenKind::Uint(256)));
        assert_eq!(lookup("int"), Some(TokenKind::Int(256)));
        assert_eq!(lookup("bytes"), Some(TokenKind::Bytes));
    }

    #[test]
    fn sized_integer_families() {
        assert_eq!(lookup("uint8"), Some(TokenKind::Uint(8)));
        assert_eq!(lookup("uint256"), Some(TokenKind::Uint(256)));
        assert_eq!(lookup("int104"), Some(TokenKind::Int(104)));
        // Not multiples of 8 / out of range / non-canonical
        assert_eq!(lookup("uint0"), None);
        assert_eq!(lookup("uint7"), None);
        assert_eq!(lookup("uint257"), None);
        assert_eq!(lookup("uint2560"), None);
        assert_eq!(lookup("uint08"), None);
    }

    #[test]
    fn sized_bytes_family() {
        assert_eq!(lookup("bytes1"), Some(TokenKind::FixedBytes(1)));
        assert_eq!(lookup("bytes32"), Some(TokenKind::FixedBytes(32)));
        assert_eq!(lookup("bytes0"), None);
        assert_eq!(lookup("bytes33"), None);
    }
}
