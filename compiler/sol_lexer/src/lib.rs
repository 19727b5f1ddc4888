//! Scanner for the contract language.
//!
//! [`lex()`] converts source text into a [`TokenList`]; [`TokenStream`]
//! feeds it to the parser one token at a time with replay support for
//! deferred function bodies.
//!
//! # Token kinds produced
//!
//! - **Keywords**: the reserved words and the sized elementary-type
//!   families (classified in [`keywords`], not in the tokenizer state
//!   machine).
//! - **Identifiers**: interned.
//! - **Literals**: numeric constants and string literals keep their raw
//!   lexeme (quotes included — the parser unescapes); hex string literals
//!   are delivered with the `hex"`/`"` delimiters stripped and an even
//!   digit count enforced here.
//! - **Punctuators**: the full C-family set including compound assignments
//!   and `=>`.
//! - **Special**: `Error` for invalid input (scanning continues), `Eof`
//!   always last.

mod keywords;
mod raw_token;
mod stream;

pub use stream::TokenStream;

use logos::Logos;
use sol_ir::{Span, StringInterner, Token, TokenKind, TokenList};

use raw_token::RawToken;

/// Lex source text into a [`TokenList`].
pub fn lex(source: &str, interner: &StringInterner) -> TokenList {
    let mut result = TokenList::new();
    let mut lexer = RawToken::lexer(source);

    while let Some(raw) = lexer.next() {
        let range = lexer.span();
        let span = Span::new(range.start as u32, range.end as u32);
        let slice = lexer.slice();

        match raw {
            Ok(RawToken::LineComment | RawToken::BlockComment) => {}
            Ok(raw) => {
                let kind = convert_token(raw, slice, interner);
                result.push(Token::new(kind, span));
            }
            Err(()) => {
                result.push(Token::new(TokenKind::Error, span));
            }
        }
    }

    let eof = u32::try_from(source.len()).unwrap_or(u32::MAX);
    result.push(Token::new(TokenKind::Eof, Span::point(eof)));
    result
}

/// Convert a raw token to a [`TokenKind`], interning payloads.
fn convert_token(raw: RawToken, slice: &str, interner: &StringInterner) -> TokenKind {
    match raw {
        RawToken::Ident => {
            keywords::lookup(slice).unwrap_or_else(|| TokenKind::Ident(interner.intern(slice)))
        }
        RawToken::Number => TokenKind::Number(interner.intern(slice)),
        // Quotes are kept; the parser owns unescaping.
        RawToken::StringLit => TokenKind::Str(interner.intern(slice)),
        RawToken::HexString => {
            // hex"AABB" -> AABB. Odd digit runs are malformed.
            let digits = &slice[4..slice.len() - 1];
            if digits.len() % 2 != 0 {
                TokenKind::Error
            } else {
                TokenKind::HexStr(interner.intern(digits))
            }
        }

        RawToken::LParen => TokenKind::LParen,
        RawToken::RParen => TokenKind::RParen,
        RawToken::LBracket => TokenKind::LBracket,
        RawToken::RBracket => TokenKind::RBracket,
        RawToken::LBrace => TokenKind::LBrace,
        RawToken::RBrace => TokenKind::RBrace,
        RawToken::Semi => TokenKind::Semi,
        RawToken::Comma => TokenKind::Comma,
        RawToken::Period => TokenKind::Period,
        RawToken::Question => TokenKind::Question,
        RawToken::Colon => TokenKind::Colon,
        RawToken::Arrow => TokenKind::Arrow,
        RawToken::Eq => TokenKind::Eq,
        RawToken::PlusEq => TokenKind::PlusEq,
        RawToken::MinusEq => TokenKind::MinusEq,
        RawToken::StarEq => TokenKind::StarEq,
        RawToken::SlashEq => TokenKind::SlashEq,
        RawToken::PercentEq => TokenKind::PercentEq,
        RawToken::ShlEq => TokenKind::ShlEq,
        RawToken::ShrEq => TokenKind::ShrEq,
        RawToken::AmpEq => TokenKind::AmpEq,
        RawToken::CaretEq => TokenKind::CaretEq,
        RawToken::PipeEq => TokenKind::PipeEq,
        RawToken::Plus => TokenKind::Plus,
        RawToken::Minus => TokenKind::Minus,
        RawToken::Star => TokenKind::Star,
        RawToken::Slash => TokenKind::Slash,
        RawToken::Percent => TokenKind::Percent,
        RawToken::StarStar => TokenKind::StarStar,
        RawToken::PlusPlus => TokenKind::PlusPlus,
        RawToken::MinusMinus => TokenKind::MinusMinus,
        RawToken::EqEq => TokenKind::EqEq,
        RawToken::NotEq => TokenKind::NotEq,
        RawToken::Lt => TokenKind::Lt,
        RawToken::Gt => TokenKind::Gt,
        RawToken::LtEq => TokenKind::LtEq,
        RawToken::GtEq => TokenKind::GtEq,
        RawToken::AmpAmp => TokenKind::AmpAmp,
        RawToken::PipePipe => TokenKind::PipePipe,
        RawToken::Bang => TokenKind::Bang,
        RawToken::Amp => TokenKind::Amp,
        RawToken::Pipe => TokenKind::Pipe,
        RawToken::Caret => TokenKind::Caret,
        RawToken::Tilde => TokenKind::Tilde,
        RawToken::Shl => TokenKind::Shl,
        RawToken::Shr => TokenKind::Shr,

        RawToken::LineComment | RawToken::BlockComment => unreachable!("trivia filtered by lex()"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        let interner = StringInterner::new();
        lex(source, &interner).iter().map(|t| t.kind).collect()
    }

    #[test]
    fn lexes_a_minimal_contract_header() {
        let interner = StringInterner::new();
        let tokens = lex("contract C {}", &interner);
        assert_eq!(tokens.len(), 5);
        assert_eq!(tokens[0].kind, TokenKind::Contract);
        assert!(matches!(tokens[1].kind, TokenKind::Ident(_)));
        assert_eq!(tokens[2].kind, TokenKind::LBrace);
        assert_eq!(tokens[3].kind, TokenKind::RBrace);
        assert_eq!(tokens[4].kind, TokenKind::Eof);
    }

    #[test]
    fn sized_types_and_near_misses() {
        let ks = kinds("uint256 uint7 bytes32 bytes33 int");
        assert_eq!(ks[0], TokenKind::Uint(256));
        assert!(matches!(ks[1], TokenKind::Ident(_)));
        assert_eq!(ks[2], TokenKind::FixedBytes(32));
        assert!(matches!(ks[3], TokenKind::Ident(_)));
        assert_eq!(ks[4], TokenKind::Int(256));
    }

    #[test]
    fn compound_punctuators_munch_longest() {
        let ks = kinds("a >>= b >> c >= d > e");
        assert_eq!(ks[1], TokenKind::ShrEq);
        assert_eq!(ks[3], TokenKind::Shr);
        assert_eq!(ks[5], TokenKind::GtEq);
        assert_eq!(ks[7], TokenKind::Gt);
    }

    #[test]
    fn exponent_vs_multiply() {
        let ks = kinds("a ** b * c");
        assert_eq!(ks[1], TokenKind::StarStar);
        assert_eq!(ks[3], TokenKind::Star);
    }

    #[test]
    fn string_literal_keeps_quotes() {
        let interner = StringInterner::new();
        let tokens = lex(r#""hi\n""#, &interner);
        match tokens[0].kind {
            TokenKind::Str(name) => assert_eq!(interner.lookup(name), r#""hi\n""#),
            ref other => panic!("expected string literal, got {other:?}"),
        }
    }

    #[test]
    fn hex_string_is_stripped_and_validated() {
        let interner = StringInterner::new();
        let tokens = lex(r#"hex"aabb""#, &interner);
        match tokens[0].kind {
            TokenKind::HexStr(name) => assert_eq!(interner.lookup(name), "aabb"),
            ref other => panic!("expected hex string, got {other:?}"),
        }
        // Odd digit count is a scanner error.
        let tokens = lex(r#"hex"aab""#, &interner);
        assert_eq!(tokens[0].kind, TokenKind::Error);
    }

    #[test]
    fn comments_are_trivia() {
        let ks = kinds("a // comment\n + /* block\nspanning */ b");
        assert!(matches!(ks[0], TokenKind::Ident(_)));
        assert_eq!(ks[1], TokenKind::Plus);
        assert!(matches!(ks[2], TokenKind::Ident(_)));
        assert_eq!(ks[3], TokenKind::Eof);
    }

    #[test]
    fn selector_arrow_vs_comparison() {
        let ks = kinds("mapping(address => uint256)");
        assert_eq!(ks[0], TokenKind::Mapping);
        assert_eq!(ks[2], TokenKind::Address);
        assert_eq!(ks[3], TokenKind::Arrow);
        assert_eq!(ks[4], TokenKind::Uint(256));
    }

    #[test]
    fn dollar_identifiers_allowed() {
        let ks = kinds("$x _y z$0");
        assert!(ks[..3].iter().all(|k| matches!(k, TokenKind::Ident(_))));
    }

    #[test]
    fn error_token_does_not_stop_the_scan() {
        let ks = kinds("a # b");
        assert!(matches!(ks[0], TokenKind::Ident(_)));
        assert_eq!(ks[1], TokenKind::Error);
        assert!(matches!(ks[2], TokenKind::Ident(_)));
    }
}
