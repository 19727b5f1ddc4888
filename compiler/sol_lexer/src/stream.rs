//! Replayable token stream.
//!
//! The parser reads tokens one at a time through [`TokenStream::cached_lex`]
//! with a single token of lookahead via [`TokenStream::peek`].
//! [`TokenStream::enter_token_stream`] redirects subsequent reads to an
//! in-memory buffer; buffers nest and each is drained before the underlying
//! list resumes. Deferred function bodies are replayed this way after all
//! contract members are known.

use sol_ir::{Token, TokenList};

struct ReplayBuffer {
    tokens: Vec<Token>,
    pos: usize,
}

/// Cached one-token-lookahead reader over a [`TokenList`].
pub struct TokenStream {
    tokens: TokenList,
    pos: usize,
    replay: Vec<ReplayBuffer>,
}

impl TokenStream {
    /// The list must be non-empty and end with `Eof` (the scanner
    /// guarantees both).
    pub fn new(tokens: TokenList) -> Self {
        debug_assert!(!tokens.is_empty(), "token list missing Eof terminator");
        TokenStream {
            tokens,
            pos: 0,
            replay: Vec::new(),
        }
    }

    /// Return the next token and advance.
    ///
    /// Once the underlying list reaches its trailing `Eof`, that token is
    /// returned indefinitely.
    pub fn cached_lex(&mut self) -> Token {
        while let Some(buf) = self.replay.last_mut() {
            if buf.pos < buf.tokens.len() {
                let tok = buf.tokens[buf.pos];
                buf.pos += 1;
                return tok;
            }
            self.replay.pop();
        }
        let tok = self.tokens[self.pos];
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        tok
    }

    /// Look at the token `cached_lex` would return next, without advancing.
    pub fn peek(&self) -> Token {
        for buf in self.replay.iter().rev() {
            if buf.pos < buf.tokens.len() {
                return buf.tokens[buf.pos];
            }
        }
        self.tokens[self.pos]
    }

    /// Redirect subsequent reads to `tokens` until the buffer is drained.
    pub fn enter_token_stream(&mut self, tokens: Vec<Token>) {
        self.replay.push(ReplayBuffer { tokens, pos: 0 });
    }

    /// True while a replay buffer is active.
    pub fn in_replay(&self) -> bool {
        self.replay.iter().any(|buf| buf.pos < buf.tokens.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sol_ir::{Span, TokenKind};

    fn list(kinds: &[TokenKind]) -> TokenList {
        let mut tokens = TokenList::new();
        for (i, &kind) in kinds.iter().enumerate() {
            tokens.push(Token::new(kind, Span::point(i as u32)));
        }
        tokens.push(Token::new(TokenKind::Eof, Span::point(kinds.len() as u32)));
        tokens
    }

    #[test]
    fn sticks_at_eof() {
        let mut stream = TokenStream::new(list(&[TokenKind::Semi]));
        assert_eq!(stream.cached_lex().kind, TokenKind::Semi);
        assert_eq!(stream.cached_lex().kind, TokenKind::Eof);
        assert_eq!(stream.cached_lex().kind, TokenKind::Eof);
    }

    #[test]
    fn replay_buffer_precedes_main_list() {
        let mut stream = TokenStream::new(list(&[TokenKind::Semi]));
        stream.enter_token_stream(vec![
            Token::dummy(TokenKind::LBrace),
            Token::dummy(TokenKind::RBrace),
        ]);
        assert_eq!(stream.cached_lex().kind, TokenKind::LBrace);
        assert_eq!(stream.peek().kind, TokenKind::RBrace);
        assert_eq!(stream.cached_lex().kind, TokenKind::RBrace);
        // Buffer drained: back to the main list.
        assert_eq!(stream.cached_lex().kind, TokenKind::Semi);
    }

    #[test]
    fn peek_crosses_exhausted_buffers() {
        let mut stream = TokenStream::new(list(&[TokenKind::Comma]));
        stream.enter_token_stream(vec![Token::dummy(TokenKind::Semi)]);
        assert_eq!(stream.cached_lex().kind, TokenKind::Semi);
        // Buffer is exhausted but not yet popped; peek must see the list.
        assert_eq!(stream.peek().kind, TokenKind::Comma);
    }

    #[test]
    fn nested_replay() {
        let mut stream = TokenStream::new(list(&[]));
        stream.enter_token_stream(vec![Token::dummy(TokenKind::Plus)]);
        stream.enter_token_stream(vec![Token::dummy(TokenKind::Minus)]);
        assert_eq!(stream.cached_lex().kind, TokenKind::Minus);
        assert_eq!(stream.cached_lex().kind, TokenKind::Plus);
        assert_eq!(stream.cached_lex().kind, TokenKind::Eof);
    }
}
