//! Emission sink: the ordered stream of structural tokens.

use crate::position::Position;
use crate::token::TokenKind;
use serde::Serialize;

/// One emitted structural token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EmittedToken {
    #[serde(rename = "token")]
    pub kind: TokenKind,
    pub line: usize,
    pub column: usize,
    pub length: usize,
}

impl EmittedToken {
    pub fn new(kind: TokenKind, at: Position, length: usize) -> Self {
        Self {
            kind,
            line: at.line,
            column: at.column,
            length,
        }
    }
}

/// Append-only token buffer in traversal order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct TokenStream {
    tokens: Vec<EmittedToken>,
}

impl TokenStream {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, token: EmittedToken) {
        log::trace!(
            "emit {} at {}:{} len {}",
            token.kind,
            token.line,
            token.column,
            token.length
        );
        self.tokens.push(token);
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, EmittedToken> {
        self.tokens.iter()
    }

    pub fn as_slice(&self) -> &[EmittedToken] {
        &self.tokens
    }

    pub fn into_vec(self) -> Vec<EmittedToken> {
        self.tokens
    }

    /// Number of tokens of one kind.
    pub fn count_of(&self, kind: TokenKind) -> usize {
        self.tokens.iter().filter(|t| t.kind == kind).count()
    }

    /// Kinds in emission order.
    pub fn kinds(&self) -> Vec<TokenKind> {
        self.tokens.iter().map(|t| t.kind).collect()
    }
}

impl<'a> IntoIterator for &'a TokenStream {
    type Item = &'a EmittedToken;
    type IntoIter = std::slice::Iter<'a, EmittedToken>;

    fn into_iter(self) -> Self::IntoIter {
        self.tokens.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_in_wire_shape() {
        let mut stream = TokenStream::new();
        stream.push(EmittedToken::new(
            TokenKind::RETURN,
            Position { line: 3, column: 5 },
            6,
        ));

        let json = serde_json::to_string(&stream).unwrap();
        assert_eq!(
            json,
            r#"[{"token":{"key":"RETURN","value":21},"line":3,"column":5,"length":6}]"#
        );
    }

    #[test]
    fn keeps_insertion_order_and_duplicates() {
        let at = Position { line: 1, column: 1 };
        let mut stream = TokenStream::new();
        stream.push(EmittedToken::new(TokenKind::IF_END, at, 1));
        stream.push(EmittedToken::new(TokenKind::ASSIGN, at, 1));
        stream.push(EmittedToken::new(TokenKind::IF_END, at, 1));

        assert_eq!(stream.len(), 3);
        assert_eq!(
            stream.kinds(),
            vec![TokenKind::IF_END, TokenKind::ASSIGN, TokenKind::IF_END]
        );
        assert_eq!(stream.count_of(TokenKind::IF_END), 2);
    }

    #[test]
    fn empty_stream_is_empty_array() {
        let stream = TokenStream::new();
        assert!(stream.is_empty());
        assert_eq!(serde_json::to_string(&stream).unwrap(), "[]");
    }
}
