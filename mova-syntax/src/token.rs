//! Token types produced by the lexer.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of a lexical token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    /// Reserved word: `state`, `on`, `move`.
    Keyword,
    /// Name of a state, trigger, action, parameter or constant.
    Identifier,
    /// One of `{ } ( ) , ; =`.
    Punct,
    /// `->`
    Arrow,
    /// Double-quoted string, escapes still encoded.
    String,
    Int,
    Float,
    Bool,
    /// End of input.
    Eof,
    /// No rule matched at the current position.
    Illegal,
    /// The underlying reader failed.
    Error,
}

impl TokenKind {
    /// Returns the name used in diagnostics.
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenKind::Keyword => "keyword",
            TokenKind::Identifier => "identifier",
            TokenKind::Punct => "punct",
            TokenKind::Arrow => "arrow",
            TokenKind::String => "string",
            TokenKind::Int => "int",
            TokenKind::Float => "float",
            TokenKind::Bool => "bool",
            TokenKind::Eof => "EOF",
            TokenKind::Illegal => "ILLEGAL",
            TokenKind::Error => "ERROR",
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Position of a token or construct in the source.
///
/// `line` is 1-based and names the first physical line of the logical line
/// the token was read from. `offset` is the byte offset within that logical
/// line, `length` the token length in bytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Location {
    pub line: usize,
    pub offset: usize,
    pub length: usize,
}

impl Location {
    pub fn new(line: usize, offset: usize, length: usize) -> Self {
        Self {
            line,
            offset,
            length,
        }
    }

    /// Byte offset one past the end of the token.
    pub fn end(&self) -> usize {
        self.offset + self.length
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}-{}", self.line, self.offset, self.end())
    }
}

/// A lexical token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub location: Location,
}

impl Token {
    /// Returns true if this token has the given kind and exact text.
    pub fn is(&self, kind: TokenKind, text: &str) -> bool {
        self.kind == kind && self.text == text
    }

    /// Returns true if this token is the given punctuation character(s).
    pub fn is_punct(&self, text: &str) -> bool {
        matches!(self.kind, TokenKind::Punct | TokenKind::Arrow) && self.text == text
    }

    /// Returns true if this token is the given keyword.
    pub fn is_keyword(&self, word: &str) -> bool {
        self.is(TokenKind::Keyword, word)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_location_display() {
        let loc = Location::new(3, 4, 5);
        assert_eq!(loc.end(), 9);
        assert_eq!(loc.to_string(), "3:4-9");
    }

    #[test]
    fn test_token_predicates() {
        let tok = Token {
            kind: TokenKind::Keyword,
            text: "on".to_string(),
            location: Location::default(),
        };
        assert!(tok.is_keyword("on"));
        assert!(!tok.is_keyword("move"));
        assert!(!tok.is_punct("on"));

        let arrow = Token {
            kind: TokenKind::Arrow,
            text: "->".to_string(),
            location: Location::default(),
        };
        assert!(arrow.is_punct("->"));
    }

    #[test]
    fn test_kind_serialization() {
        let json = serde_json::to_string(&TokenKind::Identifier).unwrap();
        assert_eq!(json, "\"identifier\"");
        assert_eq!(TokenKind::Eof.to_string(), "EOF");
    }
}
