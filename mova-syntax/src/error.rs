//! Syntax error types.

use crate::token::{Location, TokenKind};
use std::fmt;
use thiserror::Error;

/// A structural mismatch between the token stream and the grammar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub filename: String,
    /// What the parser would have accepted. Empty when unknown.
    pub expected: Vec<String>,
    pub location: Location,
    /// Kind of the token actually seen.
    pub kind: TokenKind,
    /// Text of the token actually seen.
    pub text: String,
}

impl Diagnostic {
    /// Joins the expected set as `a`, `a or b`, or `a, b or c`.
    pub fn expected_text(&self) -> String {
        match self.expected.as_slice() {
            [] => "??".to_string(),
            [one] => one.clone(),
            [init @ .., last] => format!("{} or {}", init.join(", "), last),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}: expected {}, got {:?}",
            self.filename,
            self.location,
            self.expected_text(),
            self.text
        )
    }
}

/// Errors from lexing and parsing.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("{0}")]
    Unexpected(Diagnostic),

    #[error("{filename}: I/O error: {source}")]
    Io {
        filename: String,
        #[source]
        source: std::io::Error,
    },
}

impl ParseError {
    /// Returns the diagnostic for structural errors.
    pub fn diagnostic(&self) -> Option<&Diagnostic> {
        match self {
            ParseError::Unexpected(d) => Some(d),
            ParseError::Io { .. } => None,
        }
    }

    /// Returns the location of the offending token, if known.
    pub fn location(&self) -> Option<Location> {
        self.diagnostic().map(|d| d.location)
    }

    /// Returns an error code suitable for reporting.
    pub fn error_code(&self) -> &'static str {
        match self {
            ParseError::Unexpected(_) => "SYNTAX_ERROR",
            ParseError::Io { .. } => "IO_ERROR",
        }
    }
}
