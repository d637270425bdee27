//! Rule-driven lexer.
//!
//! The lexer owns an ordered list of [`Rule`]s. At each position the rules are
//! tried in order and the first one matching exactly at the current position
//! wins. Rules without a kind (whitespace, comments) are consumed silently.
//! When no rule matches, a single code point is reported as
//! [`TokenKind::Illegal`].
//!
//! Input is buffered one logical line at a time. A physical line ending in a
//! backslash is joined with the following line before matching.

use crate::token::{Location, Token, TokenKind};
use regex::Regex;
use std::io::{self, BufRead};

/// A single lexer rule.
#[derive(Debug, Clone)]
pub struct Rule {
    kind: Option<TokenKind>,
    pattern: Regex,
}

impl Rule {
    /// Creates a rule producing tokens of `kind`.
    ///
    /// The pattern is anchored to the current position.
    pub fn new(kind: TokenKind, pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            kind: Some(kind),
            pattern: anchored(pattern)?,
        })
    }

    /// Creates a rule whose matches are discarded.
    pub fn skip(pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            kind: None,
            pattern: anchored(pattern)?,
        })
    }

    pub fn kind(&self) -> Option<TokenKind> {
        self.kind
    }

    /// Returns the length of the match at the start of `text`, if any.
    fn match_len(&self, text: &str) -> Option<usize> {
        self.pattern
            .find(text)
            .filter(|m| m.start() == 0 && m.end() > 0)
            .map(|m| m.end())
    }
}

fn anchored(pattern: &str) -> Result<Regex, regex::Error> {
    Regex::new(&format!("^(?:{})", pattern))
}

/// Builds the rule list for the mova language.
///
/// Order matters: `bool` and keywords must be tried before identifiers, and
/// floats before integers.
pub fn default_rules() -> Vec<Rule> {
    let skip = |p: &str| Rule::skip(p).expect("valid token pattern");
    let rule = |k: TokenKind, p: &str| Rule::new(k, p).expect("valid token pattern");

    vec![
        skip(r"[\s]+"),
        skip(r"#[^\n]*"),
        rule(TokenKind::Arrow, r"->"),
        rule(TokenKind::Punct, r"[{}(),;=]"),
        rule(TokenKind::String, r#""(\\.|[^"\\])*""#),
        rule(TokenKind::Float, r"[+-]?[0-9]+\.[0-9]*"),
        rule(TokenKind::Int, r"[+-]?[0-9]+"),
        rule(TokenKind::Bool, r"(true|false)\b"),
        rule(TokenKind::Keyword, r"(state|on|move)\b"),
        rule(TokenKind::Identifier, r"[A-Za-z_][A-Za-z0-9_]*"),
    ]
}

/// Streaming lexer over a buffered reader.
pub struct Lexer<R> {
    reader: R,
    rules: Vec<Rule>,

    /// Current logical line.
    text: String,
    /// Byte position of the current token within `text`.
    pos: usize,
    /// Line number of the current logical line.
    line: usize,
    /// Physical lines consumed by the current logical line.
    line_size: usize,

    token: Token,
    error: Option<io::Error>,
}

impl<R: BufRead> Lexer<R> {
    /// Creates a lexer and pulls the first token.
    pub fn new(reader: R, rules: Vec<Rule>) -> Self {
        let mut lexer = Self {
            reader,
            rules,
            text: String::new(),
            pos: 0,
            line: 1,
            line_size: 0,
            token: Token {
                kind: TokenKind::Eof,
                text: String::new(),
                location: Location::new(1, 0, 0),
            },
            error: None,
        };
        lexer.advance();
        lexer
    }

    /// Returns the current token.
    pub fn token(&self) -> &Token {
        &self.token
    }

    /// Takes the I/O error behind a [`TokenKind::Error`] token.
    pub fn take_error(&mut self) -> Option<io::Error> {
        self.error.take()
    }

    /// Moves to the next token.
    ///
    /// Once the end of input or a read error has been reached, the same
    /// terminal token is produced again.
    pub fn advance(&mut self) {
        if matches!(self.token.kind, TokenKind::Error) {
            return;
        }
        self.pos += self.token.location.length;

        'scan: loop {
            if self.pos >= self.text.len() {
                match self.read_line() {
                    Ok(true) => continue 'scan,
                    Ok(false) => {
                        self.make_token(TokenKind::Eof, 0);
                        return;
                    }
                    Err(e) => {
                        tracing::debug!("read error on line {}: {}", self.line, e);
                        self.error = Some(e);
                        self.make_token(TokenKind::Error, 0);
                        return;
                    }
                }
            }

            let rest = &self.text[self.pos..];
            for rule in &self.rules {
                if let Some(len) = rule.match_len(rest) {
                    match rule.kind {
                        None => {
                            self.pos += len;
                            continue 'scan;
                        }
                        Some(kind) => {
                            self.make_token(kind, len);
                            return;
                        }
                    }
                }
            }

            let len = rest.chars().next().map(char::len_utf8).unwrap_or(1);
            self.make_token(TokenKind::Illegal, len);
            return;
        }
    }

    fn make_token(&mut self, kind: TokenKind, len: usize) {
        let end = (self.pos + len).min(self.text.len());
        self.token = Token {
            kind,
            text: self.text[self.pos..end].to_string(),
            location: Location::new(self.line, self.pos, end - self.pos),
        };
    }

    /// Reads the next logical line. Returns false at end of input.
    fn read_line(&mut self) -> io::Result<bool> {
        self.line += self.line_size;
        self.line_size = 0;
        self.pos = 0;
        self.text.clear();

        loop {
            let mut buf = String::new();
            if self.reader.read_line(&mut buf)? == 0 {
                return Ok(!self.text.is_empty());
            }
            self.line_size += 1;

            let body = buf.strip_suffix('\n').unwrap_or(&buf);
            let body = body.strip_suffix('\r').unwrap_or(body);
            match body.strip_suffix('\\') {
                Some(joined) => self.text.push_str(joined),
                None => {
                    self.text.push_str(&buf);
                    return Ok(true);
                }
            }
        }
    }
}
