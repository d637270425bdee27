//! Recursive descent parser.
//!
//! Grammar:
//!
//! ```text
//! file        := entry* EOF
//! entry       := state | assignment
//! assignment  := identifier '=' value ';'
//! state       := 'state' identifier '{' init? trigger* '}' ';'
//! init        := action (',' action)* ';'
//! trigger     := 'on' cond (',' cond)* '->' action (',' action)* ';'
//! cond        := identifier ('(' param (',' param)* ')')?
//! param       := identifier ('=' value)?
//! action      := 'move' identifier | call
//! call        := identifier ('(' arg (',' arg)* ')')?
//! arg         := identifier ('=' value)?
//! value       := string | int | float | bool | identifier
//! ```
//!
//! Parsing is all-or-nothing: the first mismatch aborts with a [`ParseError`].

use crate::ast::{
    Arg, Assignment, Call, Entry, Expr, File, MoveStmt, Param, StateDef, Statement, Trigger,
    TriggerCond,
};
use crate::error::{Diagnostic, ParseError};
use crate::lexer::{default_rules, Lexer};
use crate::token::{Location, Token, TokenKind};
use std::io::BufRead;

/// Parses a complete source string with the default rules.
pub fn parse_str(filename: &str, source: &str) -> Result<File, ParseError> {
    Parser::from_reader(source.as_bytes(), filename).parse_file()
}

/// Parser over a token stream.
pub struct Parser<R> {
    lexer: Lexer<R>,
    filename: String,
}

impl<R: BufRead> Parser<R> {
    pub fn new(lexer: Lexer<R>, filename: impl Into<String>) -> Self {
        Self {
            lexer,
            filename: filename.into(),
        }
    }

    /// Creates a parser using the default lexer rules.
    pub fn from_reader(reader: R, filename: impl Into<String>) -> Self {
        Self::new(Lexer::new(reader, default_rules()), filename)
    }

    /// Parses the whole input into a [`File`].
    pub fn parse_file(mut self) -> Result<File, ParseError> {
        let mut entries = Vec::new();
        while self.peek().kind != TokenKind::Eof {
            entries.push(self.parse_entry()?);
        }
        tracing::trace!("parsed {}: {} entries", self.filename, entries.len());
        Ok(File { entries })
    }

    // =========================================================================
    // Token helpers
    // =========================================================================

    fn peek(&self) -> &Token {
        self.lexer.token()
    }

    fn next(&mut self) -> Token {
        let tok = self.lexer.token().clone();
        self.lexer.advance();
        tok
    }

    fn at(&self, text: &str) -> bool {
        let tok = self.peek();
        tok.is_punct(text) || tok.is_keyword(text)
    }

    /// Consumes a token of the given kind.
    fn expect(&mut self, kind: TokenKind) -> Result<Token, ParseError> {
        if self.peek().kind != kind {
            return Err(self.unexpected(&[kind.as_str()]));
        }
        Ok(self.next())
    }

    /// Consumes a punctuation or keyword token with the given text.
    fn expect_text(&mut self, text: &str) -> Result<Location, ParseError> {
        if !self.at(text) {
            return Err(self.unexpected(&[&format!("{:?}", text)]));
        }
        Ok(self.next().location)
    }

    fn unexpected(&mut self, expected: &[&str]) -> ParseError {
        let tok = self.peek().clone();
        if tok.kind == TokenKind::Error {
            if let Some(source) = self.lexer.take_error() {
                return ParseError::Io {
                    filename: self.filename.clone(),
                    source,
                };
            }
        }
        ParseError::Unexpected(Diagnostic {
            filename: self.filename.clone(),
            expected: expected.iter().map(|s| s.to_string()).collect(),
            location: tok.location,
            kind: tok.kind,
            text: tok.text,
        })
    }

    // =========================================================================
    // Grammar
    // =========================================================================

    fn parse_entry(&mut self) -> Result<Entry, ParseError> {
        if self.peek().is_keyword("state") {
            let state = self.parse_state()?;
            self.expect_text(";")?;
            return Ok(Entry::State(state));
        }
        if self.peek().kind == TokenKind::Identifier {
            let name = self.next();
            self.expect_text("=")?;
            let value = self.parse_value()?;
            self.expect_text(";")?;
            return Ok(Entry::Assign(Assignment {
                name: name.text,
                value,
                location: name.location,
            }));
        }
        Err(self.unexpected(&["identifier", "\"state\""]))
    }

    fn parse_state(&mut self) -> Result<StateDef, ParseError> {
        self.expect_text("state")?;
        let name = self.expect(TokenKind::Identifier)?;
        self.expect_text("{")?;

        let mut init = Vec::new();
        if !self.at("on") && !self.at("}") {
            init = self.parse_actions()?;
            self.expect_text(";")?;
        }

        let mut triggers = Vec::new();
        while !self.at("}") {
            triggers.push(self.parse_trigger()?);
        }
        self.expect_text("}")?;

        Ok(StateDef {
            name: name.text,
            location: name.location,
            init,
            triggers,
        })
    }

    fn parse_trigger(&mut self) -> Result<Trigger, ParseError> {
        let location = self.expect_text("on")?;

        let mut conditions = vec![self.parse_trigger_cond()?];
        while self.at(",") {
            self.next();
            conditions.push(self.parse_trigger_cond()?);
        }

        self.expect_text("->")?;
        let actions = self.parse_actions()?;
        self.expect_text(";")?;

        Ok(Trigger {
            conditions,
            actions,
            location,
        })
    }

    fn parse_trigger_cond(&mut self) -> Result<TriggerCond, ParseError> {
        let name = self.expect(TokenKind::Identifier)?;
        let params = if self.at("(") {
            self.parse_paren_list(Self::parse_param)?
        } else {
            Vec::new()
        };
        Ok(TriggerCond {
            name: name.text,
            params,
            location: name.location,
        })
    }

    fn parse_param(&mut self) -> Result<Param, ParseError> {
        let name = self.expect(TokenKind::Identifier)?;
        let value = if self.at("=") {
            self.next();
            Some(self.parse_value()?)
        } else {
            None
        };
        Ok(Param {
            name: name.text,
            value,
            location: name.location,
        })
    }

    fn parse_actions(&mut self) -> Result<Vec<Statement>, ParseError> {
        let mut actions = vec![self.parse_action()?];
        while self.at(",") {
            self.next();
            actions.push(self.parse_action()?);
        }
        Ok(actions)
    }

    fn parse_action(&mut self) -> Result<Statement, ParseError> {
        if self.peek().is_keyword("move") {
            self.next();
            let dest = self.expect(TokenKind::Identifier)?;
            return Ok(Statement::Move(MoveStmt {
                dest: dest.text,
                location: dest.location,
            }));
        }
        if self.peek().kind == TokenKind::Identifier {
            return self.parse_call().map(Statement::Call);
        }
        Err(self.unexpected(&["\"move\"", "identifier"]))
    }

    fn parse_call(&mut self) -> Result<Call, ParseError> {
        let name = self.expect(TokenKind::Identifier)?;
        let args = if self.at("(") {
            self.parse_paren_list(Self::parse_arg)?
        } else {
            Vec::new()
        };
        Ok(Call {
            name: name.text,
            args,
            location: name.location,
        })
    }

    fn parse_arg(&mut self) -> Result<Arg, ParseError> {
        let name = self.expect(TokenKind::Identifier)?;
        let value = if self.at("=") {
            self.next();
            self.parse_value()?
        } else {
            Expr::Ref(name.text.clone())
        };
        Ok(Arg {
            name: name.text,
            value,
            location: name.location,
        })
    }

    /// Parses `( item, item, ... )`. Empty lists and a trailing comma are
    /// accepted.
    fn parse_paren_list<T>(
        &mut self,
        mut item: impl FnMut(&mut Self) -> Result<T, ParseError>,
    ) -> Result<Vec<T>, ParseError> {
        self.expect_text("(")?;
        let mut items = Vec::new();
        while !self.at(")") {
            items.push(item(self)?);
            if !self.at(",") {
                break;
            }
            self.next();
        }
        self.expect_text(")")?;
        Ok(items)
    }

    fn parse_value(&mut self) -> Result<Expr, ParseError> {
        let tok = self.peek().clone();
        let value = match tok.kind {
            TokenKind::String => {
                let raw = &tok.text[1..tok.text.len() - 1];
                Expr::Str(unescape(raw))
            }
            TokenKind::Int => match tok.text.parse::<i64>() {
                Ok(i) => Expr::Int(i),
                Err(_) => return Err(self.unexpected(&["int"])),
            },
            TokenKind::Float => match tok.text.parse::<f64>() {
                Ok(f) => Expr::Float(f),
                Err(_) => return Err(self.unexpected(&["float"])),
            },
            TokenKind::Bool => Expr::Bool(tok.text == "true"),
            TokenKind::Identifier => Expr::Ref(tok.text),
            _ => {
                return Err(self.unexpected(&["string", "int", "float", "bool", "identifier"]));
            }
        };
        self.next();
        Ok(value)
    }
}

/// Decodes backslash escapes in a string literal body.
///
/// Unknown escapes are kept verbatim.
pub fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('"') => out.push('"'),
            Some('\'') => out.push('\''),
            Some('a') => out.push('\u{07}'),
            Some('b') => out.push('\u{08}'),
            Some('e') => out.push('\u{1b}'),
            Some('f') => out.push('\u{0c}'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            Some('v') => out.push('\u{0b}'),
            Some('\\') => out.push('\\'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}
