//! # mova-syntax
//!
//! Front end for the mova state machine language.
//!
//! This crate provides:
//! - A rule-driven lexer with line continuation support
//! - A recursive descent parser producing an immutable AST
//! - Syntax diagnostics with source locations
//!
//! ```text
//! # comments run to the end of the line
//! brightness = 40;
//!
//! state idle {
//!     led(lit=false);
//!     on Button(pressed=true) -> move active;
//! };
//!
//! state active {
//!     led(lit=true, level=brightness);
//!     on Button(pressed=false), Timeout -> move idle;
//! };
//! ```

pub mod ast;
pub mod error;
pub mod lexer;
pub mod parser;
pub mod token;

pub use ast::{Arg, Assignment, Call, Entry, Expr, File, MoveStmt, Param, StateDef, Statement, Trigger, TriggerCond};
pub use error::{Diagnostic, ParseError};
pub use lexer::{default_rules, Lexer, Rule};
pub use parser::{parse_str, Parser};
pub use token::{Location, Token, TokenKind};
