//! Abstract syntax tree.
//!
//! Nodes are plain data and immutable once parsed. Every node that can be
//! the subject of a compile error records the [`Location`] of its name.

use crate::token::Location;
use serde::Serialize;

/// A parsed source file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct File {
    pub entries: Vec<Entry>,
}

impl File {
    /// Iterates over the state definitions in file order.
    pub fn states(&self) -> impl Iterator<Item = &StateDef> {
        self.entries.iter().filter_map(|e| match e {
            Entry::State(s) => Some(s),
            Entry::Assign(_) => None,
        })
    }
}

/// A top-level entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "entry", rename_all = "snake_case")]
pub enum Entry {
    /// `name = value;`
    Assign(Assignment),
    /// `state name { ... };`
    State(StateDef),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Assignment {
    pub name: String,
    pub value: Expr,
    pub location: Location,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StateDef {
    pub name: String,
    pub location: Location,
    /// Statements run on entering the state.
    pub init: Vec<Statement>,
    pub triggers: Vec<Trigger>,
}

/// `on cond, cond -> action, action;`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Trigger {
    pub conditions: Vec<TriggerCond>,
    pub actions: Vec<Statement>,
    pub location: Location,
}

/// One alternative of a trigger: `Name(param, param=value)`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TriggerCond {
    pub name: String,
    pub params: Vec<Param>,
    pub location: Location,
}

/// Event-data parameter of a condition, optionally constrained.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Param {
    pub name: String,
    pub value: Option<Expr>,
    pub location: Location,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "stmt", rename_all = "snake_case")]
pub enum Statement {
    Call(Call),
    Move(MoveStmt),
}

impl Statement {
    pub fn location(&self) -> Location {
        match self {
            Statement::Call(c) => c.location,
            Statement::Move(m) => m.location,
        }
    }
}

/// Action invocation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Call {
    pub name: String,
    pub args: Vec<Arg>,
    pub location: Location,
}

/// Named argument. The shorthand `name` is stored as `name=name`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Arg {
    pub name: String,
    pub value: Expr,
    pub location: Location,
}

/// `move dest`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MoveStmt {
    pub dest: String,
    pub location: Location,
}

/// Literal or reference appearing in source.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Expr {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    /// Reference to a constant or event-data name.
    Ref(String),
}
