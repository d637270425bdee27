//! Compiler options.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// What to do when a trigger condition omits event-data declared by an
/// earlier condition of the same trigger.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NarrowingPolicy {
    /// Drop the name from scope and record a warning.
    #[default]
    Warn,
    /// Fail compilation.
    Deny,
}

impl fmt::Display for NarrowingPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NarrowingPolicy::Warn => f.write_str("warn"),
            NarrowingPolicy::Deny => f.write_str("deny"),
        }
    }
}

impl FromStr for NarrowingPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "warn" => Ok(NarrowingPolicy::Warn),
            "deny" => Ok(NarrowingPolicy::Deny),
            other => Err(format!("unknown narrowing policy '{}'", other)),
        }
    }
}

/// Options controlling compilation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompileOptions {
    pub narrowing: NarrowingPolicy,
}

impl CompileOptions {
    pub fn narrowing(mut self, policy: NarrowingPolicy) -> Self {
        self.narrowing = policy;
        self
    }
}
