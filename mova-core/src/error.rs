//! Compile-time and runtime error types.

use crate::registry::ActionError;
use crate::value::ValueType;
use mova_syntax::{Location, ParseError};
use std::fmt;
use thiserror::Error;

/// Where in the source a compile diagnostic applies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Site {
    pub filename: String,
    pub location: Location,
    /// Enclosing construct, e.g. `trigger idle#0` or `state idle init`.
    pub context: String,
}

impl fmt::Display for Site {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}: in {}", self.filename, self.location, self.context)
    }
}

/// What a type mismatch was detected on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MismatchKind {
    /// Constraint value against the trigger's declared field type.
    EventData,
    /// Action argument against the action's declared input type.
    Argument,
    /// Event-data name redeclared with another type in the same trigger.
    Redeclaration,
}

impl fmt::Display for MismatchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MismatchKind::EventData => f.write_str("event-data"),
            MismatchKind::Argument => f.write_str("argument"),
            MismatchKind::Redeclaration => f.write_str("redeclared event-data"),
        }
    }
}

/// Errors from building a machine. Compilation stops at the first one.
#[derive(Debug, Error)]
pub enum CompileError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("{site}: unspecified trigger {trigger:?}")]
    UnspecifiedTrigger { site: Site, trigger: String },

    #[error("{site}: unspecified event-data {name:?} for trigger {trigger}")]
    UnspecifiedEventData {
        site: Site,
        trigger: String,
        name: String,
    },

    #[error("{site}: unspecified action {action:?}")]
    UnspecifiedAction { site: Site, action: String },

    #[error("{site}: unspecified argument {argument:?} for action {action}")]
    UnspecifiedArgument {
        site: Site,
        action: String,
        argument: String,
    },

    #[error("{site}: argument {argument:?} given more than once to action {action}")]
    DuplicateArgument {
        site: Site,
        action: String,
        argument: String,
    },

    #[error("{site}: type mismatch for {kind} {name:?}: expected {expected}, got {actual}")]
    TypeMismatch {
        site: Site,
        kind: MismatchKind,
        name: String,
        expected: ValueType,
        actual: ValueType,
    },

    #[error("{site}: undefined variable {name:?}")]
    UndefinedVariable { site: Site, name: String },

    #[error("{site}: event-data {name:?} not mentioned in condition #{condition}")]
    NarrowedEventData {
        site: Site,
        name: String,
        condition: usize,
    },

    #[error("{site}: state {state:?} already defined")]
    DuplicateState { site: Site, state: String },

    #[error("{filename}: empty state machine")]
    EmptyMachine { filename: String },
}

impl CompileError {
    /// Returns the source site of semantic errors.
    pub fn site(&self) -> Option<&Site> {
        match self {
            CompileError::UnspecifiedTrigger { site, .. }
            | CompileError::UnspecifiedEventData { site, .. }
            | CompileError::UnspecifiedAction { site, .. }
            | CompileError::UnspecifiedArgument { site, .. }
            | CompileError::DuplicateArgument { site, .. }
            | CompileError::TypeMismatch { site, .. }
            | CompileError::UndefinedVariable { site, .. }
            | CompileError::NarrowedEventData { site, .. }
            | CompileError::DuplicateState { site, .. } => Some(site),
            CompileError::Parse(_) | CompileError::EmptyMachine { .. } => None,
        }
    }

    /// Returns the source location, if known.
    pub fn location(&self) -> Option<Location> {
        match self {
            CompileError::Parse(e) => e.location(),
            other => other.site().map(|s| s.location),
        }
    }

    /// Returns an error code suitable for reporting.
    pub fn error_code(&self) -> &'static str {
        match self {
            CompileError::Parse(e) => e.error_code(),
            CompileError::UnspecifiedTrigger { .. } => "UNSPECIFIED_TRIGGER",
            CompileError::UnspecifiedEventData { .. } => "UNSPECIFIED_EVENT_DATA",
            CompileError::UnspecifiedAction { .. } => "UNSPECIFIED_ACTION",
            CompileError::UnspecifiedArgument { .. } => "UNSPECIFIED_ARGUMENT",
            CompileError::DuplicateArgument { .. } => "DUPLICATE_ARGUMENT",
            CompileError::TypeMismatch { .. } => "TYPE_MISMATCH",
            CompileError::UndefinedVariable { .. } => "UNDEFINED_VARIABLE",
            CompileError::NarrowedEventData { .. } => "NARROWED_EVENT_DATA",
            CompileError::DuplicateState { .. } => "DUPLICATE_STATE",
            CompileError::EmptyMachine { .. } => "EMPTY_MACHINE",
        }
    }
}

/// Notice about event-data dropped from a trigger's scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Warning {
    pub site: Site,
    pub name: String,
    /// Index of the condition that omitted the name.
    pub condition: usize,
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: dropping previous event-data {:?}: not mentioned in condition #{}",
            self.site, self.name, self.condition
        )
    }
}

/// Errors from running a machine. They abort the current `emit` or `move`
/// only; the instance stays usable.
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("unknown state {0:?}")]
    UnknownState(String),

    #[error("missing event-data {name:?} for event {event}")]
    MissingEventData { event: String, name: String },

    #[error("type mismatch for event-data {name:?}: expected {expected}, got {actual}")]
    TypeMismatch {
        name: String,
        expected: ValueType,
        actual: ValueType,
    },

    #[error("undefined variable {0:?}")]
    UndefinedVariable(String),

    #[error("action {action} failed: {source}")]
    Action {
        action: String,
        #[source]
        source: ActionError,
    },

    #[error("moving to {state:?} exceeds {limit} nested init moves")]
    MoveDepthExceeded { state: String, limit: usize },
}

impl RuntimeError {
    /// Returns an error code suitable for reporting.
    pub fn error_code(&self) -> &'static str {
        match self {
            RuntimeError::UnknownState(_) => "UNKNOWN_STATE",
            RuntimeError::MissingEventData { .. } => "MISSING_EVENT_DATA",
            RuntimeError::TypeMismatch { .. } => "TYPE_MISMATCH",
            RuntimeError::UndefinedVariable(_) => "UNDEFINED_VARIABLE",
            RuntimeError::Action { .. } => "ACTION_FAILED",
            RuntimeError::MoveDepthExceeded { .. } => "MOVE_DEPTH_EXCEEDED",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn site() -> Site {
        Site {
            filename: "m.mova".to_string(),
            location: Location::new(3, 5, 1),
            context: "trigger idle#0".to_string(),
        }
    }

    #[test]
    fn test_compile_error_display() {
        let err = CompileError::UnspecifiedTrigger {
            site: site(),
            trigger: "Z".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "m.mova:3:5-6: in trigger idle#0: unspecified trigger \"Z\""
        );
        assert_eq!(err.error_code(), "UNSPECIFIED_TRIGGER");
        assert_eq!(err.location(), Some(Location::new(3, 5, 1)));
    }

    #[test]
    fn test_type_mismatch_display() {
        let err = CompileError::TypeMismatch {
            site: site(),
            kind: MismatchKind::Redeclaration,
            name: "x".to_string(),
            expected: ValueType::Int,
            actual: ValueType::String,
        };
        let msg = err.to_string();
        assert!(msg.contains("redeclared event-data \"x\""));
        assert!(msg.contains("expected int, got string"));
        assert_eq!(err.error_code(), "TYPE_MISMATCH");
    }

    #[test]
    fn test_empty_machine_has_no_site() {
        let err = CompileError::EmptyMachine {
            filename: "m.mova".to_string(),
        };
        assert!(err.site().is_none());
        assert!(err.location().is_none());
        assert_eq!(err.error_code(), "EMPTY_MACHINE");
    }

    #[test]
    fn test_warning_display() {
        let warning = Warning {
            site: site(),
            name: "y".to_string(),
            condition: 1,
        };
        assert_eq!(
            warning.to_string(),
            "m.mova:3:5-6: in trigger idle#0: dropping previous event-data \"y\": not mentioned in condition #1"
        );
    }

    #[test]
    fn test_runtime_error_codes() {
        assert_eq!(
            RuntimeError::UnknownState("x".into()).error_code(),
            "UNKNOWN_STATE"
        );
        let err = RuntimeError::Action {
            action: "led".to_string(),
            source: "offline".into(),
        };
        assert_eq!(err.to_string(), "action led failed: offline");
        assert_eq!(err.error_code(), "ACTION_FAILED");

        let err = RuntimeError::MoveDepthExceeded {
            state: "a".to_string(),
            limit: 64,
        };
        assert_eq!(err.to_string(), "moving to \"a\" exceeds 64 nested init moves");
        assert_eq!(err.error_code(), "MOVE_DEPTH_EXCEEDED");
    }
}
