//! Compiled machines and the runtime dispatch engine.
//!
//! A [`CompiledMachine`] is immutable and can be shared between any number of
//! [`StateMachine`] instances through an `Arc`. Each instance owns only the
//! name of its current state.

use crate::error::{RuntimeError, Warning};
use crate::value::{Payload, Value, ValueType};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

/// Variables visible to an action while it runs.
pub type Scope = HashMap<String, Value>;

/// A lowered statement.
pub(crate) type Action =
    Box<dyn Fn(&mut StateMachine, &Scope) -> Result<(), RuntimeError> + Send + Sync>;

/// One alternative of a compiled trigger.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub(crate) trigger: String,
    pub(crate) constraints: BTreeMap<String, Value>,
}

impl Condition {
    pub fn trigger(&self) -> &str {
        &self.trigger
    }

    /// Event-data values the payload must carry for this condition to match.
    pub fn constraints(&self) -> &BTreeMap<String, Value> {
        &self.constraints
    }

    /// Returns true if `event` is this condition's trigger and every
    /// constraint is present in `payload` with an equal value.
    pub fn matches(&self, event: &str, payload: &Payload) -> bool {
        self.trigger == event
            && self
                .constraints
                .iter()
                .all(|(name, value)| payload.get(name) == Some(value))
    }
}

pub struct CompiledTrigger {
    pub(crate) conditions: Vec<Condition>,
    pub(crate) event_data: BTreeMap<String, ValueType>,
    pub(crate) actions: Vec<Action>,
}

impl CompiledTrigger {
    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    /// Event-data names bound for the actions, with their declared types.
    pub fn event_data(&self) -> &BTreeMap<String, ValueType> {
        &self.event_data
    }

    pub fn action_count(&self) -> usize {
        self.actions.len()
    }

    pub fn matches(&self, event: &str, payload: &Payload) -> bool {
        self.conditions.iter().any(|c| c.matches(event, payload))
    }

    /// Binds the declared event-data from `payload`.
    ///
    /// `Constant` fields are bound as given; every other field must carry a
    /// value of exactly the declared type.
    fn bind(&self, event: &str, payload: &Payload) -> Result<Scope, RuntimeError> {
        let mut scope = Scope::with_capacity(self.event_data.len());
        for (name, ty) in &self.event_data {
            let value = payload
                .get(name)
                .ok_or_else(|| RuntimeError::MissingEventData {
                    event: event.to_string(),
                    name: name.clone(),
                })?;
            if *ty != ValueType::Constant && value.value_type() != *ty {
                return Err(RuntimeError::TypeMismatch {
                    name: name.clone(),
                    expected: *ty,
                    actual: value.value_type(),
                });
            }
            scope.insert(name.clone(), value.clone());
        }
        Ok(scope)
    }
}

impl fmt::Debug for CompiledTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledTrigger")
            .field("conditions", &self.conditions)
            .field("event_data", &self.event_data)
            .field("actions", &self.actions.len())
            .finish()
    }
}

pub struct CompiledState {
    pub(crate) name: String,
    pub(crate) init: Vec<Action>,
    pub(crate) triggers: Vec<CompiledTrigger>,
}

impl CompiledState {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn init_count(&self) -> usize {
        self.init.len()
    }

    pub fn triggers(&self) -> &[CompiledTrigger] {
        &self.triggers
    }
}

impl fmt::Debug for CompiledState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledState")
            .field("name", &self.name)
            .field("init", &self.init.len())
            .field("triggers", &self.triggers)
            .finish()
    }
}

/// Result of compiling a source against a registry.
#[derive(Debug)]
pub struct CompiledMachine {
    pub(crate) constants: Scope,
    pub(crate) entry: String,
    pub(crate) states: HashMap<String, CompiledState>,
    /// State names in definition order.
    pub(crate) order: Vec<String>,
    pub(crate) warnings: Vec<Warning>,
    pub(crate) checksum: Option<String>,
}

impl CompiledMachine {
    /// Name of the first state defined in the source.
    pub fn entry_state(&self) -> &str {
        &self.entry
    }

    /// State names in definition order.
    pub fn state_names(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    pub fn has_state(&self, name: &str) -> bool {
        self.states.contains_key(name)
    }

    pub fn state(&self, name: &str) -> Option<&CompiledState> {
        self.states.get(name)
    }

    /// Final value of a constant after all assignments.
    pub fn constant(&self, name: &str) -> Option<&Value> {
        self.constants.get(name)
    }

    /// Scope-narrowing notices produced while compiling.
    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    /// CRC32C of the source bytes, when built from source.
    pub fn checksum(&self) -> Option<&str> {
        self.checksum.as_deref()
    }

    /// Creates a new instance sitting in the entry state.
    pub fn instantiate(self: &Arc<Self>) -> Result<StateMachine, RuntimeError> {
        StateMachine::new(Arc::clone(self))
    }
}

/// A trigger that fired.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fired {
    pub from_state: String,
    /// Current state after the actions ran.
    pub to_state: String,
    /// Index of the trigger within `from_state`.
    pub trigger: usize,
}

impl Fired {
    pub fn transitioned(&self) -> bool {
        self.from_state != self.to_state
    }
}

/// Result of a successful [`StateMachine::emit`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Fired(Fired),
    /// No trigger of the current state matched.
    NoMatch,
}

impl Outcome {
    pub fn is_match(&self) -> bool {
        matches!(self, Outcome::Fired(_))
    }

    pub fn fired(&self) -> Option<&Fired> {
        match self {
            Outcome::Fired(f) => Some(f),
            Outcome::NoMatch => None,
        }
    }
}

/// Maximum nesting of moves made from init actions.
pub const MAX_MOVE_DEPTH: usize = 64;

/// A live machine instance.
///
/// Not internally synchronized: `emit` and `move_to` take `&mut self`.
pub struct StateMachine {
    machine: Arc<CompiledMachine>,
    current: String,
    // Init blocks currently running.
    depth: usize,
}

impl StateMachine {
    /// Enters the entry state and runs its init actions. Any failure there
    /// means no instance is produced.
    pub fn new(machine: Arc<CompiledMachine>) -> Result<Self, RuntimeError> {
        let entry = machine.entry.clone();
        tracing::debug!("instantiating machine at entry state {}", entry);
        let mut instance = Self {
            machine,
            current: entry.clone(),
            depth: 0,
        };
        instance.move_to(&entry)?;
        Ok(instance)
    }

    pub fn current_state(&self) -> &str {
        &self.current
    }

    pub fn machine(&self) -> &Arc<CompiledMachine> {
        &self.machine
    }

    /// Transitions to `dest` and runs its init actions.
    ///
    /// An unknown destination leaves the current state unchanged. A move
    /// nested more than [`MAX_MOVE_DEPTH`] init blocks deep fails with
    /// `MoveDepthExceeded`.
    pub fn move_to(&mut self, dest: &str) -> Result<(), RuntimeError> {
        if self.depth >= MAX_MOVE_DEPTH {
            return Err(RuntimeError::MoveDepthExceeded {
                state: dest.to_string(),
                limit: MAX_MOVE_DEPTH,
            });
        }

        let machine = Arc::clone(&self.machine);
        let state = machine
            .states
            .get(dest)
            .ok_or_else(|| RuntimeError::UnknownState(dest.to_string()))?;

        tracing::debug!("moving from {} to {}", self.current, dest);
        self.current = dest.to_string();

        tracing::trace!("running {} init actions of {}", state.init.len(), dest);
        self.depth += 1;
        let result = self.run(&state.init, &Scope::new());
        self.depth -= 1;
        result
    }

    /// Dispatches an event to the first matching trigger of the current state.
    pub fn emit(&mut self, event: &str, payload: &Payload) -> Result<Outcome, RuntimeError> {
        let machine = Arc::clone(&self.machine);
        let from_state = self.current.clone();
        let state = machine
            .states
            .get(&from_state)
            .ok_or_else(|| RuntimeError::UnknownState(from_state.clone()))?;

        let Some((index, trigger)) = state
            .triggers
            .iter()
            .enumerate()
            .find(|(_, t)| t.matches(event, payload))
        else {
            tracing::debug!("event {} matched no trigger in state {}", event, from_state);
            return Ok(Outcome::NoMatch);
        };

        let scope = trigger.bind(event, payload)?;
        self.run(&trigger.actions, &scope)?;

        tracing::debug!(
            "event {} fired trigger {}#{}, now in {}",
            event,
            from_state,
            index,
            self.current
        );
        Ok(Outcome::Fired(Fired {
            from_state,
            to_state: self.current.clone(),
            trigger: index,
        }))
    }

    fn run(&mut self, actions: &[Action], scope: &Scope) -> Result<(), RuntimeError> {
        for action in actions {
            action(self, scope)?;
        }
        Ok(())
    }
}

impl fmt::Debug for StateMachine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateMachine")
            .field("current", &self.current)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn condition(trigger: &str, constraints: &[(&str, Value)]) -> Condition {
        Condition {
            trigger: trigger.to_string(),
            constraints: constraints
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
        }
    }

    fn mover(dest: &'static str) -> Action {
        Box::new(move |m: &mut StateMachine, _: &Scope| m.move_to(dest))
    }

    fn state(name: &str, triggers: Vec<CompiledTrigger>) -> CompiledState {
        CompiledState {
            name: name.to_string(),
            init: Vec::new(),
            triggers,
        }
    }

    fn machine(states: Vec<CompiledState>) -> Arc<CompiledMachine> {
        let order: Vec<String> = states.iter().map(|s| s.name.clone()).collect();
        Arc::new(CompiledMachine {
            constants: Scope::new(),
            entry: order[0].clone(),
            states: states.into_iter().map(|s| (s.name.clone(), s)).collect(),
            order,
            warnings: Vec::new(),
            checksum: None,
        })
    }

    #[test]
    fn test_condition_matches() {
        let cond = condition("A", &[("event", Value::Int(1))]);
        assert!(cond.matches("A", &Payload::new().with("event", 1)));
        assert!(cond.matches("A", &Payload::new().with("event", 1).with("extra", "x")));
        assert!(!cond.matches("A", &Payload::new().with("event", 2)));
        assert!(!cond.matches("B", &Payload::new().with("event", 1)));
        assert!(!cond.matches("A", &Payload::new()));
        assert!(!cond.matches("A", &Payload::new().with("event", 1.0)));
    }

    #[test]
    fn test_bind_checks_types() {
        let trigger = CompiledTrigger {
            conditions: vec![condition("A", &[])],
            event_data: [
                ("x".to_string(), ValueType::Float),
                ("h".to_string(), ValueType::Constant),
            ]
            .into_iter()
            .collect(),
            actions: Vec::new(),
        };

        let scope = trigger
            .bind("A", &Payload::new().with("x", 1.5).with("h", "anything"))
            .unwrap();
        assert_eq!(scope.get("x"), Some(&Value::Float(1.5)));
        assert_eq!(scope.get("h"), Some(&Value::from("anything")));

        let err = trigger
            .bind("A", &Payload::new().with("x", 1).with("h", 0))
            .unwrap_err();
        assert_eq!(err.error_code(), "TYPE_MISMATCH");

        let err = trigger.bind("A", &Payload::new().with("x", 1.0)).unwrap_err();
        assert!(matches!(err, RuntimeError::MissingEventData { ref name, .. } if name == "h"));
    }

    #[test]
    fn test_emit_and_move() {
        let m = machine(vec![
            state(
                "a",
                vec![CompiledTrigger {
                    conditions: vec![condition("go", &[])],
                    event_data: BTreeMap::new(),
                    actions: vec![mover("b")],
                }],
            ),
            state("b", Vec::new()),
        ]);
        let mut sm = m.instantiate().unwrap();
        assert_eq!(sm.current_state(), "a");

        let outcome = sm.emit("go", &Payload::new()).unwrap();
        let fired = outcome.fired().unwrap();
        assert_eq!(fired.from_state, "a");
        assert_eq!(fired.to_state, "b");
        assert!(fired.transitioned());

        assert_eq!(sm.emit("go", &Payload::new()).unwrap(), Outcome::NoMatch);
    }

    #[test]
    fn test_unknown_state_keeps_current() {
        let m = machine(vec![state("a", Vec::new())]);
        let mut sm = StateMachine::new(m).unwrap();
        let err = sm.move_to("nowhere").unwrap_err();
        assert_eq!(err.error_code(), "UNKNOWN_STATE");
        assert_eq!(sm.current_state(), "a");
    }

    #[test]
    fn test_init_move_cycles_are_bounded() {
        let mut looping = state("a", Vec::new());
        looping.init.push(mover("a"));
        let err = machine(vec![looping]).instantiate().unwrap_err();
        assert_eq!(err.error_code(), "MOVE_DEPTH_EXCEEDED");

        let mut a = state("a", Vec::new());
        a.init.push(mover("b"));
        let mut b = state("b", Vec::new());
        b.init.push(mover("a"));
        let err = machine(vec![a, b]).instantiate().unwrap_err();
        assert!(matches!(
            err,
            RuntimeError::MoveDepthExceeded { limit: MAX_MOVE_DEPTH, .. }
        ));
    }

    #[test]
    fn test_depth_resets_between_moves() {
        let mut c = state("c", Vec::new());
        c.init.push(mover("d"));
        let m = machine(vec![state("a", Vec::new()), c, state("d", Vec::new())]);
        let mut sm = m.instantiate().unwrap();
        for _ in 0..(MAX_MOVE_DEPTH * 2) {
            sm.move_to("c").unwrap();
            assert_eq!(sm.current_state(), "d");
        }
    }

    #[test]
    fn test_introspection() {
        let m = machine(vec![state("a", Vec::new()), state("b", Vec::new())]);
        assert_eq!(m.entry_state(), "a");
        assert_eq!(m.state_names().collect::<Vec<_>>(), vec!["a", "b"]);
        assert!(m.has_state("b"));
        assert!(!m.has_state("c"));
        assert_eq!(m.state("a").map(|s| s.triggers().len()), Some(0));
        assert!(m.checksum().is_none());
    }
}
