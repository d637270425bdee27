//! Host-supplied trigger and action specifications.
//!
//! The registry is read-only to the compiler and the runtime. A host declares
//! every trigger it can emit along with the typed event-data it carries, and
//! every action it can run along with its typed inputs and the callable that
//! performs it.

use crate::value::{Value, ValueType};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Error returned by a host action.
pub type ActionError = Box<dyn std::error::Error + Send + Sync>;

/// Callable behind an action.
pub type ActionFn = Arc<dyn Fn(&Args) -> Result<(), ActionError> + Send + Sync>;

/// Declared shape of a trigger's event-data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerSpec {
    name: String,
    fields: Vec<(String, ValueType)>,
}

impl TriggerSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    /// Declares an event-data field. Redeclaring a field replaces its type.
    pub fn field(mut self, name: impl Into<String>, ty: ValueType) -> Self {
        let name = name.into();
        match self.fields.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = ty,
            None => self.fields.push((name, ty)),
        }
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fields(&self) -> &[(String, ValueType)] {
        &self.fields
    }

    pub fn field_type(&self, name: &str) -> Option<ValueType> {
        self.fields
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, ty)| *ty)
    }
}

/// Typed signature and callable of an action.
#[derive(Clone)]
pub struct ActionSpec {
    name: String,
    inputs: Vec<(String, ValueType)>,
    function: ActionFn,
}

impl ActionSpec {
    pub fn new<F>(name: impl Into<String>, function: F) -> Self
    where
        F: Fn(&Args) -> Result<(), ActionError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            inputs: Vec::new(),
            function: Arc::new(function),
        }
    }

    /// Declares an input. Redeclaring an input replaces its type.
    pub fn input(mut self, name: impl Into<String>, ty: ValueType) -> Self {
        let name = name.into();
        match self.inputs.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = ty,
            None => self.inputs.push((name, ty)),
        }
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn inputs(&self) -> &[(String, ValueType)] {
        &self.inputs
    }

    pub fn input_type(&self, name: &str) -> Option<ValueType> {
        self.inputs
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, ty)| *ty)
    }

    /// Invokes the callable.
    pub fn call(&self, args: &Args) -> Result<(), ActionError> {
        (self.function)(args)
    }
}

impl fmt::Debug for ActionSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionSpec")
            .field("name", &self.name)
            .field("inputs", &self.inputs)
            .finish_non_exhaustive()
    }
}

/// Resolved arguments passed to an action, in input declaration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Args {
    values: Vec<(String, Value)>,
}

impl Args {
    pub(crate) fn push(&mut self, name: impl Into<String>, value: Value) {
        self.values.push((name.into(), value));
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    pub fn str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(Value::as_str)
    }

    pub fn int(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(Value::as_int)
    }

    pub fn float(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(Value::as_float)
    }

    pub fn bool(&self, name: &str) -> Option<bool> {
        self.get(name).and_then(Value::as_bool)
    }

    /// Downcasts an opaque constant argument.
    pub fn opaque<T: std::any::Any>(&self, name: &str) -> Option<&T> {
        self.get(name).and_then(Value::downcast_ref::<T>)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Trigger and action specifications keyed by name.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    triggers: HashMap<String, Arc<TriggerSpec>>,
    actions: HashMap<String, Arc<ActionSpec>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style [`Registry::add_trigger`].
    pub fn trigger(mut self, spec: TriggerSpec) -> Self {
        self.add_trigger(spec);
        self
    }

    /// Builder-style [`Registry::add_action`].
    pub fn action(mut self, spec: ActionSpec) -> Self {
        self.add_action(spec);
        self
    }

    /// Registers a trigger, replacing any previous one with the same name.
    pub fn add_trigger(&mut self, spec: TriggerSpec) {
        self.triggers.insert(spec.name.clone(), Arc::new(spec));
    }

    /// Registers an action, replacing any previous one with the same name.
    pub fn add_action(&mut self, spec: ActionSpec) {
        self.actions.insert(spec.name.clone(), Arc::new(spec));
    }

    pub fn get_trigger(&self, name: &str) -> Option<&Arc<TriggerSpec>> {
        self.triggers.get(name)
    }

    pub fn get_action(&self, name: &str) -> Option<&Arc<ActionSpec>> {
        self.actions.get(name)
    }

    /// Returns trigger names, sorted.
    pub fn trigger_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.triggers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Returns action names, sorted.
    pub fn action_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.actions.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_trigger_spec_fields() {
        let spec = TriggerSpec::new("Button")
            .field("pressed", ValueType::Bool)
            .field("code", ValueType::Int);
        assert_eq!(spec.name(), "Button");
        assert_eq!(spec.field_type("pressed"), Some(ValueType::Bool));
        assert_eq!(spec.field_type("missing"), None);
        assert_eq!(spec.fields().len(), 2);

        let spec = spec.field("code", ValueType::String);
        assert_eq!(spec.fields().len(), 2);
        assert_eq!(spec.field_type("code"), Some(ValueType::String));
    }

    #[test]
    fn test_action_spec_call() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let spec = ActionSpec::new("led", move |args: &Args| {
            sink.lock().unwrap().push(args.bool("on"));
            Ok(())
        })
        .input("on", ValueType::Bool);

        let mut args = Args::default();
        args.push("on", Value::Bool(true));
        spec.call(&args).unwrap();

        assert_eq!(*seen.lock().unwrap(), vec![Some(true)]);
        assert_eq!(spec.input_type("on"), Some(ValueType::Bool));
        assert!(format!("{:?}", spec).contains("led"));
    }

    #[test]
    fn test_action_failure_propagates() {
        let spec = ActionSpec::new("fail", |_: &Args| Err("device offline".into()));
        let err = spec.call(&Args::default()).unwrap_err();
        assert_eq!(err.to_string(), "device offline");
    }

    #[test]
    fn test_args_accessors() {
        let mut args = Args::default();
        args.push("s", Value::from("x"));
        args.push("i", Value::Int(4));
        args.push("f", Value::Float(0.5));
        args.push("o", Value::opaque(7u16));

        assert_eq!(args.str("s"), Some("x"));
        assert_eq!(args.int("i"), Some(4));
        assert_eq!(args.float("f"), Some(0.5));
        assert_eq!(args.opaque::<u16>("o"), Some(&7));
        assert_eq!(args.int("s"), None);
        assert_eq!(args.len(), 4);
        let names: Vec<&str> = args.iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["s", "i", "f", "o"]);
    }

    #[test]
    fn test_registry_lookup() {
        let registry = Registry::new()
            .trigger(TriggerSpec::new("B"))
            .trigger(TriggerSpec::new("A"))
            .action(ActionSpec::new("noop", |_: &Args| Ok(())));

        assert!(registry.get_trigger("A").is_some());
        assert!(registry.get_trigger("C").is_none());
        assert!(registry.get_action("noop").is_some());
        assert_eq!(registry.trigger_names(), vec!["A", "B"]);
        assert_eq!(registry.action_names(), vec!["noop"]);
    }
}
