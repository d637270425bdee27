//! Registry descriptions loaded from YAML.
//!
//! ```yaml
//! triggers:
//!   Button: { pressed: bool, code: int }
//! actions:
//!   led: { lit: bool, level: int }
//! constants:
//!   brightness: 40
//! ```
//!
//! Field and input order follows the file. Actions described this way do not
//! perform side effects of their own; they hand their resolved arguments to a
//! caller-supplied sink.

use mova_core::{ActionSpec, Args, Registry, TriggerSpec, Value, ValueType};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RegistryFileError {
    #[error("failed to read registry file '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse registry file '{}': {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("{section} {name}: {message}")]
    Invalid {
        section: &'static str,
        name: String,
        message: String,
    },
}

/// Parsed registry description.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RegistryFile {
    pub triggers: BTreeMap<String, serde_yaml::Mapping>,
    pub actions: BTreeMap<String, serde_yaml::Mapping>,
    pub constants: BTreeMap<String, serde_json::Value>,
}

impl RegistryFile {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, RegistryFileError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| RegistryFileError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_yaml::from_str(&content).map_err(|source| RegistryFileError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Builds a registry whose actions forward their arguments to `sink`.
    pub fn to_registry<F>(&self, sink: F) -> Result<Registry, RegistryFileError>
    where
        F: Fn(&str, &Args) + Send + Sync + 'static,
    {
        let sink = Arc::new(sink);
        let mut registry = Registry::new();

        for (name, fields) in &self.triggers {
            let mut spec = TriggerSpec::new(name.as_str());
            for (field, ty) in typed_entries("trigger", name, fields)? {
                spec = spec.field(field, ty);
            }
            registry.add_trigger(spec);
        }

        for (name, inputs) in &self.actions {
            let sink = Arc::clone(&sink);
            let label = name.clone();
            let mut spec = ActionSpec::new(name.as_str(), move |args: &Args| {
                sink(&label, args);
                Ok(())
            });
            for (input, ty) in typed_entries("action", name, inputs)? {
                spec = spec.input(input, ty);
            }
            registry.add_action(spec);
        }

        Ok(registry)
    }

    /// Constants to seed the compiler with.
    pub fn constants(&self) -> Vec<(String, Value)> {
        self.constants
            .iter()
            .map(|(name, json)| (name.clone(), Value::from_json(json)))
            .collect()
    }
}

fn typed_entries(
    section: &'static str,
    name: &str,
    mapping: &serde_yaml::Mapping,
) -> Result<Vec<(String, ValueType)>, RegistryFileError> {
    let invalid = |message: String| RegistryFileError::Invalid {
        section,
        name: name.to_string(),
        message,
    };

    mapping
        .iter()
        .map(|(key, ty)| {
            let key = key
                .as_str()
                .ok_or_else(|| invalid(format!("field name {:?} is not a string", key)))?;
            let ty = ty
                .as_str()
                .ok_or_else(|| invalid(format!("type of {} is not a string", key)))?
                .parse::<ValueType>()
                .map_err(|e| invalid(format!("{}: {}", key, e)))?;
            Ok((key.to_string(), ty))
        })
        .collect()
}

/// Renders action arguments as `name(a=1, b="x")`.
pub fn render_call(action: &str, args: &Args) -> String {
    let rendered: Vec<String> = args
        .iter()
        .map(|(name, value)| format!("{}={}", name, value))
        .collect();
    format!("{}({})", action, rendered.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use mova_core::{Compiler, Payload};
    use std::sync::Mutex;

    const REGISTRY: &str = r#"
triggers:
  Button: { pressed: bool, code: int }
actions:
  led: { lit: bool, level: int }
constants:
  brightness: 40
  label: "front"
"#;

    fn load(yaml: &str) -> Result<RegistryFile, RegistryFileError> {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("registry.yaml");
        std::fs::write(&path, yaml).unwrap();
        RegistryFile::from_file(&path)
    }

    #[test]
    fn test_load_registry() {
        let file = load(REGISTRY).unwrap();
        let registry = file.to_registry(|_, _| {}).unwrap();

        let button = registry.get_trigger("Button").unwrap();
        assert_eq!(
            button.fields(),
            &[
                ("pressed".to_string(), ValueType::Bool),
                ("code".to_string(), ValueType::Int)
            ]
        );
        let led = registry.get_action("led").unwrap();
        assert_eq!(led.input_type("level"), Some(ValueType::Int));

        let constants = file.constants();
        assert!(constants.contains(&("brightness".to_string(), Value::Int(40))));
        assert!(constants.contains(&("label".to_string(), Value::from("front"))));
    }

    #[test]
    fn test_actions_forward_to_sink() {
        let file = load(REGISTRY).unwrap();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let registry = file
            .to_registry(move |action, args| sink.lock().unwrap().push(render_call(action, args)))
            .unwrap();

        let source = "state idle { on Button(pressed=true) -> led(lit=true, level=brightness); };";
        let machine = Compiler::new(&registry)
            .with_constants(file.constants())
            .build_str("led.mova", source)
            .map(Arc::new)
            .unwrap();
        let mut sm = machine.instantiate().unwrap();
        sm.emit("Button", &Payload::new().with("pressed", true).with("code", 0))
            .unwrap();

        assert_eq!(*seen.lock().unwrap(), vec!["led(lit=true, level=40)"]);
    }

    #[test]
    fn test_unknown_type_rejected() {
        let file = load("triggers:\n  Tick: { n: list }\n").unwrap();
        let err = file.to_registry(|_, _| {}).unwrap_err();
        assert!(matches!(err, RegistryFileError::Invalid { section: "trigger", .. }));
        assert!(err.to_string().contains("unknown value type 'list'"));
    }

    #[test]
    fn test_parse_error() {
        let err = load("triggers: [1, 2").unwrap_err();
        assert!(matches!(err, RegistryFileError::Parse { .. }));
    }
}
