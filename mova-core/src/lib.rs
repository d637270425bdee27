//! # mova-core
//!
//! Compiler and runtime for mova state machines.
//!
//! This crate provides:
//! - The value model shared by hosts and compiled machines
//! - The registry through which a host declares triggers and actions
//! - Semantic compilation of parsed sources into immutable machines
//! - The runtime dispatch engine driving machine instances
//!
//! ```no_run
//! use mova_core::{ActionSpec, Args, Compiler, Payload, Registry, TriggerSpec, ValueType};
//! use std::sync::Arc;
//!
//! let registry = Registry::new()
//!     .trigger(TriggerSpec::new("Button").field("pressed", ValueType::Bool))
//!     .action(
//!         ActionSpec::new("led", |args: &Args| {
//!             println!("led lit={:?}", args.bool("lit"));
//!             Ok(())
//!         })
//!         .input("lit", ValueType::Bool),
//!     );
//!
//! let source = "state dark { led(lit=false); on Button(pressed=true) -> move bright; };\n\
//!               state bright { led(lit=true); on Button(pressed=false) -> move dark; };";
//! let machine = Arc::new(Compiler::new(&registry).build_str("led.mova", source)?);
//! let mut sm = machine.instantiate()?;
//! sm.emit("Button", &Payload::new().with("pressed", true))?;
//! assert_eq!(sm.current_state(), "bright");
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod checksum;
pub mod compiler;
pub mod error;
pub mod machine;
pub mod options;
pub mod registry;
pub mod value;

pub use compiler::Compiler;
pub use error::{CompileError, MismatchKind, RuntimeError, Site, Warning};
pub use machine::{
    CompiledMachine, CompiledState, CompiledTrigger, Condition, Fired, Outcome, Scope,
    StateMachine, MAX_MOVE_DEPTH,
};
pub use options::{CompileOptions, NarrowingPolicy};
pub use registry::{ActionError, ActionFn, ActionSpec, Args, Registry, TriggerSpec};
pub use value::{Opaque, Payload, Value, ValueType};

use std::io::Read;

/// Parses and compiles a machine with default options.
///
/// `constants` seed the constant map before any source assignment runs.
pub fn build<R, I, K, V>(
    filename: &str,
    reader: R,
    registry: &Registry,
    constants: I,
) -> Result<CompiledMachine, CompileError>
where
    R: Read,
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<Value>,
{
    Compiler::new(registry)
        .with_constants(constants)
        .build(filename, reader)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_entry_point() {
        let registry = Registry::new().trigger(TriggerSpec::new("Tick").field("n", ValueType::Int));
        let source = "state a { on Tick(n=start) -> move b; }; state b {};";
        let machine = build("t.mova", source.as_bytes(), &registry, [("start", 3)]).unwrap();
        let machine = std::sync::Arc::new(machine);

        let mut sm = machine.instantiate().unwrap();
        let outcome = sm.emit("Tick", &Payload::new().with("n", 3)).unwrap();
        assert!(outcome.is_match());
        assert_eq!(sm.current_state(), "b");
    }

    #[test]
    fn test_instances_are_independent() {
        let registry = Registry::new().trigger(TriggerSpec::new("Tick"));
        let source = "state a { on Tick -> move b; }; state b {};";
        let machine = std::sync::Arc::new(
            build("t.mova", source.as_bytes(), &registry, Vec::<(String, Value)>::new()).unwrap(),
        );

        let mut first = machine.instantiate().unwrap();
        let second = machine.instantiate().unwrap();
        first.emit("Tick", &Payload::new()).unwrap();
        assert_eq!(first.current_state(), "b");
        assert_eq!(second.current_state(), "a");
    }
}
