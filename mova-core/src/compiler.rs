//! Semantic lowering of a parsed file into a [`CompiledMachine`].
//!
//! Entries are processed strictly in file order. Assignments extend the
//! constant map, states are type-checked against the registry and lowered
//! into closures. Compilation stops at the first error.

use crate::checksum::{checksum, ChecksumReader};
use crate::error::{CompileError, MismatchKind, RuntimeError, Site, Warning};
use crate::machine::{
    Action, CompiledMachine, CompiledState, CompiledTrigger, Condition, Scope, StateMachine,
};
use crate::options::{CompileOptions, NarrowingPolicy};
use crate::registry::{ActionSpec, Args, Registry};
use crate::value::{Value, ValueType};
use mova_syntax::{Assignment, Call, Entry, Expr, File, Location, Parser, StateDef, Statement, Trigger};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::io::{BufReader, Read};
use std::sync::Arc;

/// Compiles sources against a registry.
#[derive(Debug, Clone)]
pub struct Compiler<'r> {
    registry: &'r Registry,
    options: CompileOptions,
    constants: Scope,
}

impl<'r> Compiler<'r> {
    pub fn new(registry: &'r Registry) -> Self {
        Self {
            registry,
            options: CompileOptions::default(),
            constants: Scope::new(),
        }
    }

    pub fn with_options(mut self, options: CompileOptions) -> Self {
        self.options = options;
        self
    }

    /// Seeds a constant visible to the whole source. Source assignments may
    /// shadow it.
    pub fn with_constant(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.constants.insert(name.into(), value.into());
        self
    }

    pub fn with_constants<I, K, V>(mut self, constants: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        self.constants
            .extend(constants.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Parses and compiles a source stream.
    pub fn build<R: Read>(&self, filename: &str, reader: R) -> Result<CompiledMachine, CompileError> {
        let mut source = ChecksumReader::new(reader);
        let file = Parser::from_reader(BufReader::new(&mut source), filename).parse_file()?;
        let mut machine = self.compile(filename, &file)?;
        machine.checksum = Some(source.finish());
        Ok(machine)
    }

    pub fn build_str(&self, filename: &str, source: &str) -> Result<CompiledMachine, CompileError> {
        let file = mova_syntax::parse_str(filename, source)?;
        let mut machine = self.compile(filename, &file)?;
        machine.checksum = Some(checksum(source.as_bytes()));
        Ok(machine)
    }

    /// Compiles an already parsed file.
    pub fn compile(&self, filename: &str, file: &File) -> Result<CompiledMachine, CompileError> {
        let mut lowering = Lowering {
            registry: self.registry,
            options: &self.options,
            filename,
            constants: self.constants.clone(),
            states: HashMap::new(),
            order: Vec::new(),
            warnings: Vec::new(),
        };

        for entry in &file.entries {
            match entry {
                Entry::Assign(assign) => lowering.assign(assign)?,
                Entry::State(state) => lowering.state(state)?,
            }
        }

        let Some(entry) = lowering.order.first().cloned() else {
            return Err(CompileError::EmptyMachine {
                filename: filename.to_string(),
            });
        };

        tracing::debug!(
            "compiled {}: {} states, entry {}, {} warnings",
            filename,
            lowering.order.len(),
            entry,
            lowering.warnings.len()
        );

        Ok(CompiledMachine {
            constants: lowering.constants,
            entry,
            states: lowering.states,
            order: lowering.order,
            warnings: lowering.warnings,
            checksum: None,
        })
    }
}

/// Value an action argument takes at run time.
#[derive(Debug, Clone)]
enum Operand {
    Literal(Value),
    /// Event-data bound when the trigger fires.
    EventData(String),
}

impl Operand {
    fn resolve(&self, scope: &Scope) -> Result<Value, RuntimeError> {
        match self {
            Operand::Literal(v) => Ok(v.clone()),
            Operand::EventData(name) => scope
                .get(name)
                .cloned()
                .ok_or_else(|| RuntimeError::UndefinedVariable(name.clone())),
        }
    }
}

/// Compilation state for one file.
struct Lowering<'a> {
    registry: &'a Registry,
    options: &'a CompileOptions,
    filename: &'a str,
    constants: Scope,
    states: HashMap<String, CompiledState>,
    order: Vec<String>,
    warnings: Vec<Warning>,
}

impl Lowering<'_> {
    fn site(&self, location: Location, context: impl Into<String>) -> Site {
        Site {
            filename: self.filename.to_string(),
            location,
            context: context.into(),
        }
    }

    fn assign(&mut self, assign: &Assignment) -> Result<(), CompileError> {
        let site = self.site(assign.location, format!("assignment {}", assign.name));
        let value = self.eval(&assign.value, &site)?;
        tracing::trace!("constant {} = {}", assign.name, value);
        self.constants.insert(assign.name.clone(), value);
        Ok(())
    }

    /// Evaluates an expression against the constants defined so far.
    fn eval(&self, expr: &Expr, site: &Site) -> Result<Value, CompileError> {
        Ok(match expr {
            Expr::Str(s) => Value::Str(s.clone()),
            Expr::Int(i) => Value::Int(*i),
            Expr::Float(f) => Value::Float(*f),
            Expr::Bool(b) => Value::Bool(*b),
            Expr::Ref(name) => self
                .constants
                .get(name)
                .cloned()
                .ok_or_else(|| CompileError::UndefinedVariable {
                    site: site.clone(),
                    name: name.clone(),
                })?,
        })
    }

    fn state(&mut self, def: &StateDef) -> Result<(), CompileError> {
        if self.states.contains_key(&def.name) {
            return Err(CompileError::DuplicateState {
                site: self.site(def.location, format!("state {}", def.name)),
                state: def.name.clone(),
            });
        }

        let context = format!("state {} init", def.name);
        let mut init = Vec::with_capacity(def.init.len());
        for stmt in &def.init {
            init.push(self.statement(stmt, &BTreeMap::new(), &context)?);
        }

        let mut triggers = Vec::with_capacity(def.triggers.len());
        for (index, trigger) in def.triggers.iter().enumerate() {
            triggers.push(self.trigger(&def.name, index, trigger)?);
        }

        tracing::debug!(
            "compiled state {}: {} init actions, {} triggers",
            def.name,
            init.len(),
            triggers.len()
        );

        self.order.push(def.name.clone());
        self.states.insert(
            def.name.clone(),
            CompiledState {
                name: def.name.clone(),
                init,
                triggers,
            },
        );
        Ok(())
    }

    fn trigger(
        &mut self,
        state: &str,
        index: usize,
        trigger: &Trigger,
    ) -> Result<CompiledTrigger, CompileError> {
        let registry = self.registry;
        let context = format!("trigger {}#{}", state, index);
        let mut visible: BTreeMap<String, ValueType> = BTreeMap::new();
        let mut conditions = Vec::with_capacity(trigger.conditions.len());

        for (cond_index, cond) in trigger.conditions.iter().enumerate() {
            let spec = registry.get_trigger(&cond.name).ok_or_else(|| {
                CompileError::UnspecifiedTrigger {
                    site: self.site(cond.location, context.as_str()),
                    trigger: cond.name.clone(),
                }
            })?;

            let previous: Vec<String> = visible.keys().cloned().collect();
            let mut mentioned = HashSet::new();
            let mut constraints = BTreeMap::new();

            for param in &cond.params {
                let site = self.site(param.location, context.as_str());
                let field_ty = spec.field_type(&param.name).ok_or_else(|| {
                    CompileError::UnspecifiedEventData {
                        site: site.clone(),
                        trigger: cond.name.clone(),
                        name: param.name.clone(),
                    }
                })?;

                if let Some(expr) = &param.value {
                    let value = self.eval(expr, &site)?;
                    if value.value_type() != field_ty {
                        return Err(CompileError::TypeMismatch {
                            site,
                            kind: MismatchKind::EventData,
                            name: param.name.clone(),
                            expected: field_ty,
                            actual: value.value_type(),
                        });
                    }
                    constraints.insert(param.name.clone(), value);
                }

                mentioned.insert(param.name.as_str());
                match visible.get(&param.name) {
                    Some(prev) if *prev != field_ty => {
                        return Err(CompileError::TypeMismatch {
                            site,
                            kind: MismatchKind::Redeclaration,
                            name: param.name.clone(),
                            expected: *prev,
                            actual: field_ty,
                        });
                    }
                    Some(_) => {}
                    None => {
                        visible.insert(param.name.clone(), field_ty);
                    }
                }
            }

            for name in previous {
                if mentioned.contains(name.as_str()) {
                    continue;
                }
                let site = self.site(cond.location, context.as_str());
                if self.options.narrowing == NarrowingPolicy::Deny {
                    return Err(CompileError::NarrowedEventData {
                        site,
                        name,
                        condition: cond_index,
                    });
                }
                tracing::warn!(
                    "in trigger {}#{}: dropping previous event-data {:?}: not mentioned in condition #{}",
                    state,
                    index,
                    name,
                    cond_index
                );
                visible.remove(&name);
                self.warnings.push(Warning {
                    site,
                    name,
                    condition: cond_index,
                });
            }

            conditions.push(Condition {
                trigger: cond.name.clone(),
                constraints,
            });
        }

        let mut actions = Vec::with_capacity(trigger.actions.len());
        for stmt in &trigger.actions {
            actions.push(self.statement(stmt, &visible, &context)?);
        }

        tracing::debug!(
            "compiled trigger {}#{}: {} conditions, event-data {:?}",
            state,
            index,
            conditions.len(),
            visible.keys().collect::<Vec<_>>()
        );

        Ok(CompiledTrigger {
            conditions,
            event_data: visible,
            actions,
        })
    }

    fn statement(
        &self,
        stmt: &Statement,
        event_data: &BTreeMap<String, ValueType>,
        context: &str,
    ) -> Result<Action, CompileError> {
        tracing::trace!("lowering statement at {} in {}", stmt.location(), context);
        match stmt {
            Statement::Move(mv) => {
                let dest = mv.dest.clone();
                Ok(Box::new(move |machine: &mut StateMachine, _: &Scope| {
                    machine.move_to(&dest)
                }))
            }
            Statement::Call(call) => self.call(call, event_data, context),
        }
    }

    fn call(
        &self,
        call: &Call,
        event_data: &BTreeMap<String, ValueType>,
        context: &str,
    ) -> Result<Action, CompileError> {
        let spec = self.registry.get_action(&call.name).ok_or_else(|| {
            CompileError::UnspecifiedAction {
                site: self.site(call.location, context),
                action: call.name.clone(),
            }
        })?;

        let mut supplied: HashMap<&str, Operand> = HashMap::with_capacity(call.args.len());
        for arg in &call.args {
            let site = self.site(arg.location, context);
            let input_ty = spec.input_type(&arg.name).ok_or_else(|| {
                CompileError::UnspecifiedArgument {
                    site: site.clone(),
                    action: call.name.clone(),
                    argument: arg.name.clone(),
                }
            })?;
            if supplied.contains_key(arg.name.as_str()) {
                return Err(CompileError::DuplicateArgument {
                    site,
                    action: call.name.clone(),
                    argument: arg.name.clone(),
                });
            }

            let (operand, actual) = self.operand(&arg.value, event_data, &site)?;
            if actual != input_ty {
                return Err(CompileError::TypeMismatch {
                    site,
                    kind: MismatchKind::Argument,
                    name: format!("{}.{}", call.name, arg.name),
                    expected: input_ty,
                    actual,
                });
            }
            supplied.insert(arg.name.as_str(), operand);
        }

        // Every declared input in declaration order; omitted ones take
        // their zero value and omitted constants stay absent.
        let bindings: Vec<(String, Operand)> = spec
            .inputs()
            .iter()
            .filter_map(|(name, ty)| {
                supplied
                    .remove(name.as_str())
                    .or_else(|| ty.zero().map(Operand::Literal))
                    .map(|op| (name.clone(), op))
            })
            .collect();

        Ok(lower_call(Arc::clone(spec), bindings))
    }

    /// Resolves an argument expression and its type. Event-data shadows
    /// constants of the same name.
    fn operand(
        &self,
        expr: &Expr,
        event_data: &BTreeMap<String, ValueType>,
        site: &Site,
    ) -> Result<(Operand, ValueType), CompileError> {
        if let Expr::Ref(name) = expr {
            if let Some(ty) = event_data.get(name) {
                return Ok((Operand::EventData(name.clone()), *ty));
            }
        }
        let value = self.eval(expr, site)?;
        let ty = value.value_type();
        Ok((Operand::Literal(value), ty))
    }
}

fn lower_call(spec: Arc<ActionSpec>, bindings: Vec<(String, Operand)>) -> Action {
    Box::new(move |_: &mut StateMachine, scope: &Scope| {
        let mut args = Args::default();
        for (name, operand) in &bindings {
            args.push(name.clone(), operand.resolve(scope)?);
        }
        tracing::trace!("calling action {} with {} arguments", spec.name(), args.len());
        spec.call(&args)
            .map_err(|source| RuntimeError::Action {
                action: spec.name().to_string(),
                source,
            })
    })
}
