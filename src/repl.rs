//! Event sessions against a live machine, scripted or interactive.

use crate::config::ReplConfig;
use colored::Colorize;
use mova_core::{Outcome, Payload, StateMachine};
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use rustyline::{Config, Editor};
use std::io::BufRead;

const HELP_TEXT: &str = r#"
Available commands:
  help                     Show this help
  state                    Show the current state
  move <state>             Move to a state and run its init actions
  <EVENT> [payload]        Emit an event, payload is a JSON object
  emit <EVENT> [payload]   Emit an event named like a command
  quit, exit               Exit the session

The words help, state, move, emit, quit and exit are commands. Use the emit
form for events with those names.
"#;

/// Executes one session line. Returns `Ok(None)` when the session should end.
pub fn execute_line(
    machine: &mut StateMachine,
    line: &str,
) -> Result<Option<String>, Box<dyn std::error::Error>> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(Some(String::new()));
    }

    let (cmd, rest) = match line.split_once(char::is_whitespace) {
        Some((cmd, rest)) => (cmd, rest.trim()),
        None => (line, ""),
    };

    match cmd {
        "help" => Ok(Some(HELP_TEXT.trim().to_string())),
        "quit" | "exit" => Ok(None),
        "state" => Ok(Some(machine.current_state().to_string())),
        "move" => {
            if rest.is_empty() {
                return Err("usage: move <state>".into());
            }
            machine.move_to(rest)?;
            Ok(Some(format!("now in {}", machine.current_state())))
        }
        "emit" => {
            let (event, payload) = match rest.split_once(char::is_whitespace) {
                Some((event, payload)) => (event, payload.trim()),
                None => (rest, ""),
            };
            if event.is_empty() {
                return Err("usage: emit <EVENT> [payload]".into());
            }
            emit(machine, event, payload)
        }
        event => emit(machine, event, rest),
    }
}

fn emit(
    machine: &mut StateMachine,
    event: &str,
    payload: &str,
) -> Result<Option<String>, Box<dyn std::error::Error>> {
    let payload = parse_payload(payload)?;
    let outcome = machine.emit(event, &payload)?;
    Ok(Some(describe(event, &outcome, machine.current_state())))
}

fn parse_payload(text: &str) -> Result<Payload, Box<dyn std::error::Error>> {
    if text.is_empty() {
        return Ok(Payload::new());
    }
    let json: serde_json::Value = serde_json::from_str(text)?;
    Payload::from_json(&json).ok_or_else(|| "payload must be a JSON object".into())
}

fn describe(event: &str, outcome: &Outcome, current: &str) -> String {
    match outcome {
        Outcome::Fired(fired) if fired.transitioned() => format!(
            "{} fired {}#{}: {} -> {}",
            event, fired.from_state, fired.trigger, fired.from_state, fired.to_state
        ),
        Outcome::Fired(fired) => format!(
            "{} fired {}#{}, still in {}",
            event, fired.from_state, fired.trigger, fired.to_state
        ),
        Outcome::NoMatch => format!("{} matched no trigger in {}", event, current),
    }
}

/// Runs every line of `script`. Stops at the first failing line.
pub fn run_script<R: BufRead>(
    machine: &mut StateMachine,
    script: R,
) -> Result<(), Box<dyn std::error::Error>> {
    for (index, line) in script.lines().enumerate() {
        let line = line?;
        match execute_line(machine, &line) {
            Ok(Some(output)) if output.is_empty() => {}
            Ok(Some(output)) => println!("{}", output),
            Ok(None) => break,
            Err(e) => return Err(format!("line {}: {}", index + 1, e).into()),
        }
    }
    Ok(())
}

/// Runs an interactive session until `quit` or end of input.
pub fn run(
    machine: &mut StateMachine,
    config: &ReplConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", "mova".bold().cyan());
    println!("Entered state {}.", machine.current_state().yellow());

    let rl_config = Config::builder()
        .history_ignore_space(true)
        .auto_add_history(true)
        .build();
    let mut rl: Editor<(), DefaultHistory> = Editor::with_config(rl_config)?;

    if let Some(path) = &config.history {
        let _ = rl.load_history(path);
    }

    println!("Type 'help' for available commands.\n");

    loop {
        let prompt = format!("{} ", config.prompt.cyan());
        match rl.readline(&prompt) {
            Ok(line) => match execute_line(machine, &line) {
                Ok(Some(output)) if output.is_empty() => {}
                Ok(Some(output)) => println!("{}\n", output),
                Ok(None) => break,
                Err(e) => println!("{}: {}\n", "Error".red(), e),
            },
            Err(ReadlineError::Interrupted) => {
                println!("^C");
                continue;
            }
            Err(ReadlineError::Eof) => {
                println!("^D");
                break;
            }
            Err(err) => {
                println!("{}: {:?}", "Error".red(), err);
                break;
            }
        }
    }

    if let Some(path) = &config.history {
        let _ = rl.save_history(path);
    }

    Ok(())
}
