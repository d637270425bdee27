//! mova - state machine language toolchain
//!
//! Inspects, checks and runs mova sources against a registry described in YAML.

mod config;
mod registry_file;
mod repl;

use clap::{Parser, Subcommand};
use colored::Colorize;
use config::Config;
use mova_core::{CompiledMachine, Compiler};
use mova_syntax::{default_rules, Lexer, TokenKind};
use registry_file::{render_call, RegistryFile};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "mova")]
#[command(about = "Compile and run mova state machines")]
#[command(version)]
struct Cli {
    /// Configuration file
    #[arg(short, long, env = "MOVA_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the token stream of a source file
    Tokens {
        /// Source file
        file: PathBuf,
    },

    /// Print the syntax tree of a source file as JSON
    Parse {
        /// Source file
        file: PathBuf,
    },

    /// Compile a source file against a registry
    Check {
        /// Source file
        file: PathBuf,

        /// Registry description (YAML)
        #[arg(short, long)]
        registry: PathBuf,
    },

    /// Run a machine, reading events from a script or interactively
    Run {
        /// Source file
        file: PathBuf,

        /// Registry description (YAML)
        #[arg(short, long)]
        registry: PathBuf,

        /// Event script, one `EVENT [payload]` per line
        #[arg(short, long)]
        script: Option<PathBuf>,
    },
}

fn main() {
    let cli = Cli::parse();

    let config = match Config::load(cli.config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("{}: {}", "Error".red(), e);
            std::process::exit(1);
        }
    };

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.log.filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = execute(cli.command, &config) {
        eprintln!("{}: {}", "Error".red(), e);
        std::process::exit(1);
    }
}

fn execute(command: Commands, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Commands::Tokens { file } => print_tokens(&file),
        Commands::Parse { file } => {
            let reader = BufReader::new(File::open(&file)?);
            let ast = mova_syntax::Parser::from_reader(reader, display_name(&file)).parse_file()?;
            println!("{}", serde_json::to_string_pretty(&ast)?);
            Ok(())
        }
        Commands::Check { file, registry } => {
            let machine = compile(&file, &registry, config)?;
            print_summary(&machine);
            Ok(())
        }
        Commands::Run {
            file,
            registry,
            script,
        } => {
            let machine = Arc::new(compile(&file, &registry, config)?);
            for warning in machine.warnings() {
                eprintln!("{}: {}", "Warning".yellow(), warning);
            }
            let mut instance = machine.instantiate()?;
            match script {
                Some(path) => repl::run_script(&mut instance, BufReader::new(File::open(path)?)),
                None => repl::run(&mut instance, &config.repl),
            }
        }
    }
}

fn display_name(path: &Path) -> String {
    path.display().to_string()
}

fn print_tokens(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let reader = BufReader::new(File::open(path)?);
    let mut lexer = Lexer::new(reader, default_rules());
    loop {
        let token = lexer.token();
        match token.kind {
            TokenKind::Eof => return Ok(()),
            TokenKind::Error => {
                return Err(match lexer.take_error() {
                    Some(e) => e.into(),
                    None => "read error".into(),
                })
            }
            TokenKind::Illegal => println!(
                "{}\t{}\t{:?}",
                token.location,
                token.kind.as_str().red(),
                token.text
            ),
            _ => println!("{}\t{}\t{:?}", token.location, token.kind, token.text),
        }
        lexer.advance();
    }
}

fn compile(
    file: &Path,
    registry: &Path,
    config: &Config,
) -> Result<CompiledMachine, Box<dyn std::error::Error>> {
    let description = RegistryFile::from_file(registry)?;
    let registry = description.to_registry(|action, args| {
        println!("{} {}", "->".dimmed(), render_call(action, args));
    })?;
    tracing::debug!(
        "registry has triggers {:?} and actions {:?}",
        registry.trigger_names(),
        registry.action_names()
    );

    let source = File::open(file)?;
    let machine = Compiler::new(&registry)
        .with_options(config.compiler.clone())
        .with_constants(description.constants())
        .build(&display_name(file), source)?;
    Ok(machine)
}

fn print_summary(machine: &CompiledMachine) {
    println!("{} {}", "entry:".bold(), machine.entry_state().green());
    println!("{}", "states:".bold());
    for name in machine.state_names() {
        if let Some(state) = machine.state(name) {
            println!(
                "  {} ({} init actions, {} triggers)",
                name.cyan(),
                state.init_count(),
                state.triggers().len()
            );
            for (index, trigger) in state.triggers().iter().enumerate() {
                let events: Vec<&str> = trigger.conditions().iter().map(|c| c.trigger()).collect();
                println!(
                    "    #{} on {}: {} actions",
                    index,
                    events.join(" | "),
                    trigger.action_count()
                );
            }
        }
    }
    for warning in machine.warnings() {
        println!("{}: {}", "Warning".yellow(), warning);
    }
    if let Some(checksum) = machine.checksum() {
        println!("{} {}", "checksum:".bold(), checksum);
    }
}
