//! The interactive shell and the one-shot CLI driver.
//!
//! The shell gathers lines until parentheses balance, hands the whole
//! request to the interpreter, and renders either the result or one of
//! the four error categories. Interrupts only ever cancel the pending
//! input; the interpreter itself is never suspended.

use std::fs;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::PathBuf;

use clap::Parser;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

use crate::error::Error;
use crate::interpreter::Interpreter;

#[derive(Parser)]
#[command(name = "schemer")]
#[command(about = "Interactive interpreter for a small Scheme dialect", version)]
pub struct Cli {
    /// Evaluate one expression and exit (repeatable)
    #[arg(short = 'e', long = "eval", value_name = "EXPR")]
    eval: Vec<String>,

    /// Run a file of expressions instead of starting the prompt
    file: Option<PathBuf>,
}

pub fn run_cli() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let cli = Cli::parse();
    let mut interp = Interpreter::new();

    if !cli.eval.is_empty() {
        for expr in &cli.eval {
            println!("{}", run_or_die(&mut interp, expr));
        }
        return Ok(());
    }
    if let Some(path) = &cli.file {
        let source = fs::read_to_string(path)?;
        for expr in split_expressions(&source) {
            println!("{}", run_or_die(&mut interp, &expr));
        }
        return Ok(());
    }
    interactive(&mut interp)
}

fn interactive(interp: &mut Interpreter) -> Result<(), Box<dyn std::error::Error>> {
    println!("schemer {} -- a small Scheme. Ctrl-D exits.\n", env!("CARGO_PKG_VERSION"));
    let mut editor = DefaultEditor::new()?;
    loop {
        let mut request = String::new();
        loop {
            let prompt = if request.is_empty() { ">> " } else { ".. " };
            match editor.readline(prompt) {
                Ok(line) => {
                    if line.trim().is_empty() {
                        break;
                    }
                    request.push_str(&line);
                    request.push('\n');
                    if balance(&request) <= 0 {
                        break;
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    request.clear();
                    break;
                }
                Err(ReadlineError::Eof) => return Ok(()),
                Err(err) => return Err(err.into()),
            }
        }
        let request = request.trim().to_string();
        if request.is_empty() {
            continue;
        }
        let _ = editor.add_history_entry(&request);
        match run_protected(interp, &request) {
            Ok(result) => println!("{result}\n"),
            Err(err) => println!("{}: {}", err.label(), err),
        }
    }
}

/// Net count of open parentheses in `text`.
fn balance(text: &str) -> i64 {
    let mut open = 0;
    for c in text.chars() {
        match c {
            '(' => open += 1,
            ')' => open -= 1,
            _ => {}
        }
    }
    open
}

/// Splits a script into balanced requests, one per run of lines whose
/// parentheses close.
fn split_expressions(source: &str) -> Vec<String> {
    let mut expressions = Vec::new();
    let mut current = String::new();
    for line in source.lines() {
        if current.is_empty() && line.trim().is_empty() {
            continue;
        }
        current.push_str(line);
        current.push('\n');
        if balance(&current) <= 0 {
            expressions.push(current.trim().to_string());
            current.clear();
        }
    }
    if !current.trim().is_empty() {
        expressions.push(current.trim().to_string());
    }
    expressions
}

/// Runs one turn, demoting panics to the catch-all category so the
/// shell never dies mid-session.
fn run_protected(interp: &mut Interpreter, input: &str) -> Result<String, Error> {
    match catch_unwind(AssertUnwindSafe(|| interp.run(input))) {
        Ok(outcome) => outcome,
        Err(_) => Err(Error::Unknown("internal interpreter failure".into())),
    }
}

fn run_or_die(interp: &mut Interpreter, input: &str) -> String {
    match run_protected(interp, input) {
        Ok(result) => result,
        Err(err) => {
            eprintln!("{}: {}", err.label(), err);
            std::process::exit(1);
        }
    }
}
