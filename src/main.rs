// vesper - A Lisp-family scripting language interpreter
// Copyright (c) 2025 Tom Waddington. MIT licensed.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser as ClapParser;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tracing::debug;
use tracing_subscriber::EnvFilter;
use vesper_core::{Config, Error, Interpreter};

/// Run Vesper source files, evaluate expressions, or start a REPL.
#[derive(Debug, ClapParser)]
#[command(name = "vesper", version, about)]
struct Args {
    /// Source files to evaluate, in order
    files: Vec<PathBuf>,

    /// Evaluate an expression and print the result
    #[arg(short, long, value_name = "EXPR")]
    eval: Vec<String>,

    /// Recursion limit for non-tail calls
    #[arg(long, value_name = "N")]
    max_depth: Option<usize>,

    /// Reject local bindings that shadow global functions
    #[arg(long)]
    check_shadowing: bool,

    /// Let `catch` handle security errors
    #[arg(long)]
    catchable_security: bool,
}

impl Args {
    fn config(&self) -> Config {
        let mut config = Config::default()
            .with_check_shadowing(self.check_shadowing)
            .with_catchable_security_errors(self.catchable_security);
        if let Some(depth) = self.max_depth {
            config = config.with_max_depth(depth);
        }
        config
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let interp = match Interpreter::with_config(args.config()) {
        Ok(interp) => interp,
        Err(e) => {
            eprintln!("Failed to start interpreter: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if args.files.is_empty() && args.eval.is_empty() {
        return run_repl(&interp);
    }

    for path in &args.files {
        if let Err(e) = eval_file(path, &interp) {
            report(&e);
            return ExitCode::FAILURE;
        }
    }
    for expr in &args.eval {
        match interp.read_eval_print(expr) {
            Ok(printed) => println!("{}", printed),
            Err(e) => {
                report(&e);
                return ExitCode::FAILURE;
            }
        }
    }
    ExitCode::SUCCESS
}

/// Evaluate a single source file
fn eval_file(path: &Path, interp: &Interpreter) -> Result<(), Error> {
    let source = fs::read_to_string(path)
        .map_err(|e| Error::eval(format!("cannot read '{}': {}", path.display(), e)))?;
    debug!(file = %path.display(), "evaluating file");
    interp.eval_named(&source, &path.display().to_string())?;
    Ok(())
}

/// Print an error; errors that escaped evaluation render their call
/// stack as well.
fn report(err: &Error) {
    eprintln!("{}", err);
    debug!(frames = err.call_stack().len(), kind = err.type_name(), "evaluation failed");
}

/// Run the interactive REPL. Input that ends mid-form keeps reading on
/// the next line.
fn run_repl(interp: &Interpreter) -> ExitCode {
    println!("Vesper v{}", env!("CARGO_PKG_VERSION"));

    let mut editor = match DefaultEditor::new() {
        Ok(editor) => editor,
        Err(e) => {
            eprintln!("Cannot start line editor: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let mut pending = String::new();
    loop {
        let prompt = if pending.is_empty() {
            format!("{}=> ", interp.runtime().current_ns())
        } else {
            "  #_=> ".to_string()
        };
        match editor.readline(&prompt) {
            Ok(line) => {
                if pending.is_empty() && line.trim().is_empty() {
                    continue;
                }
                pending.push_str(&line);
                pending.push('\n');
                match interp.read_eval_print(&pending) {
                    Err(e) if e.is_a("EofError") => continue,
                    Ok(printed) => println!("{}", printed),
                    Err(e) => report(&e),
                }
                let _ = editor.add_history_entry(pending.trim_end());
                pending.clear();
            }
            Err(ReadlineError::Interrupted) => {
                pending.clear();
                interp.clear_interrupt();
            }
            Err(ReadlineError::Eof) => break,
            Err(e) => {
                eprintln!("Read error: {}", e);
                return ExitCode::FAILURE;
            }
        }
    }
    ExitCode::SUCCESS
}
