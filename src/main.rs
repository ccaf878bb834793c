// File: src/main.rs
//
// Command-line driver for Moss. Running with a script path interprets the
// file; running with no arguments opens the REPL. Exit codes follow the
// sysexits convention: 64 usage, 65 compile error, 70 runtime error,
// 74 I/O error.

use std::fs;
use std::path::{Path, PathBuf};
use std::process;

use clap::Parser as ClapParser;
use colored::Colorize;

use moss::errors::InterpretError;
use moss::repl::Repl;
use moss::vm::Vm;

#[derive(ClapParser)]
#[command(
    name = "moss",
    about = "Moss: a small scripting language with closures",
    version = env!("CARGO_PKG_VERSION"),
    long_about = None
)]
struct Cli {
    /// Path to a Moss script; starts the REPL when omitted
    script: Option<PathBuf>,

    /// Print compiled bytecode to stderr before running
    #[arg(long)]
    dump_bytecode: bool,
}

fn main() {
    let cli = Cli::try_parse().unwrap_or_else(|err| {
        use clap::error::ErrorKind;
        if matches!(err.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) {
            err.exit();
        }
        eprintln!("{err}");
        process::exit(64);
    });

    match cli.script {
        Some(path) => run_file(&path, cli.dump_bytecode),
        None => run_repl(),
    }
}

fn run_file(path: &Path, dump_bytecode: bool) -> ! {
    let source = match fs::read_to_string(path) {
        Ok(source) => source,
        Err(err) => {
            eprintln!("{} could not read {}: {}", "error:".bright_red().bold(), path.display(), err);
            process::exit(74);
        }
    };

    let mut vm = Vm::new();
    vm.set_dump_bytecode(dump_bytecode);
    match vm.interpret(&source) {
        Ok(()) => process::exit(0),
        Err(InterpretError::Compile) => process::exit(65),
        Err(InterpretError::Runtime) => process::exit(70),
    }
}

fn run_repl() -> ! {
    match Repl::new() {
        Ok(mut repl) => {
            if let Err(err) = repl.run() {
                eprintln!("{} {}", "error:".bright_red().bold(), err);
                process::exit(1);
            }
            process::exit(0);
        }
        Err(err) => {
            eprintln!("{} failed to start the shell: {}", "error:".bright_red().bold(), err);
            process::exit(1);
        }
    }
}
