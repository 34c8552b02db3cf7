use std::env;
use std::fs;
use std::io::{self, BufRead, Write};
use std::process;

use cmel::runtime::vm::{InterpretError, Vm};

// BSD sysexits, matching the test harness contract.
const EX_USAGE: i32 = 64;
const EX_DATAERR: i32 = 65;
const EX_SOFTWARE: i32 = 70;

fn main() {
    let args: Vec<String> = env::args().collect();
    match args.len() {
        1 => repl(),
        2 => run_file(&args[1]),
        _ => {
            eprintln!("Usage: cmel [path]");
            process::exit(EX_USAGE);
        }
    }
}

fn run_file(path: &str) {
    let source = match fs::read_to_string(path) {
        Ok(source) => source,
        Err(error) => {
            eprintln!("Could not read \"{}\": {}", path, error);
            process::exit(EX_USAGE);
        }
    };

    let mut vm = Vm::new();
    match vm.interpret(&source) {
        Ok(()) => {}
        Err(InterpretError::Compile(diagnostics)) => {
            for diagnostic in diagnostics {
                eprintln!("{}", diagnostic);
            }
            process::exit(EX_DATAERR);
        }
        Err(InterpretError::Runtime(message)) => {
            eprint!("{}", message);
            process::exit(EX_SOFTWARE);
        }
    }
}

fn repl() {
    let mut vm = Vm::new();
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();

    loop {
        print!("> ");
        if io::stdout().flush().is_err() {
            return;
        }
        let line = match lines.next() {
            Some(Ok(line)) => line,
            _ => {
                println!();
                return;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        // One VM across lines keeps globals alive; errors only reset the
        // value stack.
        match vm.interpret(&line) {
            Ok(()) => {}
            Err(InterpretError::Compile(diagnostics)) => {
                for diagnostic in diagnostics {
                    eprintln!("{}", diagnostic);
                }
            }
            Err(InterpretError::Runtime(message)) => {
                eprint!("{}", message);
            }
        }
    }
}
