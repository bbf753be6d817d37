//! loxvm-drv - Driver plumbing for the `loxvm` binary.
//!
//! The driver owns everything outside the language itself: reading script
//! files, the line-at-a-time REPL, the bytecode dump debug aid, and the
//! mapping from interpreter outcomes to process exit codes.
//!
//! Exit codes follow the BSD `sysexits` convention the CLI contract names:
//! 0 success, 64 bad usage, 65 compile error, 66 unreadable input, 70
//! runtime error.

use std::io::{self, BufRead, IsTerminal, Write};
use std::path::Path;

use anyhow::Context;
use tracing::debug;

use loxvm_bytecode::debug::disassemble;
use loxvm_runtime::{GlobalVariables, Heap};
use loxvm_util::Handler;
use loxvm_vm::{InterpretError, Vm};

/// Process exit codes.
pub mod exit_code {
    /// Clean exit.
    pub const OK: i32 = 0;
    /// Command line could not be parsed.
    pub const USAGE: i32 = 64;
    /// Source failed to compile.
    pub const COMPILE_ERROR: i32 = 65;
    /// Script file missing or unreadable.
    pub const UNREADABLE_INPUT: i32 = 66;
    /// Execution aborted with a runtime error.
    pub const RUNTIME_ERROR: i32 = 70;
}

/// Driver options.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Print the compiled bytecode listing to stderr before running.
    pub dump_bytecode: bool,
}

/// Reads, compiles, and runs a script file; returns the exit code.
pub fn run_file(path: &Path, config: &Config) -> i32 {
    let source = match read_source(path) {
        Ok(source) => source,
        Err(err) => {
            eprintln!("error: {:#}", err);
            return exit_code::UNREADABLE_INPUT;
        }
    };

    debug!(path = %path.display(), bytes = source.len(), "running script");
    if config.dump_bytecode {
        dump_bytecode(&source, "script");
    }

    let mut vm = Vm::new();
    exit_code_for(vm.interpret(&source))
}

/// The interactive session: one `interpret` per stdin line, on a single VM
/// so interned strings and globals persist. A failed line does not end the
/// session; end of input exits cleanly.
pub fn repl(config: &Config) -> i32 {
    let stdin = io::stdin();
    let show_prompt = stdin.is_terminal();
    let mut vm = Vm::new();

    loop {
        if show_prompt {
            print!("> ");
            let _ = io::stdout().flush();
        }

        let mut line = String::new();
        match stdin.lock().read_line(&mut line) {
            Ok(0) => return exit_code::OK,
            Ok(_) => {
                if config.dump_bytecode {
                    dump_bytecode(&line, "repl");
                }
                let _ = vm.interpret(&line);
            }
            Err(err) => {
                eprintln!("error: failed to read stdin: {}", err);
                return exit_code::UNREADABLE_INPUT;
            }
        }
    }
}

/// Maps an interpreter outcome to its exit code.
pub fn exit_code_for(result: Result<(), InterpretError>) -> i32 {
    match result {
        Ok(()) => exit_code::OK,
        Err(InterpretError::Compile) => exit_code::COMPILE_ERROR,
        Err(InterpretError::Runtime(_)) => exit_code::RUNTIME_ERROR,
    }
}

fn read_source(path: &Path) -> anyhow::Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("cannot read '{}'", path.display()))
}

/// Compiles against a throwaway heap and prints the listing to stderr.
/// Compile errors stay silent here; the real run reports them.
fn dump_bytecode(source: &str, name: &str) {
    let mut heap = Heap::new();
    let mut globals = GlobalVariables::new();
    let handler = Handler::new();

    if let Some(chunk) = loxvm_compiler::compile(source, &mut heap, &mut globals, &handler) {
        eprint!("{}", disassemble(&chunk, &heap, name));
    }
}
