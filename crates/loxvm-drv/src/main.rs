//! loxvm - Bytecode compiler and virtual machine for Lox.
//!
//! With no arguments this starts a REPL over stdin; with a path it runs
//! the file once. Diagnostics go to stderr, program output to stdout, and
//! the exit code reports what went wrong (64 usage, 65 compile error, 66
//! unreadable input, 70 runtime error).

use std::path::PathBuf;
use std::process;

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use loxvm_drv::{exit_code, repl, run_file, Config};

/// Bytecode compiler and virtual machine for the Lox language.
#[derive(Parser, Debug)]
#[command(name = "loxvm")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Bytecode compiler and virtual machine for Lox", long_about = None)]
struct Cli {
    /// Script to run; omit for an interactive session
    script: Option<PathBuf>,

    /// Print the compiled bytecode listing to stderr before running
    #[arg(long, env = "LOXVM_DUMP_BYTECODE")]
    dump_bytecode: bool,
}

fn main() {
    // Logging goes to stderr so it never mixes with program output.
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env())
        .init();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            // Help and version requests print to stdout and exit cleanly;
            // anything else is a usage error.
            let code = if err.use_stderr() {
                exit_code::USAGE
            } else {
                exit_code::OK
            };
            let _ = err.print();
            process::exit(code);
        }
    };

    let config = Config {
        dump_bytecode: cli.dump_bytecode,
    };
    let code = match cli.script {
        Some(path) => run_file(&path, &config),
        None => repl(&config),
    };
    process::exit(code);
}
