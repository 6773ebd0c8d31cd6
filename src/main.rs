//! CLI entry point: a thin wrapper around the `driver` module (§6).
//! Parses arguments, installs the logging backend, runs the program,
//! and renders the final report to standard output.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use rv32i_emu::driver::{self, RunConfig};
use rv32i_emu::memory::DEFAULT_MEMORY_SIZE;

/// Functional instruction-set simulator for the RV32I base integer profile.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the flat binary program image (.bin).
    input: PathBuf,

    /// Memory size in bytes. Programs larger than this are rejected.
    #[arg(long, default_value_t = DEFAULT_MEMORY_SIZE)]
    memory_size: usize,

    /// Halt with an error on an unrecognised opcode instead of
    /// diagnosing and continuing.
    #[arg(long)]
    strict: bool,

    /// Raise logging verbosity. Repeatable (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.verbose);

    let config = RunConfig {
        memory_size: args.memory_size,
        strict: args.strict,
    };

    let mut stdout = std::io::stdout();
    let outcome = match driver::load_and_run(&args.input, &config, &mut stdout) {
        Ok(outcome) => outcome,
        Err(err) => {
            eprintln!("error: {err}");
            return ExitCode::FAILURE;
        }
    };

    if let Some(err) = &outcome.error {
        eprintln!("error: {err}");
    }

    let results_path = driver::derive_results_path(&args.input);
    let comparison = if results_path.exists() {
        match driver::load_expected_results(&results_path) {
            Ok(expected) => Some(driver::compare(&outcome.cpu, &expected)),
            Err(err) => {
                eprintln!("error: {err}");
                None
            }
        }
    } else {
        None
    };

    let mut stdout = std::io::stdout();
    if let Err(err) = driver::report(&outcome.cpu, comparison.as_ref(), &mut stdout) {
        eprintln!("error: failed to write simulation report: {err}");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();
}
