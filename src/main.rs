#[macro_use]
mod errors;
mod command;
mod repl;
mod sql;
mod storage;

use clap::Parser;
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser)]
#[command(
    name = "minisql",
    version = VERSION,
    about = "Tiny single-table SQL database."
)]
struct Cli {
    /// Path to the database file; created on first open.
    file: PathBuf,
    /// File receiving the structured log output. Logs never go to stdout,
    /// which belongs to the REPL.
    #[arg(long, env = "MINISQL_LOG", default_value = "minisql.log")]
    log_file: PathBuf,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let log_file = match OpenOptions::new()
        .append(true)
        .create(true)
        .open(&cli.log_file)
    {
        Ok(file) => file,
        Err(e) => {
            println!("unable to open log file: {}", e);
            return ExitCode::FAILURE;
        }
    };

    tracing_subscriber::fmt()
        .with_writer(Arc::new(log_file))
        .with_ansi(false)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    match repl::console::start(&cli.file) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            println!("{}", e);
            ExitCode::FAILURE
        }
    }
}
