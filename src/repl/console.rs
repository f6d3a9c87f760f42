//! Interactive REPL console.
//!
//! One prompt, one line, one statement. The console owns the table handle
//! for the whole session and is the only component that writes to stdout, so
//! scripted sessions see exactly the statement output and nothing else.
use crate::command::{self, ExecuteOutcome, MetaOutcome};
use crate::errors::Error;
use crate::repl::history;
use crate::sql;
use crate::storage::Table;
use crossterm::style::Stylize;
use crossterm::tty::IsTty;
use std::io::{self, BufRead, Write};
use std::path::Path;
use tracing::{error, info};
use uuid::Uuid;

const PROMPT: &str = "db > ";

/// Runs the prompt loop until `.exit` or a fatal error.
///
/// Returns `Ok(())` only for a clean `.exit` shutdown; fatal storage or I/O
/// conditions propagate so the process can terminate non-zero after a
/// diagnostic.
pub fn start(path: &Path) -> Result<(), Error> {
    let session_id = Uuid::new_v4();
    info!(session_id = %session_id, db = %path.display(), "Starting REPL session");

    let mut table = Table::open(path)?;

    let history_path = history::default_path();
    let mut last_line = history::load(&history_path).pop();

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();

    loop {
        print!("{}", PROMPT);
        io::stdout().flush()?;

        let line = match lines.next() {
            Some(line) => line?,
            // The session only ends via `.exit`; running out of input is an
            // input error, and the unflushed state is dropped on purpose.
            None => return Err(err!(Storage, "error reading input")),
        };
        let input = line.trim().to_string();
        if input.is_empty() {
            continue;
        }

        if last_line.as_deref() != Some(input.as_str()) {
            if let Err(e) = history::append(&input, &history_path) {
                error!("Failed to append history: {}", e);
            }
            last_line = Some(input.clone());
        }

        if input.starts_with('.') {
            match command::do_meta_command(&input, &mut table)? {
                MetaOutcome::Exit => {
                    table.close()?;
                    info!(session_id = %session_id, "Closed REPL session");
                    return Ok(());
                }
                MetaOutcome::Output(text) => print!("{}", text),
                MetaOutcome::Unrecognized => {
                    echo_error(&format!("Unrecognized command '{}'", input));
                }
            }
            continue;
        }

        let statement = match sql::prepare(&input) {
            Ok(statement) => statement,
            Err(e) => {
                echo_error(&e.to_string());
                continue;
            }
        };

        match command::execute_statement(statement, &mut table) {
            Ok(ExecuteOutcome::Done) => println!("executed"),
            Ok(ExecuteOutcome::Rows(rows)) => {
                for row in rows {
                    println!("{}", row);
                }
                println!("executed");
            }
            // No journal means no recovery: leaving the half-applied state
            // unflushed beats persisting it.
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => echo_error(&e.to_string()),
        }
    }
}

/// Errors go to stdout like every other reply; color only when a human is
/// watching, so piped output stays byte-exact.
fn echo_error(message: &str) {
    if io::stdout().is_tty() {
        println!("{}", message.red());
    } else {
        println!("{}", message);
    }
}
