//! Statement execution and dot-prefixed meta-commands.
use crate::errors::Error;
use crate::sql::Statement;
use crate::storage::btree::{
    COMMON_NODE_HEADER_SIZE, LEAF_NODE_CELL_SIZE, LEAF_NODE_HEADER_SIZE, LEAF_NODE_MAX_CELLS,
    LEAF_NODE_SPACE_FOR_CELLS,
};
use crate::storage::row::ROW_SIZE;
use crate::storage::{self, Row, Table};
use tracing::info;

/// What a successfully executed statement produced.
pub enum ExecuteOutcome {
    /// The statement mutated the table.
    Done,
    /// A select yielded rows in key order.
    Rows(Vec<Row>),
}

/// Runs a prepared statement against the table.
pub fn execute_statement(
    statement: Statement,
    table: &mut Table,
) -> Result<ExecuteOutcome, Error> {
    match statement {
        Statement::Insert(row) => execute_insert(&row, table),
        Statement::Select => execute_select(table),
    }
}

pub fn execute_insert(row: &Row, table: &mut Table) -> Result<ExecuteOutcome, Error> {
    storage::insert_row(table, row)?;
    Ok(ExecuteOutcome::Done)
}

pub fn execute_select(table: &mut Table) -> Result<ExecuteOutcome, Error> {
    Ok(ExecuteOutcome::Rows(storage::select_rows(table)?))
}

/// Outcome of a dot-prefixed meta-command.
pub enum MetaOutcome {
    /// Text for the console to print.
    Output(String),
    /// `.exit` — the caller closes the table and ends the session.
    Exit,
    Unrecognized,
}

pub fn do_meta_command(input: &str, table: &mut Table) -> Result<MetaOutcome, Error> {
    match input {
        ".exit" => {
            info!("Exit requested");
            Ok(MetaOutcome::Exit)
        }
        ".constants" => Ok(MetaOutcome::Output(format!(
            "Constants ->\n{}",
            render_constants()
        ))),
        ".btree" => Ok(MetaOutcome::Output(format!(
            "Btree ->\n{}",
            storage::table::render_tree(table)?
        ))),
        _ => Ok(MetaOutcome::Unrecognized),
    }
}

/// The layout constants the `.constants` command reports.
fn render_constants() -> String {
    format!(
        "ROW_SIZE: {}\n\
         COMMON_NODE_HEADER_SIZE: {}\n\
         LEAF_NODE_HEADER_SIZE: {}\n\
         LEAF_NODE_CELL_SIZE: {}\n\
         LEAF_NODE_SPACE_FOR_CELLS: {}\n\
         LEAF_NODE_MAX_CELLS: {}\n",
        ROW_SIZE,
        COMMON_NODE_HEADER_SIZE,
        LEAF_NODE_HEADER_SIZE,
        LEAF_NODE_CELL_SIZE,
        LEAF_NODE_SPACE_FOR_CELLS,
        LEAF_NODE_MAX_CELLS,
    )
}
