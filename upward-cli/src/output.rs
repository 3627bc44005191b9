//! Output formatting utilities

use std::path::Path;

use colored::Colorize;
use comfy_table::{presets::UTF8_FULL_CONDENSED, Cell, Color, ContentArrangement, Table};
use upward_core::{AppliedMigrations, LedgerEntry};

/// Print a success message
pub fn success(msg: &str) {
    println!("{}", msg.green());
}

/// Print an error message
pub fn error(msg: &str) {
    eprintln!("{}", msg.red());
}

/// Print a warning message
pub fn warning(msg: &str) {
    println!("{}", msg.yellow());
}

/// Print an info message
pub fn info(msg: &str) {
    println!("{}", msg.cyan());
}

/// Create a styled table
pub fn create_table() -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table
}

/// Only the file name, falling back to the whole path
pub fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Cell showing whether a ledger entry applied cleanly
pub fn state_cell(entry: &LedgerEntry) -> Cell {
    if entry.applied {
        Cell::new("applied").fg(Color::Green)
    } else {
        Cell::new("dirty").fg(Color::Red)
    }
}

/// Table of ledger entries written by one run
pub fn applied_table(applied: &AppliedMigrations) -> Table {
    let mut table = create_table();
    table.set_header(vec!["Migration", "ID", "Recorded", "State"]);

    for (path, entry) in applied {
        table.add_row(vec![
            Cell::new(file_name(path)),
            Cell::new(entry.id),
            Cell::new(entry.created_at.format("%Y-%m-%d %H:%M:%S")),
            state_cell(entry),
        ]);
    }

    table
}
