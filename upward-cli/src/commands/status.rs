//! Status command - show the ledger frontier and pending migrations

use anyhow::Result;
use colored::Colorize;
use comfy_table::{Cell, Color, ContentArrangement, Table};

use super::get_context;
use crate::output;
use crate::GlobalArgs;

pub fn run(args: &GlobalArgs, json: bool) -> Result<()> {
    let ctx = get_context(args)?;
    let status = ctx.status()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(());
    }

    println!("{}", "Migration Status".bold());
    println!();

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);

    let database = ctx
        .database
        .db_path()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "in-memory".to_string());
    let state = match &status.frontier {
        None => Cell::new("empty"),
        Some(entry) if entry.applied => Cell::new("clean").fg(Color::Green),
        Some(_) => Cell::new("dirty").fg(Color::Red),
    };
    let frontier = status
        .frontier
        .as_ref()
        .map(|e| format!("{} ({})", e.id, e.created_at.format("%Y-%m-%d %H:%M:%S")))
        .unwrap_or_else(|| "-".to_string());

    table.add_row(vec![Cell::new("Database"), Cell::new(database)]);
    table.add_row(vec![
        Cell::new("Migrations"),
        Cell::new(ctx.config.migrations_dir.display()),
    ]);
    table.add_row(vec![Cell::new("Resume"), Cell::new(ctx.migrator.policy())]);
    table.add_row(vec![Cell::new("Frontier"), Cell::new(frontier)]);
    table.add_row(vec![Cell::new("State"), state]);
    table.add_row(vec![Cell::new("Recorded"), Cell::new(status.recorded)]);
    table.add_row(vec![Cell::new("Pending"), Cell::new(status.pending.len())]);

    println!("{}", table);
    println!();

    if status.dirty {
        output::warning("Ledger is dirty: up will refuse to run until the last migration is repaired.");
    }

    if !status.pending.is_empty() {
        println!("{}", "Pending Migrations".bold());
        for script in &status.pending {
            println!("  • {}", script.file_name());
        }
    }

    Ok(())
}
