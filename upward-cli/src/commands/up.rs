//! Up command - apply pending migrations

use anyhow::Result;
use colored::Colorize;
use serde::Serialize;
use upward_core::{AppliedMigrations, Error};

use super::get_context;
use crate::output;
use crate::GlobalArgs;

/// JSON shape of one `up` run
#[derive(Serialize)]
struct UpReport<'a> {
    applied: &'a AppliedMigrations,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

pub fn run(args: &GlobalArgs, json: bool) -> Result<()> {
    let ctx = get_context(args)?;

    let (applied, failure) = match ctx.up() {
        Ok(applied) => (applied, None),
        Err(e) => (e.applied, Some(e.error)),
    };

    if json {
        let report = UpReport {
            applied: &applied,
            error: failure.as_ref().map(ToString::to_string),
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else if applied.is_empty() {
        if failure.is_none() {
            output::info("Database is up to date");
        }
    } else {
        println!("{}", "Migrations".bold());
        println!("{}", output::applied_table(&applied));
    }

    let Some(error) = failure else {
        if !json && !applied.is_empty() {
            output::success(&format!("Applied {} migration(s)", applied.len()));
        }
        return Ok(());
    };

    if !json {
        if let Some(hint) = remediation(&error) {
            output::warning(hint);
        }
    }

    Err(error.into())
}

/// What the operator should do next, for failures that need a hand
fn remediation(error: &Error) -> Option<&'static str> {
    match error {
        Error::DirtyLedger { .. } => Some(
            "The last migration failed. Repair the database, then delete or fix its row in the migrations table.",
        ),
        Error::Execution { .. } => Some(
            "The failed migration was recorded as dirty. Fix the script and the database before running up again.",
        ),
        Error::Record { .. } => Some(
            "The migration ran but could not be recorded. Check the migrations table before retrying.",
        ),
        _ => None,
    }
}
