//! Check command - parse scripts without running them

use anyhow::Result;
use comfy_table::{Cell, Color};

use super::get_context;
use crate::output;
use crate::GlobalArgs;

pub fn run(args: &GlobalArgs, all: bool) -> Result<()> {
    let ctx = get_context(args)?;
    let issues = ctx.check(all)?;

    if issues.is_empty() {
        output::success(if all {
            "All migrations parse"
        } else {
            "All pending migrations parse"
        });
        return Ok(());
    }

    let mut table = output::create_table();
    table.set_header(vec!["Migration", "ID", "Error"]);
    for issue in &issues {
        table.add_row(vec![
            Cell::new(output::file_name(&issue.path)),
            Cell::new(issue.id),
            Cell::new(&issue.message).fg(Color::Red),
        ]);
    }

    println!("{}", table);
    output::error(&format!("{} migration(s) failed to parse", issues.len()));
    std::process::exit(1);
}
