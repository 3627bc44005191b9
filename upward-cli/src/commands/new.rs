//! New command - scaffold an up/down script pair

use anyhow::{Context, Result};
use upward_core::services::ScaffoldService;

use super::load_config;
use crate::output;
use crate::GlobalArgs;

pub fn run(args: &GlobalArgs, name: &str) -> Result<()> {
    // Scaffolding never touches the database
    let config = load_config(args)?;
    let service = ScaffoldService::new(&config.migrations_dir);

    let pair = service
        .create(name)
        .with_context(|| format!("Failed to create migration '{}'", name))?;

    output::success("Migration created");
    println!("  {}", pair.up.display());
    println!("  {}", pair.down.display());

    Ok(())
}
