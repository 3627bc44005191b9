//! CLI command implementations

pub mod check;
pub mod new;
pub mod status;
pub mod up;

use anyhow::{Context, Result};
use upward_core::config::Config;
use upward_core::UpwardContext;

use crate::GlobalArgs;

/// Settings file plus environment, then command-line flags on top
pub fn load_config(args: &GlobalArgs) -> Result<Config> {
    let mut config = Config::load(&args.config)
        .with_context(|| format!("Failed to load settings from {}", args.config.display()))?;

    if let Some(database) = &args.database {
        config.database = Some(database.clone());
    }
    if let Some(dir) = &args.dir {
        config.migrations_dir = dir.clone();
    }

    Ok(config)
}

/// Open the configured database and build the context
pub fn get_context(args: &GlobalArgs) -> Result<UpwardContext> {
    let config = load_config(args)?;

    if config.database.is_none() {
        crate::output::warning(
            "No database configured. Pass --database, set UPWARD_DATABASE, or add \"database\" to the settings file.",
        );
    }

    UpwardContext::new(config).context("Failed to initialize upward context")
}
