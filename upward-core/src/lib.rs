//! Upward Core - applies versioned SQL migrations exactly once
//!
//! This crate follows a hexagonal layout:
//!
//! - **domain**: file-name codec, ledger entries, error types
//! - **ports**: the `Database` capability the engine is written against
//! - **services**: discovery, ledger store, migration engine, scaffold, syntax check
//! - **adapters**: concrete implementations (DuckDB)

pub mod adapters;
pub mod config;
pub mod domain;
pub mod ports;
pub mod services;

use std::sync::Arc;

use adapters::duckdb::DuckDbDatabase;
use config::Config;
use services::*;

// Re-export commonly used types at crate root
pub use domain::result::{Error, Result};
pub use domain::{parse_id, LedgerEntry, MigrationScript};
pub use ports::Database;
pub use services::{AppliedMigrations, MigrationStatus, Migrator, ResumePolicy, UpError};

/// Main context for upward operations
///
/// Holds the configuration, the open database and the services built on it.
pub struct UpwardContext {
    pub config: Config,
    pub database: Arc<DuckDbDatabase>,
    pub migrator: Migrator,
    pub scaffold_service: ScaffoldService,
}

impl UpwardContext {
    /// Open the configured database and prepare the ledger
    ///
    /// Fails with `NilDatabase` when no database is configured.
    pub fn new(config: Config) -> Result<Self> {
        let database = Arc::new(Self::open_database(&config)?);

        let migrator = Migrator::new(database.clone(), config.resume)?;
        let scaffold_service = ScaffoldService::new(config.migrations_dir.clone());

        Ok(Self {
            config,
            database,
            migrator,
            scaffold_service,
        })
    }

    fn open_database(config: &Config) -> Result<DuckDbDatabase> {
        let path = config.database.as_deref().ok_or(Error::NilDatabase)?;

        if config.is_in_memory() {
            DuckDbDatabase::open_in_memory()
        } else {
            DuckDbDatabase::open(path, config.encryption_key.as_deref())
        }
    }

    /// Apply pending migrations from the configured directory
    pub fn up(&self) -> std::result::Result<AppliedMigrations, UpError> {
        self.migrator.up(&self.config.migrations_dir)
    }

    pub fn status(&self) -> Result<MigrationStatus> {
        self.migrator.status(&self.config.migrations_dir)
    }

    /// Syntax-check pending scripts, or every script when `all` is set
    pub fn check(&self, all: bool) -> Result<Vec<SyntaxIssue>> {
        let scripts = if all {
            load_scripts(&self.config.migrations_dir)?
        } else {
            self.migrator.pending(&self.config.migrations_dir)?
        };
        check_scripts(&scripts)
    }
}
