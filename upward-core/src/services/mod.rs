//! Service layer - discovery, ledger bookkeeping and migration orchestration

pub mod check;
pub mod discovery;
pub mod ledger;
pub mod migration;
mod scaffold;

pub use check::{check_scripts, SyntaxIssue};
pub use discovery::discover;
pub use ledger::LedgerStore;
pub use migration::{load_scripts, AppliedMigrations, MigrationStatus, Migrator, ResumePolicy, UpError};
pub use scaffold::{ScaffoldService, ScaffoldedPair};
