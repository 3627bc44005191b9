//! Core domain types
//!
//! Pure data structures and the file-name codec - no I/O.

pub mod ledger;
pub mod migration;
pub mod result;

pub use ledger::LedgerEntry;
pub use migration::{parse_id, script_file_name, Direction, MigrationScript};
