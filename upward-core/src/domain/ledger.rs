//! Ledger entry - one row per attempted migration

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// A migration attempt as stored in the ledger
///
/// Written once when the migration is attempted and never updated.
/// `created_at` is assigned by the database (UTC).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: u64,
    pub created_at: NaiveDateTime,
    pub applied: bool,
}

impl LedgerEntry {
    /// A not-applied entry leaves the ledger dirty when it is the latest row
    pub fn is_dirty(&self) -> bool {
        !self.applied
    }
}
