//! Ledger store - append-only record of migration attempts
//!
//! Every attempted migration gets exactly one row, tagged with whether its
//! SQL succeeded. The newest row (by `created_at`) is the frontier; a
//! frontier that did not apply blocks further runs until someone repairs
//! the ledger by hand.

use std::sync::Arc;

use chrono::NaiveDateTime;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::domain::result::{Error, Result};
use crate::domain::LedgerEntry;
use crate::ports::Database;

/// Ledger table bootstrap
pub const CREATE_LEDGER_SQL: &str = "CREATE TABLE IF NOT EXISTS migrations (
    id UBIGINT NOT NULL UNIQUE,
    created_at TIMESTAMP NOT NULL DEFAULT (now()::TIMESTAMP),
    applied BOOLEAN NOT NULL
)";

/// Newest row; equal timestamps fall back to the larger id
pub const FRONTIER_SQL: &str = "SELECT id, created_at::VARCHAR, applied FROM migrations \
    ORDER BY created_at DESC, id DESC LIMIT 1";

pub const RECORD_SQL: &str = "INSERT INTO migrations (id, applied) VALUES (?, ?) \
    RETURNING id, created_at::VARCHAR, applied";

pub const COUNT_SQL: &str = "SELECT COUNT(*) FROM migrations";

/// Database-backed migration ledger
pub struct LedgerStore {
    db: Arc<dyn Database>,
}

impl LedgerStore {
    pub fn new(db: Arc<dyn Database>) -> Self {
        Self { db }
    }

    /// Create the ledger table if it does not exist
    pub fn ensure_schema(&self) -> Result<()> {
        self.db
            .execute(CREATE_LEDGER_SQL, &[])
            .map_err(|e| Error::store(format!("create ledger table: {}", e)))?;
        Ok(())
    }

    /// The newest ledger row, dirty or not
    pub fn last_entry(&self) -> Result<Option<LedgerEntry>> {
        let row = self
            .db
            .query_row(FRONTIER_SQL, &[])
            .map_err(|e| Error::store(format!("read frontier: {}", e)))?;

        row.as_deref().map(entry_from_row).transpose()
    }

    /// Id of the newest ledger row, `None` for an empty ledger
    ///
    /// Fails with `DirtyLedger` when that row did not apply.
    pub fn frontier(&self) -> Result<Option<u64>> {
        match self.last_entry()? {
            None => {
                debug!("ledger is empty");
                Ok(None)
            }
            Some(entry) if entry.is_dirty() => {
                warn!(id = entry.id, "ledger frontier is dirty");
                Err(Error::DirtyLedger { id: entry.id })
            }
            Some(entry) => {
                debug!(id = entry.id, "ledger frontier");
                Ok(Some(entry.id))
            }
        }
    }

    /// Append the outcome of one migration attempt
    ///
    /// Returns the row as persisted, with the database-assigned timestamp.
    /// A second attempt for the same id violates the ledger's unique key.
    pub fn record(&self, id: u64, succeeded: bool) -> Result<LedgerEntry> {
        let row = self
            .db
            .query_row(RECORD_SQL, &[json!(id), json!(succeeded)])
            .map_err(|e| Error::store(e.to_string()))?
            .ok_or_else(|| Error::store(format!("insert of migration {} returned no row", id)))?;

        entry_from_row(&row)
    }

    /// Number of ledger rows
    pub fn count(&self) -> Result<u64> {
        let row = self
            .db
            .query_row(COUNT_SQL, &[])
            .map_err(|e| Error::store(format!("count ledger rows: {}", e)))?;

        row.as_deref()
            .and_then(|r| r.first())
            .and_then(Value::as_u64)
            .ok_or_else(|| Error::store("count returned no value"))
    }
}

/// Decode an `(id, created_at, applied)` row
fn entry_from_row(row: &[Value]) -> Result<LedgerEntry> {
    let [id, created_at, applied] = row else {
        return Err(Error::store(format!(
            "expected 3 ledger columns, got {}",
            row.len()
        )));
    };

    let id = match id {
        Value::Number(n) => n.as_u64(),
        // Drivers that stringify wide integers
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
    .ok_or_else(|| Error::store(format!("invalid ledger id: {}", id)))?;

    let created_at = created_at
        .as_str()
        .and_then(parse_timestamp)
        .ok_or_else(|| Error::store(format!("invalid ledger timestamp: {}", created_at)))?;

    let applied = applied
        .as_bool()
        .ok_or_else(|| Error::store(format!("invalid ledger applied flag: {}", applied)))?;

    Ok(LedgerEntry {
        id,
        created_at,
        applied,
    })
}

/// Parse the timestamp formats DuckDB produces when casting to VARCHAR
fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_utc());
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S"))
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f"))
        .ok()
}
