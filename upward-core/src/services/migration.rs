//! Migration service - applies pending `up` scripts and records each attempt
//!
//! Scripts live on disk as `<id>_<name>.up.sql`. Each attempt is written to
//! the ledger whether or not its SQL succeeded, so a failed script leaves a
//! durable dirty row that stops the next run until it is fixed.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::domain::result::{Error, Result};
use crate::domain::{LedgerEntry, MigrationScript};
use crate::ports::Database;
use crate::services::discovery::discover;
use crate::services::ledger::LedgerStore;

/// Where to resume relative to the ledger frontier
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResumePolicy {
    /// Run every script whose id is greater than the frontier id
    #[default]
    AfterFrontier,
    /// Run the scripts after the one whose id equals the frontier id.
    /// When no script has that id, every script is attempted again.
    ExactMatch,
}

impl FromStr for ResumePolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "after-frontier" => Ok(Self::AfterFrontier),
            "exact-match" => Ok(Self::ExactMatch),
            other => Err(Error::Config(format!(
                "unknown resume policy '{}' (expected after-frontier or exact-match)",
                other
            ))),
        }
    }
}

impl fmt::Display for ResumePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AfterFrontier => f.write_str("after-frontier"),
            Self::ExactMatch => f.write_str("exact-match"),
        }
    }
}

/// Entries written by one `up` call, keyed by script path
pub type AppliedMigrations = BTreeMap<PathBuf, LedgerEntry>;

/// A failed `up` call together with what it applied before failing
#[derive(Debug)]
pub struct UpError {
    pub applied: AppliedMigrations,
    pub error: Error,
}

impl fmt::Display for UpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.error, f)
    }
}

impl std::error::Error for UpError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

/// Ledger and directory state, for reporting
#[derive(Debug, Clone, Serialize)]
pub struct MigrationStatus {
    /// Newest ledger row, dirty or not
    pub frontier: Option<LedgerEntry>,
    pub recorded: u64,
    pub dirty: bool,
    /// Scripts `up` would run once the ledger is clean
    pub pending: Vec<MigrationScript>,
}

/// Service that applies migrations against a database
pub struct Migrator {
    db: Arc<dyn Database>,
    ledger: LedgerStore,
    policy: ResumePolicy,
}

impl Migrator {
    /// Create a migrator, creating the ledger table if needed
    pub fn new(db: Arc<dyn Database>, policy: ResumePolicy) -> Result<Self> {
        let ledger = LedgerStore::new(Arc::clone(&db));
        ledger.ensure_schema()?;

        Ok(Self { db, ledger, policy })
    }

    /// Like [`Migrator::new`], for callers holding an optional handle
    ///
    /// Fails with `NilDatabase` before touching anything when the handle is missing.
    pub fn from_handle(db: Option<Arc<dyn Database>>, policy: ResumePolicy) -> Result<Self> {
        let db = db.ok_or(Error::NilDatabase)?;
        Self::new(db, policy)
    }

    pub fn ledger(&self) -> &LedgerStore {
        &self.ledger
    }

    pub fn policy(&self) -> ResumePolicy {
        self.policy
    }

    /// Apply every pending script in `dir`
    ///
    /// Stops at the first failure. The error carries the entries written
    /// before it, including the dirty entry of a script whose SQL failed.
    pub fn up(&self, dir: &Path) -> std::result::Result<AppliedMigrations, UpError> {
        let mut applied = AppliedMigrations::new();

        match self.run_pending(dir, &mut applied) {
            Ok(()) => Ok(applied),
            Err(error) => Err(UpError { applied, error }),
        }
    }

    /// Scripts the next `up` would attempt, without running anything
    ///
    /// A dirty ledger fails before any file name is parsed.
    pub fn pending(&self, dir: &Path) -> Result<Vec<MigrationScript>> {
        let files = discover(dir)?;
        let frontier = self.ledger.frontier()?;
        let scripts = parse_scripts(files)?;
        let start = pending_start(&scripts, frontier, self.policy);
        Ok(scripts[start..].to_vec())
    }

    /// Report the ledger frontier and pending scripts without failing on a dirty ledger
    pub fn status(&self, dir: &Path) -> Result<MigrationStatus> {
        let scripts = load_scripts(dir)?;
        let frontier = self.ledger.last_entry()?;
        let recorded = self.ledger.count()?;
        let start = pending_start(&scripts, frontier.as_ref().map(|e| e.id), self.policy);

        Ok(MigrationStatus {
            dirty: frontier.as_ref().is_some_and(LedgerEntry::is_dirty),
            frontier,
            recorded,
            pending: scripts[start..].to_vec(),
        })
    }

    fn run_pending(&self, dir: &Path, applied: &mut AppliedMigrations) -> Result<()> {
        let pending = self.pending(dir)?;

        if pending.is_empty() {
            info!(dir = %dir.display(), "no pending migrations");
            return Ok(());
        }

        for script in &pending {
            let entry = self.apply(script, applied)?;
            applied.insert(script.path.clone(), entry);
        }

        info!(count = applied.len(), "migrations applied");
        Ok(())
    }

    /// Run one script and record its outcome
    fn apply(&self, script: &MigrationScript, applied: &mut AppliedMigrations) -> Result<LedgerEntry> {
        let sql = std::fs::read_to_string(&script.path).map_err(|source| Error::Read {
            path: script.path.clone(),
            source,
        })?;

        let execution = self.db.execute(&sql, &[]).err();

        let entry = self
            .ledger
            .record(script.id, execution.is_none())
            .map_err(|store| Error::Record {
                path: script.path.clone(),
                id: script.id,
                store: store.to_string(),
                execution: execution.as_ref().map(ToString::to_string),
            })?;

        if let Some(err) = execution {
            warn!(id = script.id, path = %script.path.display(), error = %err, "migration failed");
            applied.insert(script.path.clone(), entry);
            return Err(Error::Execution {
                path: script.path.clone(),
                id: script.id,
                message: err.to_string(),
            });
        }

        info!(id = script.id, path = %script.path.display(), "migration applied");
        Ok(entry)
    }
}

/// Discover the scripts in `dir` and parse all of their ids
pub fn load_scripts(dir: &Path) -> Result<Vec<MigrationScript>> {
    parse_scripts(discover(dir)?)
}

fn parse_scripts(files: Vec<PathBuf>) -> Result<Vec<MigrationScript>> {
    files.into_iter().map(MigrationScript::from_path).collect()
}

/// Index of the first pending script
fn pending_start(scripts: &[MigrationScript], frontier: Option<u64>, policy: ResumePolicy) -> usize {
    let Some(frontier) = frontier else {
        return 0;
    };

    match policy {
        ResumePolicy::AfterFrontier => scripts
            .iter()
            .position(|s| s.id > frontier)
            .unwrap_or(scripts.len()),
        ResumePolicy::ExactMatch => scripts
            .iter()
            .position(|s| s.id == frontier)
            .map_or(0, |i| i + 1),
    }
}
