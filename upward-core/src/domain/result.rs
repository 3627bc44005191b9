//! Result and error types for the core library

use std::path::PathBuf;

use thiserror::Error;

/// Core library error type
#[derive(Error, Debug)]
pub enum Error {
    /// Engine constructed without a database handle
    #[error("migrate: database cannot be nil")]
    NilDatabase,

    /// The most recent ledger entry did not apply; the ledger must be repaired by hand
    #[error("migrate: dirty migration with ID {id}. Fix it, and try again")]
    DirtyLedger { id: u64 },

    #[error("migrate: unexpected file name format: {0}")]
    InvalidName(String),

    #[error("Discovery error: {0}")]
    Discovery(String),

    /// The script file could not be read; scripts must be UTF-8 text
    #[error("error while applying {} migration: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Ledger read/write failure
    #[error("Ledger error: {0}")]
    Store(String),

    /// Raw failure reported by a `Database` implementation
    #[error("Database error: {0}")]
    Database(String),

    /// The script ran and failed; its dirty ledger row was written
    #[error("error while applying {} migration: {message}", .path.display())]
    Execution {
        path: PathBuf,
        id: u64,
        message: String,
    },

    /// The ledger row for a migration could not be written
    #[error(
        "error while applying {} migration: migrate: {store}: {}",
        .path.display(),
        .execution.as_deref().unwrap_or("<nil>")
    )]
    Record {
        path: PathBuf,
        id: u64,
        store: String,
        execution: Option<String>,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create a database error
    pub fn database(msg: impl Into<String>) -> Self {
        Self::Database(msg.into())
    }

    /// Create a ledger store error
    pub fn store(msg: impl Into<String>) -> Self {
        Self::Store(msg.into())
    }

    /// Create an invalid file name error
    pub fn invalid_name(msg: impl Into<String>) -> Self {
        Self::InvalidName(msg.into())
    }

    /// Create a discovery error
    pub fn discovery(msg: impl Into<String>) -> Self {
        Self::Discovery(msg.into())
    }

    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Whether the ledger now needs manual repair before `up` can run again
    pub fn requires_intervention(&self) -> bool {
        matches!(self, Self::DirtyLedger { .. } | Self::Execution { .. })
    }
}

/// Core library result type
pub type Result<T> = std::result::Result<T, Error>;
