//! Scaffold service - create empty up/down script pairs

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::Serialize;
use tracing::info;

use crate::domain::migration::{script_file_name, Direction};
use crate::domain::result::{Error, Result};

/// Paths of a freshly created script pair
#[derive(Debug, Clone, Serialize)]
pub struct ScaffoldedPair {
    pub id: i64,
    pub up: PathBuf,
    pub down: PathBuf,
}

pub struct ScaffoldService {
    migrations_dir: PathBuf,
}

impl ScaffoldService {
    pub fn new(migrations_dir: impl Into<PathBuf>) -> Self {
        Self {
            migrations_dir: migrations_dir.into(),
        }
    }

    pub fn migrations_dir(&self) -> &Path {
        &self.migrations_dir
    }

    /// Create `<now>_<name>.up.sql` and `<now>_<name>.down.sql`
    pub fn create(&self, name: &str) -> Result<ScaffoldedPair> {
        self.create_at(name, Utc::now().timestamp())
    }

    /// Create a pair stamped with `timestamp` (UNIX seconds)
    ///
    /// Existing files are never overwritten.
    pub fn create_at(&self, name: &str, timestamp: i64) -> Result<ScaffoldedPair> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::validation("migration name cannot be empty"));
        }
        if name.contains(['/', '\\']) {
            return Err(Error::validation(format!(
                "migration name cannot contain path separators: {}",
                name
            )));
        }

        std::fs::create_dir_all(&self.migrations_dir)?;

        let up = self.create_file(&script_file_name(timestamp, name, Direction::Up))?;
        let down = self.create_file(&script_file_name(timestamp, name, Direction::Down))?;

        info!(up = %up.display(), down = %down.display(), "created migration pair");
        Ok(ScaffoldedPair {
            id: timestamp,
            up,
            down,
        })
    }

    fn create_file(&self, file_name: &str) -> Result<PathBuf> {
        let path = self.migrations_dir.join(file_name);
        OpenOptions::new().write(true).create_new(true).open(&path)?;
        Ok(path)
    }
}
