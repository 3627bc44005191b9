//! Migration script identity
//!
//! A script's id lives in its file name: `1548938237_create_users.up.sql`.
//! The first 10 bytes of the base name carry the id, so names must use a
//! fixed-width (zero-padded or timestamp) prefix for file-name order to match
//! id order.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;

use super::result::{Error, Result};

/// Shortest accepted base name
const MIN_NAME_LEN: usize = 7;

/// Width of the id window at the start of the base name
const ID_WIDTH: usize = 10;

/// Extract the migration id from a script path
pub fn parse_id(name: impl AsRef<Path>) -> Result<u64> {
    let path = name.as_ref();
    let base = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| Error::invalid_name(path.display().to_string()))?;

    if base.len() < MIN_NAME_LEN {
        return Err(Error::invalid_name(base));
    }

    let window = &base.as_bytes()[..base.len().min(ID_WIDTH)];
    let digits = window.iter().take_while(|b| b.is_ascii_digit()).count();

    if digits == 0 {
        return Err(Error::invalid_name(base));
    }
    if digits < window.len() && !matches!(window[digits], b'_' | b'.' | b'-') {
        return Err(Error::invalid_name(base));
    }

    // The window is ASCII up to `digits`, so this slice is on a char boundary
    base[..digits]
        .parse::<u64>()
        .map_err(|e| Error::invalid_name(format!("{}: {}", base, e)))
}

/// Direction suffix of a script file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Up => "up",
            Direction::Down => "down",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// File name for a new script: `<timestamp>_<name>.<direction>.sql`
pub fn script_file_name(timestamp: i64, name: &str, direction: Direction) -> String {
    format!("{}_{}.{}.sql", timestamp, name, direction)
}

/// An `up` script found on disk, with its parsed id
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MigrationScript {
    pub path: PathBuf,
    pub id: u64,
}

impl MigrationScript {
    /// Build a script from its path, parsing the id from the file name
    pub fn from_path(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let id = parse_id(&path)?;
        Ok(Self { path, id })
    }

    /// Base file name, for display
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }
}
