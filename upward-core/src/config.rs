//! Configuration management
//!
//! Settings live in a JSON file next to the project (default `upward.json`):
//! ```json
//! {
//!   "database": "app.duckdb",
//!   "migrationsDir": "migrations",
//!   "resume": "after-frontier"
//! }
//! ```
//! Environment variables override the file; the CLI overrides both.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::domain::result::{Error, Result};
use crate::services::ResumePolicy;

/// Default settings file name
pub const SETTINGS_FILE: &str = "upward.json";

/// Database value that selects an in-memory database
pub const IN_MEMORY: &str = ":memory:";

const ENV_DATABASE: &str = "UPWARD_DATABASE";
const ENV_MIGRATIONS_DIR: &str = "UPWARD_MIGRATIONS_DIR";
const ENV_RESUME: &str = "UPWARD_RESUME";
const ENV_DB_KEY: &str = "UPWARD_DB_KEY";

/// Raw settings file structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SettingsFile {
    #[serde(default)]
    database: Option<PathBuf>,
    #[serde(default)]
    migrations_dir: Option<PathBuf>,
    #[serde(default)]
    resume: Option<ResumePolicy>,
}

/// Connection and run settings, passed explicitly to the context
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Database file, or `:memory:`. `None` means no database was configured.
    pub database: Option<PathBuf>,
    pub migrations_dir: PathBuf,
    pub resume: ResumePolicy,
    /// Key for an encrypted database file
    pub encryption_key: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: None,
            migrations_dir: PathBuf::from("migrations"),
            resume: ResumePolicy::default(),
            encryption_key: None,
        }
    }
}

impl Config {
    /// Load config from a settings file, then apply environment overrides
    ///
    /// A missing file means defaults. Relative paths in the file are
    /// resolved against the file's directory.
    pub fn load(settings_path: &Path) -> Result<Self> {
        let mut config = Self::from_file(settings_path)?;
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Load only the settings file, without environment overrides
    pub fn from_file(settings_path: &Path) -> Result<Self> {
        if !settings_path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(settings_path)?;
        let raw: SettingsFile = serde_json::from_str(&content).map_err(|e| {
            Error::Config(format!("{}: {}", settings_path.display(), e))
        })?;

        let base = settings_path.parent().unwrap_or_else(|| Path::new(""));
        let defaults = Self::default();

        Ok(Self {
            database: raw.database.map(|p| resolve(base, p)),
            migrations_dir: resolve(base, raw.migrations_dir.unwrap_or(defaults.migrations_dir)),
            resume: raw.resume.unwrap_or_default(),
            encryption_key: None,
        })
    }

    /// Apply overrides from a variable lookup (the process environment in `load`)
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(database) = lookup(ENV_DATABASE).filter(|v| !v.is_empty()) {
            self.database = Some(PathBuf::from(database));
        }
        if let Some(dir) = lookup(ENV_MIGRATIONS_DIR).filter(|v| !v.is_empty()) {
            self.migrations_dir = PathBuf::from(dir);
        }
        if let Some(resume) = lookup(ENV_RESUME).filter(|v| !v.is_empty()) {
            self.resume = resume.parse()?;
        }
        if let Some(key) = lookup(ENV_DB_KEY).filter(|v| !v.is_empty()) {
            self.encryption_key = Some(key);
        }
        Ok(())
    }

    /// Whether the configured database is in-memory
    pub fn is_in_memory(&self) -> bool {
        self.database.as_deref() == Some(Path::new(IN_MEMORY))
    }
}

fn resolve(base: &Path, path: PathBuf) -> PathBuf {
    if path.is_absolute() || path.as_os_str() == IN_MEMORY {
        path
    } else {
        base.join(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempdir().unwrap();
        let config = Config::from_file(&dir.path().join(SETTINGS_FILE)).unwrap();

        assert_eq!(config, Config::default());
        assert_eq!(config.migrations_dir, PathBuf::from("migrations"));
        assert!(config.database.is_none());
    }

    #[test]
    fn test_file_paths_resolve_against_settings_dir() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(SETTINGS_FILE);
        std::fs::write(
            &path,
            r#"{ "database": "app.duckdb", "migrationsDir": "db/migrations", "resume": "exact-match" }"#,
        )
        .unwrap();

        let config = Config::from_file(&path).unwrap();

        assert_eq!(config.database, Some(dir.path().join("app.duckdb")));
        assert_eq!(config.migrations_dir, dir.path().join("db/migrations"));
        assert_eq!(config.resume, ResumePolicy::ExactMatch);
    }

    #[test]
    fn test_in_memory_database_is_not_resolved() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(SETTINGS_FILE);
        std::fs::write(&path, r#"{ "database": ":memory:" }"#).unwrap();

        let config = Config::from_file(&path).unwrap();
        assert!(config.is_in_memory());
    }

    #[test]
    fn test_malformed_file_is_config_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(SETTINGS_FILE);
        std::fs::write(&path, "{ not json").unwrap();

        assert!(matches!(Config::from_file(&path), Err(Error::Config(_))));
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("UPWARD_DATABASE", "/var/lib/app.duckdb"),
            ("UPWARD_MIGRATIONS_DIR", "sql"),
            ("UPWARD_RESUME", "exact-match"),
            ("UPWARD_DB_KEY", "secret"),
        ]);
        let mut config = Config::default();

        config
            .apply_env(|k| env.get(k).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.database, Some(PathBuf::from("/var/lib/app.duckdb")));
        assert_eq!(config.migrations_dir, PathBuf::from("sql"));
        assert_eq!(config.resume, ResumePolicy::ExactMatch);
        assert_eq!(config.encryption_key.as_deref(), Some("secret"));
    }

    #[test]
    fn test_env_rejects_unknown_resume_policy() {
        let mut config = Config::default();
        let result = config.apply_env(|k| (k == "UPWARD_RESUME").then(|| "later".to_string()));
        assert!(matches!(result, Err(Error::Config(_))));
    }
}
