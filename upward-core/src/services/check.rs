//! Syntax check - parse scripts without running them

use std::path::PathBuf;

use serde::Serialize;
use sqlparser::dialect::DuckDbDialect;
use sqlparser::parser::Parser;

use crate::domain::result::{Error, Result};
use crate::domain::MigrationScript;

/// A script the SQL parser rejected
#[derive(Debug, Clone, Serialize)]
pub struct SyntaxIssue {
    pub path: PathBuf,
    pub id: u64,
    pub message: String,
}

/// Validate SQL syntax, returning the parser's message on failure
pub fn validate_sql_syntax(sql: &str) -> std::result::Result<(), String> {
    let dialect = DuckDbDialect {};
    Parser::parse_sql(&dialect, sql).map_err(|e| {
        // Drop the redundant prefix; callers add their own context
        let msg = e.to_string();
        msg.trim_start_matches("sql parser error: ").to_string()
    })?;
    Ok(())
}

/// Parse every script, collecting the ones that fail
///
/// A script that cannot be read aborts the check with `Error::Read`.
pub fn check_scripts(scripts: &[MigrationScript]) -> Result<Vec<SyntaxIssue>> {
    let mut issues = Vec::new();

    for script in scripts {
        let sql = std::fs::read_to_string(&script.path).map_err(|source| Error::Read {
            path: script.path.clone(),
            source,
        })?;

        if let Err(message) = validate_sql_syntax(&sql) {
            issues.push(SyntaxIssue {
                path: script.path.clone(),
                id: script.id,
                message,
            });
        }
    }

    Ok(issues)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_valid_statements() {
        assert!(validate_sql_syntax("CREATE TABLE users (id INTEGER PRIMARY KEY, name VARCHAR)").is_ok());
        assert!(validate_sql_syntax(
            "ALTER TABLE users ADD COLUMN email VARCHAR; CREATE INDEX idx_email ON users (email);"
        )
        .is_ok());
        assert!(validate_sql_syntax("").is_ok());
    }

    #[test]
    fn test_invalid_statement() {
        let err = validate_sql_syntax("CREAT TABLE users (id INTEGER)").unwrap_err();
        assert!(!err.starts_with("sql parser error"));
    }

    #[test]
    fn test_check_scripts_reports_broken_files() {
        let dir = tempdir().unwrap();
        let good = dir.path().join("1000.up.sql");
        let bad = dir.path().join("1001.up.sql");
        fs::write(&good, "CREATE TABLE a (id INTEGER);").unwrap();
        fs::write(&bad, "CREATE TABLE b (id INTEGER").unwrap();

        let scripts = vec![
            MigrationScript::from_path(&good).unwrap(),
            MigrationScript::from_path(&bad).unwrap(),
        ];
        let issues = check_scripts(&scripts).unwrap();

        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].id, 1001);
        assert_eq!(issues[0].path, bad);
    }

    #[test]
    fn test_check_scripts_missing_file() {
        let dir = tempdir().unwrap();
        let scripts = vec![MigrationScript::from_path(dir.path().join("1000.up.sql")).unwrap()];
        assert!(matches!(check_scripts(&scripts), Err(Error::Read { .. })));
    }
}
