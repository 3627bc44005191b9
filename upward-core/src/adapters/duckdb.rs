//! DuckDB implementation of the `Database` port

use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::thread;
use std::time::Duration;

use duckdb::types::ValueRef;
use duckdb::{Connection, ToSql};
use serde_json::Value;
use tracing::{debug, warn};

use crate::domain::result::{Error, Result};
use crate::ports::Database;

/// Maximum number of retries when database file is locked
const MAX_RETRIES: u32 = 5;

/// Initial retry delay in milliseconds (doubles each retry: 50, 100, 200, 400, 800ms)
const INITIAL_RETRY_DELAY_MS: u64 = 50;

/// Name the encrypted file is attached under
const ENCRYPTED_ALIAS: &str = "upward_db";

/// Check if an error message indicates a file locking issue that should be retried
fn is_retryable_error(err_msg: &str) -> bool {
    let lower = err_msg.to_lowercase();
    // Windows error messages
    lower.contains("being used by another process")
        || lower.contains("cannot access the file")
        // Unix/macOS error messages
        || lower.contains("resource temporarily unavailable")
        || lower.contains("database is locked")
        || lower.contains("file is already open")
}

fn db_err(e: duckdb::Error) -> Error {
    Error::database(e.to_string())
}

/// Quote a value for use inside a single-quoted SQL literal
fn quote_literal(s: &str) -> String {
    s.replace('\'', "''")
}

/// DuckDB-backed database handle
pub struct DuckDbDatabase {
    conn: Mutex<Connection>,
    db_path: Option<PathBuf>,
}

impl DuckDbDatabase {
    /// Open (or create) a database file
    ///
    /// For encrypted databases, uses DuckDB's ATTACH with ENCRYPTION_KEY.
    ///
    /// Retries with exponential backoff when the file is locked by another
    /// process, e.g. a second `upward` run starting at the same moment.
    pub fn open(db_path: &Path, encryption_key: Option<&str>) -> Result<Self> {
        let mut last_error = None;

        for attempt in 0..MAX_RETRIES {
            match Self::try_open_connection(db_path, encryption_key) {
                Ok(conn) => {
                    debug!(path = %db_path.display(), "opened database");
                    return Ok(Self {
                        conn: Mutex::new(conn),
                        db_path: Some(db_path.to_path_buf()),
                    });
                }
                Err(e) => {
                    let err_msg = e.to_string();
                    if is_retryable_error(&err_msg) && attempt < MAX_RETRIES - 1 {
                        let delay =
                            Duration::from_millis(INITIAL_RETRY_DELAY_MS * 2u64.pow(attempt));
                        warn!(
                            "Database busy, retrying in {}ms (attempt {}/{}): {}",
                            delay.as_millis(),
                            attempt + 1,
                            MAX_RETRIES,
                            err_msg
                        );
                        thread::sleep(delay);
                        last_error = Some(e);
                        continue;
                    }
                    return Err(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| {
            Error::database(format!("Failed to open database after {} retries", MAX_RETRIES))
        }))
    }

    /// Open a throwaway in-memory database
    pub fn open_in_memory() -> Result<Self> {
        let config = duckdb::Config::default()
            .enable_autoload_extension(false)
            .map_err(db_err)?;
        let conn = Connection::open_in_memory_with_flags(config).map_err(db_err)?;
        Ok(Self {
            conn: Mutex::new(conn),
            db_path: None,
        })
    }

    /// Attempt to open a database connection (called by open() with retry logic)
    fn try_open_connection(db_path: &Path, encryption_key: Option<&str>) -> Result<Connection> {
        // Extension autoloading stays off; the bundled build has what we need
        let config = duckdb::Config::default()
            .enable_autoload_extension(false)
            .map_err(db_err)?;

        let conn = if let Some(key) = encryption_key {
            // Encrypted database: open in-memory first, then ATTACH encrypted file
            let conn = Connection::open_in_memory_with_flags(config).map_err(db_err)?;
            conn.execute_batch(&format!(
                "ATTACH '{}' AS {} (ENCRYPTION_KEY '{}'); USE {};",
                quote_literal(&db_path.display().to_string()),
                ENCRYPTED_ALIAS,
                quote_literal(key),
                ENCRYPTED_ALIAS
            ))
            .map_err(db_err)?;
            conn
        } else {
            Connection::open_with_flags(db_path, config).map_err(db_err)?
        };

        Ok(conn)
    }

    /// Path of the database file, `None` for in-memory databases
    pub fn db_path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| Error::database(format!("Lock poisoned: {}", e)))
    }

    /// Convert JSON value to DuckDB parameter
    fn json_to_duckdb_param(value: &Value) -> Box<dyn ToSql> {
        match value {
            Value::Null => Box::new(None::<String>),
            Value::Bool(b) => Box::new(*b),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Box::new(i)
                } else if let Some(u) = n.as_u64() {
                    Box::new(u)
                } else if let Some(f) = n.as_f64() {
                    Box::new(f)
                } else {
                    Box::new(n.to_string())
                }
            }
            Value::String(s) => Box::new(s.clone()),
            // Arrays and objects are bound as their JSON text
            Value::Array(_) | Value::Object(_) => Box::new(value.to_string()),
        }
    }

    fn get_column_value(row: &duckdb::Row, idx: usize) -> Value {
        match row.get_ref(idx) {
            Ok(ValueRef::Null) => Value::Null,
            Ok(ValueRef::Boolean(b)) => Value::Bool(b),
            Ok(ValueRef::TinyInt(i)) => serde_json::json!(i),
            Ok(ValueRef::SmallInt(i)) => serde_json::json!(i),
            Ok(ValueRef::Int(i)) => serde_json::json!(i),
            Ok(ValueRef::BigInt(i)) => serde_json::json!(i),
            Ok(ValueRef::HugeInt(i)) => serde_json::json!(i.to_string()),
            Ok(ValueRef::UTinyInt(i)) => serde_json::json!(i),
            Ok(ValueRef::USmallInt(i)) => serde_json::json!(i),
            Ok(ValueRef::UInt(i)) => serde_json::json!(i),
            Ok(ValueRef::UBigInt(i)) => serde_json::json!(i),
            Ok(ValueRef::Float(f)) => serde_json::json!(f),
            Ok(ValueRef::Double(f)) => serde_json::json!(f),
            Ok(ValueRef::Text(bytes)) => Value::String(String::from_utf8_lossy(bytes).to_string()),
            Ok(ValueRef::Timestamp(_, ts)) => {
                // Microseconds since epoch
                let dt = chrono::DateTime::from_timestamp_micros(ts)
                    .map(|dt| dt.naive_utc().to_string())
                    .unwrap_or_else(|| ts.to_string());
                Value::String(dt)
            }
            _ => Value::Null,
        }
    }
}

impl Database for DuckDbDatabase {
    fn execute(&self, sql: &str, params: &[Value]) -> Result<usize> {
        let conn = self.lock()?;

        if params.is_empty() {
            // Whole scripts may hold several statements
            conn.execute_batch(sql).map_err(db_err)?;
            return Ok(0);
        }

        let duckdb_params: Vec<Box<dyn ToSql>> =
            params.iter().map(Self::json_to_duckdb_param).collect();
        let param_refs: Vec<&dyn ToSql> = duckdb_params.iter().map(|b| b.as_ref()).collect();

        let mut stmt = conn.prepare(sql).map_err(db_err)?;
        stmt.execute(param_refs.as_slice()).map_err(db_err)
    }

    fn query_row(&self, sql: &str, params: &[Value]) -> Result<Option<Vec<Value>>> {
        let conn = self.lock()?;

        let duckdb_params: Vec<Box<dyn ToSql>> =
            params.iter().map(Self::json_to_duckdb_param).collect();
        let param_refs: Vec<&dyn ToSql> = duckdb_params.iter().map(|b| b.as_ref()).collect();

        let mut stmt = conn.prepare(sql).map_err(db_err)?;
        let mut rows = stmt.query(param_refs.as_slice()).map_err(db_err)?;

        let first = match rows.next().map_err(db_err)? {
            Some(row) => {
                let column_count = row.as_ref().column_count();
                Some(
                    (0..column_count)
                        .map(|i| Self::get_column_value(row, i))
                        .collect(),
                )
            }
            None => None,
        };

        Ok(first)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    #[test]
    fn test_execute_batch_and_query_row() {
        let db = DuckDbDatabase::open_in_memory().unwrap();
        db.execute(
            "CREATE TABLE t (id UBIGINT, name VARCHAR); INSERT INTO t VALUES (1, 'a');",
            &[],
        )
        .unwrap();

        let row = db
            .query_row("SELECT id, name FROM t WHERE id = ?", &[json!(1)])
            .unwrap()
            .unwrap();
        assert_eq!(row, vec![json!(1u64), json!("a")]);
    }

    #[test]
    fn test_query_row_without_rows() {
        let db = DuckDbDatabase::open_in_memory().unwrap();
        db.execute("CREATE TABLE t (id INTEGER)", &[]).unwrap();
        assert!(db.query_row("SELECT id FROM t", &[]).unwrap().is_none());
    }

    #[test]
    fn test_execute_with_params_reports_affected_rows() {
        let db = DuckDbDatabase::open_in_memory().unwrap();
        db.execute("CREATE TABLE t (id INTEGER, ok BOOLEAN)", &[]).unwrap();
        let affected = db
            .execute("INSERT INTO t VALUES (?, ?)", &[json!(7), json!(true)])
            .unwrap();
        assert_eq!(affected, 1);
    }

    #[test]
    fn test_invalid_sql_is_database_error() {
        let db = DuckDbDatabase::open_in_memory().unwrap();
        let err = db.execute("CREAT TABLE broken (", &[]).unwrap_err();
        assert!(matches!(err, Error::Database(_)));
    }

    #[test]
    fn test_open_file_database() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("app.duckdb");
        {
            let db = DuckDbDatabase::open(&path, None).unwrap();
            assert_eq!(db.db_path(), Some(path.as_path()));
            db.execute("CREATE TABLE t (id INTEGER); INSERT INTO t VALUES (3);", &[])
                .unwrap();
        }

        let db = DuckDbDatabase::open(&path, None).unwrap();
        let row = db.query_row("SELECT id FROM t", &[]).unwrap().unwrap();
        assert_eq!(row, vec![json!(3)]);
    }

    #[test]
    fn test_retryable_error_detection() {
        assert!(is_retryable_error("IO Error: database is locked"));
        assert!(is_retryable_error(
            "The process cannot access the file because it is being used by another process"
        ));
        assert!(!is_retryable_error("Permission denied"));
    }
}
