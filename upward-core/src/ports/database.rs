//! Database port - the two capabilities the engine needs

use std::sync::Arc;

use serde_json::Value;

use crate::domain::result::Result;

/// Executable-query abstraction over an already-open database handle
///
/// Parameters are JSON values bound to `?` placeholders. Implementations
/// report failures as `Error::Database`. The engine never opens or closes
/// the underlying connection.
pub trait Database: Send + Sync {
    /// Execute a statement, returning the affected row count where known
    ///
    /// With no parameters the SQL may contain several statements (a whole
    /// migration script).
    fn execute(&self, sql: &str, params: &[Value]) -> Result<usize>;

    /// Run a query and return its first row, or `None` when it has no rows
    fn query_row(&self, sql: &str, params: &[Value]) -> Result<Option<Vec<Value>>>;
}

impl<T: Database + ?Sized> Database for Arc<T> {
    fn execute(&self, sql: &str, params: &[Value]) -> Result<usize> {
        (**self).execute(sql, params)
    }

    fn query_row(&self, sql: &str, params: &[Value]) -> Result<Option<Vec<Value>>> {
        (**self).query_row(sql, params)
    }
}
