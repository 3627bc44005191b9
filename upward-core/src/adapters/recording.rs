//! In-memory `Database` fake for engine tests
//!
//! Records every statement it receives and emulates the ledger table by
//! recognising the ledger store's SQL. Any other statement is treated as
//! migration SQL and succeeds unless it contains a configured failure marker.

use std::sync::Mutex;

use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde_json::{json, Value};

use crate::domain::result::{Error, Result};
use crate::domain::LedgerEntry;
use crate::ports::Database;
use crate::services::ledger::{COUNT_SQL, CREATE_LEDGER_SQL, FRONTIER_SQL, RECORD_SQL};

#[derive(Default)]
struct State {
    statements: Vec<String>,
    ledger: Vec<LedgerEntry>,
    failure_markers: Vec<String>,
    fail_inserts: bool,
    clock: i64,
}

impl State {
    fn tick(&mut self) -> NaiveDateTime {
        self.clock += 1;
        NaiveDate::from_ymd_opt(2024, 1, 1)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|t| t + Duration::seconds(self.clock))
            .unwrap_or_default()
    }
}

#[derive(Default)]
pub struct RecordingDatabase {
    state: Mutex<State>,
}

impl RecordingDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with existing ledger rows, oldest first
    pub fn with_ledger(rows: &[(u64, bool)]) -> Self {
        let db = Self::new();
        {
            let mut state = db.state.lock().unwrap();
            for &(id, applied) in rows {
                let created_at = state.tick();
                state.ledger.push(LedgerEntry {
                    id,
                    created_at,
                    applied,
                });
            }
        }
        db
    }

    /// Fail any statement containing `marker`
    pub fn fail_on(&self, marker: &str) {
        self.state.lock().unwrap().failure_markers.push(marker.to_string());
    }

    /// Fail every ledger insert
    pub fn fail_inserts(&self) {
        self.state.lock().unwrap().fail_inserts = true;
    }

    pub fn statements(&self) -> Vec<String> {
        self.state.lock().unwrap().statements.clone()
    }

    /// Statements that were neither ledger reads nor ledger writes
    pub fn migration_statements(&self) -> Vec<String> {
        self.statements()
            .into_iter()
            .filter(|s| ![CREATE_LEDGER_SQL, FRONTIER_SQL, RECORD_SQL, COUNT_SQL].contains(&s.as_str()))
            .collect()
    }

    pub fn ledger(&self) -> Vec<LedgerEntry> {
        self.state.lock().unwrap().ledger.clone()
    }
}

fn row(entry: &LedgerEntry) -> Vec<Value> {
    vec![
        json!(entry.id),
        json!(entry.created_at.format("%Y-%m-%d %H:%M:%S%.6f").to_string()),
        json!(entry.applied),
    ]
}

impl Database for RecordingDatabase {
    fn execute(&self, sql: &str, _params: &[Value]) -> Result<usize> {
        let mut state = self.state.lock().unwrap();
        state.statements.push(sql.to_string());

        if let Some(marker) = state.failure_markers.iter().find(|m| sql.contains(m.as_str())) {
            return Err(Error::database(format!("syntax error at or near \"{}\"", marker)));
        }
        Ok(0)
    }

    fn query_row(&self, sql: &str, params: &[Value]) -> Result<Option<Vec<Value>>> {
        let mut state = self.state.lock().unwrap();
        state.statements.push(sql.to_string());

        match sql {
            FRONTIER_SQL => Ok(state
                .ledger
                .iter()
                .max_by_key(|e| (e.created_at, e.id))
                .map(row)),
            COUNT_SQL => Ok(Some(vec![json!(state.ledger.len())])),
            RECORD_SQL => {
                if state.fail_inserts {
                    return Err(Error::database("connection reset by peer"));
                }
                let id = params.first().and_then(Value::as_u64).unwrap_or_default();
                let applied = params.get(1).and_then(Value::as_bool).unwrap_or_default();
                if state.ledger.iter().any(|e| e.id == id) {
                    return Err(Error::database(format!(
                        "Constraint Error: Duplicate key \"id: {}\" violates unique constraint",
                        id
                    )));
                }
                let created_at = state.tick();
                let entry = LedgerEntry {
                    id,
                    created_at,
                    applied,
                };
                state.ledger.push(entry.clone());
                Ok(Some(row(&entry)))
            }
            other => Err(Error::database(format!("unexpected query: {}", other))),
        }
    }
}
