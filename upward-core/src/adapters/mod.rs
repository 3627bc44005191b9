//! Adapter implementations
//!
//! Adapters implement the port traits with concrete technologies:
//! - DuckDB for the Database port
//! - A recording in-memory fake for engine tests

pub mod duckdb;

#[cfg(test)]
pub mod recording;
