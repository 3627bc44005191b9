//! Port definitions (hexagonal architecture)
//!
//! The engine depends only on these traits, not on a concrete driver.

mod database;

pub use database::Database;
