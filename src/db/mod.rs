//! Database module for SQLite operations.
//!
//! This module provides:
//! - Database initialization and versioned migrations
//! - SQLite pragma configuration
//! - Repository layer for database operations

pub mod migrations;
pub mod repo;

pub use migrations::init_db;
pub use repo::{ConfigurationFilter, HistoryFilter, Repository};
