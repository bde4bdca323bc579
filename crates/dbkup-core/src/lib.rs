//! Core types for dbkup
//!
//! This crate provides the data model shared by the dump engine, the
//! database sources and the outer surfaces: dynamically typed cell values,
//! ordered rows, dump requests and reports, configuration and errors.

pub mod config;
pub mod dialect;
pub mod error;
pub mod sanitize;
pub mod types;

// Re-exports
pub use config::{BackupConfig, DatabaseConfig, DbkupConfig, ObservabilityConfig, ServerConfig};
pub use dialect::SqlDialect;
pub use error::{Error, Result};
pub use sanitize::{DEFAULT_TOKEN, sanitize, sanitize_file_name, sanitize_label};
pub use types::{BackupEntry, DumpReport, DumpRequest, Row, TableInfo, TableReport, Value};
