//! # dbkup telemetry
//!
//! Tracing subscriber and OpenTelemetry setup, plus span helpers for dump
//! jobs. Span attribute names live in [`attributes`].

mod spans;
mod tracer;

pub use spans::{dump_job_span, dump_table_span, preview_span};
pub use tracer::{init_telemetry, register_span_processor, tracer_provider};

/// Span attribute names for dump observability
pub mod attributes {
    pub const DUMP_LABEL: &str = "dbkup.dump.label";
    pub const DUMP_TABLE_COUNT: &str = "dbkup.dump.table_count";
    pub const DUMP_INCLUDE_SCHEMA: &str = "dbkup.dump.include_schema";
    pub const DUMP_FILE_NAME: &str = "dbkup.dump.file_name";

    pub const TABLE_NAME: &str = "dbkup.table.name";
    pub const TABLE_ROWS: &str = "dbkup.table.rows";

    pub const DB_SYSTEM: &str = "db.system";

    /// Instrumentation scope name
    pub const SYSTEM_NAME: &str = "dbkup";
}
