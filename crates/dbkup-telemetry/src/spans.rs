//! Span helpers for dump jobs and previews

use crate::attributes::*;
use tracing::Span;
use tracing::field::Empty;

/// Span covering a whole dump job.
///
/// `dbkup.dump.file_name` is left empty and recorded once the output file is
/// known.
pub fn dump_job_span(label: &str, table_count: usize, include_schema: bool, db_system: &str) -> Span {
    tracing::info_span!(
        "dump_job",
        { DUMP_LABEL } = %label,
        { DUMP_TABLE_COUNT } = table_count,
        { DUMP_INCLUDE_SCHEMA } = include_schema,
        { DB_SYSTEM } = %db_system,
        { DUMP_FILE_NAME } = Empty,
    )
}

/// Span for one table inside a dump job. `dbkup.table.rows` is recorded when
/// the table is finished.
pub fn dump_table_span(table: &str) -> Span {
    tracing::info_span!(
        "dump_table",
        { TABLE_NAME } = %table,
        { TABLE_ROWS } = Empty,
    )
}

/// Span for a bounded table preview
pub fn preview_span(table: &str) -> Span {
    tracing::debug_span!("preview_table", { TABLE_NAME } = %table)
}
