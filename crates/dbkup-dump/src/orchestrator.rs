//! Dump job: tables in, one SQL file out

use crate::emitter::{RowEmitter, comment_line, emit_schema, table_marker};
use crate::store::{BackupStore, PendingDump};
use chrono::{DateTime, Utc};
use dbkup_core::{DumpReport, DumpRequest, Result, TableReport, sanitize_label};
use dbkup_source::DatabaseSource;
use dbkup_telemetry::attributes::{DUMP_FILE_NAME, TABLE_ROWS};
use dbkup_telemetry::{dump_job_span, dump_table_span};
use futures::StreamExt;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{Instrument, Span};

pub const DEFAULT_LABEL: &str = "bkup-database";

/// Runs dump jobs against one database and one backup directory.
///
/// A job writes every requested table, in request order, to a single file.
/// A table that fails is recorded as a comment in the dump and in the
/// report; the job moves on to the next table. Only an unreachable catalog
/// or a storage failure aborts the job, and then no file is left behind.
pub struct DumpOrchestrator {
    source: Arc<dyn DatabaseSource>,
    store: BackupStore,
    default_label: String,
}

impl DumpOrchestrator {
    pub fn new(source: Arc<dyn DatabaseSource>, store: BackupStore) -> Self {
        Self {
            source,
            store,
            default_label: DEFAULT_LABEL.to_string(),
        }
    }

    /// Label used when a request's label is blank
    pub fn with_default_label(mut self, label: impl Into<String>) -> Self {
        self.default_label = label.into();
        self
    }

    pub fn store(&self) -> &BackupStore {
        &self.store
    }

    /// Run a dump stamped with the current UTC time
    pub async fn run(&self, request: &DumpRequest) -> Result<DumpReport> {
        self.run_at(request, Utc::now()).await
    }

    /// Run a dump whose file name is stamped with `at`
    pub async fn run_at(&self, request: &DumpRequest, at: DateTime<Utc>) -> Result<DumpReport> {
        let label = sanitize_label(&request.label, &self.default_label);
        let span = dump_job_span(
            &label,
            request.tables.len(),
            request.include_schema,
            self.source.dialect().name(),
        );

        self.run_job(request, label, at).instrument(span).await
    }

    async fn run_job(
        &self,
        request: &DumpRequest,
        label: String,
        at: DateTime<Utc>,
    ) -> Result<DumpReport> {
        // Without the catalog there is nothing trustworthy to dump
        let catalog: HashSet<String> = self.source.table_names().await?.into_iter().collect();

        let file_name = BackupStore::dump_file_name(&label, at);
        Span::current().record(DUMP_FILE_NAME, file_name.as_str());

        let mut dump = self.store.create(&file_name).await?;
        tracing::info!(file = %file_name, tables = request.tables.len(), "Dump started");

        let mut tables = Vec::with_capacity(request.tables.len());
        for table in &request.tables {
            let report = self
                .dump_table(&mut dump, table, request.include_schema, &catalog)
                .instrument(dump_table_span(table))
                .await?;
            tables.push(report);
        }

        let path = dump.commit().await?;

        let report = DumpReport {
            file_name,
            path,
            tables,
        };
        tracing::info!(
            file = %report.file_name,
            rows = report.total_rows(),
            failed = report.failed_tables().count(),
            "Dump finished"
        );

        Ok(report)
    }

    /// Write one table's block. Only storage errors are returned; database
    /// errors end up in the report.
    async fn dump_table(
        &self,
        dump: &mut PendingDump,
        table: &str,
        include_schema: bool,
        catalog: &HashSet<String>,
    ) -> Result<TableReport> {
        let mut report = TableReport {
            table: table.to_string(),
            rows: 0,
            schema: false,
            error: None,
        };

        if !catalog.contains(table) {
            let message = format!("table {} not found", table);
            tracing::warn!(table = %table, "Requested table is not in the catalog");

            dump.write_str(&table_marker(table)).await?;
            dump.write_str(&comment_line(&format!("Error: {}", message))).await?;
            dump.write_str("\n").await?;

            report.error = Some(message);
            return Ok(report);
        }

        if include_schema {
            match emit_schema(self.source.as_ref(), table).await {
                Ok(ddl) => {
                    dump.write_str(&ddl).await?;
                    report.schema = true;
                }
                Err(e) => {
                    tracing::warn!(table = %table, error = %e, "Schema unavailable, skipping CREATE TABLE");
                    let message = format!("Error: schema unavailable for {}: {}", table, e);
                    dump.write_str(&comment_line(&message)).await?;
                }
            }
        }

        dump.write_str(&table_marker(table)).await?;

        let mut emitter = RowEmitter::new(table, self.source.dialect());
        let mut rows = self.source.fetch_rows(table, None);

        while let Some(next) = rows.next().await {
            match next {
                Ok(row) => {
                    let mut line = emitter.emit(&row);
                    line.push('\n');
                    dump.write_str(&line).await?;
                    report.rows += 1;
                }
                Err(e) => {
                    let message = format!("Error fetching rows from table {}: {}", table, e);
                    tracing::warn!(table = %table, error = %e, "Table dump failed");

                    dump.write_str(&comment_line(&message)).await?;
                    report.error = Some(message);
                    break;
                }
            }
        }

        dump.write_str("\n").await?;

        Span::current().record(TABLE_ROWS, report.rows);
        tracing::debug!(table = %table, rows = report.rows, "Table written");

        Ok(report)
    }
}
