//! Read-only views for the UI: table snapshots and stored dumps

use crate::store::BackupStore;
use dbkup_core::{BackupEntry, Error, Result, Row, TableInfo};
use dbkup_source::DatabaseSource;
use dbkup_telemetry::preview_span;
use futures::{StreamExt, TryStreamExt};
use std::sync::Arc;
use tracing::Instrument;

/// Most rows a table preview returns
pub const PREVIEW_ROW_LIMIT: usize = 100;

/// Side-effect-free reads over the database and the backup directory
pub struct PreviewReader {
    source: Arc<dyn DatabaseSource>,
    store: BackupStore,
}

impl PreviewReader {
    pub fn new(source: Arc<dyn DatabaseSource>, store: BackupStore) -> Self {
        Self { source, store }
    }

    /// Every table with its row count
    pub async fn list_tables(&self) -> Result<Vec<TableInfo>> {
        self.source.list_tables().await
    }

    /// Up to [`PREVIEW_ROW_LIMIT`] rows in the database's scan order.
    ///
    /// Names that are not in the catalog are rejected with
    /// [`Error::TableNotFound`] before any query is built.
    pub async fn preview_table(&self, name: &str) -> Result<Vec<Row>> {
        self.fetch_preview(name)
            .instrument(preview_span(name))
            .await
    }

    async fn fetch_preview(&self, name: &str) -> Result<Vec<Row>> {
        let known = self.source.table_names().await?;
        if !known.iter().any(|t| t == name) {
            return Err(Error::TableNotFound(name.to_string()));
        }

        self.source
            .fetch_rows(name, Some(PREVIEW_ROW_LIMIT))
            .take(PREVIEW_ROW_LIMIT)
            .try_collect()
            .await
    }

    /// Completed dumps in the backup directory
    pub async fn list_dumps(&self) -> Result<Vec<BackupEntry>> {
        self.store.list().await
    }

    /// Raw text of a stored dump, `None` when it does not exist
    pub async fn read_dump_file(&self, file_name: &str) -> Result<Option<String>> {
        self.store.read(file_name).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dbkup_source::SqliteSource;
    use tempfile::TempDir;

    async fn reader_with_rows(rows: usize, dir: &TempDir) -> PreviewReader {
        let source = SqliteSource::in_memory().await.unwrap();
        sqlx::raw_sql(
            r#"
            CREATE TABLE big (n INTEGER);
            WITH RECURSIVE seq(n) AS (SELECT 1 UNION ALL SELECT n + 1 FROM seq WHERE n < 250)
            INSERT INTO big SELECT n FROM seq;
            CREATE TABLE small (n INTEGER, label TEXT);
            "#,
        )
        .execute(source.pool())
        .await
        .unwrap();

        for i in 0..rows {
            sqlx::query("INSERT INTO small VALUES (?, ?)")
                .bind(i as i64)
                .bind(format!("row {}", i))
                .execute(source.pool())
                .await
                .unwrap();
        }

        PreviewReader::new(Arc::new(source), BackupStore::new(dir.path()))
    }

    #[tokio::test]
    async fn test_preview_is_capped() {
        let dir = TempDir::new().unwrap();
        let reader = reader_with_rows(3, &dir).await;

        let rows = reader.preview_table("big").await.unwrap();
        assert_eq!(rows.len(), PREVIEW_ROW_LIMIT);

        let rows = reader.preview_table("small").await.unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[2].get("label").and_then(|v| v.as_str()), Some("row 2"));
    }

    #[tokio::test]
    async fn test_preview_unknown_table() {
        let dir = TempDir::new().unwrap();
        let reader = reader_with_rows(0, &dir).await;

        let err = reader.preview_table("big` --").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_list_tables_counts() {
        let dir = TempDir::new().unwrap();
        let reader = reader_with_rows(4, &dir).await;

        let tables = reader.list_tables().await.unwrap();
        assert_eq!(
            tables,
            vec![
                TableInfo { name: "big".into(), row_count: 250 },
                TableInfo { name: "small".into(), row_count: 4 },
            ]
        );
    }

    #[tokio::test]
    async fn test_read_dump_file_not_found() {
        let dir = TempDir::new().unwrap();
        let reader = reader_with_rows(0, &dir).await;

        assert_eq!(reader.read_dump_file("../../etc/passwd").await.unwrap(), None);
        assert!(reader.list_dumps().await.unwrap().is_empty());
    }
}
