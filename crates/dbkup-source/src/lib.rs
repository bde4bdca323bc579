//! Database sources for dbkup
//!
//! A [`DatabaseSource`] is the only thing the dump engine knows about the
//! live database: it can list tables, count rows, stream rows and produce a
//! table's `CREATE TABLE` statement. Connection lifecycle stays with the
//! caller, which builds a source once and hands it to the engine.

pub mod mysql;
pub mod sqlite;

use async_trait::async_trait;
use dbkup_core::{DatabaseConfig, Result, Row, SqlDialect, TableInfo};
use futures::stream::BoxStream;
use std::sync::Arc;

// Re-exports
pub use mysql::MySqlSource;
pub use sqlite::SqliteSource;

/// Stream of decoded rows, read from a database cursor
pub type RowStream<'a> = BoxStream<'a, Result<Row>>;

/// Read access to a live database.
///
/// Table names passed in are expected to come from [`table_names`]; they
/// are quoted with the source's dialect but not escaped.
///
/// [`table_names`]: DatabaseSource::table_names
#[async_trait]
pub trait DatabaseSource: Send + Sync {
    /// Dialect used for identifiers and literals of this database
    fn dialect(&self) -> SqlDialect;

    /// Names of all user tables
    async fn table_names(&self) -> Result<Vec<String>>;

    /// `COUNT(*)` of a table
    async fn row_count(&self, table: &str) -> Result<i64>;

    /// Stream every row of a table, optionally capped at `limit` rows.
    ///
    /// Rows come straight from a cursor, so memory use does not grow with
    /// table size.
    fn fetch_rows<'a>(&'a self, table: &'a str, limit: Option<usize>) -> RowStream<'a>;

    /// The database's canonical `CREATE TABLE` statement, without a
    /// trailing separator
    async fn create_table_statement(&self, table: &str) -> Result<String>;

    /// Tables with their row counts. A failing count is reported as 0.
    async fn list_tables(&self) -> Result<Vec<TableInfo>> {
        let names = self.table_names().await?;
        let mut tables = Vec::with_capacity(names.len());

        for name in names {
            let row_count = match self.row_count(&name).await {
                Ok(count) => count,
                Err(e) => {
                    tracing::warn!(table = %name, error = %e, "Failed to count rows");
                    0
                }
            };
            tables.push(TableInfo { name, row_count });
        }

        Ok(tables)
    }
}

/// Build the `SELECT *` used for dumps and previews
pub(crate) fn select_all_sql(dialect: SqlDialect, table: &str, limit: Option<usize>) -> String {
    let quoted = dialect.quote_identifier(table);
    match limit {
        Some(limit) => format!("SELECT * FROM {} LIMIT {}", quoted, limit),
        None => format!("SELECT * FROM {}", quoted),
    }
}

/// Open a source for the configured driver
pub async fn connect(config: &DatabaseConfig) -> Result<Arc<dyn DatabaseSource>> {
    let source: Arc<dyn DatabaseSource> = match config.driver {
        SqlDialect::MySql => Arc::new(MySqlSource::connect(config).await?),
        SqlDialect::Sqlite => Arc::new(SqliteSource::connect(config).await?),
    };

    tracing::info!(driver = %config.driver, "Connected to database");
    Ok(source)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_all_sql() {
        assert_eq!(
            select_all_sql(SqlDialect::MySql, "users", None),
            "SELECT * FROM `users`"
        );
        assert_eq!(
            select_all_sql(SqlDialect::Sqlite, "users", Some(100)),
            "SELECT * FROM `users` LIMIT 100"
        );
    }
}
