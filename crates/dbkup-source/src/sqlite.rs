//! SQLite source

use crate::{DatabaseSource, RowStream, select_all_sql};
use async_stream::try_stream;
use async_trait::async_trait;
use dbkup_core::{DatabaseConfig, Error, Result, Row, SqlDialect, Value};
use futures::TryStreamExt;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Column, Pool, Row as _, Sqlite, TypeInfo, ValueRef};
use std::str::FromStr;
use std::time::Duration;

/// SQLite-backed source
pub struct SqliteSource {
    pool: Pool<Sqlite>,
}

impl SqliteSource {
    /// Connect using the database section of the configuration.
    ///
    /// `url` takes precedence; otherwise `name` is used as the database file.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let url = match (&config.url, &config.name) {
            (Some(url), _) => url.clone(),
            (None, Some(name)) => format!("sqlite://{}", name),
            (None, None) => {
                return Err(Error::config_error(
                    "SQLite requires database.url or database.name",
                ));
            }
        };

        let options = SqliteConnectOptions::from_str(&url)
            .map_err(|e| Error::config_error(format!("Invalid SQLite URL: {}", e)))?;

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.timeout_secs))
            .connect_with(options)
            .await
            .map_err(|e| Error::database(format!("Failed to connect to SQLite: {}", e)))?;

        Ok(Self { pool })
    }

    /// Private in-memory database on a single long-lived connection
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await
            .map_err(|e| Error::database(format!("Failed to open in-memory SQLite: {}", e)))?;

        Ok(Self { pool })
    }

    /// Create from an existing pool
    pub fn from_pool(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }
}

#[async_trait]
impl DatabaseSource for SqliteSource {
    fn dialect(&self) -> SqlDialect {
        SqlDialect::Sqlite
    }

    async fn table_names(&self) -> Result<Vec<String>> {
        tracing::debug!("Listing SQLite tables");

        let query = r#"
            SELECT name
            FROM sqlite_master
            WHERE type='table'
            AND name NOT LIKE 'sqlite_%'
            ORDER BY name
        "#;

        sqlx::query_scalar::<_, String>(query)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| Error::database(format!("Failed to list tables: {}", e)))
    }

    async fn row_count(&self, table: &str) -> Result<i64> {
        let sql = format!(
            "SELECT COUNT(*) FROM {}",
            self.dialect().quote_identifier(table)
        );

        sqlx::query_scalar::<_, i64>(&sql)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| Error::database(format!("Failed to count rows in {}: {}", table, e)))
    }

    fn fetch_rows<'a>(&'a self, table: &'a str, limit: Option<usize>) -> RowStream<'a> {
        let sql = select_all_sql(self.dialect(), table, limit);

        Box::pin(try_stream! {
            tracing::debug!(table = %table, sql = %sql, "Streaming SQLite rows");

            let mut rows = sqlx::raw_sql(&sql).fetch(&self.pool);
            while let Some(row) = rows
                .try_next()
                .await
                .map_err(|e| Error::database(format!("Failed to fetch rows from {}: {}", table, e)))?
            {
                yield decode_row(&row)?;
            }
        })
    }

    async fn create_table_statement(&self, table: &str) -> Result<String> {
        let ddl: Option<Option<String>> = sqlx::query_scalar(
            "SELECT sql FROM sqlite_master WHERE type = 'table' AND name = ?",
        )
        .bind(table)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| Error::database(format!("Failed to read schema of {}: {}", table, e)))?;

        ddl.flatten()
            .ok_or_else(|| Error::TableNotFound(table.to_string()))
    }
}

/// Decode a row using each value's storage class
fn decode_row(row: &SqliteRow) -> Result<Row> {
    let mut out = Row::with_capacity(row.columns().len());

    for (index, column) in row.columns().iter().enumerate() {
        let (is_null, storage) = {
            let raw = row.try_get_raw(index).map_err(|e| {
                Error::database(format!("Failed to read column {}: {}", column.name(), e))
            })?;
            (raw.is_null(), raw.type_info().name().to_string())
        };

        let value = if is_null {
            Value::Null
        } else {
            decode_cell(row, index, &storage).map_err(|e| {
                Error::database(format!("Failed to decode column {}: {}", column.name(), e))
            })?
        };

        out.push(column.name(), value);
    }

    Ok(out)
}

fn decode_cell(row: &SqliteRow, index: usize, storage: &str) -> std::result::Result<Value, sqlx::Error> {
    let value = match storage {
        "INTEGER" | "BIGINT" | "INT" => Value::Int(row.try_get_unchecked::<i64, _>(index)?),
        "REAL" | "FLOAT" | "DOUBLE" => Value::Float(row.try_get_unchecked::<f64, _>(index)?),
        "BLOB" => Value::Bytes(row.try_get_unchecked::<Vec<u8>, _>(index)?),
        _ => match row.try_get_unchecked::<String, _>(index) {
            Ok(text) => Value::Text(text),
            // Not valid UTF-8, keep the bytes
            Err(_) => Value::Bytes(row.try_get_unchecked::<Vec<u8>, _>(index)?),
        },
    };
    Ok(value)
}
