//! MySQL / MariaDB source

use crate::{DatabaseSource, RowStream, select_all_sql};
use async_stream::try_stream;
use async_trait::async_trait;
use dbkup_core::{DatabaseConfig, Error, Result, Row, SqlDialect, Value};
use futures::TryStreamExt;
use sqlx::mysql::{MySqlConnectOptions, MySqlPoolOptions, MySqlRow};
use sqlx::{Column, MySql, Pool, Row as _, TypeInfo, ValueRef};
use std::time::Duration;

/// MySQL-backed source.
///
/// Catalog and row queries go through `raw_sql`, which uses the text
/// protocol, so every cell arrives in its textual form and can be decoded
/// without per-type driver support (DECIMAL, DATETIME, ...).
pub struct MySqlSource {
    pool: Pool<MySql>,
}

impl MySqlSource {
    /// Connect using the database section of the configuration
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let options = match config.url.as_deref() {
            Some(url) => url
                .parse::<MySqlConnectOptions>()
                .map_err(|e| Error::config_error(format!("Invalid MySQL URL: {}", e)))?,
            None => {
                let mut options = MySqlConnectOptions::new()
                    .host(config.host())
                    .port(config.port());
                if let Some(username) = &config.username {
                    options = options.username(username);
                }
                if let Some(password) = &config.password {
                    options = options.password(password);
                }
                if let Some(name) = &config.name {
                    options = options.database(name);
                }
                options
            }
        };

        let pool = MySqlPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.timeout_secs))
            .connect_with(options)
            .await
            .map_err(|e| Error::database(format!("Failed to connect to MySQL: {}", e)))?;

        Ok(Self { pool })
    }

    /// Create from an existing pool
    pub fn from_pool(pool: Pool<MySql>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DatabaseSource for MySqlSource {
    fn dialect(&self) -> SqlDialect {
        SqlDialect::MySql
    }

    async fn table_names(&self) -> Result<Vec<String>> {
        tracing::debug!("Listing MySQL tables");

        let rows = sqlx::raw_sql("SHOW TABLES")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| Error::database(format!("Failed to list tables: {}", e)))?;

        rows.iter()
            .map(|row| {
                row.try_get_unchecked::<String, _>(0)
                    .map_err(|e| Error::database(format!("Failed to read table name: {}", e)))
            })
            .collect()
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
            tracing::debug!(table = %table, sql = %sql, "Streaming MySQL rows");

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
        let sql = format!(
            "SHOW CREATE TABLE {}",
            self.dialect().quote_identifier(table)
        );

        let row = sqlx::raw_sql(&sql)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| Error::database(format!("Failed to show create table {}: {}", table, e)))?;

        // Columns are (`Table`, `Create Table`)
        row.try_get_unchecked::<String, _>(1)
            .map_err(|e| Error::database(format!("Failed to read create table {}: {}", table, e)))
    }
}

/// Decode a text-protocol row into dynamically typed cells
fn decode_row(row: &MySqlRow) -> Result<Row> {
    let mut out = Row::with_capacity(row.columns().len());

    for (index, column) in row.columns().iter().enumerate() {
        let is_null = row
            .try_get_raw(index)
            .map_err(|e| Error::database(format!("Failed to read column {}: {}", column.name(), e)))?
            .is_null();

        let value = if is_null {
            Value::Null
        } else {
            decode_cell(row, index, column.type_info().name())?
        };

        out.push(column.name(), value);
    }

    Ok(out)
}

fn decode_cell(row: &MySqlRow, index: usize, type_name: &str) -> Result<Value> {
    let base_type = type_name.split_whitespace().next().unwrap_or_default();

    if is_binary_type(base_type) {
        let bytes = row
            .try_get_unchecked::<Vec<u8>, _>(index)
            .map_err(|e| Error::database(format!("Failed to decode binary value: {}", e)))?;
        return Ok(Value::Bytes(bytes));
    }

    let text = match row.try_get_unchecked::<String, _>(index) {
        Ok(text) => text,
        // Not valid UTF-8, keep the bytes
        Err(_) => {
            let bytes = row
                .try_get_unchecked::<Vec<u8>, _>(index)
                .map_err(|e| Error::database(format!("Failed to decode value: {}", e)))?;
            return Ok(Value::Bytes(bytes));
        }
    };

    Ok(parse_text_value(base_type, text))
}

fn is_binary_type(base_type: &str) -> bool {
    matches!(
        base_type,
        "BLOB" | "TINYBLOB" | "MEDIUMBLOB" | "LONGBLOB" | "BINARY" | "VARBINARY" | "BIT"
            | "GEOMETRY"
    )
}

/// Narrow a textual cell to a typed value based on its column type.
///
/// DECIMAL and anything that does not parse stays text, so no precision is
/// lost on the way to the dump.
fn parse_text_value(base_type: &str, text: String) -> Value {
    match base_type {
        "BOOLEAN" => match text.as_str() {
            "0" => Value::Bool(false),
            "1" => Value::Bool(true),
            _ => Value::Text(text),
        },
        "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "BIGINT" => text
            .parse::<i64>()
            .map(Value::Int)
            .unwrap_or(Value::Text(text)),
        "FLOAT" | "DOUBLE" => match text.parse::<f64>() {
            Ok(v) if v.is_finite() => Value::Float(v),
            _ => Value::Text(text),
        },
        _ => Value::Text(text),
    }
}
