//! INSERT and CREATE TABLE text for a single table

use crate::serializer::serialize_value;
use dbkup_core::{Result, Row, SqlDialect, Value};
use dbkup_source::DatabaseSource;

/// Builds one `INSERT` statement per row.
///
/// The column list is captured from the first row and reused for every
/// following row of the same table. Later rows are matched by column name;
/// a column they lack is written as `NULL` and extra columns are dropped.
#[derive(Debug)]
pub struct RowEmitter {
    dialect: SqlDialect,
    table: String,
    columns: Option<Vec<String>>,
    prefix: String,
    shape_warned: bool,
}

impl RowEmitter {
    pub fn new(table: &str, dialect: SqlDialect) -> Self {
        Self {
            dialect,
            table: table.to_string(),
            columns: None,
            prefix: String::new(),
            shape_warned: false,
        }
    }

    /// Columns captured from the first row, if any row was seen
    pub fn columns(&self) -> Option<&[String]> {
        self.columns.as_deref()
    }

    /// Render the statement for one row, without a trailing newline
    pub fn emit(&mut self, row: &Row) -> String {
        if self.columns.is_none() {
            self.capture_columns(row);
        }

        let columns = self.columns.as_deref().unwrap_or_default();
        if !self.shape_warned && !same_shape(columns, row) {
            tracing::warn!(
                table = %self.table,
                expected = columns.len(),
                found = row.len(),
                "Row columns differ from the first row; matching by name"
            );
            self.shape_warned = true;
        }

        let values: Vec<String> = columns
            .iter()
            .map(|column| serialize_value(row.get(column).unwrap_or(&Value::Null), self.dialect))
            .collect();

        format!("{}{});", self.prefix, values.join(", "))
    }

    fn capture_columns(&mut self, row: &Row) {
        let columns: Vec<String> = row.columns().map(str::to_string).collect();
        let column_list = columns
            .iter()
            .map(|c| self.dialect.quote_identifier(c))
            .collect::<Vec<_>>()
            .join(", ");

        self.prefix = format!(
            "INSERT INTO {} ({}) VALUES (",
            self.dialect.quote_identifier(&self.table),
            column_list
        );
        self.columns = Some(columns);
    }
}

fn same_shape(columns: &[String], row: &Row) -> bool {
    columns.len() == row.len() && columns.iter().zip(row.columns()).all(|(a, b)| a == b)
}

/// Render every row of a table. An empty input yields no statements.
pub fn emit_inserts<'r>(
    table: &str,
    dialect: SqlDialect,
    rows: impl IntoIterator<Item = &'r Row>,
) -> Vec<String> {
    let mut emitter = RowEmitter::new(table, dialect);
    rows.into_iter().map(|row| emitter.emit(row)).collect()
}

/// Fetch a table's `CREATE TABLE` statement, terminated for the dump.
///
/// An error means the schema is unavailable; the dump carries on without a
/// schema block for that table.
pub async fn emit_schema(source: &dyn DatabaseSource, table: &str) -> Result<String> {
    let ddl = source.create_table_statement(table).await?;
    Ok(format!("{};\n\n", ddl.trim_end().trim_end_matches(';')))
}

/// `-- Table: <name>` marker line
pub fn table_marker(table: &str) -> String {
    comment_line(&format!("Table: {}", table))
}

/// A SQL line comment. Line breaks in `text` are flattened so the comment
/// cannot spill into the statements that follow.
pub fn comment_line(text: &str) -> String {
    let flat: String = text
        .chars()
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect();
    format!("-- {}\n", flat)
}
