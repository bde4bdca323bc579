//! Common test utilities and helpers

#![allow(dead_code)]

use dbkup_core::Row;
use dbkup_source::{DatabaseSource, SqliteSource};
use futures::TryStreamExt;

/// Fixture with awkward text, binary data and an empty table
pub const FIXTURE_SQL: &str = r#"
    CREATE TABLE people (id INTEGER PRIMARY KEY, name TEXT, score REAL, avatar BLOB);
    INSERT INTO people VALUES (1, 'Ada', 9.5, X'CAFE');
    INSERT INTO people VALUES (2, 'O''Brien', 0.1, NULL);
    INSERT INTO people VALUES (3, 'x''); DROP TABLE people; --', -3.25, X'01');
    INSERT INTO people VALUES (4, 'two
lines and a \ backslash', NULL, NULL);
    INSERT INTO people VALUES (5, '007', 1e10, X'00FF');
    INSERT INTO people VALUES (6, NULL, NULL, NULL);
    CREATE TABLE empty (id INTEGER);
"#;

/// In-memory SQLite database seeded with `sql`
pub async fn seeded_source(sql: &str) -> SqliteSource {
    let source = SqliteSource::in_memory()
        .await
        .expect("Failed to open in-memory SQLite");

    sqlx::raw_sql(sql)
        .execute(source.pool())
        .await
        .expect("Failed to seed database");

    source
}

/// Every row of a table, in scan order
pub async fn all_rows(source: &dyn DatabaseSource, table: &str) -> Vec<Row> {
    source
        .fetch_rows(table, None)
        .try_collect()
        .await
        .expect("Failed to read rows")
}

/// Lines of a dump that are INSERT statements
pub fn insert_lines(dump: &str) -> Vec<&str> {
    dump.lines().filter(|l| l.starts_with("INSERT INTO")).collect()
}
