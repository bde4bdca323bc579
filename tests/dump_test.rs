// End-to-end tests for dump jobs against SQLite

mod common;

use chrono::{TimeZone, Utc};
use common::{FIXTURE_SQL, all_rows, insert_lines, seeded_source};
use dbkup_core::{DumpRequest, Error};
use dbkup_dump::{BackupStore, DumpOrchestrator};
use dbkup_source::DatabaseSource;
use std::sync::Arc;
use tempfile::TempDir;

async fn orchestrator(dir: &TempDir) -> (Arc<dyn DatabaseSource>, DumpOrchestrator) {
    let source: Arc<dyn DatabaseSource> = Arc::new(seeded_source(FIXTURE_SQL).await);
    let orchestrator = DumpOrchestrator::new(source.clone(), BackupStore::new(dir.path()));
    (source, orchestrator)
}

#[tokio::test]
async fn test_dump_replays_into_identical_rows() {
    let dir = TempDir::new().unwrap();
    let (source, orchestrator) = orchestrator(&dir).await;

    let request = DumpRequest::new(["people"]).with_schema(true).with_label("replay");
    let report = orchestrator.run(&request).await.unwrap();
    assert_eq!(report.tables[0].rows, 6);
    assert!(report.tables[0].schema);

    let dump = std::fs::read_to_string(&report.path).unwrap();

    // Replay the whole file, schema included, into a fresh database
    let restored = seeded_source(&dump).await;

    let original = all_rows(source.as_ref(), "people").await;
    let replayed = all_rows(&restored, "people").await;
    assert_eq!(original, replayed);
}

#[tokio::test]
async fn test_repeated_dumps_are_identical() {
    let dir = TempDir::new().unwrap();
    let (_, orchestrator) = orchestrator(&dir).await;
    let request = DumpRequest::new(["people", "empty"]).with_schema(true);

    let first = orchestrator
        .run_at(&request, Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap())
        .await
        .unwrap();
    let second = orchestrator
        .run_at(&request, Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 1).unwrap())
        .await
        .unwrap();

    assert_eq!(first.file_name, "backup-bkup-database-2024-01-01_00-00-00.sql");
    assert_ne!(first.file_name, second.file_name);
    assert_eq!(
        std::fs::read_to_string(&first.path).unwrap(),
        std::fs::read_to_string(&second.path).unwrap()
    );
}

#[tokio::test]
async fn test_hostile_text_stays_inside_literals() {
    let dir = TempDir::new().unwrap();
    let (_, orchestrator) = orchestrator(&dir).await;

    let report = orchestrator.run(&DumpRequest::new(["people"])).await.unwrap();
    let dump = std::fs::read_to_string(&report.path).unwrap();

    let inserts = insert_lines(&dump);
    assert_eq!(inserts.len(), 6);
    assert_eq!(
        inserts[0],
        "INSERT INTO `people` (`id`, `name`, `score`, `avatar`) VALUES ('1', 'Ada', '9.5', X'CAFE');"
    );
    assert!(inserts[2].contains("'x''); DROP TABLE people; --'"));
    assert!(dump.ends_with("VALUES ('6', NULL, NULL, NULL);\n\n"));
}

#[tokio::test]
async fn test_empty_table_has_schema_and_marker_only() {
    let dir = TempDir::new().unwrap();
    let (_, orchestrator) = orchestrator(&dir).await;

    let report = orchestrator
        .run(&DumpRequest::new(["empty"]).with_schema(true))
        .await
        .unwrap();

    assert_eq!(report.tables[0].rows, 0);
    assert_eq!(
        std::fs::read_to_string(&report.path).unwrap(),
        "CREATE TABLE empty (id INTEGER);\n\n-- Table: empty\n\n"
    );
}

#[tokio::test]
async fn test_failed_table_does_not_stop_the_job() {
    let dir = TempDir::new().unwrap();
    let (_, orchestrator) = orchestrator(&dir).await;

    let request = DumpRequest::new(["people; DROP TABLE people", "empty"]);
    let report = orchestrator.run(&request).await.unwrap();

    let failed: Vec<&str> = report.failed_tables().map(|t| t.table.as_str()).collect();
    assert_eq!(failed, vec!["people; DROP TABLE people"]);
    assert!(report.tables[1].is_ok());

    let dump = std::fs::read_to_string(&report.path).unwrap();
    assert_eq!(
        dump,
        "-- Table: people; DROP TABLE people\n\
         -- Error: table people; DROP TABLE people not found\n\
         \n\
         -- Table: empty\n\
         \n"
    );
}

#[tokio::test]
async fn test_same_second_dump_is_refused() {
    let dir = TempDir::new().unwrap();
    let (_, orchestrator) = orchestrator(&dir).await;
    let at = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
    let request = DumpRequest::new(["empty"]);

    let first = orchestrator.run_at(&request, at).await.unwrap();
    let before = std::fs::read_to_string(&first.path).unwrap();

    let err = orchestrator
        .run_at(&request.clone().with_schema(true), at)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::BackupExists(_)));

    // The earlier file is untouched
    assert_eq!(std::fs::read_to_string(&first.path).unwrap(), before);
    assert_eq!(orchestrator.store().list().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_invalid_utf8_text_does_not_cut_the_table() {
    let dir = TempDir::new().unwrap();
    let source = seeded_source(
        r#"
        CREATE TABLE t (id INTEGER, note TEXT);
        INSERT INTO t VALUES (1, 'ok');
        INSERT INTO t VALUES (2, CAST(X'FF41' AS TEXT));
        INSERT INTO t VALUES (3, 'after');
        "#,
    )
    .await;
    let orchestrator = DumpOrchestrator::new(Arc::new(source), BackupStore::new(dir.path()));

    let report = orchestrator.run(&DumpRequest::new(["t"])).await.unwrap();
    assert!(report.tables[0].is_ok());
    assert_eq!(report.tables[0].rows, 3);

    let dump = std::fs::read_to_string(&report.path).unwrap();
    assert_eq!(
        insert_lines(&dump),
        vec![
            "INSERT INTO `t` (`id`, `note`) VALUES ('1', 'ok');",
            "INSERT INTO `t` (`id`, `note`) VALUES ('2', X'FF41');",
            "INSERT INTO `t` (`id`, `note`) VALUES ('3', 'after');",
        ]
    );
}
