//! PostgreSQL export tests.
//!
//! Require a running PostgreSQL database; skipped unless DATABASE_URL is set.

use pretty_assertions::assert_eq;
use sqlcsv::config::{ConnectionConfig, CsvConfig};
use sqlcsv::db::{self, ExecutionOutcome};
use sqlcsv::error::SqlCsvError;
use sqlcsv::export::{run_export, CsvSink};

/// Helper to get test connection config from environment.
fn get_test_config() -> Option<ConnectionConfig> {
    let url = std::env::var("DATABASE_URL").ok()?;
    ConnectionConfig::from_connection_string(&url).ok()
}

async fn export(config: &ConnectionConfig, sql: &str) -> Result<(ExecutionOutcome, String), SqlCsvError> {
    let client = db::connect(config).await?;
    let mut sink = CsvSink::new(Vec::new(), CsvConfig::default());
    let outcome = run_export(client, sql, &mut sink).await?;
    Ok((outcome, String::from_utf8(sink.into_inner()?).unwrap()))
}

/// Scenario: DML round trip
/// Given a scratch table with three rows
/// When an UPDATE touching all of them is exported
/// Then the output is `Records updated: 3`
#[tokio::test]
async fn test_update_count() {
    let Some(config) = get_test_config() else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };

    export(&config, "DROP TABLE IF EXISTS sqlcsv_update_test").await.unwrap();
    export(&config, "CREATE TABLE sqlcsv_update_test (id serial PRIMARY KEY, qty int)")
        .await
        .unwrap();
    let (outcome, _) = export(&config, "INSERT INTO sqlcsv_update_test (qty) VALUES (1), (2), (3)")
        .await
        .unwrap();
    assert_eq!(outcome, ExecutionOutcome::RowsAffected(3));

    let (outcome, csv) = export(&config, "UPDATE sqlcsv_update_test SET qty = qty * 10")
        .await
        .unwrap();
    assert_eq!(outcome, ExecutionOutcome::RowsAffected(3));
    assert_eq!(csv, "Records updated: 3\n");

    let (_, csv) = export(&config, "SELECT id, qty FROM sqlcsv_update_test ORDER BY id")
        .await
        .unwrap();
    assert_eq!(csv, "id,qty\n1,10\n2,20\n3,30\n");

    export(&config, "DROP TABLE sqlcsv_update_test").await.unwrap();
}

/// Scenario: Zero-row query keeps its header
#[tokio::test]
async fn test_zero_rows_header_only() {
    let Some(config) = get_test_config() else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };

    let (outcome, csv) = export(&config, "SELECT 1 AS id, 'x'::text AS name WHERE false")
        .await
        .unwrap();
    assert_eq!(outcome, ExecutionOutcome::ResultSet { rows: 0 });
    assert_eq!(csv, "id,name\n");
}

/// Scenario: Natural text forms for non-text types
#[tokio::test]
async fn test_natural_text_forms() {
    let Some(config) = get_test_config() else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };

    let (_, csv) = export(
        &config,
        "SELECT TIMESTAMP '2024-02-29 13:45:00' AS ts, 12.340::numeric(6,3) AS n, \
         '{1,2}'::int[] AS arr, false AS flag",
    )
    .await
    .unwrap();
    assert_eq!(csv, "ts,n,arr,flag\n2024-02-29 13:45:00,12.340,\"{1,2}\",f\n");
}

/// Scenario: Streaming many rows
#[tokio::test]
async fn test_many_rows_streamed_in_order() {
    let Some(config) = get_test_config() else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };

    let (outcome, csv) = export(&config, "SELECT generate_series(1, 5000) AS n ORDER BY n")
        .await
        .unwrap();
    assert_eq!(outcome, ExecutionOutcome::ResultSet { rows: 5000 });

    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines.len(), 5001);
    assert_eq!(lines[0], "n");
    assert_eq!(lines[1], "1");
    assert_eq!(lines[5000], "5000");
}

/// Scenario: Syntax error is a query error
#[tokio::test]
async fn test_syntax_error() {
    let Some(config) = get_test_config() else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };

    let err = export(&config, "SELEC 1").await.unwrap_err();
    assert!(matches!(err, SqlCsvError::Query(_)));
    assert!(err.to_string().contains("syntax error"));
}

/// Scenario: Several DML statements in one input
/// Given a scratch table with three rows
/// When two UPDATEs wrapped in a transaction run as one input
/// Then the reported count is the sum of both
#[tokio::test]
async fn test_multi_statement_dml() {
    let Some(config) = get_test_config() else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };

    export(&config, "DROP TABLE IF EXISTS sqlcsv_multi_test").await.unwrap();
    export(
        &config,
        "CREATE TABLE sqlcsv_multi_test (id int PRIMARY KEY, v text); \
         INSERT INTO sqlcsv_multi_test VALUES (1, 'a'), (2, 'b'), (3, 'c')",
    )
    .await
    .unwrap();

    let (outcome, csv) = export(
        &config,
        "BEGIN; \
         UPDATE sqlcsv_multi_test SET v = 'x' WHERE id = 1; \
         UPDATE sqlcsv_multi_test SET v = 'y' WHERE id > 1; \
         COMMIT",
    )
    .await
    .unwrap();
    assert_eq!(outcome, ExecutionOutcome::RowsAffected(3));
    assert_eq!(csv, "Records updated: 3\n");

    let (_, csv) = export(&config, "SELECT v FROM sqlcsv_multi_test ORDER BY id")
        .await
        .unwrap();
    assert_eq!(csv, "v\nx\ny\ny\n");

    export(&config, "DROP TABLE sqlcsv_multi_test").await.unwrap();
}

/// Scenario: Failure after rows were written
/// Given a query whose second row divides by zero
/// When it is exported
/// Then the export fails with a query error
/// And the header and first row have already reached the output
#[tokio::test]
async fn test_failure_mid_stream_keeps_written_rows() {
    let Some(config) = get_test_config() else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };

    let client = db::connect(&config).await.unwrap();
    let mut sink = CsvSink::new(Vec::new(), CsvConfig::default());
    let err = run_export(
        client,
        "SELECT 1 / (x - 2) AS v FROM generate_series(1, 3) AS x",
        &mut sink,
    )
    .await
    .unwrap_err();

    assert!(matches!(err, SqlCsvError::Query(_)), "{err:?}");
    assert!(err.to_string().contains("division by zero"), "{err}");
    assert_eq!(String::from_utf8(sink.into_inner().unwrap()).unwrap(), "v\n-1\n");
}

/// Scenario: Large text column is read in full
#[tokio::test]
async fn test_large_text_column() {
    let Some(config) = get_test_config() else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };

    let (outcome, csv) = export(
        &config,
        "SELECT n, repeat(chr(64 + n), 100000) AS body FROM generate_series(1, 2) AS n",
    )
    .await
    .unwrap();
    assert_eq!(outcome, ExecutionOutcome::ResultSet { rows: 2 });
    assert_eq!(
        csv,
        format!("n,body\n1,{}\n2,{}\n", "A".repeat(100_000), "B".repeat(100_000))
    );
}
