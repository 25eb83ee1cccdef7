//! PostgreSQL database client implementation.
//!
//! Statements run over the simple-query protocol, so the server sends every
//! value in its own textual form. That text is the natural conversion used
//! for default-bucket columns.

use crate::config::ConnectionConfig;
use crate::db::{finish_without_rows, stream_results, DatabaseClient, ExecutionOutcome, Streamed};
use crate::error::{Result, SqlCsvError};
use crate::export::{ColumnDescriptors, FieldFormattingError, RawRow, ResultSink};
use async_trait::async_trait;
use futures::TryStreamExt;
use sqlx::postgres::{PgConnection, PgRow};
use sqlx::{Column, Connection, Executor, Row, TypeInfo, ValueRef};
use tracing::debug;

/// PostgreSQL database client over a single connection.
#[derive(Debug)]
pub struct PostgresClient {
    conn: PgConnection,
}

impl PostgresClient {
    /// Opens a connection for the given configuration.
    pub async fn connect(config: &ConnectionConfig) -> Result<Self> {
        let conn_str = config.to_connection_string()?;
        let conn = PgConnection::connect(&conn_str)
            .await
            .map_err(|e| map_connection_error(e, config))?;

        debug!("Successfully connected to database");
        Ok(Self { conn })
    }

    /// Result columns of a statement that returned no rows.
    ///
    /// Multi-statement text cannot be prepared, so it has no description and
    /// counts as DML.
    async fn describe_columns(&mut self, sql: &str) -> Option<ColumnDescriptors> {
        match self.conn.describe(sql).await {
            Ok(describe) => Some(ColumnDescriptors::from_metadata(
                describe
                    .columns()
                    .iter()
                    .map(|col| (col.name(), col.type_info().name())),
            )),
            Err(e) => {
                debug!("Statement has no description: {}", e);
                None
            }
        }
    }
}

#[async_trait]
impl DatabaseClient for PostgresClient {
    async fn execute(&mut self, sql: &str, sink: &mut dyn ResultSink) -> Result<ExecutionOutcome> {
        let steps = Executor::fetch_many(&mut self.conn, sqlx::raw_sql(sql))
            .map_ok(|step| step.map_left(|done| done.rows_affected()))
            .map_err(|e| SqlCsvError::query(format_query_error(e)));

        let streamed = stream_results(steps, header_of, sink).await?;
        match streamed {
            Streamed::Rows(rows) => Ok(ExecutionOutcome::ResultSet { rows }),
            Streamed::NoRows { rows_affected } => {
                let described = self.describe_columns(sql).await;
                finish_without_rows(described, rows_affected, sink)
            }
        }
    }

    async fn close(self: Box<Self>) -> Result<()> {
        self.conn
            .close()
            .await
            .map_err(|e| SqlCsvError::connection(format!("Failed to close connection: {e}")))
    }
}

/// Header of a result set, classified by the column types the server sent.
fn header_of(row: &PgRow) -> ColumnDescriptors {
    ColumnDescriptors::from_metadata(
        row.columns()
            .iter()
            .map(|col| (col.name(), col.type_info().name())),
    )
}

impl RawRow for PgRow {
    fn width(&self) -> usize {
        self.len()
    }

    fn is_null(&self, index: usize) -> bool {
        self.try_get_raw(index).map(|v| v.is_null()).unwrap_or(false)
    }

    fn read_large_text(&self, index: usize) -> std::result::Result<String, FieldFormattingError> {
        Ok(self.try_get::<String, _>(index)?)
    }

    fn natural_text(&self, index: usize) -> std::result::Result<String, FieldFormattingError> {
        Ok(self.try_get_unchecked::<String, _>(index)?)
    }
}

/// Maps sqlx connection errors to user-friendly messages.
fn map_connection_error(error: sqlx::Error, config: &ConnectionConfig) -> SqlCsvError {
    let host = config.host.as_deref().unwrap_or("localhost");
    let port = config.port_or_default();
    let user = config.user.as_deref().unwrap_or("unknown");
    let database = config.database.as_deref().unwrap_or("unknown");

    let error_str = error.to_string().to_lowercase();

    if error_str.contains("connection refused") || error_str.contains("could not connect") {
        SqlCsvError::connection(format!(
            "Cannot connect to {host}:{port}. Check that the server is running."
        ))
    } else if error_str.contains("password authentication failed")
        || error_str.contains("authentication failed")
    {
        SqlCsvError::connection(format!(
            "Authentication failed for user '{user}'. Check your credentials."
        ))
    } else if error_str.contains("does not exist") && error_str.contains("database") {
        SqlCsvError::connection(format!("Database '{database}' does not exist."))
    } else if error_str.contains("timed out") || error_str.contains("timeout") {
        SqlCsvError::connection(format!(
            "Connection to {host}:{port} timed out. The server may be overloaded or unreachable."
        ))
    } else {
        SqlCsvError::connection(error.to_string())
    }
}

/// Formats a query error with detail and hint lines if available.
fn format_query_error(error: sqlx::Error) -> String {
    let Some(db_error) = error.as_database_error() else {
        return error.to_string();
    };

    let mut result = String::from("ERROR: ");
    result.push_str(db_error.message());

    if let Some(pg_error) = db_error.try_downcast_ref::<sqlx::postgres::PgDatabaseError>() {
        let extras = [
            ("DETAIL", pg_error.detail()),
            ("HINT", pg_error.hint()),
            ("TABLE", pg_error.table()),
            ("COLUMN", pg_error.column()),
            ("CONSTRAINT", pg_error.constraint()),
        ];
        for (label, value) in extras {
            if let Some(value) = value {
                result.push_str(&format!("\n  {label}: {value}"));
            }
        }
    }

    result
}
