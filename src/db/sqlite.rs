//! SQLite database client implementation.
//!
//! SQLite values are dynamically typed, so every column is formatted by the
//! natural conversion, which looks at each value's storage class rather
//! than the declared column type.

use crate::config::ConnectionConfig;
use crate::db::{finish_without_rows, stream_results, DatabaseClient, ExecutionOutcome, Streamed};
use crate::error::{Result, SqlCsvError};
use crate::export::{
    ColumnBucket, ColumnDescriptor, ColumnDescriptors, FieldFormattingError, RawRow, ResultSink,
};
use async_trait::async_trait;
use futures::TryStreamExt;
use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection, SqliteRow};
use sqlx::{Column, ConnectOptions, Connection, Executor, Row, TypeInfo, ValueRef};
use std::str::FromStr;
use tracing::debug;

/// SQLite database client over a single connection.
#[derive(Debug)]
pub struct SqliteClient {
    conn: SqliteConnection,
}

impl SqliteClient {
    /// Opens the database file named by the configuration.
    ///
    /// `:memory:` opens a private in-memory database. The file must exist.
    pub async fn connect(config: &ConnectionConfig) -> Result<Self> {
        let target = config.database.as_deref().unwrap_or(":memory:");
        let options = if target == ":memory:" || target.starts_with("sqlite:") {
            let url = if target == ":memory:" {
                "sqlite::memory:"
            } else {
                target
            };
            SqliteConnectOptions::from_str(url)
                .map_err(|e| SqlCsvError::config(format!("Invalid SQLite target '{target}': {e}")))?
        } else {
            SqliteConnectOptions::new().filename(target)
        };

        let conn = options
            .connect()
            .await
            .map_err(|e| SqlCsvError::connection(format!("Cannot open '{target}': {e}")))?;

        debug!("Opened SQLite database {}", target);
        Ok(Self { conn })
    }

    /// Result columns of a statement that returned no rows.
    async fn describe_columns(&mut self, sql: &str) -> Option<ColumnDescriptors> {
        match self.conn.describe(sql).await {
            Ok(describe) => Some(default_bucket(
                describe.columns().iter().map(|col| col.name()),
            )),
            Err(e) => {
                debug!("Statement has no description: {}", e);
                None
            }
        }
    }
}

/// Header of a result set.
///
/// The driver reports storage classes rather than declared types, and any
/// column may hold a value of any class, so every column formats by its
/// natural conversion.
fn header_of(row: &SqliteRow) -> ColumnDescriptors {
    default_bucket(row.columns().iter().map(|col| col.name()))
}

fn default_bucket<'a>(names: impl Iterator<Item = &'a str>) -> ColumnDescriptors {
    ColumnDescriptors::new(
        names
            .map(|name| ColumnDescriptor {
                name: name.to_string(),
                bucket: ColumnBucket::Default,
            })
            .collect(),
    )
}

#[async_trait]
impl DatabaseClient for SqliteClient {
    async fn execute(&mut self, sql: &str, sink: &mut dyn ResultSink) -> Result<ExecutionOutcome> {
        let steps = Executor::fetch_many(&mut self.conn, sqlx::raw_sql(sql))
            .map_ok(|step| step.map_left(|done| done.rows_affected()))
            .map_err(|e| SqlCsvError::query(e.to_string()));

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

impl RawRow for SqliteRow {
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
        let storage = self.try_get_raw(index)?.type_info().name().to_string();
        match storage.as_str() {
            "INTEGER" => Ok(self.try_get_unchecked::<i64, _>(index)?.to_string()),
            "REAL" => Ok(self.try_get_unchecked::<f64, _>(index)?.to_string()),
            "BLOB" => {
                let bytes = self.try_get_unchecked::<Vec<u8>, _>(index)?;
                String::from_utf8(bytes).map_err(|e| {
                    FieldFormattingError::new(format!("binary value is not text: {e}"))
                })
            }
            _ => Ok(self.try_get_unchecked::<String, _>(index)?),
        }
    }
}
