//! Database abstraction layer for sqlcsv.
//!
//! Provides a trait-based interface for running one statement, allowing
//! different database backends to be used interchangeably.

mod mock;
mod postgres;
mod sqlite;
mod types;

pub use mock::{FailingDatabaseClient, MockDatabaseClient, MockResponse};
pub use postgres::PostgresClient;
pub use sqlite::SqliteClient;
pub use types::{ExecutionOutcome, Row, Value};

use crate::config::ConnectionConfig;
use crate::error::Result;
use crate::export::{ColumnDescriptors, RawRow, ResultSink};
use async_trait::async_trait;
use futures::{Stream, TryStreamExt};
use sqlx::Either;
use tracing::{debug, warn};

/// Supported database backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseBackend {
    #[default]
    Postgres,
    Sqlite,
}

impl DatabaseBackend {
    /// Returns the backend as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Postgres => "postgres",
            Self::Sqlite => "sqlite",
        }
    }

    /// Parses a backend from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "postgres" | "postgresql" | "pg" => Some(Self::Postgres),
            "sqlite" | "sqlite3" => Some(Self::Sqlite),
            _ => None,
        }
    }

    /// Returns the default port for this backend.
    pub fn default_port(&self) -> u16 {
        match self {
            Self::Postgres => 5432,
            Self::Sqlite => 0,
        }
    }
}

/// Creates a database client for the given backend and configuration.
///
/// This is the central factory function for database connections.
pub async fn connect(config: &ConnectionConfig) -> Result<Box<dyn DatabaseClient>> {
    debug!("Connecting to {}", config.display_string());
    match config.backend {
        DatabaseBackend::Postgres => {
            let client = PostgresClient::connect(config).await?;
            Ok(Box::new(client))
        }
        DatabaseBackend::Sqlite => {
            let client = SqliteClient::connect(config).await?;
            Ok(Box::new(client))
        }
    }
}

/// Trait defining the interface for database clients.
///
/// A client owns exactly one connection.
#[async_trait]
pub trait DatabaseClient: Send {
    /// Executes the SQL text as one unit.
    ///
    /// The first result set is written to `sink`, header first and then one
    /// row at a time. Input that returns no result columns reports the
    /// affected-row count summed over its statements without touching the
    /// sink.
    async fn execute(&mut self, sql: &str, sink: &mut dyn ResultSink) -> Result<ExecutionOutcome>;

    /// Closes the connection. Consumes the client so it happens once.
    async fn close(self: Box<Self>) -> Result<()>;
}

/// What draining a statement's result stream produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Streamed {
    /// A result set was exported with this many rows.
    Rows(u64),
    /// No statement returned a row; counts are summed over all statements.
    NoRows { rows_affected: u64 },
}

/// Drains the steps of an executed statement, writing rows in lockstep.
///
/// `Left` steps carry each statement's affected-row count, `Right` steps a
/// row. The header is taken from the first row through `header_of`. Only the
/// first result set is exported; rows of later statements are consumed and
/// discarded so the whole input still runs.
pub(crate) async fn stream_results<R, S, F>(
    mut steps: S,
    header_of: F,
    sink: &mut dyn ResultSink,
) -> Result<Streamed>
where
    R: RawRow,
    S: Stream<Item = Result<Either<u64, R>>> + Unpin,
    F: Fn(&R) -> ColumnDescriptors,
{
    let mut header: Option<ColumnDescriptors> = None;
    let mut result_set_closed = false;
    let mut rows = 0u64;
    let mut rows_affected = 0u64;
    let mut discarded = 0u64;

    while let Some(step) = steps.try_next().await? {
        match step {
            Either::Left(affected) => {
                rows_affected += affected;
                result_set_closed = header.is_some();
            }
            Either::Right(_) if result_set_closed => discarded += 1,
            Either::Right(row) => {
                if header.is_none() {
                    let columns = header_of(&row);
                    debug!("Result set has {} columns", columns.len());
                    sink.write_header(&columns)?;
                    header = Some(columns);
                }
                if let Some(columns) = &header {
                    sink.write_record(&columns.format_row(&row)?)?;
                    rows += 1;
                }
            }
        }
    }

    if discarded > 0 {
        warn!("Discarded {} rows returned after the first result set", discarded);
    }

    if header.is_some() {
        debug!("Streamed {} rows", rows);
        Ok(Streamed::Rows(rows))
    } else {
        Ok(Streamed::NoRows { rows_affected })
    }
}

/// Settles a statement that returned no rows.
///
/// A query still gets its header when `described` yields columns; anything
/// else reports the affected-row count.
pub(crate) fn finish_without_rows(
    described: Option<ColumnDescriptors>,
    rows_affected: u64,
    sink: &mut dyn ResultSink,
) -> Result<ExecutionOutcome> {
    match described.filter(|columns| !columns.is_empty()) {
        Some(columns) => {
            sink.write_header(&columns)?;
            Ok(ExecutionOutcome::ResultSet { rows: 0 })
        }
        None => {
            debug!("Statement returned no result columns");
            Ok(ExecutionOutcome::RowsAffected(rows_affected))
        }
    }
}
