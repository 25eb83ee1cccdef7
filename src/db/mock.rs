//! Mock database clients for testing.
//!
//! Provide scripted, in-memory results so the export pipeline can be
//! exercised without a database server.

use super::{finish_without_rows, stream_results, DatabaseClient, ExecutionOutcome, Row, Streamed};
use crate::error::{Result, SqlCsvError};
use crate::export::{ColumnDescriptors, ResultSink};
use async_trait::async_trait;
use sqlx::Either;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Scripted response returned by [`MockDatabaseClient`].
#[derive(Debug, Clone)]
pub enum MockResponse {
    /// DML affecting this many rows.
    RowsAffected(u64),

    /// A result set with `(name, declared type)` columns and rows.
    ResultSet {
        columns: Vec<(String, String)>,
        rows: Vec<Row>,
    },
}

impl MockResponse {
    /// Builds a result set response from borrowed column metadata.
    pub fn result_set(columns: &[(&str, &str)], rows: Vec<Row>) -> Self {
        Self::ResultSet {
            columns: columns
                .iter()
                .map(|(name, ty)| (name.to_string(), ty.to_string()))
                .collect(),
            rows,
        }
    }
}

/// A mock database client that returns a predefined response.
pub struct MockDatabaseClient {
    response: MockResponse,
    executed: Vec<String>,
    closes: Arc<AtomicUsize>,
}

impl MockDatabaseClient {
    /// Creates a mock client that answers every statement with `response`.
    pub fn new(response: MockResponse) -> Self {
        Self {
            response,
            executed: Vec::new(),
            closes: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Counter incremented each time the client is closed.
    pub fn close_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.closes)
    }

    /// Statements executed so far.
    pub fn executed(&self) -> &[String] {
        &self.executed
    }
}

#[async_trait]
impl DatabaseClient for MockDatabaseClient {
    async fn execute(&mut self, sql: &str, sink: &mut dyn ResultSink) -> Result<ExecutionOutcome> {
        self.executed.push(sql.to_string());

        match &self.response {
            MockResponse::RowsAffected(n) => Ok(ExecutionOutcome::RowsAffected(*n)),
            MockResponse::ResultSet { columns, rows } => {
                let descriptors = ColumnDescriptors::from_metadata(
                    columns.iter().map(|(name, ty)| (name.as_str(), ty.as_str())),
                );
                let steps = rows
                    .iter()
                    .cloned()
                    .map(|row| Ok::<_, SqlCsvError>(Either::Right(row)))
                    .chain(std::iter::once(Ok(Either::Left(rows.len() as u64))));
                let header_of = |_: &Row| descriptors.clone();
                let streamed = stream_results(futures::stream::iter(steps), header_of, sink).await?;
                match streamed {
                    Streamed::Rows(rows) => Ok(ExecutionOutcome::ResultSet { rows }),
                    Streamed::NoRows { rows_affected } => {
                        finish_without_rows(Some(descriptors), rows_affected, sink)
                    }
                }
            }
        }
    }

    async fn close(self: Box<Self>) -> Result<()> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// A mock client whose statements always fail.
pub struct FailingDatabaseClient {
    message: String,
    closes: Arc<AtomicUsize>,
}

impl FailingDatabaseClient {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            closes: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Counter incremented each time the client is closed.
    pub fn close_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.closes)
    }
}

#[async_trait]
impl DatabaseClient for FailingDatabaseClient {
    async fn execute(&mut self, _sql: &str, _sink: &mut dyn ResultSink) -> Result<ExecutionOutcome> {
        Err(SqlCsvError::query(self.message.clone()))
    }

    async fn close(self: Box<Self>) -> Result<()> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
