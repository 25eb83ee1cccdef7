//! Statement export pipeline.
//!
//! Reads the SQL text, runs it through a [`DatabaseClient`] and writes the
//! outcome to a [`ResultSink`]: CSV for result sets, a single
//! `Records updated: N` line for DML.

mod serializer;
mod sink;

pub use serializer::{
    ColumnBucket, ColumnDescriptor, ColumnDescriptors, FieldFormattingError, OutputRecord, RawRow,
    FAILURE_SENTINEL,
};
pub use sink::{CsvSink, ResultSink};

use crate::db::{DatabaseClient, ExecutionOutcome};
use crate::error::{Result, SqlCsvError};
use std::fs::File;
use std::io::{self, BufWriter, Read, Write};
use std::path::Path;
use tracing::{debug, info, warn};

/// Reads the whole statement from `path`, or from stdin when `None`.
pub fn read_sql(path: Option<&Path>) -> Result<String> {
    let mut sql = String::new();
    match path {
        Some(path) => {
            File::open(path)
                .and_then(|mut f| f.read_to_string(&mut sql))
                .map_err(|e| {
                    SqlCsvError::startup(format!(
                        "Cannot read input file '{}': {e}",
                        path.display()
                    ))
                })?;
        }
        None => {
            io::stdin()
                .read_to_string(&mut sql)
                .map_err(|e| SqlCsvError::startup(format!("Cannot read standard input: {e}")))?;
        }
    }

    let sql = sql.trim();
    if sql.is_empty() {
        return Err(SqlCsvError::startup("No SQL statement given"));
    }
    Ok(sql.to_string())
}

/// Opens the output destination: `path` if given, otherwise stdout.
pub fn open_output(path: Option<&Path>) -> Result<Box<dyn Write + Send>> {
    match path {
        Some(path) => {
            let file = File::create(path).map_err(|e| {
                SqlCsvError::startup(format!(
                    "Cannot open output file '{}': {e}",
                    path.display()
                ))
            })?;
            Ok(Box::new(BufWriter::new(file)))
        }
        None => Ok(Box::new(BufWriter::new(io::stdout()))),
    }
}

/// Executes `sql` on `client` and writes the outcome to `sink`.
///
/// The client is closed exactly once whether or not execution succeeds.
/// Output is flushed before the connection is closed.
pub async fn run_export(
    mut client: Box<dyn DatabaseClient>,
    sql: &str,
    sink: &mut dyn ResultSink,
) -> Result<ExecutionOutcome> {
    let result = export_statement(client.as_mut(), sql, sink).await;

    debug!("Closing database connection");
    if let Err(e) = client.close().await {
        warn!("{}", e);
    }

    let outcome = result?;
    info!("{}", outcome);
    Ok(outcome)
}

async fn export_statement(
    client: &mut dyn DatabaseClient,
    sql: &str,
    sink: &mut dyn ResultSink,
) -> Result<ExecutionOutcome> {
    let outcome = client.execute(sql, sink).await?;
    if let ExecutionOutcome::RowsAffected(count) = outcome {
        sink.write_update_count(count)?;
    }
    sink.finish()?;
    Ok(outcome)
}
