//! Output sinks for export results.

use crate::config::CsvConfig;
use crate::error::{Result, SqlCsvError};
use crate::export::serializer::{ColumnDescriptors, OutputRecord};
use std::io::Write;

/// Destination for the outcome of a single statement.
///
/// A result set produces one `write_header` call followed by any number of
/// `write_record` calls. A DML statement produces one `write_update_count`.
pub trait ResultSink: Send {
    fn write_header(&mut self, columns: &ColumnDescriptors) -> Result<()>;

    fn write_record(&mut self, record: &OutputRecord) -> Result<()>;

    fn write_update_count(&mut self, count: u64) -> Result<()>;

    /// Flushes everything written so far.
    fn finish(&mut self) -> Result<()>;
}

enum SinkState<W: Write> {
    Raw(W),
    Csv(csv::Writer<W>),
    Poisoned,
}

/// Writes result sets as CSV and update counts as a plain line.
pub struct CsvSink<W: Write> {
    state: SinkState<W>,
    config: CsvConfig,
}

impl<W: Write> CsvSink<W> {
    pub fn new(writer: W, config: CsvConfig) -> Self {
        Self {
            state: SinkState::Raw(writer),
            config,
        }
    }

    /// Flushes and returns the underlying writer.
    pub fn into_inner(self) -> Result<W> {
        match self.state {
            SinkState::Raw(mut w) => {
                w.flush().map_err(|e| SqlCsvError::output(e.to_string()))?;
                Ok(w)
            }
            SinkState::Csv(csv) => csv
                .into_inner()
                .map_err(|e| SqlCsvError::output(e.error().to_string())),
            SinkState::Poisoned => Err(SqlCsvError::output("Output stream is unavailable")),
        }
    }

    fn csv_writer(&mut self) -> Result<&mut csv::Writer<W>> {
        match &mut self.state {
            SinkState::Csv(csv) => Ok(csv),
            _ => Err(SqlCsvError::output("Record written before the header")),
        }
    }
}

impl<W: Write + Send> ResultSink for CsvSink<W> {
    fn write_header(&mut self, columns: &ColumnDescriptors) -> Result<()> {
        let builder = self.config.writer_builder()?;
        let writer = match std::mem::replace(&mut self.state, SinkState::Poisoned) {
            SinkState::Raw(w) => w,
            other => {
                self.state = other;
                return Err(SqlCsvError::output("Header written twice"));
            }
        };

        let mut csv = builder.from_writer(writer);
        if self.config.header {
            csv.write_record(columns.names())
                .map_err(|e| SqlCsvError::output(e.to_string()))?;
        }
        self.state = SinkState::Csv(csv);
        Ok(())
    }

    fn write_record(&mut self, record: &OutputRecord) -> Result<()> {
        self.csv_writer()?
            .write_record(record)
            .map_err(|e| SqlCsvError::output(e.to_string()))
    }

    fn write_update_count(&mut self, count: u64) -> Result<()> {
        match &mut self.state {
            SinkState::Raw(w) => writeln!(w, "Records updated: {count}")
                .map_err(|e| SqlCsvError::output(e.to_string())),
            _ => Err(SqlCsvError::output(
                "Update count written after a result set",
            )),
        }
    }

    fn finish(&mut self) -> Result<()> {
        let flushed = match &mut self.state {
            SinkState::Raw(w) => w.flush(),
            SinkState::Csv(csv) => csv.flush(),
            SinkState::Poisoned => Ok(()),
        };
        flushed.map_err(|e| SqlCsvError::output(e.to_string()))
    }
}
