//! Result-set-to-text serialization.
//!
//! Header capture classifies each column once into a [`ColumnBucket`]; row
//! formatting then turns every raw row into an [`OutputRecord`] using the
//! bucket chosen for its position.

use crate::error::{Result, SqlCsvError};
use std::fmt;
use tracing::warn;

/// Field value substituted when a value has no natural textual form.
pub const FAILURE_SENTINEL: &str = "**FAILURE**";

/// Declared type names treated as character large objects.
const LARGE_TEXT_TYPES: &[&str] = &[
    "CLOB",
    "NCLOB",
    "TEXT",
    "NTEXT",
    "TINYTEXT",
    "MEDIUMTEXT",
    "LONGTEXT",
];

/// One output row, positionally aligned with the column descriptors.
pub type OutputRecord = Vec<String>;

/// Formatting bucket for a result column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnBucket {
    /// Character large object: read to completion as text.
    LargeText,
    /// Everything else: natural textual form of the value.
    Default,
}

impl ColumnBucket {
    /// Classifies a declared column type name.
    pub fn classify(type_name: &str) -> Self {
        let name = type_name.trim();
        if LARGE_TEXT_TYPES
            .iter()
            .any(|large| name.eq_ignore_ascii_case(large))
        {
            Self::LargeText
        } else {
            Self::Default
        }
    }
}

/// Name and bucket of a single result column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDescriptor {
    pub name: String,
    pub bucket: ColumnBucket,
}

impl ColumnDescriptor {
    /// Creates a descriptor, classifying the declared type name.
    pub fn new(name: impl Into<String>, type_name: &str) -> Self {
        Self {
            name: name.into(),
            bucket: ColumnBucket::classify(type_name),
        }
    }
}

/// A value could not be converted to text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldFormattingError(pub String);

impl FieldFormattingError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}

impl fmt::Display for FieldFormattingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for FieldFormattingError {}

impl From<sqlx::Error> for FieldFormattingError {
    fn from(e: sqlx::Error) -> Self {
        Self(e.to_string())
    }
}

/// Read access to one row of a result set.
///
/// Indexes are zero-based and always below [`RawRow::width`] when called
/// from the serializer.
pub trait RawRow {
    /// Number of values in the row.
    fn width(&self) -> usize;

    /// Returns true if the value at `index` is SQL NULL.
    fn is_null(&self, index: usize) -> bool;

    /// Reads the full content of a large-text value.
    fn read_large_text(&self, index: usize) -> std::result::Result<String, FieldFormattingError>;

    /// Converts a value to its natural textual form.
    fn natural_text(&self, index: usize) -> std::result::Result<String, FieldFormattingError>;
}

/// Immutable header of a result set, captured once before the first row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnDescriptors {
    columns: Vec<ColumnDescriptor>,
}

impl ColumnDescriptors {
    pub fn new(columns: Vec<ColumnDescriptor>) -> Self {
        Self { columns }
    }

    /// Builds descriptors from `(name, declared type)` pairs.
    pub fn from_metadata<I, N, T>(metadata: I) -> Self
    where
        I: IntoIterator<Item = (N, T)>,
        N: Into<String>,
        T: AsRef<str>,
    {
        Self::new(
            metadata
                .into_iter()
                .map(|(name, ty)| ColumnDescriptor::new(name, ty.as_ref()))
                .collect(),
        )
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ColumnDescriptor> {
        self.columns.iter()
    }

    /// Column names in order, used as the CSV header.
    pub fn names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Formats one row into an output record.
    ///
    /// Null values become empty strings regardless of bucket. Default-bucket
    /// conversion failures are replaced by [`FAILURE_SENTINEL`]; large-text
    /// read failures abort with [`SqlCsvError::LargeObjectRead`].
    pub fn format_row<R: RawRow + ?Sized>(&self, row: &R) -> Result<OutputRecord> {
        if row.width() != self.columns.len() {
            return Err(SqlCsvError::query(format!(
                "Row has {} values but the result header has {} columns",
                row.width(),
                self.columns.len()
            )));
        }

        self.columns
            .iter()
            .enumerate()
            .map(|(index, column)| format_field(column, row, index))
            .collect()
    }
}

fn format_field<R: RawRow + ?Sized>(
    column: &ColumnDescriptor,
    row: &R,
    index: usize,
) -> Result<String> {
    if row.is_null(index) {
        return Ok(String::new());
    }

    match column.bucket {
        ColumnBucket::LargeText => row
            .read_large_text(index)
            .map_err(|e| SqlCsvError::large_object(&column.name, e.0)),
        ColumnBucket::Default => Ok(row.natural_text(index).unwrap_or_else(|e| {
            warn!("Cannot format value in column '{}': {}", column.name, e);
            FAILURE_SENTINEL.to_string()
        })),
    }
}
