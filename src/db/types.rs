//! Statement outcome and in-memory value types for sqlcsv.

use crate::export::{FieldFormattingError, RawRow};
use std::fmt;

/// Classified result of executing one statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionOutcome {
    /// The statement was DML/DDL and affected this many rows.
    RowsAffected(u64),

    /// The statement produced a result set of this many rows.
    ResultSet { rows: u64 },
}

impl fmt::Display for ExecutionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RowsAffected(n) => write!(f, "{n} row(s) affected"),
            Self::ResultSet { rows } => write!(f, "{rows} row(s) exported"),
        }
    }
}

/// A row of in-memory values, as produced by the mock client.
pub type Row = Vec<Value>;

/// Represents a single value from a database query.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Value {
    /// NULL value.
    #[default]
    Null,

    /// Boolean value.
    Bool(bool),

    /// Signed integer (up to i64).
    Int(i64),

    /// Floating point number.
    Float(f64),

    /// Text/string value.
    String(String),

    /// Binary data.
    Bytes(Vec<u8>),
}

impl Value {
    /// Returns true if this value is NULL.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Natural textual form of the value.
    ///
    /// Binary data only has one if it is valid UTF-8.
    pub fn to_text(&self) -> Result<String, FieldFormattingError> {
        match self {
            Value::Null => Err(FieldFormattingError::new("unexpected NULL")),
            Value::Bool(b) => Ok(b.to_string()),
            Value::Int(i) => Ok(i.to_string()),
            Value::Float(f) => Ok(f.to_string()),
            Value::String(s) => Ok(s.clone()),
            Value::Bytes(b) => String::from_utf8(b.clone())
                .map_err(|e| FieldFormattingError::new(format!("binary value is not text: {e}"))),
        }
    }

    fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "NULL",
            Value::Bool(_) => "BOOLEAN",
            Value::Int(_) => "INTEGER",
            Value::Float(_) => "REAL",
            Value::String(_) => "TEXT",
            Value::Bytes(_) => "BLOB",
        }
    }
}

impl RawRow for Row {
    fn width(&self) -> usize {
        self.len()
    }

    fn is_null(&self, index: usize) -> bool {
        self[index].is_null()
    }

    fn read_large_text(&self, index: usize) -> Result<String, FieldFormattingError> {
        match &self[index] {
            Value::String(s) => Ok(s.clone()),
            other => Err(FieldFormattingError::new(format!(
                "value is {}, expected TEXT",
                other.type_name()
            ))),
        }
    }

    fn natural_text(&self, index: usize) -> Result<String, FieldFormattingError> {
        self[index].to_text()
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}
