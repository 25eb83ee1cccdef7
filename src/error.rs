//! Error types for sqlcsv.
//!
//! Defines the main error enum used throughout the application.

use thiserror::Error;

/// Main error type for sqlcsv operations.
#[derive(Error, Debug)]
pub enum SqlCsvError {
    /// Startup errors (bad arguments, unreadable input, unwritable output path)
    #[error("Startup error: {0}")]
    Startup(String),

    /// Configuration errors (invalid config file, bad connection target, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Database connection errors (host unreachable, auth failed, etc.)
    #[error("Connection error: {0}")]
    Connection(String),

    /// Query execution errors (syntax errors, constraint violations, etc.)
    #[error("Query error: {0}")]
    Query(String),

    /// A large-text column value that could not be read as text.
    #[error("Large object read error in column '{column}': {message}")]
    LargeObjectRead { column: String, message: String },

    /// CSV encoder or output stream failures.
    #[error("Output error: {0}")]
    Output(String),
}

impl SqlCsvError {
    /// Creates a startup error with the given message.
    pub fn startup(msg: impl Into<String>) -> Self {
        Self::Startup(msg.into())
    }

    /// Creates a configuration error with the given message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Creates a connection error with the given message.
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    /// Creates a query error with the given message.
    pub fn query(msg: impl Into<String>) -> Self {
        Self::Query(msg.into())
    }

    /// Creates a large object read error for the named column.
    pub fn large_object(column: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::LargeObjectRead {
            column: column.into(),
            message: msg.into(),
        }
    }

    /// Creates an output error with the given message.
    pub fn output(msg: impl Into<String>) -> Self {
        Self::Output(msg.into())
    }

    /// Returns the error category as a string for display purposes.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Startup(_) => "Startup Error",
            Self::Config(_) => "Configuration Error",
            Self::Connection(_) => "Connection Error",
            Self::Query(_) => "Query Error",
            Self::LargeObjectRead { .. } => "Large Object Error",
            Self::Output(_) => "Output Error",
        }
    }
}

/// Result type alias using SqlCsvError.
pub type Result<T> = std::result::Result<T, SqlCsvError>;
