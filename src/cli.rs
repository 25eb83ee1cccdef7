//! Command-line argument parsing for sqlcsv.

use crate::config::{Config, ConnectionConfig};
use crate::db::DatabaseBackend;
use crate::error::{Result, SqlCsvError};
use clap::Parser;
use std::path::{Path, PathBuf};

/// Run one SQL statement and stream the result set as CSV.
///
/// If -i or -o are omitted, stdin and stdout are used.
#[derive(Parser, Debug)]
#[command(name = "sqlcsv")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Database target: host[:port][/database], a postgres:// URL, or a SQLite file
    #[arg(value_name = "HOST")]
    pub host: String,

    /// Database user
    #[arg(value_name = "USER")]
    pub user: String,

    /// Database password
    #[arg(value_name = "PASSWORD")]
    pub password: String,

    /// Read the SQL statement from this file instead of stdin
    #[arg(short = 'i', long, value_name = "SQL_FILE")]
    pub input: Option<PathBuf>,

    /// Write the output to this file instead of stdout
    #[arg(short = 'o', long, value_name = "OUTPUT_FILE")]
    pub output: Option<PathBuf>,

    /// Database backend: postgres or sqlite
    #[arg(short = 'b', long, value_name = "BACKEND")]
    pub backend: Option<String>,

    /// Config file path
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

impl Cli {
    /// Parses command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Returns the config file path to use.
    ///
    /// Uses the --config argument if provided, otherwise the default path.
    pub fn config_path(&self) -> PathBuf {
        self.config.clone().unwrap_or_else(Config::default_path)
    }

    /// Resolves the backend: --backend, then the config file, then the
    /// URL scheme of the target, then PostgreSQL.
    pub fn resolve_backend(&self, config: &Config) -> Result<DatabaseBackend> {
        if let Some(name) = &self.backend {
            return DatabaseBackend::parse(name).ok_or_else(|| {
                SqlCsvError::startup(format!(
                    "Invalid backend: {name}. Expected: postgres or sqlite"
                ))
            });
        }
        if let Some(backend) = config.backend {
            return Ok(backend);
        }
        if self.host.starts_with("sqlite:") {
            return Ok(DatabaseBackend::Sqlite);
        }
        Ok(DatabaseBackend::default())
    }

    /// Builds the connection configuration from the positional arguments.
    pub fn to_connection_config(&self, config: &Config) -> Result<ConnectionConfig> {
        let backend = self.resolve_backend(config)?;
        let mut connection =
            ConnectionConfig::from_target(backend, &self.host, &self.user, &self.password)?;
        connection.apply_env_defaults();
        Ok(connection)
    }

    pub fn input_path(&self) -> Option<&Path> {
        self.input.as_deref()
    }

    pub fn output_path(&self) -> Option<&Path> {
        self.output.as_deref()
    }
}
