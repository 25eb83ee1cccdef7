//! sqlcsv - Run one SQL statement and stream the result set as CSV.

use sqlcsv::cli::Cli;
use sqlcsv::config::Config;
use sqlcsv::error::Result;
use sqlcsv::export::{self, CsvSink};
use sqlcsv::{db, logging};
use tracing::{debug, info};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    logging::init_stderr_logging();

    if let Err(e) = run().await {
        eprintln!("{}: {}", e.category(), e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse_args();

    // Load configuration file
    let config_path = cli.config_path();
    debug!("Loading config from: {}", config_path.display());
    let config = Config::load_from_file(&config_path)?;

    let connection = cli.to_connection_config(&config)?;

    // Read the statement and open the output before touching the database
    let sql = export::read_sql(cli.input_path())?;
    let output = export::open_output(cli.output_path())?;
    let mut sink = CsvSink::new(output, config.csv.clone());

    info!("Connection: {}", connection.display_string());
    let client = db::connect(&connection).await?;

    export::run_export(client, &sql, &mut sink).await?;
    Ok(())
}
