//! Import the TFDA food composition table into the ingredients table.
//!
//! Usage: cargo run --bin import_tfda -- [export.json]
//!
//! Without an argument the export is downloaded from `BAKECOST_TFDA_URL`
//! (default: the TFDA open data endpoint). Existing records are updated by
//! their TFDA id; prices set in the shop are kept.

use tracing_subscriber::EnvFilter;

use bakecost::config::Config;
use bakecost::db::Database;
use bakecost::tools::tfda;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("bakecost=info".parse()?))
        .with_writer(std::io::stderr)
        .init();

    let config = Config::from_env();

    let records = match std::env::args().nth(1) {
        Some(path) => {
            println!("Reading {}", path);
            tfda::parse_records(&std::fs::read_to_string(&path)?)?
        }
        None => {
            println!("Downloading {}", config.tfda_url);
            let client = reqwest::Client::new();
            tfda::fetch_records(&client, &config.tfda_url).await?
        }
    };
    println!("Parsed {} foods", records.len());

    if let Some(parent) = config.database_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    println!("Database: {}", config.database_path.display());
    let database = Database::open_migrated(&config.database_path)?;

    let summary = tfda::import_records(&database, &records)?;
    println!(
        "Done: {} inserted, {} updated",
        summary.inserted, summary.updated
    );

    Ok(())
}
