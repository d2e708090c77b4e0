//! bakecost
//!
//! An MCP server for bakery costing.

use rmcp::ServiceExt;
use tokio::io::{stdin, stdout};
use tracing_subscriber::EnvFilter;

use bakecost::build_info;
use bakecost::config::Config;
use bakecost::db::{self, Database};
use bakecost::mcp::BakecostService;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Logs go to stderr; stdout is the MCP transport
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("bakecost=info".parse()?))
        .with_writer(std::io::stderr)
        .init();

    build_info::print_startup_banner();
    eprintln!("Starting MCP server on stdio...");

    let config = Config::from_env();
    eprintln!("Database path: {}", config.database_path.display());
    eprintln!("Label directory: {}", config.label_dir.display());

    if let Some(parent) = config.database_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::create_dir_all(&config.label_dir)?;

    eprintln!("Initializing database...");
    let database = Database::new(&config.database_path)?;
    database.with_conn(|conn| {
        db::migrations::run_migrations(conn)?;
        let version = db::migrations::get_schema_version(conn)?;
        eprintln!("Database schema version: {}", version);
        Ok(())
    })?;

    let service = BakecostService::new(config, database);
    let server = service.serve((stdin(), stdout())).await?;
    server.waiting().await?;

    Ok(())
}
