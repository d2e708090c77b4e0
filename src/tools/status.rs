//! Status Tool
//!
//! Runtime status of the bakecost service: build, database, cost rates and
//! process figures.

use serde::Serialize;
use std::path::PathBuf;
use std::time::Instant;
use sysinfo::{Pid, ProcessesToUpdate, System};

use crate::build_info::BuildInfo;
use crate::config::Config;
use crate::costing::CostRates;
use crate::db::{Database, DbResult};

/// Row counts of the main tables
#[derive(Debug, Clone, Default, Serialize)]
pub struct RecordCounts {
    pub ingredients: i64,
    pub ingredient_prices: i64,
    pub recipes: i64,
    pub products: i64,
}

impl RecordCounts {
    fn load(db: &Database) -> DbResult<Self> {
        db.with_conn(|conn| {
            let count = |table: &str| -> rusqlite::Result<i64> {
                conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| row.get(0))
            };
            Ok(Self {
                ingredients: count("ingredients")?,
                ingredient_prices: count("ingredient_prices")?,
                recipes: count("recipes")?,
                products: count("products")?,
            })
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BakecostStatus {
    pub build_number: u64,
    pub build_timestamp: &'static str,
    pub version: &'static str,

    pub database_path: String,
    pub database_size_bytes: Option<u64>,
    /// None when the database could not be queried
    pub records: Option<RecordCounts>,

    pub label_dir: String,
    pub rates: CostRates,

    pub uptime_seconds: u64,
    pub process_id: u32,
    pub memory_usage_bytes: u64,
}

/// Collects runtime information for the status tool
pub struct StatusTracker {
    start_time: Instant,
    database_path: PathBuf,
    label_dir: PathBuf,
    rates: CostRates,
}

impl StatusTracker {
    pub fn new(config: &Config) -> Self {
        Self {
            start_time: Instant::now(),
            database_path: config.database_path.clone(),
            label_dir: config.label_dir.clone(),
            rates: config.rates,
        }
    }

    pub fn get_status(&self, db: &Database) -> BakecostStatus {
        let build_info = BuildInfo::current();

        let database_size_bytes = std::fs::metadata(&self.database_path)
            .ok()
            .map(|m| m.len());

        let records = match RecordCounts::load(db) {
            Ok(counts) => Some(counts),
            Err(e) => {
                tracing::warn!(error = %e, "status: failed to count records");
                None
            }
        };

        let pid = std::process::id();
        let mut sys = System::new();
        sys.refresh_processes(ProcessesToUpdate::Some(&[Pid::from_u32(pid)]));

        let memory_usage_bytes = sys
            .process(Pid::from_u32(pid))
            .map(|p| p.memory())
            .unwrap_or(0);

        BakecostStatus {
            build_number: build_info.build_number,
            build_timestamp: build_info.build_timestamp,
            version: build_info.version,
            database_path: self.database_path.display().to_string(),
            database_size_bytes,
            records,
            label_dir: self.label_dir.display().to_string(),
            rates: self.rates,
            uptime_seconds: self.start_time.elapsed().as_secs(),
            process_id: pid,
            memory_usage_bytes,
        }
    }
}
