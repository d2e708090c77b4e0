//! Runtime configuration
//!
//! Values come from environment variables with defaults that match the
//! shop's historical rates.

use std::path::PathBuf;

use crate::costing::CostRates;
use crate::tools::tfda::TFDA_OPEN_DATA_URL;

pub const DEFAULT_ELECTRICITY_COST_PER_KWH: f64 = 3.0;
pub const DEFAULT_LABOR_COST_PER_HOUR: f64 = 200.0;

/// Service configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub database_path: PathBuf,
    pub label_dir: PathBuf,
    pub rates: CostRates,
    /// Source of the TFDA food composition import
    pub tfda_url: String,
}

impl Config {
    /// Build the configuration from `BAKECOST_*` environment variables
    pub fn from_env() -> Self {
        let data_dir = default_data_dir();

        let database_path = std::env::var("BAKECOST_DATABASE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| data_dir.join("bakecost.db"));

        let label_dir = std::env::var("BAKECOST_LABEL_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| data_dir.join("labels"));

        let rates = CostRates {
            electricity_cost_per_kwh: env_f64(
                "BAKECOST_ELECTRICITY_COST_PER_KWH",
                DEFAULT_ELECTRICITY_COST_PER_KWH,
            ),
            labor_cost_per_hour: env_f64("BAKECOST_LABOR_COST_PER_HOUR", DEFAULT_LABOR_COST_PER_HOUR),
        };

        let tfda_url =
            std::env::var("BAKECOST_TFDA_URL").unwrap_or_else(|_| TFDA_OPEN_DATA_URL.to_string());

        Self {
            database_path,
            label_dir,
            rates,
            tfda_url,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = PathBuf::from("data");
        Self {
            database_path: data_dir.join("bakecost.db"),
            label_dir: data_dir.join("labels"),
            rates: CostRates::default(),
            tfda_url: TFDA_OPEN_DATA_URL.to_string(),
        }
    }
}

/// `data/` next to the project root when running from target/{debug,release}
fn default_data_dir() -> PathBuf {
    let mut path = std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(|p| p.to_path_buf()))
        .unwrap_or_else(|| PathBuf::from("."));

    if path.ends_with("release") || path.ends_with("debug") {
        if let Some(grandparent) = path.parent().and_then(|p| p.parent()) {
            path = grandparent.to_path_buf();
        }
    }

    path.push("data");
    path
}

fn env_f64(key: &str, default: f64) -> f64 {
    match std::env::var(key) {
        Ok(raw) => match raw.trim().parse::<f64>() {
            Ok(v) if v.is_finite() && v >= 0.0 => v,
            _ => {
                tracing::warn!(key, value = %raw, "ignoring invalid rate, using default {}", default);
                default
            }
        },
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_rates() {
        let config = Config::default();
        assert_eq!(config.rates.electricity_cost_per_kwh, 3.0);
        assert_eq!(config.rates.labor_cost_per_hour, 200.0);
        assert!(config.database_path.ends_with("bakecost.db"));
        assert!(config.tfda_url.contains("InfoId=20"));
    }

    #[test]
    fn test_env_f64_falls_back_on_garbage() {
        assert_eq!(env_f64("BAKECOST_TEST_UNSET_RATE_KEY", 7.5), 7.5);
    }
}
