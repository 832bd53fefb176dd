//! Dashboard configuration.
//!
//! Loaded from an optional TOML file; every field has a default so a missing
//! file or section falls back to the standard lab setup.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    pub feeds: FeedsConfig,
    pub report: ReportConfig,
    pub server: ServerConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedsConfig {
    pub closed_orders: PathBuf,
    pub open_orders: PathBuf,
}

impl Default for FeedsConfig {
    fn default() -> Self {
        Self {
            closed_orders: PathBuf::from("data/closed_orders.csv"),
            open_orders: PathBuf::from("data/open_orders.csv"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Open orders from this shop are out of report scope.
    pub excluded_shop: String,
    /// Historical TAT mean covers orders dated after this day.
    pub historical_cutoff: NaiveDate,
    /// Status distribution and release trend cover orders dated after this day.
    pub trend_cutoff: NaiveDate,
    /// Fixed reference date for the month windows. Uses the clock when unset.
    pub reference_date: Option<NaiveDate>,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            excluded_shop: "TOOL MAINTENANCE".to_string(),
            historical_cutoff: NaiveDate::from_ymd_opt(2021, 12, 1).unwrap_or_default(),
            trend_cutoff: NaiveDate::from_ymd_opt(2021, 1, 1).unwrap_or_default(),
            reference_date: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5000,
        }
    }
}

impl ServerConfig {
    /// Host and port to bind. The host may be a name or an IP literal.
    pub fn bind_addr(&self) -> (&str, u16) {
        (self.host.as_str(), self.port)
    }
}

impl DashboardConfig {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: DashboardConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Read `path` when given, defaults otherwise.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }
}
