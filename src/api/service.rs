//! Report service shared by the page and JSON handlers.
//!
//! Every call reloads both feeds and recomputes the report; nothing is
//! cached between requests.

use anyhow::Result;
use chrono::{Local, NaiveDate};
use tracing::info;

use crate::config::DashboardConfig;
use crate::pipeline::{self, DashboardReport};

pub struct ReportService {
    config: DashboardConfig,
}

impl ReportService {
    pub fn new(config: DashboardConfig) -> Self {
        Self { config }
    }

    /// Run the pipeline on a blocking thread. `reference_date` overrides the
    /// configured reference date for this call only.
    pub async fn report(&self, reference_date: Option<NaiveDate>) -> Result<DashboardReport> {
        let mut config = self.config.clone();
        if reference_date.is_some() {
            config.report.reference_date = reference_date;
        }
        let now = Local::now().naive_local();

        let report = tokio::task::spawn_blocking(move || pipeline::run(&config, now)).await??;
        info!(
            "Report built: {} closed orders, {} open orders, {} row errors",
            report.closed_orders,
            report.open_orders,
            report.row_errors.len()
        );
        Ok(report)
    }
}
