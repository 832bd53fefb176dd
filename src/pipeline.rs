//! End-to-end report run: ingest, clean, aggregate, extract, present.

use chrono::NaiveDateTime;
use serde::Serialize;
use tracing::info;

use crate::aggregate::{merge_monthly, monthly_aggregates, AggregatedOrder, MonthlyAggregate};
use crate::charts::{build_charts, ChartBundle};
use crate::cleaning::{clean_closed_orders, clean_open_orders};
use crate::config::{DashboardConfig, ReportConfig};
use crate::error::{PipelineResult, RowError, RowErrors};
use crate::ingest::load_feeds;
use crate::metrics::{extract, KpiBundle};
use crate::models::{ClosedOrderRecord, OpenOrder, OpenOrderRecord};

/// Everything one dashboard render needs.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardReport {
    pub kpis: KpiBundle,
    pub monthly: Vec<MonthlyAggregate>,
    pub charts: ChartBundle,
    pub closed_orders: usize,
    pub open_orders: usize,
    pub row_errors: Vec<RowError>,
}

/// Cleaned and aggregated tables, before KPI extraction.
#[derive(Debug, Clone)]
pub struct PreparedTables {
    pub closed: Vec<AggregatedOrder>,
    pub monthly: Vec<MonthlyAggregate>,
    pub open: Vec<OpenOrder>,
    pub row_errors: RowErrors,
}

/// Clean both feeds and attach the monthly aggregates.
pub fn prepare(
    closed: Vec<ClosedOrderRecord>,
    open: Vec<OpenOrderRecord>,
    config: &ReportConfig,
) -> PreparedTables {
    let mut row_errors = RowErrors::default();
    let raw_closed = closed.len();
    let raw_open = open.len();

    let cleaned = clean_closed_orders(closed, &mut row_errors);
    let open = clean_open_orders(open, &config.excluded_shop, &mut row_errors);
    info!(
        "Cleaned closed orders {} -> {}, open orders {} -> {}",
        raw_closed,
        cleaned.len(),
        raw_open,
        open.len()
    );

    let monthly = monthly_aggregates(&cleaned);
    let closed = merge_monthly(cleaned, &monthly);

    PreparedTables {
        closed,
        monthly,
        open,
        row_errors,
    }
}

/// Compute the report from raw records. Pure apart from logging.
pub fn build_report(
    closed: Vec<ClosedOrderRecord>,
    open: Vec<OpenOrderRecord>,
    config: &ReportConfig,
    reference: NaiveDateTime,
) -> DashboardReport {
    let tables = prepare(closed, open, config);
    tables.row_errors.log();

    let kpis = extract(&tables.closed, &tables.open, config, reference);
    let charts = build_charts(&kpis, &tables.monthly);

    DashboardReport {
        kpis,
        charts,
        closed_orders: tables.closed.len(),
        open_orders: tables.open.len(),
        monthly: tables.monthly,
        row_errors: tables.row_errors.into_vec(),
    }
}

/// Reference time for a run: the configured date at midnight, else `now`.
pub fn reference_time(config: &ReportConfig, now: NaiveDateTime) -> NaiveDateTime {
    config
        .reference_date
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .unwrap_or(now)
}

/// Load the configured feeds and build the report.
pub fn run(config: &DashboardConfig, now: NaiveDateTime) -> PipelineResult<DashboardReport> {
    let (closed, open) = load_feeds(&config.feeds.closed_orders, &config.feeds.open_orders)?;
    Ok(build_report(closed, open, &config.report, reference_time(&config.report, now)))
}
