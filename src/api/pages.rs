//! Dashboard page handlers.
//!
//! Each handler builds view types from the report and renders an Askama
//! template. Figures are embedded as JSON for the charting library.

use askama::Template;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};

use super::handlers::{AppState, ReportQuery};
use crate::charts::{Figure, IndicatorTile, NO_DATA};
use crate::pipeline::DashboardReport;

const AREA: &str = "Metrología & Laboratorio";

fn render<T: Template>(tmpl: T) -> Html<String> {
    Html(tmpl.render().unwrap_or_else(|e| {
        format!("<pre>Template error: {e}</pre>")
    }))
}

/// Title block shared by every page.
pub struct PageData {
    pub title: String,
    pub area: &'static str,
}

impl PageData {
    fn new(title: &str) -> Self {
        Self {
            title: title.to_string(),
            area: AREA,
        }
    }
}

pub struct TileView {
    pub label: String,
    pub value: String,
    pub no_data: bool,
    pub has_delta: bool,
    pub delta: String,
    pub delta_class: &'static str,
}

impl From<&IndicatorTile> for TileView {
    fn from(tile: &IndicatorTile) -> Self {
        let delta = tile.delta();
        Self {
            label: tile.label.clone(),
            value: tile.display_value(),
            no_data: tile.is_no_data(),
            has_delta: delta.is_some(),
            delta: delta.map(|d| format!("{:+.1} d", d)).unwrap_or_default(),
            // Lower TAT is better.
            delta_class: match delta {
                Some(d) if d > 0.0 => "delta-up",
                Some(d) if d < 0.0 => "delta-down",
                _ => "delta-flat",
            },
        }
    }
}

pub struct MonthRow {
    pub year_month: String,
    pub orders: usize,
    pub mean_tat: String,
    pub mean_ack_to_close_tat: String,
    pub mean_logistics_tat: String,
    pub pct_change: String,
}

fn days(value: Option<f64>) -> String {
    value.map(|v| format!("{:.1}", v)).unwrap_or_else(|| NO_DATA.to_string())
}

/// Serialize a figure for inline `<script>` use.
fn figure_json(figure: &Figure) -> String {
    serde_json::to_string(figure)
        .unwrap_or_else(|_| "{}".to_string())
        .replace("</", "<\\/")
}

// ── Dashboard ───────────────────────────────────────────────────

#[derive(Template)]
#[template(path = "index.html")]
struct IndexTemplate {
    data: PageData,
    reference: String,
    closed_orders: usize,
    open_orders: usize,
    row_errors: usize,
    tiles: Vec<TileView>,
    months: Vec<MonthRow>,
    releases_json: String,
    monthly_tat_json: String,
    status_json: String,
    indicators_json: String,
    status_empty: bool,
}

impl IndexTemplate {
    fn from_report(report: &DashboardReport) -> Self {
        let charts = &report.charts;
        Self {
            data: PageData::new("Main Dashboard"),
            reference: report.kpis.reference.format("%Y-%m-%d %H:%M").to_string(),
            closed_orders: report.closed_orders,
            open_orders: report.open_orders,
            row_errors: report.row_errors.len(),
            tiles: charts.tiles.iter().map(TileView::from).collect(),
            months: report
                .monthly
                .iter()
                .map(|m| MonthRow {
                    year_month: m.year_month.clone(),
                    orders: m.orders,
                    mean_tat: days(m.mean_tat),
                    mean_ack_to_close_tat: days(m.mean_ack_to_close_tat),
                    mean_logistics_tat: days(m.mean_logistics_tat),
                    pct_change: m
                        .ack_to_close_pct_change
                        .map(|p| format!("{:+.1}%", p))
                        .unwrap_or_else(|| NO_DATA.to_string()),
                })
                .collect(),
            releases_json: figure_json(&charts.releases_by_shop),
            monthly_tat_json: figure_json(&charts.monthly_tat),
            status_json: figure_json(&charts.status_distribution),
            indicators_json: figure_json(&charts.indicators),
            status_empty: report.kpis.status_distribution.is_empty(),
        }
    }
}

/// GET / and GET /home
pub async fn index(State(service): State<AppState>, Query(params): Query<ReportQuery>) -> Response {
    match service.report(params.now).await {
        Ok(report) => render(IndexTemplate::from_report(&report)).into_response(),
        Err(e) => {
            tracing::error!("Dashboard render failed: {:#}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                render(ErrorTemplate {
                    data: PageData::new("No se pudo generar el reporte"),
                    message: e.to_string(),
                }),
            )
                .into_response()
        }
    }
}

// ── Errors ──────────────────────────────────────────────────────

#[derive(Template)]
#[template(path = "error.html")]
struct ErrorTemplate {
    data: PageData,
    message: String,
}

#[derive(Template)]
#[template(path = "not_found.html")]
struct NotFoundTemplate {
    data: PageData,
}

/// Fallback for unknown routes.
pub async fn not_found() -> (StatusCode, Html<String>) {
    (
        StatusCode::NOT_FOUND,
        render(NotFoundTemplate {
            data: PageData::new("Ups! Le pifiaste en algo. :("),
        }),
    )
}
