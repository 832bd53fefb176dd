//! JSON API handlers.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::service::ReportService;
use crate::pipeline::DashboardReport;

pub type AppState = Arc<ReportService>;

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct ReportQuery {
    /// Reference date for the month windows, `YYYY-MM-DD`.
    pub now: Option<NaiveDate>,
}

/// GET /api/v1/health
pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({"status": "ok"}))
}

/// GET /api/v1/report
pub async fn get_report(
    State(service): State<AppState>,
    Query(params): Query<ReportQuery>,
) -> Result<Json<DashboardReport>, (StatusCode, Json<ErrorResponse>)> {
    match service.report(params.now).await {
        Ok(report) => Ok(Json(report)),
        Err(e) => {
            tracing::error!("Report failed: {:#}", e);
            Err((StatusCode::INTERNAL_SERVER_ERROR, Json(ErrorResponse { error: e.to_string() })))
        }
    }
}
