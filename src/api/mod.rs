//! HTTP surface for the CM dashboard.
//!
//! | Route | Handler |
//! |---|---|
//! | `/`, `/home` | Dashboard page |
//! | `/api/v1/health` | Health check |
//! | `/api/v1/report` | Full report as JSON |
//!
//! Anything else gets the themed 404 page.

pub mod handlers;
pub mod pages;
pub mod service;

use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

pub use service::ReportService;

pub fn router(service: Arc<ReportService>) -> Router {
    Router::new()
        .route("/", get(pages::index))
        .route("/home", get(pages::index))
        .route("/api/v1/health", get(handlers::health))
        .route("/api/v1/report", get(handlers::get_report))
        .fallback(pages::not_found)
        .with_state(service)
        .layer(TraceLayer::new_for_http())
}
