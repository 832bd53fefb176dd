//! Route tests for the dashboard server.
//!
//! Writes small feeds to a temp directory, builds the router and drives it
//! with `oneshot` requests.

use std::path::Path;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use cm_dashboard::api::{router, ReportService};
use cm_dashboard::config::DashboardConfig;
use tower::ServiceExt;

const CLOSED_CSV: &str = "\
Unnamed: 0,PROJECT_NO,ORDER_NO,SHOP,ORDER_DATE,TAT,ACK_TO_CLOSE_TAT,DESCRIPTION
0,P1,ORD-001,LAB NORTE,2022-01-10,40,50,Caliper
1,P1,ORD-001,LAB NORTE,2022-01-10,40,30,Caliper
2,P2,ORD-TRF-002,LAB SUR,2022-01-15,90,80,Micrometer
3,P3,ORD-003,LAB SUR,2022-02-03,20,10,Torque wrench
4,P4,ORD-004,LAB NORTE,2022-02-20,25,20,Gauge block
";

const OPEN_CSV: &str = "\
ORDER_NO,SHOP,STATUS,PAUSED_SHOP_TAT,ORDER_DATE,STEPS
OO-1,LAB NORTE,RUNNING,0,2022-02-01,2
OO-2,LAB NORTE,RUNNING,0,2022-02-02,1
OO-3,LAB SUR,OPEN,0,2022-02-03,3
OO-4,LAB SUR,PAUSED - OTHER,6,2022-02-04,4
OO-5,TOOL MAINTENANCE,RUNNING,0,2022-02-05,1
";

fn write_feeds(dir: &Path, closed: &str, open: &str) -> DashboardConfig {
    let closed_path = dir.join("closed_orders.csv");
    let open_path = dir.join("open_orders.csv");
    std::fs::write(&closed_path, closed).unwrap();
    std::fs::write(&open_path, open).unwrap();

    let mut config = DashboardConfig::default();
    config.feeds.closed_orders = closed_path;
    config.feeds.open_orders = open_path;
    config
}

fn app(config: DashboardConfig) -> Router {
    router(Arc::new(ReportService::new(config)))
}

async fn get(router: Router, uri: &str) -> (StatusCode, String) {
    let req = Request::builder().uri(uri).body(Body::empty()).unwrap();
    let resp = router.oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    (status, String::from_utf8(bytes.to_vec()).unwrap())
}

#[tokio::test]
async fn health_ok() {
    let dir = tempfile::tempdir().unwrap();
    let router = app(write_feeds(dir.path(), CLOSED_CSV, OPEN_CSV));

    let (status, body) = get(router, "/api/v1/health").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("ok"));
}

#[tokio::test]
async fn report_json_matches_feeds() {
    let dir = tempfile::tempdir().unwrap();
    let router = app(write_feeds(dir.path(), CLOSED_CSV, OPEN_CSV));

    let (status, body) = get(router, "/api/v1/report?now=2022-03-05").await;
    assert_eq!(status, StatusCode::OK);
    let report: serde_json::Value = serde_json::from_str(&body).unwrap();

    assert_eq!(report["closed_orders"], 3);
    assert_eq!(report["open_orders"], 4);

    let counts = &report["kpis"]["status_counts"];
    assert_eq!(counts["running"], 2);
    assert_eq!(counts["open"], 1);
    assert_eq!(counts["paused_other"], 1);
    assert_eq!(counts["paused"], 0);

    assert_eq!(report["monthly"][0]["year_month"], "2022-01");
    assert_eq!(report["monthly"][0]["mean_ack_to_close_tat"], 30.0);
    assert_eq!(report["monthly"][0]["ack_to_close_pct_change"], 0.0);
    assert_eq!(report["monthly"][1]["mean_ack_to_close_tat"], 15.0);

    assert_eq!(report["kpis"]["last_month_ack_to_close_tat"], 15.0);
    assert!(report["kpis"]["current_month_ack_to_close_tat"].is_null());
    assert_eq!(report["kpis"]["mean_paused_shop_tat"], 1.5);
}

#[tokio::test]
async fn dashboard_page_renders_placeholders() {
    let dir = tempfile::tempdir().unwrap();
    let router = app(write_feeds(dir.path(), CLOSED_CSV, OPEN_CSV));

    let (status, body) = get(router, "/?now=2022-03-05").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("Main Dashboard"));
    assert!(body.contains("Current month ack-to-close TAT"));
    assert!(body.contains("no data"));
    assert!(body.contains("chart_releases"));
}

#[tokio::test]
async fn home_alias_renders_dashboard() {
    let dir = tempfile::tempdir().unwrap();
    let router = app(write_feeds(dir.path(), CLOSED_CSV, OPEN_CSV));

    let (status, body) = get(router, "/home").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("Main Dashboard"));
}

#[tokio::test]
async fn unknown_route_is_themed_404() {
    let dir = tempfile::tempdir().unwrap();
    let router = app(write_feeds(dir.path(), CLOSED_CSV, OPEN_CSV));

    let (status, body) = get(router, "/no-such-page").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body.contains("Ups! Le pifiaste en algo."));
}

#[tokio::test]
async fn missing_feed_renders_error_page() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = write_feeds(dir.path(), CLOSED_CSV, OPEN_CSV);
    config.feeds.open_orders = dir.path().join("missing.csv");
    let router = app(config);

    let (status, body) = get(router.clone(), "/").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body.contains("open-orders"));

    let (status, body) = get(router, "/api/v1/report").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body.contains("error"));
}

#[tokio::test]
async fn missing_column_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let closed = "PROJECT_NO,ORDER_NO,SHOP,ORDER_DATE,TAT\nP1,ORD-1,LAB SUR,2022-01-01,4\n";
    let router = app(write_feeds(dir.path(), closed, OPEN_CSV));

    let (status, body) = get(router, "/api/v1/report").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body.contains("ACK_TO_CLOSE_TAT"));
}
