//! CM dashboard web server.
//!
//! Usage:
//!   ./target/release/cm_dashboard [options]
//!
//! Options:
//!   --config PATH          TOML configuration file
//!   --host HOST            Address to bind (default: 127.0.0.1)
//!   --port PORT            Port to listen on (default: 5000)
//!   --closed-orders PATH   Closed-orders CSV feed
//!   --open-orders PATH     Open-orders CSV feed
//!   --now YYYY-MM-DD       Fixed reference date for the month windows
//!
//! Routes:
//!   GET /, /home           Dashboard page
//!   GET /api/v1/health     Health check
//!   GET /api/v1/report     Report as JSON (optional ?now=YYYY-MM-DD)

use anyhow::Result;
use chrono::NaiveDate;
use clap::Parser;
use cm_dashboard::api::{self, ReportService};
use cm_dashboard::config::DashboardConfig;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "cm_dashboard")]
#[command(about = "Serve the CM turnaround-time dashboard")]
struct Args {
    /// TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Address to bind
    #[arg(long)]
    host: Option<String>,

    /// Port to listen on
    #[arg(long)]
    port: Option<u16>,

    /// Closed-orders CSV feed
    #[arg(long)]
    closed_orders: Option<PathBuf>,

    /// Open-orders CSV feed
    #[arg(long)]
    open_orders: Option<PathBuf>,

    /// Fixed reference date for the month windows
    #[arg(long)]
    now: Option<NaiveDate>,
}

impl Args {
    fn into_config(self) -> Result<DashboardConfig> {
        let mut config = DashboardConfig::load(self.config.as_deref())?;
        if let Some(host) = self.host {
            config.server.host = host;
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(path) = self.closed_orders {
            config.feeds.closed_orders = path;
        }
        if let Some(path) = self.open_orders {
            config.feeds.open_orders = path;
        }
        if self.now.is_some() {
            config.report.reference_date = self.now;
        }
        Ok(config)
    }
}

fn print_banner(config: &DashboardConfig) {
    println!("============================================================");
    println!("         CM TURNAROUND-TIME DASHBOARD");
    println!("============================================================");
    println!();
    println!("  Listening:      http://{}:{}/", config.server.host, config.server.port);
    println!("  Closed orders:  {}", config.feeds.closed_orders.display());
    println!("  Open orders:    {}", config.feeds.open_orders.display());
    println!("  Excluded shop:  {}", config.report.excluded_shop);
    match config.report.reference_date {
        Some(date) => println!("  Reference date: {}", date),
        None => println!("  Reference date: today"),
    }
    println!();
    println!("============================================================");
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .init();

    let config = Args::parse().into_config()?;
    print_banner(&config);

    let listener = tokio::net::TcpListener::bind(config.server.bind_addr()).await?;
    tracing::info!("Starting dashboard server on {}", listener.local_addr()?);

    let app = api::router(Arc::new(ReportService::new(config)));
    axum::serve(listener, app).await?;

    Ok(())
}
