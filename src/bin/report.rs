//! Terminal CM report
//!
//! Prints the dashboard KPIs and the monthly TAT table, and optionally
//! exports the cleaned closed-orders table.
//!
//! Run: ./target/release/report [--config PATH] [--now YYYY-MM-DD] [--export PATH]

use anyhow::Result;
use chrono::{Local, NaiveDate};
use clap::Parser;
use cm_dashboard::charts::{indicator_tiles, NO_DATA};
use cm_dashboard::config::DashboardConfig;
use cm_dashboard::export::write_closed_orders;
use cm_dashboard::ingest::load_feeds;
use cm_dashboard::metrics::extract;
use cm_dashboard::pipeline::{prepare, reference_time};
use std::fs::File;
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "report")]
#[command(about = "Print CM turnaround-time KPIs")]
struct Args {
    /// TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Closed-orders CSV feed
    #[arg(long)]
    closed_orders: Option<PathBuf>,

    /// Open-orders CSV feed
    #[arg(long)]
    open_orders: Option<PathBuf>,

    /// Fixed reference date for the month windows
    #[arg(long)]
    now: Option<NaiveDate>,

    /// Write the cleaned closed-orders table to this CSV file
    #[arg(long)]
    export: Option<PathBuf>,

    /// Print every row error instead of the count
    #[arg(long, default_value = "false")]
    show_errors: bool,
}

fn print_section_header(title: &str) {
    println!("\n{}", "=".repeat(60));
    println!("  {}", title);
    println!("{}\n", "=".repeat(60));
}

fn days(value: Option<f64>) -> String {
    value.map(|v| format!("{:.1}", v)).unwrap_or_else(|| NO_DATA.to_string())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(std::env::var("RUST_LOG").unwrap_or_else(|_| "warn".into()))
        .init();

    let args = Args::parse();
    let mut config = DashboardConfig::load(args.config.as_deref())?;
    if let Some(path) = args.closed_orders {
        config.feeds.closed_orders = path;
    }
    if let Some(path) = args.open_orders {
        config.feeds.open_orders = path;
    }
    if args.now.is_some() {
        config.report.reference_date = args.now;
    }

    let (closed, open) = load_feeds(&config.feeds.closed_orders, &config.feeds.open_orders)?;
    let tables = prepare(closed, open, &config.report);
    tables.row_errors.log();
    let reference = reference_time(&config.report, Local::now().naive_local());
    let kpis = extract(&tables.closed, &tables.open, &config.report, reference);

    print_section_header("CM TURNAROUND-TIME REPORT");
    println!("  Reference:      {}", reference.format("%Y-%m-%d %H:%M"));
    println!("  Closed orders:  {:>8}", tables.closed.len());
    println!("  Open orders:    {:>8}", tables.open.len());
    println!("  Row errors:     {:>8}", tables.row_errors.len());

    print_section_header("KPIs");
    for tile in indicator_tiles(&kpis) {
        match tile.delta() {
            Some(delta) => println!("  {:34} {:>12} ({:+.1} d)", tile.label, tile.display_value(), delta),
            None => println!("  {:34} {:>12}", tile.label, tile.display_value()),
        }
    }

    print_section_header("MONTHLY TAT");
    println!(
        "  {:8} {:>7} {:>10} {:>14} {:>10} {:>9}",
        "Month", "Orders", "Mean TAT", "Ack-to-close", "Logistics", "Change"
    );
    println!("  {}", "-".repeat(63));
    for month in &tables.monthly {
        let change = month
            .ack_to_close_pct_change
            .map(|p| format!("{:+.1}%", p))
            .unwrap_or_else(|| NO_DATA.to_string());
        println!(
            "  {:8} {:>7} {:>10} {:>14} {:>10} {:>9}",
            month.year_month,
            month.orders,
            days(month.mean_tat),
            days(month.mean_ack_to_close_tat),
            days(month.mean_logistics_tat),
            change
        );
    }

    print_section_header("OPEN ORDERS BY STATUS");
    if kpis.status_distribution.is_empty() {
        println!("  {}", NO_DATA);
    }
    for status in &kpis.status_distribution {
        println!("  {:42} {:>6}", status.status, status.count);
    }

    if args.show_errors && !tables.row_errors.is_empty() {
        print_section_header("ROW ERRORS");
        for error in tables.row_errors.iter() {
            println!("  {}", error);
        }
    }

    if let Some(path) = args.export {
        let file = File::create(&path)?;
        write_closed_orders(&tables.closed, file)?;
        info!("Exported {} closed orders to {:?}", tables.closed.len(), path);
        println!("\nExported cleaned closed orders to {}", path.display());
    }

    Ok(())
}
