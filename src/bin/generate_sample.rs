//! Sample feed generator
//!
//! Writes synthetic closed-orders and open-orders CSV feeds that exercise
//! every cleaning rule: duplicate project rows, transfer orders, ack-to-close
//! values above the total TAT, unusable TAT cells and excluded-shop orders.
//!
//! Usage:
//!   cargo run --release --bin generate_sample -- [OPTIONS]
//!
//! Options:
//!   --projects <N>     Closed projects to generate (default: 400)
//!   --open <N>         Open orders to generate (default: 120)
//!   --months <N>       Months of history ending at --end (default: 18)
//!   --end <DATE>       Last order date (default: today)
//!   --seed <N>         Random seed for reproducibility (optional)
//!   --out-dir <PATH>   Output directory (default: data)

use anyhow::Result;
use chrono::{Duration, Local, NaiveDate};
use clap::Parser;
use csv::WriterBuilder;
use rand::prelude::*;
use rand::rngs::StdRng;
use serde::Serialize;
use std::fs;
use std::path::PathBuf;
use tracing::info;

/// Synthetic CM feed generator
#[derive(Parser, Debug)]
#[command(name = "generate_sample")]
#[command(about = "Generate synthetic closed/open CM order feeds")]
struct Args {
    /// Closed projects to generate
    #[arg(long, default_value = "400")]
    projects: usize,

    /// Open orders to generate
    #[arg(long, default_value = "120")]
    open: usize,

    /// Months of history
    #[arg(long, default_value = "18")]
    months: i64,

    /// Last order date (defaults to today)
    #[arg(long)]
    end: Option<NaiveDate>,

    /// Random seed for reproducibility
    #[arg(long)]
    seed: Option<u64>,

    /// Output directory
    #[arg(long, default_value = "data")]
    out_dir: PathBuf,

    /// Shop whose open orders the report excludes
    #[arg(long, default_value = "TOOL MAINTENANCE")]
    excluded_shop: String,
}

const SHOPS: [&str; 2] = ["LAB NORTE", "LAB SUR"];

const INSTRUMENTS: [(&str, &str); 6] = [
    ("PN-CAL-150", "Digital caliper 150 mm"),
    ("PN-MIC-025", "Outside micrometer 0-25 mm"),
    ("PN-TQW-340", "Torque wrench 340 Nm"),
    ("PN-PGA-100", "Pressure gauge 0-100 bar"),
    ("PN-GBS-087", "Gauge block set 87 pcs"),
    ("PN-DMM-087", "Digital multimeter"),
];

const STATUSES: [(&str, u32); 7] = [
    ("RUNNING", 30),
    ("OPEN", 20),
    ("OPEN-TRANSFER-TO-SHOP", 8),
    ("PAUSED - NO MANPOWER", 10),
    ("PAUSED - SENT TO EXTERNAL REPAIR", 8),
    ("PAUSED - AWAITING PHYSICAL DESTRUCTION", 4),
    ("PAUSED - OTHER", 6),
];

#[derive(Debug, Serialize)]
struct ClosedRow {
    #[serde(rename = "Unnamed: 0")]
    index: usize,
    #[serde(rename = "PROJECT_NO")]
    project_no: String,
    #[serde(rename = "ORDER_NO")]
    order_no: String,
    #[serde(rename = "SHOP")]
    shop: String,
    #[serde(rename = "PART_NO")]
    part_no: String,
    #[serde(rename = "ORDER_TYPE")]
    order_type: String,
    #[serde(rename = "ORDER_DATE")]
    order_date: String,
    #[serde(rename = "ACK_DATE")]
    ack_date: String,
    #[serde(rename = "CLOSING_DATE")]
    closing_date: String,
    #[serde(rename = "STATE")]
    state: String,
    #[serde(rename = "REPAIR_FLAG")]
    repair_flag: String,
    #[serde(rename = "QTY")]
    quantity: u32,
    #[serde(rename = "DESCRIPTION")]
    description: String,
    #[serde(rename = "CONDITION")]
    condition: String,
    #[serde(rename = "TAT")]
    tat: String,
    #[serde(rename = "ACK_TO_CLOSE_TAT")]
    ack_to_close_tat: String,
    #[serde(rename = "_merge")]
    merge: String,
}

#[derive(Debug, Serialize)]
struct OpenRow {
    #[serde(rename = "ORDER_NO")]
    order_no: String,
    #[serde(rename = "SHOP")]
    shop: String,
    #[serde(rename = "PART_NO")]
    part_no: String,
    #[serde(rename = "DESCRIPTION")]
    description: String,
    #[serde(rename = "STATUS")]
    status: String,
    #[serde(rename = "ORDER_DATE")]
    order_date: String,
    #[serde(rename = "PAUSED_SHOP_TAT")]
    paused_shop_tat: String,
    #[serde(rename = "STEPS")]
    steps: u32,
}

fn pick_status(rng: &mut StdRng) -> &'static str {
    let total: u32 = STATUSES.iter().map(|(_, w)| w).sum();
    let mut roll = rng.gen_range(0..total);
    for (status, weight) in STATUSES {
        if roll < weight {
            return status;
        }
        roll -= weight;
    }
    "RUNNING"
}

fn generate_closed(args: &Args, start: NaiveDate, span_days: i64, rng: &mut StdRng) -> Vec<ClosedRow> {
    let mut rows = Vec::new();
    for i in 0..args.projects {
        let shop = SHOPS[rng.gen_range(0..SHOPS.len())];
        let (part_no, description) = INSTRUMENTS[rng.gen_range(0..INSTRUMENTS.len())];
        let order_date = start + Duration::days(rng.gen_range(0..=span_days));
        let ack_delay = rng.gen_range(0..5);
        let ack_to_close: i64 = rng.gen_range(3..40);
        let tat = ack_delay + ack_to_close + rng.gen_range(0..8);

        let transfer = rng.gen_bool(0.04);
        let order_no = if transfer {
            format!("ORD-TRF-{:05}", i)
        } else {
            format!("ORD-{:05}", i)
        };

        let mut row = ClosedRow {
            index: rows.len(),
            project_no: format!("P{:05}", i),
            order_no,
            shop: shop.to_string(),
            part_no: part_no.to_string(),
            order_type: "CM".to_string(),
            order_date: order_date.to_string(),
            ack_date: (order_date + Duration::days(ack_delay)).to_string(),
            closing_date: (order_date + Duration::days(tat)).to_string(),
            state: "CLOSED".to_string(),
            repair_flag: (if rng.gen_bool(0.7) { "Y" } else { "N" }).to_string(),
            quantity: 1,
            description: description.to_string(),
            condition: (if rng.gen_bool(0.9) { "SERVICEABLE" } else { "SCRAP" }).to_string(),
            tat: tat.to_string(),
            ack_to_close_tat: ack_to_close.to_string(),
            merge: "both".to_string(),
        };

        // Upstream inconsistency: ack-to-close larger than the total.
        if rng.gen_bool(0.05) {
            row.ack_to_close_tat = (tat + rng.gen_range(1..10)).to_string();
        }
        // Cells the report cannot use.
        if rng.gen_bool(0.02) {
            row.tat = "N/A".to_string();
        }

        // Pre-acknowledgment row emitted before the final one.
        if rng.gen_bool(0.25) {
            rows.push(ClosedRow {
                index: rows.len(),
                project_no: row.project_no.clone(),
                order_no: row.order_no.clone(),
                shop: row.shop.clone(),
                part_no: row.part_no.clone(),
                order_type: row.order_type.clone(),
                order_date: row.order_date.clone(),
                ack_date: String::new(),
                closing_date: String::new(),
                state: "ACK PENDING".to_string(),
                repair_flag: row.repair_flag.clone(),
                quantity: row.quantity,
                description: row.description.clone(),
                condition: row.condition.clone(),
                tat: row.tat.clone(),
                ack_to_close_tat: (tat * 2).to_string(),
                merge: "left_only".to_string(),
            });
            row.index = rows.len();
        }
        rows.push(row);
    }
    rows
}

fn generate_open(args: &Args, start: NaiveDate, span_days: i64, rng: &mut StdRng) -> Vec<OpenRow> {
    (0..args.open)
        .map(|i| {
            let shop = if rng.gen_bool(0.1) {
                args.excluded_shop.as_str()
            } else {
                SHOPS[rng.gen_range(0..SHOPS.len())]
            };
            let (part_no, description) = INSTRUMENTS[rng.gen_range(0..INSTRUMENTS.len())];
            let status = pick_status(rng);
            let paused_shop_tat = if status.starts_with("PAUSED") {
                rng.gen_range(1..30)
            } else {
                0
            };
            OpenRow {
                order_no: format!("OO-{:05}", i),
                shop: shop.to_string(),
                part_no: part_no.to_string(),
                description: description.to_string(),
                status: status.to_string(),
                order_date: (start + Duration::days(rng.gen_range(0..=span_days))).to_string(),
                paused_shop_tat: paused_shop_tat.to_string(),
                steps: rng.gen_range(1..6),
            }
        })
        .collect()
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter("info")
        .init();

    let args = Args::parse();
    let mut rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let end = args.end.unwrap_or_else(|| Local::now().date_naive());
    let span_days = (args.months * 30).max(1);
    let start = end - Duration::days(span_days);

    fs::create_dir_all(&args.out_dir)?;

    let closed = generate_closed(&args, start, span_days, &mut rng);
    let closed_path = args.out_dir.join("closed_orders.csv");
    let mut writer = WriterBuilder::new().from_path(&closed_path)?;
    for row in &closed {
        writer.serialize(row)?;
    }
    writer.flush()?;
    info!("Wrote {} closed-order rows to {:?}", closed.len(), closed_path);

    let open = generate_open(&args, start, span_days, &mut rng);
    let open_path = args.out_dir.join("open_orders.csv");
    let mut writer = WriterBuilder::new().from_path(&open_path)?;
    for row in &open {
        writer.serialize(row)?;
    }
    writer.flush()?;
    info!("Wrote {} open-order rows to {:?}", open.len(), open_path);

    Ok(())
}
