use chrono::{Datelike, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Raw record from the closed-orders feed.
///
/// Every field is kept as text; numeric and date coercion happens during
/// cleaning so a bad value becomes a row error instead of a load failure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClosedOrderRecord {
    /// 1-based line in the source file, header included.
    pub line: usize,
    pub project_no: String,
    pub order_no: String,
    pub shop: String,
    pub part_no: String,
    pub order_type: String,
    pub order_date: String,
    pub closing_date: String,
    pub state: String,
    pub repair_flag: String,
    pub quantity: String,
    pub description: String,
    pub condition: String,
    pub ack_date: String,
    pub tat: String,
    pub ack_to_close_tat: String,
    /// Columns the report does not interpret, keyed by header.
    pub extra: BTreeMap<String, String>,
}

/// Raw record from the open-orders feed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OpenOrderRecord {
    pub line: usize,
    pub order_no: String,
    pub shop: String,
    pub part_no: String,
    pub description: String,
    pub status: String,
    pub order_date: String,
    pub paused_shop_tat: String,
    pub extra: BTreeMap<String, String>,
}

/// Calendar fields derived from an order date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderCalendar {
    pub date: NaiveDate,
    pub year: i32,
    pub month: u32,
    pub day: u32,
    /// `YYYY-MM`
    pub year_month: String,
}

impl OrderCalendar {
    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            date,
            year: date.year(),
            month: date.month(),
            day: date.day(),
            year_month: format!("{:04}-{:02}", date.year(), date.month()),
        }
    }

    /// First day of the order's calendar month.
    pub fn month_start(&self) -> NaiveDate {
        month_start(self.date)
    }
}

/// A cleaned closed order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClosedOrder {
    pub record: ClosedOrderRecord,
    pub tat: Option<f64>,
    /// Ack-to-close TAT clamped to the total TAT.
    pub ack_to_close_tat: Option<f64>,
    pub logistics_tat: Option<f64>,
    pub calendar: Option<OrderCalendar>,
}

impl ClosedOrder {
    pub fn project_no(&self) -> &str {
        &self.record.project_no
    }

    pub fn order_no(&self) -> &str {
        &self.record.order_no
    }

    pub fn shop(&self) -> &str {
        &self.record.shop
    }

    pub fn order_date(&self) -> Option<NaiveDate> {
        self.calendar.as_ref().map(|c| c.date)
    }

    pub fn year_month(&self) -> Option<&str> {
        self.calendar.as_ref().map(|c| c.year_month.as_str())
    }
}

/// Operational state of an open order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum OrderStatus {
    Open,
    OpenTransferToShop,
    Running,
    PausedNoManpower,
    PausedExternalRepair,
    PausedAwaitingDestruction,
    PausedOther,
    Other(String),
}

impl From<&str> for OrderStatus {
    fn from(s: &str) -> Self {
        match s.trim() {
            "OPEN" => OrderStatus::Open,
            "OPEN-TRANSFER-TO-SHOP" => OrderStatus::OpenTransferToShop,
            "RUNNING" => OrderStatus::Running,
            "PAUSED - NO MANPOWER" => OrderStatus::PausedNoManpower,
            "PAUSED - SENT TO EXTERNAL REPAIR" => OrderStatus::PausedExternalRepair,
            "PAUSED - AWAITING PHYSICAL DESTRUCTION" => OrderStatus::PausedAwaitingDestruction,
            "PAUSED - OTHER" => OrderStatus::PausedOther,
            other => OrderStatus::Other(other.to_string()),
        }
    }
}

impl OrderStatus {
    /// The status as it appears in the feed.
    pub fn label(&self) -> &str {
        match self {
            OrderStatus::Open => "OPEN",
            OrderStatus::OpenTransferToShop => "OPEN-TRANSFER-TO-SHOP",
            OrderStatus::Running => "RUNNING",
            OrderStatus::PausedNoManpower => "PAUSED - NO MANPOWER",
            OrderStatus::PausedExternalRepair => "PAUSED - SENT TO EXTERNAL REPAIR",
            OrderStatus::PausedAwaitingDestruction => "PAUSED - AWAITING PHYSICAL DESTRUCTION",
            OrderStatus::PausedOther => "PAUSED - OTHER",
            OrderStatus::Other(s) => s,
        }
    }

    pub fn group(&self) -> Option<StatusGroup> {
        match self {
            OrderStatus::Open => Some(StatusGroup::Open),
            OrderStatus::OpenTransferToShop => Some(StatusGroup::OpenTransferToShop),
            OrderStatus::Running => Some(StatusGroup::Running),
            OrderStatus::PausedNoManpower
            | OrderStatus::PausedExternalRepair
            | OrderStatus::PausedAwaitingDestruction => Some(StatusGroup::Paused),
            OrderStatus::PausedOther => Some(StatusGroup::PausedOther),
            OrderStatus::Other(_) => None,
        }
    }
}

/// Reporting buckets for open-order statuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StatusGroup {
    Running,
    Open,
    OpenTransferToShop,
    Paused,
    PausedOther,
}

/// A cleaned open order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OpenOrder {
    pub record: OpenOrderRecord,
    pub status: OrderStatus,
    pub paused_shop_tat: Option<f64>,
    pub order_date: Option<NaiveDate>,
}

/// Parse a numeric TAT cell. Empty and non-finite values are absent.
pub fn parse_number(value: &str) -> Option<f64> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    value.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Parse an order date in any of the formats the upstream exports use.
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return Some(date);
    }
    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, format) {
            return Some(dt.date());
        }
    }
    NaiveDate::parse_from_str(value, "%d/%m/%Y").ok()
}

/// First day of the month containing `date`.
pub fn month_start(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}
