//! KPI extraction over the cleaned tables.
//!
//! Every time window is relative to the reference time passed in by the
//! caller.

use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::aggregate::AggregatedOrder;
use crate::config::ReportConfig;
use crate::models::{month_start, OpenOrder, StatusGroup};

/// A mean that may have nothing to average.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(into = "Option<f64>")]
pub enum Mean {
    Value(f64),
    NoData,
}

impl From<Mean> for Option<f64> {
    fn from(mean: Mean) -> Self {
        mean.value()
    }
}

impl Mean {
    /// Mean of the present values; `NoData` when there are none.
    pub fn of<I: IntoIterator<Item = Option<f64>>>(values: I) -> Self {
        let (sum, count) = values
            .into_iter()
            .flatten()
            .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
        if count == 0 {
            Mean::NoData
        } else {
            Mean::Value(sum / count as f64)
        }
    }

    pub fn value(self) -> Option<f64> {
        match self {
            Mean::Value(v) => Some(v),
            Mean::NoData => None,
        }
    }

    pub fn is_no_data(self) -> bool {
        matches!(self, Mean::NoData)
    }
}

/// Open orders per reporting bucket.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StatusCounts {
    pub running: usize,
    pub open: usize,
    pub open_transfer_to_shop: usize,
    pub paused: usize,
    pub paused_other: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusCount {
    pub status: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShopMonthCount {
    pub shop: String,
    pub year_month: String,
    pub count: usize,
}

/// Scalars and breakdowns for one dashboard render.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KpiBundle {
    pub reference: NaiveDateTime,
    pub status_counts: StatusCounts,
    pub mean_paused_shop_tat: Mean,
    pub historical_ack_to_close_tat: Mean,
    pub last_month_ack_to_close_tat: Mean,
    pub current_month_ack_to_close_tat: Mean,
    pub status_distribution: Vec<StatusCount>,
    pub releases_by_shop: Vec<ShopMonthCount>,
}

pub fn status_counts(open: &[OpenOrder]) -> StatusCounts {
    let mut counts = StatusCounts::default();
    for order in open {
        match order.status.group() {
            Some(StatusGroup::Running) => counts.running += 1,
            Some(StatusGroup::Open) => counts.open += 1,
            Some(StatusGroup::OpenTransferToShop) => counts.open_transfer_to_shop += 1,
            Some(StatusGroup::Paused) => counts.paused += 1,
            Some(StatusGroup::PausedOther) => counts.paused_other += 1,
            None => {}
        }
    }
    counts
}

pub fn mean_paused_shop_tat(open: &[OpenOrder]) -> Mean {
    Mean::of(open.iter().map(|o| o.paused_shop_tat))
}

/// Mean ack-to-close TAT over orders whose date satisfies `window`.
pub fn mean_ack_to_close_where<F>(orders: &[AggregatedOrder], window: F) -> Mean
where
    F: Fn(NaiveDate) -> bool,
{
    Mean::of(
        orders
            .iter()
            .filter(|o| o.order.order_date().is_some_and(&window))
            .map(|o| o.order.ack_to_close_tat),
    )
}

/// First day of the month before the one containing `date`.
pub fn previous_month_start(date: NaiveDate) -> NaiveDate {
    month_start(month_start(date) - Duration::days(1))
}

/// Order count per status, for orders dated after `cutoff`. Largest first.
pub fn status_distribution(open: &[OpenOrder], cutoff: NaiveDate) -> Vec<StatusCount> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for order in open.iter().filter(|o| o.order_date.is_some_and(|d| d > cutoff)) {
        *counts.entry(order.status.label()).or_insert(0) += 1;
    }

    let mut distribution: Vec<StatusCount> = counts
        .into_iter()
        .map(|(status, count)| StatusCount {
            status: status.to_string(),
            count,
        })
        .collect();
    distribution.sort_by(|a, b| b.count.cmp(&a.count));
    distribution
}

/// Closed orders per shop and month, for orders dated after `cutoff`.
/// Sorted by shop, then month.
pub fn releases_by_shop(orders: &[AggregatedOrder], cutoff: NaiveDate) -> Vec<ShopMonthCount> {
    let mut counts: BTreeMap<(&str, &str), usize> = BTreeMap::new();
    for aggregated in orders {
        let order = &aggregated.order;
        let Some(calendar) = order.calendar.as_ref() else {
            continue;
        };
        if calendar.date <= cutoff {
            continue;
        }
        *counts.entry((order.shop(), calendar.year_month.as_str())).or_insert(0) += 1;
    }

    counts
        .into_iter()
        .map(|((shop, year_month), count)| ShopMonthCount {
            shop: shop.to_string(),
            year_month: year_month.to_string(),
            count,
        })
        .collect()
}

/// Compute every KPI for one render.
pub fn extract(
    closed: &[AggregatedOrder],
    open: &[OpenOrder],
    config: &ReportConfig,
    reference: NaiveDateTime,
) -> KpiBundle {
    let current_month = month_start(reference.date());
    let last_month = previous_month_start(reference.date());
    let historical_cutoff = config.historical_cutoff;

    KpiBundle {
        reference,
        status_counts: status_counts(open),
        mean_paused_shop_tat: mean_paused_shop_tat(open),
        historical_ack_to_close_tat: mean_ack_to_close_where(closed, |d| d > historical_cutoff),
        last_month_ack_to_close_tat: mean_ack_to_close_where(closed, |d| month_start(d) == last_month),
        current_month_ack_to_close_tat: mean_ack_to_close_where(closed, |d| {
            month_start(d) == current_month
        }),
        status_distribution: status_distribution(open, config.trend_cutoff),
        releases_by_shop: releases_by_shop(closed, config.trend_cutoff),
    }
}
