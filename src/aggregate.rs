//! Monthly TAT aggregation and merge-back.

use chrono::NaiveDate;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

use crate::models::ClosedOrder;

/// Mean TAT figures for one calendar month of closed orders.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyAggregate {
    /// First day of the month.
    pub month: NaiveDate,
    /// `YYYY-MM`
    pub year_month: String,
    pub orders: usize,
    pub mean_tat: Option<f64>,
    pub mean_ack_to_close_tat: Option<f64>,
    pub mean_logistics_tat: Option<f64>,
    /// Change of the ack-to-close mean against the previous month, as a
    /// percentage of this month's mean. Zero for the first month.
    pub ack_to_close_pct_change: Option<f64>,
}

/// A closed order with its month's aggregate attached.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregatedOrder {
    pub order: ClosedOrder,
    pub monthly: Option<MonthlyAggregate>,
}

#[derive(Default)]
struct MeanAcc {
    sum: f64,
    count: usize,
}

impl MeanAcc {
    fn add(&mut self, value: Option<f64>) {
        if let Some(v) = value {
            self.sum += v;
            self.count += 1;
        }
    }

    fn mean(&self) -> Option<f64> {
        if self.count == 0 {
            None
        } else {
            Some(self.sum / self.count as f64)
        }
    }
}

#[derive(Default)]
struct MonthAcc {
    orders: usize,
    tat: MeanAcc,
    ack_to_close: MeanAcc,
    logistics: MeanAcc,
}

/// Percent change of `current` against `previous`, divided by `current`.
pub fn pct_change(previous: Option<f64>, current: Option<f64>) -> Option<f64> {
    match (previous, current) {
        (Some(prev), Some(cur)) if cur != 0.0 => Some((cur - prev) / cur * 100.0),
        _ => None,
    }
}

/// Group orders by calendar month of their order date and compute the
/// monthly means, oldest month first. Orders without a parsed date are not
/// counted.
pub fn monthly_aggregates(orders: &[ClosedOrder]) -> Vec<MonthlyAggregate> {
    let mut months: BTreeMap<NaiveDate, MonthAcc> = BTreeMap::new();
    for order in orders {
        let Some(calendar) = order.calendar.as_ref() else {
            continue;
        };
        let acc = months.entry(calendar.month_start()).or_default();
        acc.orders += 1;
        acc.tat.add(order.tat);
        acc.ack_to_close.add(order.ack_to_close_tat);
        acc.logistics.add(order.logistics_tat);
    }

    let mut previous: Option<Option<f64>> = None;
    months
        .into_iter()
        .map(|(month, acc)| {
            let mean_ack = acc.ack_to_close.mean();
            let ack_to_close_pct_change = match previous {
                None => Some(0.0),
                Some(prev) => pct_change(prev, mean_ack),
            };
            previous = Some(mean_ack);

            MonthlyAggregate {
                year_month: month.format("%Y-%m").to_string(),
                month,
                orders: acc.orders,
                mean_tat: acc.tat.mean(),
                mean_ack_to_close_tat: mean_ack,
                mean_logistics_tat: acc.logistics.mean(),
                ack_to_close_pct_change,
            }
        })
        .collect()
}

/// Left-join monthly aggregates onto orders by `YYYY-MM`. Every order is
/// kept, with or without a matching month.
pub fn merge_monthly(orders: Vec<ClosedOrder>, monthly: &[MonthlyAggregate]) -> Vec<AggregatedOrder> {
    let by_key: HashMap<&str, &MonthlyAggregate> =
        monthly.iter().map(|m| (m.year_month.as_str(), m)).collect();

    orders
        .into_iter()
        .map(|order| {
            let monthly = order
                .year_month()
                .and_then(|key| by_key.get(key))
                .map(|m| (*m).clone());
            AggregatedOrder { order, monthly }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ClosedOrderRecord, OrderCalendar};

    fn order(project: &str, date: Option<(i32, u32, u32)>, tat: f64, ack: f64) -> ClosedOrder {
        ClosedOrder {
            record: ClosedOrderRecord {
                project_no: project.to_string(),
                ..Default::default()
            },
            tat: Some(tat),
            ack_to_close_tat: Some(ack),
            logistics_tat: Some(tat - ack),
            calendar: date
                .and_then(|(y, m, d)| NaiveDate::from_ymd_opt(y, m, d))
                .map(OrderCalendar::from_date),
        }
    }

    fn two_months() -> Vec<ClosedOrder> {
        vec![
            order("P3", Some((2022, 2, 3)), 20.0, 12.0),
            order("P1", Some((2022, 1, 5)), 12.0, 8.0),
            order("P2", Some((2022, 1, 20)), 14.0, 12.0),
            order("P4", Some((2022, 2, 25)), 20.0, 18.0),
        ]
    }

    #[test]
    fn test_monthly_means_and_pct_change() {
        let monthly = monthly_aggregates(&two_months());
        assert_eq!(monthly.len(), 2);

        assert_eq!(monthly[0].year_month, "2022-01");
        assert_eq!(monthly[0].orders, 2);
        assert_eq!(monthly[0].mean_tat, Some(13.0));
        assert_eq!(monthly[0].mean_ack_to_close_tat, Some(10.0));
        assert_eq!(monthly[0].mean_logistics_tat, Some(3.0));
        assert_eq!(monthly[0].ack_to_close_pct_change, Some(0.0));

        assert_eq!(monthly[1].year_month, "2022-02");
        assert_eq!(monthly[1].mean_ack_to_close_tat, Some(15.0));
        let change = monthly[1].ack_to_close_pct_change.unwrap();
        assert!((change - 33.333_333).abs() < 1e-4, "got {}", change);
    }

    #[test]
    fn test_months_are_chronological_across_years() {
        let orders = vec![
            order("P1", Some((2023, 1, 5)), 5.0, 4.0),
            order("P2", Some((2022, 12, 5)), 5.0, 2.0),
            order("P3", Some((2022, 1, 5)), 5.0, 1.0),
        ];
        let keys: Vec<String> = monthly_aggregates(&orders).into_iter().map(|m| m.year_month).collect();
        assert_eq!(keys, vec!["2022-01", "2022-12", "2023-01"]);
    }

    #[test]
    fn test_aggregation_is_deterministic() {
        let orders = two_months();
        let first = serde_json::to_string(&monthly_aggregates(&orders)).unwrap();
        let second = serde_json::to_string(&monthly_aggregates(&orders)).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_pct_change_with_zero_current_mean_is_undefined() {
        assert_eq!(pct_change(Some(4.0), Some(0.0)), None);
        assert_eq!(pct_change(None, Some(2.0)), None);
        assert_eq!(pct_change(Some(1.0), Some(2.0)), Some(50.0));
    }

    #[test]
    fn test_merge_is_left_join() {
        let mut orders = two_months();
        orders.push(order("P5", None, 3.0, 1.0));
        let monthly = monthly_aggregates(&orders);
        let merged = merge_monthly(orders, &monthly);

        assert_eq!(merged.len(), 5);
        assert_eq!(merged[0].order.project_no(), "P3");
        assert_eq!(merged[0].monthly.as_ref().map(|m| m.year_month.as_str()), Some("2022-02"));
        assert_eq!(merged[1].monthly.as_ref().and_then(|m| m.mean_ack_to_close_tat), Some(10.0));
        assert!(merged[4].monthly.is_none());
    }
}
