//! Cleaning and derivation steps.
//!
//! Each step consumes a row sequence and returns a new one, so the steps can
//! be tested and composed one at a time. `clean_closed_orders` runs them in
//! order.

use std::collections::HashMap;

use crate::error::{Feed, RowError, RowErrors};
use crate::models::{
    parse_date, parse_number, ClosedOrder, ClosedOrderRecord, OpenOrder, OpenOrderRecord,
    OrderCalendar, OrderStatus,
};

/// Columns produced by the upstream join that carry no report value.
pub const DROPPED_COLUMNS: [&str; 5] = [
    "Unnamed: 0",
    "INDEX",
    "_merge",
    "PROJECT_NO_ACK",
    "ORDER_NO_ACK",
];

/// Open-orders column that is never used.
pub const OPEN_DROPPED_COLUMN: &str = "STEPS";

/// Marker for transfer orders in the order number.
///
/// Transfer orders are TAT outliers and are excluded until upstream cleaning
/// handles them. This is a reporting policy and may be removed.
pub const TRANSFER_MARKER: &str = "TRF";

/// Canonical column order for presenting and exporting cleaned closed orders.
pub const CANONICAL_COLUMNS: [&str; 23] = [
    "PROJECT_NO",
    "ORDER_NO",
    "SHOP",
    "PART_NO",
    "DESCRIPTION",
    "ORDER_TYPE",
    "STATE",
    "CONDITION",
    "REPAIR_FLAG",
    "QTY",
    "ORDER_DATE",
    "YEAR",
    "MONTH",
    "DAY",
    "YEAR_MONTH",
    "ACK_DATE",
    "CLOSING_DATE",
    "TAT",
    "ACK_TO_CLOSE_TAT",
    "LOGISTICS_TAT",
    "RAW_TAT",
    "RAW_ACK_TO_CLOSE_TAT",
    "LINE",
];

fn row_error(record: &ClosedOrderRecord, field: &'static str, value: &str) -> RowError {
    RowError {
        feed: Feed::ClosedOrders,
        line: record.line,
        key: record.project_no.clone(),
        field,
        value: value.to_string(),
    }
}

/// Step 1: keep only the last row per project number, in feed order.
pub fn dedup_by_project(records: Vec<ClosedOrderRecord>) -> Vec<ClosedOrderRecord> {
    let mut last: HashMap<String, usize> = HashMap::new();
    for (i, record) in records.iter().enumerate() {
        last.insert(record.project_no.clone(), i);
    }

    records
        .into_iter()
        .enumerate()
        .filter(|(i, record)| last.get(&record.project_no) == Some(i))
        .map(|(_, record)| record)
        .collect()
}

/// Step 2: drop transfer orders.
pub fn drop_transfer_orders(records: Vec<ClosedOrderRecord>) -> Vec<ClosedOrderRecord> {
    records
        .into_iter()
        .filter(|r| !r.order_no.contains(TRANSFER_MARKER))
        .collect()
}

/// Step 3: parse both TAT fields and clamp ack-to-close TAT to the total.
///
/// Each bad field is recorded and becomes absent. The corrected value needs
/// both fields, so a row with an unusable TAT has no ack-to-close TAT either.
pub fn correct_ack_to_close(
    records: Vec<ClosedOrderRecord>,
    errors: &mut RowErrors,
) -> Vec<ClosedOrder> {
    records
        .into_iter()
        .map(|record| {
            let tat = parse_number(&record.tat);
            let raw_ack = parse_number(&record.ack_to_close_tat);
            if tat.is_none() {
                errors.push(row_error(&record, "TAT", &record.tat));
            }
            if raw_ack.is_none() {
                errors.push(row_error(&record, "ACK_TO_CLOSE_TAT", &record.ack_to_close_tat));
            }

            let ack_to_close_tat = match (tat, raw_ack) {
                (Some(total), Some(ack)) => Some(ack.min(total)),
                _ => None,
            };

            ClosedOrder {
                record,
                tat,
                ack_to_close_tat,
                logistics_tat: None,
                calendar: None,
            }
        })
        .collect()
}

/// Step 4: parse the order date and derive year, month, day and `YYYY-MM`.
pub fn derive_calendar(orders: Vec<ClosedOrder>, errors: &mut RowErrors) -> Vec<ClosedOrder> {
    orders
        .into_iter()
        .map(|order| {
            let calendar = parse_date(&order.record.order_date).map(OrderCalendar::from_date);
            if calendar.is_none() {
                errors.push(row_error(&order.record, "ORDER_DATE", &order.record.order_date));
            }
            ClosedOrder { calendar, ..order }
        })
        .collect()
}

/// Step 5: drop upstream join artifacts.
pub fn drop_join_columns(orders: Vec<ClosedOrder>) -> Vec<ClosedOrder> {
    orders
        .into_iter()
        .map(|mut order| {
            order
                .record
                .extra
                .retain(|column, _| !DROPPED_COLUMNS.contains(&column.as_str()));
            order
        })
        .collect()
}

/// Step 6: logistics TAT is the part of the total not spent between
/// acknowledgment and close.
pub fn derive_logistics_tat(orders: Vec<ClosedOrder>) -> Vec<ClosedOrder> {
    orders
        .into_iter()
        .map(|order| {
            let logistics_tat = match (order.tat, order.ack_to_close_tat) {
                (Some(total), Some(ack)) => Some(total - ack),
                _ => None,
            };
            ClosedOrder { logistics_tat, ..order }
        })
        .collect()
}

/// Step 7: header for the canonical presentation order. Extra columns
/// follow the canonical ones, sorted by name. An extra named like a
/// canonical column is shadowed by it.
pub fn presentation_header(orders: &[ClosedOrder]) -> Vec<String> {
    let mut extras: Vec<String> = orders
        .iter()
        .flat_map(|o| o.record.extra.keys())
        .filter(|column| !CANONICAL_COLUMNS.contains(&column.as_str()))
        .cloned()
        .collect();
    extras.sort();
    extras.dedup();

    CANONICAL_COLUMNS
        .iter()
        .map(|c| c.to_string())
        .chain(extras)
        .collect()
}

fn format_number(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

/// Values of one order in the order given by `header`.
pub fn presentation_row(order: &ClosedOrder, header: &[String]) -> Vec<String> {
    let r = &order.record;
    let cal = order.calendar.as_ref();
    header
        .iter()
        .map(|column| match column.as_str() {
            "PROJECT_NO" => r.project_no.clone(),
            "ORDER_NO" => r.order_no.clone(),
            "SHOP" => r.shop.clone(),
            "PART_NO" => r.part_no.clone(),
            "DESCRIPTION" => r.description.clone(),
            "ORDER_TYPE" => r.order_type.clone(),
            "STATE" => r.state.clone(),
            "CONDITION" => r.condition.clone(),
            "REPAIR_FLAG" => r.repair_flag.clone(),
            "QTY" => r.quantity.clone(),
            "ORDER_DATE" => cal.map(|c| c.date.to_string()).unwrap_or_else(|| r.order_date.clone()),
            "YEAR" => cal.map(|c| c.year.to_string()).unwrap_or_default(),
            "MONTH" => cal.map(|c| c.month.to_string()).unwrap_or_default(),
            "DAY" => cal.map(|c| c.day.to_string()).unwrap_or_default(),
            "YEAR_MONTH" => cal.map(|c| c.year_month.clone()).unwrap_or_default(),
            "ACK_DATE" => r.ack_date.clone(),
            "CLOSING_DATE" => r.closing_date.clone(),
            "TAT" => format_number(order.tat),
            "ACK_TO_CLOSE_TAT" => format_number(order.ack_to_close_tat),
            "LOGISTICS_TAT" => format_number(order.logistics_tat),
            "RAW_TAT" => r.tat.clone(),
            "RAW_ACK_TO_CLOSE_TAT" => r.ack_to_close_tat.clone(),
            "LINE" => r.line.to_string(),
            other => r.extra.get(other).cloned().unwrap_or_default(),
        })
        .collect()
}

/// Run every closed-order step in order.
pub fn clean_closed_orders(records: Vec<ClosedOrderRecord>, errors: &mut RowErrors) -> Vec<ClosedOrder> {
    let records = dedup_by_project(records);
    let records = drop_transfer_orders(records);
    let orders = correct_ack_to_close(records, errors);
    let orders = derive_calendar(orders, errors);
    let orders = drop_join_columns(orders);
    derive_logistics_tat(orders)
}

/// Drop the unused steps column and every order belonging to the excluded
/// shop, then coerce status, date and paused-shop TAT.
pub fn clean_open_orders(
    records: Vec<OpenOrderRecord>,
    excluded_shop: &str,
    errors: &mut RowErrors,
) -> Vec<OpenOrder> {
    records
        .into_iter()
        .filter(|r| r.shop != excluded_shop)
        .map(|mut record| {
            record.extra.remove(OPEN_DROPPED_COLUMN);

            let paused_shop_tat = parse_number(&record.paused_shop_tat);
            if paused_shop_tat.is_none() {
                errors.push(RowError {
                    feed: Feed::OpenOrders,
                    line: record.line,
                    key: record.order_no.clone(),
                    field: "PAUSED_SHOP_TAT",
                    value: record.paused_shop_tat.clone(),
                });
            }
            let order_date = parse_date(&record.order_date);
            if order_date.is_none() {
                errors.push(RowError {
                    feed: Feed::OpenOrders,
                    line: record.line,
                    key: record.order_no.clone(),
                    field: "ORDER_DATE",
                    value: record.order_date.clone(),
                });
            }

            OpenOrder {
                status: OrderStatus::from(record.status.as_str()),
                paused_shop_tat,
                order_date,
                record,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(project: &str, order: &str, date: &str, tat: &str, ack: &str) -> ClosedOrderRecord {
        ClosedOrderRecord {
            line: 2,
            project_no: project.to_string(),
            order_no: order.to_string(),
            shop: "LAB NORTE".to_string(),
            order_date: date.to_string(),
            tat: tat.to_string(),
            ack_to_close_tat: ack.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_dedup_keeps_last_occurrence() {
        let records = vec![
            record("P1", "ORD-1", "2022-01-03", "40", "50"),
            record("P2", "ORD-2", "2022-01-04", "10", "5"),
            record("P1", "ORD-1", "2022-01-03", "40", "30"),
        ];
        let deduped = dedup_by_project(records);
        assert_eq!(deduped.len(), 2);
        assert_eq!(deduped[0].project_no, "P2");
        assert_eq!(deduped[1].project_no, "P1");
        assert_eq!(deduped[1].ack_to_close_tat, "30");
    }

    #[test]
    fn test_dedup_is_idempotent() {
        let records = vec![
            record("P1", "ORD-1", "2022-01-03", "40", "50"),
            record("P1", "ORD-1", "2022-01-03", "40", "30"),
            record("P3", "ORD-3", "2022-02-03", "8", "8"),
            record("P3", "ORD-3", "2022-02-03", "9", "8"),
        ];
        let once = dedup_by_project(records);
        let twice = dedup_by_project(once.clone());
        assert_eq!(once, twice);
    }

    #[test]
    fn test_duplicate_project_scenario() {
        let mut errors = RowErrors::default();
        let cleaned = clean_closed_orders(
            vec![
                record("P1", "ORD-1", "2022-01-03", "40", "50"),
                record("P1", "ORD-1", "2022-01-03", "40", "30"),
            ],
            &mut errors,
        );
        assert_eq!(cleaned.len(), 1);
        assert_eq!(cleaned[0].tat, Some(40.0));
        assert_eq!(cleaned[0].ack_to_close_tat, Some(30.0));
        assert_eq!(cleaned[0].logistics_tat, Some(10.0));
        assert!(errors.is_empty());
    }

    #[test]
    fn test_ack_to_close_clamped_to_total() {
        let mut errors = RowErrors::default();
        let orders = correct_ack_to_close(
            vec![
                record("P1", "ORD-1", "2022-01-03", "40", "50"),
                record("P2", "ORD-2", "2022-01-03", "40", "12.5"),
                record("P3", "ORD-3", "2022-01-03", "7", "7"),
            ],
            &mut errors,
        );
        assert_eq!(orders[0].ack_to_close_tat, Some(40.0));
        assert_eq!(orders[1].ack_to_close_tat, Some(12.5));
        assert_eq!(orders[2].ack_to_close_tat, Some(7.0));
        for order in &orders {
            assert!(order.ack_to_close_tat.unwrap() <= order.tat.unwrap());
        }
    }

    #[test]
    fn test_non_numeric_tat_is_row_error() {
        let mut errors = RowErrors::default();
        let cleaned = clean_closed_orders(
            vec![
                record("P1", "ORD-1", "2022-01-03", "pending", "5"),
                record("P2", "ORD-2", "2022-01-03", "9", ""),
            ],
            &mut errors,
        );
        assert_eq!(cleaned.len(), 2);
        assert_eq!(cleaned[0].tat, None);
        assert_eq!(cleaned[0].ack_to_close_tat, None);
        assert_eq!(cleaned[0].logistics_tat, None);
        assert_eq!(cleaned[1].ack_to_close_tat, None);
        assert_eq!(errors.len(), 2);
        let fields: Vec<&str> = errors.iter().map(|e| e.field).collect();
        assert_eq!(fields, vec!["TAT", "ACK_TO_CLOSE_TAT"]);
        assert_eq!(errors.iter().next().unwrap().key, "P1");
    }

    #[test]
    fn test_transfer_orders_dropped() {
        let mut errors = RowErrors::default();
        let cleaned = clean_closed_orders(
            vec![
                record("P1", "ORD-TRF-001", "2022-01-03", "40", "30"),
                record("P2", "ORD-002", "2022-01-03", "40", "30"),
            ],
            &mut errors,
        );
        assert_eq!(cleaned.len(), 1);
        assert!(cleaned.iter().all(|o| !o.order_no().contains("TRF")));
    }

    #[test]
    fn test_unusable_tat_excluded_from_monthly_mean() {
        let mut errors = RowErrors::default();
        let cleaned = clean_closed_orders(
            vec![
                record("P1", "ORD-1", "2022-01-03", "10", "8"),
                record("P2", "ORD-2", "2022-01-05", "pending", "500"),
            ],
            &mut errors,
        );
        assert_eq!(cleaned[1].ack_to_close_tat, None);
        assert_eq!(errors.len(), 1);

        let monthly = crate::aggregate::monthly_aggregates(&cleaned);
        assert_eq!(monthly[0].orders, 2);
        assert_eq!(monthly[0].mean_ack_to_close_tat, Some(8.0));
    }

    #[test]
    fn test_dropped_transfer_order_reports_no_row_errors() {
        let mut errors = RowErrors::default();
        let cleaned = clean_closed_orders(
            vec![record("P9", "ORD-TRF-009", "not a date", "x", "y")],
            &mut errors,
        );
        assert!(cleaned.is_empty());
        assert!(errors.is_empty());
    }

    #[test]
    fn test_calendar_derivation_and_bad_dates() {
        let mut errors = RowErrors::default();
        let cleaned = clean_closed_orders(
            vec![
                record("P1", "ORD-1", "2022-03-15 08:00:00", "4", "3"),
                record("P2", "ORD-2", "someday", "4", "3"),
            ],
            &mut errors,
        );
        let cal = cleaned[0].calendar.as_ref().unwrap();
        assert_eq!((cal.year, cal.month, cal.day), (2022, 3, 15));
        assert_eq!(cleaned[0].year_month(), Some("2022-03"));
        assert!(cleaned[1].calendar.is_none());
        assert_eq!(errors.len(), 1);
        assert_eq!(errors.iter().next().unwrap().field, "ORDER_DATE");
    }

    #[test]
    fn test_join_columns_dropped() {
        let mut rec = record("P1", "ORD-1", "2022-03-15", "4", "3");
        rec.extra.insert("Unnamed: 0".to_string(), "0".to_string());
        rec.extra.insert("_merge".to_string(), "both".to_string());
        rec.extra.insert("WORK_CENTER".to_string(), "WC1".to_string());
        let mut errors = RowErrors::default();
        let cleaned = clean_closed_orders(vec![rec], &mut errors);
        let keys: Vec<&str> = cleaned[0].record.extra.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["WORK_CENTER"]);
    }

    #[test]
    fn test_presentation_order() {
        let mut rec = record("P1", "ORD-1", "2022-03-15", "4", "3");
        rec.extra.insert("WORK_CENTER".to_string(), "WC1".to_string());
        let mut errors = RowErrors::default();
        let cleaned = clean_closed_orders(vec![rec], &mut errors);
        let header = presentation_header(&cleaned);
        assert_eq!(header[0], "PROJECT_NO");
        assert_eq!(header.last().map(String::as_str), Some("WORK_CENTER"));

        let row = presentation_row(&cleaned[0], &header);
        assert_eq!(row.len(), header.len());
        let value = |name: &str| {
            let i = header.iter().position(|h| h == name).unwrap();
            row[i].clone()
        };
        assert_eq!(value("YEAR_MONTH"), "2022-03");
        assert_eq!(value("LOGISTICS_TAT"), "1");
        assert_eq!(value("WORK_CENTER"), "WC1");
    }

    #[test]
    fn test_extra_named_like_canonical_column_not_repeated() {
        let mut rec = record("P1", "ORD-1", "2022-03-15", "4", "3");
        rec.extra.insert("YEAR".to_string(), "1999".to_string());
        rec.extra.insert("LINE".to_string(), "77".to_string());
        let mut errors = RowErrors::default();
        let cleaned = clean_closed_orders(vec![rec], &mut errors);
        let header = presentation_header(&cleaned);
        assert_eq!(header.len(), CANONICAL_COLUMNS.len());
        assert_eq!(header.iter().filter(|h| *h == "YEAR").count(), 1);

        let row = presentation_row(&cleaned[0], &header);
        let year = header.iter().position(|h| h == "YEAR").unwrap();
        assert_eq!(row[year], "2022");
    }

    #[test]
    fn test_open_orders_cleaning() {
        let open = |shop: &str, status: &str, tat: &str| OpenOrderRecord {
            line: 2,
            order_no: "OO-1".to_string(),
            shop: shop.to_string(),
            status: status.to_string(),
            order_date: "2022-05-01".to_string(),
            paused_shop_tat: tat.to_string(),
            extra: [("STEPS".to_string(), "4".to_string())].into_iter().collect(),
            ..Default::default()
        };
        let mut errors = RowErrors::default();
        let cleaned = clean_open_orders(
            vec![
                open("LAB NORTE", "RUNNING", "3"),
                open("TOOL MAINTENANCE", "OPEN", "2"),
                open("LAB SUR", "PAUSED - OTHER", "x"),
            ],
            "TOOL MAINTENANCE",
            &mut errors,
        );
        assert_eq!(cleaned.len(), 2);
        assert!(cleaned.iter().all(|o| o.record.shop != "TOOL MAINTENANCE"));
        assert!(cleaned.iter().all(|o| !o.record.extra.contains_key("STEPS")));
        assert_eq!(cleaned[0].status, OrderStatus::Running);
        assert_eq!(cleaned[1].paused_shop_tat, None);
        assert_eq!(errors.len(), 1);
    }
}
