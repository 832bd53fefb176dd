//! CSV export of the cleaned closed-orders table.

use csv::WriterBuilder;
use std::io::Write;

use crate::aggregate::AggregatedOrder;
use crate::cleaning::{presentation_header, presentation_row};
use crate::models::ClosedOrder;

const MONTHLY_COLUMNS: [&str; 4] = [
    "MONTH_MEAN_TAT",
    "MONTH_MEAN_ACK_TO_CLOSE_TAT",
    "MONTH_MEAN_LOGISTICS_TAT",
    "MONTH_ACK_TO_CLOSE_PCT_CHANGE",
];

fn cell(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

/// Write orders in canonical column order followed by their month's
/// aggregates.
pub fn write_closed_orders<W: Write>(orders: &[AggregatedOrder], writer: W) -> anyhow::Result<()> {
    let plain: Vec<ClosedOrder> = orders.iter().map(|o| o.order.clone()).collect();
    let header = presentation_header(&plain);

    let mut writer = WriterBuilder::new().from_writer(writer);
    writer.write_record(header.iter().map(String::as_str).chain(MONTHLY_COLUMNS))?;

    for aggregated in orders {
        let mut row = presentation_row(&aggregated.order, &header);
        let monthly = aggregated.monthly.as_ref();
        row.push(cell(monthly.and_then(|m| m.mean_tat)));
        row.push(cell(monthly.and_then(|m| m.mean_ack_to_close_tat)));
        row.push(cell(monthly.and_then(|m| m.mean_logistics_tat)));
        row.push(cell(monthly.and_then(|m| m.ack_to_close_pct_change)));
        writer.write_record(&row)?;
    }

    writer.flush()?;
    Ok(())
}
