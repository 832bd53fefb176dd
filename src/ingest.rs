//! Feed ingestion.
//!
//! Reads the closed-orders and open-orders CSV exports into raw records.
//! Header names are matched after trimming; required columns are checked
//! before any row is converted.

use csv::{ReaderBuilder, StringRecord, Trim};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::info;

use crate::error::{Feed, PipelineError, PipelineResult};
use crate::models::{ClosedOrderRecord, OpenOrderRecord};

pub const CLOSED_REQUIRED: [&str; 6] = [
    "PROJECT_NO",
    "ORDER_NO",
    "SHOP",
    "ORDER_DATE",
    "TAT",
    "ACK_TO_CLOSE_TAT",
];

pub const CLOSED_OPTIONAL: [&str; 9] = [
    "PART_NO",
    "ORDER_TYPE",
    "CLOSING_DATE",
    "STATE",
    "REPAIR_FLAG",
    "QTY",
    "DESCRIPTION",
    "CONDITION",
    "ACK_DATE",
];

pub const OPEN_REQUIRED: [&str; 4] = ["SHOP", "STATUS", "PAUSED_SHOP_TAT", "ORDER_DATE"];

pub const OPEN_OPTIONAL: [&str; 3] = ["ORDER_NO", "PART_NO", "DESCRIPTION"];

/// A feed as read from disk: header row plus data rows.
#[derive(Debug)]
pub struct FeedTable {
    pub feed: Feed,
    pub headers: Vec<String>,
    rows: Vec<(usize, StringRecord)>,
}

impl FeedTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn index_of(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Index of a required column.
    pub fn column(&self, name: &str) -> PipelineResult<usize> {
        self.index_of(name).ok_or_else(|| PipelineError::Schema {
            feed: self.feed,
            column: name.to_string(),
        })
    }

    fn require_all(&self, names: &[&str]) -> PipelineResult<()> {
        for name in names {
            self.column(name)?;
        }
        Ok(())
    }

    /// Cell lookup closure for one row. Missing cells read as "".
    fn cells<'a>(&'a self, record: &'a StringRecord) -> impl Fn(&str) -> String + 'a {
        move |name: &str| -> String {
            self.index_of(name)
                .and_then(|i| record.get(i))
                .unwrap_or("")
                .to_string()
        }
    }

    /// Columns not named in `known`, keyed by header.
    fn extras(&self, record: &StringRecord, known: &[&str]) -> BTreeMap<String, String> {
        self.headers
            .iter()
            .enumerate()
            .filter(|(_, h)| !known.contains(&h.as_str()))
            .map(|(i, h)| (h.clone(), record.get(i).unwrap_or("").to_string()))
            .collect()
    }
}

/// Read a feed from any reader. `path` is only used for error messages.
pub fn read_table<R: Read>(feed: Feed, path: &Path, reader: R) -> PipelineResult<FeedTable> {
    let load_error = |reason: String| PipelineError::Load {
        feed,
        path: path.to_path_buf(),
        reason,
    };

    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(reader);

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| load_error(e.to_string()))?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').to_string())
        .collect();

    let mut rows = Vec::new();
    for (i, result) in reader.records().enumerate() {
        let record = result.map_err(|e| load_error(e.to_string()))?;
        let line = record.position().map(|p| p.line() as usize).unwrap_or(i + 2);
        rows.push((line, record));
    }

    if rows.is_empty() {
        return Err(load_error("no data rows".to_string()));
    }

    Ok(FeedTable { feed, headers, rows })
}

/// Open and read a feed file.
pub fn load_table(feed: Feed, path: &Path) -> PipelineResult<FeedTable> {
    let file = File::open(path).map_err(|e| PipelineError::Load {
        feed,
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    let table = read_table(feed, path, file)?;
    info!("Read {} rows from {} feed {:?}", table.len(), feed, path);
    Ok(table)
}

/// Convert a closed-orders table into raw records.
pub fn closed_orders(table: &FeedTable) -> PipelineResult<Vec<ClosedOrderRecord>> {
    table.require_all(&CLOSED_REQUIRED)?;
    let known: Vec<&str> = CLOSED_REQUIRED.iter().chain(CLOSED_OPTIONAL.iter()).copied().collect();

    Ok(table
        .rows
        .iter()
        .map(|(line, record)| {
            let cell = table.cells(record);
            ClosedOrderRecord {
                line: *line,
                project_no: cell("PROJECT_NO"),
                order_no: cell("ORDER_NO"),
                shop: cell("SHOP"),
                part_no: cell("PART_NO"),
                order_type: cell("ORDER_TYPE"),
                order_date: cell("ORDER_DATE"),
                closing_date: cell("CLOSING_DATE"),
                state: cell("STATE"),
                repair_flag: cell("REPAIR_FLAG"),
                quantity: cell("QTY"),
                description: cell("DESCRIPTION"),
                condition: cell("CONDITION"),
                ack_date: cell("ACK_DATE"),
                tat: cell("TAT"),
                ack_to_close_tat: cell("ACK_TO_CLOSE_TAT"),
                extra: table.extras(record, &known),
            }
        })
        .collect())
}

/// Convert an open-orders table into raw records.
pub fn open_orders(table: &FeedTable) -> PipelineResult<Vec<OpenOrderRecord>> {
    table.require_all(&OPEN_REQUIRED)?;
    let known: Vec<&str> = OPEN_REQUIRED.iter().chain(OPEN_OPTIONAL.iter()).copied().collect();

    Ok(table
        .rows
        .iter()
        .map(|(line, record)| {
            let cell = table.cells(record);
            OpenOrderRecord {
                line: *line,
                order_no: cell("ORDER_NO"),
                shop: cell("SHOP"),
                part_no: cell("PART_NO"),
                description: cell("DESCRIPTION"),
                status: cell("STATUS"),
                order_date: cell("ORDER_DATE"),
                paused_shop_tat: cell("PAUSED_SHOP_TAT"),
                extra: table.extras(record, &known),
            }
        })
        .collect())
}

/// Load both feeds. Either failure aborts the run.
pub fn load_feeds(
    closed_path: &Path,
    open_path: &Path,
) -> PipelineResult<(Vec<ClosedOrderRecord>, Vec<OpenOrderRecord>)> {
    let closed = closed_orders(&load_table(Feed::ClosedOrders, closed_path)?)?;
    let open = open_orders(&load_table(Feed::OpenOrders, open_path)?)?;
    Ok((closed, open))
}
