//! Error types for the reporting pipeline.

use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Which of the two input feeds an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Feed {
    ClosedOrders,
    OpenOrders,
}

impl fmt::Display for Feed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Feed::ClosedOrders => write!(f, "closed-orders"),
            Feed::OpenOrders => write!(f, "open-orders"),
        }
    }
}

/// Result type alias for pipeline runs.
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Errors that abort a pipeline run. Both are surfaced to the user as an
/// error page.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("failed to load {feed} feed from {}: {reason}", path.display())]
    Load {
        feed: Feed,
        path: PathBuf,
        reason: String,
    },

    #[error("{feed} feed is missing required column '{column}'")]
    Schema { feed: Feed, column: String },
}

/// A single field that could not be used for a derived computation.
///
/// Row errors never abort a run: the value is treated as absent and the
/// row stays in the table.
#[derive(Debug, Clone, PartialEq, Serialize, Error)]
#[error("{feed} line {line} ({key}): field {field} has unusable value '{value}'")]
pub struct RowError {
    pub feed: Feed,
    /// 1-based line in the source file, header included.
    pub line: usize,
    /// Project number for closed orders, order number for open orders.
    pub key: String,
    pub field: &'static str,
    pub value: String,
}

/// Collected row errors for one pipeline run.
#[derive(Debug, Default, Clone, Serialize)]
pub struct RowErrors(Vec<RowError>);

impl RowErrors {
    pub fn push(&mut self, error: RowError) {
        self.0.push(error);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &RowError> {
        self.0.iter()
    }

    pub fn into_vec(self) -> Vec<RowError> {
        self.0
    }

    /// Log the collected errors: the first few in detail, then a total.
    pub fn log(&self) {
        for error in self.0.iter().take(5) {
            tracing::warn!("{}", error);
        }
        if !self.0.is_empty() {
            tracing::warn!(
                "{} row errors excluded from derived columns",
                self.0.len()
            );
        }
    }
}
