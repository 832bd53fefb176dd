//! CM dashboard: turnaround-time reporting over corrective-maintenance
//! work-order exports.

pub mod aggregate;
pub mod api;
pub mod charts;
pub mod cleaning;
pub mod config;
pub mod error;
pub mod export;
pub mod ingest;
pub mod metrics;
pub mod models;
pub mod pipeline;
