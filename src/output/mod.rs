//! Output module for run results
//!
//! This module handles:
//! - Collecting page records in discovery order
//! - Writing the result documents atomically
//! - Summarizing a run for the operator

mod aggregator;
mod artifact;
pub mod stats;

pub use aggregator::{CrawlRunResult, PageRecord, ResultAggregator};
pub use artifact::{
    write_artifacts, ArtifactPaths, DashboardSummary, RfpSummary, ScanReport, ARTIFACT_VERSION,
    DASHBOARD_FILE, RESULTS_FILE,
};
pub use stats::{log_statistics, print_matches, RunStatistics};

use thiserror::Error;

/// Errors that can occur while writing results
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Failed to serialize results: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;
