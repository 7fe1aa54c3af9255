//! Result documents written at the end of a run
//!
//! Two documents are produced: the full scan results and a smaller
//! dashboard summary of active opportunities. Both are serialized in memory
//! before anything touches the disk, then written to a temporary file and
//! renamed into place, so readers never observe a half-written document.

use crate::output::aggregator::{CrawlRunResult, PageRecord};
use crate::output::OutputResult;
use crate::crawler::FetchMethod;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// File name of the full scan results
pub const RESULTS_FILE: &str = "rfp_scan_results.json";

/// File name of the dashboard summary
pub const DASHBOARD_FILE: &str = "dashboard_summary.json";

/// Format version stamped into the results metadata
pub const ARTIFACT_VERSION: &str = "mvp-1.0";

/// Flattened view of one matching page
#[derive(Debug, Clone, Serialize)]
pub struct RfpSummary {
    pub url: String,
    pub title: String,
    pub summary: String,
    pub category: String,
    pub confidence: String,
    pub deadline: String,
    pub contact_email: String,
    pub contact_phone: String,
    pub budget_range: String,
    pub submission_location: String,
    pub crawl_time: DateTime<Utc>,
    pub depth: u32,
    pub method: FetchMethod,
}

impl From<&PageRecord> for RfpSummary {
    fn from(record: &PageRecord) -> Self {
        let verdict = &record.classification;
        let title = if record.title.is_empty() {
            "Unknown Title".to_string()
        } else {
            record.title.clone()
        };

        Self {
            url: record.url.clone(),
            title,
            summary: verdict.summary.clone(),
            category: verdict.category.clone(),
            confidence: verdict.confidence.to_string(),
            deadline: verdict.deadline.clone(),
            contact_email: verdict.contact_email.clone(),
            contact_phone: verdict.contact_phone.clone(),
            budget_range: verdict.budget_range.clone(),
            submission_location: verdict.submission_location.clone(),
            crawl_time: record.crawl_time,
            depth: record.depth,
            method: record.fetch_method,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ScanMetadata {
    pub crawl_timestamp: DateTime<Utc>,
    pub total_districts_crawled: usize,
    pub total_pages_crawled: usize,
    pub total_rfps_found: usize,
    pub categories: BTreeMap<String, usize>,
    pub version: &'static str,
}

/// The full scan results document
#[derive(Debug, Serialize)]
pub struct ScanReport<'a> {
    pub metadata: ScanMetadata,
    pub rfp_summary: Vec<RfpSummary>,
    pub raw_results: &'a [PageRecord],
}

impl<'a> ScanReport<'a> {
    pub fn from_result(result: &'a CrawlRunResult) -> Self {
        let rfp_summary: Vec<RfpSummary> = result.matches().map(RfpSummary::from).collect();

        Self {
            metadata: ScanMetadata {
                crawl_timestamp: result.timestamp,
                total_districts_crawled: result.districts_attempted,
                total_pages_crawled: result.pages_crawled,
                total_rfps_found: rfp_summary.len(),
                categories: result.category_counts.clone(),
                version: ARTIFACT_VERSION,
            },
            rfp_summary,
            raw_results: &result.records,
        }
    }
}

/// The dashboard summary document
#[derive(Debug, Serialize)]
pub struct DashboardSummary {
    pub timestamp: DateTime<Utc>,
    pub total_rfps: usize,
    pub total_pages: usize,
    pub categories: BTreeMap<String, usize>,
    pub active_rfps: Vec<RfpSummary>,
}

impl DashboardSummary {
    pub fn from_result(result: &CrawlRunResult) -> Self {
        let active_rfps: Vec<RfpSummary> = result.matches().map(RfpSummary::from).collect();

        Self {
            timestamp: result.timestamp,
            total_rfps: active_rfps.len(),
            total_pages: result.pages_crawled,
            categories: result.category_counts.clone(),
            active_rfps,
        }
    }
}

/// Where the documents of a run were written
#[derive(Debug, Clone)]
pub struct ArtifactPaths {
    pub results: PathBuf,
    pub dashboard: PathBuf,
}

/// Writes both documents into `directory`
///
/// The directory is created if needed. Both documents are serialized before
/// either file is written.
pub fn write_artifacts(result: &CrawlRunResult, directory: &Path) -> OutputResult<ArtifactPaths> {
    let results_json = serde_json::to_vec_pretty(&ScanReport::from_result(result))?;
    let dashboard_json = serde_json::to_vec_pretty(&DashboardSummary::from_result(result))?;

    fs::create_dir_all(directory)?;

    let paths = ArtifactPaths {
        results: directory.join(RESULTS_FILE),
        dashboard: directory.join(DASHBOARD_FILE),
    };

    write_atomic(&paths.results, &results_json)?;
    write_atomic(&paths.dashboard, &dashboard_json)?;

    tracing::info!(
        "Saved {} pages ({} RFPs) to {}",
        result.pages_crawled,
        result.rfps_found(),
        paths.results.display()
    );

    Ok(paths)
}

/// Writes bytes to a sibling temp file, then renames it over `path`
fn write_atomic(path: &Path, bytes: &[u8]) -> OutputResult<()> {
    let mut tmp_name = path.file_name().unwrap_or_default().to_os_string();
    tmp_name.push(".tmp");
    let tmp_path = path.with_file_name(tmp_name);

    fs::write(&tmp_path, bytes)?;
    if let Err(e) = fs::rename(&tmp_path, path) {
        let _ = fs::remove_file(&tmp_path);
        return Err(e.into());
    }
    Ok(())
}
