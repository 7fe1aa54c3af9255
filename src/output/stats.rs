//! End-of-run statistics
//!
//! Condenses a [`CrawlRunResult`] into the numbers an operator checks after
//! a run, broken down per district.

use crate::output::aggregator::CrawlRunResult;
use std::time::Duration;

/// Pages and opportunities for one seed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DistrictStats {
    pub district: String,
    pub pages: usize,
    pub rfps: usize,
}

/// Crawl statistics summary
#[derive(Debug, Clone)]
pub struct RunStatistics {
    pub districts_attempted: usize,
    pub pages_crawled: usize,
    pub rfps_found: usize,
    pub classification_failures: usize,
    /// In the order districts first appear among the records
    pub by_district: Vec<DistrictStats>,
}

impl RunStatistics {
    pub fn from_result(result: &CrawlRunResult) -> Self {
        let mut by_district: Vec<DistrictStats> = Vec::new();

        for record in &result.records {
            let index = match by_district.iter().position(|d| d.district == record.district) {
                Some(index) => index,
                None => {
                    by_district.push(DistrictStats {
                        district: record.district.clone(),
                        pages: 0,
                        rfps: 0,
                    });
                    by_district.len() - 1
                }
            };

            by_district[index].pages += 1;
            if record.is_match() {
                by_district[index].rfps += 1;
            }
        }

        Self {
            districts_attempted: result.districts_attempted,
            pages_crawled: result.pages_crawled,
            rfps_found: result.rfps_found(),
            classification_failures: result.classification_failures(),
            by_district,
        }
    }
}

/// Logs the end-of-run summary block
pub fn log_statistics(stats: &RunStatistics, elapsed: Duration) {
    tracing::info!("=== Crawl Summary ===");
    tracing::info!("Execution time: {:.1}s", elapsed.as_secs_f64());
    tracing::info!("Districts attempted: {}", stats.districts_attempted);
    tracing::info!("Pages crawled: {}", stats.pages_crawled);
    tracing::info!("RFPs found: {}", stats.rfps_found);

    if stats.classification_failures > 0 {
        tracing::warn!(
            "Classification failed for {} page(s)",
            stats.classification_failures
        );
    }

    for district in &stats.by_district {
        tracing::info!(
            "  {}: {} pages, {} RFPs",
            district.district,
            district.pages,
            district.rfps
        );
    }
}

/// Prints the opportunities of a run to stdout
pub fn print_matches(result: &CrawlRunResult) {
    if result.rfps_found() == 0 {
        println!("No RFPs found.");
        return;
    }

    println!("=== RFPs Found ({}) ===\n", result.rfps_found());
    for record in result.matches() {
        let verdict = &record.classification;
        println!("[{}] {} ({})", verdict.category, record.url, verdict.confidence);
        if !verdict.summary.is_empty() {
            println!("  {}", verdict.summary);
        }
        if !verdict.deadline.is_empty() {
            println!("  Deadline: {}", verdict.deadline);
        }
    }
}
