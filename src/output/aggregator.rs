use crate::classifier::ClassificationVerdict;
use crate::crawler::FetchMethod;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::{Mutex, OnceLock, PoisonError};

/// One successfully fetched and classified page
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageRecord {
    /// The crawled URL
    pub url: String,

    /// Seed URL whose crawl reached this page
    pub district: String,

    /// Hops from the seed
    pub depth: u32,

    /// Page title, empty when the document had none
    pub title: String,

    /// Length of the normalized text in characters
    pub extracted_text_length: usize,

    pub classification: ClassificationVerdict,

    pub fetch_method: FetchMethod,

    pub crawl_time: DateTime<Utc>,
}

impl PageRecord {
    /// Whether the page was judged to advertise an opportunity
    pub fn is_match(&self) -> bool {
        self.classification.is_match
    }
}

/// Final result of a run
#[derive(Debug, Clone, Serialize)]
pub struct CrawlRunResult {
    pub timestamp: DateTime<Utc>,
    pub districts_attempted: usize,
    pub pages_crawled: usize,
    /// Records in discovery order
    pub records: Vec<PageRecord>,
    /// Matching records per category
    pub category_counts: BTreeMap<String, usize>,
}

impl CrawlRunResult {
    /// Records judged to be opportunities, in discovery order
    pub fn matches(&self) -> impl Iterator<Item = &PageRecord> {
        self.records.iter().filter(|r| r.is_match())
    }

    /// Number of opportunities found
    pub fn rfps_found(&self) -> usize {
        self.matches().count()
    }

    /// Number of pages whose classification failed
    pub fn classification_failures(&self) -> usize {
        self.records
            .iter()
            .filter(|r| r.classification.is_failure())
            .count()
    }
}

/// Collects page records for one run
///
/// Records are kept in the order they are handed in. Once `finalize` has
/// been called the result is fixed; later calls return the same snapshot.
#[derive(Debug)]
pub struct ResultAggregator {
    districts_attempted: usize,
    records: Mutex<Vec<PageRecord>>,
    result: OnceLock<CrawlRunResult>,
}

impl ResultAggregator {
    pub fn new(districts_attempted: usize) -> Self {
        Self {
            districts_attempted,
            records: Mutex::new(Vec::new()),
            result: OnceLock::new(),
        }
    }

    /// Appends a record
    pub fn record(&self, record: PageRecord) {
        if self.result.get().is_some() {
            tracing::warn!("Ignoring record for {} after finalize", record.url);
            return;
        }
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(record);
    }

    /// Number of records collected so far
    pub fn len(&self) -> usize {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether no records have been collected
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Builds the run result
    pub fn finalize(&self) -> CrawlRunResult {
        self.result
            .get_or_init(|| {
                let records = self
                    .records
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .clone();

                let mut category_counts = BTreeMap::new();
                for record in records.iter().filter(|r| r.is_match()) {
                    *category_counts
                        .entry(record.classification.category.clone())
                        .or_insert(0) += 1;
                }

                CrawlRunResult {
                    timestamp: Utc::now(),
                    districts_attempted: self.districts_attempted,
                    pages_crawled: records.len(),
                    records,
                    category_counts,
                }
            })
            .clone()
    }
}
