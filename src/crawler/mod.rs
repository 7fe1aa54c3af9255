//! Crawler module for web page fetching and processing
//!
//! This module contains the core crawling logic, including:
//! - Static and rendered fetch strategies
//! - HTML parsing, link extraction and text extraction
//! - The frontier, page budget and per-origin pacing
//! - Overall crawl coordination

mod coordinator;
mod extractor;
mod fetcher;
mod parser;
mod rendered;
mod scheduler;

pub use coordinator::Crawler;
pub use extractor::{
    ensure_min_length, extract_text, normalize_whitespace, truncate_chars, ExtractionError,
    DEFAULT_MIN_TEXT_LENGTH,
};
pub use fetcher::{
    build_http_client, FetchError, FetchMethod, FetchStrategy, FetchedPage, StaticFetcher,
};
pub use parser::{parse_html, ParsedPage};
pub use rendered::RenderedFetcher;
pub use scheduler::{BudgetSlot, CrawlTask, Frontier, OriginPacer, PageBudget};

use crate::config::{Config, FetchConfig, StrategyKind};
use crate::output::CrawlRunResult;
use crate::ScoutError;
use std::sync::Arc;

/// Acquires the fetch strategy for a run
///
/// The rendered strategy launches its browser here, so a launch failure
/// surfaces before any page is crawled.
pub async fn build_strategy(
    kind: StrategyKind,
    config: &FetchConfig,
) -> Result<Arc<dyn FetchStrategy>, ScoutError> {
    match kind {
        StrategyKind::Static => Ok(Arc::new(StaticFetcher::new(config)?)),
        StrategyKind::Rendered => Ok(Arc::new(RenderedFetcher::launch(config).await?)),
    }
}

/// Runs a complete crawl of every configured seed
///
/// This is the main entry point for a run. It will:
/// 1. Build the classifier and acquire the fetch strategy
/// 2. Crawl all seeds in parallel
/// 3. Release the fetch strategy, whatever the outcome
///
/// Writing the result documents is left to the caller.
pub async fn crawl(config: &Config) -> Result<CrawlRunResult, ScoutError> {
    let crawler = Crawler::from_config(config).await?;
    let result = crawler.crawl_all(&config.seeds).await;
    crawler.shutdown().await;
    result
}
