//! Crawl coordinator - main crawl orchestration logic
//!
//! This module contains the crawl loop that drives one or more seeds:
//! - Breadth-first expansion, one depth level at a time
//! - A bounded worker pool per level
//! - Fetch, extraction floor, classification and recording per page
//! - Run-wide cancellation and the optional run timeout

use crate::classifier::{Classifier, LlmClassifier};
use crate::config::{Config, CrawlerConfig};
use crate::crawler::extractor::ensure_min_length;
use crate::crawler::fetcher::{FetchError, FetchStrategy};
use crate::crawler::scheduler::{CrawlTask, Frontier, OriginPacer, PageBudget};
use crate::crawler::build_strategy;
use crate::output::{CrawlRunResult, PageRecord, ResultAggregator};
use crate::state::{OutcomeTally, PageOutcome, RunState};
use crate::url::{fetch_target, normalize_url, LinkScope};
use crate::{ConfigError, ScoutError};
use chrono::Utc;
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Drives crawls for one or more seeds
pub struct Crawler {
    config: CrawlerConfig,
    fetcher: Arc<dyn FetchStrategy>,
    classifier: Arc<dyn Classifier>,
    pacer: OriginPacer,
    cancel: CancellationToken,
    run_state: RunState,
}

/// Shared, per-seed state handed to every task of that seed
struct SeedContext<'a> {
    district: &'a str,
    scope: &'a LinkScope,
    frontier: &'a Frontier,
    budget: &'a PageBudget,
    cancel: &'a CancellationToken,
}

/// A recorded page and the in-scope links it contributes
struct CrawledPage {
    record: PageRecord,
    links: Vec<Url>,
}

/// What became of one dispatched task
struct TaskResult {
    depth: u32,
    outcome: PageOutcome,
    page: Option<CrawledPage>,
}

impl TaskResult {
    fn skipped(depth: u32, outcome: PageOutcome) -> Self {
        Self {
            depth,
            outcome,
            page: None,
        }
    }
}

/// Cancellation scope of one run; stops the timeout timer when dropped
struct RunScope {
    token: CancellationToken,
    timer: Option<JoinHandle<()>>,
}

impl Drop for RunScope {
    fn drop(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }
}

fn outcome_for(error: &FetchError) -> PageOutcome {
    match error {
        FetchError::Timeout { .. } => PageOutcome::Timeout,
        FetchError::HttpStatus { .. } => PageOutcome::HttpError,
        FetchError::NonTextContent { .. } => PageOutcome::NonText,
        FetchError::Network { .. } => PageOutcome::NetworkError,
    }
}

impl Crawler {
    /// Creates a crawler from its parts
    pub fn new(
        config: CrawlerConfig,
        fetcher: Arc<dyn FetchStrategy>,
        classifier: Arc<dyn Classifier>,
    ) -> Self {
        let pacer = OriginPacer::new(Duration::from_millis(config.request_delay_ms));
        Self {
            config,
            fetcher,
            classifier,
            pacer,
            cancel: CancellationToken::new(),
            run_state: RunState::new(),
        }
    }

    /// Creates a crawler with the configured strategy and the hosted classifier
    ///
    /// Fails if the API key is missing, the HTTP client cannot be built, or
    /// the browser cannot be launched.
    pub async fn from_config(config: &Config) -> Result<Self, ScoutError> {
        let classifier = Arc::new(LlmClassifier::from_env(&config.classifier)?);
        let fetcher = build_strategy(config.crawler.strategy, &config.fetch).await?;
        Ok(Self::new(config.crawler.clone(), fetcher, classifier))
    }

    /// Token that cancels every run of this crawler
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Cancels in-flight runs; they finalize with what they have
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Handle on this crawler's run state, for status queries
    pub fn run_state(&self) -> RunState {
        self.run_state.clone()
    }

    /// Whether a run is in progress
    pub fn is_running(&self) -> bool {
        self.run_state.is_active()
    }

    /// Releases the fetch strategy's resources
    pub async fn shutdown(&self) {
        self.fetcher.shutdown().await;
    }

    fn begin_run(&self) -> RunScope {
        let token = self.cancel.child_token();

        let timer = (self.config.run_timeout_secs > 0).then(|| {
            let token = token.clone();
            let timeout = Duration::from_secs(self.config.run_timeout_secs);
            tokio::spawn(async move {
                tokio::time::sleep(timeout).await;
                tracing::warn!("Run timeout of {:?} reached, cancelling", timeout);
                token.cancel();
            })
        });

        RunScope { token, timer }
    }

    /// Crawls a single seed
    ///
    /// # Arguments
    ///
    /// * `seed_url` - Where the crawl starts; it also fixes the site scope
    /// * `max_depth` - Deepest hop count that is still fetched
    /// * `max_pages` - Most pages recorded; must be at least 1
    ///
    /// Fails with [`ScoutError::AlreadyRunning`] while another run of this
    /// crawler is in progress.
    pub async fn run(
        &self,
        seed_url: &str,
        max_depth: u32,
        max_pages: u32,
    ) -> Result<CrawlRunResult, ScoutError> {
        if max_pages == 0 {
            return Err(ConfigError::Validation("max_pages must be at least 1".to_string()).into());
        }
        let seed = fetch_target(seed_url)?;

        let _active = self.run_state.try_begin()?;
        let run = self.begin_run();
        let records = self.crawl_seed(&seed, max_depth, max_pages, &run.token).await?;

        let aggregator = ResultAggregator::new(1);
        for record in records {
            aggregator.record(record);
        }
        Ok(aggregator.finalize())
    }

    /// Crawls every seed in parallel with the configured limits
    ///
    /// Each seed gets its own frontier and budget. Results are merged in
    /// seed order. A seed that cannot be crawled at all contributes no
    /// records but still counts as attempted.
    pub async fn crawl_all(&self, seeds: &[String]) -> Result<CrawlRunResult, ScoutError> {
        let _active = self.run_state.try_begin()?;
        let run = self.begin_run();

        let crawls = seeds.iter().map(|seed| self.crawl_district(seed, &run.token));
        let per_seed = futures::future::join_all(crawls).await;

        let aggregator = ResultAggregator::new(seeds.len());
        for record in per_seed.into_iter().flatten() {
            aggregator.record(record);
        }
        Ok(aggregator.finalize())
    }

    async fn crawl_district(&self, seed_url: &str, cancel: &CancellationToken) -> Vec<PageRecord> {
        let result = match fetch_target(seed_url) {
            Ok(seed) => {
                self.crawl_seed(&seed, self.config.max_depth, self.config.max_pages, cancel)
                    .await
            }
            Err(e) => Err(e.into()),
        };

        result.unwrap_or_else(|e| {
            tracing::error!("Error crawling {}: {}", seed_url, e);
            Vec::new()
        })
    }

    async fn crawl_seed(
        &self,
        seed: &Url,
        max_depth: u32,
        max_pages: u32,
        cancel: &CancellationToken,
    ) -> Result<Vec<PageRecord>, ScoutError> {
        let scope = LinkScope::for_seed(seed)?;
        let frontier = Frontier::new(CrawlTask::new(seed.clone(), 0)?, max_depth);
        let budget = PageBudget::new(max_pages as usize);
        let district = seed.to_string();

        let ctx = SeedContext {
            district: &district,
            scope: &scope,
            frontier: &frontier,
            budget: &budget,
            cancel,
        };

        tracing::info!(
            "Crawling {} (max depth {}, max pages {})",
            seed,
            max_depth,
            max_pages
        );

        let mut records = Vec::new();
        let mut tally = OutcomeTally::default();
        let workers = self.config.concurrency.max(1) as usize;

        loop {
            if cancel.is_cancelled() {
                tracing::info!("Crawl of {} cancelled", seed);
                break;
            }
            if budget.is_exhausted() {
                tracing::info!("Page budget of {} reached for {}", max_pages, seed);
                break;
            }

            let level = frontier.take_level();
            if level.is_empty() {
                break;
            }

            let mut results = stream::iter(level)
                .map(|task| self.process_task(task, &ctx))
                .buffered(workers);

            while let Some(result) = results.next().await {
                tally.add(result.outcome);

                if result.depth == 0 && result.page.is_some() {
                    self.enqueue_priority_paths(&ctx, seed);
                }

                if let Some(page) = result.page {
                    self.enqueue_links(&ctx, &page);
                    records.push(page.record);
                }
            }
        }

        tracing::info!(
            "Finished {}: {} pages recorded, {} URLs visited ({})",
            seed,
            records.len(),
            frontier.visited_count(),
            tally.describe()
        );

        Ok(records)
    }

    /// Fetches, filters and classifies one task
    async fn process_task(&self, task: CrawlTask, ctx: &SeedContext<'_>) -> TaskResult {
        let depth = task.depth;

        if ctx.cancel.is_cancelled() {
            return TaskResult::skipped(depth, PageOutcome::Cancelled);
        }

        let Some(slot) = ctx.budget.acquire().await else {
            tracing::debug!("Skipping {}: page budget exhausted", task.url);
            return TaskResult::skipped(depth, PageOutcome::BudgetExhausted);
        };

        if !ctx.frontier.mark_visited(&task.key) {
            tracing::debug!("Skipping {}: already visited", task.url);
            return TaskResult::skipped(depth, PageOutcome::Duplicate);
        }

        let fetched = tokio::select! {
            biased;
            _ = ctx.cancel.cancelled() => {
                return TaskResult::skipped(depth, PageOutcome::Cancelled);
            }
            result = async {
                self.pacer.wait_turn(&task.url).await;
                self.fetcher.fetch(&task.url).await
            } => result,
        };

        let page = match fetched {
            Ok(page) => page,
            Err(e) => {
                tracing::warn!("Failed to fetch {}: {}", task.url, e);
                return TaskResult::skipped(depth, outcome_for(&e));
            }
        };

        if let Ok(final_url) = normalize_url(page.final_url.as_str()) {
            if final_url != task.key {
                if !ctx.scope.contains(&final_url) {
                    tracing::debug!("Skipping {}: redirected off-site to {}", task.url, final_url);
                    return TaskResult::skipped(depth, PageOutcome::OutOfScope);
                }
                if !ctx.frontier.mark_visited(&final_url) {
                    tracing::debug!("Skipping {}: redirected to visited {}", task.url, final_url);
                    return TaskResult::skipped(depth, PageOutcome::Duplicate);
                }
            }
        }

        if let Err(e) = ensure_min_length(&page.text, self.config.min_text_length) {
            tracing::debug!("Skipping {}: {}", task.url, e);
            return TaskResult::skipped(depth, PageOutcome::ContentFree);
        }

        let classification = tokio::select! {
            biased;
            _ = ctx.cancel.cancelled() => {
                return TaskResult::skipped(depth, PageOutcome::Cancelled);
            }
            verdict = self.classifier.classify(&page.text, task.url.as_str()) => verdict,
        };

        slot.commit();

        tracing::info!(
            "Crawled {} (depth {}, {} chars)",
            task.url,
            depth,
            page.text.chars().count()
        );
        if classification.is_match {
            tracing::info!(
                "RFP found at {}: {} [{}]",
                task.url,
                classification.category,
                classification.confidence
            );
        }

        let links = ctx.scope.scope_links(&page.links);
        let record = PageRecord {
            url: task.url.to_string(),
            district: ctx.district.to_string(),
            depth,
            title: page.title.unwrap_or_default(),
            extracted_text_length: page.text.chars().count(),
            classification,
            fetch_method: self.fetcher.method(),
            crawl_time: Utc::now(),
        };

        TaskResult {
            depth,
            outcome: PageOutcome::Recorded,
            page: Some(CrawledPage { record, links }),
        }
    }

    /// Queues the well-known procurement paths under the seed at depth 1
    ///
    /// Only done once the seed itself was recorded.
    fn enqueue_priority_paths(&self, ctx: &SeedContext<'_>, seed: &Url) {
        let urls: Vec<Url> = self
            .config
            .priority_paths
            .iter()
            .filter_map(|path| seed.join(path).ok())
            .filter(|url| ctx.scope.contains(url))
            .collect();

        let added = ctx.frontier.enqueue(urls, 1, usize::MAX);
        if added > 0 {
            tracing::debug!("Queued {} priority paths for {}", added, seed);
        }
    }

    /// Queues a recorded page's links one level deeper
    fn enqueue_links(&self, ctx: &SeedContext<'_>, page: &CrawledPage) {
        let cap = match self.config.max_links_per_page {
            0 => usize::MAX,
            cap => cap,
        };

        let added = ctx
            .frontier
            .enqueue(page.links.iter().cloned(), page.record.depth + 1, cap);
        if added > 0 {
            tracing::debug!("Queued {} links from {}", added, page.record.url);
        }
    }
}
