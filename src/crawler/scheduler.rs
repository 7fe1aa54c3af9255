//! Frontier, page budget and per-origin pacing
//!
//! This module handles:
//! - The FIFO frontier that gives the crawl its breadth-first order
//! - The visited set with an atomic check-and-insert
//! - The page budget shared by concurrent workers
//! - Minimum spacing between requests to the same origin

use crate::url::{normalize_url, origin_key};
use crate::UrlError;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::{Semaphore, SemaphorePermit};
use tokio::time::Instant;
use url::Url;

/// A URL waiting to be crawled
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlTask {
    /// URL as discovered, fragment removed; this is what gets fetched
    pub url: Url,

    /// Normalized form, used only for frontier and visited-set membership
    pub key: Url,

    /// Hops from the seed (the seed is depth 0)
    pub depth: u32,
}

impl CrawlTask {
    pub fn new(url: Url, depth: u32) -> Result<Self, UrlError> {
        let key = normalize_url(url.as_str())?;
        Ok(Self { url, key, depth })
    }
}

#[derive(Debug, Default)]
struct FrontierInner {
    queue: VecDeque<CrawlTask>,
    /// Keys ever enqueued, so the same link found on many pages queues once
    queued: HashSet<String>,
    visited: HashSet<String>,
}

/// Breadth-first frontier plus the visited set for one seed
///
/// Tasks dequeue in the order they were enqueued, so every task at depth
/// `d` is dispatched before any task at depth `d + 1`.
#[derive(Debug)]
pub struct Frontier {
    inner: Mutex<FrontierInner>,
    max_depth: u32,
}

impl Frontier {
    /// Creates a frontier holding only the seed task
    pub fn new(seed: CrawlTask, max_depth: u32) -> Self {
        let mut inner = FrontierInner::default();
        inner.queued.insert(seed.key.as_str().to_string());
        inner.queue.push_back(seed);

        Self {
            inner: Mutex::new(inner),
            max_depth,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, FrontierInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Enqueues URLs at `depth`, skipping ones already queued or visited
    ///
    /// Membership is decided on the normalized key while the task keeps the
    /// URL as given. At most `limit` new tasks are added. Returns the number
    /// enqueued. Nothing is enqueued beyond the frontier's maximum depth.
    pub fn enqueue(&self, urls: impl IntoIterator<Item = Url>, depth: u32, limit: usize) -> usize {
        if depth > self.max_depth {
            return 0;
        }

        let mut inner = self.lock();
        let mut added = 0;

        for url in urls {
            if added >= limit {
                break;
            }
            let task = match CrawlTask::new(url, depth) {
                Ok(task) => task,
                Err(e) => {
                    tracing::trace!("Not queueing link: {}", e);
                    continue;
                }
            };
            let key = task.key.as_str().to_string();
            if inner.visited.contains(&key) || !inner.queued.insert(key) {
                continue;
            }
            inner.queue.push_back(task);
            added += 1;
        }

        added
    }

    /// Drains every task currently queued
    ///
    /// Because the crawl expands one depth at a time, the drained tasks all
    /// share one depth.
    pub fn take_level(&self) -> Vec<CrawlTask> {
        self.lock().queue.drain(..).collect()
    }

    /// Marks a normalized key visited, returning false if it already was
    ///
    /// The check and the insert happen under one lock, so two workers can
    /// never both claim the same URL.
    pub fn mark_visited(&self, key: &Url) -> bool {
        self.lock().visited.insert(key.as_str().to_string())
    }

    /// Number of distinct URLs visited so far
    pub fn visited_count(&self) -> usize {
        self.lock().visited.len()
    }

    /// Number of tasks waiting
    pub fn len(&self) -> usize {
        self.lock().queue.len()
    }

    /// Whether no tasks are waiting
    pub fn is_empty(&self) -> bool {
        self.lock().queue.is_empty()
    }
}

/// Cap on the number of pages recorded for one seed
///
/// A worker takes a [`BudgetSlot`] before fetching. Committing the slot
/// consumes it for good; dropping it uncommitted (fetch failure, duplicate,
/// content-free page) hands it back to the next waiter. Once every slot is
/// committed the budget closes and all waiters are turned away.
#[derive(Debug)]
pub struct PageBudget {
    slots: Semaphore,
    limit: usize,
    recorded: AtomicUsize,
}

/// One reserved unit of a [`PageBudget`]
#[derive(Debug)]
pub struct BudgetSlot<'a> {
    permit: Option<SemaphorePermit<'a>>,
    budget: &'a PageBudget,
}

impl PageBudget {
    /// Creates a budget for `limit` recorded pages
    pub fn new(limit: usize) -> Self {
        Self {
            slots: Semaphore::new(limit),
            limit,
            recorded: AtomicUsize::new(0),
        }
    }

    /// Waits for a free slot
    ///
    /// Returns None once the budget is exhausted. Slots are handed out in
    /// the order callers started waiting.
    pub async fn acquire(&self) -> Option<BudgetSlot<'_>> {
        if self.is_exhausted() {
            return None;
        }
        let permit = self.slots.acquire().await.ok()?;
        Some(BudgetSlot {
            permit: Some(permit),
            budget: self,
        })
    }

    /// Pages recorded against this budget
    pub fn recorded(&self) -> usize {
        self.recorded.load(Ordering::SeqCst)
    }

    /// Whether every slot has been committed
    pub fn is_exhausted(&self) -> bool {
        self.recorded() >= self.limit
    }
}

impl BudgetSlot<'_> {
    /// Consumes the slot for a recorded page
    pub fn commit(mut self) {
        if let Some(permit) = self.permit.take() {
            permit.forget();
        }
        let recorded = self.budget.recorded.fetch_add(1, Ordering::SeqCst) + 1;
        if recorded >= self.budget.limit {
            self.budget.slots.close();
        }
    }
}

/// Minimum spacing between requests to the same origin
///
/// Each caller reserves the next free start time for its origin, then sleeps
/// until it. Concurrent workers on one origin therefore start their requests
/// at least `delay` apart, and different origins never wait on each other.
#[derive(Debug)]
pub struct OriginPacer {
    delay: Duration,
    next_start: Mutex<HashMap<String, Instant>>,
}

impl OriginPacer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            next_start: Mutex::new(HashMap::new()),
        }
    }

    /// Reserves a start time for a request to `url`'s origin
    pub fn reserve(&self, url: &Url) -> Instant {
        let now = Instant::now();
        let mut next_start = self
            .next_start
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        let slot = match next_start.get(&origin_key(url)) {
            Some(&earliest) if earliest > now => earliest,
            _ => now,
        };
        next_start.insert(origin_key(url), slot + self.delay);
        slot
    }

    /// Waits until a request to `url`'s origin may start
    pub async fn wait_turn(&self, url: &Url) {
        let slot = self.reserve(url);
        if slot > Instant::now() {
            tracing::trace!("Pacing request to {} until {:?}", url, slot);
            tokio::time::sleep_until(slot).await;
        }
    }
}
