//! How the crawl disposed of one dispatched task

use std::collections::BTreeMap;
use std::fmt;

/// Represents the final disposition of a crawl task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PageOutcome {
    // ===== Success =====
    /// Page was fetched, classified and recorded
    Recorded,

    // ===== Skips =====
    /// URL was already visited in this run
    Duplicate,

    /// Page text fell below the minimum length
    ContentFree,

    /// Redirects led outside the seed's site
    OutOfScope,

    /// The page budget was exhausted before the task got a slot
    BudgetExhausted,

    /// The run was cancelled while the task was in flight
    Cancelled,

    // ===== Failures =====
    /// Fetch timed out
    Timeout,

    /// Server answered with a non-success status
    HttpError,

    /// Response was not text
    NonText,

    /// Connection, TLS or browser failure
    NetworkError,
}

impl PageOutcome {
    /// Returns true if the page produced a record
    pub fn is_recorded(&self) -> bool {
        matches!(self, Self::Recorded)
    }

    /// Returns true if the page was skipped without a fetch failure
    pub fn is_skipped(&self) -> bool {
        matches!(
            self,
            Self::Duplicate
                | Self::ContentFree
                | Self::OutOfScope
                | Self::BudgetExhausted
                | Self::Cancelled
        )
    }

    /// Returns true if fetching the page failed
    pub fn is_error(&self) -> bool {
        matches!(
            self,
            Self::Timeout | Self::HttpError | Self::NonText | Self::NetworkError
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Recorded => "recorded",
            Self::Duplicate => "duplicate",
            Self::ContentFree => "content_free",
            Self::OutOfScope => "out_of_scope",
            Self::BudgetExhausted => "budget_exhausted",
            Self::Cancelled => "cancelled",
            Self::Timeout => "timeout",
            Self::HttpError => "http_error",
            Self::NonText => "non_text",
            Self::NetworkError => "network_error",
        }
    }
}

impl fmt::Display for PageOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Counts of task outcomes for one seed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutcomeTally {
    counts: BTreeMap<PageOutcome, usize>,
}

impl OutcomeTally {
    pub fn add(&mut self, outcome: PageOutcome) {
        *self.counts.entry(outcome).or_insert(0) += 1;
    }

    pub fn count(&self, outcome: PageOutcome) -> usize {
        self.counts.get(&outcome).copied().unwrap_or(0)
    }

    /// Number of tasks that failed to fetch
    pub fn errors(&self) -> usize {
        self.counts
            .iter()
            .filter(|(outcome, _)| outcome.is_error())
            .map(|(_, count)| count)
            .sum()
    }

    /// Renders the tally as `outcome=count` pairs
    pub fn describe(&self) -> String {
        self.counts
            .iter()
            .map(|(outcome, count)| format!("{}={}", outcome, count))
            .collect::<Vec<_>>()
            .join(", ")
    }
}
