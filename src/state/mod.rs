//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `RunState`: whether a run is active, with an exclusive claim on starting one
//! - `PageOutcome`: how each dispatched task ended (recorded, skipped, failed)
//! - `OutcomeTally`: per-seed counts of those outcomes

mod page_outcome;
mod run_state;

// Re-export main types
pub use page_outcome::{OutcomeTally, PageOutcome};
pub use run_state::{RunGuard, RunState};
