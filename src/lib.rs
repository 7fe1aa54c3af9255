//! Bid-Scout: a bounded procurement-opportunity crawler
//!
//! This crate crawls a small set of institutional websites, extracts readable
//! text from every in-scope page, and asks an external language-model endpoint
//! whether each page advertises a request for proposals (RFP).

pub mod classifier;
pub mod config;
pub mod crawler;
pub mod output;
pub mod state;
pub mod url;

use thiserror::Error;

/// Run-level error type for Bid-Scout operations
///
/// Page-level failures never surface here; they are logged and the crawl
/// moves on. Only failures that prevent a run from happening at all do.
#[derive(Debug, Error)]
pub enum ScoutError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("URL error: {0}")]
    Url(#[from] UrlError),

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("Browser launch failed: {0}")]
    BrowserLaunch(String),

    #[error("A crawl run is already active")]
    AlreadyRunning,

    #[error("Missing API key: environment variable {0} is not set")]
    MissingApiKey(String),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid value for environment variable {name}: {value}")]
    InvalidEnv { name: String, value: String },
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing domain in URL")]
    MissingDomain,
}

// Re-export commonly used types
pub use crate::classifier::{ClassificationVerdict, Classifier, Confidence, LlmClassifier};
pub use crate::config::Config;
pub use crate::crawler::{Crawler, FetchMethod, FetchStrategy};
pub use crate::output::{CrawlRunResult, PageRecord, ResultAggregator};
pub use crate::state::RunState;
pub use crate::url::{normalize_url, registrable_domain, LinkScope};
