//! Configuration module for Bid-Scout
//!
//! This module handles loading, parsing, and validating TOML configuration
//! files, layered under environment-style overrides.
//!
//! # Example
//!
//! ```no_run
//! use bid_scout::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("scout.toml")).unwrap();
//! println!("Crawler will use max depth: {}", config.crawler.max_depth);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    ClassifierConfig, Config, CrawlerConfig, FetchConfig, OutputConfig, StrategyKind,
    DEFAULT_PRIORITY_PATHS, DEFAULT_SEEDS, DEFAULT_USER_AGENT,
};

// Re-export parser functions
pub use parser::{apply_env_overrides, load_config, load_from_env};
pub use validation::validate;
