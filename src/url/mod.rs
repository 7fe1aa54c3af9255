//! URL handling module for Bid-Scout
//!
//! This module provides URL normalization, domain extraction, and the link
//! scoper that keeps a crawl on its seed's site.

mod domain;
mod normalize;
mod scope;

// Re-export main functions
pub use domain::{extract_domain, origin_key, registrable_domain};
pub use normalize::{fetch_target, normalize_url};
pub use scope::LinkScope;
