//! Fetch strategies and the static HTTP fetcher
//!
//! A fetch strategy turns a URL into a [`FetchedPage`]: the final URL after
//! redirects, the title, normalized text and raw outbound links. The
//! controller picks one strategy per run and never mixes them.
//!
//! Error classification for the static fetcher:
//!
//! | Condition | Result |
//! |-----------|--------|
//! | Timeout (connect or body) | `FetchError::Timeout` |
//! | Non-2xx after redirects | `FetchError::HttpStatus` |
//! | Binary Content-Type | `FetchError::NonTextContent` |
//! | Anything else on the wire | `FetchError::Network` |

use crate::config::FetchConfig;
use crate::crawler::extractor::{extract_text, normalize_whitespace, truncate_chars};
use crate::crawler::parser::parse_html;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CONTENT_TYPE};
use reqwest::{redirect::Policy, Client};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Which retrieval method produced a page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchMethod {
    Static,
    Rendered,
}

impl fmt::Display for FetchMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchMethod::Static => write!(f, "static"),
            FetchMethod::Rendered => write!(f, "rendered"),
        }
    }
}

/// Page-level fetch failures
///
/// None of these abort a run. The controller logs them and moves on.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("timed out fetching {url}")]
    Timeout { url: String },

    #[error("HTTP {status} from {url}")]
    HttpStatus { url: String, status: u16 },

    #[error("non-text content ({content_type}) at {url}")]
    NonTextContent { url: String, content_type: String },

    #[error("network error for {url}: {message}")]
    Network { url: String, message: String },
}

impl FetchError {
    pub(crate) fn network(url: &Url, message: impl fmt::Display) -> Self {
        FetchError::Network {
            url: url.to_string(),
            message: message.to_string(),
        }
    }
}

/// A successfully retrieved page
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// Final URL after redirects
    pub final_url: Url,

    /// Page title, if the document had one
    pub title: Option<String>,

    /// Normalized text content
    pub text: String,

    /// Absolute outbound links in document order, not yet scoped
    pub links: Vec<String>,
}

/// A way of retrieving pages
#[async_trait]
pub trait FetchStrategy: Send + Sync {
    /// The method recorded on every page this strategy produces
    fn method(&self) -> FetchMethod;

    /// Retrieves one page
    async fn fetch(&self, url: &Url) -> Result<FetchedPage, FetchError>;

    /// Releases any resources held by the strategy
    ///
    /// Called once when the run ends, whatever the outcome.
    async fn shutdown(&self) {}
}

/// Builds a page from markup, resolving links against `final_url`
pub(crate) fn page_from_html(final_url: Url, html: &str) -> FetchedPage {
    let parsed = parse_html(html, &final_url);
    FetchedPage {
        title: parsed.title,
        text: extract_text(html),
        links: parsed.links,
        final_url,
    }
}

/// How a response body is treated, decided from its Content-Type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ContentKind {
    /// HTML or XHTML: full markup extraction
    Markup,
    /// Other textual types: a bounded raw prefix
    PlainText,
    /// Anything else is skipped
    Binary,
}

impl ContentKind {
    fn from_header(content_type: &str) -> Self {
        let mime = content_type
            .split(';')
            .next()
            .unwrap_or("")
            .trim()
            .to_ascii_lowercase();

        // Servers that omit the header are almost always serving HTML
        if mime.is_empty() || mime == "text/html" || mime == "application/xhtml+xml" {
            return ContentKind::Markup;
        }

        if mime.starts_with("text/")
            || mime == "application/json"
            || mime == "application/xml"
            || mime.ends_with("+json")
            || mime.ends_with("+xml")
        {
            return ContentKind::PlainText;
        }

        ContentKind::Binary
    }
}

/// Builds the HTTP client used for static fetches
///
/// # Example
///
/// ```
/// use bid_scout::config::FetchConfig;
/// use bid_scout::crawler::build_http_client;
///
/// let client = build_http_client(&FetchConfig::default());
/// assert!(client.is_ok());
/// ```
pub fn build_http_client(config: &FetchConfig) -> Result<Client, reqwest::Error> {
    let mut headers = HeaderMap::new();
    headers.insert(
        ACCEPT,
        HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"),
    );
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.5"));

    Client::builder()
        .user_agent(config.user_agent.clone())
        .default_headers(headers)
        .timeout(Duration::from_secs(config.timeout_secs))
        .connect_timeout(Duration::from_secs(config.timeout_secs.min(10)))
        .redirect(Policy::limited(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Plain HTTP retrieval
pub struct StaticFetcher {
    client: Client,
    max_body_prefix: usize,
}

impl StaticFetcher {
    /// Creates a static fetcher from the fetch configuration
    pub fn new(config: &FetchConfig) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: build_http_client(config)?,
            max_body_prefix: config.max_body_prefix,
        })
    }

    fn classify_error(url: &Url, error: reqwest::Error) -> FetchError {
        if error.is_timeout() {
            FetchError::Timeout {
                url: url.to_string(),
            }
        } else if error.is_connect() {
            FetchError::network(url, "connection refused")
        } else if error.is_redirect() {
            FetchError::network(url, "redirect loop or chain too long")
        } else {
            FetchError::network(url, error)
        }
    }
}

#[async_trait]
impl FetchStrategy for StaticFetcher {
    fn method(&self) -> FetchMethod {
        FetchMethod::Static
    }

    async fn fetch(&self, url: &Url) -> Result<FetchedPage, FetchError> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| Self::classify_error(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let final_url = response.url().clone();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();

        match ContentKind::from_header(&content_type) {
            ContentKind::Binary => Err(FetchError::NonTextContent {
                url: url.to_string(),
                content_type,
            }),
            ContentKind::Markup => {
                let body = response
                    .text()
                    .await
                    .map_err(|e| Self::classify_error(url, e))?;
                Ok(page_from_html(final_url, &body))
            }
            ContentKind::PlainText => {
                let body = response
                    .text()
                    .await
                    .map_err(|e| Self::classify_error(url, e))?;
                let prefix = truncate_chars(&body, self.max_body_prefix);
                Ok(FetchedPage {
                    final_url,
                    title: None,
                    text: normalize_whitespace(prefix),
                    links: Vec::new(),
                })
            }
        }
    }
}
