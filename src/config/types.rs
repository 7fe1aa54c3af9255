use serde::Deserialize;

/// Seeds crawled when neither the config file nor the environment names any
pub const DEFAULT_SEEDS: &[&str] = &[
    "https://www.boone.kyschools.us",
    "https://www.carroll.kyschools.us",
];

/// Well-known procurement paths queued below every seed
pub const DEFAULT_PRIORITY_PATHS: &[&str] = &[
    "/administration",
    "/business",
    "/finance",
    "/purchasing",
    "/procurement",
    "/bids",
    "/rfp",
    "/rfps",
    "/vendors",
    "/contracts",
    "/board",
    "/departments/business",
    "/departments/finance",
    "/about/business-office",
];

/// Browser-like client identity; several district sites reject bot agents
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Main configuration structure for Bid-Scout
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub crawler: CrawlerConfig,
    pub fetch: FetchConfig,
    pub classifier: ClassifierConfig,
    pub output: OutputConfig,
    /// Seed URLs, one crawl per seed
    pub seeds: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            crawler: CrawlerConfig::default(),
            fetch: FetchConfig::default(),
            classifier: ClassifierConfig::default(),
            output: OutputConfig::default(),
            seeds: DEFAULT_SEEDS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Which fetch strategy the controller uses for every page of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrategyKind {
    /// Plain HTTP retrieval
    Static,
    /// Headless-browser retrieval
    Rendered,
}

impl std::str::FromStr for StrategyKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "static" | "http" | "requests" => Ok(Self::Static),
            "rendered" | "browser" | "playwright" => Ok(Self::Rendered),
            other => Err(format!("unknown fetch strategy '{}'", other)),
        }
    }
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct CrawlerConfig {
    /// Maximum depth to crawl from a seed URL
    pub max_depth: u32,

    /// Maximum number of recorded pages per seed
    pub max_pages: u32,

    /// Minimum time between requests to the same origin (milliseconds)
    pub request_delay_ms: u64,

    /// Number of concurrent fetches per seed
    pub concurrency: u32,

    /// Pages with less normalized text than this are skipped
    pub min_text_length: usize,

    /// Maximum number of new links taken from one page (0 = unlimited)
    pub max_links_per_page: usize,

    /// Fetch strategy for the run
    pub strategy: StrategyKind,

    /// Run-wide timeout in seconds (0 = none)
    pub run_timeout_secs: u64,

    /// Paths enqueued below the seed at depth 1
    pub priority_paths: Vec<String>,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            max_depth: 2,
            max_pages: 15,
            request_delay_ms: 1000,
            concurrency: 2,
            min_text_length: 50,
            max_links_per_page: 20,
            strategy: StrategyKind::Static,
            run_timeout_secs: 300,
            priority_paths: DEFAULT_PRIORITY_PATHS
                .iter()
                .map(|p| p.to_string())
                .collect(),
        }
    }
}

/// Fetch strategy configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct FetchConfig {
    /// User-Agent header sent by both strategies
    pub user_agent: String,

    /// Static fetch timeout in seconds
    pub timeout_secs: u64,

    /// Rendered fetch navigation timeout in seconds
    pub navigation_timeout_secs: u64,

    /// Extra wait after navigation for script-injected content (milliseconds)
    pub settle_delay_ms: u64,

    /// Characters kept from text bodies that are not markup
    pub max_body_prefix: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout_secs: 30,
            navigation_timeout_secs: 60,
            settle_delay_ms: 2000,
            max_body_prefix: 10_000,
        }
    }
}

/// Classification endpoint configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ClassifierConfig {
    /// Messages endpoint URL
    pub endpoint: String,

    /// Model identifier sent with every request
    pub model: String,

    /// Response token limit
    pub max_tokens: u32,

    /// Name of the environment variable holding the API key
    pub api_key_env: String,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.anthropic.com/v1/messages".to_string(),
            model: "claude-3-5-sonnet-20241022".to_string(),
            max_tokens: 1000,
            api_key_env: "ANTHROPIC_API_KEY".to_string(),
            timeout_secs: 60,
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct OutputConfig {
    /// Directory receiving the result documents
    pub directory: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: "./shared".to_string(),
        }
    }
}
