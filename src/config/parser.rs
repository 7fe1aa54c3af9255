use crate::config::types::{Config, StrategyKind};
use crate::config::validation::validate;
use crate::ConfigError;
use std::path::Path;
use std::str::FromStr;

/// Loads and parses a configuration file from the given path
///
/// Environment overrides are applied on top of the file before validation.
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok(Config)` - Successfully loaded and validated configuration
/// * `Err(ConfigError)` - Failed to load, parse, or validate the configuration
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
/// use bid_scout::config::load_config;
///
/// let config = load_config(Path::new("scout.toml")).unwrap();
/// println!("Max depth: {}", config.crawler.max_depth);
/// ```
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let mut config: Config = toml::from_str(&content)?;

    apply_env_overrides(&mut config, |name| std::env::var(name).ok())?;
    validate(&config)?;

    Ok(config)
}

/// Builds a configuration from defaults and the environment alone
pub fn load_from_env() -> Result<Config, ConfigError> {
    let mut config = Config::default();
    apply_env_overrides(&mut config, |name| std::env::var(name).ok())?;
    validate(&config)?;
    Ok(config)
}

/// Applies environment-style overrides to a configuration
///
/// | Variable | Field |
/// |----------|-------|
/// | `SCHOOL_DISTRICTS` | `seeds` (comma separated) |
/// | `CRAWLER_MAX_DEPTH` | `crawler.max_depth` |
/// | `CRAWLER_MAX_PAGES` | `crawler.max_pages` |
/// | `CRAWL_DELAY` | `crawler.request_delay_ms` (given in seconds) |
/// | `CRAWLER_CONCURRENCY` | `crawler.concurrency` |
/// | `CRAWLER_STRATEGY` | `crawler.strategy` |
/// | `SHARED_DIR` | `output.directory` |
///
/// The lookup is injected so tests never touch the process environment.
pub fn apply_env_overrides<F>(config: &mut Config, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(districts) = lookup("SCHOOL_DISTRICTS") {
        let seeds: Vec<String> = districts
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
        if !seeds.is_empty() {
            config.seeds = seeds;
        }
    }

    if let Some(value) = lookup("CRAWLER_MAX_DEPTH") {
        config.crawler.max_depth = parse_env("CRAWLER_MAX_DEPTH", &value)?;
    }

    if let Some(value) = lookup("CRAWLER_MAX_PAGES") {
        config.crawler.max_pages = parse_env("CRAWLER_MAX_PAGES", &value)?;
    }

    if let Some(value) = lookup("CRAWL_DELAY") {
        let seconds: f64 = parse_env("CRAWL_DELAY", &value)?;
        if !seconds.is_finite() || seconds < 0.0 {
            return Err(ConfigError::InvalidEnv {
                name: "CRAWL_DELAY".to_string(),
                value,
            });
        }
        config.crawler.request_delay_ms = (seconds * 1000.0).round() as u64;
    }

    if let Some(value) = lookup("CRAWLER_CONCURRENCY") {
        config.crawler.concurrency = parse_env("CRAWLER_CONCURRENCY", &value)?;
    }

    if let Some(value) = lookup("CRAWLER_STRATEGY") {
        config.crawler.strategy =
            StrategyKind::from_str(&value).map_err(|_| ConfigError::InvalidEnv {
                name: "CRAWLER_STRATEGY".to_string(),
                value: value.clone(),
            })?;
    }

    if let Some(dir) = lookup("SHARED_DIR") {
        if !dir.trim().is_empty() {
            config.output.directory = dir.trim().to_string();
        }
    }

    Ok(())
}

fn parse_env<T: FromStr>(name: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidEnv {
        name: name.to_string(),
        value: value.to_string(),
    })
}
