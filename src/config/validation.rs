use crate::config::types::{ClassifierConfig, Config, CrawlerConfig, FetchConfig, OutputConfig};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_fetch_config(&config.fetch)?;
    validate_classifier_config(&config.classifier)?;
    validate_output_config(&config.output)?;
    validate_seeds(&config.seeds)?;
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    // max_depth >= 0 is always true for u32; the upper bound keeps crawls shallow
    if config.max_depth > 10 {
        return Err(ConfigError::Validation(format!(
            "max_depth must be <= 10, got {}",
            config.max_depth
        )));
    }

    if config.max_pages < 1 {
        return Err(ConfigError::Validation(format!(
            "max_pages must be >= 1, got {}",
            config.max_pages
        )));
    }

    if config.concurrency < 1 || config.concurrency > 5 {
        return Err(ConfigError::Validation(format!(
            "concurrency must be between 1 and 5, got {}",
            config.concurrency
        )));
    }

    if config.request_delay_ms < 100 {
        return Err(ConfigError::Validation(format!(
            "request_delay_ms must be >= 100ms, got {}ms",
            config.request_delay_ms
        )));
    }

    for path in &config.priority_paths {
        if !path.starts_with('/') {
            return Err(ConfigError::Validation(format!(
                "priority path '{}' must start with '/'",
                path
            )));
        }
    }

    Ok(())
}

/// Validates fetch configuration
fn validate_fetch_config(config: &FetchConfig) -> Result<(), ConfigError> {
    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user_agent cannot be empty".to_string(),
        ));
    }

    if config.timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "timeout_secs must be >= 1".to_string(),
        ));
    }

    if config.navigation_timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "navigation_timeout_secs must be >= 1".to_string(),
        ));
    }

    if config.max_body_prefix == 0 {
        return Err(ConfigError::Validation(
            "max_body_prefix must be >= 1".to_string(),
        ));
    }

    Ok(())
}

/// Validates classifier configuration
fn validate_classifier_config(config: &ClassifierConfig) -> Result<(), ConfigError> {
    let endpoint = Url::parse(&config.endpoint)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid classifier endpoint: {}", e)))?;

    if endpoint.scheme() != "http" && endpoint.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "Classifier endpoint '{}' must use HTTP or HTTPS",
            config.endpoint
        )));
    }

    if config.model.trim().is_empty() {
        return Err(ConfigError::Validation("model cannot be empty".to_string()));
    }

    if config.api_key_env.trim().is_empty() {
        return Err(ConfigError::Validation(
            "api_key_env cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.directory.trim().is_empty() {
        return Err(ConfigError::Validation(
            "output directory cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates seed URLs: at least one, each absolute HTTP(S) with a host
fn validate_seeds(seeds: &[String]) -> Result<(), ConfigError> {
    if seeds.is_empty() {
        return Err(ConfigError::Validation(
            "at least one seed URL is required".to_string(),
        ));
    }

    for seed in seeds {
        let url = Url::parse(seed)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid seed URL '{}': {}", seed, e)))?;

        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(ConfigError::Validation(format!(
                "Seed URL '{}' must use HTTP or HTTPS",
                seed
            )));
        }

        if url.host_str().is_none() {
            return Err(ConfigError::InvalidUrl(format!(
                "Seed URL '{}' has no host",
                seed
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate(&Config::default()).is_ok());
    }

    #[test]
    fn test_concurrency_bounds() {
        let mut config = Config::default();
        config.crawler.concurrency = 0;
        assert!(validate(&config).is_err());

        config.crawler.concurrency = 6;
        assert!(validate(&config).is_err());

        config.crawler.concurrency = 5;
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_delay_floor() {
        let mut config = Config::default();
        config.crawler.request_delay_ms = 99;
        assert!(matches!(validate(&config), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_depth_zero_allowed() {
        let mut config = Config::default();
        config.crawler.max_depth = 0;
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_validate_seeds() {
        assert!(validate_seeds(&["https://example.org".to_string()]).is_ok());
        assert!(validate_seeds(&["http://example.org/path".to_string()]).is_ok());

        assert!(validate_seeds(&[]).is_err());
        assert!(validate_seeds(&["example.org".to_string()]).is_err());
        assert!(validate_seeds(&["ftp://example.org".to_string()]).is_err());
    }

    #[test]
    fn test_priority_paths_must_be_absolute() {
        let mut config = Config::default();
        config.crawler.priority_paths = vec!["bids".to_string()];
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_classifier_endpoint_must_be_url() {
        let mut config = Config::default();
        config.classifier.endpoint = "not a url".to_string();
        assert!(matches!(validate(&config), Err(ConfigError::InvalidUrl(_))));
    }
}
