use url::Url;

/// Extracts the lowercase host from a URL
///
/// # Examples
///
/// ```
/// use url::Url;
/// use bid_scout::url::extract_domain;
///
/// let url = Url::parse("https://Boone.KySchools.us/bids").unwrap();
/// assert_eq!(extract_domain(&url), Some("boone.kyschools.us".to_string()));
/// ```
pub fn extract_domain(url: &Url) -> Option<String> {
    url.host_str().map(|h| h.to_lowercase())
}

/// Returns the site key used for scope decisions
///
/// This is the host with a leading `www.` removed. Public suffix rules are not
/// consulted, so sibling districts under `kyschools.us` stay separate sites.
///
/// # Examples
///
/// ```
/// use bid_scout::url::registrable_domain;
///
/// assert_eq!(registrable_domain("www.boone.kyschools.us"), "boone.kyschools.us");
/// assert_eq!(registrable_domain("Example.ORG"), "example.org");
/// ```
pub fn registrable_domain(host: &str) -> String {
    let host = host.trim_end_matches('.').to_lowercase();
    match host.strip_prefix("www.") {
        Some(rest) if !rest.is_empty() => rest.to_string(),
        _ => host,
    }
}

/// Origin key (`scheme://host:port`) used for per-origin pacing
pub fn origin_key(url: &Url) -> String {
    url.origin().ascii_serialization()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_simple_domain() {
        let url = Url::parse("https://example.org/").unwrap();
        assert_eq!(extract_domain(&url), Some("example.org".to_string()));
    }

    #[test]
    fn test_extract_with_port() {
        let url = Url::parse("https://example.org:8080/").unwrap();
        assert_eq!(extract_domain(&url), Some("example.org".to_string()));
    }

    #[test]
    fn test_registrable_domain_strips_www_only_once() {
        assert_eq!(registrable_domain("www.example.org"), "example.org");
        assert_eq!(registrable_domain("www.www.example.org"), "www.example.org");
        assert_eq!(registrable_domain("blog.example.org"), "blog.example.org");
    }

    #[test]
    fn test_registrable_domain_trailing_dot() {
        assert_eq!(registrable_domain("example.org."), "example.org");
    }

    #[test]
    fn test_bare_www_host_is_kept() {
        assert_eq!(registrable_domain("www."), "www");
    }

    #[test]
    fn test_origin_key_includes_port() {
        let a = Url::parse("http://127.0.0.1:4000/a").unwrap();
        let b = Url::parse("http://127.0.0.1:4001/a").unwrap();
        assert_ne!(origin_key(&a), origin_key(&b));
        assert_eq!(origin_key(&a), "http://127.0.0.1:4000");
    }
}
