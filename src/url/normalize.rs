use crate::UrlError;
use url::Url;

/// List of tracking query parameters to remove during normalization
const TRACKING_PARAMS: &[&str] = &[
    "fbclid",
    "gclid",
    "mc_cid",
    "mc_eid",
    "msclkid",
    "_ga",
];

/// Normalizes a URL so that equivalent spellings share one visited-set entry
///
/// # Normalization Steps
///
/// 1. Parse the URL; reject if malformed
/// 2. Reject anything but `http` and `https`
/// 3. Lowercase the host (the `url` crate does this on parse)
/// 4. Normalize path:
///    - Remove dot segments and empty segments
///    - Remove trailing slash (except for root /)
///    - Empty path becomes /
/// 5. Remove fragment (everything after #)
/// 6. Remove tracking query parameters (`utm_*`, click ids)
/// 7. Remove empty query string (trailing ?)
///
/// The host is never rewritten; `www.` and bare hosts stay distinct URLs.
///
/// # Examples
///
/// ```
/// use bid_scout::url::normalize_url;
///
/// let url = normalize_url("https://District.Example.org/bids/#open").unwrap();
/// assert_eq!(url.as_str(), "https://district.example.org/bids");
/// ```
pub fn normalize_url(url_str: &str) -> Result<Url, UrlError> {
    let mut url = fetch_target(url_str)?;

    let normalized_path = normalize_path(url.path());
    url.set_path(&normalized_path);

    if url.query().is_some() {
        let kept: Vec<(String, String)> = url
            .query_pairs()
            .filter(|(key, _)| !is_tracking_param(key))
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();

        if kept.is_empty() {
            url.set_query(None);
        } else {
            url.query_pairs_mut().clear().extend_pairs(kept);
        }
    }

    Ok(url)
}

/// Parses a discovered link into the URL that is actually requested
///
/// Only the fragment is removed. Path spelling, trailing slashes and query
/// are kept as written, since servers may treat `/bids` and `/bids/` as
/// different resources. Use [`normalize_url`] for the dedup key.
///
/// # Examples
///
/// ```
/// use bid_scout::url::fetch_target;
///
/// let url = fetch_target("https://example.org/bids/#open").unwrap();
/// assert_eq!(url.as_str(), "https://example.org/bids/");
/// ```
pub fn fetch_target(url_str: &str) -> Result<Url, UrlError> {
    let mut url = Url::parse(url_str.trim()).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }

    if url.host_str().map_or(true, str::is_empty) {
        return Err(UrlError::MissingDomain);
    }

    url.set_fragment(None);
    Ok(url)
}

/// Normalizes a URL path by removing dot segments and trailing slashes
fn normalize_path(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();

    for segment in path.split('/') {
        match segment {
            "" | "." => continue,
            ".." => {
                segments.pop();
            }
            _ => segments.push(segment),
        }
    }

    if segments.is_empty() {
        "/".to_string()
    } else {
        format!("/{}", segments.join("/"))
    }
}

/// Checks if a query parameter is a tracking parameter
fn is_tracking_param(key: &str) -> bool {
    key.starts_with("utm_") || TRACKING_PARAMS.contains(&key)
}
