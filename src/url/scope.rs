use crate::url::domain::{extract_domain, registrable_domain};
use crate::url::normalize::{fetch_target, normalize_url};
use crate::UrlError;
use std::collections::HashSet;
use url::Url;

/// Same-site scope derived from a seed URL
///
/// A link is in scope when its host, with any leading `www.` removed, is the
/// seed's site or a subdomain of it. Scheme and port are not part of the
/// decision, so `http://` links on an `https://` seed are kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkScope {
    site: String,
}

impl LinkScope {
    /// Builds the scope for a seed URL
    pub fn for_seed(seed: &Url) -> Result<Self, UrlError> {
        let host = extract_domain(seed).ok_or(UrlError::MissingDomain)?;
        Ok(Self {
            site: registrable_domain(&host),
        })
    }

    /// The site key every in-scope host must match
    pub fn site(&self) -> &str {
        &self.site
    }

    /// Returns true when the URL belongs to this scope
    pub fn contains(&self, url: &Url) -> bool {
        match extract_domain(url) {
            Some(host) => is_same_site(&self.site, &registrable_domain(&host)),
            None => false,
        }
    }

    /// Filters raw outbound links down to in-scope fetch targets
    ///
    /// Links that fail to parse (non-HTTP schemes, garbage) are dropped.
    /// Each returned URL keeps its own spelling minus the fragment; links
    /// whose normalized forms match collapse to their first occurrence, so
    /// the output keeps the page's link order.
    pub fn scope_links<S: AsRef<str>>(&self, links: &[S]) -> Vec<Url> {
        let mut seen = HashSet::new();
        let mut scoped = Vec::new();

        for link in links {
            let target = match fetch_target(link.as_ref()) {
                Ok(url) => url,
                Err(e) => {
                    tracing::trace!("Dropping link {}: {}", link.as_ref(), e);
                    continue;
                }
            };

            if !self.contains(&target) {
                continue;
            }

            let Ok(key) = normalize_url(target.as_str()) else {
                continue;
            };
            if seen.insert(key.as_str().to_string()) {
                scoped.push(target);
            }
        }

        scoped
    }
}

/// Checks whether `candidate` is `site` itself or one of its subdomains
fn is_same_site(site: &str, candidate: &str) -> bool {
    candidate == site
        || candidate
            .strip_suffix(site)
            .map_or(false, |prefix| prefix.ends_with('.'))
}
