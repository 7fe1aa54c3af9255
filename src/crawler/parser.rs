//! HTML parser for extracting links and the page title
//!
//! Both fetch strategies hand their markup to this module, so a static
//! response and a rendered DOM snapshot produce links the same way.

use scraper::{Html, Selector};
use url::Url;

/// Title and outbound links of an HTML page
#[derive(Debug, Clone, Default)]
pub struct ParsedPage {
    /// The page title (from `<title>`, falling back to the first `<h1>`)
    pub title: Option<String>,

    /// Absolute HTTP(S) links in document order
    pub links: Vec<String>,
}

/// Parses HTML content and extracts the title and outbound links
///
/// # Link Extraction Rules
///
/// **Include:**
/// - `<a href="...">` and `<area href="...">` anywhere in the document,
///   including navigation chrome (menus are where procurement pages hide)
/// - Download links; bid packets are often offered that way
///
/// **Exclude:**
/// - `javascript:`, `mailto:`, `tel:` and `data:` links
/// - Fragment-only links (same page anchors)
/// - Non-HTTP(S) URLs after resolution
///
/// Relative links resolve against `<base href>` when present, otherwise
/// against `base_url`.
///
/// # Example
///
/// ```
/// use bid_scout::crawler::parse_html;
/// use url::Url;
///
/// let html = r#"<html><head><title>Bids</title></head><body><a href="/rfp">Open RFPs</a></body></html>"#;
/// let base_url = Url::parse("https://district.example.org/").unwrap();
/// let parsed = parse_html(html, &base_url);
/// assert_eq!(parsed.title.as_deref(), Some("Bids"));
/// assert_eq!(parsed.links, vec!["https://district.example.org/rfp".to_string()]);
/// ```
pub fn parse_html(html: &str, base_url: &Url) -> ParsedPage {
    let document = Html::parse_document(html);

    let base = document_base(&document, base_url);
    let title = extract_title(&document);
    let links = extract_links(&document, &base);

    ParsedPage { title, links }
}

/// Resolves the effective base URL from a `<base href>` element
fn document_base(document: &Html, base_url: &Url) -> Url {
    let Ok(selector) = Selector::parse("base[href]") else {
        return base_url.clone();
    };

    document
        .select(&selector)
        .next()
        .and_then(|element| element.value().attr("href"))
        .and_then(|href| base_url.join(href.trim()).ok())
        .unwrap_or_else(|| base_url.clone())
}

/// Extracts the page title from the HTML document
fn extract_title(document: &Html) -> Option<String> {
    for selector_str in ["title", "h1"] {
        let Ok(selector) = Selector::parse(selector_str) else {
            continue;
        };

        let title = document
            .select(&selector)
            .next()
            .map(|element| {
                element
                    .text()
                    .collect::<String>()
                    .split_whitespace()
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .filter(|s| !s.is_empty());

        if title.is_some() {
            return title;
        }
    }

    None
}

/// Extracts all followable links from the HTML document
fn extract_links(document: &Html, base_url: &Url) -> Vec<String> {
    let Ok(selector) = Selector::parse("a[href], area[href]") else {
        return Vec::new();
    };

    document
        .select(&selector)
        .filter_map(|element| element.value().attr("href"))
        .filter_map(|href| resolve_link(href, base_url))
        .collect()
}

/// Resolves a link href to an absolute URL and validates it
///
/// Returns None if the link should be excluded.
fn resolve_link(href: &str, base_url: &Url) -> Option<String> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let lower = href.to_ascii_lowercase();
    if lower.starts_with("javascript:")
        || lower.starts_with("mailto:")
        || lower.starts_with("tel:")
        || lower.starts_with("data:")
    {
        return None;
    }

    let absolute_url = base_url.join(href).ok()?;
    match absolute_url.scheme() {
        "http" | "https" => Some(absolute_url.to_string()),
        _ => None,
    }
}
