//! Content extractor: raw markup to token-dense plain text
//!
//! The output is classifier input, not a transcript. Non-content subtrees
//! are skipped, every text fragment is trimmed, and the survivors are joined
//! with single spaces.

use scraper::{ElementRef, Html, Node};
use thiserror::Error;

/// Elements whose subtrees never contribute text
const SKIPPED_ELEMENTS: &[&str] = &[
    "script", "style", "noscript", "template", "nav", "header", "footer", "svg",
];

/// Default minimum length of normalized text worth classifying
pub const DEFAULT_MIN_TEXT_LENGTH: usize = 50;

/// Extraction outcomes that stop a page before classification
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExtractionError {
    #[error("page text below minimum length ({length} < {minimum} chars)")]
    BelowMinimumLength { length: usize, minimum: usize },
}

/// Extracts normalized text from an HTML document
///
/// # Example
///
/// ```
/// use bid_scout::crawler::extract_text;
///
/// let html = "<html><body><nav>Home | About</nav><p>  Sealed bids due\n  May 1 </p><script>x()</script></body></html>";
/// assert_eq!(extract_text(html), "Sealed bids due May 1");
/// ```
pub fn extract_text(html: &str) -> String {
    let document = Html::parse_document(html);

    let mut raw = String::new();
    collect_text(document.root_element(), &mut raw);

    normalize_whitespace(&raw)
}

/// Walks an element tree, appending text outside skipped subtrees
fn collect_text(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => {
                out.push_str(text);
                out.push('\n');
            }
            Node::Element(el) => {
                if SKIPPED_ELEMENTS.contains(&el.name()) {
                    continue;
                }
                if let Some(child_element) = ElementRef::wrap(child) {
                    collect_text(child_element, out);
                }
            }
            _ => {}
        }
    }
}

/// Collapses whitespace the way the classifier expects its input
///
/// Splits into lines, strips each, splits lines again on runs of two spaces,
/// drops empty fragments and joins the rest with single spaces.
pub fn normalize_whitespace(text: &str) -> String {
    let mut fragments: Vec<&str> = Vec::new();

    for line in text.lines() {
        for phrase in line.trim().split("  ") {
            let phrase = phrase.trim();
            if !phrase.is_empty() {
                fragments.push(phrase);
            }
        }
    }

    fragments.join(" ")
}

/// Rejects text that is too short to be worth a classification call
pub fn ensure_min_length(text: &str, minimum: usize) -> Result<(), ExtractionError> {
    let length = text.chars().count();
    if length < minimum {
        return Err(ExtractionError::BelowMinimumLength { length, minimum });
    }
    Ok(())
}

/// Returns at most `max_chars` characters of `text`, on a char boundary
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
