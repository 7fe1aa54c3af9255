//! Page classification
//!
//! Turns extracted page text into a [`ClassificationVerdict`] by asking a
//! hosted language model. Malformed or failed replies degrade to a failure
//! verdict; classification never aborts a crawl.

mod client;
mod verdict;

pub use client::{build_prompt, Classifier, LlmClassifier, MAX_INPUT_CHARS, TEMPERATURE};
pub use verdict::{
    parse_verdict, ClassificationError, ClassificationVerdict, Confidence, FALLBACK_CATEGORY,
};
