use serde::de::Deserializer;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use thiserror::Error;

/// Category used for non-matches and for verdicts that name none
pub const FALLBACK_CATEGORY: &str = "Other";

/// Why a classification attempt produced no usable verdict
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ClassificationError {
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    #[error("transport failure: {0}")]
    Transport(String),
}

/// How sure the model is that the page advertises an opportunity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum Confidence {
    High,
    #[default]
    Medium,
    Low,
}

impl Confidence {
    /// Parses a confidence label, case-insensitively
    ///
    /// Unknown labels read as `Medium`.
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "high" => Confidence::High,
            "low" => Confidence::Low,
            _ => Confidence::Medium,
        }
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Confidence::High => write!(f, "High"),
            Confidence::Medium => write!(f, "Medium"),
            Confidence::Low => write!(f, "Low"),
        }
    }
}

impl<'de> Deserialize<'de> for Confidence {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let label = lenient_string(deserializer)?;
        Ok(Confidence::from_label(&label))
    }
}

/// Structured judgment about one page
///
/// Field names on the wire follow the model's reply format (`is_rfp`,
/// `submission_deadline`); missing fields default to empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationVerdict {
    #[serde(rename = "is_rfp", default, deserialize_with = "lenient_bool")]
    pub is_match: bool,

    #[serde(default = "fallback_category", deserialize_with = "lenient_string")]
    pub category: String,

    #[serde(default)]
    pub confidence: Confidence,

    #[serde(default, deserialize_with = "lenient_string")]
    pub summary: String,

    #[serde(rename = "submission_deadline", default, deserialize_with = "lenient_string")]
    pub deadline: String,

    #[serde(default, deserialize_with = "lenient_string")]
    pub submission_location: String,

    #[serde(default, deserialize_with = "lenient_string")]
    pub contact_email: String,

    #[serde(default, deserialize_with = "lenient_string")]
    pub contact_phone: String,

    #[serde(default, deserialize_with = "lenient_string")]
    pub budget_range: String,

    /// Set when the verdict stands in for a failed classification
    #[serde(rename = "classification_failed", default, skip_deserializing)]
    pub failed: bool,
}

fn fallback_category() -> String {
    FALLBACK_CATEGORY.to_string()
}

/// Accepts a string, a number or null
fn lenient_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s,
        Some(other) => other.to_string(),
    })
}

/// Accepts a boolean or a "true"/"yes" string
fn lenient_bool<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Bool(b)) => b,
        Some(Value::String(s)) => matches!(s.trim().to_ascii_lowercase().as_str(), "true" | "yes"),
        _ => false,
    })
}

impl ClassificationVerdict {
    /// Verdict recorded when classification could not complete
    ///
    /// A failed page is never a match, so a flaky endpoint cannot inflate
    /// the opportunity count.
    pub fn failed(error: &ClassificationError) -> Self {
        Self {
            is_match: false,
            category: fallback_category(),
            confidence: Confidence::Low,
            summary: format!("classification failed: {}", error),
            deadline: String::new(),
            submission_location: String::new(),
            contact_email: String::new(),
            contact_phone: String::new(),
            budget_range: String::new(),
            failed: true,
        }
    }

    /// Whether this verdict stands in for a failed classification
    pub fn is_failure(&self) -> bool {
        self.failed
    }

    /// Trims every field and pins non-matches to the fallback category
    fn normalized(mut self) -> Self {
        for field in [
            &mut self.category,
            &mut self.summary,
            &mut self.deadline,
            &mut self.submission_location,
            &mut self.contact_email,
            &mut self.contact_phone,
            &mut self.budget_range,
        ] {
            let trimmed = field.trim();
            if trimmed.len() != field.len() {
                *field = trimmed.to_string();
            }
        }

        if !self.is_match || self.category.is_empty() {
            self.category = fallback_category();
        }
        self
    }
}

/// Parses a raw model reply into a verdict
///
/// The reply is first parsed as-is. If that fails, the span from the first
/// `{` to the last `}` is parsed instead, which recovers replies wrapped in
/// prose or code fences. Anything else is a malformed response.
///
/// # Example
///
/// ```
/// use bid_scout::classifier::parse_verdict;
///
/// let raw = "Here you go:\n{\"is_rfp\": true, \"category\": \"Transportation\", \"confidence\": \"high\"}";
/// let verdict = parse_verdict(raw).unwrap();
/// assert!(verdict.is_match);
/// assert_eq!(verdict.category, "Transportation");
/// ```
pub fn parse_verdict(raw: &str) -> Result<ClassificationVerdict, ClassificationError> {
    let trimmed = raw.trim();

    let strict_error = match serde_json::from_str::<ClassificationVerdict>(trimmed) {
        Ok(verdict) => return Ok(verdict.normalized()),
        Err(e) => e,
    };

    match (trimmed.find('{'), trimmed.rfind('}')) {
        (Some(start), Some(end)) if start < end => {
            serde_json::from_str::<ClassificationVerdict>(&trimmed[start..=end])
                .map(ClassificationVerdict::normalized)
                .map_err(|e| ClassificationError::MalformedResponse(e.to_string()))
        }
        _ => Err(ClassificationError::MalformedResponse(format!(
            "no JSON object in reply ({})",
            strict_error
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_verdict() {
        let raw = r#"{
            "is_rfp": true,
            "summary": " Student transportation services RFP ",
            "category": "Transportation",
            "submission_deadline": "2024-06-01",
            "submission_location": "Central Office",
            "contact_email": "bids@district.example.org",
            "contact_phone": "859-555-0100",
            "budget_range": "",
            "confidence": "High"
        }"#;

        let verdict = parse_verdict(raw).unwrap();
        assert!(verdict.is_match);
        assert_eq!(verdict.summary, "Student transportation services RFP");
        assert_eq!(verdict.category, "Transportation");
        assert_eq!(verdict.deadline, "2024-06-01");
        assert_eq!(verdict.contact_email, "bids@district.example.org");
        assert_eq!(verdict.confidence, Confidence::High);
        assert!(!verdict.is_failure());
    }

    #[test]
    fn test_parse_embedded_json() {
        let raw = "```json\n{\"is_rfp\": false, \"summary\": \"Lunch menu\"}\n```";
        let verdict = parse_verdict(raw).unwrap();
        assert!(!verdict.is_match);
        assert_eq!(verdict.summary, "Lunch menu");
    }

    #[test]
    fn test_missing_confidence_defaults_to_medium() {
        let verdict = parse_verdict(r#"{"is_rfp": true, "category": "Technology"}"#).unwrap();
        assert_eq!(verdict.confidence, Confidence::Medium);
    }

    #[test]
    fn test_confidence_is_case_insensitive() {
        assert_eq!(Confidence::from_label("LOW"), Confidence::Low);
        assert_eq!(Confidence::from_label(" high "), Confidence::High);
        assert_eq!(Confidence::from_label("certain"), Confidence::Medium);
    }

    #[test]
    fn test_non_match_forces_fallback_category() {
        let verdict = parse_verdict(r#"{"is_rfp": false, "category": "Technology"}"#).unwrap();
        assert_eq!(verdict.category, FALLBACK_CATEGORY);
    }

    #[test]
    fn test_match_without_category_gets_fallback() {
        let verdict = parse_verdict(r#"{"is_rfp": true, "category": null}"#).unwrap();
        assert_eq!(verdict.category, FALLBACK_CATEGORY);
    }

    #[test]
    fn test_lenient_field_types() {
        let raw = r#"{"is_rfp": "true", "budget_range": 50000, "contact_phone": null}"#;
        let verdict = parse_verdict(raw).unwrap();
        assert!(verdict.is_match);
        assert_eq!(verdict.budget_range, "50000");
        assert_eq!(verdict.contact_phone, "");
    }

    #[test]
    fn test_failed_flag_is_not_read_from_reply() {
        let verdict = parse_verdict(r#"{"is_rfp": true, "classification_failed": true}"#).unwrap();
        assert!(!verdict.is_failure());
    }

    #[test]
    fn test_malformed_replies() {
        for raw in ["", "not json at all", "} backwards {", "{\"is_rfp\": tru"] {
            assert!(
                matches!(parse_verdict(raw), Err(ClassificationError::MalformedResponse(_))),
                "expected malformed for {:?}",
                raw
            );
        }
    }

    #[test]
    fn test_failure_verdict() {
        let error = ClassificationError::Transport("HTTP 500".to_string());
        let verdict = ClassificationVerdict::failed(&error);

        assert!(!verdict.is_match);
        assert!(verdict.is_failure());
        assert_eq!(verdict.category, FALLBACK_CATEGORY);
        assert_eq!(verdict.confidence, Confidence::Low);
        assert_eq!(verdict.summary, "classification failed: transport failure: HTTP 500");
    }

    #[test]
    fn test_serialized_field_names() {
        let verdict = parse_verdict(r#"{"is_rfp": true, "submission_deadline": "May 1"}"#).unwrap();
        let json = serde_json::to_value(&verdict).unwrap();

        assert_eq!(json["is_rfp"], true);
        assert_eq!(json["submission_deadline"], "May 1");
        assert_eq!(json["confidence"], "Medium");
        assert_eq!(json["classification_failed"], false);
    }
}
