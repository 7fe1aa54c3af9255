use crate::classifier::verdict::{parse_verdict, ClassificationError, ClassificationVerdict};
use crate::config::ClassifierConfig;
use crate::crawler::truncate_chars;
use crate::ScoutError;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

/// Characters of page text sent with each request
pub const MAX_INPUT_CHARS: usize = 4000;

/// Sampling temperature; kept low so verdicts are repeatable
pub const TEMPERATURE: f32 = 0.1;

const API_VERSION: &str = "2023-06-01";

/// Anything that can judge a page's text
///
/// Implementations never fail: a classification that cannot complete
/// yields [`ClassificationVerdict::failed`] instead.
#[async_trait]
pub trait Classifier: Send + Sync {
    async fn classify(&self, text: &str, source_url: &str) -> ClassificationVerdict;
}

/// Builds the instruction sent for one page
pub fn build_prompt(text: &str, source_url: &str) -> String {
    format!(
        r#"You are analyzing a school district website page to find RFP (Request for Proposal) opportunities.

Look for RFPs related to:
- Technology services and equipment
- Construction and facilities
- Transportation services
- Food services and catering
- Educational services and curriculum
- Insurance and employee benefits
- Professional services (legal, accounting, consulting)
- Maintenance and facility services
- Security services
- Any other procurement opportunities

Given this page content from {url}:
{content}

Return JSON only (no other text):
{{
  "is_rfp": true or false,
  "summary": "Brief summary of the RFP or page content",
  "category": "Technology|Construction|Transportation|Food Services|Professional Services|Insurance|Other",
  "submission_deadline": "Deadline date if found, otherwise empty string",
  "submission_location": "Where to submit if found, otherwise empty string",
  "contact_email": "Contact email if found, otherwise empty string",
  "contact_phone": "Contact phone if found, otherwise empty string",
  "budget_range": "Budget information if found, otherwise empty string",
  "confidence": "High|Medium|Low based on how certain you are this is an RFP"
}}"#,
        url = source_url,
        content = truncate_chars(text, MAX_INPUT_CHARS),
    )
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

/// Classifier backed by a hosted messages API
pub struct LlmClassifier {
    client: Client,
    endpoint: String,
    model: String,
    max_tokens: u32,
    api_key: String,
}

impl LlmClassifier {
    /// Creates a classifier with an explicit API key
    pub fn new(config: &ClassifierConfig, api_key: impl Into<String>) -> Result<Self, ScoutError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            api_key: api_key.into(),
        })
    }

    /// Creates a classifier, reading the API key from the configured variable
    pub fn from_env(config: &ClassifierConfig) -> Result<Self, ScoutError> {
        let api_key = std::env::var(&config.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| ScoutError::MissingApiKey(config.api_key_env.clone()))?;

        Self::new(config, api_key)
    }

    /// Sends one prompt and returns the reply text
    async fn complete(&self, prompt: &str) -> Result<String, ClassificationError> {
        let body = json!({
            "model": self.model,
            "max_tokens": self.max_tokens,
            "temperature": TEMPERATURE,
            "messages": [{ "role": "user", "content": prompt }],
        });

        let response = self
            .client
            .post(&self.endpoint)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(|e| ClassificationError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(ClassificationError::Transport(format!(
                "HTTP {}: {}",
                status.as_u16(),
                truncate_chars(detail.trim(), 200)
            )));
        }

        let envelope: MessagesResponse = response
            .json()
            .await
            .map_err(|e| ClassificationError::MalformedResponse(format!("unreadable envelope: {}", e)))?;

        envelope
            .content
            .into_iter()
            .filter(|block| block.kind == "text")
            .find_map(|block| block.text)
            .ok_or_else(|| ClassificationError::MalformedResponse("reply has no text content".to_string()))
    }
}

#[async_trait]
impl Classifier for LlmClassifier {
    async fn classify(&self, text: &str, source_url: &str) -> ClassificationVerdict {
        let prompt = build_prompt(text, source_url);

        let outcome = match self.complete(&prompt).await {
            Ok(reply) => parse_verdict(&reply),
            Err(e) => Err(e),
        };

        match outcome {
            Ok(verdict) => {
                tracing::debug!(
                    "Classified {}: match={} category={} confidence={}",
                    source_url,
                    verdict.is_match,
                    verdict.category,
                    verdict.confidence
                );
                verdict
            }
            Err(e) => {
                tracing::warn!("Classification failed for {}: {}", source_url, e);
                ClassificationVerdict::failed(&e)
            }
        }
    }
}
