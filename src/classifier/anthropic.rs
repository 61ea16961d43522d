// src/classifier/anthropic.rs
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header;
use serde::Deserialize;

use crate::classifier::prompt::SYSTEM_PROMPT;
use crate::classifier::EvidenceClassifier;
use crate::utils::error::ClassifierError;

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const REQUEST_TIMEOUT_SECS: u64 = 120;
// Returned when the API is overloaded; handled the same way as 429
const STATUS_OVERLOADED: u16 = 529;

pub const DEFAULT_MODEL: &str = "claude-3-haiku-20240307";
pub const DEFAULT_MAX_TOKENS: u32 = 600;

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

/// Classifies fragments through the Anthropic Messages API.
pub struct AnthropicClassifier {
    client: reqwest::Client,
    api_key: String,
    model: String,
    max_tokens: u32,
    endpoint: String,
}

impl AnthropicClassifier {
    pub fn new(api_key: &str, model: &str, max_tokens: u32) -> Result<Self, ClassifierError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            api_key: api_key.to_string(),
            model: model.to_string(),
            max_tokens,
            endpoint: ANTHROPIC_API_URL.to_string(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl EvidenceClassifier for AnthropicClassifier {
    async fn classify(&self, fragment: &str) -> Result<String, ClassifierError> {
        let body = serde_json::json!({
            "model": self.model,
            "max_tokens": self.max_tokens,
            "system": SYSTEM_PROMPT,
            "messages": [{ "role": "user", "content": fragment }],
        });

        let response = self.client.post(&self.endpoint)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header(header::CONTENT_TYPE, "application/json")
            .json(&body)
            .send()
            .await?; // Propagates reqwest::Error as ClassifierError::Network

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS || status.as_u16() == STATUS_OVERLOADED {
            tracing::warn!("Classifier signalled rate limiting ({})", status);
            return Err(ClassifierError::RateLimited);
        }
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            tracing::error!("Classifier HTTP error {}: {}", status, detail);
            return Err(ClassifierError::Http(status));
        }

        let parsed: MessagesResponse = response.json().await?;
        let text = parsed
            .content
            .into_iter()
            .filter(|block| block.kind == "text")
            .filter_map(|block| block.text)
            .collect::<Vec<_>>()
            .join("");

        if text.trim().is_empty() {
            return Err(ClassifierError::EmptyReply("no text content blocks".to_string()));
        }
        tracing::debug!("Classifier replied with {} chars", text.len());
        Ok(text)
    }
}
