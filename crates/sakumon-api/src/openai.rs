//! OpenAI-compatible chat-completions client.

use async_trait::async_trait;
use sakumon_core::{PipelineConfig, ServiceError, TextGenerator};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const REQUEST_TIMEOUT_SECS: u64 = 60;

/// [`TextGenerator`] backed by a chat-completions endpoint.
///
/// The base URL is overridable with `OPENAI_BASE_URL`, so any
/// OpenAI-compatible server works.
pub struct OpenAiGenerator {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    temperature: f32,
}

impl OpenAiGenerator {
    pub fn from_env(config: &PipelineConfig) -> Result<Self, ServiceError> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| ServiceError::Auth("OPENAI_API_KEY is not set".to_string()))?;
        let base_url = std::env::var("OPENAI_BASE_URL")
            .unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| ServiceError::Malformed(e.to_string()))?;
        Ok(Self {
            client,
            base_url,
            api_key,
            model: config.model.clone(),
            temperature: config.temperature,
        })
    }
}

#[async_trait]
impl TextGenerator for OpenAiGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, ServiceError> {
        let payload = json!({
            "model": self.model,
            "temperature": self.temperature,
            "messages": [{"role": "user", "content": prompt}],
        });
        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ServiceError::Timeout(REQUEST_TIMEOUT_SECS)
                } else {
                    ServiceError::Malformed(e.to_string())
                }
            })?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(ServiceError::Auth(format!("endpoint returned {status}")));
        }
        if !status.is_success() {
            return Err(ServiceError::Malformed(format!("endpoint returned {status}")));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| ServiceError::Malformed(e.to_string()))?;
        let content = body
            .get("choices")
            .and_then(|c| c.get(0))
            .and_then(|c| c.pointer("/message/content"))
            .and_then(Value::as_str)
            .unwrap_or_default();
        if content.trim().is_empty() {
            return Err(ServiceError::EmptyResponse);
        }
        debug!(model = %self.model, chars = content.len(), "completion received");
        Ok(content.to_string())
    }
}
