//! OpenAI-compatible chat-completions adapter for the reasoner seam.
//!
//! Point `REASONER_BASE_URL` at any OpenAI-compatible endpoint (including a
//! local Ollama / LM Studio server) for fully self-hosted inference. The
//! adapter is deliberately thin: prompts, routing, timeouts, fallback, and
//! repair all live behind the `Reasoner` trait boundary.

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;

use crate::core::error::AuditError;
use crate::core::services::{ReasonRequest, Reasoner};

pub struct OpenAiReasoner {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl OpenAiReasoner {
    pub fn new(http: reqwest::Client, base_url: String, api_key: Option<String>) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        }
    }

    /// Base URL: `REASONER_BASE_URL` → `OPENAI_BASE_URL` → the public API.
    /// API key: `REASONER_API_KEY` → `OPENAI_API_KEY` → none (key-less local
    /// endpoints).
    pub fn from_env(http: reqwest::Client) -> Self {
        let base_url = ["REASONER_BASE_URL", "OPENAI_BASE_URL"]
            .iter()
            .find_map(|k| std::env::var(k).ok().filter(|v| !v.trim().is_empty()))
            .unwrap_or_else(|| "https://api.openai.com/v1".to_string());
        let api_key = ["REASONER_API_KEY", "OPENAI_API_KEY"]
            .iter()
            .find_map(|k| std::env::var(k).ok().filter(|v| !v.trim().is_empty()));
        Self::new(http, base_url, api_key)
    }
}

#[async_trait]
impl Reasoner for OpenAiReasoner {
    async fn generate(&self, request: &ReasonRequest) -> Result<String, AuditError> {
        let mut body = json!({
            "model": request.model,
            "messages": [
                {"role": "system", "content": request.system},
                {"role": "user", "content": request.user},
            ],
            "temperature": request.config.temperature,
            "top_p": request.config.top_p,
            "max_tokens": request.config.max_output_tokens,
        });
        if request.config.json_response {
            body["response_format"] = json!({"type": "json_object"});
        }

        let mut http_request = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .json(&body);
        if let Some(key) = &self.api_key {
            http_request = http_request.bearer_auth(key);
        }

        let response = http_request
            .send()
            .await
            .map_err(|e| AuditError::ReasonerUpstream(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(AuditError::ReasonerUpstream(format!(
                "HTTP {status}: {}",
                detail.chars().take(200).collect::<String>()
            )));
        }

        let payload: Value = response
            .json()
            .await
            .map_err(|e| AuditError::ReasonerUpstream(format!("invalid response body: {e}")))?;

        let content = payload["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| {
                AuditError::ReasonerUpstream("response carried no message content".to_string())
            })?;

        debug!(model = %request.model, chars = content.len(), "reasoner responded");
        Ok(content.to_string())
    }
}
