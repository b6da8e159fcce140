//! OpenAI-compatible chat completions backend
//!
//! Works against api.openai.com and any server speaking the same
//! `/chat/completions` protocol. Responses are requested in JSON mode.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use super::{prompt_messages, ChatMessage, GenerationSettings, LLMError, LLMProvider, Result};
use crate::config::OpenAIConfig;
use crate::secrets::{scrub_secrets, SecretCache};

/// Name of the secret holding the API key
pub const OPENAI_API_KEY: &str = "openai_api_key";

pub struct OpenAIProvider {
    config: OpenAIConfig,
    settings: GenerationSettings,
    secrets: Arc<SecretCache>,
    client: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f64,
    max_tokens: u32,
    response_format: ResponseFormat,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

impl OpenAIProvider {
    pub fn new(
        config: OpenAIConfig,
        settings: GenerationSettings,
        secrets: Arc<SecretCache>,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_default();

        Self {
            config,
            settings,
            secrets,
            client,
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'))
    }
}

/// Error for a non-2xx status
fn status_error(status: reqwest::StatusCode, body: &str) -> LLMError {
    let body = scrub_secrets(body);
    match status.as_u16() {
        401 | 403 => LLMError::AuthenticationFailed(body),
        429 => LLMError::RateLimitExceeded,
        500..=599 => LLMError::ProviderUnavailable(format!("HTTP {}: {}", status, body)),
        _ => LLMError::InvalidRequest(format!("HTTP {}: {}", status, body)),
    }
}

#[async_trait]
impl LLMProvider for OpenAIProvider {
    fn name(&self) -> &str {
        "openai"
    }

    async fn check_health(&self) -> bool {
        self.secrets.get_secret(OPENAI_API_KEY).is_ok()
    }

    async fn complete(&self, prompt: &str) -> Result<String> {
        let api_key = self
            .secrets
            .get_secret(OPENAI_API_KEY)
            .map_err(|e| LLMError::AuthenticationFailed(e.to_string()))?;

        let messages = prompt_messages(prompt);
        let request = CompletionRequest {
            model: &self.config.model,
            messages: &messages,
            temperature: self.settings.temperature,
            max_tokens: self.settings.max_tokens,
            response_format: ResponseFormat {
                kind: "json_object",
            },
        };
        tracing::debug!(
            "OpenAI request: model={}, prompt_chars={}",
            self.config.model,
            prompt.len()
        );

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(api_key.expose())
            .json(&request)
            .send()
            .await
            .map_err(LLMError::from_send)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(status, &body));
        }

        let completion: CompletionResponse = response
            .json()
            .await
            .map_err(|e| LLMError::ParseError(e.to_string()))?;

        completion
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| LLMError::ParseError("No choices in response".to_string()))?
            .message
            .content
            .ok_or_else(|| LLMError::ParseError("Empty content".to_string()))
    }
}
