//! Local proposer served by Ollama
//!
//! Non-streaming `/api/chat` calls with `format: "json"`. No credentials.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{prompt_messages, ChatMessage, GenerationSettings, LLMError, LLMProvider, Result};

// Local models on modest hardware can take minutes per answer
const REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

#[derive(Debug, Clone)]
pub struct OllamaProvider {
    base_url: String,
    model: String,
    settings: GenerationSettings,
    client: Client,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    stream: bool,
    format: &'static str,
    options: SamplingOptions,
}

#[derive(Debug, Serialize)]
struct SamplingOptions {
    temperature: f64,
    num_predict: u32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    message: ChatMessage,
}

impl OllamaProvider {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self::with_settings(base_url, model, GenerationSettings::default())
    }

    pub fn with_settings(
        base_url: impl Into<String>,
        model: impl Into<String>,
        settings: GenerationSettings,
    ) -> Self {
        let base_url: String = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.into(),
            settings,
            client: Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .build()
                .unwrap_or_default(),
        }
    }

    fn send_error(&self, err: reqwest::Error) -> LLMError {
        if err.is_connect() {
            LLMError::ProviderUnavailable(format!(
                "Cannot connect to Ollama at {}. Is `ollama serve` running?",
                self.base_url
            ))
        } else {
            LLMError::from_send(err)
        }
    }
}

#[async_trait]
impl LLMProvider for OllamaProvider {
    fn name(&self) -> &str {
        "ollama"
    }

    async fn check_health(&self) -> bool {
        let url = format!("{}/api/tags", self.base_url);
        self.client
            .get(&url)
            .send()
            .await
            .is_ok_and(|r| r.status().is_success())
    }

    async fn complete(&self, prompt: &str) -> Result<String> {
        let messages = prompt_messages(prompt);
        let request = ChatRequest {
            model: &self.model,
            messages: &messages,
            stream: false,
            format: "json",
            options: SamplingOptions {
                temperature: self.settings.temperature,
                num_predict: self.settings.max_tokens,
            },
        };

        let started = std::time::Instant::now();
        let response = self
            .client
            .post(format!("{}/api/chat", self.base_url))
            .json(&request)
            .send()
            .await
            .map_err(|e| self.send_error(e))?;
        tracing::debug!(
            "Ollama answered in {:.1}s",
            started.elapsed().as_secs_f64()
        );

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LLMError::ProviderUnavailable(format!(
                "Ollama returned {}: {}",
                status, body
            )));
        }

        let chat: ChatResponse = response
            .json()
            .await
            .map_err(|e| LLMError::ParseError(format!("Unexpected Ollama response: {}", e)))?;
        Ok(chat.message.content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_normalized() {
        let provider = OllamaProvider::new("http://localhost:11434/", "llama3.1:8b");
        assert_eq!(provider.base_url, "http://localhost:11434");
        assert_eq!(provider.name(), "ollama");
    }

    #[test]
    fn test_request_asks_for_json() {
        let messages = prompt_messages("Hello");
        let request = ChatRequest {
            model: "llama3.1:8b",
            messages: &messages,
            stream: false,
            format: "json",
            options: SamplingOptions {
                temperature: 0.0,
                num_predict: 1024,
            },
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["format"], "json");
        assert_eq!(value["stream"], false);
        assert_eq!(value["options"]["num_predict"], 1024);
        assert_eq!(value["messages"][0]["role"], "system");
    }

    #[test]
    fn test_response_parsing() {
        let body = r#"{"model":"llama3.1:8b","message":{"role":"assistant","content":"{}"},"done":true}"#;
        let parsed: ChatResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.message.content, "{}");
    }
}
