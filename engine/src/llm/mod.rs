//! Proposer providers
//!
//! The language model is the proposer of the design loop: a black box that
//! takes a prompt and returns text. [`LLMProvider`] is the seam every caller
//! depends on. The OpenAI-compatible and Ollama backends live in the
//! submodules, together with the retrying wrapper that absorbs transient
//! failures.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub mod ollama;
pub mod openai;
pub mod retry;

pub use retry::{RetryPolicy, RetryingProvider};

pub type Result<T> = std::result::Result<T, LLMError>;

/// System message sent ahead of every prompt
pub const SYSTEM_PROMPT: &str = "You are an expert in control engineering design.";

#[derive(Debug, thiserror::Error)]
pub enum LLMError {
    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Timeout")]
    Timeout,

    #[error("Parse error: {0}")]
    ParseError(String),
}

impl LLMError {
    /// Worth retrying after a pause
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            LLMError::RateLimitExceeded
                | LLMError::NetworkError(_)
                | LLMError::Timeout
                | LLMError::ProviderUnavailable(_)
        )
    }

    /// Map a reqwest send failure
    pub(crate) fn from_send(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            LLMError::Timeout
        } else {
            LLMError::NetworkError(crate::secrets::scrub_secrets(&err.to_string()))
        }
    }
}

impl From<LLMError> for sdk::EngineError {
    fn from(err: LLMError) -> Self {
        sdk::EngineError::LLMProvider(err.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// Chat message in the wire shape both backends accept
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// Conversation sent for one prompt: the fixed system message, then the prompt
pub fn prompt_messages(prompt: &str) -> [ChatMessage; 2] {
    [ChatMessage::system(SYSTEM_PROMPT), ChatMessage::user(prompt)]
}

/// Sampling settings shared by every provider
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationSettings {
    pub temperature: f64,
    pub max_tokens: u32,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            temperature: 0.0,
            max_tokens: 1024,
        }
    }
}

#[async_trait]
pub trait LLMProvider: Send + Sync {
    /// Short backend name ("openai", "ollama")
    fn name(&self) -> &str;

    /// Raw text of the model's answer to `prompt`
    ///
    /// Backends ask for JSON output but do not validate it; parsing belongs
    /// to the caller.
    async fn complete(&self, prompt: &str) -> Result<String>;

    async fn check_health(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_messages() {
        let [system, user] = prompt_messages("design a PI controller");
        assert_eq!(system.role, Role::System);
        assert_eq!(system.content, SYSTEM_PROMPT);
        assert_eq!(user.role, Role::User);
        assert_eq!(user.content, "design a PI controller");
    }

    #[test]
    fn test_message_wire_shape() {
        let value = serde_json::to_value(ChatMessage::user("hi")).unwrap();
        assert_eq!(value, serde_json::json!({ "role": "user", "content": "hi" }));
    }

    #[test]
    fn test_transient_classification() {
        assert!(LLMError::RateLimitExceeded.is_transient());
        assert!(LLMError::Timeout.is_transient());
        assert!(LLMError::NetworkError("reset".into()).is_transient());
        assert!(!LLMError::AuthenticationFailed("bad key".into()).is_transient());
        assert!(!LLMError::InvalidRequest("400".into()).is_transient());
        assert!(!LLMError::ParseError("no choices".into()).is_transient());
    }

    #[test]
    fn test_into_engine_error() {
        let err: sdk::EngineError = LLMError::RateLimitExceeded.into();
        assert!(matches!(err, sdk::EngineError::LLMProvider(_)));
    }
}
