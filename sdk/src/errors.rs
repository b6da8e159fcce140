//! Error types and handling
//!
//! This module provides the error types used throughout the Tuner engine.
//! All errors implement the `TunerErrorExt` trait which provides user-friendly
//! hints and indicates whether errors are recoverable.
//!
//! # Security
//!
//! Error messages never carry API keys. Provider error bodies are scrubbed
//! by the engine before they are wrapped in an `EngineError`.

use thiserror::Error;

/// Trait for Tuner error extensions
///
/// This trait provides additional context for errors, including user-friendly
/// hints and recoverability information. All engine errors implement this trait.
pub trait TunerErrorExt {
    /// Returns a user-friendly hint for the error
    fn user_hint(&self) -> &str;

    /// Returns whether the error is recoverable
    ///
    /// Recoverable errors can be retried by the caller (resubmitting the task).
    /// Non-recoverable errors need a configuration or code change.
    fn is_recoverable(&self) -> bool;
}

/// Main engine error type
///
/// # Error Categories
///
/// - **Configuration**: Invalid or missing configuration
/// - **Task input**: Task specifications that violate their invariants
/// - **Dispatch**: No registered agent for the classified system type
/// - **Proposer**: Language-model failures and unparseable proposals
/// - **Oracle**: Evaluation service failures
/// - **Streaming**: Consumer or transport went away mid-session
///
/// # Examples
///
/// ```
/// use sdk::errors::{EngineError, TunerErrorExt};
///
/// let error = EngineError::AgentNotFound;
/// assert_eq!(error.to_string(), "No suitable sub-agent found for this task");
/// assert!(!error.is_recoverable());
///
/// let malformed = EngineError::MalformedResponse("expected value".to_string());
/// assert!(malformed.is_recoverable());
/// ```
#[derive(Debug, Error)]
pub enum EngineError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    // Task input errors
    #[error("Invalid task specification: {0}")]
    InvalidTaskSpec(String),

    // Dispatch errors
    #[error("No suitable sub-agent found for this task")]
    AgentNotFound,

    #[error("Agent registry error: {0}")]
    Registry(String),

    // Proposer errors
    #[error("LLM provider error: {0}")]
    LLMProvider(String),

    #[error("Malformed proposer response: {0}")]
    MalformedResponse(String),

    // Design memory errors
    #[error("Design memory is empty")]
    EmptyMemory,

    // Oracle errors
    #[error("Evaluation oracle error: {0}")]
    Oracle(String),

    // Streaming errors
    #[error("Result stream closed by consumer")]
    StreamClosed,

    #[error("Transport disconnected: {0}")]
    TransportDisconnected(String),

    #[error("Design session cancelled")]
    Cancelled,

    // Keyring errors
    #[error("Keyring error: {0}")]
    KeyringError(String),

    // Network errors
    #[error("Network error: {0}")]
    Network(String),

    // Generic IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl TunerErrorExt for EngineError {
    fn user_hint(&self) -> &str {
        match self {
            Self::Config(_) => "Check your config.toml file for errors",
            Self::InvalidTaskSpec(_) => {
                "Check the plant coefficients and the settling time bounds"
            }
            Self::AgentNotFound => "No design agent handles this system type yet",
            Self::Registry(_) => "Agent registry is inconsistent. This is a build defect",
            Self::LLMProvider(_) => "LLM provider unavailable. Check your API keys and network",
            Self::MalformedResponse(_) => "The model returned an unexpected format. Try again",
            Self::EmptyMemory => "No design attempt has been recorded yet",
            Self::Oracle(_) => "Evaluation service failed. Check the oracle endpoint",
            Self::StreamClosed => "The result consumer stopped listening",
            Self::TransportDisconnected(_) => "The client disconnected before completion",
            Self::Cancelled => "The design session was cancelled",
            Self::KeyringError(_) => "Failed to access secure storage. Check system keychain",
            Self::Network(_) => "Network operation failed. Check your connection",
            Self::Io(_) => "File system operation failed",
        }
    }

    fn is_recoverable(&self) -> bool {
        match self {
            // Non-recoverable errors
            Self::Config(_)
            | Self::InvalidTaskSpec(_)
            | Self::AgentNotFound
            | Self::Registry(_)
            | Self::EmptyMemory => false,

            // All other errors are potentially recoverable
            _ => true,
        }
    }
}
