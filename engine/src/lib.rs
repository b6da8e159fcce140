//! Tuner Engine Library
//!
//! This library provides the core functionality of the tuner engine.
//! It is used by both the main binary and integration tests.

/// Configuration management module
pub mod config;

/// Secret management module
pub mod secrets;

/// LLM provider abstraction layer
pub mod llm;

/// Evaluation oracle abstraction
pub mod oracle;

/// Iterative design loop: memory, feedback, agents, streaming
pub mod design;

/// Task classification and agent dispatch
pub mod dispatcher;

/// HTTP/WebSocket task submission server
pub mod server;

/// Telemetry and Observability
pub mod telemetry;

/// CLI interface module
pub mod cli;

/// Command handlers module
pub mod handlers;
