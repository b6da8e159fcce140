//! Tuner SDK
//!
//! Shared library providing the task/result wire types and the error taxonomy.
//! This crate is used by the engine and by clients of the task submission API.

/// Error types and handling
pub mod errors;

/// Task specification and design result types
pub mod types;

// Re-export commonly used types
pub use errors::{EngineError, TunerErrorExt};
pub use types::{
    Bound, CompleteTaskResponse, FinalTaskDesignResult, MetricValue, Parameters, Performance,
    TaskDesignResult, TaskSpec, Threshold, Thresholds, Violation, SENTINEL_ROUND,
};
