//! Iterative controller design
//!
//! The design loop pairs a stochastic proposer with a deterministic oracle.
//! [`memory`] keeps what was tried, [`feedback`] explains what fell short,
//! [`agent`] drives the rounds and [`stream`] hands each round to a consumer.

pub mod agent;
pub mod feedback;
pub mod memory;
pub mod prompts;
pub mod stream;

pub use agent::{
    AgentContext, DesignAgent, DesignPhase, Exchange, FirstOrderStableAgent, IterationOutcome,
};
pub use feedback::format_feedback;
pub use memory::{DesignAttempt, DesignMemory};
pub use stream::{
    relay_results, result_channel, run_streaming_session, Delivery,
    ResultReceiver, ResultSender, ResultTransport,
};
