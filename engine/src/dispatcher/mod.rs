//! Central Dispatcher
//!
//! Classifies an incoming task with a single proposer call, picks the
//! registered agent for the identified system type and hands the task over.
//! There is no fallback: an id the registry does not know fails the task.

use sdk::{CompleteTaskResponse, EngineError, FinalTaskDesignResult, TaskSpec};
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::DesignConfig;
use crate::design::{AgentContext, DesignAgent, ResultSender};
use crate::llm::LLMProvider;
use crate::oracle::EvaluationOracle;

pub mod registry;

pub use registry::{AgentEntry, AgentFamily, AgentRegistry, BUILTIN_AGENTS};

const CLASSIFICATION_INSTRUCTION: &str = "\
You are an expert control engineer tasked with analyzing the provided control task and \
assigning it to the most suitable task-specific agent, each specializing in designing \
controllers for specific system types.

First, analyze the dynamic system to identify its type, such as a first-order stable system, \
second-order unstable system, first-order with time delay, higher-order system, etc. Based on \
this analysis, assign the task to the corresponding task-specific agent that specializes in \
the identified system type.

Here are the available task-specific agents:
";

const CLASSIFICATION_CLOSING: &str =
    "\n\nEnsure the selected agent can effectively tailor the control design process.\n";

const CLASSIFICATION_RESPONSE_FORMAT: &str = "\n\n\
Respond with a JSON object only, in exactly this format:
{\"Agent Number\": <integer id of the selected agent>, \
\"Task Requirement\": \"<the design task restated for the selected agent>\"}";

/// Outcome of classifying a task
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub agent_id: i64,
    pub task_requirement: String,
}

pub struct CentralDispatcher {
    llm: Arc<dyn LLMProvider>,
    oracle: Arc<dyn EvaluationOracle>,
    registry: Arc<AgentRegistry>,
    design: DesignConfig,
}

impl CentralDispatcher {
    pub fn new(
        llm: Arc<dyn LLMProvider>,
        oracle: Arc<dyn EvaluationOracle>,
        registry: Arc<AgentRegistry>,
        design: DesignConfig,
    ) -> Self {
        Self {
            llm,
            oracle,
            registry,
            design,
        }
    }

    pub fn registry(&self) -> &AgentRegistry {
        &self.registry
    }

    /// Prompt asking the proposer which agent should handle `spec`
    pub fn classification_prompt(&self, spec: &TaskSpec) -> String {
        let mut request = format!(
            "\nPlease design the controller for the following system: {}",
            spec.plant_description()
        );
        if let Some(tau) = spec.tau {
            request.push_str(&format!(" with time delay {} sec", tau));
        }
        request.push('\n');
        request.push_str(&spec.requirement_summary());

        format!(
            "{}{}{}{}{}",
            CLASSIFICATION_INSTRUCTION,
            self.registry.describe(),
            CLASSIFICATION_CLOSING,
            request,
            CLASSIFICATION_RESPONSE_FORMAT
        )
    }

    /// Ask the proposer which agent handles `spec`
    pub async fn classify(&self, spec: &TaskSpec) -> Result<Classification, EngineError> {
        let response = self.llm.complete(&self.classification_prompt(spec)).await?;
        let classification = parse_classification(&response, spec)?;
        info!(
            "Task {:?} classified as agent {}",
            spec.id, classification.agent_id
        );
        Ok(classification)
    }

    /// Validate and classify `spec`, then build the matching agent
    pub async fn prepare_agent(
        &self,
        spec: &TaskSpec,
    ) -> Result<Box<dyn DesignAgent>, EngineError> {
        spec.validate()?;
        let classification = self.classify(spec).await?;

        let entry = self.registry.get(classification.agent_id).ok_or_else(|| {
            warn!(
                "Classifier picked unknown agent {}",
                classification.agent_id
            );
            EngineError::AgentNotFound
        })?;

        info!("Dispatching task {:?} to {}", spec.id, entry.name);
        Ok(entry.family.build(AgentContext {
            llm: Arc::clone(&self.llm),
            oracle: Arc::clone(&self.oracle),
            spec: spec.clone(),
            thresholds: spec.thresholds(),
            task_requirement: classification.task_requirement,
            scenario: spec.scenario.clone(),
            max_attempts: self.design.max_attempts,
        }))
    }

    /// Classify `spec` and run the selected agent to completion
    pub async fn classify_and_dispatch(
        &self,
        spec: &TaskSpec,
        results: Option<ResultSender>,
    ) -> Result<FinalTaskDesignResult, EngineError> {
        let mut agent = self.prepare_agent(spec).await?;
        agent.handle_task(results).await
    }

    /// Run a task and wrap the outcome in a response envelope
    ///
    /// An unknown agent is reported in the envelope. Other failures are errors.
    pub async fn complete_task(
        &self,
        spec: &TaskSpec,
    ) -> Result<CompleteTaskResponse, EngineError> {
        match self.classify_and_dispatch(spec, None).await {
            Ok(result) => Ok(CompleteTaskResponse::completed(result)),
            Err(EngineError::AgentNotFound) => {
                Ok(CompleteTaskResponse::failed(EngineError::AgentNotFound.to_string()))
            }
            Err(e) => Err(e),
        }
    }
}

/// Parse `{"Agent Number": .., "Task Requirement": ..}`
///
/// The number may be an integer or a numeric string. A missing requirement
/// falls back to the summary derived from `spec`.
fn parse_classification(response: &str, spec: &TaskSpec) -> Result<Classification, EngineError> {
    let value: Value = serde_json::from_str(response.trim())
        .map_err(|e| EngineError::MalformedResponse(format!("not valid JSON: {}", e)))?;

    let agent_id = match value.get("Agent Number") {
        Some(Value::Number(n)) => n.as_i64(),
        Some(Value::String(s)) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
    .ok_or_else(|| {
        EngineError::MalformedResponse(format!(
            "\"Agent Number\" must be an integer, got {}",
            value.get("Agent Number").unwrap_or(&Value::Null)
        ))
    })?;

    let task_requirement = match value.get("Task Requirement").and_then(Value::as_str) {
        Some(text) if !text.trim().is_empty() => text.to_string(),
        _ => {
            warn!("Classifier gave no task requirement, using the task summary");
            spec.requirement_summary()
        }
    };

    Ok(Classification {
        agent_id,
        task_requirement,
    })
}
