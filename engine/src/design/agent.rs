//! Task-Specific Design Agents
//!
//! An agent owns one design task from first proposal to final summary. Each
//! iteration asks the proposer for parameters, has the oracle evaluate them,
//! judges the result against the thresholds and, on failure, folds a
//! critique into the next prompt.
//!
//! ```text
//! Proposing -> Evaluating -> Succeeded
//!                    |
//!                    +-----> Revising -> Proposing ...
//!                    |
//!                    +-----> Exhausted (attempt budget spent)
//! ```

use async_trait::async_trait;
use sdk::types::ALL_METRICS;
use sdk::{
    EngineError, FinalTaskDesignResult, Parameters, Performance, TaskDesignResult, TaskSpec,
    Thresholds,
};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::feedback::format_feedback;
use super::memory::DesignMemory;
use super::prompts::design_prompt;
use super::stream::ResultSender;
use crate::llm::LLMProvider;
use crate::oracle::{EvaluationOracle, PlantModel};

/// Where an agent is in its design loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DesignPhase {
    Proposing,
    Evaluating,
    Succeeded,
    Revising,
    Exhausted,
}

impl DesignPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, DesignPhase::Succeeded | DesignPhase::Exhausted)
    }
}

/// Result of a single propose/evaluate/judge round
#[derive(Debug, Clone, PartialEq)]
pub struct IterationOutcome {
    pub success: bool,
    pub result: TaskDesignResult,
}

/// One prompt sent to the proposer and the raw text it returned
#[derive(Debug, Clone, PartialEq)]
pub struct Exchange {
    pub prompt: String,
    pub response: String,
}

/// Everything an agent needs to start on a task
#[derive(Clone)]
pub struct AgentContext {
    pub llm: Arc<dyn LLMProvider>,
    pub oracle: Arc<dyn EvaluationOracle>,
    pub spec: TaskSpec,
    pub thresholds: Thresholds,
    /// Requirement text refined by classification
    pub task_requirement: String,
    pub scenario: String,
    pub max_attempts: u32,
}

/// A design agent for one family of plants
#[async_trait]
pub trait DesignAgent: Send {
    /// Display name of the agent family
    fn name(&self) -> &str;

    /// Iterate until the design succeeds or the attempt budget is spent
    ///
    /// With `results`, every round is pushed as soon as it is judged and the
    /// loop waits for the consumer to take it; a sentinel round follows the
    /// last one.
    async fn handle_task(
        &mut self,
        results: Option<ResultSender>,
    ) -> Result<FinalTaskDesignResult, EngineError>;

    /// Run exactly one round
    async fn handle_one_iteration(&mut self) -> Result<IterationOutcome, EngineError>;
}

/// Loop-shaping PI designer for first-order stable plants
///
/// Tunes `omega_L` (crossover frequency, rad/s) and `beta_b` (PI zero ratio).
pub struct FirstOrderStableAgent {
    llm: Arc<dyn LLMProvider>,
    oracle: Arc<dyn EvaluationOracle>,
    plant: PlantModel,
    thresholds: Thresholds,
    task_requirement: String,
    scenario: String,
    max_attempts: u32,
    memory: DesignMemory,
    transcript: Vec<Exchange>,
    feedback: Option<String>,
    attempts: u32,
    phase: DesignPhase,
}

impl FirstOrderStableAgent {
    pub const NAME: &'static str = "First-order stable system";

    pub fn new(context: AgentContext) -> Self {
        Self {
            llm: context.llm,
            oracle: context.oracle,
            plant: PlantModel::from(&context.spec),
            thresholds: context.thresholds,
            task_requirement: context.task_requirement,
            scenario: context.scenario,
            max_attempts: context.max_attempts.max(1),
            memory: DesignMemory::new(),
            transcript: Vec::new(),
            feedback: None,
            attempts: 0,
            phase: DesignPhase::Proposing,
        }
    }

    pub fn phase(&self) -> DesignPhase {
        self.phase
    }

    pub fn memory(&self) -> &DesignMemory {
        &self.memory
    }

    pub fn transcript(&self) -> &[Exchange] {
        &self.transcript
    }

    /// Number of proposer calls made so far
    ///
    /// Counts every answer, including one that fails to parse, so it can run
    /// one ahead of `memory().len()` after a `MalformedResponse`. The attempt
    /// budget is checked against this count.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    fn summary(&self) -> FinalTaskDesignResult {
        let succeeded = self.phase == DesignPhase::Succeeded;
        let last = self.memory.len();
        FinalTaskDesignResult {
            used_agent: Self::NAME.to_string(),
            is_success: succeeded,
            design_history: self
                .memory
                .all()
                .map(|attempt| attempt.to_result(succeeded && attempt.ordinal == last))
                .collect(),
        }
    }
}

#[async_trait]
impl DesignAgent for FirstOrderStableAgent {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn handle_task(
        &mut self,
        results: Option<ResultSender>,
    ) -> Result<FinalTaskDesignResult, EngineError> {
        info!(
            "{} starting on plant {:?}/{:?} ({})",
            Self::NAME,
            self.plant.num,
            self.plant.den,
            self.scenario
        );

        while !self.phase.is_terminal() {
            let outcome = self.handle_one_iteration().await?;
            if let Some(sender) = &results {
                sender.send(outcome.result).await?;
            }
        }

        if let Some(sender) = &results {
            let succeeded = self.phase == DesignPhase::Succeeded;
            sender.send(TaskDesignResult::sentinel(succeeded)).await?;
        }

        let summary = self.summary();
        info!(
            "{} finished after {} attempt(s): {}",
            Self::NAME,
            self.attempts,
            if summary.is_success { "success" } else { "exhausted" }
        );
        Ok(summary)
    }

    async fn handle_one_iteration(&mut self) -> Result<IterationOutcome, EngineError> {
        if self.phase.is_terminal() {
            return Err(EngineError::Config(format!(
                "design loop already ended in {:?}",
                self.phase
            )));
        }

        self.phase = DesignPhase::Proposing;
        let prompt = design_prompt(&self.task_requirement, self.feedback.as_deref());
        let response = self.llm.complete(&prompt).await?;
        self.attempts += 1;
        debug!("Attempt {} proposer response: {}", self.attempts, response);
        self.transcript.push(Exchange {
            prompt,
            response: response.clone(),
        });

        let [omega_l, beta_b] = parse_loop_shaping_parameters(&response)?;
        let coefficients = [omega_l, beta_b];
        let parameters = Parameters::from([
            ("omega_L".to_string(), omega_l),
            ("beta_b".to_string(), beta_b),
        ]);

        self.phase = DesignPhase::Evaluating;
        let stable = self.oracle.check_stability(&coefficients, &self.plant).await?;
        let performance = if stable {
            self.oracle
                .loop_shaping(&coefficients, &self.plant)
                .await?
                .performance()
        } else {
            Performance::unstable(ALL_METRICS)
        };

        let success = stable && self.thresholds.is_satisfied_by(&performance);
        let result = self.memory.add(parameters, performance).to_result(success);

        if success {
            self.phase = DesignPhase::Succeeded;
            info!(
                "Attempt {}: omega_L={}, beta_b={} meets every requirement",
                self.attempts, omega_l, beta_b
            );
        } else {
            self.feedback = Some(format_feedback(&self.memory, &self.thresholds)?);
            self.phase = if self.attempts >= self.max_attempts {
                warn!("Attempt budget of {} spent without success", self.max_attempts);
                DesignPhase::Exhausted
            } else {
                DesignPhase::Revising
            };
            info!(
                "Attempt {}/{}: omega_L={}, beta_b={} {}",
                self.attempts,
                self.max_attempts,
                omega_l,
                beta_b,
                if stable { "misses requirements" } else { "is unstable" }
            );
        }

        Ok(IterationOutcome { success, result })
    }
}

/// Parse `{"parameter": [omega_L, beta_b]}` from a proposer response
pub fn parse_loop_shaping_parameters(response: &str) -> Result<[f64; 2], EngineError> {
    let value: Value = serde_json::from_str(response.trim())
        .map_err(|e| EngineError::MalformedResponse(format!("not valid JSON: {}", e)))?;

    let values = value
        .get("parameter")
        .and_then(Value::as_array)
        .ok_or_else(|| {
            EngineError::MalformedResponse("missing \"parameter\" array".to_string())
        })?;

    match values.as_slice() {
        [a, b] => {
            let parse = |v: &Value| {
                v.as_f64().filter(|x| x.is_finite()).ok_or_else(|| {
                    EngineError::MalformedResponse(format!("parameter {} is not a number", v))
                })
            };
            Ok([parse(a)?, parse(b)?])
        }
        other => Err(EngineError::MalformedResponse(format!(
            "expected 2 parameters, got {}",
            other.len()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_parameters() {
        let parsed = parse_loop_shaping_parameters(r#"{"parameter": [2.5, 0.1]}"#).unwrap();
        assert_eq!(parsed, [2.5, 0.1]);
    }

    #[test]
    fn test_parse_integer_parameters() {
        let parsed = parse_loop_shaping_parameters(r#" {"parameter": [3, 1]} "#).unwrap();
        assert_eq!(parsed, [3.0, 1.0]);
    }

    #[test]
    fn test_parse_rejects_wrong_arity() {
        for bad in [
            r#"{"parameter": [1.0]}"#,
            r#"{"parameter": [1.0, 2.0, 3.0]}"#,
            r#"{"parameter": []}"#,
        ] {
            assert!(matches!(
                parse_loop_shaping_parameters(bad),
                Err(EngineError::MalformedResponse(_))
            ));
        }
    }

    #[test]
    fn test_parse_rejects_non_numbers() {
        assert!(parse_loop_shaping_parameters(r#"{"parameter": ["fast", 0.1]}"#).is_err());
        assert!(parse_loop_shaping_parameters(r#"{"params": [1.0, 0.1]}"#).is_err());
        assert!(parse_loop_shaping_parameters("omega_L = 2").is_err());
    }

    #[test]
    fn test_terminal_phases() {
        assert!(DesignPhase::Succeeded.is_terminal());
        assert!(DesignPhase::Exhausted.is_terminal());
        assert!(!DesignPhase::Revising.is_terminal());
        assert!(!DesignPhase::Proposing.is_terminal());
    }
}
