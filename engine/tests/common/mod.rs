//! Shared fakes for integration tests
#![allow(dead_code)]

use async_trait::async_trait;
use sdk::{EngineError, TaskDesignResult, TaskSpec};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tuner_engine::config::DesignConfig;
use tuner_engine::design::{AgentContext, FirstOrderStableAgent, ResultTransport};
use tuner_engine::dispatcher::{AgentRegistry, CentralDispatcher};
use tuner_engine::llm::{LLMError, LLMProvider};
use tuner_engine::oracle::{EvaluationOracle, LoopShapingReport, PlantModel};

/// Proposer that replays canned responses in order
///
/// Once the script runs out the last response is repeated.
pub struct ScriptedProvider {
    script: Mutex<VecDeque<String>>,
    last: Mutex<Option<String>>,
    prompts: Mutex<Vec<String>>,
    calls: AtomicUsize,
    delay: Option<Duration>,
}

impl ScriptedProvider {
    pub fn new<I, S>(responses: I) -> Arc<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::build(responses, None)
    }

    /// Like `new`, but every answer takes `delay` to arrive
    pub fn slow<I, S>(responses: I, delay: Duration) -> Arc<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::build(responses, Some(delay))
    }

    fn build<I, S>(responses: I, delay: Option<Duration>) -> Arc<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Arc::new(Self {
            script: Mutex::new(responses.into_iter().map(Into::into).collect()),
            last: Mutex::new(None),
            prompts: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
            delay,
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl LLMProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, prompt: &str) -> Result<String, LLMError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.prompts.lock().unwrap().push(prompt.to_string());

        let next = self.script.lock().unwrap().pop_front();
        let mut last = self.last.lock().unwrap();
        match next {
            Some(response) => {
                *last = Some(response.clone());
                Ok(response)
            }
            None => last
                .clone()
                .ok_or_else(|| LLMError::InvalidRequest("script is empty".to_string())),
        }
    }
}

/// Oracle whose verdict is a function of the proposed coefficients
pub struct FakeOracle {
    judge: Box<dyn Fn(&[f64]) -> Option<LoopShapingReport> + Send + Sync>,
    stability_checks: AtomicUsize,
}

impl FakeOracle {
    /// `judge` returns `None` for an unstable candidate
    pub fn new<F>(judge: F) -> Arc<Self>
    where
        F: Fn(&[f64]) -> Option<LoopShapingReport> + Send + Sync + 'static,
    {
        Arc::new(Self {
            judge: Box::new(judge),
            stability_checks: AtomicUsize::new(0),
        })
    }

    /// Every candidate is stable and meets the scenario thresholds
    pub fn always_passing() -> Arc<Self> {
        Self::new(|_| Some(report(60.0, 2.0, 0.0)))
    }

    /// Every candidate is unstable
    pub fn always_unstable() -> Arc<Self> {
        Self::new(|_| None)
    }

    pub fn stability_checks(&self) -> usize {
        self.stability_checks.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EvaluationOracle for FakeOracle {
    fn name(&self) -> &str {
        "fake"
    }

    async fn check_stability(
        &self,
        coefficients: &[f64],
        _plant: &PlantModel,
    ) -> Result<bool, EngineError> {
        self.stability_checks.fetch_add(1, Ordering::SeqCst);
        Ok((self.judge)(coefficients).is_some())
    }

    async fn loop_shaping(
        &self,
        coefficients: &[f64],
        _plant: &PlantModel,
    ) -> Result<LoopShapingReport, EngineError> {
        (self.judge)(coefficients)
            .ok_or_else(|| EngineError::Oracle("loop shaping on an unstable loop".to_string()))
    }
}

pub fn report(phase_margin: f64, settling_time: f64, steadystate_error: f64) -> LoopShapingReport {
    LoopShapingReport {
        phase_margin,
        settling_time,
        steadystate_error,
        gain_margin: None,
        crossover_frequency: None,
        overshoot: None,
    }
}

/// First-order plant 1/(s+1) with thresholds {45, 0, 5, 0.1}
pub fn first_order_spec() -> TaskSpec {
    TaskSpec {
        id: Some(1),
        num: vec![1.0],
        den: vec![1.0, 1.0],
        tau: None,
        phase_margin_min: 45.0,
        settling_time_min: 0.0,
        settling_time_max: 5.0,
        steadystate_error_max: 0.1,
        scenario: "speed loop of a small DC motor".to_string(),
    }
}

pub fn proposal(omega_l: f64, beta_b: f64) -> String {
    format!(r#"{{"parameter": [{}, {}]}}"#, omega_l, beta_b)
}

pub fn classification(agent: i64) -> String {
    format!(
        r#"{{"Agent Number": {}, "Task Requirement": "Design a PI controller for a first-order stable plant."}}"#,
        agent
    )
}

pub fn agent_with(
    llm: Arc<dyn LLMProvider>,
    oracle: Arc<dyn EvaluationOracle>,
    max_attempts: u32,
) -> FirstOrderStableAgent {
    let spec = first_order_spec();
    FirstOrderStableAgent::new(AgentContext {
        llm,
        oracle,
        thresholds: spec.thresholds(),
        task_requirement: spec.requirement_summary(),
        scenario: spec.scenario.clone(),
        spec,
        max_attempts,
    })
}

pub fn dispatcher_with(
    llm: Arc<dyn LLMProvider>,
    oracle: Arc<dyn EvaluationOracle>,
) -> CentralDispatcher {
    CentralDispatcher::new(
        llm,
        oracle,
        Arc::new(AgentRegistry::builtin().unwrap()),
        DesignConfig::default(),
    )
}

/// Transport that keeps every relayed result in memory
#[derive(Debug, Default)]
pub struct CollectingTransport {
    pub results: Vec<TaskDesignResult>,
    pub finished: bool,
}

#[async_trait]
impl ResultTransport for CollectingTransport {
    async fn send(&mut self, result: &TaskDesignResult) -> Result<(), EngineError> {
        if self.finished {
            return Err(EngineError::TransportDisconnected(
                "transport already finished".to_string(),
            ));
        }
        self.results.push(result.clone());
        Ok(())
    }

    async fn finish(&mut self) -> Result<(), EngineError> {
        self.finished = true;
        Ok(())
    }
}
