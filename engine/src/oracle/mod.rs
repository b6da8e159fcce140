//! Evaluation oracle
//!
//! The oracle answers two questions about a candidate controller: is the
//! closed loop stable, and what performance does loop shaping predict. The
//! design loop only consumes these answers; the control-theory formulas live
//! behind the trait.

use async_trait::async_trait;
use sdk::types::{Performance, PHASE_MARGIN, SETTLING_TIME, STEADYSTATE_ERROR};
use sdk::{EngineError, TaskSpec};
use serde::{Deserialize, Serialize};

pub mod http;

pub use http::HttpOracle;

/// Plant transfer function handed to the oracle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlantModel {
    /// Numerator coefficients, highest power first
    pub num: Vec<f64>,
    /// Denominator coefficients, highest power first
    pub den: Vec<f64>,
}

impl From<&TaskSpec> for PlantModel {
    fn from(spec: &TaskSpec) -> Self {
        Self {
            num: spec.num.clone(),
            den: spec.den.clone(),
        }
    }
}

/// Loop-shaping evaluation of one stable candidate
///
/// The three headline metrics are always present. The rest are reported by
/// some oracles and carried through for logging only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoopShapingReport {
    pub phase_margin: f64,
    pub settling_time: f64,
    pub steadystate_error: f64,
    #[serde(default)]
    pub gain_margin: Option<f64>,
    #[serde(default)]
    pub crossover_frequency: Option<f64>,
    #[serde(default)]
    pub overshoot: Option<f64>,
}

impl LoopShapingReport {
    /// Performance record judged against the thresholds
    pub fn performance(&self) -> Performance {
        Performance::new()
            .with(PHASE_MARGIN, self.phase_margin)
            .with(SETTLING_TIME, self.settling_time)
            .with(STEADYSTATE_ERROR, self.steadystate_error)
    }
}

/// Stability and performance checks for candidate controller parameters
#[async_trait]
pub trait EvaluationOracle: Send + Sync {
    /// Short identifier used in logs
    fn name(&self) -> &str;

    /// Whether the closed loop formed with `coefficients` is stable
    async fn check_stability(
        &self,
        coefficients: &[f64],
        plant: &PlantModel,
    ) -> Result<bool, EngineError>;

    /// Closed-loop metrics for a stable candidate
    async fn loop_shaping(
        &self,
        coefficients: &[f64],
        plant: &PlantModel,
    ) -> Result<LoopShapingReport, EngineError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use sdk::MetricValue;

    #[test]
    fn test_report_performance_has_headline_metrics() {
        let report = LoopShapingReport {
            phase_margin: 60.0,
            settling_time: 2.5,
            steadystate_error: 0.0,
            gain_margin: None,
            crossover_frequency: Some(1.2),
            overshoot: None,
        };
        let performance = report.performance();

        assert_eq!(performance.get(PHASE_MARGIN), Some(MetricValue::Value(60.0)));
        assert_eq!(performance.get(SETTLING_TIME), Some(MetricValue::Value(2.5)));
        assert_eq!(
            performance.get(STEADYSTATE_ERROR),
            Some(MetricValue::Value(0.0))
        );
        assert!(!performance.is_unstable());
    }

    #[test]
    fn test_report_tolerates_missing_auxiliary_fields() {
        let report: LoopShapingReport = serde_json::from_str(
            r#"{"phase_margin": 45.0, "settling_time": 3.0, "steadystate_error": 0.01}"#,
        )
        .unwrap();
        assert_eq!(report.gain_margin, None);
        assert_eq!(report.phase_margin, 45.0);
    }
}
