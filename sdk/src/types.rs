//! Task and result types shared by the engine and its clients
//!
//! These are the wire types of the task submission surface: the caller sends a
//! [`TaskSpec`], and receives either a [`CompleteTaskResponse`] or a stream of
//! [`TaskDesignResult`] values terminated by a sentinel round.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

use crate::errors::EngineError;

/// Round number marking the end of a result stream
pub const SENTINEL_ROUND: i64 = -1;

/// Performance metric: closed-loop phase margin in degrees
pub const PHASE_MARGIN: &str = "phase_margin";

/// Performance metric: closed-loop settling time in seconds
pub const SETTLING_TIME: &str = "settling_time";

/// Performance metric: steady-state error
pub const STEADYSTATE_ERROR: &str = "steadystate_error";

/// Every metric the evaluation oracle reports
pub const ALL_METRICS: [&str; 3] = [PHASE_MARGIN, SETTLING_TIME, STEADYSTATE_ERROR];

/// Controller parameters proposed for one attempt, by name
pub type Parameters = BTreeMap<String, f64>;

/// A control design task: the plant and the performance it must reach
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskSpec {
    /// Optional caller-side identifier
    #[serde(default)]
    pub id: Option<i64>,

    /// Plant numerator coefficients, highest power of `s` first
    pub num: Vec<f64>,

    /// Plant denominator coefficients, highest power of `s` first
    pub den: Vec<f64>,

    /// Optional time delay in seconds
    #[serde(default)]
    pub tau: Option<f64>,

    /// Minimum phase margin (degrees)
    pub phase_margin_min: f64,

    /// Minimum settling time (seconds)
    pub settling_time_min: f64,

    /// Maximum settling time (seconds)
    pub settling_time_max: f64,

    /// Maximum steady-state error
    pub steadystate_error_max: f64,

    /// Free-text description of the application scenario
    pub scenario: String,
}

impl TaskSpec {
    /// Check the invariants a task must satisfy before it is dispatched
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.num.is_empty() {
            return Err(EngineError::InvalidTaskSpec(
                "numerator must not be empty".to_string(),
            ));
        }
        if self.den.is_empty() {
            return Err(EngineError::InvalidTaskSpec(
                "denominator must not be empty".to_string(),
            ));
        }
        if self.num.iter().chain(self.den.iter()).any(|c| !c.is_finite()) {
            return Err(EngineError::InvalidTaskSpec(
                "plant coefficients must be finite".to_string(),
            ));
        }
        if self.den.iter().all(|c| *c == 0.0) {
            return Err(EngineError::InvalidTaskSpec(
                "denominator must have a non-zero coefficient".to_string(),
            ));
        }

        let bounds = [
            ("phase_margin_min", self.phase_margin_min),
            ("settling_time_min", self.settling_time_min),
            ("settling_time_max", self.settling_time_max),
            ("steadystate_error_max", self.steadystate_error_max),
        ];
        for (name, value) in bounds {
            if !value.is_finite() {
                return Err(EngineError::InvalidTaskSpec(format!(
                    "{} must be finite",
                    name
                )));
            }
        }
        if self.settling_time_min > self.settling_time_max {
            return Err(EngineError::InvalidTaskSpec(format!(
                "settling_time_min ({}) exceeds settling_time_max ({})",
                self.settling_time_min, self.settling_time_max
            )));
        }

        if let Some(tau) = self.tau {
            if !tau.is_finite() || tau < 0.0 {
                return Err(EngineError::InvalidTaskSpec(
                    "time delay must be a non-negative number".to_string(),
                ));
            }
        }

        Ok(())
    }

    /// Derive the threshold table used to judge every design attempt
    pub fn thresholds(&self) -> Thresholds {
        Thresholds::new(vec![
            (
                "phase_margin".to_string(),
                Threshold::new(
                    PHASE_MARGIN,
                    Bound::Min,
                    self.phase_margin_min,
                    format!(
                        "Phase margin should be at least {} degrees.",
                        self.phase_margin_min
                    ),
                ),
            ),
            (
                "settling_time_min".to_string(),
                Threshold::new(
                    SETTLING_TIME,
                    Bound::Min,
                    self.settling_time_min,
                    format!(
                        "Settling time should be at least {} sec.",
                        self.settling_time_min
                    ),
                ),
            ),
            (
                "settling_time_max".to_string(),
                Threshold::new(
                    SETTLING_TIME,
                    Bound::Max,
                    self.settling_time_max,
                    format!(
                        "Settling time should be at most {} sec.",
                        self.settling_time_max
                    ),
                ),
            ),
            (
                "steadystate_error".to_string(),
                Threshold::new(
                    STEADYSTATE_ERROR,
                    Bound::Max,
                    self.steadystate_error_max,
                    format!(
                        "Steady state error should be at most {}.",
                        self.steadystate_error_max
                    ),
                ),
            ),
        ])
    }

    /// Render the plant transfer function, e.g. `(1) / (s + 1)`
    pub fn plant_description(&self) -> String {
        format!(
            "({}) / ({})",
            format_polynomial(&self.num),
            format_polynomial(&self.den)
        )
    }

    /// Human-readable summary of the performance requirements
    pub fn requirement_summary(&self) -> String {
        format!(
            "Design the controller to meet the following specifications:\n\
             Phase margin greater or equal {} degrees,\n\
             Settling time greater or equal {} sec,\n\
             Settling time should also be less or equal to {} sec,\n\
             Steady state error less or equal {}.",
            self.phase_margin_min,
            self.settling_time_min,
            self.settling_time_max,
            self.steadystate_error_max
        )
    }
}

/// Render polynomial coefficients (highest power first) in the variable `s`
pub fn format_polynomial(coefficients: &[f64]) -> String {
    let degree = coefficients.len().saturating_sub(1);
    let mut out = String::new();

    for (i, &c) in coefficients.iter().enumerate() {
        if c == 0.0 {
            continue;
        }
        let power = degree - i;
        let magnitude = c.abs();

        let term = match power {
            0 => format!("{}", magnitude),
            _ => {
                let coeff = if magnitude == 1.0 {
                    String::new()
                } else {
                    format!("{}", magnitude)
                };
                let var = if power == 1 {
                    "s".to_string()
                } else {
                    format!("s^{}", power)
                };
                format!("{}{}", coeff, var)
            }
        };

        if out.is_empty() {
            if c < 0.0 {
                out.push('-');
            }
        } else if c < 0.0 {
            out.push_str(" - ");
        } else {
            out.push_str(" + ");
        }
        out.push_str(&term);
    }

    if out.is_empty() {
        "0".to_string()
    } else {
        out
    }
}

/// Direction of a threshold bound
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Bound {
    /// Metric must be greater than or equal to the bound
    Min,
    /// Metric must be less than or equal to the bound
    Max,
}

impl fmt::Display for Bound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Bound::Min => write!(f, "min"),
            Bound::Max => write!(f, "max"),
        }
    }
}

/// One performance constraint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Threshold {
    /// Name of the performance metric this bound applies to
    pub metric: String,
    pub bound: Bound,
    pub value: f64,
    /// Corrective guidance shown to the proposer when the bound is missed
    pub message: String,
}

impl Threshold {
    pub fn new(metric: impl Into<String>, bound: Bound, value: f64, message: String) -> Self {
        Self {
            metric: metric.into(),
            bound,
            value,
            message,
        }
    }

    /// Check a metric value against this bound.
    ///
    /// Returns the size of the miss, or `None` if the bound holds.
    /// An unstable or missing metric is a miss of unknown size.
    pub fn miss(&self, value: Option<MetricValue>) -> Option<Shortfall> {
        let achieved = match value {
            Some(MetricValue::Value(v)) => v,
            Some(MetricValue::Unstable) | None => return Some(Shortfall::Unmeasurable),
        };
        let holds = match self.bound {
            Bound::Min => achieved >= self.value,
            Bound::Max => achieved <= self.value,
        };
        if holds {
            None
        } else {
            Some(Shortfall::By {
                achieved,
                gap: (achieved - self.value).abs(),
            })
        }
    }
}

/// How far a metric is from its bound
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Shortfall {
    /// The metric was measured and misses the bound by `gap`
    By { achieved: f64, gap: f64 },
    /// The metric is unstable or was not reported
    Unmeasurable,
}

/// A threshold entry that a performance record failed
#[derive(Debug, Clone, PartialEq)]
pub struct Violation {
    /// Threshold name (e.g. `settling_time_max`)
    pub name: String,
    pub threshold: Threshold,
    pub shortfall: Shortfall,
}

/// Threshold table derived from a [`TaskSpec`]
///
/// Entries keep their construction order. The table is read-only once built.
#[derive(Debug, Clone, PartialEq)]
pub struct Thresholds {
    entries: Vec<(String, Threshold)>,
}

impl Thresholds {
    pub fn new(entries: Vec<(String, Threshold)>) -> Self {
        Self { entries }
    }

    /// Look up a threshold by name
    pub fn get(&self, name: &str) -> Option<&Threshold> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, t)| t)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Threshold)> {
        self.entries.iter().map(|(n, t)| (n.as_str(), t))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Every threshold the performance record misses, in table order
    pub fn violations(&self, performance: &Performance) -> Vec<Violation> {
        self.entries
            .iter()
            .filter_map(|(name, threshold)| {
                threshold
                    .miss(performance.get(&threshold.metric))
                    .map(|shortfall| Violation {
                        name: name.clone(),
                        threshold: threshold.clone(),
                        shortfall,
                    })
            })
            .collect()
    }

    /// A design succeeds only if every threshold holds
    pub fn is_satisfied_by(&self, performance: &Performance) -> bool {
        self.violations(performance).is_empty()
    }
}

/// A performance metric value: a number, or `"unstable"` on the wire
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MetricValue {
    Value(f64),
    Unstable,
}

impl MetricValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            MetricValue::Value(v) => Some(*v),
            MetricValue::Unstable => None,
        }
    }
}

impl fmt::Display for MetricValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricValue::Value(v) => write!(f, "{}", v),
            MetricValue::Unstable => write!(f, "unstable"),
        }
    }
}

impl Serialize for MetricValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            MetricValue::Value(v) => serializer.serialize_f64(*v),
            MetricValue::Unstable => serializer.serialize_str("unstable"),
        }
    }
}

impl<'de> Deserialize<'de> for MetricValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Number(f64),
            Text(String),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Number(v) => Ok(MetricValue::Value(v)),
            Repr::Text(s) if s == "unstable" => Ok(MetricValue::Unstable),
            Repr::Text(s) => Err(serde::de::Error::custom(format!(
                "expected a number or \"unstable\", got {:?}",
                s
            ))),
        }
    }
}

/// Performance record of one design attempt, by metric name
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Performance(BTreeMap<String, MetricValue>);

impl Performance {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record of an unstable design: every metric marked unstable
    pub fn unstable<'a>(metrics: impl IntoIterator<Item = &'a str>) -> Self {
        Self(
            metrics
                .into_iter()
                .map(|m| (m.to_string(), MetricValue::Unstable))
                .collect(),
        )
    }

    pub fn with(mut self, metric: impl Into<String>, value: f64) -> Self {
        self.0.insert(metric.into(), MetricValue::Value(value));
        self
    }

    pub fn get(&self, metric: &str) -> Option<MetricValue> {
        self.0.get(metric).copied()
    }

    /// True if any metric is marked unstable
    pub fn is_unstable(&self) -> bool {
        self.0.values().any(|v| *v == MetricValue::Unstable)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, MetricValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// One round's externally visible snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskDesignResult {
    pub success: bool,
    pub parameters: Parameters,
    pub performance: Performance,
    /// 1-based attempt number, or [`SENTINEL_ROUND`] to close a stream
    pub conversation_round: i64,
}

impl TaskDesignResult {
    pub fn new(
        success: bool,
        parameters: Parameters,
        performance: Performance,
        conversation_round: i64,
    ) -> Self {
        Self {
            success,
            parameters,
            performance,
            conversation_round,
        }
    }

    /// Terminal marker: no further results follow
    ///
    /// `success` carries the outcome of the whole run.
    pub fn sentinel(success: bool) -> Self {
        Self {
            success,
            parameters: Parameters::new(),
            performance: Performance::new(),
            conversation_round: SENTINEL_ROUND,
        }
    }

    pub fn is_sentinel(&self) -> bool {
        self.conversation_round == SENTINEL_ROUND
    }
}

/// Terminal summary of one design task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalTaskDesignResult {
    /// Display name of the agent that handled the task
    pub used_agent: String,
    pub is_success: bool,
    pub design_history: Vec<TaskDesignResult>,
}

/// Response envelope of the task submission surface
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompleteTaskResponse {
    pub is_success: bool,
    pub msg: String,
    pub final_result: Option<FinalTaskDesignResult>,
}

impl CompleteTaskResponse {
    pub fn completed(result: FinalTaskDesignResult) -> Self {
        Self {
            is_success: result.is_success,
            msg: "Successfully completed task".to_string(),
            final_result: Some(result),
        }
    }

    pub fn failed(msg: impl Into<String>) -> Self {
        Self {
            is_success: false,
            msg: msg.into(),
            final_result: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scenario_spec() -> TaskSpec {
        TaskSpec {
            id: None,
            num: vec![1.0],
            den: vec![1.0, 1.0],
            tau: None,
            phase_margin_min: 45.0,
            settling_time_min: 0.0,
            settling_time_max: 5.0,
            steadystate_error_max: 0.1,
            scenario: "test".to_string(),
        }
    }

    fn passing() -> Performance {
        Performance::new()
            .with(PHASE_MARGIN, 60.0)
            .with(SETTLING_TIME, 2.0)
            .with(STEADYSTATE_ERROR, 0.0)
    }

    #[test]
    fn test_validate_accepts_scenario() {
        assert!(scenario_spec().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_empty_numerator() {
        let mut spec = scenario_spec();
        spec.num.clear();
        assert!(matches!(
            spec.validate(),
            Err(EngineError::InvalidTaskSpec(_))
        ));
    }

    #[test]
    fn test_validate_rejects_inverted_settling_bounds() {
        let mut spec = scenario_spec();
        spec.settling_time_min = 6.0;
        assert!(spec.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_negative_delay() {
        let mut spec = scenario_spec();
        spec.tau = Some(-0.5);
        assert!(spec.validate().is_err());
    }

    #[test]
    fn test_thresholds_table() {
        let thresholds = scenario_spec().thresholds();
        assert_eq!(thresholds.len(), 4);

        let pm = thresholds.get("phase_margin").unwrap();
        assert_eq!(pm.bound, Bound::Min);
        assert_eq!(pm.value, 45.0);
        assert_eq!(pm.message, "Phase margin should be at least 45 degrees.");

        let ts_max = thresholds.get("settling_time_max").unwrap();
        assert_eq!(ts_max.metric, SETTLING_TIME);
        assert_eq!(ts_max.bound, Bound::Max);
    }

    #[test]
    fn test_judge_passing_design() {
        let thresholds = scenario_spec().thresholds();
        assert!(thresholds.is_satisfied_by(&passing()));
    }

    #[test]
    fn test_single_miss_fails_design() {
        let thresholds = scenario_spec().thresholds();
        let slow = passing().with(SETTLING_TIME, 7.5);
        let violations = thresholds.violations(&slow);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].name, "settling_time_max");
        assert_eq!(
            violations[0].shortfall,
            Shortfall::By {
                achieved: 7.5,
                gap: 2.5
            }
        );
    }

    #[test]
    fn test_bounds_are_inclusive() {
        let thresholds = scenario_spec().thresholds();
        let edge = Performance::new()
            .with(PHASE_MARGIN, 45.0)
            .with(SETTLING_TIME, 5.0)
            .with(STEADYSTATE_ERROR, 0.1);
        assert!(thresholds.is_satisfied_by(&edge));
    }

    #[test]
    fn test_unstable_design_violates_everything() {
        let thresholds = scenario_spec().thresholds();
        let unstable = Performance::unstable(ALL_METRICS);
        let violations = thresholds.violations(&unstable);
        assert_eq!(violations.len(), thresholds.len());
        assert!(violations
            .iter()
            .all(|v| v.shortfall == Shortfall::Unmeasurable));
    }

    #[test]
    fn test_missing_metric_is_a_violation() {
        let thresholds = scenario_spec().thresholds();
        let partial = Performance::new()
            .with(PHASE_MARGIN, 60.0)
            .with(SETTLING_TIME, 2.0);
        let violations = thresholds.violations(&partial);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].name, "steadystate_error");
    }

    #[test]
    fn test_metric_value_wire_format() {
        let perf = Performance::unstable([PHASE_MARGIN]).with(SETTLING_TIME, 1.5);
        let json = serde_json::to_value(&perf).unwrap();
        assert_eq!(json["phase_margin"], "unstable");
        assert_eq!(json["settling_time"], 1.5);

        let back: Performance = serde_json::from_value(json).unwrap();
        assert_eq!(back, perf);
    }

    #[test]
    fn test_metric_value_rejects_other_strings() {
        let result: Result<MetricValue, _> = serde_json::from_str("\"oscillating\"");
        assert!(result.is_err());
    }

    #[test]
    fn test_sentinel() {
        let sentinel = TaskDesignResult::sentinel(true);
        assert!(sentinel.is_sentinel());
        assert!(sentinel.success);
        assert_eq!(sentinel.conversation_round, -1);
        assert!(sentinel.parameters.is_empty());
        assert!(!TaskDesignResult::sentinel(false).success);
    }

    #[test]
    fn test_plant_description() {
        assert_eq!(scenario_spec().plant_description(), "(1) / (s + 1)");
        assert_eq!(format_polynomial(&[2.0, 0.0, -3.0]), "2s^2 - 3");
        assert_eq!(format_polynomial(&[-1.0, 0.5]), "-s + 0.5");
        assert_eq!(format_polynomial(&[0.0, 0.0]), "0");
    }

    #[test]
    fn test_requirement_summary_mentions_bounds() {
        let summary = scenario_spec().requirement_summary();
        assert!(summary.contains("Phase margin greater or equal 45 degrees"));
        assert!(summary.contains("less or equal to 5 sec"));
        assert!(summary.contains("Steady state error less or equal 0.1"));
    }

    #[test]
    fn test_task_spec_deserialization_defaults() {
        let json = r#"{
            "num": [1], "den": [1, 1],
            "phase_margin_min": 45, "settling_time_min": 0,
            "settling_time_max": 5, "steadystate_error_max": 0.1,
            "scenario": "motor speed loop"
        }"#;
        let spec: TaskSpec = serde_json::from_str(json).unwrap();
        assert_eq!(spec.id, None);
        assert_eq!(spec.tau, None);
        assert_eq!(spec.den, vec![1.0, 1.0]);
    }

    #[test]
    fn test_complete_task_response_constructors() {
        let failed = CompleteTaskResponse::failed("no agent");
        assert!(!failed.is_success);
        assert!(failed.final_result.is_none());

        let done = CompleteTaskResponse::completed(FinalTaskDesignResult {
            used_agent: "First-order stable system".to_string(),
            is_success: true,
            design_history: vec![],
        });
        assert!(done.is_success);
        assert_eq!(done.msg, "Successfully completed task");
    }
}
