//! Feedback Formatter
//!
//! Turns the latest design attempt into a critique the proposer can act on.
//! Output depends only on the memory and the thresholds, so identical
//! inputs always produce identical text.

use sdk::types::Shortfall;
use sdk::{EngineError, Parameters, Thresholds};

use super::memory::DesignMemory;

/// Critique of the latest attempt in `memory`
pub fn format_feedback(
    memory: &DesignMemory,
    thresholds: &Thresholds,
) -> Result<String, EngineError> {
    let latest = memory.latest()?;
    let mut out = format!(
        "Feedback on design attempt {}: the parameters {} were tried.\n",
        latest.ordinal,
        describe_parameters(&latest.parameters)
    );

    if latest.performance.is_unstable() {
        out.push_str(
            "The closed-loop system is unstable with these parameters. \
             Choose parameters that stabilize the closed loop before tuning performance.",
        );
        return Ok(out);
    }

    let violations = thresholds.violations(&latest.performance);
    if violations.is_empty() {
        out.push_str("The design satisfies every requirement.");
        return Ok(out);
    }

    out.push_str("The design does not meet the following requirements:\n");
    for violation in &violations {
        let threshold = &violation.threshold;
        let line = match violation.shortfall {
            Shortfall::By { achieved, gap } => format!(
                "- {}: achieved {}, required {} {}, off by {}. {}\n",
                violation.name, achieved, threshold.bound, threshold.value, gap, threshold.message
            ),
            Shortfall::Unmeasurable => format!(
                "- {}: {} was not reported. {}\n",
                violation.name, threshold.metric, threshold.message
            ),
        };
        out.push_str(&line);
    }
    out.push_str("Revise the parameters so that every requirement is met.");

    Ok(out)
}

fn describe_parameters(parameters: &Parameters) -> String {
    parameters
        .iter()
        .map(|(name, value)| format!("{} = {}", name, value))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use sdk::types::ALL_METRICS;
    use sdk::{Performance, TaskSpec};

    fn spec() -> TaskSpec {
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

    fn params() -> Parameters {
        Parameters::from([("omega_L".to_string(), 2.0), ("beta_b".to_string(), 0.5)])
    }

    #[test]
    fn test_empty_memory_fails() {
        let memory = DesignMemory::new();
        let result = format_feedback(&memory, &spec().thresholds());
        assert!(matches!(result, Err(EngineError::EmptyMemory)));
    }

    #[test]
    fn test_unstable_feedback() {
        let mut memory = DesignMemory::new();
        memory.add(params(), Performance::unstable(ALL_METRICS));

        let text = format_feedback(&memory, &spec().thresholds()).unwrap();
        assert!(text.contains("beta_b = 0.5, omega_L = 2"));
        assert!(text.contains("unstable"));
        assert!(!text.contains("off by"));
    }

    #[test]
    fn test_violations_are_listed_with_shortfall() {
        let mut memory = DesignMemory::new();
        memory.add(
            params(),
            Performance::new()
                .with("phase_margin", 30.0)
                .with("settling_time", 8.0)
                .with("steadystate_error", 0.0),
        );

        let text = format_feedback(&memory, &spec().thresholds()).unwrap();
        assert!(text.contains("- phase_margin: achieved 30, required min 45, off by 15."));
        assert!(text.contains("Phase margin should be at least 45 degrees."));
        assert!(text.contains("- settling_time_max: achieved 8, required max 5, off by 3."));
        assert!(!text.contains("steadystate_error:"));
        assert_eq!(text.lines().filter(|l| l.starts_with("- ")).count(), 2);
        assert!(text.ends_with("Revise the parameters so that every requirement is met."));
    }

    #[test]
    fn test_satisfied_design() {
        let mut memory = DesignMemory::new();
        memory.add(
            params(),
            Performance::new()
                .with("phase_margin", 60.0)
                .with("settling_time", 2.0)
                .with("steadystate_error", 0.0),
        );

        let text = format_feedback(&memory, &spec().thresholds()).unwrap();
        assert!(text.contains("satisfies every requirement"));
    }

    #[test]
    fn test_feedback_is_deterministic() {
        let mut memory = DesignMemory::new();
        memory.add(params(), Performance::new().with("phase_margin", 10.0));
        let thresholds = spec().thresholds();

        let first = format_feedback(&memory, &thresholds).unwrap();
        let second = format_feedback(&memory, &thresholds).unwrap();
        assert_eq!(first, second);
        assert!(first.contains("settling_time was not reported"));
    }
}
