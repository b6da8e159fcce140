use proptest::prelude::*;
use sdk::errors::{EngineError, TunerErrorExt};
use sdk::types::{
    Performance, TaskSpec, PHASE_MARGIN, SETTLING_TIME, STEADYSTATE_ERROR,
};

fn spec(pm: f64, ts_min: f64, ts_max: f64, sse: f64) -> TaskSpec {
    TaskSpec {
        id: None,
        num: vec![1.0],
        den: vec![1.0, 1.0],
        tau: None,
        phase_margin_min: pm,
        settling_time_min: ts_min,
        settling_time_max: ts_max,
        steadystate_error_max: sse,
        scenario: "property".to_string(),
    }
}

// Error hints are always present and never echo the raw detail
proptest! {
    #[test]
    fn test_error_user_hint_completeness(error_str in "\\PC*") {
        let errs = vec![
            EngineError::Config(error_str.clone()),
            EngineError::InvalidTaskSpec(error_str.clone()),
            EngineError::LLMProvider(error_str.clone()),
            EngineError::MalformedResponse(error_str.clone()),
            EngineError::Oracle(error_str.clone()),
            EngineError::TransportDisconnected(error_str.clone()),
        ];

        for err in errs {
            let hint = err.user_hint();
            prop_assert!(!hint.is_empty());
            prop_assert!(!hint.contains("types.rs"));
        }
    }
}

// Success judgment is the conjunction of the per-threshold bound checks
proptest! {
    #[test]
    fn test_success_is_conjunction_of_bounds(
        pm_min in 0.0..90.0f64,
        ts_min in 0.0..5.0f64,
        ts_span in 0.0..10.0f64,
        sse_max in 0.0..1.0f64,
        pm in 0.0..120.0f64,
        ts in 0.0..20.0f64,
        sse in 0.0..2.0f64,
    ) {
        let spec = spec(pm_min, ts_min, ts_min + ts_span, sse_max);
        let thresholds = spec.thresholds();
        let performance = Performance::new()
            .with(PHASE_MARGIN, pm)
            .with(SETTLING_TIME, ts)
            .with(STEADYSTATE_ERROR, sse);

        let expected = pm >= pm_min
            && ts >= ts_min
            && ts <= ts_min + ts_span
            && sse <= sse_max;

        prop_assert_eq!(thresholds.is_satisfied_by(&performance), expected);

        // success implies every bound holds; failure names at least one threshold
        let violations = thresholds.violations(&performance);
        prop_assert_eq!(violations.is_empty(), expected);
    }
}

// Validation accepts exactly the specs with ordered settling bounds
proptest! {
    #[test]
    fn test_settling_bounds_validation(a in 0.0..10.0f64, b in 0.0..10.0f64) {
        let result = spec(45.0, a, b, 0.1).validate();
        prop_assert_eq!(result.is_ok(), a <= b);
    }
}
