//! HTTP-level tests for the evaluation oracle adapter

use sdk::EngineError;
use serde_json::json;
use tuner_engine::config::OracleConfig;
use tuner_engine::oracle::{EvaluationOracle, HttpOracle, PlantModel};
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn oracle(server: &MockServer) -> HttpOracle {
    HttpOracle::new(&OracleConfig {
        base_url: server.uri(),
        timeout_secs: 5,
    })
}

fn plant() -> PlantModel {
    PlantModel {
        num: vec![1.0],
        den: vec![1.0, 1.0],
    }
}

#[tokio::test]
async fn test_check_stability_posts_full_plant() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/check_stability"))
        .and(body_json(json!({
            "coefficients": [2.0, 0.1],
            "num": [1.0],
            "den": [1.0, 1.0]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "stable": true })))
        .expect(1)
        .mount(&server)
        .await;

    assert!(oracle(&server)
        .check_stability(&[2.0, 0.1], &plant())
        .await
        .unwrap());
}

#[tokio::test]
async fn test_check_stability_unstable() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/check_stability"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "stable": false })))
        .mount(&server)
        .await;

    assert!(!oracle(&server)
        .check_stability(&[50.0, 3.0], &plant())
        .await
        .unwrap());
}

#[tokio::test]
async fn test_loop_shaping_report() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/loop_shaping"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "phase_margin": 62.5,
            "settling_time": 1.8,
            "steadystate_error": 0.0,
            "gain_margin": 12.0
        })))
        .mount(&server)
        .await;

    let report = oracle(&server)
        .loop_shaping(&[2.0, 0.1], &plant())
        .await
        .unwrap();
    assert_eq!(report.phase_margin, 62.5);
    assert_eq!(report.settling_time, 1.8);
    assert_eq!(report.gain_margin, Some(12.0));
    assert_eq!(report.overshoot, None);
}

#[tokio::test]
async fn test_error_status_is_oracle_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/loop_shaping"))
        .respond_with(ResponseTemplate::new(500).set_body_string("solver diverged"))
        .mount(&server)
        .await;

    match oracle(&server).loop_shaping(&[2.0, 0.1], &plant()).await {
        Err(EngineError::Oracle(msg)) => assert!(msg.contains("solver diverged")),
        other => panic!("expected oracle error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_unexpected_body_is_oracle_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/check_stability"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "verdict": "ok" })))
        .mount(&server)
        .await;

    let result = oracle(&server).check_stability(&[2.0, 0.1], &plant()).await;
    assert!(matches!(result, Err(EngineError::Oracle(_))));
}

#[tokio::test]
async fn test_unreachable_service_is_network_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let oracle = HttpOracle::new(&OracleConfig {
        base_url: format!("http://{}", addr),
        timeout_secs: 5,
    });
    let result = oracle.check_stability(&[2.0, 0.1], &plant()).await;
    assert!(matches!(result, Err(EngineError::Network(_))));
}
