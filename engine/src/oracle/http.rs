//! HTTP adapter for an external evaluation service
//!
//! Both checks POST `{coefficients, num, den}` as JSON. `/check_stability`
//! answers `{"stable": bool}`; `/loop_shaping` answers a [`LoopShapingReport`].

use async_trait::async_trait;
use reqwest::Client;
use sdk::EngineError;
use serde::{Deserialize, Serialize};
use serde::de::DeserializeOwned;
use std::time::Duration;

use super::{EvaluationOracle, LoopShapingReport, PlantModel};
use crate::config::OracleConfig;

pub struct HttpOracle {
    base_url: String,
    client: Client,
}

#[derive(Debug, Serialize)]
struct EvaluationRequest<'a> {
    coefficients: &'a [f64],
    num: &'a [f64],
    den: &'a [f64],
}

#[derive(Debug, Deserialize)]
struct StabilityResponse {
    stable: bool,
}

impl HttpOracle {
    pub fn new(config: &OracleConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_default();

        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            client,
        }
    }

    async fn post<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        coefficients: &[f64],
        plant: &PlantModel,
    ) -> Result<T, EngineError> {
        let url = format!("{}/{}", self.base_url, endpoint);
        let request = EvaluationRequest {
            coefficients,
            num: &plant.num,
            den: &plant.den,
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| EngineError::Network(format!("{}: {}", url, e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(EngineError::Oracle(format!(
                "{} returned {}: {}",
                endpoint, status, body
            )));
        }

        response
            .json()
            .await
            .map_err(|e| EngineError::Oracle(format!("Invalid {} response: {}", endpoint, e)))
    }
}

#[async_trait]
impl EvaluationOracle for HttpOracle {
    fn name(&self) -> &str {
        "http"
    }

    async fn check_stability(
        &self,
        coefficients: &[f64],
        plant: &PlantModel,
    ) -> Result<bool, EngineError> {
        let response: StabilityResponse =
            self.post("check_stability", coefficients, plant).await?;
        tracing::debug!(
            "Stability of {:?}: {}",
            coefficients,
            if response.stable { "stable" } else { "unstable" }
        );
        Ok(response.stable)
    }

    async fn loop_shaping(
        &self,
        coefficients: &[f64],
        plant: &PlantModel,
    ) -> Result<LoopShapingReport, EngineError> {
        self.post("loop_shaping", coefficients, plant).await
    }
}
