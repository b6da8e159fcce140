//! Command handlers for CLI operations
//!
//! This module implements the handlers for the CLI commands:
//! - serve: Run the task submission server
//! - run: Execute a design task from a file
//! - agents: List registered design agents
//! - check: Probe the proposer and the evaluation service
//! - config show/path: Print the effective configuration or its location
//! - secret set/delete: Manage provider keys in the OS keychain

use anyhow::{Context, Result};
use async_trait::async_trait;
use sdk::{CompleteTaskResponse, EngineError, TaskDesignResult, TaskSpec};
use serde_json::json;
use std::io::{self, BufRead};
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::design::{run_streaming_session, ResultTransport};
use crate::dispatcher::{AgentRegistry, CentralDispatcher};
use crate::llm::ollama::OllamaProvider;
use crate::llm::openai::{OpenAIProvider, OPENAI_API_KEY};
use crate::llm::{LLMProvider, RetryPolicy, RetryingProvider};
use crate::oracle::{EvaluationOracle, HttpOracle, PlantModel};
use crate::secrets::{SecretCache, SecretManager};
use crate::server::{self, AppState};

/// Keychain service name for provider secrets
pub const SECRET_SERVICE: &str = "tuner";

/// Output format for command results
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable text output
    Text,
    /// JSON output for machine consumption
    Json,
}

/// Build the configured proposer, wrapped with the retry policy
pub fn build_provider(config: &Config) -> Result<Arc<dyn LLMProvider>> {
    let settings = config.llm.generation();
    let inner: Arc<dyn LLMProvider> = match config.llm.default_provider.as_str() {
        "openai" => {
            let manager = Arc::new(SecretManager::new(SECRET_SERVICE));
            if !manager.has_secret(OPENAI_API_KEY) {
                tracing::warn!(
                    "No OpenAI key found. Set $OPENAI_API_KEY or run `tuner secret set {}`",
                    OPENAI_API_KEY
                );
            }
            Arc::new(OpenAIProvider::new(
                config.llm.openai.clone(),
                settings,
                Arc::new(SecretCache::new(manager)),
            ))
        }
        "ollama" => Arc::new(OllamaProvider::with_settings(
            config.llm.ollama.base_url.clone(),
            config.llm.ollama.model.clone(),
            settings,
        )),
        other => anyhow::bail!("Unsupported LLM provider '{}'", other),
    };

    Ok(Arc::new(RetryingProvider::new(
        inner,
        RetryPolicy::from(&config.llm.retry),
    )))
}

/// Wire the dispatcher from configuration
pub fn build_dispatcher(config: &Config) -> Result<Arc<CentralDispatcher>> {
    let llm = build_provider(config)?;
    let oracle = Arc::new(HttpOracle::new(&config.oracle));
    let registry = Arc::new(AgentRegistry::builtin().context("Invalid agent registry")?);

    Ok(Arc::new(CentralDispatcher::new(
        llm,
        oracle,
        registry,
        config.design.clone(),
    )))
}

/// Start the HTTP/WebSocket server
pub async fn handle_serve(
    config: &Config,
    host: Option<String>,
    port: Option<u16>,
) -> Result<()> {
    let host = host.unwrap_or_else(|| config.server.host.clone());
    let port = port.unwrap_or(config.server.port);
    let addr: SocketAddr = format!("{}:{}", host, port)
        .parse()
        .with_context(|| format!("Invalid listen address {}:{}", host, port))?;

    let dispatcher = build_dispatcher(config)?;
    let state = AppState::new(dispatcher, config.llm.default_provider.clone());
    server::serve(state, addr).await?;
    Ok(())
}

/// Read a TaskSpec from a JSON file
pub fn load_task_spec(path: &Path) -> Result<TaskSpec> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read task file {}", path.display()))?;
    let spec: TaskSpec = serde_json::from_str(&contents)
        .with_context(|| format!("Failed to parse task file {}", path.display()))?;
    Ok(spec)
}

/// Run a design task from `path`
pub async fn handle_run(
    path: &Path,
    stream: bool,
    config: &Config,
    format: OutputFormat,
) -> Result<()> {
    let spec = load_task_spec(path)?;
    let dispatcher = build_dispatcher(config)?;

    if format == OutputFormat::Text {
        println!("Design task: {}", spec.plant_description());
        println!();
    }

    let response = if stream {
        run_streamed(&dispatcher, &spec, format).await?
    } else {
        dispatcher
            .complete_task(&spec)
            .await
            .context("Design task failed")?
    };

    print_response(&response, format)
}

async fn run_streamed(
    dispatcher: &CentralDispatcher,
    spec: &TaskSpec,
    format: OutputFormat,
) -> Result<CompleteTaskResponse> {
    let mut agent = match dispatcher.prepare_agent(spec).await {
        Ok(agent) => agent,
        Err(EngineError::AgentNotFound) => {
            return Ok(CompleteTaskResponse::failed(
                EngineError::AgentNotFound.to_string(),
            ))
        }
        Err(e) => return Err(e).context("Design task failed"),
    };

    let token = CancellationToken::new();
    let mut transport = StdoutTransport { format };
    let outcome = tokio::select! {
        summary = run_streaming_session(agent.as_mut(), &mut transport, token.clone()) => summary,
        _ = tokio::signal::ctrl_c() => {
            token.cancel();
            Err(EngineError::Cancelled)
        }
    };
    let summary = outcome.context("Design task failed")?;

    Ok(CompleteTaskResponse::completed(summary))
}

/// Prints each round as it arrives
struct StdoutTransport {
    format: OutputFormat,
}

#[async_trait]
impl ResultTransport for StdoutTransport {
    async fn send(&mut self, result: &TaskDesignResult) -> Result<(), EngineError> {
        if result.is_sentinel() {
            return Ok(());
        }
        match self.format {
            OutputFormat::Text => println!("{}", describe_round(result)),
            OutputFormat::Json => {
                let line = serde_json::to_string(result)
                    .map_err(|e| EngineError::TransportDisconnected(e.to_string()))?;
                println!("{}", line);
            }
        }
        Ok(())
    }

    async fn finish(&mut self) -> Result<(), EngineError> {
        Ok(())
    }
}

fn describe_round(result: &TaskDesignResult) -> String {
    let parameters = result
        .parameters
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join(", ");
    let performance = result
        .performance
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "{} Round {}: {} -> {}",
        if result.success { "✓" } else { "✗" },
        result.conversation_round,
        parameters,
        performance
    )
}

fn print_response(response: &CompleteTaskResponse, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(response)?);
        }
        OutputFormat::Text => {
            let Some(result) = &response.final_result else {
                println!("✗ {}", response.msg);
                return Ok(());
            };
            println!("Agent: {}", result.used_agent);
            for round in &result.design_history {
                println!("  {}", describe_round(round));
            }
            println!();
            if result.is_success {
                println!(
                    "✓ Design found after {} attempt(s)",
                    result.design_history.len()
                );
            } else {
                println!(
                    "✗ No design met the requirements in {} attempt(s)",
                    result.design_history.len()
                );
            }
        }
    }
    Ok(())
}

/// List the registered design agents
pub fn handle_agents(format: OutputFormat) -> Result<()> {
    let registry = AgentRegistry::builtin()?;
    match format {
        OutputFormat::Json => {
            let agents: Vec<_> = registry.iter().collect();
            println!("{}", serde_json::to_string_pretty(&json!({ "agents": agents }))?);
        }
        OutputFormat::Text => {
            println!("Design agents:");
            for entry in registry.iter() {
                println!("  {:>3}  {}", entry.id, entry.name);
            }
        }
    }
    Ok(())
}

/// Probe both collaborators; fails if either is unreachable
pub async fn handle_check(config: &Config, format: OutputFormat) -> Result<()> {
    let provider = build_provider(config)?;
    let provider_ok = provider.check_health().await;

    // Any answer from the stability check proves the service is up
    let oracle = HttpOracle::new(&config.oracle);
    let probe = PlantModel {
        num: vec![1.0],
        den: vec![1.0, 1.0],
    };
    let oracle_status = oracle.check_stability(&[1.0, 0.1], &probe).await;

    match format {
        OutputFormat::Json => {
            let report = json!({
                "provider": {
                    "name": provider.name(),
                    "healthy": provider_ok,
                },
                "oracle": {
                    "url": config.oracle.base_url,
                    "healthy": oracle_status.is_ok(),
                    "error": oracle_status.as_ref().err().map(|e| e.to_string()),
                },
            });
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        OutputFormat::Text => {
            println!(
                "{} proposer: {}",
                if provider_ok { "✓" } else { "✗" },
                provider.name()
            );
            match &oracle_status {
                Ok(_) => println!("✓ oracle: {}", config.oracle.base_url),
                Err(e) => println!("✗ oracle: {} ({})", config.oracle.base_url, e),
            }
        }
    }

    if !provider_ok || oracle_status.is_err() {
        anyhow::bail!("One or more collaborators are unavailable");
    }
    Ok(())
}

/// Print the effective configuration
pub fn handle_config_show(config: &Config, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(config)?),
        OutputFormat::Text => print!("{}", config.to_toml()?),
    }
    Ok(())
}

pub fn handle_config_path(path: &Path, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => println!("{}", json!({ "path": path })),
        OutputFormat::Text => println!("{}", path.display()),
    }
    Ok(())
}

/// Store a secret read from the first line of stdin
pub fn handle_secret_set(key: &str) -> Result<()> {
    eprint!("Enter value for '{}': ", key);
    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .context("Failed to read secret from stdin")?;

    SecretManager::new(SECRET_SERVICE).set_secret(key, line.trim())?;
    println!("✓ Stored '{}' in the OS keychain", key);
    Ok(())
}

pub fn handle_secret_delete(key: &str) -> Result<()> {
    SecretManager::new(SECRET_SERVICE).delete_secret(key)?;
    println!("✓ Removed '{}' from the OS keychain", key);
    Ok(())
}
