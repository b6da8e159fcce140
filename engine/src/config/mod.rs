//! Engine configuration
//!
//! Read from `~/.tuner/config.toml`, or from the file given with `--config`.
//! A missing file is written out with defaults on first start. Every section
//! and every key is optional.
//!
//! ```toml
//! [core]
//! log_level = "info"        # error | warn | info | debug | trace
//! log_format = "auto"       # auto | pretty | json
//! data_dir = "~/.tuner"
//!
//! [llm]
//! default_provider = "openai"   # openai | ollama
//! temperature = 0.0
//! max_tokens = 1024
//!
//! [llm.retry]
//! max_retries = 5
//! initial_backoff_ms = 4000
//! max_backoff_ms = 60000
//!
//! [oracle]
//! base_url = "http://localhost:8090"
//!
//! [design]
//! max_attempts = 10
//! ```

use sdk::errors::EngineError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::llm::GenerationSettings;
use crate::telemetry::LogFormat;

const LOG_LEVELS: [&str; 5] = ["error", "warn", "info", "debug", "trace"];
const PROVIDERS: [&str; 2] = ["openai", "ollama"];

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub core: CoreConfig,
    pub llm: LLMConfig,
    pub oracle: OracleConfig,
    pub design: DesignConfig,
    pub server: ServerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    pub log_level: String,
    pub log_format: LogFormat,
    /// Engine working directory, `~` is expanded on load
    pub data_dir: PathBuf,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Auto,
            data_dir: PathBuf::from("~/.tuner"),
        }
    }
}

impl CoreConfig {
    fn validate(&self) -> Result<(), EngineError> {
        if !LOG_LEVELS.contains(&self.log_level.as_str()) {
            return Err(EngineError::Config(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.log_level,
                LOG_LEVELS.join(", ")
            )));
        }
        Ok(())
    }
}

/// Proposer settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LLMConfig {
    pub default_provider: String,
    /// Sampling temperature; 0 keeps proposals reproducible
    pub temperature: f64,
    pub max_tokens: u32,
    pub openai: OpenAIConfig,
    pub ollama: OllamaConfig,
    pub retry: RetryConfig,
}

impl Default for LLMConfig {
    fn default() -> Self {
        Self {
            default_provider: "openai".to_string(),
            temperature: 0.0,
            max_tokens: 1024,
            openai: OpenAIConfig::default(),
            ollama: OllamaConfig::default(),
            retry: RetryConfig::default(),
        }
    }
}

impl LLMConfig {
    /// Sampling settings handed to whichever provider is built
    pub fn generation(&self) -> GenerationSettings {
        GenerationSettings {
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        }
    }

    fn validate(&self) -> Result<(), EngineError> {
        if !PROVIDERS.contains(&self.default_provider.as_str()) {
            return Err(EngineError::Config(format!(
                "Invalid default provider '{}'. Must be one of: {}",
                self.default_provider,
                PROVIDERS.join(", ")
            )));
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(EngineError::Config(format!(
                "temperature {} is outside 0.0-2.0",
                self.temperature
            )));
        }
        if self.max_tokens == 0 {
            return Err(EngineError::Config(
                "max_tokens must be at least 1".to_string(),
            ));
        }
        self.retry.validate()
    }
}

/// OpenAI-compatible chat completions endpoint
///
/// The API key is not part of the file: it comes from `$OPENAI_API_KEY` or
/// the OS keychain.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenAIConfig {
    pub base_url: String,
    pub model: String,
    pub timeout_secs: u64,
}

impl Default for OpenAIConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-2024-08-06".to_string(),
            timeout_secs: 120,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OllamaConfig {
    pub base_url: String,
    pub model: String,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            model: "llama3.1:8b".to_string(),
        }
    }
}

/// Backoff for transient proposer failures
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 5,
            initial_backoff_ms: 4_000,
            max_backoff_ms: 60_000,
        }
    }
}

impl RetryConfig {
    fn validate(&self) -> Result<(), EngineError> {
        if self.initial_backoff_ms > self.max_backoff_ms {
            return Err(EngineError::Config(format!(
                "initial_backoff_ms ({}) exceeds max_backoff_ms ({})",
                self.initial_backoff_ms, self.max_backoff_ms
            )));
        }
        Ok(())
    }
}

/// Evaluation service endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OracleConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8090".to_string(),
            timeout_secs: 120,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DesignConfig {
    /// Proposer calls allowed per task
    pub max_attempts: u32,
}

impl Default for DesignConfig {
    fn default() -> Self {
        Self { max_attempts: 10 }
    }
}

impl DesignConfig {
    fn validate(&self) -> Result<(), EngineError> {
        if self.max_attempts == 0 {
            return Err(EngineError::Config(
                "max_attempts must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
        }
    }
}

impl Config {
    /// Load `~/.tuner/config.toml`, creating it with defaults if missing
    pub fn load_or_create() -> Result<Self, EngineError> {
        Self::load_or_create_at(&Self::default_config_path()?)
    }

    /// Load `path`, creating it with defaults if missing
    pub fn load_or_create_at(path: &Path) -> Result<Self, EngineError> {
        if !path.exists() {
            Self::write_default(path)?;
        }
        Self::load_from_path(path)
    }

    /// Load and validate an existing file
    ///
    /// # Errors
    /// `EngineError::Config` if the file cannot be read or parsed, a value
    /// is out of range, or the data directory cannot be created
    pub fn load_from_path(path: &Path) -> Result<Self, EngineError> {
        let contents = fs::read_to_string(path).map_err(|e| {
            EngineError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let mut config: Config = toml::from_str(&contents)
            .map_err(|e| EngineError::Config(format!("Failed to parse config: {}", e)))?;

        config.validate()?;
        config.prepare_data_dir()?;
        Ok(config)
    }

    /// `~/.tuner/config.toml`
    pub fn default_config_path() -> Result<PathBuf, EngineError> {
        Ok(home_dir()?.join(".tuner").join("config.toml"))
    }

    pub fn to_toml(&self) -> Result<String, EngineError> {
        toml::to_string_pretty(self)
            .map_err(|e| EngineError::Config(format!("Failed to serialize config: {}", e)))
    }

    /// Check every section without touching the filesystem
    pub fn validate(&self) -> Result<(), EngineError> {
        self.core.validate()?;
        self.llm.validate()?;
        self.design.validate()
    }

    // The file keeps the portable `~` form; expansion happens on load.
    fn write_default(path: &Path) -> Result<(), EngineError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                EngineError::Config(format!("Failed to create {}: {}", parent.display(), e))
            })?;
        }
        fs::write(path, Self::default().to_toml()?).map_err(|e| {
            EngineError::Config(format!("Failed to write {}: {}", path.display(), e))
        })?;
        tracing::info!("Wrote default configuration to {}", path.display());
        Ok(())
    }

    fn prepare_data_dir(&mut self) -> Result<(), EngineError> {
        self.core.data_dir = expand_home(&self.core.data_dir)?;
        fs::create_dir_all(&self.core.data_dir).map_err(|e| {
            EngineError::Config(format!(
                "Failed to create data directory {}: {}",
                self.core.data_dir.display(),
                e
            ))
        })
    }
}

fn home_dir() -> Result<PathBuf, EngineError> {
    dirs::home_dir()
        .ok_or_else(|| EngineError::Config("Could not determine home directory".to_string()))
}

/// Replace a leading `~` component with the home directory
fn expand_home(path: &Path) -> Result<PathBuf, EngineError> {
    match path.strip_prefix("~") {
        Ok(rest) if rest.as_os_str().is_empty() => home_dir(),
        Ok(rest) => Ok(home_dir()?.join(rest)),
        Err(_) => Ok(path.to_path_buf()),
    }
}
