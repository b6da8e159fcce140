//! Command-line surface of the `tuner` binary (clap derive)

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::telemetry::LogFormat;

/// Tuner: LLM-driven controller design
///
/// Routes a control design task to a specialised agent that proposes
/// controller parameters with a language model, evaluates them, and iterates
/// until the performance requirements are met.
#[derive(Parser, Debug)]
#[command(name = "tuner")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Print results as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Log level, overriding the config file
    #[arg(long, global = true, value_name = "LEVEL")]
    pub log: Option<LogLevel>,

    /// Log line format, overriding the config file
    #[arg(long, global = true, value_name = "FORMAT")]
    pub log_format: Option<LogFormatArg>,

    /// Configuration file to use instead of ~/.tuner/config.toml
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the HTTP/WebSocket task server
    Serve {
        /// Address to bind (overrides config)
        #[arg(long)]
        host: Option<String>,

        /// Port to bind (overrides config)
        #[arg(long)]
        port: Option<u16>,
    },

    /// Run a design task from a JSON file
    Run {
        /// Path to a TaskSpec JSON file
        spec: PathBuf,

        /// Print each design round as it completes
        #[arg(long)]
        stream: bool,
    },

    /// List registered design agents
    Agents,

    /// Probe the configured proposer and evaluation service
    Check,

    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Manage provider secrets in the OS keychain
    Secret {
        #[command(subcommand)]
        action: SecretAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Print the effective configuration
    Show,
    /// Print the path of the configuration file in use
    Path,
}

#[derive(Subcommand, Debug)]
pub enum SecretAction {
    /// Store a secret read from stdin (e.g. openai_api_key)
    Set { key: String },
    /// Remove a stored secret
    Delete { key: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Json,
}

impl From<LogFormatArg> for LogFormat {
    fn from(arg: LogFormatArg) -> Self {
        match arg {
            LogFormatArg::Pretty => LogFormat::Pretty,
            LogFormatArg::Json => LogFormat::Json,
        }
    }
}
