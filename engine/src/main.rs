// Tuner: LLM-driven controller design
// Main entry point for the tuner binary

use clap::Parser;
use tuner_engine::cli::{Cli, Command, ConfigAction, SecretAction};
use tuner_engine::config::Config;
use tuner_engine::handlers::{
    handle_agents, handle_check, handle_config_path, handle_config_show, handle_run,
    handle_secret_delete, handle_secret_set, handle_serve, OutputFormat,
};
use tuner_engine::telemetry::init_telemetry;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Text
    };

    let config_path = match &cli.config {
        Some(path) => path.clone(),
        None => Config::default_config_path()?,
    };
    let config = Config::load_or_create_at(&config_path)?;

    // Flags beat the config file; RUST_LOG beats both
    let level = cli.log.map_or(config.core.log_level.as_str(), |l| l.as_str());
    let log_format = cli.log_format.map_or(config.core.log_format, Into::into);
    init_telemetry(level, log_format);

    tracing::info!(
        "Tuner v{} ({}), config {}",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_COMMIT_HASH"),
        config_path.display()
    );

    match cli.command {
        Command::Serve { host, port } => handle_serve(&config, host, port).await,

        Command::Run { spec, stream } => {
            tracing::info!("Running task from {}", spec.display());
            handle_run(&spec, stream, &config, format).await
        }

        Command::Agents => handle_agents(format),

        Command::Check => handle_check(&config, format).await,

        Command::Config { action } => match action {
            ConfigAction::Show => handle_config_show(&config, format),
            ConfigAction::Path => handle_config_path(&config_path, format),
        },

        Command::Secret { action } => match action {
            SecretAction::Set { key } => handle_secret_set(&key),
            SecretAction::Delete { key } => handle_secret_delete(&key),
        },
    }
}
