//! Logging setup
//!
//! One `tracing-subscriber` registry with an `EnvFilter`, writing to stderr
//! so `tuner run --json` keeps stdout machine-readable. `RUST_LOG`, when
//! set, replaces the configured directives entirely.

use serde::{Deserialize, Serialize};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Log line format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Pretty in debug builds, JSON in release builds
    #[default]
    Auto,
    Pretty,
    Json,
}

impl LogFormat {
    /// Concrete format for this build
    pub fn resolve(self) -> LogFormat {
        match self {
            LogFormat::Auto if cfg!(debug_assertions) => LogFormat::Pretty,
            LogFormat::Auto => LogFormat::Json,
            other => other,
        }
    }
}

/// Filter directives for `log_level`: our crates and the HTTP layer at that
/// level, everything else at `warn`
pub fn default_directives(log_level: &str) -> String {
    format!(
        "warn,tuner_engine={0},sdk={0},tower_http={0}",
        log_level
    )
}

/// Install the global subscriber
///
/// A second call is a no-op, which keeps tests that initialise logging
/// independent of each other.
pub fn init_telemetry(log_level: &str, format: LogFormat) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(log_level)));
    let registry = tracing_subscriber::registry().with(filter);

    let installed = match format.resolve() {
        LogFormat::Json => registry
            .with(
                fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_writer(std::io::stderr),
            )
            .try_init(),
        _ => registry
            .with(
                fmt::layer()
                    .pretty()
                    .with_target(false)
                    .with_writer(std::io::stderr),
            )
            .try_init(),
    };

    if installed.is_err() {
        tracing::debug!("Tracing subscriber already installed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auto_resolves_per_build() {
        let expected = if cfg!(debug_assertions) {
            LogFormat::Pretty
        } else {
            LogFormat::Json
        };
        assert_eq!(LogFormat::Auto.resolve(), expected);
        assert_eq!(LogFormat::Json.resolve(), LogFormat::Json);
    }

    #[test]
    fn test_directives_cover_engine_crates() {
        let directives = default_directives("debug");
        assert!(directives.starts_with("warn,"));
        assert!(directives.contains("tuner_engine=debug"));
        assert!(directives.contains("sdk=debug"));
        assert!(EnvFilter::try_new(&directives).is_ok());
    }

    #[test]
    fn test_init_twice_is_harmless() {
        init_telemetry("info", LogFormat::Pretty);
        init_telemetry("debug", LogFormat::Json);
    }
}
