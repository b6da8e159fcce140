//! Secret lookup for provider credentials
//!
//! A secret named `openai_api_key` is read from `$OPENAI_API_KEY` first and
//! from the OS keychain (service `tuner`) second. Nothing here prompts: a
//! server process has no terminal to ask, so a missing key is an error that
//! names both places to put it.

pub mod cache;
pub mod string;

pub use cache::SecretCache;
pub use string::SecretString;

use keyring::Entry;
use regex::Regex;
use sdk::errors::EngineError;
use std::sync::OnceLock;

/// Where a secret was found
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecretSource {
    Environment,
    Keychain,
}

/// Reads and writes named secrets for one keychain service
pub struct SecretManager {
    service: String,
}

impl SecretManager {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    /// Environment variable consulted for `key`
    pub fn env_var_name(key: &str) -> String {
        key.to_ascii_uppercase()
    }

    /// Look `key` up, environment first
    ///
    /// # Errors
    /// `EngineError::KeyringError` if neither source has it or the keychain
    /// cannot be read
    pub fn get_secret(&self, key: &str) -> Result<String, EngineError> {
        self.lookup(key).map(|(value, _)| value)
    }

    /// Like [`get_secret`](Self::get_secret), also reporting the source
    pub fn lookup(&self, key: &str) -> Result<(String, SecretSource), EngineError> {
        if let Some(value) = from_env(key) {
            tracing::debug!("Secret '{}' taken from the environment", key);
            return Ok((value, SecretSource::Environment));
        }

        match self.entry(key)?.get_password() {
            Ok(value) => {
                tracing::debug!("Secret '{}' taken from the keychain", key);
                Ok((value, SecretSource::Keychain))
            }
            Err(keyring::Error::NoEntry) => Err(EngineError::KeyringError(format!(
                "Secret '{}' not found. Set ${} or run `tuner secret set {}`",
                key,
                Self::env_var_name(key),
                key
            ))),
            Err(e) => Err(EngineError::KeyringError(format!(
                "Keychain read of '{}' failed: {}",
                key, e
            ))),
        }
    }

    /// Store `value` in the keychain
    pub fn set_secret(&self, key: &str, value: &str) -> Result<(), EngineError> {
        let value = value.trim();
        if value.is_empty() {
            return Err(EngineError::KeyringError(format!(
                "Refusing to store an empty value for '{}'",
                key
            )));
        }

        self.entry(key)?.set_password(value).map_err(|e| {
            EngineError::KeyringError(format!("Keychain write of '{}' failed: {}", key, e))
        })?;
        tracing::info!("Stored secret '{}' in the keychain", key);
        Ok(())
    }

    /// Remove `key` from the keychain; the environment is left alone
    pub fn delete_secret(&self, key: &str) -> Result<(), EngineError> {
        self.entry(key)?.delete_password().map_err(|e| {
            EngineError::KeyringError(format!("Keychain delete of '{}' failed: {}", key, e))
        })?;
        tracing::info!("Deleted secret '{}' from the keychain", key);
        Ok(())
    }

    pub fn has_secret(&self, key: &str) -> bool {
        from_env(key).is_some()
            || self
                .entry(key)
                .is_ok_and(|entry| entry.get_password().is_ok())
    }

    fn entry(&self, key: &str) -> Result<Entry, EngineError> {
        Entry::new(&self.service, key).map_err(|e| {
            EngineError::KeyringError(format!("No keychain entry for '{}': {}", key, e))
        })
    }
}

fn from_env(key: &str) -> Option<String> {
    std::env::var(SecretManager::env_var_name(key))
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

// OpenAI-style keys (sk-, sk-proj-, ...), bearer tokens, JSON api_key fields
const SECRET_PATTERNS: [&str; 3] = [
    r"sk-[a-zA-Z0-9\-_]{20,}",
    r"Bearer\s+[^\s]{20,}",
    r#""api_key"\s*:\s*"[^"]+""#,
];

fn secret_patterns() -> &'static [Regex] {
    static COMPILED: OnceLock<Vec<Regex>> = OnceLock::new();
    COMPILED.get_or_init(|| {
        SECRET_PATTERNS
            .iter()
            .filter_map(|p| Regex::new(p).ok())
            .collect()
    })
}

/// Replace anything that looks like a credential with `[REDACTED]`
///
/// Applied to provider error bodies before they reach logs or errors.
pub fn scrub_secrets(text: &str) -> String {
    secret_patterns().iter().fold(text.to_string(), |acc, re| {
        re.replace_all(&acc, "[REDACTED]").into_owned()
    })
}
