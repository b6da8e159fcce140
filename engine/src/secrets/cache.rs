use sdk::errors::EngineError;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use super::{SecretManager, SecretString};

/// Memoizes [`SecretManager`] lookups for the life of the process
///
/// Providers ask for their key on every request; the environment and the
/// keychain are consulted once per key.
pub struct SecretCache {
    manager: Arc<SecretManager>,
    entries: RwLock<HashMap<String, SecretString>>,
}

impl SecretCache {
    pub fn new(manager: Arc<SecretManager>) -> Self {
        Self {
            manager,
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn get_secret(&self, key: &str) -> Result<SecretString, EngineError> {
        let cached = self
            .entries
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(key)
            .cloned();
        if let Some(secret) = cached {
            return Ok(secret);
        }

        let secret = SecretString::new(self.manager.get_secret(key)?);
        self.insert(key, secret.clone());
        Ok(secret)
    }

    /// Seed the cache with a known value
    pub fn insert(&self, key: &str, secret: SecretString) {
        self.entries
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(key.to_string(), secret);
    }

    /// Drop a cached value so the next lookup goes back to the sources
    pub fn forget(&self, key: &str) {
        self.entries
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .remove(key);
    }
}
