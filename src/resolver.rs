//! Path construction and retried access to the secret store.

use std::sync::Arc;
use std::time::Duration;

use tracing::{trace, warn};

use crate::config::CryptoConfig;
use crate::document::SecretDocument;
use crate::error::{Error, Result};
use crate::store::{SecretStore, StoreError};

/// Version token for the mutable pointer path.
pub const CURRENT_TOKEN: &str = "current";

/// Translates (topic, version token) pairs into store paths and performs
/// reads/writes under the configured retry policy.
///
/// `NotFound` is returned immediately (the path will not appear by retrying);
/// `Unavailable` is retried `max_retries` times with a fixed delay before
/// surfacing as [`Error::SecretStoreUnavailable`].
pub struct KeyResolver {
    store: Arc<dyn SecretStore>,
    backend: String,
    namespace: String,
    max_retries: u32,
    retry_interval: Duration,
}

impl KeyResolver {
    pub fn new(store: Arc<dyn SecretStore>, config: &CryptoConfig) -> Self {
        Self {
            store,
            backend: config.backend.clone(),
            namespace: config.namespace.clone(),
            max_retries: config.max_retries,
            retry_interval: Duration::from_millis(config.retry_interval_ms),
        }
    }

    /// Path of the version document for `topic` at `version`.
    pub fn version_path(&self, topic: &str, version: i64) -> String {
        self.secret_path(topic, &version.to_string())
    }

    /// Path of the pointer document naming the current version of `topic`.
    pub fn current_path(&self, topic: &str) -> String {
        self.secret_path(topic, CURRENT_TOKEN)
    }

    fn secret_path(&self, topic: &str, token: &str) -> String {
        format!("{}/{}/{}/{}", self.backend, self.namespace, topic, token)
    }

    /// Read the document at `path` with retry.
    pub fn read(&self, path: &str) -> Result<SecretDocument> {
        self.with_retry(path, || self.store.read(path))
    }

    /// Write `document` at `path` with retry.
    pub fn write(&self, path: &str, document: &SecretDocument) -> Result<()> {
        self.with_retry(path, || self.store.write(path, document))
    }

    fn with_retry<T>(
        &self,
        path: &str,
        mut op: impl FnMut() -> std::result::Result<T, StoreError>,
    ) -> Result<T> {
        let attempts = 1 + self.max_retries;
        let mut last_reason = String::new();
        for attempt in 1..=attempts {
            trace!(path, attempt, "store access");
            match op() {
                Ok(value) => return Ok(value),
                Err(StoreError::NotFound) => {
                    return Err(Error::SecretNotFound {
                        path: path.to_string(),
                    });
                }
                Err(StoreError::Unavailable(reason)) => {
                    warn!(path, attempt, %reason, "store unavailable");
                    last_reason = reason;
                    if attempt < attempts {
                        std::thread::sleep(self.retry_interval);
                    }
                }
            }
        }
        Err(Error::SecretStoreUnavailable {
            path: path.to_string(),
            attempts,
            reason: last_reason,
        })
    }
}
