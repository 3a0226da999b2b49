//! Typed configuration values for the resolution and rotation layers.
//!
//! Parsing a flat settings map into these values is the caller's concern; the
//! crate consumes values only.

use serde::{Deserialize, Serialize};

/// Default secret backend mount.
pub const DEFAULT_BACKEND: &str = "secret";
/// Default namespace segment under the backend.
pub const DEFAULT_NAMESPACE: &str = "pubsub";
/// Default number of retries for store operations.
pub const DEFAULT_MAX_RETRIES: u32 = 3;
/// Default delay between retry attempts, in milliseconds.
pub const DEFAULT_RETRY_INTERVAL_MS: u64 = 1000;
/// Default cache entry time-to-live: five minutes.
pub const DEFAULT_CACHE_TTL_MS: i64 = 5 * 60 * 1000;

/// Configuration for key resolution, caching, and rotation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CryptoConfig {
    /// Secret-store address. Passed through to whoever constructs the
    /// [`crate::store::SecretStore`] implementation; unused by this crate.
    pub store_address: String,
    /// Bearer credential for the store, likewise passed through.
    pub store_token: Option<String>,
    /// Secret backend mount, the first path segment.
    pub backend: String,
    /// Namespace under the backend where per-topic secrets live.
    pub namespace: String,
    /// Retries for transient store failures.
    pub max_retries: u32,
    /// Delay between retry attempts, in milliseconds.
    pub retry_interval_ms: u64,
    /// Write-time TTL for cached cipher state, in milliseconds.
    pub cache_ttl_ms: i64,
}

impl Default for CryptoConfig {
    fn default() -> Self {
        Self {
            store_address: String::new(),
            store_token: None,
            backend: DEFAULT_BACKEND.to_string(),
            namespace: DEFAULT_NAMESPACE.to_string(),
            max_retries: DEFAULT_MAX_RETRIES,
            retry_interval_ms: DEFAULT_RETRY_INTERVAL_MS,
            cache_ttl_ms: DEFAULT_CACHE_TTL_MS,
        }
    }
}
