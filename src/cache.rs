//! KeyVersionCache — the resolution engine.
//!
//! Maps (topic, version token) requests to ready-to-use cipher state:
//! - entries expire a fixed interval after the write that created them
//! - at most one fetch is in flight per cache key; concurrent callers join it
//!   and observe its result, success or failure
//! - failures are never cached; the next call retries the fetch
//! - resolving `current` follows the pointer document to the concrete version
//!   inside a single logical load

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::{Condvar, Mutex};
use tracing::trace;

use crate::cipher::TopicCipher;
use crate::config::CryptoConfig;
use crate::error::{Error, Result};
use crate::resolver::{KeyResolver, CURRENT_TOKEN};
use crate::store::SecretStore;
use crate::time::{Clock, SystemClock};

/// Version token part of a cache key: the `current` pointer or a concrete
/// version id.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum VersionToken {
    Current,
    Version(i64),
}

impl fmt::Display for VersionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VersionToken::Current => f.write_str(CURRENT_TOKEN),
            VersionToken::Version(v) => write!(f, "{v}"),
        }
    }
}

/// Identity of one cache slot: the request shape, not the resolved version.
///
/// A `current` entry and the concrete-version entry it resolves to are
/// distinct slots that expire independently.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CacheKey {
    pub topic: String,
    pub token: VersionToken,
    pub path: String,
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.topic, self.token)
    }
}

/// Resolved cipher state for one key generation of one topic.
///
/// Shared read-only by every caller that hits the same cache entry. The
/// embedded [`TopicCipher`] builds a fresh CBC context per call, so concurrent
/// encrypt/decrypt through one `CipherState` is safe.
#[derive(Debug)]
pub struct CipherState {
    pub topic: String,
    pub version: i64,
    pub cipher: TopicCipher,
}

/// One fetch in flight: the loader publishes its result here and every
/// concurrent caller for the same key blocks on it.
#[derive(Default)]
struct Flight {
    result: Mutex<Option<Result<Arc<CipherState>>>>,
    done: Condvar,
}

impl Flight {
    fn wait(&self) -> Result<Arc<CipherState>> {
        let mut guard = self.result.lock();
        loop {
            if let Some(outcome) = guard.as_ref() {
                return outcome.clone();
            }
            self.done.wait(&mut guard);
        }
    }

    fn complete(&self, outcome: Result<Arc<CipherState>>) {
        *self.result.lock() = Some(outcome);
        self.done.notify_all();
    }
}

enum Slot {
    Ready {
        state: Arc<CipherState>,
        inserted_at: i64,
    },
    Loading(Arc<Flight>),
}

enum Role {
    Hit(Arc<CipherState>),
    Join(Arc<Flight>),
    Load(Arc<Flight>),
}

/// Concurrent cache of resolved cipher state with write-time expiry.
pub struct KeyVersionCache {
    resolver: KeyResolver,
    clock: Arc<dyn Clock>,
    ttl_ms: i64,
    entries: Mutex<HashMap<CacheKey, Slot>>,
}

impl KeyVersionCache {
    pub fn new(store: Arc<dyn SecretStore>, config: &CryptoConfig) -> Self {
        Self::with_clock(store, config, Arc::new(SystemClock))
    }

    pub fn with_clock(
        store: Arc<dyn SecretStore>,
        config: &CryptoConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            resolver: KeyResolver::new(store, config),
            clock,
            ttl_ms: config.cache_ttl_ms,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Resolve the currently active key of `topic` via the pointer document.
    pub fn resolve_current(&self, topic: &str) -> Result<Arc<CipherState>> {
        self.resolve(CacheKey {
            topic: topic.to_string(),
            token: VersionToken::Current,
            path: self.resolver.current_path(topic),
        })
    }

    /// Resolve a specific key version of `topic` directly.
    pub fn resolve_version(&self, topic: &str, version: i64) -> Result<Arc<CipherState>> {
        self.resolve(CacheKey {
            topic: topic.to_string(),
            token: VersionToken::Version(version),
            path: self.resolver.version_path(topic, version),
        })
    }

    fn resolve(&self, key: CacheKey) -> Result<Arc<CipherState>> {
        let role = {
            let mut entries = self.entries.lock();
            let now = self.clock.millis();
            let existing = match entries.get(&key) {
                Some(Slot::Ready { state, inserted_at }) if now - *inserted_at < self.ttl_ms => {
                    Some(Role::Hit(state.clone()))
                }
                Some(Slot::Loading(flight)) => Some(Role::Join(flight.clone())),
                // Absent or expired.
                _ => None,
            };
            match existing {
                Some(role) => role,
                // This caller becomes the loader.
                None => {
                    let flight = Arc::new(Flight::default());
                    entries.insert(key.clone(), Slot::Loading(flight.clone()));
                    Role::Load(flight)
                }
            }
        };

        match role {
            Role::Hit(state) => {
                trace!(key = %key, "cache hit");
                Ok(state)
            }
            Role::Join(flight) => {
                trace!(key = %key, "joining fetch in flight");
                flight.wait()
            }
            Role::Load(flight) => {
                let outcome = self.load(&key);
                {
                    let mut entries = self.entries.lock();
                    match &outcome {
                        Ok(state) => {
                            entries.insert(
                                key.clone(),
                                Slot::Ready {
                                    state: state.clone(),
                                    inserted_at: self.clock.millis(),
                                },
                            );
                        }
                        // Failure is not cached; the next caller refetches.
                        Err(_) => {
                            entries.remove(&key);
                        }
                    }
                }
                flight.complete(outcome.clone());
                outcome
            }
        }
    }

    /// Read the document at the key's path, following a pointer document to
    /// its concrete version inside the same logical load.
    fn load(&self, key: &CacheKey) -> Result<Arc<CipherState>> {
        trace!(key = %key, path = %key.path, "retrieving secret");

        let document = self.resolver.read(&key.path)?;
        let (document, version) = if document.is_pointer() {
            let version = document.pointer_version()?;
            let version_path = self.resolver.version_path(&key.topic, version);
            trace!(key = %key, version, path = %version_path, "following pointer");
            (self.resolver.read(&version_path)?, version)
        } else {
            match key.token {
                VersionToken::Version(version) => (document, version),
                VersionToken::Current => {
                    return Err(Error::MalformedSecret(format!(
                        "pointer document expected at '{}'",
                        key.path
                    )));
                }
            }
        };

        let material = document.key_material()?;
        let cipher = TopicCipher::new(&material)?;
        Ok(Arc::new(CipherState {
            topic: key.topic.clone(),
            version,
            cipher,
        }))
    }
}
