//! Key rotation: publish a new key generation and repoint `current` at it.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, trace};
use zeroize::Zeroize;

use crate::cipher::IV_LENGTH;
use crate::config::CryptoConfig;
use crate::document::{SecretDocument, DEFAULT_CIPHER};
use crate::error::{Error, Result};
use crate::resolver::KeyResolver;
use crate::store::SecretStore;
use crate::time::{Clock, SystemClock};

/// Rotation always generates 256-bit keys.
const GENERATED_KEY_LENGTH: usize = 32;

/// Generates and publishes new key versions for topics.
///
/// Write order is fixed: the immutable version document first, the `current`
/// pointer second. If the version write fails, the pointer is untouched and
/// the old key stays current. If the pointer write fails after retries, the
/// new version document is orphaned but unreferenced; the pointer remains the
/// sole source of truth for `current`.
pub struct KeyRotationWriter {
    resolver: KeyResolver,
    clock: Arc<dyn Clock>,
    /// Highest version issued so far, so two rotations inside the same clock
    /// millisecond still get distinct ids.
    last_version: Mutex<i64>,
}

impl KeyRotationWriter {
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
            last_version: Mutex::new(i64::MIN),
        }
    }

    /// Generate a fresh random key/IV pair, publish it under a new version id,
    /// and repoint `current` to it. Returns the new version id.
    pub fn rotate(&self, topic: &str) -> Result<i64> {
        let version = self.next_version();

        let mut key = [0u8; GENERATED_KEY_LENGTH];
        getrandom::getrandom(&mut key).map_err(|e| Error::Rng(e.to_string()))?;
        let mut iv = [0u8; IV_LENGTH];
        getrandom::getrandom(&mut iv).map_err(|e| Error::Rng(e.to_string()))?;

        let version_path = self.resolver.version_path(topic, version);
        trace!(topic, version, path = %version_path, "writing version document");
        let document = SecretDocument::key_document(DEFAULT_CIPHER, &key, &iv);
        key.zeroize();
        iv.zeroize();
        self.resolver.write(&version_path, &document)?;

        let current_path = self.resolver.current_path(topic);
        trace!(topic, version, path = %current_path, "repointing current");
        self.resolver
            .write(&current_path, &SecretDocument::pointer(version))?;

        debug!(topic, version, "rotated key");
        Ok(version)
    }

    /// Timestamp-derived version id with a monotonic guard against same-tick
    /// rotations.
    fn next_version(&self) -> i64 {
        let mut last = self.last_version.lock();
        let now = self.clock.millis();
        let version = if now > *last { now } else { *last + 1 };
        *last = version;
        version
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::KeyVersionCache;
    use crate::document::{CIPHER_FIELD, IV_FIELD, KEY_FIELD};
    use crate::store::{InMemoryStore, StoreError};
    use crate::time::ManualClock;

    fn config() -> CryptoConfig {
        CryptoConfig {
            retry_interval_ms: 0,
            ..CryptoConfig::default()
        }
    }

    fn writer_over(store: Arc<InMemoryStore>) -> (KeyRotationWriter, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(1000));
        let writer = KeyRotationWriter::with_clock(store, &config(), clock.clone());
        (writer, clock)
    }

    #[test]
    fn rotate_writes_version_document_and_pointer() {
        let store = Arc::new(InMemoryStore::new());
        let (writer, _) = writer_over(store.clone());

        let version = writer.rotate("orders").unwrap();
        assert_eq!(version, 1000);

        let doc = store.read("secret/pubsub/orders/1000").unwrap();
        assert_eq!(doc.get(CIPHER_FIELD), Some(DEFAULT_CIPHER));
        assert!(doc.get(KEY_FIELD).is_some());
        assert!(doc.get(IV_FIELD).is_some());
        assert!(!doc.is_pointer());

        let pointer = store.read("secret/pubsub/orders/current").unwrap();
        assert_eq!(pointer.pointer_version().unwrap(), 1000);
    }

    #[test]
    fn rotated_material_is_usable_and_random() {
        let store = Arc::new(InMemoryStore::new());
        let (writer, clock) = writer_over(store.clone());

        writer.rotate("orders").unwrap();
        clock.advance(1);
        writer.rotate("orders").unwrap();

        let first = store.read("secret/pubsub/orders/1000").unwrap();
        let second = store.read("secret/pubsub/orders/1001").unwrap();
        assert_ne!(first.get(KEY_FIELD), second.get(KEY_FIELD));

        let material = second.key_material().unwrap();
        assert_eq!(material.key.len(), GENERATED_KEY_LENGTH);
        assert_eq!(material.iv.len(), IV_LENGTH);
    }

    #[test]
    fn same_tick_rotations_get_distinct_versions() {
        let store = Arc::new(InMemoryStore::new());
        let (writer, _) = writer_over(store.clone());

        let v1 = writer.rotate("orders").unwrap();
        let v2 = writer.rotate("orders").unwrap();
        let v3 = writer.rotate("orders").unwrap();
        assert_eq!((v1, v2, v3), (1000, 1001, 1002));
        assert!(store.read("secret/pubsub/orders/1001").is_ok());
    }

    #[test]
    fn version_ids_track_the_clock_once_it_advances() {
        let store = Arc::new(InMemoryStore::new());
        let (writer, clock) = writer_over(store);

        assert_eq!(writer.rotate("orders").unwrap(), 1000);
        clock.set(5000);
        assert_eq!(writer.rotate("orders").unwrap(), 5000);
    }

    #[test]
    fn rotate_then_resolve_agree_on_version() {
        let store = Arc::new(InMemoryStore::new());
        let (writer, _) = writer_over(store.clone());
        let cache = KeyVersionCache::new(store, &config());

        let version = writer.rotate("invoices").unwrap();
        let current = cache.resolve_current("invoices").unwrap();
        assert_eq!(current.version, version);

        let direct = cache.resolve_version("invoices", version).unwrap();
        assert_eq!(direct.version, version);

        // Both states decrypt what the other encrypted.
        let ct = current.cipher.encrypt(b"hello").unwrap();
        assert_eq!(direct.cipher.decrypt(&ct).unwrap(), b"hello");
    }

    #[test]
    fn topics_rotated_at_the_same_timestamp_do_not_collide() {
        let store = Arc::new(InMemoryStore::new());
        let clock = Arc::new(ManualClock::new(1000));
        let orders = KeyRotationWriter::with_clock(store.clone(), &config(), clock.clone());
        let invoices = KeyRotationWriter::with_clock(store.clone(), &config(), clock);

        assert_eq!(orders.rotate("orders").unwrap(), 1000);
        assert_eq!(invoices.rotate("invoices").unwrap(), 1000);

        let a = store.read("secret/pubsub/orders/1000").unwrap();
        let b = store.read("secret/pubsub/invoices/1000").unwrap();
        assert_ne!(a.get(KEY_FIELD), b.get(KEY_FIELD));
    }

    /// Store that rejects writes to paths containing a marker substring.
    struct RejectingStore {
        inner: Arc<InMemoryStore>,
        reject_containing: String,
    }

    impl SecretStore for RejectingStore {
        fn read(&self, path: &str) -> std::result::Result<SecretDocument, StoreError> {
            self.inner.read(path)
        }

        fn write(
            &self,
            path: &str,
            document: &SecretDocument,
        ) -> std::result::Result<(), StoreError> {
            if path.contains(&self.reject_containing) {
                return Err(StoreError::Unavailable("write refused".into()));
            }
            self.inner.write(path, document)
        }
    }

    #[test]
    fn version_write_failure_leaves_pointer_untouched() {
        let inner = Arc::new(InMemoryStore::new());
        inner
            .write("secret/pubsub/orders/current", &SecretDocument::pointer(500))
            .unwrap();
        let store = Arc::new(RejectingStore {
            inner: inner.clone(),
            reject_containing: "/1000".into(),
        });
        let clock = Arc::new(ManualClock::new(1000));
        let writer = KeyRotationWriter::with_clock(store, &config(), clock);

        let err = writer.rotate("orders").unwrap_err();
        assert!(matches!(err, Error::SecretStoreUnavailable { .. }));
        // Old key remains current.
        let pointer = inner.read("secret/pubsub/orders/current").unwrap();
        assert_eq!(pointer.pointer_version().unwrap(), 500);
    }

    #[test]
    fn pointer_write_failure_orphans_the_new_version() {
        let inner = Arc::new(InMemoryStore::new());
        inner
            .write("secret/pubsub/orders/current", &SecretDocument::pointer(500))
            .unwrap();
        let store = Arc::new(RejectingStore {
            inner: inner.clone(),
            reject_containing: "/current".into(),
        });
        let clock = Arc::new(ManualClock::new(1000));
        let writer = KeyRotationWriter::with_clock(store, &config(), clock);

        assert!(writer.rotate("orders").is_err());
        // Version document landed but nothing references it.
        assert!(inner.read("secret/pubsub/orders/1000").is_ok());
        let pointer = inner.read("secret/pubsub/orders/current").unwrap();
        assert_eq!(pointer.pointer_version().unwrap(), 500);
    }
}
