//! Secret-store boundary: an opaque path-addressed document store.
//!
//! The transport (HTTP, auth, TLS) lives behind this trait; the crate only
//! needs `read` and `write` on flat string-map documents. Retry policy is
//! applied above the trait, in [`crate::resolver::KeyResolver`].

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use thiserror::Error;

use crate::document::SecretDocument;

/// Failures a store implementation may report.
///
/// Kept deliberately narrow: `NotFound` is deterministic and never retried,
/// `Unavailable` is transient and subject to the configured retry policy.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("path does not exist")]
    NotFound,

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Path-addressed document store with versioning by convention (immutable
/// version paths, a mutable `current` pointer path).
pub trait SecretStore: Send + Sync {
    /// Read the document at `path`.
    fn read(&self, path: &str) -> Result<SecretDocument, StoreError>;

    /// Write `document` at `path`, replacing any existing document.
    fn write(&self, path: &str, document: &SecretDocument) -> Result<(), StoreError>;
}

impl<T> SecretStore for Arc<T>
where
    T: SecretStore + ?Sized,
{
    fn read(&self, path: &str) -> Result<SecretDocument, StoreError> {
        (**self).read(path)
    }

    fn write(&self, path: &str, document: &SecretDocument) -> Result<(), StoreError> {
        (**self).write(path, document)
    }
}

impl<T> SecretStore for Box<T>
where
    T: SecretStore + ?Sized,
{
    fn read(&self, path: &str) -> Result<SecretDocument, StoreError> {
        (**self).read(path)
    }

    fn write(&self, path: &str, document: &SecretDocument) -> Result<(), StoreError> {
        (**self).write(path, document)
    }
}

/// In-memory store for tests and local development.
///
/// Interior mutability via `parking_lot::Mutex`; reads are logged so tests can
/// assert how many fetches actually hit the store.
#[derive(Default)]
pub struct InMemoryStore {
    documents: Mutex<HashMap<String, SecretDocument>>,
    read_log: Mutex<Vec<String>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of reads issued against `path` so far.
    pub fn reads_of(&self, path: &str) -> usize {
        self.read_log.lock().iter().filter(|p| *p == path).count()
    }

    /// Total number of reads issued so far.
    pub fn total_reads(&self) -> usize {
        self.read_log.lock().len()
    }

    /// Remove the document at `path`, if any.
    pub fn remove(&self, path: &str) -> Option<SecretDocument> {
        self.documents.lock().remove(path)
    }
}

impl SecretStore for InMemoryStore {
    fn read(&self, path: &str) -> Result<SecretDocument, StoreError> {
        self.read_log.lock().push(path.to_string());
        self.documents
            .lock()
            .get(path)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    fn write(&self, path: &str, document: &SecretDocument) -> Result<(), StoreError> {
        self.documents
            .lock()
            .insert(path.to_string(), document.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_then_read() {
        let store = InMemoryStore::new();
        let doc = SecretDocument::pointer(42);
        store.write("secret/pubsub/orders/current", &doc).unwrap();
        let read = store.read("secret/pubsub/orders/current").unwrap();
        assert_eq!(read, doc);
    }

    #[test]
    fn missing_path_is_not_found() {
        let store = InMemoryStore::new();
        assert!(matches!(store.read("nope"), Err(StoreError::NotFound)));
    }

    #[test]
    fn read_log_counts_per_path() {
        let store = InMemoryStore::new();
        store.write("a", &SecretDocument::pointer(1)).unwrap();
        let _ = store.read("a");
        let _ = store.read("a");
        let _ = store.read("b");
        assert_eq!(store.reads_of("a"), 2);
        assert_eq!(store.reads_of("b"), 1);
        assert_eq!(store.total_reads(), 3);
    }

    #[test]
    fn works_through_arc_dyn() {
        let store: Arc<dyn SecretStore> = Arc::new(InMemoryStore::new());
        store.write("p", &SecretDocument::pointer(9)).unwrap();
        assert!(store.read("p").is_ok());
    }
}
