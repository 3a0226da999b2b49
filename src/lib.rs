//! Per-topic envelope encryption for pub/sub pipelines.
//!
//! Messages are encrypted with per-topic symmetric keys held in a remote
//! secret store. Keys are versioned: each topic has immutable version
//! documents plus a mutable `current` pointer naming the active one.
//! Producers resolve `current`, encrypt, and stamp the resolved version into
//! a compact binary envelope; consumers read the version back out of the
//! envelope and resolve exactly that key. Resolved cipher state is cached
//! with a write-time TTL and concurrent fetches for the same key are
//! de-duplicated.
//!
//! ```
//! use std::sync::Arc;
//! use topic_vault::{
//!     BytesCodec, CryptoConfig, CryptoDeserializer, CryptoSerializer, InMemoryStore,
//!     KeyRotationWriter, KeyVersionCache,
//! };
//!
//! let store = Arc::new(InMemoryStore::new());
//! let config = CryptoConfig::default();
//!
//! let writer = KeyRotationWriter::new(store.clone(), &config);
//! writer.rotate("orders").unwrap();
//!
//! let cache = Arc::new(KeyVersionCache::new(store, &config));
//! let producer = CryptoSerializer::new(BytesCodec, cache.clone());
//! let consumer = CryptoDeserializer::new(BytesCodec, cache);
//!
//! let sealed = producer.serialize("orders", &b"hello".to_vec()).unwrap();
//! assert_eq!(consumer.deserialize("orders", &sealed).unwrap(), b"hello");
//! ```

pub mod cache;
pub mod cipher;
pub mod codec;
pub mod config;
pub mod document;
pub mod envelope;
pub mod error;
pub mod resolver;
pub mod rotation;
pub mod store;
pub mod time;

pub use cache::{CacheKey, CipherState, KeyVersionCache, VersionToken};
pub use cipher::{TopicCipher, IV_LENGTH};
pub use codec::{
    BytesCodec, CryptoDeserializer, CryptoSerializer, PayloadDeserializer, PayloadSerializer,
    StringCodec,
};
pub use config::CryptoConfig;
pub use document::{KeyMaterial, SecretDocument, DEFAULT_CIPHER, DEFAULT_KEY_TYPE};
pub use envelope::{HEADER_LEN, MAGIC_BYTE};
pub use error::{Error, Result};
pub use resolver::KeyResolver;
pub use rotation::KeyRotationWriter;
pub use store::{InMemoryStore, SecretStore, StoreError};
pub use time::{Clock, ManualClock, SystemClock};
