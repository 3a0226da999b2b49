//! Encrypting serializer/deserializer pair for pub/sub payloads.
//!
//! The payload encoding itself is pluggable: callers supply any
//! [`PayloadSerializer`]/[`PayloadDeserializer`] and the wrappers here add
//! envelope encryption around it. The producer side stamps the key version it
//! encrypted with into the envelope; the consumer side reads that version back
//! out and resolves exactly that key, so both ends agree without coordinating.

use std::marker::PhantomData;
use std::sync::Arc;

use tracing::trace;

use crate::cache::KeyVersionCache;
use crate::envelope;
use crate::error::{Error, Result};

/// Encodes unencrypted payload values to bytes.
pub trait PayloadSerializer<T>: Send + Sync {
    fn serialize(&self, topic: &str, value: &T) -> Result<Vec<u8>>;
}

/// Decodes unencrypted payload bytes to values.
pub trait PayloadDeserializer<T>: Send + Sync {
    fn deserialize(&self, topic: &str, bytes: &[u8]) -> Result<T>;
}

/// Producer-side wrapper: serialize, encrypt with the topic's current key,
/// frame with the resolved key version.
pub struct CryptoSerializer<T, S: PayloadSerializer<T>> {
    inner: S,
    cache: Arc<KeyVersionCache>,
    _marker: PhantomData<fn(&T)>,
}

impl<T, S: PayloadSerializer<T>> CryptoSerializer<T, S> {
    pub fn new(inner: S, cache: Arc<KeyVersionCache>) -> Self {
        Self {
            inner,
            cache,
            _marker: PhantomData,
        }
    }

    pub fn serialize(&self, topic: &str, value: &T) -> Result<Vec<u8>> {
        let state = self.cache.resolve_current(topic)?;
        let plaintext = self.inner.serialize(topic, value)?;
        let ciphertext = state.cipher.encrypt(&plaintext)?;
        let framed = envelope::encode(state.version, &ciphertext);
        trace!(topic, version = state.version, bytes = framed.len(), "sealed payload");
        Ok(framed)
    }
}

/// Consumer-side wrapper: unframe, resolve the stamped key version, decrypt,
/// deserialize.
pub struct CryptoDeserializer<T, D: PayloadDeserializer<T>> {
    inner: D,
    cache: Arc<KeyVersionCache>,
    _marker: PhantomData<fn(&T)>,
}

impl<T, D: PayloadDeserializer<T>> CryptoDeserializer<T, D> {
    pub fn new(inner: D, cache: Arc<KeyVersionCache>) -> Self {
        Self {
            inner,
            cache,
            _marker: PhantomData,
        }
    }

    pub fn deserialize(&self, topic: &str, bytes: &[u8]) -> Result<T> {
        let (version, ciphertext) = envelope::decode(bytes)?;
        trace!(topic, version, bytes = bytes.len(), "opening payload");
        let state = self.cache.resolve_version(topic, version)?;
        let plaintext = state.cipher.decrypt(ciphertext)?;
        self.inner.deserialize(topic, &plaintext)
    }
}

/// UTF-8 string payload codec, the simplest useful inner encoding.
#[derive(Debug, Default, Clone, Copy)]
pub struct StringCodec;

impl PayloadSerializer<String> for StringCodec {
    fn serialize(&self, _topic: &str, value: &String) -> Result<Vec<u8>> {
        Ok(value.as_bytes().to_vec())
    }
}

impl PayloadDeserializer<String> for StringCodec {
    fn deserialize(&self, _topic: &str, bytes: &[u8]) -> Result<String> {
        String::from_utf8(bytes.to_vec()).map_err(|e| Error::Codec(e.to_string()))
    }
}

/// Identity codec for callers that already hold raw bytes.
#[derive(Debug, Default, Clone, Copy)]
pub struct BytesCodec;

impl PayloadSerializer<Vec<u8>> for BytesCodec {
    fn serialize(&self, _topic: &str, value: &Vec<u8>) -> Result<Vec<u8>> {
        Ok(value.clone())
    }
}

impl PayloadDeserializer<Vec<u8>> for BytesCodec {
    fn deserialize(&self, _topic: &str, bytes: &[u8]) -> Result<Vec<u8>> {
        Ok(bytes.to_vec())
    }
}
