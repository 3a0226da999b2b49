//! SecretDocument — the flat string map stored at one secret-store path.
//!
//! Two shapes share the same map type:
//! - a *version document*: `cipher`, `key` (base64), `iv` (base64), `key.type`
//! - a *pointer document*: only `version`, the decimal id of the active key
//!
//! A document never carries both shapes; the `version` field decides which one
//! it is.

use std::collections::BTreeMap;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

use crate::error::{Error, Result};

/// Field holding the base64-encoded raw key bytes.
pub const KEY_FIELD: &str = "key";
/// Field holding the base64-encoded initialization vector.
pub const IV_FIELD: &str = "iv";
/// Field holding the cipher identifier (algorithm/mode/padding).
pub const CIPHER_FIELD: &str = "cipher";
/// Field holding the key-type identifier.
pub const KEY_TYPE_FIELD: &str = "key.type";
/// Field that marks a pointer document and names the active version.
pub const VERSION_FIELD: &str = "version";

/// Cipher identifier assumed when a version document omits `cipher`.
pub const DEFAULT_CIPHER: &str = "AES/CBC/PKCS5PADDING";
/// Key type assumed when a version document omits `key.type`.
pub const DEFAULT_KEY_TYPE: &str = "AES";

/// Raw contents of one secret-store path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SecretDocument(BTreeMap<String, String>);

impl SecretDocument {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Build a version document from key material fields.
    pub fn key_document(cipher: &str, key: &[u8], iv: &[u8]) -> Self {
        let mut doc = BTreeMap::new();
        doc.insert(CIPHER_FIELD.to_string(), cipher.to_string());
        doc.insert(KEY_FIELD.to_string(), BASE64.encode(key));
        doc.insert(IV_FIELD.to_string(), BASE64.encode(iv));
        Self(doc)
    }

    /// Build a pointer document naming `version` as the active key.
    pub fn pointer(version: i64) -> Self {
        let mut doc = BTreeMap::new();
        doc.insert(VERSION_FIELD.to_string(), version.to_string());
        Self(doc)
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn insert(&mut self, field: &str, value: &str) {
        self.0.insert(field.to_string(), value.to_string());
    }

    /// Whether this document is a pointer document.
    pub fn is_pointer(&self) -> bool {
        self.0.contains_key(VERSION_FIELD)
    }

    /// Decode the pointed-to version id from a pointer document.
    pub fn pointer_version(&self) -> Result<i64> {
        let raw = self
            .get(VERSION_FIELD)
            .ok_or_else(|| Error::MalformedSecret(format!("missing '{VERSION_FIELD}' field")))?;
        raw.parse::<i64>().map_err(|_| {
            Error::MalformedSecret(format!("'{VERSION_FIELD}' is not an integer: '{raw}'"))
        })
    }

    /// Decode a version document into typed key material.
    ///
    /// `cipher` and `key.type` fall back to their defaults when absent; `key`
    /// and `iv` are required and must be valid base64.
    pub fn key_material(&self) -> Result<KeyMaterial> {
        let key = self.base64_field(KEY_FIELD)?;
        let iv = self.base64_field(IV_FIELD)?;
        let cipher = self.get(CIPHER_FIELD).unwrap_or(DEFAULT_CIPHER).to_string();
        let key_type = self
            .get(KEY_TYPE_FIELD)
            .unwrap_or(DEFAULT_KEY_TYPE)
            .to_string();
        Ok(KeyMaterial {
            cipher,
            key,
            iv,
            key_type,
        })
    }

    fn base64_field(&self, field: &str) -> Result<Vec<u8>> {
        let raw = self
            .get(field)
            .ok_or_else(|| Error::MalformedSecret(format!("missing '{field}' field")))?;
        BASE64
            .decode(raw)
            .map_err(|e| Error::MalformedSecret(format!("'{field}' is not valid base64: {e}")))
    }
}

/// One generation of key material decoded from a version document.
///
/// Immutable after construction. Key and IV bytes are zeroized on drop.
#[derive(Clone)]
pub struct KeyMaterial {
    /// Cipher identifier, e.g. `AES/CBC/PKCS5PADDING`.
    pub cipher: String,
    /// Raw key bytes.
    pub key: Vec<u8>,
    /// Initialization vector bytes.
    pub iv: Vec<u8>,
    /// Key-type identifier, e.g. `AES`.
    pub key_type: String,
}

impl Drop for KeyMaterial {
    fn drop(&mut self) {
        self.key.zeroize();
        self.iv.zeroize();
    }
}

impl std::fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Raw key and IV bytes never appear in debug output.
        f.debug_struct("KeyMaterial")
            .field("cipher", &self.cipher)
            .field("key_bits", &(self.key.len() * 8))
            .field("key_type", &self.key_type)
            .finish()
    }
}
