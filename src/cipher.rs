//! AES-CBC cipher contexts built from resolved key material.
//!
//! The cipher identifier stored in version documents follows the
//! `algorithm/mode/padding` convention (`AES/CBC/PKCS5PADDING`). PKCS#5 and
//! PKCS#7 padding are interchangeable for AES block sizes, so both names are
//! accepted.

use aes::cipher::block_padding::Pkcs7;
use aes::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use zeroize::Zeroize;

use crate::document::KeyMaterial;
use crate::error::{Error, Result};

/// CBC initialization vectors match the AES block size.
pub const IV_LENGTH: usize = 16;

/// Encrypt/decrypt context for one resolved key generation.
///
/// Key and IV lengths are validated at construction; each `encrypt`/`decrypt`
/// call builds a fresh CBC context from them, so a single `TopicCipher` is
/// safe to use from concurrent callers.
pub struct TopicCipher {
    key: Vec<u8>,
    iv: [u8; IV_LENGTH],
}

impl TopicCipher {
    /// Validate `material` and build a cipher context.
    ///
    /// Fails with [`Error::CipherConfiguration`] on an unknown cipher
    /// identifier or key type, a key that is not 16/24/32 bytes, or an IV
    /// that is not 16 bytes.
    pub fn new(material: &KeyMaterial) -> Result<Self> {
        check_cipher_id(&material.cipher)?;

        if !material.key_type.eq_ignore_ascii_case("AES") {
            return Err(Error::CipherConfiguration(format!(
                "unsupported key type '{}'",
                material.key_type
            )));
        }

        if !matches!(material.key.len(), 16 | 24 | 32) {
            return Err(Error::CipherConfiguration(format!(
                "AES key must be 16, 24, or 32 bytes, got {}",
                material.key.len()
            )));
        }

        let iv: [u8; IV_LENGTH] = material.iv.as_slice().try_into().map_err(|_| {
            Error::CipherConfiguration(format!(
                "IV must be {IV_LENGTH} bytes, got {}",
                material.iv.len()
            ))
        })?;

        Ok(Self {
            key: material.key.clone(),
            iv,
        })
    }

    /// Encrypt `plaintext` with PKCS#7 padding.
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>> {
        let map = |e: aes::cipher::InvalidLength| Error::Encryption(e.to_string());
        Ok(match self.key.len() {
            16 => cbc::Encryptor::<aes::Aes128>::new_from_slices(&self.key, &self.iv)
                .map_err(map)?
                .encrypt_padded_vec_mut::<Pkcs7>(plaintext),
            24 => cbc::Encryptor::<aes::Aes192>::new_from_slices(&self.key, &self.iv)
                .map_err(map)?
                .encrypt_padded_vec_mut::<Pkcs7>(plaintext),
            _ => cbc::Encryptor::<aes::Aes256>::new_from_slices(&self.key, &self.iv)
                .map_err(map)?
                .encrypt_padded_vec_mut::<Pkcs7>(plaintext),
        })
    }

    /// Decrypt `ciphertext` and strip PKCS#7 padding.
    pub fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>> {
        let map = |e: aes::cipher::InvalidLength| Error::Decryption(e.to_string());
        match self.key.len() {
            16 => cbc::Decryptor::<aes::Aes128>::new_from_slices(&self.key, &self.iv)
                .map_err(map)?
                .decrypt_padded_vec_mut::<Pkcs7>(ciphertext),
            24 => cbc::Decryptor::<aes::Aes192>::new_from_slices(&self.key, &self.iv)
                .map_err(map)?
                .decrypt_padded_vec_mut::<Pkcs7>(ciphertext),
            _ => cbc::Decryptor::<aes::Aes256>::new_from_slices(&self.key, &self.iv)
                .map_err(map)?
                .decrypt_padded_vec_mut::<Pkcs7>(ciphertext),
        }
        .map_err(|e| Error::Decryption(e.to_string()))
    }
}

impl Drop for TopicCipher {
    fn drop(&mut self) {
        self.key.zeroize();
        self.iv.zeroize();
    }
}

impl std::fmt::Debug for TopicCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Key material never appears in debug output.
        f.debug_struct("TopicCipher")
            .field("key_bits", &(self.key.len() * 8))
            .finish()
    }
}

fn check_cipher_id(cipher: &str) -> Result<()> {
    let mut parts = cipher.split('/');
    let algorithm = parts.next().unwrap_or_default();
    let mode = parts.next().unwrap_or_default();
    let padding = parts.next().unwrap_or_default();

    let supported = algorithm.eq_ignore_ascii_case("AES")
        && mode.eq_ignore_ascii_case("CBC")
        && (padding.eq_ignore_ascii_case("PKCS5PADDING")
            || padding.eq_ignore_ascii_case("PKCS7PADDING"))
        && parts.next().is_none();

    if supported {
        Ok(())
    } else {
        Err(Error::CipherConfiguration(format!(
            "unsupported cipher '{cipher}'"
        )))
    }
}
