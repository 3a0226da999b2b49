use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by key resolution, rotation, and the envelope codec.
///
/// The enum is `Clone` so a single in-flight cache load can hand its outcome
/// to every caller waiting on it.
#[derive(Debug, Clone, Error)]
pub enum Error {
    #[error("no secret at '{path}'")]
    SecretNotFound { path: String },

    #[error("secret store unavailable reading '{path}' after {attempts} attempts: {reason}")]
    SecretStoreUnavailable {
        path: String,
        attempts: u32,
        reason: String,
    },

    #[error("malformed secret document: {0}")]
    MalformedSecret(String),

    #[error("cipher configuration rejected: {0}")]
    CipherConfiguration(String),

    #[error("envelope too short: got {got} bytes, need at least {min}")]
    EnvelopeTooShort { got: usize, min: usize },

    #[error("envelope does not start with magic byte (got 0x{got:02x})")]
    EnvelopeBadMagic { got: u8 },

    #[error("envelope declares {declared} ciphertext bytes but only {available} remain")]
    EnvelopeTruncated { declared: usize, available: usize },

    #[error("encryption failed: {0}")]
    Encryption(String),

    #[error("decryption failed: {0}")]
    Decryption(String),

    #[error("random number generation failed: {0}")]
    Rng(String),

    #[error("payload codec error: {0}")]
    Codec(String),
}
