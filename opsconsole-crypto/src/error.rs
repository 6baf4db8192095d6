//! Crypto error types.

use thiserror::Error;

/// Result type for crypto operations.
pub type CryptoResult<T> = Result<T, CryptoError>;

/// Errors raised by the transport crypto layer.
///
/// Only configuration and derivation failures escape the public cipher
/// APIs. Malformed input and authentication failures are recovered inside
/// [`AeadCipherService`](crate::AeadCipherService) and
/// [`IdObfuscator`](crate::IdObfuscator) and never reach callers as errors.
#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("AEAD passphrase is not configured")]
    MissingPassphrase,

    #[error("AEAD passphrase too short (min {min} characters, got {actual})")]
    PassphraseTooShort { min: usize, actual: usize },

    #[error("missing configuration value: {0}")]
    MissingConfig(String),

    #[error("invalid key length: expected {expected} bytes, got {actual}")]
    InvalidKeyLength { expected: usize, actual: usize },

    #[error("invalid hex in {field}: {reason}")]
    InvalidHex { field: String, reason: String },

    #[error("key derivation failed: {0}")]
    KeyDerivation(String),

    #[error("encryption failed: {0}")]
    Encryption(String),

    #[error("decryption failed: {0}")]
    Decryption(String),

    #[error("malformed envelope: {0}")]
    Envelope(String),
}

impl CryptoError {
    /// Whether this error means the key material itself is unusable.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::MissingPassphrase
                | Self::PassphraseTooShort { .. }
                | Self::MissingConfig(_)
                | Self::InvalidKeyLength { .. }
                | Self::InvalidHex { .. }
        )
    }
}
