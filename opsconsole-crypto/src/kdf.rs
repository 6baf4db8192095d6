//! Password-based derivation of the AEAD transport key.
//!
//! The backend derives the same key from the same passphrase, so the salt,
//! iteration count and hash below are part of the wire contract. Changing
//! any of them breaks decryption of every envelope in flight.

use crate::error::{CryptoError, CryptoResult};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Size of the derived AEAD key (AES-256).
pub const AEAD_KEY_SIZE: usize = 32;

/// Application-wide PBKDF2 salt shared with the backend.
pub const DEFAULT_SALT: &str = "opsconsole-transport-v1";

/// PBKDF2-HMAC-SHA256 iteration count shared with the backend.
pub const DEFAULT_ITERATIONS: u32 = 100_000;

/// A derived 256-bit AEAD key. Wiped on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct AeadKey([u8; AEAD_KEY_SIZE]);

impl AeadKey {
    pub fn from_bytes(bytes: [u8; AEAD_KEY_SIZE]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; AEAD_KEY_SIZE] {
        &self.0
    }
}

impl fmt::Debug for AeadKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AeadKey(<redacted>)")
    }
}

/// PBKDF2 parameters.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KdfParams {
    pub salt: String,
    pub iterations: u32,
}

impl Default for KdfParams {
    fn default() -> Self {
        Self {
            salt: DEFAULT_SALT.to_string(),
            iterations: DEFAULT_ITERATIONS,
        }
    }
}

/// Turns a passphrase into an AEAD key.
///
/// Implementations are blocking and may be slow; callers run them off the
/// async executor.
pub trait KeyDeriver: Send + Sync {
    fn derive(&self, passphrase: &str) -> CryptoResult<AeadKey>;
}

/// PBKDF2-HMAC-SHA256 key derivation.
#[derive(Clone, Debug, Default)]
pub struct Pbkdf2Deriver {
    params: KdfParams,
}

impl Pbkdf2Deriver {
    pub fn new(params: KdfParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &KdfParams {
        &self.params
    }
}

impl KeyDeriver for Pbkdf2Deriver {
    fn derive(&self, passphrase: &str) -> CryptoResult<AeadKey> {
        if self.params.iterations == 0 {
            return Err(CryptoError::KeyDerivation(
                "iteration count must be non-zero".to_string(),
            ));
        }

        let mut key = [0u8; AEAD_KEY_SIZE];
        pbkdf2::pbkdf2_hmac::<Sha256>(
            passphrase.as_bytes(),
            self.params.salt.as_bytes(),
            self.params.iterations,
            &mut key,
        );
        let derived = AeadKey::from_bytes(key);
        key.zeroize();
        Ok(derived)
    }
}
