//! Configuration-supplied secrets for both cipher schemes.

use crate::error::{CryptoError, CryptoResult};
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Minimum passphrase length, in characters, accepted for the AEAD scheme.
pub const MIN_PASSPHRASE_CHARS: usize = 16;

/// Size of the static ID cipher key (AES-256).
pub const ID_KEY_SIZE: usize = 32;

/// Size of the static ID cipher IV (one AES block).
pub const ID_IV_SIZE: usize = 16;

pub const ENV_AEAD_PASSPHRASE: &str = "OPSCONSOLE_AEAD_PASSPHRASE";
pub const ENV_ID_CIPHER_KEY: &str = "OPSCONSOLE_ID_CIPHER_KEY";
pub const ENV_ID_CIPHER_IV: &str = "OPSCONSOLE_ID_CIPHER_IV";

/// Secrets supplied once at process start.
///
/// Immutable after construction. Every field is wiped when the value is
/// dropped, and `Debug` never prints the secrets.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct KeyMaterial {
    aead_passphrase: String,
    block_cipher_key: [u8; ID_KEY_SIZE],
    block_cipher_iv: [u8; ID_IV_SIZE],
}

impl KeyMaterial {
    /// Builds key material from raw parts, validating the passphrase.
    pub fn new(
        aead_passphrase: impl Into<String>,
        block_cipher_key: [u8; ID_KEY_SIZE],
        block_cipher_iv: [u8; ID_IV_SIZE],
    ) -> CryptoResult<Self> {
        let aead_passphrase = aead_passphrase.into();
        validate_passphrase(&aead_passphrase)?;
        Ok(Self {
            aead_passphrase,
            block_cipher_key,
            block_cipher_iv,
        })
    }

    /// Builds key material from the hex-encoded configuration format.
    pub fn from_hex(aead_passphrase: &str, key_hex: &str, iv_hex: &str) -> CryptoResult<Self> {
        let key = decode_fixed::<ID_KEY_SIZE>(ENV_ID_CIPHER_KEY, key_hex)?;
        let iv = decode_fixed::<ID_IV_SIZE>(ENV_ID_CIPHER_IV, iv_hex)?;
        Self::new(aead_passphrase, key, iv)
    }

    /// Loads key material from the process environment.
    pub fn from_env() -> CryptoResult<Self> {
        let passphrase = std::env::var(ENV_AEAD_PASSPHRASE)
            .ok()
            .filter(|v| !v.is_empty())
            .ok_or(CryptoError::MissingPassphrase)?;
        let key_hex = required_env(ENV_ID_CIPHER_KEY)?;
        let iv_hex = required_env(ENV_ID_CIPHER_IV)?;
        Self::from_hex(&passphrase, key_hex.trim(), iv_hex.trim())
    }

    pub fn aead_passphrase(&self) -> &str {
        &self.aead_passphrase
    }

    pub fn block_cipher_key(&self) -> &[u8; ID_KEY_SIZE] {
        &self.block_cipher_key
    }

    pub fn block_cipher_iv(&self) -> &[u8; ID_IV_SIZE] {
        &self.block_cipher_iv
    }
}

impl fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyMaterial")
            .field("aead_passphrase", &"<redacted>")
            .field("block_cipher_key", &"<redacted>")
            .field("block_cipher_iv", &"<redacted>")
            .finish()
    }
}

/// Rejects a missing or short AEAD passphrase.
pub fn validate_passphrase(passphrase: &str) -> CryptoResult<()> {
    if passphrase.is_empty() {
        return Err(CryptoError::MissingPassphrase);
    }
    let actual = passphrase.chars().count();
    if actual < MIN_PASSPHRASE_CHARS {
        return Err(CryptoError::PassphraseTooShort {
            min: MIN_PASSPHRASE_CHARS,
            actual,
        });
    }
    Ok(())
}

fn required_env(name: &str) -> CryptoResult<String> {
    std::env::var(name)
        .ok()
        .filter(|v| !v.is_empty())
        .ok_or_else(|| CryptoError::MissingConfig(name.to_string()))
}

fn decode_fixed<const N: usize>(field: &str, value: &str) -> CryptoResult<[u8; N]> {
    let bytes = hex::decode(value).map_err(|e| CryptoError::InvalidHex {
        field: field.to_string(),
        reason: e.to_string(),
    })?;

    if bytes.len() != N {
        return Err(CryptoError::InvalidKeyLength {
            expected: N,
            actual: bytes.len(),
        });
    }

    let mut out = [0u8; N];
    out.copy_from_slice(&bytes);
    Ok(out)
}
