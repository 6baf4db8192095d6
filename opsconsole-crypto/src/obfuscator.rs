//! Deterministic identifier obfuscation for URLs.
//!
//! **This is not encryption in the confidentiality sense.** The key and IV
//! are static and shipped to every client, so equal identifiers always map
//! to equal hex strings and anyone holding the configuration can reverse
//! them. It only makes row IDs non-sequential and not guessable by
//! inspection. Use [`AeadCipherService`](crate::AeadCipherService) for
//! anything that must stay secret.
//!
//! The IV must stay static. Links and bookmarks embed obfuscated IDs, and
//! equality checks between obfuscated IDs assume equal inputs encrypt
//! equally.

use crate::error::{CryptoError, CryptoResult};
use crate::key_material::{ID_IV_SIZE, ID_KEY_SIZE, KeyMaterial};
use aes::Aes256;
use cbc::cipher::block_padding::Pkcs7;
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use std::fmt;
use tracing::warn;
use zeroize::{Zeroize, ZeroizeOnDrop};

type IdEncryptor = cbc::Encryptor<Aes256>;
type IdDecryptor = cbc::Decryptor<Aes256>;

/// AES-256-CBC with PKCS7 padding under a fixed key and IV.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct IdObfuscator {
    key: [u8; ID_KEY_SIZE],
    iv: [u8; ID_IV_SIZE],
}

impl IdObfuscator {
    pub fn new(key: [u8; ID_KEY_SIZE], iv: [u8; ID_IV_SIZE]) -> Self {
        Self { key, iv }
    }

    pub fn from_key_material(material: &KeyMaterial) -> Self {
        Self::new(*material.block_cipher_key(), *material.block_cipher_iv())
    }

    /// Returns the lowercase hex ciphertext of `plaintext`.
    ///
    /// Same input, same output, across calls and across restarts.
    pub fn obfuscate(&self, plaintext: &str) -> String {
        let ciphertext = IdEncryptor::new(&self.key.into(), &self.iv.into())
            .encrypt_padded_vec_mut::<Pkcs7>(plaintext.as_bytes());
        hex::encode(ciphertext)
    }

    /// Recovers the identifier from its hex form.
    ///
    /// Returns an empty string for empty input or anything that does not
    /// decrypt cleanly; callers treat `""` as "could not recover".
    pub fn deobfuscate(&self, hex_value: &str) -> String {
        if hex_value.is_empty() {
            return String::new();
        }

        match self.try_deobfuscate(hex_value) {
            Ok(plaintext) => plaintext,
            Err(e) => {
                warn!("could not deobfuscate identifier: {e}");
                String::new()
            }
        }
    }

    fn try_deobfuscate(&self, hex_value: &str) -> CryptoResult<String> {
        let ciphertext = hex::decode(hex_value).map_err(|e| CryptoError::InvalidHex {
            field: "obfuscated id".to_string(),
            reason: e.to_string(),
        })?;

        let plaintext = IdDecryptor::new(&self.key.into(), &self.iv.into())
            .decrypt_padded_vec_mut::<Pkcs7>(&ciphertext)
            .map_err(|_| CryptoError::Decryption("bad block length or padding".to_string()))?;

        String::from_utf8(plaintext)
            .map_err(|_| CryptoError::Decryption("identifier is not UTF-8".to_string()))
    }
}

impl fmt::Debug for IdObfuscator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("IdObfuscator(<redacted>)")
    }
}
