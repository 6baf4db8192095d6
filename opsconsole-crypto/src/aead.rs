//! AEAD cipher service for confidential payload fields.
//!
//! AES-256-GCM with a 16-byte IV and a 128-bit tag, keyed by a PBKDF2 key
//! derived lazily from the configured passphrase. The key is derived at
//! most once per service lifetime: concurrent first callers wait on the
//! same in-flight derivation instead of starting their own.

use crate::envelope::{AeadEnvelope, IV_SIZE};
use crate::error::{CryptoError, CryptoResult};
use crate::kdf::{AeadKey, KeyDeriver, Pbkdf2Deriver};
use crate::key_material::validate_passphrase;
use aes_gcm::aead::consts::U16;
use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::aes::Aes256;
use aes_gcm::{AesGcm, Nonce};
use rand::RngCore;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::OnceCell;
use tracing::{debug, error, info, warn};
use zeroize::Zeroizing;

/// AES-256-GCM with the backend's 16-byte nonce. Tag size stays at 16.
type TransportCipher = AesGcm<Aes256, U16>;

/// Encrypts and decrypts payload fields into the AEAD wire envelope.
///
/// Construct one per application and share it behind an `Arc`. Creating
/// the service never derives the key, so startup is not blocked.
pub struct AeadCipherService {
    passphrase: Zeroizing<String>,
    deriver: Arc<dyn KeyDeriver>,
    /// Swapped for a fresh cell on `dispose`.
    key: Mutex<Arc<OnceCell<AeadKey>>>,
}

impl AeadCipherService {
    /// Creates a service that derives its key with PBKDF2-HMAC-SHA256.
    pub fn new(passphrase: impl Into<String>) -> Self {
        Self::with_deriver(passphrase, Arc::new(Pbkdf2Deriver::default()))
    }

    /// Creates a service with a custom key deriver.
    pub fn with_deriver(passphrase: impl Into<String>, deriver: Arc<dyn KeyDeriver>) -> Self {
        Self {
            passphrase: Zeroizing::new(passphrase.into()),
            deriver,
            key: Mutex::new(Arc::new(OnceCell::new())),
        }
    }

    /// Derives the key if it is not cached yet.
    ///
    /// Concurrent calls share a single derivation. A missing or short
    /// passphrase is returned as an error; there is no degraded mode.
    pub async fn initialize(&self) -> CryptoResult<()> {
        self.with_key(|_| ()).await
    }

    /// Whether a derived key is currently cached.
    pub fn is_initialized(&self) -> bool {
        self.current_cell().initialized()
    }

    /// Drops the cached key. The next call derives it again.
    pub fn dispose(&self) {
        let mut slot = self.key.lock().unwrap_or_else(PoisonError::into_inner);
        *slot = Arc::new(OnceCell::new());
        debug!("AEAD transport key disposed");
    }

    /// Encrypts `plaintext` into a wire envelope.
    ///
    /// Returns `Ok(None)` for empty input and when the cipher fails
    /// internally; callers treat `None` as "encryption unavailable".
    /// Configuration errors surface as `Err`.
    pub async fn encrypt(&self, plaintext: &str) -> CryptoResult<Option<String>> {
        if plaintext.is_empty() {
            return Ok(None);
        }

        self.with_key(|key| match seal(key, plaintext.as_bytes()) {
            Ok(envelope) => Some(envelope.to_string()),
            Err(e) => {
                error!("AEAD encryption failed: {e}");
                None
            }
        })
        .await
    }

    /// Decrypts a wire envelope.
    ///
    /// Malformed input returns `Ok(None)` without deriving the key. Tag
    /// mismatches and corrupt plaintext also return `Ok(None)`, logged the
    /// same way so the two cases cannot be told apart.
    pub async fn decrypt(&self, wire: &str) -> CryptoResult<Option<String>> {
        let envelope = match AeadEnvelope::parse(wire) {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!("rejecting AEAD input: {e}");
                return Ok(None);
            }
        };

        self.with_key(|key| match open(key, &envelope) {
            Ok(plaintext) => Some(plaintext),
            Err(_) => {
                warn!("AEAD envelope could not be opened");
                None
            }
        })
        .await
    }

    async fn with_key<T>(&self, f: impl FnOnce(&AeadKey) -> T) -> CryptoResult<T> {
        let cell = self.current_cell();
        let key = cell.get_or_try_init(|| self.derive()).await?;
        Ok(f(key))
    }

    fn current_cell(&self) -> Arc<OnceCell<AeadKey>> {
        let slot = self.key.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&slot)
    }

    async fn derive(&self) -> CryptoResult<AeadKey> {
        validate_passphrase(&self.passphrase)?;

        debug!("deriving AEAD transport key");
        let deriver = Arc::clone(&self.deriver);
        let passphrase = self.passphrase.clone();
        // Single-flight only holds for callers that stay alive: if this
        // caller is dropped, the task keeps running but the cell stays empty
        // and the next caller starts another derivation.
        let key = tokio::task::spawn_blocking(move || deriver.derive(&passphrase))
            .await
            .map_err(|e| CryptoError::KeyDerivation(format!("derivation task failed: {e}")))??;

        info!("AEAD transport key derived");
        Ok(key)
    }
}

fn cipher_for(key: &AeadKey) -> CryptoResult<TransportCipher> {
    TransportCipher::new_from_slice(key.as_bytes())
        .map_err(|e| CryptoError::KeyDerivation(format!("unusable AEAD key: {e}")))
}

fn seal(key: &AeadKey, plaintext: &[u8]) -> CryptoResult<AeadEnvelope> {
    let cipher = cipher_for(key)?;

    let mut iv = [0u8; IV_SIZE];
    rand::rng().fill_bytes(&mut iv);

    let sealed = cipher
        .encrypt(Nonce::<U16>::from_slice(&iv), plaintext)
        .map_err(|e| CryptoError::Encryption(e.to_string()))?;

    AeadEnvelope::from_sealed(iv, sealed)
}

fn open(key: &AeadKey, envelope: &AeadEnvelope) -> CryptoResult<String> {
    let cipher = cipher_for(key)?;

    let plaintext = cipher
        .decrypt(
            Nonce::<U16>::from_slice(&envelope.iv),
            envelope.to_sealed().as_slice(),
        )
        .map_err(|_| CryptoError::Decryption("authentication failed".to_string()))?;

    String::from_utf8(plaintext)
        .map_err(|_| CryptoError::Decryption("plaintext is not UTF-8".to_string()))
}
