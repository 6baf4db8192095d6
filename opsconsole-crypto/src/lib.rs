//! Client-side transport encryption for the operations console.
//!
//! Two unrelated schemes live here, used for different purposes:
//!
//! - [`AeadCipherService`]: AES-256-GCM under a PBKDF2-derived key, for
//!   payload fields that must stay confidential in transit (e.g. email).
//!   Output is the `iv:tag:ciphertext` envelope the backend decrypts.
//! - [`IdObfuscator`]: AES-256-CBC under a static key and IV, for row
//!   identifiers in URLs. Deterministic and **not** a confidentiality
//!   boundary.
//!
//! Both are keyed from [`KeyMaterial`], loaded once at process start.

pub mod aead;
pub mod envelope;
mod error;
pub mod kdf;
pub mod key_material;
pub mod obfuscator;

pub use aead::AeadCipherService;
pub use envelope::{AeadEnvelope, IV_SIZE, TAG_SIZE};
pub use error::{CryptoError, CryptoResult};
pub use kdf::{AeadKey, KdfParams, KeyDeriver, Pbkdf2Deriver, AEAD_KEY_SIZE};
pub use key_material::{KeyMaterial, MIN_PASSPHRASE_CHARS};
pub use obfuscator::IdObfuscator;
