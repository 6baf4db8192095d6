//! AEAD wire envelope: `base64(iv):base64(tag):base64(ciphertext)`.
//!
//! The backend decrypter expects a 16-byte IV and a detached 16-byte tag.
//! Both lengths are fixed by that contract and must not drift to the more
//! common 12-byte nonce.

use crate::error::{CryptoError, CryptoResult};
use base64::{engine::general_purpose::STANDARD, Engine};
use std::fmt;
use std::str::FromStr;

/// AEAD IV length on the wire.
pub const IV_SIZE: usize = 16;

/// AEAD authentication tag length (128 bits).
pub const TAG_SIZE: usize = 16;

const SEPARATOR: char = ':';

/// Parsed form of an AEAD wire envelope.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AeadEnvelope {
    pub iv: [u8; IV_SIZE],
    pub tag: [u8; TAG_SIZE],
    pub ciphertext: Vec<u8>,
}

impl AeadEnvelope {
    /// Splits combined `ciphertext || tag` output into an envelope.
    pub fn from_sealed(iv: [u8; IV_SIZE], mut sealed: Vec<u8>) -> CryptoResult<Self> {
        if sealed.len() < TAG_SIZE {
            return Err(CryptoError::Encryption(format!(
                "cipher output shorter than tag ({} bytes)",
                sealed.len()
            )));
        }

        let tag_bytes = sealed.split_off(sealed.len() - TAG_SIZE);
        let mut tag = [0u8; TAG_SIZE];
        tag.copy_from_slice(&tag_bytes);

        Ok(Self {
            iv,
            tag,
            ciphertext: sealed,
        })
    }

    /// Rebuilds `ciphertext || tag`, the layout the AEAD primitive expects.
    pub fn to_sealed(&self) -> Vec<u8> {
        let mut sealed = Vec::with_capacity(self.ciphertext.len() + TAG_SIZE);
        sealed.extend_from_slice(&self.ciphertext);
        sealed.extend_from_slice(&self.tag);
        sealed
    }

    /// Parses the wire string. Any shape other than three valid base64
    /// segments with correctly sized IV and tag is rejected.
    pub fn parse(wire: &str) -> CryptoResult<Self> {
        let parts: Vec<&str> = wire.split(SEPARATOR).collect();
        let [iv, tag, ciphertext] = parts.as_slice() else {
            return Err(CryptoError::Envelope(format!(
                "expected 3 segments, got {}",
                parts.len()
            )));
        };

        Ok(Self {
            iv: decode_fixed::<IV_SIZE>("iv", iv)?,
            tag: decode_fixed::<TAG_SIZE>("tag", tag)?,
            ciphertext: decode("ciphertext", ciphertext)?,
        })
    }
}

impl fmt::Display for AeadEnvelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{SEPARATOR}{}{SEPARATOR}{}",
            STANDARD.encode(self.iv),
            STANDARD.encode(self.tag),
            STANDARD.encode(&self.ciphertext)
        )
    }
}

impl FromStr for AeadEnvelope {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

fn decode(field: &str, segment: &str) -> CryptoResult<Vec<u8>> {
    STANDARD
        .decode(segment)
        .map_err(|e| CryptoError::Envelope(format!("{field} is not valid base64: {e}")))
}

fn decode_fixed<const N: usize>(field: &str, segment: &str) -> CryptoResult<[u8; N]> {
    let bytes = decode(field, segment)?;
    if bytes.len() != N {
        return Err(CryptoError::Envelope(format!(
            "{field} must be {N} bytes, got {}",
            bytes.len()
        )));
    }
    let mut out = [0u8; N];
    out.copy_from_slice(&bytes);
    Ok(out)
}
