//! Symmetric tagging secret.
//!
//! Each epoch carries a 32-byte secret, independent of the ElGamal keypair,
//! used to tag token payloads so that the key holder can later tell issued
//! tokens from forgeries. Tags are BLAKE3 keyed hashes under a key derived
//! from the secret:
//!
//! ```text
//! tag_key = BLAKE3::derive_key("PRToken v1 token-tag-key", secret)
//! tag     = BLAKE3::keyed_hash(tag_key, message)
//! ```

use rand::rngs::OsRng;
use rand::RngCore;
use subtle::ConstantTimeEq;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::blake3::{self, contexts};
use crate::{CryptoError, Result};

/// Byte length of the tagging secret.
pub const HMAC_SECRET_SIZE: usize = 32;

/// A per-epoch tagging secret.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct HmacSecret {
    bytes: [u8; HMAC_SECRET_SIZE],
}

/// Generate a fresh tagging secret.
///
/// # Errors
///
/// [`CryptoError::KeyGeneration`] if the OS random source is unavailable.
pub fn generate_hmac_secret() -> Result<HmacSecret> {
    let mut bytes = [0u8; HMAC_SECRET_SIZE];
    OsRng
        .try_fill_bytes(&mut bytes)
        .map_err(|e| CryptoError::KeyGeneration(e.to_string()))?;
    Ok(HmacSecret { bytes })
}

impl HmacSecret {
    /// Wrap existing secret bytes.
    pub fn from_bytes(bytes: [u8; HMAC_SECRET_SIZE]) -> Self {
        Self { bytes }
    }

    /// Wrap existing secret bytes from a slice.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let bytes: [u8; HMAC_SECRET_SIZE] =
            bytes.try_into().map_err(|_| CryptoError::InvalidKeyLength {
                expected: HMAC_SECRET_SIZE,
                actual: bytes.len(),
            })?;
        Ok(Self { bytes })
    }

    /// Raw secret bytes.
    pub fn as_bytes(&self) -> &[u8; HMAC_SECRET_SIZE] {
        &self.bytes
    }

    /// Compute the full 32-byte tag over `message`.
    pub fn tag(&self, message: &[u8]) -> [u8; 32] {
        let key = Zeroizing::new(blake3::derive_key(contexts::TOKEN_TAG_KEY, &self.bytes));
        blake3::keyed_hash(&key, message)
    }

    /// Check a (possibly truncated) tag in constant time.
    pub fn verify(&self, message: &[u8], tag: &[u8]) -> bool {
        if tag.is_empty() || tag.len() > 32 {
            return false;
        }
        let expected = self.tag(message);
        expected[..tag.len()].ct_eq(tag).into()
    }
}
