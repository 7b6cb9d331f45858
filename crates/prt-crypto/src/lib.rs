//! # prt-crypto
//!
//! Cryptographic primitives for probabilistic reveal token issuance.
//!
//! The suite is fixed: ElGamal over the Ristretto255 prime-order group for
//! token encryption, BLAKE3 for key derivation and keyed tagging.
//!
//! ## Modules
//!
//! - [`blake3`] — Domain-separated BLAKE3 hashing and key derivation
//! - [`elgamal`] — Per-epoch keypair generation, hashed ElGamal encryption,
//!   public opening and private decryption
//! - [`hmac`] — Symmetric secret used to tag token payloads

pub mod blake3;
pub mod elgamal;
pub mod hmac;

/// Error types for cryptographic operations.
#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    /// The OS random source failed while generating key material.
    #[error("key generation failed: {0}")]
    KeyGeneration(String),

    /// The OS random source failed while sampling per-message randomness.
    #[error("randomness unavailable: {0}")]
    Randomness(String),

    /// A key encoding is not a valid group element or canonical scalar.
    #[error("invalid key: {0}")]
    InvalidKey(String),

    /// Invalid key length.
    #[error("invalid key length: expected {expected}, got {actual}")]
    InvalidKeyLength { expected: usize, actual: usize },

    /// The ciphertext ephemeral element does not decode to a group element.
    #[error("invalid ciphertext: {0}")]
    InvalidCiphertext(String),

    /// The supplied opening does not match the ciphertext.
    #[error("opening does not match ciphertext")]
    NotOpenable,
}

pub type Result<T> = std::result::Result<T, CryptoError>;
