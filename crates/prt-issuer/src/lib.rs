//! # prt-issuer
//!
//! Probabilistic reveal token issuance.
//!
//! An [`Issuer`] encrypts one client [`Signal`](prt_types::Signal) into a
//! batch of tokens under the epoch public key. A caller-chosen number of them
//! carry their encryption randomness as an opening, so a verifier holding only
//! the public key can recover the signal; the rest carry an unrelated scalar
//! and stay sealed to everyone but the private key holder.
//!
//! ## Modules
//!
//! - [`issuer`] — batch issuance
//! - [`policy`] — which positions of a batch are revealed
//! - [`reveal`] — opening, decryption and tag checks on issued tokens

mod payload;

pub mod issuer;
pub mod policy;
pub mod reveal;

pub use issuer::Issuer;
pub use policy::{reveal_count, RevealPolicy};

/// Error types for issuance.
#[derive(Debug, thiserror::Error)]
pub enum IssuanceError {
    /// Batch parameters violate the issuance preconditions.
    #[error("invalid issuance parameters: {0}")]
    InvalidParameters(String),

    /// Encrypting a token failed; the whole batch is discarded.
    #[error("token encryption failed: {0}")]
    Encryption(String),
}

/// Error types for recovering a signal from an issued token.
#[derive(Debug, thiserror::Error)]
pub enum RevealError {
    /// The token's opening does not match its ciphertext.
    #[error("token is not openable with public data")]
    NotOpenable,

    /// The recovered payload carries an unknown version byte.
    #[error("unsupported token version: {0:#04x}")]
    UnsupportedVersion(u8),

    /// The underlying group operation failed.
    #[error("crypto error: {0}")]
    Crypto(String),
}

/// Convenience result type for issuance.
pub type Result<T> = std::result::Result<T, IssuanceError>;
