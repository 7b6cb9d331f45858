//! # prt-types
//!
//! Shared domain types for probabilistic reveal token issuance.
//!
//! - [`signal`] — the 16-byte client signal and address encoding
//! - [`epoch`] — the 24-hour validity window and artifact timestamps
//! - [`token`] — token wire layout and the issued batch

pub mod epoch;
pub mod signal;
pub mod token;

pub use epoch::EpochWindow;
pub use signal::Signal;
pub use token::{Token, TokenBatch};

/// Width of the client signal in bytes (IPv6-shaped address).
pub const SIGNAL_SIZE: usize = 16;

/// Epoch duration in seconds (24 hours).
pub const EPOCH_DURATION_SECS: i64 = 86400;

/// Version byte at the start of every token payload.
pub const TOKEN_VERSION: u8 = 0x01;

/// Bytes of tag carried in each token payload.
pub const TOKEN_TAG_SIZE: usize = 8;

/// Payload size: version || signal || tag.
pub const TOKEN_PAYLOAD_SIZE: usize = 1 + SIGNAL_SIZE + TOKEN_TAG_SIZE;

/// Compressed group element size.
pub const TOKEN_EPHEMERAL_SIZE: usize = 32;

/// Opening field size (one canonical scalar).
pub const TOKEN_OPENING_SIZE: usize = 32;

/// Full token wire size.
pub const TOKEN_SIZE: usize = TOKEN_EPHEMERAL_SIZE + TOKEN_PAYLOAD_SIZE + TOKEN_OPENING_SIZE;

/// Errors raised while constructing domain values.
#[derive(Debug, thiserror::Error)]
pub enum TypesError {
    /// The input is neither an IPv4 nor an IPv6 literal.
    #[error("invalid IPv4 or IPv6 address: {0:?}")]
    InvalidAddress(String),

    /// The epoch window does not end after it starts.
    #[error("epoch window must end after it starts")]
    InvalidEpochWindow,

    /// A token encoding has the wrong length.
    #[error("invalid token length: expected {expected}, got {actual}")]
    InvalidTokenLength { expected: usize, actual: usize },
}

pub type Result<T> = std::result::Result<T, TypesError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_layout() {
        assert_eq!(TOKEN_PAYLOAD_SIZE, 25);
        assert_eq!(TOKEN_SIZE, 89);
    }
}
