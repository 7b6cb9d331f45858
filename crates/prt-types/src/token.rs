//! Token wire layout and issued batches.
//!
//! ```text
//! | ephemeral (32) | body (25) | opening (32) |
//! ```
//!
//! Revealed and blinded tokens share this layout exactly; which class a
//! token belongs to is not recorded in any field.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_with::serde_as;

use crate::{
    Result, TypesError, TOKEN_EPHEMERAL_SIZE, TOKEN_OPENING_SIZE, TOKEN_PAYLOAD_SIZE, TOKEN_SIZE,
};

/// One issued token.
#[serde_as]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    /// Compressed ElGamal `c1`.
    #[serde_as(as = "serde_with::hex::Hex")]
    pub ephemeral: [u8; TOKEN_EPHEMERAL_SIZE],
    /// Encrypted payload (version || signal || tag).
    #[serde_as(as = "serde_with::hex::Hex")]
    pub body: [u8; TOKEN_PAYLOAD_SIZE],
    /// Opening witness for revealed tokens; an unrelated scalar otherwise.
    #[serde_as(as = "serde_with::hex::Hex")]
    pub opening: [u8; TOKEN_OPENING_SIZE],
}

impl Token {
    /// Serialize to the fixed wire layout.
    pub fn to_bytes(&self) -> [u8; TOKEN_SIZE] {
        let mut out = [0u8; TOKEN_SIZE];
        let (eph, rest) = out.split_at_mut(TOKEN_EPHEMERAL_SIZE);
        let (body, opening) = rest.split_at_mut(TOKEN_PAYLOAD_SIZE);
        eph.copy_from_slice(&self.ephemeral);
        body.copy_from_slice(&self.body);
        opening.copy_from_slice(&self.opening);
        out
    }

    /// Parse the fixed wire layout.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() != TOKEN_SIZE {
            return Err(TypesError::InvalidTokenLength {
                expected: TOKEN_SIZE,
                actual: data.len(),
            });
        }
        let mut token = Self {
            ephemeral: [0u8; TOKEN_EPHEMERAL_SIZE],
            body: [0u8; TOKEN_PAYLOAD_SIZE],
            opening: [0u8; TOKEN_OPENING_SIZE],
        };
        let (eph, rest) = data.split_at(TOKEN_EPHEMERAL_SIZE);
        let (body, opening) = rest.split_at(TOKEN_PAYLOAD_SIZE);
        token.ephemeral.copy_from_slice(eph);
        token.body.copy_from_slice(body);
        token.opening.copy_from_slice(opening);
        Ok(token)
    }
}

/// A minted batch handed from the issuer to the store.
#[serde_as]
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TokenBatch {
    /// Tokens in issuance order.
    pub tokens: Vec<Token>,
    /// Compressed public key the batch was encrypted under.
    #[serde_as(as = "serde_with::hex::Hex")]
    pub public_key: [u8; TOKEN_EPHEMERAL_SIZE],
    /// Configured reveal ratio.
    pub p_reveal: f32,
    /// End of the issuing epoch.
    pub epoch_end: DateTime<Utc>,
}
