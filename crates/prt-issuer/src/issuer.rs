//! Batch issuance.
//!
//! ## Per-token flow
//!
//! ```text
//! 1. r      <- fresh scalar from the OS CSPRNG
//! 2. c1     =  r·G
//! 3. payload = version || signal || HMAC(c1, version, signal)[..8]
//! 4. (c1, c2) = ElGamal.Encrypt(pk, payload; r)
//! 5. opening = revealed ? r : fresh unrelated scalar
//! ```
//!
//! Every token, revealed or not, is encrypted under its own `r`.

use prt_crypto::elgamal::{self, ElGamalPublicKey, Opening};
use prt_crypto::hmac::HmacSecret;
use prt_types::{Signal, Token, TOKEN_PAYLOAD_SIZE};
use tracing::{debug, info};

use crate::policy::RevealPolicy;
use crate::{payload, IssuanceError, Result};

/// Mints token batches for one epoch.
pub struct Issuer<'a> {
    public_key: ElGamalPublicKey,
    hmac_secret: &'a HmacSecret,
    policy: RevealPolicy,
}

impl<'a> Issuer<'a> {
    /// Create an issuer using the default [`RevealPolicy::Prefix`].
    pub fn new(public_key: ElGamalPublicKey, hmac_secret: &'a HmacSecret) -> Self {
        Self {
            public_key,
            hmac_secret,
            policy: RevealPolicy::default(),
        }
    }

    /// Use a different reveal policy.
    pub fn with_policy(mut self, policy: RevealPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn public_key(&self) -> &ElGamalPublicKey {
        &self.public_key
    }

    pub fn policy(&self) -> RevealPolicy {
        self.policy
    }

    /// Issue `num_total` tokens for `signal`, `num_reveal` of them openable.
    ///
    /// # Errors
    ///
    /// - [`IssuanceError::InvalidParameters`] if `num_total == 0` or
    ///   `num_reveal > num_total`
    /// - [`IssuanceError::Encryption`] if any single token fails; no partial
    ///   batch is returned
    pub fn issue(&self, signal: &Signal, num_reveal: usize, num_total: usize) -> Result<Vec<Token>> {
        if num_total == 0 {
            return Err(IssuanceError::InvalidParameters(
                "num_total must be positive".into(),
            ));
        }
        let mask = self.policy.reveal_mask(num_reveal, num_total)?;
        let tokens = mask
            .into_iter()
            .map(|revealed| self.mint(signal, revealed))
            .collect::<Result<Vec<_>>>()?;

        info!(
            num_total,
            num_reveal,
            policy = %self.policy,
            "issued token batch"
        );
        Ok(tokens)
    }

    fn mint(&self, signal: &Signal, revealed: bool) -> Result<Token> {
        let opening = Opening::random().map_err(|e| IssuanceError::Encryption(e.to_string()))?;
        let ephemeral = opening.ephemeral();
        let plaintext = payload::seal(self.hmac_secret, &ephemeral, signal);
        let ciphertext = elgamal::encrypt_with_opening(&self.public_key, &plaintext, &opening);

        let body: [u8; TOKEN_PAYLOAD_SIZE] =
            ciphertext.body.as_slice().try_into().map_err(|_| {
                IssuanceError::Encryption(format!(
                    "ciphertext body is {} bytes, expected {TOKEN_PAYLOAD_SIZE}",
                    ciphertext.body.len()
                ))
            })?;

        let opening_field = if revealed {
            opening.to_bytes()
        } else {
            Opening::random()
                .map_err(|e| IssuanceError::Encryption(e.to_string()))?
                .to_bytes()
        };
        debug!(revealed, "minted token");

        Ok(Token {
            ephemeral: ciphertext.ephemeral,
            body,
            opening: opening_field,
        })
    }
}
