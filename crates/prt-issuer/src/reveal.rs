//! Recovering signals from issued tokens.
//!
//! Two paths exist. [`open_token`] needs only the epoch public key and works
//! for revealed tokens. [`decrypt_token`] needs the epoch private key and
//! works for every token in the batch.

use prt_crypto::elgamal::{self, Ciphertext, ElGamalPublicKey, KeyMaterial};
use prt_crypto::hmac::HmacSecret;
use prt_crypto::CryptoError;
use prt_types::{Signal, Token};

use crate::{payload, RevealError};

fn ciphertext_of(token: &Token) -> Ciphertext {
    Ciphertext {
        ephemeral: token.ephemeral,
        body: token.body.to_vec(),
    }
}

fn map_crypto(err: CryptoError) -> RevealError {
    match err {
        CryptoError::NotOpenable => RevealError::NotOpenable,
        other => RevealError::Crypto(other.to_string()),
    }
}

/// Recover the signal of a revealed token using public data only.
///
/// # Errors
///
/// - [`RevealError::NotOpenable`] for blinded tokens
/// - [`RevealError::UnsupportedVersion`] if the payload version is unknown
pub fn open_token(public_key: &ElGamalPublicKey, token: &Token) -> Result<Signal, RevealError> {
    let plaintext = elgamal::open(public_key, &ciphertext_of(token), &token.opening)
        .map_err(map_crypto)?;
    let (signal, _tag) = payload::unseal(&plaintext)?;
    Ok(signal)
}

/// Recover the signal of any token with the epoch private key.
pub fn decrypt_token(keys: &KeyMaterial, token: &Token) -> Result<Signal, RevealError> {
    let plaintext = elgamal::decrypt(keys, &ciphertext_of(token)).map_err(map_crypto)?;
    let (signal, _tag) = payload::unseal(&plaintext)?;
    Ok(signal)
}

/// Whether a token was minted by the holder of `hmac_secret`.
///
/// Returns `false` for tokens that fail to decrypt or carry a bad tag.
pub fn verify_token_tag(hmac_secret: &HmacSecret, keys: &KeyMaterial, token: &Token) -> bool {
    let Ok(plaintext) = elgamal::decrypt(keys, &ciphertext_of(token)) else {
        return false;
    };
    match payload::unseal(&plaintext) {
        Ok((signal, tag)) => payload::tag_matches(hmac_secret, &token.ephemeral, &signal, &tag),
        Err(_) => false,
    }
}
