//! Token payload framing.
//!
//! ```text
//! payload = version (1) || signal (16) || tag (8)
//! tag     = HMAC(LP(c1) || LP(version) || LP(signal))[..8]
//! ```
//!
//! Binding `c1` into the tag ties each payload to the ciphertext it was
//! sealed in.

use prt_crypto::blake3;
use prt_crypto::hmac::HmacSecret;
use prt_types::{Signal, SIGNAL_SIZE, TOKEN_PAYLOAD_SIZE, TOKEN_TAG_SIZE, TOKEN_VERSION};

use crate::RevealError;

const SIGNAL_OFFSET: usize = 1;
const TAG_OFFSET: usize = SIGNAL_OFFSET + SIGNAL_SIZE;

fn tag_message(ephemeral: &[u8; 32], version: u8, signal: &Signal) -> Vec<u8> {
    blake3::encode_multi_field(&[&ephemeral[..], &[version], &signal.as_bytes()[..]])
}

/// Build the plaintext payload for a token whose `c1` is `ephemeral`.
pub(crate) fn seal(
    secret: &HmacSecret,
    ephemeral: &[u8; 32],
    signal: &Signal,
) -> [u8; TOKEN_PAYLOAD_SIZE] {
    let tag = secret.tag(&tag_message(ephemeral, TOKEN_VERSION, signal));
    let mut payload = [0u8; TOKEN_PAYLOAD_SIZE];
    payload[0] = TOKEN_VERSION;
    payload[SIGNAL_OFFSET..TAG_OFFSET].copy_from_slice(signal.as_bytes());
    payload[TAG_OFFSET..].copy_from_slice(&tag[..TOKEN_TAG_SIZE]);
    payload
}

/// Split a recovered payload into its signal and tag.
pub(crate) fn unseal(payload: &[u8]) -> Result<(Signal, [u8; TOKEN_TAG_SIZE]), RevealError> {
    if payload.len() != TOKEN_PAYLOAD_SIZE {
        return Err(RevealError::Crypto(format!(
            "payload length {} != {TOKEN_PAYLOAD_SIZE}",
            payload.len()
        )));
    }
    if payload[0] != TOKEN_VERSION {
        return Err(RevealError::UnsupportedVersion(payload[0]));
    }
    let mut signal = [0u8; SIGNAL_SIZE];
    signal.copy_from_slice(&payload[SIGNAL_OFFSET..TAG_OFFSET]);
    let mut tag = [0u8; TOKEN_TAG_SIZE];
    tag.copy_from_slice(&payload[TAG_OFFSET..]);
    Ok((Signal::from_bytes(signal), tag))
}

/// Check a payload tag against the tagging secret.
pub(crate) fn tag_matches(
    secret: &HmacSecret,
    ephemeral: &[u8; 32],
    signal: &Signal,
    tag: &[u8; TOKEN_TAG_SIZE],
) -> bool {
    secret.verify(&tag_message(ephemeral, TOKEN_VERSION, signal), tag)
}
