//! Hashed ElGamal over Ristretto255.
//!
//! Each epoch has one keypair `(x, X = x·G)`. A message is encrypted under a
//! fresh scalar `r`:
//!
//! ```text
//! Encrypt(X, m; r):
//!   1. c1 = r·G
//!   2. shared = r·X
//!   3. ks = BLAKE3::derive_key_xof("PRToken v1 token-keystream",
//!           LP(shared) || LP(c1) || LP(X))[..len(m)]
//!   4. c2 = m XOR ks
//!   5. return (c1, c2)
//! ```
//!
//! Two paths recover `m`:
//!
//! - [`decrypt`]: the private key holder computes `shared = x·c1`.
//! - [`open`]: anyone holding the public key and the [`Opening`] `r` checks
//!   `r·G == c1` and computes `shared = r·X`.
//!
//! Without `x` or `r`, `c2` is indistinguishable from random under DDH.

use curve25519_dalek::ristretto::{CompressedRistretto, RistrettoPoint};
use curve25519_dalek::scalar::Scalar;
use rand::rngs::OsRng;
use rand::RngCore;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::blake3::{self, contexts};
use crate::{CryptoError, Result};

/// Byte length of a compressed group element.
pub const POINT_SIZE: usize = 32;

/// Byte length of a canonical scalar encoding.
pub const SCALAR_SIZE: usize = 32;

/// An ElGamal private key.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct ElGamalSecretKey {
    scalar: Scalar,
}

/// An ElGamal public key.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ElGamalPublicKey {
    point: RistrettoPoint,
}

/// A per-epoch keypair.
///
/// Not `Clone`: the private scalar lives in exactly one place and is
/// zeroized when the keypair is dropped.
pub struct KeyMaterial {
    secret: ElGamalSecretKey,
    public: ElGamalPublicKey,
}

/// The encryption randomness `r` of one ciphertext.
///
/// Publishing it makes that ciphertext openable by anyone with the public key.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct Opening {
    scalar: Scalar,
}

/// An ElGamal ciphertext `(c1, c2)`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Ciphertext {
    /// Compressed `c1 = r·G`.
    pub ephemeral: [u8; POINT_SIZE],
    /// Message XOR keystream.
    pub body: Vec<u8>,
}

/// Sample a uniform scalar from 64 bytes of OS randomness.
fn random_scalar() -> Result<Scalar> {
    let mut wide = Zeroizing::new([0u8; 64]);
    OsRng
        .try_fill_bytes(&mut wide[..])
        .map_err(|e| CryptoError::Randomness(e.to_string()))?;
    Ok(Scalar::from_bytes_mod_order_wide(&wide))
}

/// Generate a fresh keypair for one epoch.
///
/// # Errors
///
/// [`CryptoError::KeyGeneration`] if the OS random source is unavailable.
pub fn generate_keypair() -> Result<KeyMaterial> {
    let scalar = random_scalar().map_err(|e| CryptoError::KeyGeneration(e.to_string()))?;
    Ok(KeyMaterial::from_scalar(scalar))
}

impl KeyMaterial {
    fn from_scalar(scalar: Scalar) -> Self {
        let public = ElGamalPublicKey {
            point: RistrettoPoint::mul_base(&scalar),
        };
        Self {
            secret: ElGamalSecretKey { scalar },
            public,
        }
    }

    /// Rebuild a keypair from a canonical private scalar encoding.
    pub fn from_secret_bytes(bytes: &[u8; SCALAR_SIZE]) -> Result<Self> {
        let scalar: Option<Scalar> = Scalar::from_canonical_bytes(*bytes).into();
        scalar
            .map(Self::from_scalar)
            .ok_or_else(|| CryptoError::InvalidKey("private key is not a canonical scalar".into()))
    }

    /// The public half of the keypair.
    pub fn public_key(&self) -> &ElGamalPublicKey {
        &self.public
    }

    /// The private scalar encoding, wiped when the returned buffer drops.
    pub fn secret_bytes(&self) -> Zeroizing<[u8; SCALAR_SIZE]> {
        Zeroizing::new(self.secret.scalar.to_bytes())
    }
}

impl ElGamalPublicKey {
    /// Decode a compressed public key.
    pub fn from_bytes(bytes: &[u8; POINT_SIZE]) -> Result<Self> {
        CompressedRistretto(*bytes)
            .decompress()
            .map(|point| Self { point })
            .ok_or_else(|| CryptoError::InvalidKey("public key is not a Ristretto point".into()))
    }

    /// Decode a compressed public key from a slice.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let arr: [u8; POINT_SIZE] = bytes.try_into().map_err(|_| CryptoError::InvalidKeyLength {
            expected: POINT_SIZE,
            actual: bytes.len(),
        })?;
        Self::from_bytes(&arr)
    }

    /// Compressed encoding.
    pub fn to_bytes(&self) -> [u8; POINT_SIZE] {
        self.point.compress().to_bytes()
    }

    /// Lowercase hex of the compressed encoding.
    pub fn to_hex(&self) -> String {
        hex::encode(self.to_bytes())
    }
}

impl Opening {
    /// Sample a fresh opening from the OS random source.
    pub fn random() -> Result<Self> {
        Ok(Self {
            scalar: random_scalar()?,
        })
    }

    /// Decode a canonical scalar encoding.
    pub fn from_bytes(bytes: &[u8; SCALAR_SIZE]) -> Option<Self> {
        let scalar: Option<Scalar> = Scalar::from_canonical_bytes(*bytes).into();
        scalar.map(|scalar| Self { scalar })
    }

    /// Canonical scalar encoding.
    pub fn to_bytes(&self) -> [u8; SCALAR_SIZE] {
        self.scalar.to_bytes()
    }

    /// The `c1 = r·G` any ciphertext under this opening will carry.
    pub fn ephemeral(&self) -> [u8; POINT_SIZE] {
        RistrettoPoint::mul_base(&self.scalar).compress().to_bytes()
    }
}

fn keystream(
    shared: &RistrettoPoint,
    ephemeral: &[u8; POINT_SIZE],
    recipient: &ElGamalPublicKey,
    len: usize,
) -> Zeroizing<Vec<u8>> {
    let shared_bytes = Zeroizing::new(shared.compress().to_bytes());
    let material = Zeroizing::new(blake3::encode_multi_field(&[
        &shared_bytes[..],
        &ephemeral[..],
        &recipient.to_bytes(),
    ]));
    let mut out = Zeroizing::new(vec![0u8; len]);
    blake3::derive_key_xof(contexts::TOKEN_KEYSTREAM, &material, &mut out);
    out
}

fn xor_into(data: &[u8], ks: &[u8]) -> Vec<u8> {
    data.iter().zip(ks).map(|(d, k)| d ^ k).collect()
}

/// Encrypt with explicit randomness.
pub fn encrypt_with_opening(
    recipient: &ElGamalPublicKey,
    plaintext: &[u8],
    opening: &Opening,
) -> Ciphertext {
    let ephemeral = opening.ephemeral();
    let shared = opening.scalar * recipient.point;
    let ks = keystream(&shared, &ephemeral, recipient, plaintext.len());
    Ciphertext {
        ephemeral,
        body: xor_into(plaintext, &ks),
    }
}

/// Encrypt under fresh randomness, returning the ciphertext and its opening.
///
/// # Errors
///
/// [`CryptoError::Randomness`] if the OS random source is unavailable.
pub fn encrypt(recipient: &ElGamalPublicKey, plaintext: &[u8]) -> Result<(Ciphertext, Opening)> {
    let opening = Opening::random()?;
    let ciphertext = encrypt_with_opening(recipient, plaintext, &opening);
    Ok((ciphertext, opening))
}

fn decode_ephemeral(ciphertext: &Ciphertext) -> Result<RistrettoPoint> {
    CompressedRistretto(ciphertext.ephemeral)
        .decompress()
        .ok_or_else(|| CryptoError::InvalidCiphertext("ephemeral is not a Ristretto point".into()))
}

/// Decrypt with the private key.
pub fn decrypt(keys: &KeyMaterial, ciphertext: &Ciphertext) -> Result<Vec<u8>> {
    let c1 = decode_ephemeral(ciphertext)?;
    let shared = keys.secret.scalar * c1;
    let ks = keystream(&shared, &ciphertext.ephemeral, &keys.public, ciphertext.body.len());
    Ok(xor_into(&ciphertext.body, &ks))
}

/// Recover the plaintext using only the public key and an opening.
///
/// # Errors
///
/// [`CryptoError::NotOpenable`] if the opening is not a canonical scalar or
/// `opening·G` differs from the ciphertext's `c1`.
pub fn open(
    recipient: &ElGamalPublicKey,
    ciphertext: &Ciphertext,
    opening: &[u8; SCALAR_SIZE],
) -> Result<Vec<u8>> {
    let opening = Opening::from_bytes(opening).ok_or(CryptoError::NotOpenable)?;
    if opening.ephemeral() != ciphertext.ephemeral {
        return Err(CryptoError::NotOpenable);
    }
    let shared = opening.scalar * recipient.point;
    let ks = keystream(&shared, &ciphertext.ephemeral, recipient, ciphertext.body.len());
    Ok(xor_into(&ciphertext.body, &ks))
}
