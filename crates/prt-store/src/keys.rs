//! Epoch key file.
//!
//! Pretty-printed JSON with hex-encoded key bytes and RFC 3339 window bounds.
//! The file holds the private key and the tagging secret, so it is written
//! owner-only and never partially.

use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use prt_crypto::elgamal::KeyMaterial;
use prt_crypto::hmac::HmacSecret;
use prt_types::EpochWindow;
use serde::{Deserialize, Serialize};
use tracing::info;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::{create_file_atomic, Result, StoreError};

#[derive(Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
struct KeyFile {
    public_key: String,
    private_key: String,
    hmac_secret: String,
    #[zeroize(skip)]
    epoch_start: DateTime<Utc>,
    #[zeroize(skip)]
    epoch_end: DateTime<Utc>,
}

/// Key material reloaded from a key file.
pub struct StoredKeys {
    pub keys: KeyMaterial,
    pub hmac_secret: HmacSecret,
    pub window: EpochWindow,
}

/// Persist the epoch keys to `path`.
///
/// # Errors
///
/// - [`StoreError::Serialization`] if encoding fails
/// - [`StoreError::Unwritable`] if the file cannot be created, including when
///   `path` already exists; an existing key file is never replaced
pub fn write_keys(
    keys: &KeyMaterial,
    hmac_secret: &HmacSecret,
    path: &Path,
    window: &EpochWindow,
) -> Result<()> {
    let file = KeyFile {
        public_key: keys.public_key().to_hex(),
        private_key: hex::encode(keys.secret_bytes().as_slice()),
        hmac_secret: hex::encode(hmac_secret.as_bytes()),
        epoch_start: window.start(),
        epoch_end: window.end(),
    };
    let json = Zeroizing::new(
        serde_json::to_vec_pretty(&file).map_err(|e| StoreError::Serialization(e.to_string()))?,
    );
    create_file_atomic(path, &json)?;
    info!(path = %path.display(), public_key = %keys.public_key().to_hex(), "wrote key file");
    Ok(())
}

fn decode_32(field: &str, value: &str) -> Result<Zeroizing<[u8; 32]>> {
    let mut out = Zeroizing::new([0u8; 32]);
    hex::decode_to_slice(value, &mut out[..])
        .map_err(|e| StoreError::Corrupt(format!("{field}: {e}")))?;
    Ok(out)
}

/// Load epoch keys previously written by [`write_keys`].
///
/// The stored public key must match the one derived from the private key.
pub fn read_keys(path: &Path) -> Result<StoredKeys> {
    let raw = Zeroizing::new(fs::read(path).map_err(|source| StoreError::Unreadable {
        path: path.to_path_buf(),
        source,
    })?);
    let file: KeyFile =
        serde_json::from_slice(&raw).map_err(|e| StoreError::Serialization(e.to_string()))?;

    let private_key = decode_32("private_key", &file.private_key)?;
    let keys = KeyMaterial::from_secret_bytes(&private_key)
        .map_err(|e| StoreError::Corrupt(e.to_string()))?;
    let public_key = decode_32("public_key", &file.public_key)?;
    if keys.public_key().to_bytes() != *public_key {
        return Err(StoreError::Corrupt(
            "public key does not match private key".into(),
        ));
    }

    let hmac_bytes = decode_32("hmac_secret", &file.hmac_secret)?;
    let hmac_secret = HmacSecret::from_bytes(*hmac_bytes);
    let window = EpochWindow::new(file.epoch_start, file.epoch_end)
        .map_err(|e| StoreError::Corrupt(e.to_string()))?;

    Ok(StoredKeys {
        keys,
        hmac_secret,
        window,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key_file_name;
    use chrono::TimeZone;
    use prt_crypto::elgamal::generate_keypair;
    use prt_crypto::hmac::generate_hmac_secret;

    fn window() -> EpochWindow {
        let start = Utc
            .timestamp_opt(1_700_000_000, 0)
            .single()
            .expect("valid timestamp");
        EpochWindow::starting_at(start)
    }

    #[test]
    fn test_write_then_read() {
        let dir = tempfile::tempdir().expect("tempdir");
        let keys = generate_keypair().expect("keygen");
        let secret = generate_hmac_secret().expect("hmac");
        let window = window();
        let path = dir.path().join(key_file_name(&window.end()));

        write_keys(&keys, &secret, &path, &window).expect("write");
        let stored = read_keys(&path).expect("read");

        assert_eq!(stored.keys.public_key(), keys.public_key());
        assert_eq!(*stored.keys.secret_bytes(), *keys.secret_bytes());
        assert_eq!(stored.hmac_secret.as_bytes(), secret.as_bytes());
        assert_eq!(stored.window, window);
    }

    #[test]
    fn test_file_is_readable_json() {
        let dir = tempfile::tempdir().expect("tempdir");
        let keys = generate_keypair().expect("keygen");
        let secret = generate_hmac_secret().expect("hmac");
        let path = dir.path().join("keys.json");
        write_keys(&keys, &secret, &path, &window()).expect("write");

        let value: serde_json::Value =
            serde_json::from_slice(&fs::read(&path).expect("read")).expect("json");
        assert_eq!(value["public_key"], keys.public_key().to_hex());
        assert_eq!(value["epoch_end"], "2023-11-15T22:13:20Z");
        assert_eq!(value["private_key"].as_str().map(str::len), Some(64));
    }

    #[test]
    fn test_existing_key_file_is_kept() {
        let dir = tempfile::tempdir().expect("tempdir");
        let first = generate_keypair().expect("keygen");
        let second = generate_keypair().expect("keygen");
        let secret = generate_hmac_secret().expect("hmac");
        let path = dir.path().join("keys.json");

        write_keys(&first, &secret, &path, &window()).expect("write");
        assert!(matches!(
            write_keys(&second, &secret, &path, &window()),
            Err(StoreError::Unwritable { .. })
        ));
        let stored = read_keys(&path).expect("read");
        assert_eq!(stored.keys.public_key(), first.public_key());
    }

    #[test]
    fn test_mismatched_public_key_is_corrupt() {
        let dir = tempfile::tempdir().expect("tempdir");
        let keys = generate_keypair().expect("keygen");
        let other = generate_keypair().expect("keygen");
        let secret = generate_hmac_secret().expect("hmac");
        let path = dir.path().join("keys.json");
        write_keys(&keys, &secret, &path, &window()).expect("write");

        let mut value: serde_json::Value =
            serde_json::from_slice(&fs::read(&path).expect("read")).expect("json");
        value["public_key"] = serde_json::Value::String(other.public_key().to_hex());
        fs::write(&path, serde_json::to_vec(&value).expect("encode")).expect("rewrite");

        assert!(matches!(read_keys(&path), Err(StoreError::Corrupt(_))));
    }

    #[test]
    fn test_missing_file_is_unreadable() {
        let dir = tempfile::tempdir().expect("tempdir");
        assert!(matches!(
            read_keys(&dir.path().join("nope.json")),
            Err(StoreError::Unreadable { .. })
        ));
    }
}
