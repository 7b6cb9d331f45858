//! The `issue` pipeline.
//!
//! ```text
//! validate -> encode signal -> keygen -> issue -> write keys -> write tokens
//! ```
//!
//! Each stage fails with its own [`RunError`] variant and process exit code.

use std::fs;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use prt_crypto::elgamal::generate_keypair;
use prt_crypto::hmac::generate_hmac_secret;
use prt_crypto::CryptoError;
use prt_issuer::{reveal_count, IssuanceError, Issuer};
use prt_store::{write_keys, write_tokens, StoreError};
use prt_types::{signal, EpochWindow, TokenBatch, TypesError};
use tracing::{info, warn};

use crate::config::{ConfigError, IssueConfig};

/// Exit code when key generation fails.
pub const EXIT_KEY_GENERATION: u8 = 1;
/// Exit code when the address cannot be parsed.
pub const EXIT_SIGNAL_PARSING: u8 = 2;
/// Exit code when minting fails.
pub const EXIT_TOKEN_ISSUANCE: u8 = 3;
/// Exit code when the key file cannot be written.
pub const EXIT_KEY_WRITE: u8 = 4;
/// Exit code when the token database cannot be written.
pub const EXIT_TOKEN_WRITE: u8 = 5;
/// Exit code for configuration and command-line usage errors.
pub const EXIT_CONFIG: u8 = 6;

/// Why an issuance run failed.
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("key generation failed: {0}")]
    KeyGeneration(#[source] CryptoError),

    #[error("invalid address: {0}")]
    Signal(#[from] TypesError),

    #[error("token issuance failed: {0}")]
    Issuance(#[from] IssuanceError),

    #[error("failed to write keys: {0}")]
    KeyWrite(#[source] StoreError),

    #[error("failed to write tokens: {0}")]
    TokenWrite(#[source] StoreError),
}

impl RunError {
    /// Process exit code for this failure.
    pub fn exit_code(&self) -> u8 {
        match self {
            RunError::Config(_) => EXIT_CONFIG,
            RunError::KeyGeneration(_) => EXIT_KEY_GENERATION,
            RunError::Signal(_) => EXIT_SIGNAL_PARSING,
            RunError::Issuance(_) => EXIT_TOKEN_ISSUANCE,
            RunError::KeyWrite(_) => EXIT_KEY_WRITE,
            RunError::TokenWrite(_) => EXIT_TOKEN_WRITE,
        }
    }
}

/// What a successful run produced.
#[derive(Debug, Clone)]
pub struct IssueReport {
    pub key_path: PathBuf,
    pub token_db_path: PathBuf,
    pub window: EpochWindow,
    pub num_total: usize,
    pub num_reveal: usize,
}

/// Run one issuance for an epoch starting at `now`.
///
/// On success both artifacts exist and share the epoch end stamp. A key file
/// already present for the same epoch end is left alone and the run fails
/// with [`RunError::KeyWrite`]. If the token database cannot be written, the
/// key file written moments earlier is removed again.
pub fn issue(config: &IssueConfig, now: DateTime<Utc>) -> Result<IssueReport, RunError> {
    config.validate()?;
    let signal = signal::encode(&config.ip)?;
    let num_reveal = reveal_count(config.p_reveal, config.num_tokens)?;

    let keys = generate_keypair().map_err(RunError::KeyGeneration)?;
    let hmac_secret = generate_hmac_secret().map_err(RunError::KeyGeneration)?;

    let issuer = Issuer::new(*keys.public_key(), &hmac_secret).with_policy(config.reveal_policy);
    let tokens = issuer.issue(&signal, num_reveal, config.num_tokens)?;

    let window = EpochWindow::starting_at(now);
    let key_path = config.key_path(&window);
    let token_db_path = config.token_db_path(&window);

    write_keys(&keys, &hmac_secret, &key_path, &window).map_err(RunError::KeyWrite)?;

    let batch = TokenBatch {
        tokens,
        public_key: keys.public_key().to_bytes(),
        p_reveal: config.p_reveal,
        epoch_end: window.end(),
    };
    if let Err(e) = write_tokens(batch, &token_db_path) {
        warn!(path = %key_path.display(), "removing key file after failed token write");
        let _ = fs::remove_file(&key_path);
        return Err(RunError::TokenWrite(e));
    }

    info!(
        epoch_end = %window.end_stamp(),
        num_total = config.num_tokens,
        num_reveal,
        "issuance complete"
    );
    Ok(IssueReport {
        key_path,
        token_db_path,
        window,
        num_total: config.num_tokens,
        num_reveal,
    })
}
