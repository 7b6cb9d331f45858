//! Integration test: one complete `issue` run.
//!
//! 1. Run the pipeline for 10 tokens at p_reveal = 0.3 for 127.0.0.1
//! 2. Reload the key file and the token database
//! 3. Check the reveal partition with the public key alone
//! 4. Check that the private key recovers every token and every tag verifies

use chrono::{Duration, TimeZone, Utc};
use prt_cli::{issue, IssueConfig};
use prt_issuer::reveal::{decrypt_token, open_token, verify_token_tag};
use prt_issuer::{RevealError, RevealPolicy};
use prt_store::{read_batches, read_keys};
use prt_types::{signal, EPOCH_DURATION_SECS};

fn config_in(dir: &std::path::Path) -> IssueConfig {
    IssueConfig {
        ip: "127.0.0.1".into(),
        num_tokens: 10,
        p_reveal: 0.3,
        output_dir: dir.to_path_buf(),
        ..IssueConfig::default()
    }
}

#[test]
fn test_end_to_end_prefix_issue() {
    let dir = tempfile::tempdir().expect("tempdir");
    let now = Utc
        .with_ymd_and_hms(2025, 1, 2, 3, 4, 5)
        .single()
        .expect("valid date");

    let report = issue(&config_in(dir.path()), now).expect("issue");
    assert_eq!(report.num_reveal, 3);

    // Both artifacts carry the same epoch-end stamp.
    assert_eq!(
        report.key_path.file_name().and_then(|f| f.to_str()),
        Some("keys-20250103030405.json")
    );
    assert_eq!(
        report.token_db_path.file_name().and_then(|f| f.to_str()),
        Some("tokens-20250103030405.db")
    );

    let stored = read_keys(&report.key_path).expect("read keys");
    assert_eq!(stored.window.start(), now);
    assert_eq!(stored.window.end(), now + Duration::seconds(EPOCH_DURATION_SECS));

    let batches = read_batches(&report.token_db_path).expect("read tokens");
    assert_eq!(batches.len(), 1);
    let batch = &batches[0].batch;
    assert_eq!(batch.tokens.len(), 10);
    assert_eq!(batch.public_key, stored.keys.public_key().to_bytes());
    assert_eq!(batch.p_reveal, 0.3);
    assert_eq!(batch.epoch_end, stored.window.end());

    let expected = signal::encode("127.0.0.1").expect("encode");
    for (i, token) in batch.tokens.iter().enumerate() {
        let opened = open_token(stored.keys.public_key(), token);
        if i < 3 {
            assert_eq!(opened.expect("revealed"), expected, "position {i}");
        } else {
            assert!(
                matches!(opened, Err(RevealError::NotOpenable)),
                "position {i} should be blinded"
            );
        }
        assert_eq!(
            decrypt_token(&stored.keys, token).expect("decrypt"),
            expected
        );
        assert!(verify_token_tag(&stored.hmac_secret, &stored.keys, token));
    }
}

#[test]
fn test_end_to_end_sampled_issue() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut config = config_in(dir.path());
    config.num_tokens = 40;
    config.p_reveal = 0.25;
    config.ip = "2001:db8::1".into();
    config.reveal_policy = RevealPolicy::Sampled;

    let report = issue(&config, Utc::now()).expect("issue");
    let stored = read_keys(&report.key_path).expect("read keys");
    let batches = read_batches(&report.token_db_path).expect("read tokens");

    let expected = signal::encode("2001:db8::1").expect("encode");
    let opened: Vec<_> = batches[0]
        .batch
        .tokens
        .iter()
        .filter_map(|t| open_token(stored.keys.public_key(), t).ok())
        .collect();
    assert_eq!(opened.len(), 10);
    assert!(opened.iter().all(|s| *s == expected));
}

#[test]
fn test_zero_reveal_ratio_leaves_everything_sealed() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut config = config_in(dir.path());
    config.p_reveal = 0.05;

    let report = issue(&config, Utc::now()).expect("issue");
    assert_eq!(report.num_reveal, 0);

    let stored = read_keys(&report.key_path).expect("read keys");
    let batches = read_batches(&report.token_db_path).expect("read tokens");
    assert!(batches[0]
        .batch
        .tokens
        .iter()
        .all(|t| open_token(stored.keys.public_key(), t).is_err()));
}

#[test]
fn test_key_file_is_not_in_token_database() {
    let dir = tempfile::tempdir().expect("tempdir");
    let report = issue(&config_in(dir.path()), Utc::now()).expect("issue");
    let stored = read_keys(&report.key_path).expect("read keys");

    let db = std::fs::read(&report.token_db_path).expect("read db");
    let secret = stored.keys.secret_bytes();
    assert!(!db.windows(secret.len()).any(|w| w == secret.as_slice()));
    assert!(!db
        .windows(32)
        .any(|w| w == stored.hmac_secret.as_bytes().as_slice()));
}
