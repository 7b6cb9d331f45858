//! Reveal partitioning.
//!
//! [`RevealPolicy::Prefix`] reveals the first `num_reveal` positions of a
//! batch. Anyone who knows the issuance order therefore knows which tokens
//! are auditable. [`RevealPolicy::Sampled`] instead reveals a uniformly
//! random `num_reveal`-subset drawn from the OS CSPRNG.

use std::fmt;
use std::str::FromStr;

use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};

use crate::{IssuanceError, Result};

/// How revealed positions are chosen within a batch.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RevealPolicy {
    /// Positions `0..num_reveal`.
    #[default]
    Prefix,
    /// A uniformly random subset of size `num_reveal`.
    Sampled,
}

impl RevealPolicy {
    /// Per-position reveal flags for a batch of `num_total`.
    ///
    /// # Errors
    ///
    /// [`IssuanceError::InvalidParameters`] if `num_reveal > num_total`.
    pub fn reveal_mask(self, num_reveal: usize, num_total: usize) -> Result<Vec<bool>> {
        if num_reveal > num_total {
            return Err(IssuanceError::InvalidParameters(format!(
                "num_reveal {num_reveal} exceeds num_total {num_total}"
            )));
        }
        let mut mask = vec![false; num_total];
        match self {
            RevealPolicy::Prefix => mask.iter_mut().take(num_reveal).for_each(|r| *r = true),
            RevealPolicy::Sampled => {
                for index in rand::seq::index::sample(&mut OsRng, num_total, num_reveal) {
                    if let Some(r) = mask.get_mut(index) {
                        *r = true;
                    }
                }
            }
        }
        Ok(mask)
    }
}

impl fmt::Display for RevealPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RevealPolicy::Prefix => f.write_str("prefix"),
            RevealPolicy::Sampled => f.write_str("sampled"),
        }
    }
}

impl FromStr for RevealPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "prefix" => Ok(RevealPolicy::Prefix),
            "sampled" => Ok(RevealPolicy::Sampled),
            other => Err(format!(
                "unknown reveal policy '{other}'. Valid policies: prefix, sampled"
            )),
        }
    }
}

/// Number of revealed tokens for a reveal ratio.
///
/// The product is taken in single precision and truncated toward zero, so
/// `reveal_count(0.3, 10) == 3` and `reveal_count(0.05, 10) == 0`.
///
/// # Errors
///
/// [`IssuanceError::InvalidParameters`] if `p_reveal` is not a finite value
/// in `[0, 1]`.
pub fn reveal_count(p_reveal: f32, num_total: usize) -> Result<usize> {
    if !p_reveal.is_finite() || !(0.0..=1.0).contains(&p_reveal) {
        return Err(IssuanceError::InvalidParameters(format!(
            "p_reveal must be in [0, 1], got {p_reveal}"
        )));
    }
    let count = (p_reveal * num_total as f32) as usize;
    Ok(count.min(num_total))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reveal_count_truncates() {
        assert_eq!(reveal_count(0.3, 10).expect("count"), 3);
        assert_eq!(reveal_count(0.1, 100).expect("count"), 10);
        assert_eq!(reveal_count(0.05, 10).expect("count"), 0);
        assert_eq!(reveal_count(0.99, 10).expect("count"), 9);
        assert_eq!(reveal_count(1.0, 7).expect("count"), 7);
        assert_eq!(reveal_count(0.0, 7).expect("count"), 0);
    }

    #[test]
    fn test_reveal_count_rejects_out_of_range() {
        assert!(reveal_count(-0.1, 10).is_err());
        assert!(reveal_count(1.5, 10).is_err());
        assert!(reveal_count(f32::NAN, 10).is_err());
        assert!(reveal_count(f32::INFINITY, 10).is_err());
    }

    #[test]
    fn test_prefix_mask() {
        let mask = RevealPolicy::Prefix.reveal_mask(3, 10).expect("mask");
        assert_eq!(mask.len(), 10);
        assert!(mask[..3].iter().all(|&r| r));
        assert!(mask[3..].iter().all(|&r| !r));
    }

    #[test]
    fn test_sampled_mask_size() {
        for _ in 0..20 {
            let mask = RevealPolicy::Sampled.reveal_mask(4, 12).expect("mask");
            assert_eq!(mask.len(), 12);
            assert_eq!(mask.iter().filter(|&&r| r).count(), 4);
        }
    }

    #[test]
    fn test_sampled_mask_varies() {
        let masks: Vec<Vec<bool>> = (0..16)
            .map(|_| RevealPolicy::Sampled.reveal_mask(5, 50).expect("mask"))
            .collect();
        assert!(masks.iter().any(|m| m != &masks[0]));
    }

    #[test]
    fn test_mask_rejects_oversized_reveal() {
        for policy in [RevealPolicy::Prefix, RevealPolicy::Sampled] {
            assert!(matches!(
                policy.reveal_mask(5, 3),
                Err(IssuanceError::InvalidParameters(_))
            ));
            let full = policy.reveal_mask(3, 3).expect("full");
            assert!(full.iter().all(|&r| r));
            assert!(policy.reveal_mask(0, 0).expect("empty").is_empty());
        }
    }

    #[test]
    fn test_parse_policy() {
        assert_eq!("prefix".parse::<RevealPolicy>(), Ok(RevealPolicy::Prefix));
        assert_eq!("Sampled".parse::<RevealPolicy>(), Ok(RevealPolicy::Sampled));
        assert!("random".parse::<RevealPolicy>().is_err());
        assert_eq!(RevealPolicy::default().to_string(), "prefix");
    }
}
