//! Issuance configuration.
//!
//! Built once at the process boundary: an optional TOML file, then flag
//! overrides, then [`IssueConfig::validate`]. Nothing downstream reads the
//! environment or global state.

use std::path::{Path, PathBuf};

use prt_issuer::RevealPolicy;
use prt_store::{key_file_name, token_db_file_name};
use prt_types::EpochWindow;
use serde::{Deserialize, Serialize};

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read config file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("{0}")]
    Invalid(String),
}

/// Everything one `issue` run needs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssueConfig {
    /// Tokens per batch.
    #[serde(default = "default_num_tokens")]
    pub num_tokens: usize,
    /// Fraction of the batch that is publicly openable.
    #[serde(default = "default_p_reveal")]
    pub p_reveal: f32,
    /// Client IPv4 or IPv6 address.
    #[serde(default)]
    pub ip: String,
    /// Directory receiving both artifacts.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    /// Append to this database in `output_dir` instead of a per-epoch one.
    #[serde(default)]
    pub custom_db_filename: Option<String>,
    #[serde(default)]
    pub reveal_policy: RevealPolicy,
}

// Default value functions

fn default_num_tokens() -> usize {
    100
}

fn default_p_reveal() -> f32 {
    0.1
}

fn default_output_dir() -> PathBuf {
    std::env::temp_dir()
}

impl Default for IssueConfig {
    fn default() -> Self {
        Self {
            num_tokens: default_num_tokens(),
            p_reveal: default_p_reveal(),
            ip: String::new(),
            output_dir: default_output_dir(),
            custom_db_filename: None,
            reveal_policy: RevealPolicy::default(),
        }
    }
}

impl IssueConfig {
    /// Load configuration from a TOML file. Missing keys take their defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(toml::from_str(&content)?)
    }

    /// Reject configurations that cannot produce a batch.
    ///
    /// Address syntax is checked later by the signal encoder.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.num_tokens == 0 {
            return Err(ConfigError::Invalid("num_tokens must be positive".into()));
        }
        if !self.p_reveal.is_finite() || !(0.0..=1.0).contains(&self.p_reveal) {
            return Err(ConfigError::Invalid(format!(
                "p_reveal must be in [0, 1], got {}",
                self.p_reveal
            )));
        }
        if self.ip.trim().is_empty() {
            return Err(ConfigError::Invalid("ip is required".into()));
        }
        if let Some(name) = &self.custom_db_filename {
            let plain = Path::new(name).file_name().map(|f| f == name.as_str());
            if plain != Some(true) {
                return Err(ConfigError::Invalid(format!(
                    "custom_db_filename must be a plain file name, got {name:?}"
                )));
            }
        }
        Ok(())
    }

    /// Where the key file for `window` goes.
    pub fn key_path(&self, window: &EpochWindow) -> PathBuf {
        self.output_dir.join(key_file_name(&window.end()))
    }

    /// Where the token database for `window` goes.
    pub fn token_db_path(&self, window: &EpochWindow) -> PathBuf {
        match &self.custom_db_filename {
            Some(name) => self.output_dir.join(name),
            None => self.output_dir.join(token_db_file_name(&window.end())),
        }
    }
}
