//! # prt-cli
//!
//! Run orchestration behind the `prtoken` binary.
//!
//! - [`config`] — the issuance configuration value and its TOML form
//! - [`run`] — the `issue` pipeline, its errors and exit codes

pub mod config;
pub mod run;

pub use config::{ConfigError, IssueConfig};
pub use run::{issue, IssueReport, RunError, EXIT_CONFIG};
