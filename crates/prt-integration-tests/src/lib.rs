//! Integration test crate for probabilistic reveal token issuance.
//!
//! This crate has no library code. It only contains integration tests that
//! run whole issuance flows across the workspace crates.
//!
//! ```sh
//! cargo test -p prt-integration-tests
//! ```
