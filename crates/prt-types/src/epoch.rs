//! Epoch validity windows.
//!
//! One keypair is valid for one epoch of 24 hours. Artifacts are named after
//! the epoch's end, formatted as compact UTC `YYYYMMDDHHMMSS`.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::{Result, TypesError, EPOCH_DURATION_SECS};

/// strftime pattern for artifact timestamps.
pub const EPOCH_STAMP_FORMAT: &str = "%Y%m%d%H%M%S";

/// A validity window `[start, end)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpochWindow {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl EpochWindow {
    /// Build a window, rejecting `end <= start`.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self> {
        if end <= start {
            return Err(TypesError::InvalidEpochWindow);
        }
        Ok(Self { start, end })
    }

    /// The standard 24-hour window beginning at `start`.
    pub fn starting_at(start: DateTime<Utc>) -> Self {
        Self {
            start,
            end: start + Duration::seconds(EPOCH_DURATION_SECS),
        }
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    /// The end timestamp as used in artifact file names.
    pub fn end_stamp(&self) -> String {
        format_epoch_stamp(&self.end)
    }

    /// Whether `at` falls inside the window.
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.start <= at && at < self.end
    }
}

/// Format a timestamp as compact UTC `YYYYMMDDHHMMSS`.
pub fn format_epoch_stamp(at: &DateTime<Utc>) -> String {
    at.format(EPOCH_STAMP_FORMAT).to_string()
}
