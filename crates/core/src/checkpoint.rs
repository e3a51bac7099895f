// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Code-review checkpoint.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Marker for the last commit a review sweep covered.
///
/// The SHA recorded is the one the diff metrics were computed against, not
/// whatever `HEAD` is at save time; the sweeper races with agents landing
/// commits. Saved atomically with the review issue id so a crash between
/// the two writes cannot double-file reviews.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewCheckpoint {
    pub commit_sha: String,
    pub timestamp: DateTime<Utc>,
    /// Human description of what the review covers.
    pub scope: String,
}
