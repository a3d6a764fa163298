// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Engine wire protocol payloads.
//!
//! The one contract the core depends on exactly: `POST /start` carries an
//! [`EngineRunConfig`], `POST /stop` is empty, `GET /metrics/stream` yields
//! NDJSON [`crate::sample::Sample`] lines, `GET /log` returns plain text.

use crate::key::RunId;
use serde::{Deserialize, Serialize};

/// Pre-signed pointer to the test artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactHandle {
    pub url: String,
    pub sha256: String,
}

/// Pre-signed pointer to one data file with its shard assignment.
///
/// Unsharded files carry `(split_index = 0, split_count = 1)` so every
/// engine reads the whole file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataFileHandle {
    pub url: String,
    pub sha256: String,
    pub split_index: u32,
    pub split_count: u32,
}

/// Body of `POST /start`: everything one engine needs for one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineRunConfig {
    pub run_id: RunId,
    pub duration_s: u32,
    pub concurrency: u32,
    pub rampup_s: u32,
    pub test_artifact: ArtifactHandle,
    pub data_files: Vec<DataFileHandle>,
}

/// Rejection body returned by engines on `4xx`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectionBody {
    pub reason: String,
}

#[cfg(test)]
#[path = "wire_tests.rs"]
mod tests;
