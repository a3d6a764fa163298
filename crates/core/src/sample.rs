// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Telemetry samples streamed by engines and the fingerprint they
//! aggregate under.

use crate::key::{CollectionId, PlanId};
use serde::{Deserialize, Serialize};

/// Outcome tag carried on every sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SampleStatus {
    Ok,
    Ko,
}

crate::simple_display! {
    SampleStatus {
        Ok => "ok",
        Ko => "ko",
    }
}

/// One request sample as decoded from the engine's NDJSON stream.
///
/// Wire form: `{"ts": <unix_ms>, "label": ..., "status": "ok"|"ko",
/// "latency_ms": ..., "threads": ...}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sample {
    #[serde(rename = "ts")]
    pub ts_ms: u64,
    pub label: String,
    pub status: SampleStatus,
    pub latency_ms: u64,
    pub threads: u32,
}

/// Label tuple under which samples aggregate.
///
/// Cardinality is user-driven through `label`; the hub enforces a
/// configured cap and folds the excess into an `__overflow__` bucket.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MetricsFingerprint {
    pub collection: CollectionId,
    pub plan: PlanId,
    pub engine: u32,
    pub label: String,
    pub status: SampleStatus,
}

impl MetricsFingerprint {
    /// Label value used when the per-collection cardinality cap is hit.
    pub const OVERFLOW_LABEL: &'static str = "__overflow__";

    pub fn from_sample(collection: CollectionId, plan: PlanId, engine: u32, sample: &Sample) -> Self {
        Self { collection, plan, engine, label: sample.label.clone(), status: sample.status }
    }

    /// The fold target when this fingerprint would exceed the cap.
    pub fn into_overflow(mut self) -> Self {
        self.label = Self::OVERFLOW_LABEL.to_string();
        self
    }
}

#[cfg(test)]
#[path = "sample_tests.rs"]
mod tests;
