// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! stampede-metrics: the telemetry fan-in/fan-out hub.
//!
//! # Module layout
//!
//! - [`hub`] — ingestion, partitions, subscriber fan-out, eviction
//! - [`registry`] — prometheus series and the text exposition
//!
//! # Architecture
//!
//! Engines stream samples into the hub at high rate. Each sample updates
//! counters, a latency histogram, and a thread gauge keyed by its
//! fingerprint, then fans out to the collection's live subscribers. The
//! hot path takes only CPU-bounded locks and never awaits; a slow
//! subscriber loses its own samples (drop-newest on a bounded buffer) and
//! cannot stall engines or other subscribers.

pub mod hub;
pub mod registry;

use std::time::Duration;

pub use hub::{MetricsHub, SampleEvent};

/// Tuning for the hub.
#[derive(Debug, Clone)]
pub struct MetricsConfig {
    /// Bounded buffer per subscription; beyond it the hub drops-newest.
    pub subscriber_buffer: usize,
    /// Cap on distinct fingerprints per collection. Novel fingerprints
    /// past it fold into the `__overflow__` bucket.
    pub max_fingerprints: usize,
    /// Fingerprints idle this long are evicted to bound memory.
    pub idle_window: Duration,
    /// Cadence of the background eviction sweep.
    pub sweep_interval: Duration,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            subscriber_buffer: 1024,
            max_fingerprints: 10_000,
            idle_window: Duration::from_secs(3600),
            sweep_interval: Duration::from_secs(300),
        }
    }
}
