// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Controller tuning knobs.

use stampede_core::ContainerSpec;
use std::time::Duration;

/// Tuning for [`crate::lifecycle::LifecycleController`].
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Container settings applied to every engine worker.
    pub container: ContainerSpec,
    /// How long a deploy may poll for full reachability before it is
    /// marked failed. The operator decides whether to purge after that.
    pub deploy_deadline: Duration,
    /// Cadence of the readiness poll during deploy.
    pub deploy_poll_interval: Duration,
    /// Per-call deadline for scheduler operations.
    pub scheduler_timeout: Duration,
    /// Per-call deadline for engine control operations (start/stop/log).
    /// Metrics streaming is unbounded and respects cancellation instead.
    pub engine_timeout: Duration,
    /// Trigger proceeds when the unreachable fraction stays strictly
    /// below this; at or above it the trigger fails. Tolerates transient
    /// pod-readiness races without silently degrading load.
    pub max_unreachable_ratio: f64,
    /// Hard cap on concurrent metrics streams per collection.
    pub max_streams_per_collection: usize,
    /// Per-engine sample channel depth between the stream reader and the
    /// hub pump.
    pub stream_buffer: usize,
    /// Validity of the pre-signed artifact URLs handed to engines.
    pub presign_ttl: Duration,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            container: ContainerSpec::new("stampede-engine:latest"),
            deploy_deadline: Duration::from_secs(15 * 60),
            deploy_poll_interval: Duration::from_millis(500),
            scheduler_timeout: Duration::from_secs(30),
            engine_timeout: Duration::from_secs(10),
            max_unreachable_ratio: 0.25,
            max_streams_per_collection: 2000,
            stream_buffer: 1024,
            presign_ttl: Duration::from_secs(6 * 3600),
        }
    }
}

/// Tuning for [`crate::reconcile::ReconcileLoop`].
#[derive(Debug, Clone)]
pub struct ReconcileConfig {
    /// Sweep cadence.
    pub interval: Duration,
    /// Deployments idle longer than this with no open run are purged.
    pub max_idle: Duration,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(15 * 60),
            max_idle: Duration::from_secs(8 * 3600),
        }
    }
}
