// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! stampede-scheduler: provisioning backends for engine workers.
//!
//! # Module layout
//!
//! - [`k8s`] — Kubernetes backend (one pod per engine worker)
//! - [`limiter`] — bounded FIFO write queue with token-bucket pacing
//!
//! The [`Scheduler`] trait is the capability seam; the backend is chosen at
//! process start from configuration. All methods are safe to call
//! concurrently; write operations may queue behind the backend's rate
//! limiter, reads never do.

pub mod k8s;
pub mod limiter;

#[cfg(any(test, feature = "test-support"))]
pub mod memory;

use async_trait::async_trait;
use stampede_core::{
    CollectionId, ConflictKind, ContainerSpec, CoreError, EngineAddress, ExecutionPlan,
    PlanStatus, PlanId, ProjectId, WorkerRef,
};
use std::collections::HashMap;
use thiserror::Error;

pub use k8s::{KubeScheduler, KubeSchedulerConfig};
#[cfg(any(test, feature = "test-support"))]
pub use memory::InMemoryScheduler;

/// Scheduler failures, split along the retry boundary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchedulerError {
    /// Worth retrying: network flake, rate limit, full write queue.
    #[error("transient scheduler error: {0}")]
    Transient(String),

    /// Not worth retrying: bad request, permission, backend rejection.
    #[error("scheduler error: {0}")]
    Fatal(String),

    /// DeployPlan with a replica count that differs from the live
    /// deployment. The collection must be purged first.
    #[error("deployment exists with {existing} replicas, requested {requested}")]
    ReplicasChanged { existing: u32, requested: u32 },
}

impl From<SchedulerError> for CoreError {
    fn from(err: SchedulerError) -> Self {
        match err {
            SchedulerError::Transient(msg) => CoreError::SchedulerTransient(msg),
            SchedulerError::Fatal(msg) => CoreError::SchedulerFatal(msg),
            SchedulerError::ReplicasChanged { .. } => {
                CoreError::Conflict(ConflictKind::ReplicasChanged)
            }
        }
    }
}

/// A deployment request for one execution plan.
#[derive(Debug, Clone)]
pub struct DeploySpec {
    pub project: ProjectId,
    pub collection: CollectionId,
    pub plan: PlanId,
    pub replicas: u32,
    pub container: ContainerSpec,
}

impl DeploySpec {
    pub fn worker(&self, ordinal: u32) -> WorkerRef {
        WorkerRef::new(self.project, self.collection, self.plan, ordinal)
    }
}

/// Provisioning backend for engine workers.
///
/// Implementations label every workload with
/// `{project, collection, plan, ordinal, kind=executor}` so enumeration is
/// exact, and name workers `engine-{project}-{collection}-{plan}-{ordinal}`.
#[async_trait]
pub trait Scheduler: Send + Sync + 'static {
    /// Request `spec.replicas` workers for the plan. Idempotent: an
    /// identical second call is a no-op; a different replica count is
    /// [`SchedulerError::ReplicasChanged`].
    async fn deploy_plan(&self, spec: &DeploySpec) -> Result<(), SchedulerError>;

    /// Provision a single worker. `deploy_plan` is built on this.
    async fn deploy_engine(
        &self,
        worker: &WorkerRef,
        container: &ContainerSpec,
    ) -> Result<(), SchedulerError>;

    /// Exactly the engine addresses that currently answer the liveness
    /// check. Callers compare the length against the expected count to
    /// gate readiness.
    async fn reachable_addresses(
        &self,
        collection: CollectionId,
        plan: PlanId,
    ) -> Result<Vec<EngineAddress>, SchedulerError>;

    /// Observed deployment state per expected plan. `in_progress` and
    /// `started_at_ms` are left unset; the status probe overlays them
    /// from the run ledger.
    async fn collection_status(
        &self,
        collection: CollectionId,
        expected: &[ExecutionPlan],
    ) -> Result<Vec<PlanStatus>, SchedulerError>;

    /// Backend-side container log for one worker.
    async fn pod_log(&self, worker: &WorkerRef) -> Result<String, SchedulerError>;

    /// Remove all workers for the collection. Idempotent; succeeds when
    /// nothing exists.
    async fn purge(&self, collection: CollectionId) -> Result<(), SchedulerError>;

    /// Currently provisioned collections with their deploy timestamps
    /// (epoch ms). Drives the reconcile sweep.
    async fn list_deployed_collections(
        &self,
    ) -> Result<HashMap<CollectionId, u64>, SchedulerError>;

    /// All workers belonging to a project, across collections.
    async fn workers_for_project(
        &self,
        project: ProjectId,
    ) -> Result<Vec<WorkerRef>, SchedulerError>;
}
