// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Logical references to scheduler-owned engine workers.

use crate::key::{CollectionId, PlanId, ProjectId};
use serde::{Deserialize, Serialize};

/// Identity of one engine worker: `(project, collection, plan, ordinal)`.
///
/// The scheduler owns the workload itself; the controller only ever holds
/// these references. Stringifies as
/// `engine-{project}-{collection}-{plan}-{ordinal}`, which doubles as the
/// backend workload name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorkerRef {
    pub project: ProjectId,
    pub collection: CollectionId,
    pub plan: PlanId,
    pub ordinal: u32,
}

impl WorkerRef {
    pub fn new(project: ProjectId, collection: CollectionId, plan: PlanId, ordinal: u32) -> Self {
        Self { project, collection, plan, ordinal }
    }

    /// Parse a workload name produced by [`Display`](std::fmt::Display).
    pub fn parse(name: &str) -> Option<Self> {
        let rest = name.strip_prefix("engine-")?;
        let mut parts = rest.splitn(4, '-');
        let project = parts.next()?.parse().ok()?;
        let collection = parts.next()?.parse().ok()?;
        let plan = parts.next()?.parse().ok()?;
        let ordinal = parts.next()?.parse().ok()?;
        Some(Self {
            project: ProjectId::new(project),
            collection: CollectionId::new(collection),
            plan: PlanId::new(plan),
            ordinal,
        })
    }
}

impl std::fmt::Display for WorkerRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "engine-{}-{}-{}-{}", self.project, self.collection, self.plan, self.ordinal)
    }
}

/// Worker lifecycle as observed by the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerState {
    Requested,
    Provisioned,
    Reachable,
    Running,
    Stopped,
    Gone,
}

crate::simple_display! {
    WorkerState {
        Requested => "requested",
        Provisioned => "provisioned",
        Reachable => "reachable",
        Running => "running",
        Stopped => "stopped",
        Gone => "gone",
    }
}

impl WorkerState {
    /// States in which the worker pins the collection's shape: engines and
    /// concurrency cannot be edited while any worker is in one of these.
    pub fn pins_collection(&self) -> bool {
        matches!(self, WorkerState::Provisioned | WorkerState::Reachable | WorkerState::Running)
    }
}

/// A reachable engine worker paired with its base URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineAddress {
    pub worker: WorkerRef,
    /// Base URL answering the engine wire protocol, e.g. `http://10.0.3.7:8080`.
    pub url: String,
}

#[cfg(test)]
#[path = "worker_tests.rs"]
mod tests;
