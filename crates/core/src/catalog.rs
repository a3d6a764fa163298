// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Catalog entities: projects, plans, collections, and run instances.
//!
//! These are plain values read from the [`crate::store::CatalogStore`].
//! Aggregates hold ids rather than back-references; anything cross-entity
//! is resolved through the store on demand.

use crate::key::{CollectionId, PlanId, ProjectId, RunId};
use serde::{Deserialize, Serialize};

/// Ownership root. Created and deleted outside the core; read-only here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: ProjectId,
    pub owner: String,
    pub display_name: String,
}

/// Reference to a blob-store object plus its content digest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactRef {
    /// Blob-store key.
    pub key: String,
    /// Hex sha256 of the object body.
    pub sha256: String,
}

impl ArtifactRef {
    pub fn new(key: impl Into<String>, sha256: impl Into<String>) -> Self {
        Self { key: key.into(), sha256: sha256.into() }
    }
}

/// Immutable test definition: the test artifact plus its data files.
///
/// Deletion is forbidden while any collection references the plan
/// (checked through the catalog, not held as a back-reference).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    pub id: PlanId,
    pub project_id: ProjectId,
    pub test_artifact: ArtifactRef,
    pub data_artifacts: Vec<ArtifactRef>,
}

/// Binding of a plan into a collection with execution parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionPlan {
    pub plan_id: PlanId,
    /// Number of parallel engine workers for this plan. ≥ 1.
    pub engines: u32,
    /// Threads per engine. ≥ 1.
    pub concurrency: u32,
    pub rampup_s: u32,
    /// ≥ 1.
    pub duration_s: u32,
    /// Shard data files across engines instead of replicating them.
    pub csv_split: bool,
}

/// Execution grouping. Runs at most one [`RunInstance`] at a time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Collection {
    pub id: CollectionId,
    pub project_id: ProjectId,
    pub plans: Vec<ExecutionPlan>,
    /// Collection-level default for plans that do not set their own flag.
    pub csv_split: bool,
}

impl Collection {
    /// Total engine count across all execution plans.
    pub fn total_engines(&self) -> u32 {
        self.plans.iter().map(|p| p.engines).sum()
    }
}

/// One trigger-to-end execution of a collection.
///
/// At most one instance with `ended_at_ms = None` exists per collection
/// at any time; the run ledger enforces this.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunInstance {
    pub run_id: RunId,
    pub collection_id: CollectionId,
    pub started_at_ms: u64,
    pub ended_at_ms: Option<u64>,
}

impl RunInstance {
    pub fn is_open(&self) -> bool {
        self.ended_at_ms.is_none()
    }
}

#[cfg(test)]
#[path = "catalog_tests.rs"]
mod tests;
