// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error kinds shared across the orchestration crates.

use thiserror::Error;

/// Invariant violations surfaced as [`CoreError::Conflict`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictKind {
    /// A run is already open for the collection.
    RunInProgress,
    /// Engines or concurrency changed while workers are live.
    EditWhileDeployed,
    /// DeployPlan called with a replica count that differs from the live
    /// deployment; the collection must be purged first.
    ReplicasChanged,
    /// Plan deletion requested while a collection still references it.
    PlanReferenced,
    /// Operation requires a deployed collection and none exists.
    NotDeployed,
}

crate::simple_display! {
    ConflictKind {
        RunInProgress => "run in progress",
        EditWhileDeployed => "edit while deployed",
        ReplicasChanged => "replica count changed without purge",
        PlanReferenced => "plan still referenced by a collection",
        NotDeployed => "collection not deployed",
    }
}

/// Tagged error sum for the orchestration core.
///
/// Component crates carry their own error enums and convert into this
/// representation at the controller boundary. The transient/fatal split
/// drives the retry policy: [`CoreError::is_transient`] errors are retried
/// by the caller, everything else surfaces up.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: u64 },

    #[error("conflict: {0}")]
    Conflict(ConflictKind),

    #[error("engine unreachable: {0}")]
    EngineUnreachable(String),

    #[error("engine rejected request: {reason}")]
    EngineRejected { reason: String },

    #[error("engine internal error: {0}")]
    EngineInternal(String),

    #[error("scheduler transient error: {0}")]
    SchedulerTransient(String),

    #[error("scheduler error: {0}")]
    SchedulerFatal(String),

    #[error("blob missing: {0}")]
    BlobMissing(String),

    #[error("deadline exceeded: {0}")]
    Timeout(String),

    #[error("operation canceled")]
    Canceled,
}

impl CoreError {
    pub fn not_found(entity: &'static str, id: impl Into<u64>) -> Self {
        Self::NotFound { entity, id: id.into() }
    }

    /// Whether the caller may retry the failed call.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            CoreError::SchedulerTransient(_)
                | CoreError::EngineUnreachable(_)
                | CoreError::EngineInternal(_)
        )
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
