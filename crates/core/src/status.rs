// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Derived collection status types.

use crate::catalog::RunInstance;
use crate::key::{CollectionId, PlanId};
use serde::{Deserialize, Serialize};

/// Lifecycle position of a collection as driven by the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollectionState {
    Empty,
    Deploying,
    Deployed,
    DeployFailed,
    Running,
    Ran,
    Terminated,
    Purged,
}

crate::simple_display! {
    CollectionState {
        Empty => "empty",
        Deploying => "deploying",
        Deployed => "deployed",
        DeployFailed => "deploy_failed",
        Running => "running",
        Ran => "ran",
        Terminated => "terminated",
        Purged => "purged",
    }
}

/// Per-plan deployment observation.
///
/// The scheduler fills the deployment columns; `in_progress` and
/// `started_at_ms` are overlaid from the run ledger by the status probe,
/// never by the scheduler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanStatus {
    pub plan: PlanId,
    pub engines_expected: u32,
    pub engines_deployed: u32,
    /// True when all expected engines answer the liveness check.
    pub engines_reachable: bool,
    pub in_progress: bool,
    pub started_at_ms: Option<u64>,
}

impl PlanStatus {
    pub fn empty(plan: PlanId, engines_expected: u32) -> Self {
        Self {
            plan,
            engines_expected,
            engines_deployed: 0,
            engines_reachable: false,
            in_progress: false,
            started_at_ms: None,
        }
    }
}

/// Composed answer for a status query. Derived, never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub collection: CollectionId,
    pub state: CollectionState,
    pub plans: Vec<PlanStatus>,
    /// The open run, when one exists.
    pub run: Option<RunInstance>,
}

impl StatusSnapshot {
    /// Derive the externally observable state from scheduler and ledger
    /// facts. `Terminated` collapses into `Ran` here: from outside, both
    /// look like "deployed, last run closed".
    pub fn derive_state(plans: &[PlanStatus], open_run: Option<&RunInstance>, any_ended_run: bool) -> CollectionState {
        let deployed: u32 = plans.iter().map(|p| p.engines_deployed).sum();
        if deployed == 0 {
            return CollectionState::Empty;
        }
        if open_run.is_some() {
            return CollectionState::Running;
        }
        if !plans.iter().all(|p| p.engines_reachable) {
            return CollectionState::Deploying;
        }
        if any_ended_run {
            CollectionState::Ran
        } else {
            CollectionState::Deployed
        }
    }
}

#[cfg(test)]
#[path = "status_tests.rs"]
mod tests;
