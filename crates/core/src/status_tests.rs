// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::key::RunId;

fn plan_status(deployed: u32, reachable: bool) -> PlanStatus {
    PlanStatus {
        plan: PlanId::new(7),
        engines_expected: 2,
        engines_deployed: deployed,
        engines_reachable: reachable,
        in_progress: false,
        started_at_ms: None,
    }
}

fn open_run() -> RunInstance {
    RunInstance {
        run_id: RunId::new(1),
        collection_id: CollectionId::new(42),
        started_at_ms: 1_000,
        ended_at_ms: None,
    }
}

#[test]
fn no_workers_is_empty() {
    let state = StatusSnapshot::derive_state(&[plan_status(0, false)], None, false);
    assert_eq!(state, CollectionState::Empty);
}

#[test]
fn open_run_is_running() {
    let run = open_run();
    let state = StatusSnapshot::derive_state(&[plan_status(2, true)], Some(&run), false);
    assert_eq!(state, CollectionState::Running);
}

#[test]
fn partial_reachability_is_deploying() {
    let state = StatusSnapshot::derive_state(&[plan_status(2, false)], None, false);
    assert_eq!(state, CollectionState::Deploying);
}

#[test]
fn reachable_with_closed_run_is_ran() {
    let state = StatusSnapshot::derive_state(&[plan_status(2, true)], None, true);
    assert_eq!(state, CollectionState::Ran);
}

#[test]
fn reachable_without_runs_is_deployed() {
    let state = StatusSnapshot::derive_state(&[plan_status(2, true)], None, false);
    assert_eq!(state, CollectionState::Deployed);
}

#[test]
fn state_display() {
    assert_eq!(CollectionState::DeployFailed.to_string(), "deploy_failed");
    assert_eq!(CollectionState::Ran.to_string(), "ran");
}
