// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn worker() -> WorkerRef {
    WorkerRef::new(ProjectId::new(1), CollectionId::new(42), PlanId::new(7), 0)
}

#[test]
fn worker_ref_stringifies_as_workload_name() {
    assert_eq!(worker().to_string(), "engine-1-42-7-0");
}

#[test]
fn worker_ref_parses_its_own_display() {
    let w = worker();
    assert_eq!(WorkerRef::parse(&w.to_string()), Some(w));
}

#[yare::parameterized(
    no_prefix    = { "1-42-7-0" },
    short        = { "engine-1-42" },
    non_numeric  = { "engine-a-b-c-d" },
    empty        = { "" },
)]
fn worker_ref_rejects_malformed_names(name: &str) {
    assert_eq!(WorkerRef::parse(name), None);
}

#[yare::parameterized(
    requested   = { WorkerState::Requested, false },
    provisioned = { WorkerState::Provisioned, true },
    reachable   = { WorkerState::Reachable, true },
    running     = { WorkerState::Running, true },
    stopped     = { WorkerState::Stopped, false },
    gone        = { WorkerState::Gone, false },
)]
fn pinning_states(state: WorkerState, expected: bool) {
    assert_eq!(state.pins_collection(), expected);
}
