// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[yare::parameterized(
    scheduler_transient = { CoreError::SchedulerTransient("rate limited".into()), true },
    engine_unreachable  = { CoreError::EngineUnreachable("connect refused".into()), true },
    engine_internal     = { CoreError::EngineInternal("500".into()), true },
    engine_rejected     = { CoreError::EngineRejected { reason: "bad_test".into() }, false },
    scheduler_fatal     = { CoreError::SchedulerFatal("forbidden".into()), false },
    conflict            = { CoreError::Conflict(ConflictKind::RunInProgress), false },
    blob_missing        = { CoreError::BlobMissing("plan-7.jmx".into()), false },
    timeout             = { CoreError::Timeout("deploy".into()), false },
    canceled            = { CoreError::Canceled, false },
)]
fn transient_classification(err: CoreError, expected: bool) {
    assert_eq!(err.is_transient(), expected);
}

#[test]
fn not_found_names_entity_and_id() {
    let err = CoreError::not_found("collection", 42u64);
    assert_eq!(err.to_string(), "collection 42 not found");
}

#[test]
fn conflict_kinds_display() {
    assert_eq!(
        CoreError::Conflict(ConflictKind::RunInProgress).to_string(),
        "conflict: run in progress"
    );
    assert_eq!(ConflictKind::EditWhileDeployed.to_string(), "edit while deployed");
}
