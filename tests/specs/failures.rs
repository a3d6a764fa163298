// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scenario: one engine rejects the start.

use crate::common::*;
use stampede_client::ScriptedStart;
use stampede_core::{Clock, CollectionId, CoreError, RunId};

const C: CollectionId = CollectionId::new(42);

#[tokio::test]
async fn rejection_is_fatal_and_cleans_up() {
    let w = world();
    w.seed_collection(42, 2);
    w.controller.deploy(C).await.unwrap();

    // Engine 1 answers the start with HTTP 400 {"reason":"bad_test"}.
    w.engines
        .script_start(&w.url(42, 1), ScriptedStart::Reject { reason: "bad_test".into() });

    let before = w.clock.epoch_ms();
    let outcome = w.controller.trigger(C).await.unwrap();
    assert_eq!(outcome.run_id, RunId::new(1));
    assert_eq!(
        outcome.report.primary,
        Some(CoreError::EngineRejected { reason: "bad_test".into() })
    );
    assert_eq!(outcome.report.failures.len(), 1);
    assert_eq!(outcome.report.failures[0].worker.ordinal, 1);

    // The engine that did start was stopped.
    assert_eq!(w.engines.stopped_urls(), vec![w.url(42, 0)]);

    // The run was closed with ended_at set to now.
    let runs = w.controller.ledger().runs_for(C).await.unwrap();
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].ended_at_ms, Some(before));
    assert!(w.controller.ledger().open_run(C).await.unwrap().is_none());

    // No metrics fan-out was opened for the aborted run.
    assert_eq!(w.engines.total_stream_opens(), 0);
}

#[tokio::test]
async fn transient_engine_internal_errors_count_toward_the_threshold() {
    let w = world();
    w.seed_collection(42, 2);
    w.controller.deploy(C).await.unwrap();

    // A 5xx is retriable in kind but still a failed start; at 1/2 it
    // breaches the 25% threshold and the trigger aborts.
    w.engines
        .script_start(&w.url(42, 1), ScriptedStart::Internal { status: 503 });

    let outcome = w.controller.trigger(C).await.unwrap();
    assert!(!outcome.report.ok());
    assert!(w.controller.ledger().open_run(C).await.unwrap().is_none());
    assert_eq!(w.engines.stopped_urls(), vec![w.url(42, 0)]);
}
