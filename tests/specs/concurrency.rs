// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scenario: two callers trigger the same collection simultaneously.

use crate::common::*;
use stampede_core::{CollectionId, ConflictKind, CoreError, RunId};
use stampede_scheduler::Scheduler;

const C: CollectionId = CollectionId::new(42);

#[tokio::test(flavor = "multi_thread")]
async fn exactly_one_concurrent_trigger_wins() {
    let w = world();
    w.seed_collection(42, 2);
    // Keep streams open so the run stays in progress.
    w.engines.hold_stream_open(&w.url(42, 0));
    w.engines.hold_stream_open(&w.url(42, 1));
    w.controller.deploy(C).await.unwrap();

    let left = w.controller.clone();
    let right = w.controller.clone();
    let (a, b) = tokio::join!(
        tokio::spawn(async move { left.trigger(C).await }),
        tokio::spawn(async move { right.trigger(C).await }),
    );
    let (a, b) = (a.unwrap(), b.unwrap());

    let (winner, loser) = match (&a, &b) {
        (Ok(_), Err(_)) => (a.as_ref().ok(), b.as_ref().err()),
        (Err(_), Ok(_)) => (b.as_ref().ok(), a.as_ref().err()),
        other => panic!("expected exactly one winner, got {:?}", other),
    };
    assert_eq!(winner.map(|t| t.run_id), Some(RunId::new(1)));
    assert_eq!(loser, Some(&CoreError::Conflict(ConflictKind::RunInProgress)));

    // The metrics fan-out was opened exactly once per engine.
    assert_eq!(w.engines.stream_opens(&w.url(42, 0)), 1);
    assert_eq!(w.engines.stream_opens(&w.url(42, 1)), 1);

    w.controller.terminate(C).await;
}

#[tokio::test]
async fn operations_on_one_collection_observe_a_total_order() {
    let w = world();
    w.seed_collection(42, 1);
    w.engines.hold_stream_open(&w.url(42, 0));
    w.controller.deploy(C).await.unwrap();

    // Trigger, terminate, and purge interleaved from separate tasks all
    // serialize through the collection gate without deadlock or panic.
    let c1 = w.controller.clone();
    let c2 = w.controller.clone();
    let c3 = w.controller.clone();
    let (t1, t2, t3) = tokio::join!(
        tokio::spawn(async move { c1.trigger(C).await.map(|t| t.run_id) }),
        tokio::spawn(async move {
            c2.terminate(C).await;
        }),
        tokio::spawn(async move { c3.purge(C).await.map(|_| ()) }),
    );
    t1.unwrap().ok();
    t2.unwrap();
    t3.unwrap().unwrap();

    // Whatever the interleaving, purge leaves nothing behind.
    assert!(w.scheduler.list_deployed_collections().await.unwrap().is_empty());
    assert_eq!(w.controller.active_streams(C), 0);
}
