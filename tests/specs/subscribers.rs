// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scenario: a slow subscriber loses its own samples and nothing else.

use crate::common::*;
use stampede_core::{CollectionId, PlanId, Sample, SampleStatus};
use stampede_metrics::MetricsConfig;

const C: CollectionId = CollectionId::new(42);
const PLAN: PlanId = PlanId::new(7);

fn sample(i: u64) -> Sample {
    Sample {
        ts_ms: i,
        label: "GET /".to_string(),
        status: SampleStatus::Ok,
        latency_ms: 10,
        threads: 5,
    }
}

#[tokio::test]
async fn slow_subscriber_drops_while_fast_one_keeps_up() {
    let w = world();
    let mut slow = w.hub.subscribe(C);
    let mut fast = w.hub.subscribe(C);

    // Producers push 20,000 samples; the slow reader only takes 100 of
    // them mid-stream, the fast one drains at wire speed.
    let mut slow_seen = 0;
    let mut fast_seen = 0;
    for i in 0..20_000 {
        w.hub.ingest(C, PLAN, 0, &sample(i), 1_000);
        while fast.try_recv().is_ok() {
            fast_seen += 1;
        }
        if i == 10_000 {
            for _ in 0..100 {
                if slow.try_recv().is_ok() {
                    slow_seen += 1;
                }
            }
        }
    }
    while fast.try_recv().is_ok() {
        fast_seen += 1;
    }
    while slow.try_recv().is_ok() {
        slow_seen += 1;
    }

    // Two buffer fills plus the mid-stream reads bound the slow reader.
    assert!(slow_seen <= 2_048, "slow subscriber saw {} samples", slow_seen);
    assert!(
        w.hub.subscriber_drops(C) >= 17_900,
        "expected ≥ 17,900 drops, got {}",
        w.hub.subscriber_drops(C)
    );
    // The fast subscriber observed every sample.
    assert_eq!(fast_seen, 20_000);
}

#[tokio::test]
async fn subscribers_see_one_engine_in_order() {
    let w = world();
    let mut rx = w.hub.subscribe(C);
    for i in 0..50 {
        w.hub.ingest(C, PLAN, 0, &sample(i), 1_000);
    }
    for i in 0..50 {
        let event = rx.recv().await.expect("sample");
        assert_eq!(event.sample.ts_ms, i);
    }
}

#[tokio::test]
async fn eleventh_distinct_fingerprint_lands_in_overflow() {
    let w = world_with(MetricsConfig { max_fingerprints: 10, ..MetricsConfig::default() });
    for i in 0..10 {
        let mut s = sample(i);
        s.label = format!("label-{}", i);
        w.hub.ingest(C, PLAN, 0, &s, 1_000);
    }
    assert_eq!(w.hub.cardinality_overflow_count(), 0);

    let mut eleventh = sample(11);
    eleventh.label = "label-10".to_string();
    w.hub.ingest(C, PLAN, 0, &eleventh, 1_000);
    assert_eq!(w.hub.cardinality_overflow_count(), 1);
    assert!(w.hub.scrape().contains(r#"label="__overflow__""#));

    // Every subsequent novel fingerprint increments the overflow counter.
    let mut twelfth = sample(12);
    twelfth.label = "label-11".to_string();
    w.hub.ingest(C, PLAN, 0, &twelfth, 1_000);
    assert_eq!(w.hub.cardinality_overflow_count(), 2);
}
