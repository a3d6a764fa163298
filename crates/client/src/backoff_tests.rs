// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn delays_stay_under_the_growing_ceiling() {
    let mut backoff = Backoff::new(Duration::from_millis(500), Duration::from_secs(10));
    let mut ceiling = Duration::from_millis(500);
    for _ in 0..8 {
        let delay = backoff.next_delay();
        assert!(delay < ceiling, "delay {:?} exceeded ceiling {:?}", delay, ceiling);
        ceiling = (ceiling * 2).min(Duration::from_secs(10));
    }
}

#[test]
fn ceiling_caps_at_the_configured_maximum() {
    let mut backoff = Backoff::new(Duration::from_millis(500), Duration::from_secs(10));
    for _ in 0..32 {
        let delay = backoff.next_delay();
        assert!(delay < Duration::from_secs(10));
    }
}

#[test]
fn reset_returns_to_base() {
    let mut backoff = Backoff::new(Duration::from_millis(500), Duration::from_secs(10));
    for _ in 0..5 {
        backoff.next_delay();
    }
    backoff.reset();
    let delay = backoff.next_delay();
    assert!(delay < Duration::from_millis(500));
}
