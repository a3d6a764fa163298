// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Capped exponential backoff with full jitter.

use rand::Rng;
use std::time::Duration;

pub(crate) struct Backoff {
    base: Duration,
    cap: Duration,
    current: Duration,
}

impl Backoff {
    pub(crate) fn new(base: Duration, cap: Duration) -> Self {
        Self { base, cap, current: base }
    }

    /// Next sleep: uniform in `[0, current)`, then double toward the cap.
    pub(crate) fn next_delay(&mut self) -> Duration {
        let ceiling = self.current.max(Duration::from_millis(1));
        let jittered = rand::thread_rng().gen_range(Duration::ZERO..ceiling);
        self.current = (self.current * 2).min(self.cap);
        jittered
    }

    /// Back to the base after a successful connection.
    pub(crate) fn reset(&mut self) {
        self.current = self.base;
    }
}

#[cfg(test)]
#[path = "backoff_tests.rs"]
mod tests;
