// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Write pacing for rate-limited backends.
//!
//! All scheduler write operations pass through a bounded FIFO queue and a
//! token bucket before reaching the backend API. Reads bypass this
//! entirely so status polling never blocks behind deploys.

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;

/// Token bucket configuration.
#[derive(Debug, Clone)]
pub struct WriteLimits {
    /// Sustained write rate, tokens per second.
    pub rate: f64,
    /// Bucket capacity (burst size).
    pub burst: u32,
    /// Maximum writes queued waiting for a token. Excess callers fail
    /// fast with a transient error instead of piling up.
    pub queue_depth: usize,
}

impl Default for WriteLimits {
    fn default() -> Self {
        Self { rate: 10.0, burst: 20, queue_depth: 256 }
    }
}

struct Bucket {
    tokens: f64,
    last_refill: Instant,
}

/// Bounded FIFO write gate. `acquire` returns once a token is available;
/// fairness comes from the semaphore's FIFO wake order.
pub struct WriteGate {
    limits: WriteLimits,
    queue: Arc<Semaphore>,
    bucket: Mutex<Bucket>,
}

/// The queue is full; the caller should retry later.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueFull;

impl WriteGate {
    pub fn new(limits: WriteLimits) -> Self {
        let queue = Arc::new(Semaphore::new(limits.queue_depth));
        Self { limits, queue, bucket: Mutex::new(Bucket { tokens: 0.0, last_refill: Instant::now() }) }
    }

    /// Wait for a write slot. Returns `Err(QueueFull)` when `queue_depth`
    /// writers are already waiting.
    pub async fn acquire(&self) -> Result<(), QueueFull> {
        let Ok(_slot) = self.queue.clone().try_acquire_owned() else {
            return Err(QueueFull);
        };
        loop {
            let wait = {
                let mut bucket = self.bucket.lock();
                let elapsed = bucket.last_refill.elapsed();
                bucket.last_refill = Instant::now();
                bucket.tokens = (bucket.tokens + elapsed.as_secs_f64() * self.limits.rate)
                    .min(f64::from(self.limits.burst));
                if bucket.tokens >= 1.0 {
                    bucket.tokens -= 1.0;
                    None
                } else {
                    // Time until one whole token accrues.
                    Some(Duration::from_secs_f64((1.0 - bucket.tokens) / self.limits.rate))
                }
            };
            match wait {
                None => return Ok(()),
                Some(delay) => tokio::time::sleep(delay).await,
            }
        }
    }

    /// Seed the bucket, letting the first writes through without waiting.
    pub fn prefill(&self) {
        self.bucket.lock().tokens = f64::from(self.limits.burst);
    }
}

#[cfg(test)]
#[path = "limiter_tests.rs"]
mod tests;
