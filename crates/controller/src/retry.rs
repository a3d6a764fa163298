// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Retry policy for scheduler write operations.

use stampede_core::CoreError;
use std::future::Future;
use std::time::Duration;

/// Backoff schedule between attempts. Transient failures get one retry
/// per entry; validation and other fatal errors never retry.
pub(crate) const SCHEDULER_WRITE_DELAYS: [Duration; 3] = [
    Duration::from_millis(250),
    Duration::from_secs(1),
    Duration::from_secs(4),
];

pub(crate) async fn retry_transient<T, F, Fut>(
    op_name: &str,
    delays: &[Duration],
    mut op: F,
) -> Result<T, CoreError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, CoreError>>,
{
    let mut attempt = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_transient() && attempt < delays.len() => {
                tracing::warn!(op = op_name, attempt, error = %e, "transient failure, retrying");
                tokio::time::sleep(delays[attempt]).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
#[path = "retry_tests.rs"]
mod tests;
