// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Partial-failure aggregation for lifecycle operations.

use crate::error::CoreError;
use crate::worker::WorkerRef;

/// One worker's failure within an otherwise fan-out operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerFailure {
    pub worker: WorkerRef,
    pub error: CoreError,
}

/// Outcome of a lifecycle operation across all touched workers.
///
/// Partial success is a first-class outcome: "stopped 9/10, 1 unreachable"
/// is a success with notes, not a failure. `primary` is set only when the
/// operation as a whole failed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OperationReport {
    /// The kind that failed the operation, when it did.
    pub primary: Option<CoreError>,
    pub successes: Vec<WorkerRef>,
    pub failures: Vec<WorkerFailure>,
}

impl OperationReport {
    pub fn success(&mut self, worker: WorkerRef) {
        self.successes.push(worker);
    }

    pub fn failure(&mut self, worker: WorkerRef, error: CoreError) {
        self.failures.push(WorkerFailure { worker, error });
    }

    /// Whether the operation as a whole succeeded (notes allowed).
    pub fn ok(&self) -> bool {
        self.primary.is_none()
    }

    pub fn failed(mut self, primary: CoreError) -> Self {
        self.primary = Some(primary);
        self
    }

    /// `"9/10"` style summary for logs.
    pub fn tally(&self) -> String {
        let total = self.successes.len() + self.failures.len();
        format!("{}/{}", self.successes.len(), total)
    }
}

#[cfg(test)]
#[path = "report_tests.rs"]
mod tests;
