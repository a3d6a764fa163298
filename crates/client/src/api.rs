// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The engine client seam.

use async_trait::async_trait;
use stampede_core::{CoreError, EngineAddress, EngineRunConfig, Sample};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Errors from one engine worker.
///
/// Unreachable and internal failures are retriable; a rejection is fatal
/// for the operation and surfaces upward unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("engine unreachable: {0}")]
    Unreachable(String),

    #[error("engine rejected request: {reason}")]
    Rejected { reason: String },

    #[error("engine internal error: status {status}")]
    Internal { status: u16 },

    #[error("metrics stream decode error: {0}")]
    Decode(String),
}

impl EngineError {
    pub fn is_transient(&self) -> bool {
        matches!(self, EngineError::Unreachable(_) | EngineError::Internal { .. })
    }
}

impl From<EngineError> for CoreError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::Unreachable(msg) => CoreError::EngineUnreachable(msg),
            EngineError::Rejected { reason } => CoreError::EngineRejected { reason },
            EngineError::Internal { status } => {
                CoreError::EngineInternal(format!("status {}", status))
            }
            EngineError::Decode(msg) => CoreError::EngineInternal(msg),
        }
    }
}

/// How a metrics stream ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamEnd {
    /// The engine closed the stream cleanly (run over).
    Eof,
    /// The cancellation token fired.
    Canceled,
    /// The receiving side of the sink was dropped.
    SinkClosed,
}

/// Operations against one engine worker.
#[async_trait]
pub trait EngineApi: Send + Sync + 'static {
    /// Post the run configuration. Returns once the engine acknowledges.
    async fn start(
        &self,
        addr: &EngineAddress,
        config: &EngineRunConfig,
    ) -> Result<(), EngineError>;

    /// Best-effort stop. Succeeds against a worker whose run already ended.
    async fn stop(&self, addr: &EngineAddress) -> Result<(), EngineError>;

    /// Stream NDJSON samples into `sink` until EOF, cancellation, or a
    /// decode error. Transient network failures reconnect with capped
    /// full-jitter backoff until `cancel` fires.
    async fn stream_metrics(
        &self,
        addr: &EngineAddress,
        sink: mpsc::Sender<Sample>,
        cancel: CancellationToken,
    ) -> Result<StreamEnd, EngineError>;

    /// Pull the final log text for post-mortems.
    async fn fetch_log(&self, addr: &EngineAddress) -> Result<String, EngineError>;

    /// Cheap liveness check, used by schedulers to gate reachability.
    async fn health(&self, addr: &EngineAddress) -> bool;
}
