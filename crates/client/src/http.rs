// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Production engine client over reqwest.

use crate::api::{EngineApi, EngineError, StreamEnd};
use crate::stream;
use async_trait::async_trait;
use stampede_core::wire::RejectionBody;
use stampede_core::{EngineAddress, EngineRunConfig, Sample};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Tuning for [`HttpEngineClient`].
#[derive(Debug, Clone)]
pub struct HttpEngineConfig {
    /// Per-call deadline for control operations (start, stop, log).
    /// The metrics stream is unbounded and respects cancellation instead.
    pub control_timeout: Duration,
    /// Deadline for one `/healthz` probe.
    pub health_timeout: Duration,
    /// Reconnect backoff floor for the metrics stream.
    pub stream_backoff_base: Duration,
    /// Reconnect backoff ceiling.
    pub stream_backoff_cap: Duration,
}

impl Default for HttpEngineConfig {
    fn default() -> Self {
        Self {
            control_timeout: Duration::from_secs(10),
            health_timeout: Duration::from_secs(2),
            stream_backoff_base: Duration::from_millis(500),
            stream_backoff_cap: Duration::from_secs(10),
        }
    }
}

/// Typed HTTP client speaking the engine wire protocol.
#[derive(Clone)]
pub struct HttpEngineClient {
    http: reqwest::Client,
    config: HttpEngineConfig,
}

impl HttpEngineClient {
    pub fn new(config: HttpEngineConfig) -> Self {
        Self { http: reqwest::Client::new(), config }
    }

    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.http
    }

    pub(crate) fn config(&self) -> &HttpEngineConfig {
        &self.config
    }

    /// Map a reqwest failure: anything that never produced a status line
    /// is a reachability problem.
    fn transport_error(err: reqwest::Error) -> EngineError {
        EngineError::Unreachable(err.to_string())
    }

    async fn classify(response: reqwest::Response) -> Result<reqwest::Response, EngineError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        if status.is_client_error() {
            let reason = response
                .json::<RejectionBody>()
                .await
                .map(|b| b.reason)
                .unwrap_or_else(|_| status.to_string());
            return Err(EngineError::Rejected { reason });
        }
        Err(EngineError::Internal { status: status.as_u16() })
    }
}

impl Default for HttpEngineClient {
    fn default() -> Self {
        Self::new(HttpEngineConfig::default())
    }
}

#[async_trait]
impl EngineApi for HttpEngineClient {
    async fn start(
        &self,
        addr: &EngineAddress,
        config: &EngineRunConfig,
    ) -> Result<(), EngineError> {
        let response = self
            .http
            .post(format!("{}/start", addr.url))
            .timeout(self.config.control_timeout)
            .json(config)
            .send()
            .await
            .map_err(Self::transport_error)?;
        Self::classify(response).await?;
        tracing::debug!(worker = %addr.worker, run_id = %config.run_id, "engine start acknowledged");
        Ok(())
    }

    async fn stop(&self, addr: &EngineAddress) -> Result<(), EngineError> {
        let response = self
            .http
            .post(format!("{}/stop", addr.url))
            .timeout(self.config.control_timeout)
            .send()
            .await
            .map_err(Self::transport_error)?;
        // A stop against an already-ended run answers 2xx like any other.
        Self::classify(response).await?;
        Ok(())
    }

    async fn stream_metrics(
        &self,
        addr: &EngineAddress,
        sink: mpsc::Sender<Sample>,
        cancel: CancellationToken,
    ) -> Result<StreamEnd, EngineError> {
        stream::run(self, addr, sink, cancel).await
    }

    async fn fetch_log(&self, addr: &EngineAddress) -> Result<String, EngineError> {
        let response = self
            .http
            .get(format!("{}/log", addr.url))
            .timeout(self.config.control_timeout)
            .send()
            .await
            .map_err(Self::transport_error)?;
        let response = Self::classify(response).await?;
        response.text().await.map_err(Self::transport_error)
    }

    async fn health(&self, addr: &EngineAddress) -> bool {
        let probe = self
            .http
            .get(format!("{}/healthz", addr.url))
            .timeout(self.config.health_timeout)
            .send()
            .await;
        matches!(probe, Ok(r) if r.status().is_success())
    }
}
