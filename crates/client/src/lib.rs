// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! stampede-client: typed HTTP client to one engine worker.
//!
//! # Architecture
//!
//! Engines expose a four-endpoint wire protocol: `POST /start`,
//! `POST /stop`, `GET /metrics/stream` (NDJSON), and `GET /log`. The
//! [`EngineApi`] trait is the seam the controller drives; the production
//! implementation is [`HttpEngineClient`], and tests swap in the
//! [`FakeEngine`] behind the `test-support` feature.

mod api;
mod backoff;
mod http;
mod stream;

#[cfg(any(test, feature = "test-support"))]
mod fake;

pub use api::{EngineApi, EngineError, StreamEnd};
#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeEngine, ScriptedStart};
pub use http::{HttpEngineClient, HttpEngineConfig};
