// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Long-lived NDJSON metrics stream with reconnecting reads.

use crate::api::{EngineError, StreamEnd};
use crate::backoff::Backoff;
use crate::http::HttpEngineClient;
use bytes::{Buf, BytesMut};
use futures_util::StreamExt;
use stampede_core::{EngineAddress, Sample};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Why one connection attempt ended.
enum Attempt {
    Finished(StreamEnd),
    /// Connection refused, reset, or dropped mid-body; reconnect.
    Transient(String),
}

pub(crate) async fn run(
    client: &HttpEngineClient,
    addr: &EngineAddress,
    sink: mpsc::Sender<Sample>,
    cancel: CancellationToken,
) -> Result<StreamEnd, EngineError> {
    let mut backoff = Backoff::new(
        client.config().stream_backoff_base,
        client.config().stream_backoff_cap,
    );

    loop {
        if cancel.is_cancelled() {
            return Ok(StreamEnd::Canceled);
        }

        match connect_and_read(client, addr, &sink, &cancel, &mut backoff).await? {
            Attempt::Finished(end) => return Ok(end),
            Attempt::Transient(reason) => {
                let delay = backoff.next_delay();
                tracing::debug!(
                    worker = %addr.worker,
                    %reason,
                    delay_ms = delay.as_millis() as u64,
                    "metrics stream dropped, reconnecting"
                );
                tokio::select! {
                    _ = cancel.cancelled() => return Ok(StreamEnd::Canceled),
                    _ = tokio::time::sleep(delay) => {}
                }
            }
        }
    }
}

async fn connect_and_read(
    client: &HttpEngineClient,
    addr: &EngineAddress,
    sink: &mpsc::Sender<Sample>,
    cancel: &CancellationToken,
    backoff: &mut Backoff,
) -> Result<Attempt, EngineError> {
    let request = client.http().get(format!("{}/metrics/stream", addr.url)).send();
    let response = tokio::select! {
        _ = cancel.cancelled() => return Ok(Attempt::Finished(StreamEnd::Canceled)),
        r = request => r,
    };

    let response = match response {
        Ok(r) if r.status().is_success() => {
            // Connected again: the next drop backs off from the base.
            backoff.reset();
            r
        }
        Ok(r) => return Ok(Attempt::Transient(format!("status {}", r.status()))),
        Err(e) => return Ok(Attempt::Transient(e.to_string())),
    };

    let mut body = response.bytes_stream();
    let mut buffer = BytesMut::new();

    loop {
        let chunk = tokio::select! {
            _ = cancel.cancelled() => return Ok(Attempt::Finished(StreamEnd::Canceled)),
            c = body.next() => c,
        };

        match chunk {
            None => {
                // Clean EOF. A trailing unterminated line still counts.
                let rest = buffer.len();
                if let Some(end) = flush_line(&mut buffer, rest, sink).await? {
                    return Ok(Attempt::Finished(end));
                }
                return Ok(Attempt::Finished(StreamEnd::Eof));
            }
            Some(Err(e)) => return Ok(Attempt::Transient(e.to_string())),
            Some(Ok(bytes)) => {
                buffer.extend_from_slice(&bytes);
                while let Some(pos) = buffer.iter().position(|&b| b == b'\n') {
                    if let Some(end) = flush_line(&mut buffer, pos, sink).await? {
                        return Ok(Attempt::Finished(end));
                    }
                    buffer.advance(1); // the newline itself
                }
            }
        }
    }
}

/// Decode `buffer[..len]` as one sample and deliver it. `Some(end)` stops
/// the stream (the sink receiver went away).
async fn flush_line(
    buffer: &mut BytesMut,
    len: usize,
    sink: &mpsc::Sender<Sample>,
) -> Result<Option<StreamEnd>, EngineError> {
    let line = buffer.split_to(len);
    if line.iter().all(|b| b.is_ascii_whitespace()) {
        return Ok(None);
    }
    let sample: Sample =
        serde_json::from_slice(&line).map_err(|e| EngineError::Decode(e.to_string()))?;
    if sink.send(sample).await.is_err() {
        return Ok(Some(StreamEnd::SinkClosed));
    }
    Ok(None)
}

#[cfg(test)]
#[path = "stream_tests.rs"]
mod tests;
