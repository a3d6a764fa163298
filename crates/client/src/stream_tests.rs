// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use stampede_core::SampleStatus;

fn buffer_with(line: &str) -> BytesMut {
    let mut buffer = BytesMut::new();
    buffer.extend_from_slice(line.as_bytes());
    buffer
}

#[tokio::test]
async fn flush_line_decodes_and_delivers() {
    let (tx, mut rx) = mpsc::channel(4);
    let mut buffer =
        buffer_with(r#"{"ts":1,"label":"GET /","status":"ok","latency_ms":12,"threads":2}"#);
    let len = buffer.len();

    let end = flush_line(&mut buffer, len, &tx).await.unwrap();
    assert!(end.is_none());

    let sample = rx.recv().await.unwrap();
    assert_eq!(sample.label, "GET /");
    assert_eq!(sample.status, SampleStatus::Ok);
    assert_eq!(sample.latency_ms, 12);
}

#[tokio::test]
async fn blank_lines_are_skipped() {
    let (tx, mut rx) = mpsc::channel(4);
    let mut buffer = buffer_with("  \t ");
    let len = buffer.len();

    let end = flush_line(&mut buffer, len, &tx).await.unwrap();
    assert!(end.is_none());
    drop(tx);
    assert!(rx.recv().await.is_none());
}

#[tokio::test]
async fn garbage_line_is_a_decode_error() {
    let (tx, _rx) = mpsc::channel(4);
    let mut buffer = buffer_with("not json");
    let len = buffer.len();

    let err = flush_line(&mut buffer, len, &tx).await.unwrap_err();
    assert!(matches!(err, EngineError::Decode(_)));
}

#[tokio::test]
async fn dropped_receiver_ends_the_stream() {
    let (tx, rx) = mpsc::channel(1);
    drop(rx);
    let mut buffer =
        buffer_with(r#"{"ts":1,"label":"GET /","status":"ko","latency_ms":3,"threads":1}"#);
    let len = buffer.len();

    let end = flush_line(&mut buffer, len, &tx).await.unwrap();
    assert_eq!(end, Some(StreamEnd::SinkClosed));
}
