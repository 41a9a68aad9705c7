//! Summary Stream Integration Tests
//!
//! Session state transitions, caching, and transport replacement.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;

use scanlens::services::{SummarySession, SummaryState, SummaryStreamClient, SummaryView};
use scanlens::storage::SummaryCache;
use scanlens_core::CoreError;

use crate::support::{frame, FakeBackend};

fn client(backend: &Arc<FakeBackend>) -> SummaryStreamClient {
    SummaryStreamClient::new(backend.clone(), SummaryCache::new())
}

async fn settle(client: &SummaryStreamClient) -> SummarySession {
    tokio::time::timeout(Duration::from_secs(5), client.wait_settled())
        .await
        .expect("session did not settle")
        .unwrap()
}

/// Wait until the session satisfies `f`.
async fn wait_until(client: &SummaryStreamClient, f: impl Fn(&SummarySession) -> bool) {
    let mut rx = client.subscribe();
    tokio::time::timeout(Duration::from_secs(5), rx.wait_for(|s| f(s)))
        .await
        .expect("condition not reached")
        .unwrap();
}

#[tokio::test]
async fn test_stream_done_caches_final_text() {
    let backend = FakeBackend::new();
    let tx = backend.push_stream();
    let summaries = client(&backend);

    summaries.generate("u-1").await;
    assert_eq!(summaries.session().state, SummaryState::Connecting);

    tx.send(frame(json!({"type": "status", "content": "starting"}))).unwrap();
    tx.send(frame(json!({"type": "summary", "content": "partial"}))).unwrap();
    tx.send(frame(json!({"type": "summary", "content": "final text"}))).unwrap();
    tx.send(frame(json!({"type": "done"}))).unwrap();

    let session = settle(&summaries).await;
    assert_eq!(session.state, SummaryState::Done);
    assert_eq!(session.buffer, "final text");
    assert!(session.status_text.is_none());
    assert_eq!(summaries.cache().get("u-1").await.as_deref(), Some("final text"));
}

#[tokio::test]
async fn test_stream_error_caches_nothing() {
    let backend = FakeBackend::new();
    let tx = backend.push_stream();
    let summaries = client(&backend);

    summaries.generate("u-1").await;
    tx.send(frame(json!({"type": "status", "content": "starting"}))).unwrap();
    tx.send(frame(json!({"type": "error", "content": "upstream failure"}))).unwrap();

    let session = settle(&summaries).await;
    assert_eq!(session.state, SummaryState::Error);
    assert_eq!(session.error_message.as_deref(), Some("upstream failure"));
    assert!(!summaries.cache().contains("u-1").await);
}

#[tokio::test]
async fn test_status_frame_moves_to_streaming() {
    let backend = FakeBackend::new();
    let tx = backend.push_stream();
    let summaries = client(&backend);

    summaries.generate("u-1").await;
    tx.send(frame(json!({"type": "status", "content": "Reading engine verdicts"}))).unwrap();

    wait_until(&summaries, |s| s.state == SummaryState::Streaming).await;
    assert_eq!(
        summaries.session().status_text.as_deref(),
        Some("Reading engine verdicts")
    );
}

#[tokio::test]
async fn test_generate_closes_previous_transport() {
    let backend = FakeBackend::new();
    let tx_a = backend.push_stream();
    let tx_b = backend.push_stream();
    let summaries = client(&backend);

    summaries.generate("uuid-a").await;
    tx_a.send(frame(json!({"type": "summary", "content": "about A"}))).unwrap();
    wait_until(&summaries, |s| s.buffer == "about A").await;

    summaries.generate("uuid-b").await;

    // The first stream's receiver was dropped with its session.
    tokio::time::timeout(Duration::from_secs(5), tx_a.closed())
        .await
        .expect("first transport still open");
    assert!(tx_a.send(frame(json!({"type": "summary", "content": "late A"}))).is_err());

    tx_b.send(frame(json!({"type": "summary", "content": "about B"}))).unwrap();
    tx_b.send(frame(json!({"type": "done"}))).unwrap();

    let session = settle(&summaries).await;
    assert_eq!(session.file_uuid.as_deref(), Some("uuid-b"));
    assert_eq!(session.buffer, "about B");
    assert!(!summaries.cache().contains("uuid-a").await);
    assert_eq!(FakeBackend::count(&backend.stream_opens), 2);
}

#[tokio::test]
async fn test_view_cached_makes_no_network_calls() {
    let backend = FakeBackend::new();
    let summaries = client(&backend);
    summaries.cache().insert("u-1", "Known benign installer.").await;
    let before = summaries.session();

    let view = summaries.view("u-1").await;

    assert_eq!(view, SummaryView::Cached("Known benign installer.".to_string()));
    assert_eq!(backend.network_calls(), 0);
    assert_eq!(summaries.session(), before);
}

#[tokio::test]
async fn test_view_uncached_starts_session() {
    let backend = FakeBackend::new();
    let tx = backend.push_stream();
    let summaries = client(&backend);

    let view = summaries.view("u-1").await;
    assert!(matches!(view, SummaryView::Streaming { .. }));

    tx.send(frame(json!({"type": "summary", "content": "text"}))).unwrap();
    tx.send(frame(json!({"type": "done"}))).unwrap();
    settle(&summaries).await;

    let view = summaries.view("u-1").await;
    assert_eq!(view, SummaryView::Cached("text".to_string()));
    assert_eq!(FakeBackend::count(&backend.stream_opens), 1);
}

#[tokio::test]
async fn test_unknown_frame_type_fails_session() {
    let backend = FakeBackend::new();
    let tx = backend.push_stream();
    let summaries = client(&backend);

    summaries.generate("u-1").await;
    tx.send(frame(json!({"type": "summary", "content": "partial"}))).unwrap();
    tx.send(frame(json!({"type": "heartbeat"}))).unwrap();

    let session = settle(&summaries).await;
    assert_eq!(session.state, SummaryState::Error);
    assert_eq!(
        session.error_message.as_deref(),
        Some("Failed to parse server response")
    );
    tokio::time::timeout(Duration::from_secs(5), tx.closed())
        .await
        .expect("transport left open after protocol error");
}

#[tokio::test]
async fn test_stream_end_without_terminal_frame() {
    let backend = FakeBackend::new();
    let tx = backend.push_stream();
    let summaries = client(&backend);

    summaries.generate("u-1").await;
    tx.send(frame(json!({"type": "summary", "content": "partial"}))).unwrap();
    drop(tx);

    let session = settle(&summaries).await;
    assert_eq!(session.state, SummaryState::Error);
    assert_eq!(session.error_message.as_deref(), Some("Connection to server lost"));
    assert!(!summaries.cache().contains("u-1").await);
}

#[tokio::test]
async fn test_transport_error_mid_stream() {
    let backend = FakeBackend::new();
    let tx = backend.push_stream();
    let summaries = client(&backend);

    summaries.generate("u-1").await;
    tx.send(Err(CoreError::network("connection reset"))).unwrap();

    let session = settle(&summaries).await;
    assert_eq!(session.error_message.as_deref(), Some("Connection to server lost"));
}

#[tokio::test]
async fn test_open_failure_reports_error() {
    let backend = FakeBackend::new();
    let summaries = client(&backend);

    summaries.generate("u-1").await;

    let session = settle(&summaries).await;
    assert_eq!(session.state, SummaryState::Error);
    assert!(session.error_message.unwrap().contains("connection refused"));
}

#[tokio::test]
async fn test_disconnect_returns_to_idle() {
    let backend = FakeBackend::new();
    let tx = backend.push_stream();
    let summaries = client(&backend);

    summaries.generate("u-1").await;
    tx.send(frame(json!({"type": "status", "content": "working"}))).unwrap();
    tx.send(frame(json!({"type": "summary", "content": "partial"}))).unwrap();
    wait_until(&summaries, |s| s.buffer == "partial").await;

    summaries.disconnect().await;

    let session = summaries.session();
    assert_eq!(session.state, SummaryState::Idle);
    assert!(session.status_text.is_none());
    assert!(tx.is_closed());
    assert!(!summaries.cache().contains("u-1").await);
}

#[tokio::test]
async fn test_summarize_once_caches_result() {
    let backend = FakeBackend::new();
    backend.set_summary("No engines flagged this file.");
    let summaries = client(&backend);

    let first = summaries.summarize_once("u-1").await.unwrap();
    let second = summaries.summarize_once("u-1").await.unwrap();

    assert_eq!(first, second);
    assert_eq!(FakeBackend::count(&backend.summary_calls), 1);
}
