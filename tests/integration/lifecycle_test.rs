//! Analysis Lifecycle Integration Tests

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;

use scanlens::models::upload_mode::UploadMode;
use scanlens::services::{AnalysisLifecycleController, LifecyclePhase, UploadModeController};
use scanlens_client::FullScanSubmission;
use scanlens_core::{AnalysisStatus, CoreError};

use crate::support::{analysis, upload, FakeBackend};

fn controller(backend: &Arc<FakeBackend>, mode: UploadMode) -> AnalysisLifecycleController {
    let modes = UploadModeController::new(backend.clone(), mode);
    AnalysisLifecycleController::new(backend.clone(), modes)
}

fn queued_submission() -> FullScanSubmission {
    FullScanSubmission {
        uuid: "u-1".to_string(),
        filename: "sample.exe".to_string(),
        found: false,
        result: None,
        analysis_id: Some("an-1".to_string()),
    }
}

#[tokio::test]
async fn test_submit_rejected_in_hash_lookup_mode() {
    let backend = FakeBackend::new();
    let lifecycle = controller(&backend, UploadMode::HashLookup);

    let err = lifecycle.submit(&upload("a.exe")).await.unwrap_err();
    assert!(matches!(err, CoreError::State(_)));
    assert_eq!(backend.network_calls(), 0);
}

#[tokio::test]
async fn test_refresh_without_tracked_analysis() {
    let backend = FakeBackend::new();
    let lifecycle = controller(&backend, UploadMode::Full);

    let err = lifecycle.refresh().await.unwrap_err();
    assert!(matches!(err, CoreError::State(_)));
    assert_eq!(backend.network_calls(), 0);
}

#[tokio::test]
async fn test_submit_adopts_prior_analysis_without_fetching() {
    let backend = FakeBackend::new();
    backend.set_full_scan(FullScanSubmission {
        found: true,
        result: Some(analysis("an-0", "completed", json!({"harmless": 60}))),
        analysis_id: None,
        ..queued_submission()
    });
    let lifecycle = controller(&backend, UploadMode::Full);

    let snapshot = lifecycle.submit(&upload("sample.exe")).await.unwrap();

    assert_eq!(snapshot.phase, LifecyclePhase::Completed { from_cache: true });
    assert_eq!(snapshot.uuid.as_deref(), Some("u-1"));
    assert_eq!(FakeBackend::count(&backend.fetch_calls), 0);
}

#[tokio::test]
async fn test_submit_then_refresh_to_completion() {
    let backend = FakeBackend::new();
    backend.set_full_scan(queued_submission());
    backend.push_analysis(Ok(analysis("an-1", "queued", json!({}))));
    backend.push_analysis(Ok(analysis("an-1", "completed", json!({"malicious": 1, "undetected": 9}))));
    let lifecycle = controller(&backend, UploadMode::Full);

    let snapshot = lifecycle.submit(&upload("sample.exe")).await.unwrap();
    assert_eq!(
        snapshot.phase,
        LifecyclePhase::Pending {
            status: AnalysisStatus::Queued
        }
    );

    let snapshot = lifecycle.refresh().await.unwrap();
    assert_eq!(snapshot.phase, LifecyclePhase::Completed { from_cache: false });
    assert!(snapshot.analysis.unwrap().is_completed());
    assert_eq!(FakeBackend::count(&backend.fetch_calls), 2);
}

#[tokio::test]
async fn test_failed_fetch_keeps_analysis_tracked() {
    let backend = FakeBackend::new();
    backend.set_full_scan(queued_submission());
    backend.push_analysis(Err(CoreError::network("HTTP 502: Bad Gateway")));
    let lifecycle = controller(&backend, UploadMode::Full);

    let err = lifecycle.submit(&upload("sample.exe")).await.unwrap_err();
    assert!(matches!(err, CoreError::Network(_)));

    let snapshot = lifecycle.snapshot().await;
    assert_eq!(snapshot.uuid.as_deref(), Some("u-1"));
    assert!(!snapshot.phase.is_completed());
}

#[tokio::test]
async fn test_concurrent_refresh_is_single_flight() {
    let backend = FakeBackend::new();
    let lifecycle = controller(&backend, UploadMode::Full);
    lifecycle
        .track("u-1", "sample.exe", Some(analysis("an-1", "queued", json!({}))))
        .await;
    backend.push_analysis(Ok(analysis("an-1", "completed", json!({"harmless": 5}))));
    let gate = backend.gate_fetches();

    let release = async {
        while FakeBackend::count(&backend.fetch_calls) == 0 {
            tokio::task::yield_now().await;
        }
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        assert!(lifecycle.is_refreshing().await);
        gate.notify_one();
    };

    let (first, second, _) = tokio::join!(lifecycle.refresh(), lifecycle.refresh(), release);

    assert_eq!(FakeBackend::count(&backend.fetch_calls), 1);
    assert_eq!(first.unwrap(), second.unwrap());
    assert!(!lifecycle.is_refreshing().await);
}

#[tokio::test]
async fn test_abandoned_refresh_is_not_joined_later() {
    let backend = FakeBackend::new();
    let lifecycle = controller(&backend, UploadMode::Full);
    lifecycle
        .track("u-1", "sample.exe", Some(analysis("an-1", "queued", json!({}))))
        .await;
    backend.push_analysis(Ok(analysis("an-1", "completed", json!({"harmless": 5}))));
    let gate = backend.gate_fetches();

    let abandoned = tokio::time::timeout(Duration::from_millis(50), lifecycle.refresh()).await;
    assert!(abandoned.is_err());
    assert_eq!(FakeBackend::count(&backend.fetch_calls), 1);
    assert!(!lifecycle.is_refreshing().await);

    gate.notify_one();
    let snapshot = lifecycle.refresh().await.unwrap();

    assert_eq!(FakeBackend::count(&backend.fetch_calls), 2);
    assert!(snapshot.phase.is_completed());
    assert!(!lifecycle.is_refreshing().await);
}

#[tokio::test]
async fn test_refresh_rejected_after_switch_to_hash_lookup() {
    let backend = FakeBackend::new();
    let modes = UploadModeController::new(backend.clone(), UploadMode::Full);
    let lifecycle = AnalysisLifecycleController::new(backend.clone(), modes.clone());
    lifecycle.track("u-1", "sample.exe", None).await;

    modes.set_mode(UploadMode::HashLookup).await;

    assert!(matches!(lifecycle.refresh().await, Err(CoreError::State(_))));
    assert_eq!(backend.network_calls(), 0);
}

#[tokio::test]
async fn test_clear_returns_to_idle() {
    let backend = FakeBackend::new();
    let lifecycle = controller(&backend, UploadMode::Full);
    lifecycle.track("u-1", "sample.exe", None).await;

    lifecycle.clear().await;

    let snapshot = lifecycle.snapshot().await;
    assert_eq!(snapshot.phase, LifecyclePhase::Idle);
    assert!(snapshot.uuid.is_none());
}
