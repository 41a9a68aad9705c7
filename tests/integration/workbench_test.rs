//! Workbench Integration Tests
//!
//! Upload dispatch, history recording and mode switching.

use std::sync::Arc;

use serde_json::json;

use scanlens::models::settings::ScannerConfig;
use scanlens::models::upload_mode::UploadMode;
use scanlens::services::{ScanWorkbench, UploadOutcome};
use scanlens_client::{FileUpload, FullScanSubmission, HashLookupOutcome, HashLookupReport};
use scanlens_core::{CoreError, RawScanResult, ThreatContext, ThreatLevel};

use crate::support::{analysis, file_object, upload, FakeBackend};

fn workbench(backend: &Arc<FakeBackend>, mode: UploadMode) -> ScanWorkbench {
    let config = ScannerConfig {
        default_upload_mode: mode,
        max_upload_bytes: 1024,
        ..Default::default()
    };
    ScanWorkbench::new(backend.clone(), &config)
}

#[tokio::test]
async fn test_hash_lookup_upload_becomes_current() {
    let backend = FakeBackend::new();
    backend.set_lookup(HashLookupOutcome::Found(HashLookupReport {
        uuid: "u-1".to_string(),
        filename: "eicar.com".to_string(),
        cached: false,
        result: file_object("abc", json!({"malicious": 2, "suspicious": 1, "harmless": 47, "undetected": 10})),
    }));
    let bench = workbench(&backend, UploadMode::HashLookup);

    let outcome = bench.upload(upload("eicar.com")).await.unwrap();

    assert!(matches!(outcome, UploadOutcome::Scanned(_)));
    let context = bench.context().await.unwrap();
    assert!(matches!(context, ThreatContext::File(_)));
    assert_eq!(context.assessment().level, ThreatLevel::Danger);

    let history = bench.history().await;
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].scan_mode, UploadMode::HashLookup);
    assert_eq!(history[0].file_type, "COM");
}

#[tokio::test]
async fn test_hash_lookup_miss_changes_nothing() {
    let backend = FakeBackend::new();
    backend.set_lookup(HashLookupOutcome::NotFoundInDatabase { message: None });
    let bench = workbench(&backend, UploadMode::HashLookup);

    let outcome = bench.upload(upload("new.bin")).await.unwrap();

    match outcome {
        UploadOutcome::NotFoundInDatabase { message } => {
            assert_eq!(
                message,
                "File not found in the scanning database. Try a full scan instead."
            )
        }
        other => panic!("Expected NotFoundInDatabase, got {:?}", other),
    }
    assert!(bench.current().await.is_none());
    assert!(bench.history().await.is_empty());
}

#[tokio::test]
async fn test_hash_lookup_miss_keeps_service_message() {
    let backend = FakeBackend::new();
    backend.set_lookup(HashLookupOutcome::NotFoundInDatabase {
        message: Some("File not found in VirusTotal database.".to_string()),
    });
    let bench = workbench(&backend, UploadMode::HashLookup);

    match bench.upload(upload("new.bin")).await.unwrap() {
        UploadOutcome::NotFoundInDatabase { message } => {
            assert_eq!(message, "File not found in VirusTotal database.")
        }
        other => panic!("Expected NotFoundInDatabase, got {:?}", other),
    }
    assert!(bench.current().await.is_none());
}

#[tokio::test]
async fn test_full_upload_then_refresh() {
    let backend = FakeBackend::new();
    backend.set_full_scan(FullScanSubmission {
        uuid: "u-2".to_string(),
        filename: "setup.msi".to_string(),
        found: false,
        result: None,
        analysis_id: Some("an-2".to_string()),
    });
    backend.push_analysis(Ok(analysis("an-2", "in-progress", json!({}))));
    backend.push_analysis(Ok(analysis("an-2", "completed", json!({"undetected": 70}))));
    let bench = workbench(&backend, UploadMode::Full);

    let outcome = bench.upload(upload("setup.msi")).await.unwrap();
    match outcome {
        UploadOutcome::Scanned(current) => assert!(!current.result.is_complete()),
        other => panic!("Expected Scanned, got {:?}", other),
    }

    let current = bench.refresh_analysis().await.unwrap();
    assert!(current.result.is_complete());
    assert_eq!(bench.current().await.unwrap(), current);
    assert_eq!(bench.context().await.unwrap().assessment().level, ThreatLevel::Safe);
}

#[tokio::test]
async fn test_oversized_upload_rejected_before_network() {
    let backend = FakeBackend::new();
    let bench = workbench(&backend, UploadMode::Full);

    let err = bench
        .upload(FileUpload::new("big.iso", vec![0u8; 2048]))
        .await
        .unwrap_err();

    assert!(matches!(err, CoreError::Validation(_)));
    assert_eq!(backend.network_calls(), 0);
}

#[tokio::test]
async fn test_select_historical_adopts_result_mode() {
    let backend = FakeBackend::new();
    backend.store("lookup-uuid", RawScanResult::SingleLookup(file_object("abc", json!({"harmless": 3}))));
    backend.store(
        "analysis-uuid",
        RawScanResult::MultiEngineAnalysis(analysis("an-3", "completed", json!({"malicious": 1}))),
    );
    let bench = workbench(&backend, UploadMode::Full);

    bench.select_historical("lookup-uuid", "doc.pdf").await.unwrap();
    assert_eq!(bench.mode().await, UploadMode::HashLookup);
    assert!(bench.analysis().await.uuid.is_none());

    bench.select_historical("analysis-uuid", "tool.exe").await.unwrap();
    assert_eq!(bench.mode().await, UploadMode::Full);
    assert_eq!(bench.analysis().await.uuid.as_deref(), Some("analysis-uuid"));

    let history = bench.history().await;
    let uuids: Vec<_> = history.iter().map(|e| e.uuid.as_str()).collect();
    assert_eq!(uuids, vec!["analysis-uuid", "lookup-uuid"]);
    assert_eq!(history[1].scan_mode, UploadMode::HashLookup);
}

#[tokio::test]
async fn test_select_historical_twice_keeps_one_entry() {
    let backend = FakeBackend::new();
    backend.store("u-1", RawScanResult::SingleLookup(file_object("abc", json!({}))));
    backend.store("u-2", RawScanResult::SingleLookup(file_object("def", json!({}))));
    let bench = workbench(&backend, UploadMode::HashLookup);

    bench.select_historical("u-1", "first.txt").await.unwrap();
    bench.select_historical("u-2", "second.txt").await.unwrap();
    bench.select_historical("u-1", "renamed.txt").await.unwrap();

    let history = bench.history().await;
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].uuid, "u-1");
    assert_eq!(history[0].filename, "renamed.txt");
}

#[tokio::test]
async fn test_select_missing_result_is_not_found() {
    let backend = FakeBackend::new();
    let bench = workbench(&backend, UploadMode::HashLookup);

    let err = bench.select_historical("gone", "gone.bin").await.unwrap_err();

    assert!(matches!(err, CoreError::NotFound(_)));
    assert_eq!(bench.mode().await, UploadMode::HashLookup);
    assert!(bench.history().await.is_empty());
}

#[tokio::test]
async fn test_mode_switch_keeps_current_result() {
    let backend = FakeBackend::new();
    backend.store("u-1", RawScanResult::SingleLookup(file_object("abc", json!({}))));
    let bench = workbench(&backend, UploadMode::HashLookup);
    bench.select_historical("u-1", "a.txt").await.unwrap();
    let calls = backend.network_calls();

    bench.set_mode(UploadMode::Full).await;

    assert_eq!(backend.network_calls(), calls);
    assert_eq!(bench.current().await.unwrap().uuid, "u-1");
}
