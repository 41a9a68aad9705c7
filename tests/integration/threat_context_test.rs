//! Threat Context Integration Tests
//!
//! Derivation of threat contexts from wire-shaped results.

use serde_json::json;

use scanlens_core::{CoreError, RawScanResult, ThreatContext, ThreatLevel};

use crate::support::{analysis, file_object};

#[test]
fn test_lookup_reference_tally() {
    let raw = RawScanResult::SingleLookup(file_object(
        "abc",
        json!({"malicious": 2, "suspicious": 1, "harmless": 47, "undetected": 10}),
    ));
    let context = ThreatContext::derive(&raw, Some("upload.bin"));

    let detections = context.detections();
    assert_eq!(detections.engines.total, 60);
    assert_eq!(detections.threat_percentage, 5);
    assert_eq!(detections.threat_level, ThreatLevel::Danger);

    match context {
        ThreatContext::File(file) => {
            assert_eq!(file.identity.filename, "eicar.com");
            assert_eq!(file.reputation.score, -50);
            assert_eq!(file.known_names, vec!["eicar.com", "eicar.txt"]);
        }
        other => panic!("Expected file context, got {:?}", other),
    }
}

#[test]
fn test_analysis_flagged_engines_in_source_order() {
    let raw = RawScanResult::MultiEngineAnalysis(analysis(
        "an-1",
        "completed",
        json!({"malicious": 1, "suspicious": 1, "undetected": 1, "type-unsupported": 1, "failure": 2}),
    ));
    let context = ThreatContext::derive(&raw, Some("sample.exe"));
    assert!(context.is_complete());

    match &context {
        ThreatContext::Analysis(a) => {
            let engines: Vec<_> = a.flagged_engines.iter().map(|e| e.engine.as_str()).collect();
            assert_eq!(engines, vec!["EngineA", "EngineC"]);
            assert_eq!(a.flagged_engines[0].result.as_deref(), Some("Trojan.Gen"));
            assert_eq!(a.identity.filename.as_deref(), Some("sample.exe"));
        }
        other => panic!("Expected analysis context, got {:?}", other),
    }

    // malicious + suspicious + undetected + unsupported
    assert_eq!(context.tally().total, 4);
    assert_eq!(context.tally().failures, 2);
    assert_eq!(context.assessment().percentage, 50);
}

#[test]
fn test_empty_stats_are_safe() {
    let raw = RawScanResult::MultiEngineAnalysis(analysis("an-2", "queued", json!({})));
    let context = ThreatContext::derive(&raw, None);
    assert_eq!(context.assessment().percentage, 0);
    assert_eq!(context.assessment().level, ThreatLevel::Safe);
    assert!(!context.is_complete());
}

#[test]
fn test_derivation_is_deterministic() {
    let raw = RawScanResult::SingleLookup(file_object("abc", json!({"suspicious": 3, "harmless": 7})));
    let first = ThreatContext::derive(&raw, Some("x"));
    let second = ThreatContext::derive(&raw.clone(), Some("x"));
    assert_eq!(first, second);
    assert_eq!(first.assessment().level, ThreatLevel::Warning);
    assert_eq!(first.assessment().percentage, 30);
}

#[test]
fn test_unknown_result_type_from_dynamic_json() {
    let err = ThreatContext::derive_value(
        &json!({"id": "u", "type": "domain", "attributes": {}}),
        None,
    )
    .unwrap_err();
    assert_eq!(err, CoreError::UnknownResultType("domain".to_string()));
}

#[test]
fn test_context_serializes_with_kind_tag() {
    let raw = RawScanResult::SingleLookup(file_object("abc", json!({"harmless": 1})));
    let value = serde_json::to_value(ThreatContext::derive(&raw, None)).unwrap();
    assert_eq!(value["kind"], "file");
    assert_eq!(value["detections"]["threat_level"], "safe");
}
