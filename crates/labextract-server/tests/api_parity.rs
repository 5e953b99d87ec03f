//! API parity tests: validates that response shapes match what existing
//! clients of the extraction API expect.
//!
//! These tests work on the shared labextract-core types and JSON literals
//! (no HTTP server needed) to verify field names and types.

use labextract_core::{filter_known_tests, ErrorResponse, KnownTests, LabResult, LabResultsResponse};

/// Verify the success body: { lab_results: [{ test_name, value }] }
#[test]
fn test_lab_results_response_shape() {
    let response = LabResultsResponse {
        lab_results: vec![LabResult {
            test_name: "Hemoglobin".into(),
            value: "14.2".into(),
        }],
    };
    let json = serde_json::to_value(&response).unwrap();

    assert!(json["lab_results"].is_array());
    assert!(json["lab_results"][0]["test_name"].is_string());
    assert!(json["lab_results"][0]["value"].is_string());
    assert_eq!(json.as_object().unwrap().len(), 1);
}

/// Verify a model reply deserializes into the typed response.
#[test]
fn test_model_reply_deserializes() {
    let reply = serde_json::json!({
        "lab_results": [
            {"test_name": "Glucose", "value": "5.4"},
            {"test_name": "Sodium", "value": "not present"},
        ],
    });

    let parsed: LabResultsResponse = serde_json::from_value(reply).unwrap();
    assert_eq!(parsed.lab_results.len(), 2);
    assert_eq!(parsed.lab_results[1].value, "not present");
}

/// Verify error bodies: { detail: string }
#[test]
fn test_error_response_shape() {
    let body = ErrorResponse {
        detail: "Only PDF or image files are supported.".into(),
    };
    let json = serde_json::to_value(&body).unwrap();

    assert!(json["detail"].is_string());
    assert_eq!(json.as_object().unwrap().len(), 1);
}

/// Verify the welcome body: { message: string }
#[test]
fn test_root_response_shape() {
    let root = serde_json::json!({
        "message": "Welcome to the Lab Results extraction API. POST a PDF or image to /extract.",
    });

    assert!(root["message"].is_string());
}

/// Verify filtering keeps the entry shape untouched, including extra keys.
#[test]
fn test_filtered_entries_keep_shape() {
    let entries = vec![
        serde_json::json!({"test_name": "Hemoglobin", "value": "14.2", "unit": "g/dL"}),
        serde_json::json!({"test_name": "Doctor", "value": "Dr. Who"}),
    ];

    let kept = filter_known_tests(entries, &KnownTests::builtin());
    assert_eq!(kept.len(), 1);
    assert_eq!(kept[0]["unit"], "g/dL");
    assert!(kept[0]["test_name"].is_string());
}
