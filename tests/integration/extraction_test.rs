//! Structured Extraction Tests
//!
//! Properties of JSON extraction over realistic model replies.

use serde_json::json;
use survey_designer_core::{extract_json, extract_json_array, extract_json_object, ExtractionError};

#[test]
fn test_fenced_json_round_trip() {
    let value = extract_json("```json\n{\"a\":1}\n```").unwrap();
    assert_eq!(value, json!({"a": 1}));
}

#[test]
fn test_extraction_is_idempotent() {
    let replies = [
        "```json\n{\"question\": \"Age?\", \"type\": \"text\"}\n```",
        "Sure! Here it is:\n```\n[\"Ward Number\", \"Zone\"]\n```\nLet me know.",
        "json {\"say\": \"Hello\"}",
    ];
    for reply in replies {
        let first = serde_json::to_string(&extract_json(reply).unwrap()).unwrap();
        let second = serde_json::to_string(&extract_json(reply).unwrap()).unwrap();
        assert_eq!(first, second);
    }
}

#[test]
fn test_object_inside_prose() {
    let reply = "The classification is {\"classifications\": {\"sectoral\": \"Housing {urban}\"}} as requested.";
    let map = extract_json_object(reply).unwrap();
    assert_eq!(map["classifications"]["sectoral"], "Housing {urban}");
}

#[test]
fn test_array_found_inside_object() {
    let items = extract_json_array("{\"headings\": [\"A\", \"B\"]}").unwrap();
    assert_eq!(items, vec![json!("A"), json!("B")]);
}

#[test]
fn test_array_shape_enforced() {
    let err = extract_json_array("{\"count\": 3}").unwrap_err();
    assert!(matches!(err, ExtractionError::WrongShape { expected: "array", .. }));
}

#[test]
fn test_malformed_carries_candidate() {
    match extract_json("```json\n{\"a\": 1,,}\n```").unwrap_err() {
        ExtractionError::Malformed { candidate, .. } => assert_eq!(candidate, "{\"a\": 1,,}"),
        other => panic!("unexpected error: {other:?}"),
    }
}
