//! Unit tests for Langbase API types.
//!
//! Tests request/response serialization and completion parsing for the
//! moderation and argument-strength pipes.

use super::*;
use serde_json::json;

#[test]
fn test_message_system() {
    let msg = Message::system("You are a content moderator");
    assert!(matches!(msg.role, MessageRole::System));
    assert_eq!(msg.content, "You are a content moderator");
}

#[test]
fn test_pipe_request_serialization() {
    let req = PipeRequest::new("thought-moderation-v1", vec![Message::user("Text")]);
    let value = serde_json::to_value(&req).unwrap();

    assert_eq!(value["name"], "thought-moderation-v1");
    assert_eq!(value["stream"], false);
    assert_eq!(value["messages"][0]["role"], "user");
    assert_eq!(value["messages"][0]["content"], "Text");
}

#[test]
fn test_pipe_response_without_raw() {
    let response: PipeResponse = serde_json::from_value(json!({
        "success": true,
        "completion": "{\"valid\": true}"
    }))
    .unwrap();

    assert!(response.success);
    assert!(response.raw.is_none());
}

#[test]
fn test_create_pipe_request_skips_unset_fields() {
    let req = CreatePipeRequest::new("argument-strength-v1")
        .with_model("anthropic:claude-3-5-haiku-latest")
        .with_temperature(0.3);
    let value = serde_json::to_value(&req).unwrap();

    assert_eq!(value["name"], "argument-strength-v1");
    assert_eq!(value["temperature"], 0.3);
    assert!(value.get("description").is_none());
    assert!(value.get("messages").is_none());
}

#[test]
fn test_moderation_response_valid_defaults_to_false() {
    let response: ModerationResponse =
        serde_json::from_value(json!({"reason": "no verdict"})).unwrap();
    assert!(!response.accepts());
    assert_eq!(response.reason.as_deref(), Some("no verdict"));
}

#[test]
fn test_moderation_response_only_boolean_true_accepts() {
    for valid in [json!("true"), json!(1), json!(null), json!({"ok": true})] {
        let response: ModerationResponse =
            serde_json::from_value(json!({"valid": valid.clone(), "reason": "hedged"})).unwrap();
        assert!(!response.accepts(), "{valid} should not accept");
    }
    let response: ModerationResponse = serde_json::from_value(json!({"valid": true})).unwrap();
    assert!(response.accepts());
}

#[test]
fn test_strength_response_missing_score() {
    let response: StrengthResponse =
        serde_json::from_value(json!({"analysis": "tenuous"})).unwrap();
    assert!(response.score.is_none());
}

#[test]
fn test_extract_json_raw() {
    let json = extract_json_from_completion("  {\"valid\": true}  ").unwrap();
    assert_eq!(json, "{\"valid\": true}");
}

#[test]
fn test_extract_json_fenced() {
    let completion = "Here you go:\n```json\n{\"score\": 40}\n```";
    assert_eq!(extract_json_from_completion(completion).unwrap(), "{\"score\": 40}");
}

#[test]
fn test_extract_json_plain_fence() {
    let completion = "```\n{\"score\": -10}\n```";
    assert_eq!(extract_json_from_completion(completion).unwrap(), "{\"score\": -10}");
}

#[test]
fn test_extract_json_embedded_in_prose() {
    let completion = "Verdict: {\"valid\": false, \"reason\": \"spam\"} end.";
    assert_eq!(
        extract_json_from_completion(completion).unwrap(),
        "{\"valid\": false, \"reason\": \"spam\"}"
    );
}

#[test]
fn test_extract_json_empty_and_garbage() {
    assert!(extract_json_from_completion("   ").is_err());
    assert!(extract_json_from_completion("no json here").is_err());
}
