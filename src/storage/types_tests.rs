//! Unit tests for storage types and builder patterns.
//!
//! Tests constructors, clamping and serialization for NewThought,
//! BranchProperties, Thought, Branch and GraphSlice.

use super::*;
use pretty_assertions::assert_eq;
use serde_json::json;

// ============================================================================
// NewThought tests
// ============================================================================

#[test]
fn test_new_thought_root() {
    let thought = NewThought::root("Is free will compatible with determinism?", vec![0.1, 0.2]);
    assert!(thought.is_root);
    assert_eq!(thought.embedding, vec![0.1, 0.2]);
}

#[test]
fn test_new_thought_branch() {
    let thought = NewThought::branch("Only if we redefine freedom", vec![0.3]);
    assert!(!thought.is_root);
    assert_eq!(thought.text, "Only if we redefine freedom");
}

// ============================================================================
// BranchProperties tests
// ============================================================================

#[test]
fn test_branch_properties_default_is_empty() {
    let props = BranchProperties::default();
    assert!(props.perspective.is_none());
    assert!(props.strength_score.is_none());
    assert!(props.strength_analysis.is_none());
}

#[test]
fn test_branch_properties_scored() {
    let props = BranchProperties::with_perspective(Some("ethical".to_string()))
        .scored(42, Some("Follows reasonably".to_string()));
    assert_eq!(props.perspective.as_deref(), Some("ethical"));
    assert_eq!(props.strength_score, Some(42));
    assert_eq!(props.strength_analysis.as_deref(), Some("Follows reasonably"));
}

#[test]
fn test_branch_properties_score_clamped() {
    assert_eq!(BranchProperties::default().scored(250, None).strength_score, Some(100));
    assert_eq!(BranchProperties::default().scored(-101, None).strength_score, Some(-100));
    assert_eq!(BranchProperties::default().scored(-100, None).strength_score, Some(-100));
}

// ============================================================================
// Serialization tests
// ============================================================================

#[test]
fn test_thought_serialization() {
    let created_at = DateTime::parse_from_rfc3339("2025-01-01T12:00:00Z")
        .unwrap()
        .with_timezone(&Utc);
    let thought = Thought {
        id: "t-1".to_string(),
        text: "What is knowledge?".to_string(),
        is_root: true,
        created_at,
    };

    let value = serde_json::to_value(&thought).unwrap();
    assert_eq!(
        value,
        json!({
            "id": "t-1",
            "text": "What is knowledge?",
            "is_root": true,
            "created_at": "2025-01-01T12:00:00Z"
        })
    );
}

#[test]
fn test_branch_serialization_keeps_null_score() {
    let branch = Branch {
        id: "b-1".to_string(),
        parent_id: "t-1".to_string(),
        child_id: "t-2".to_string(),
        perspective: None,
        strength_score: None,
        strength_analysis: None,
        created_at: Utc::now(),
    };

    let value = serde_json::to_value(&branch).unwrap();
    assert_eq!(value["parent_id"], "t-1");
    assert_eq!(value["child_id"], "t-2");
    assert!(value["strength_score"].is_null());
}

#[test]
fn test_graph_slice_default_is_empty() {
    let slice = GraphSlice::default();
    assert!(slice.nodes.is_empty());
    assert!(slice.edges.is_empty());

    let value = serde_json::to_value(&slice).unwrap();
    assert_eq!(value, json!({ "nodes": [], "edges": [] }));
}
