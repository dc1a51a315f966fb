//! Integration tests for the embedding client
//!
//! Exercises the OpenAI-compatible embeddings endpoint through wiremock.

use serde_json::json;
use wiremock::{
    matchers::{body_json, header, method, path},
    Mock, MockServer, ResponseTemplate,
};

use lines_of_thought::config::{EmbeddingConfig, RequestConfig};
use lines_of_thought::embeddings::{cosine_similarity, Embedder, EmbeddingClient};
use lines_of_thought::error::EmbeddingError;

fn create_test_client(base_url: &str, api_key: Option<&str>, dimension: Option<usize>) -> EmbeddingClient {
    let config = EmbeddingConfig {
        base_url: base_url.to_string(),
        api_key: api_key.map(str::to_string),
        model: "test-model".to_string(),
        dimension,
    };
    let request_config = RequestConfig {
        timeout_ms: 5000,
        max_retries: 0,
        retry_delay_ms: 100,
    };

    EmbeddingClient::new(&config, &request_config).expect("Failed to create client")
}

fn vector_response(vector: &[f32]) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "object": "list",
        "data": [{"object": "embedding", "index": 0, "embedding": vector}],
        "model": "test-model"
    }))
}

#[tokio::test]
async fn test_embed_sends_model_and_input() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/embeddings"))
        .and(header("Authorization", "Bearer embed-key"))
        .and(body_json(json!({"model": "test-model", "input": "What is time?"})))
        .respond_with(vector_response(&[0.6, 0.8, 0.0]))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = create_test_client(&mock_server.uri(), Some("embed-key"), None);
    let vector = client.embed("What is time?").await.unwrap();

    assert_eq!(vector, vec![0.6, 0.8, 0.0]);
    assert_eq!(client.dimension(), Some(3));
    assert!((cosine_similarity(&vector, &vector) - 1.0).abs() < 1e-6);
}

#[tokio::test]
async fn test_dimension_change_is_rejected() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/embeddings"))
        .respond_with(vector_response(&[1.0, 0.0]))
        .mount(&mock_server)
        .await;

    let client = create_test_client(&mock_server.uri(), None, Some(384));
    let err = client.embed("Short vector").await.unwrap_err();

    assert!(matches!(
        err,
        EmbeddingError::DimensionMismatch {
            expected: 384,
            actual: 2
        }
    ));
}

#[tokio::test]
async fn test_empty_data_is_invalid_response() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/embeddings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": []})))
        .mount(&mock_server)
        .await;

    let client = create_test_client(&mock_server.uri(), None, None);
    let err = client.embed("Anything").await.unwrap_err();

    assert!(matches!(err, EmbeddingError::InvalidResponse { .. }));
    assert_eq!(client.dimension(), None);
}

#[tokio::test]
async fn test_api_error_carries_status() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/embeddings"))
        .respond_with(ResponseTemplate::new(503).set_body_string("loading model"))
        .mount(&mock_server)
        .await;

    let client = create_test_client(&mock_server.uri(), None, None);
    match client.embed("Anything").await.unwrap_err() {
        EmbeddingError::Api { status, message } => {
            assert_eq!(status, 503);
            assert_eq!(message, "loading model");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}
