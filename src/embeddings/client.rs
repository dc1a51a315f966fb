use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};
use tracing::{debug, info};

use super::Embedder;
use crate::config::{EmbeddingConfig, RequestConfig};
use crate::error::{EmbeddingError, EmbeddingResult};

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

/// HTTP client for an OpenAI-compatible embeddings endpoint.
///
/// Clones share the connection pool and the dimension guard, so one instance
/// is built at startup and handed to every consumer.
#[derive(Clone)]
pub struct EmbeddingClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
    timeout_ms: u64,
    dimension: Arc<OnceLock<usize>>,
}

impl EmbeddingClient {
    /// Create a new embedding client
    pub fn new(config: &EmbeddingConfig, request_config: &RequestConfig) -> EmbeddingResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(request_config.timeout_ms))
            .build()
            .map_err(EmbeddingError::Http)?;

        let dimension = OnceLock::new();
        if let Some(expected) = config.dimension {
            let _ = dimension.set(expected);
        }

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            timeout_ms: request_config.timeout_ms,
            dimension: Arc::new(dimension),
        })
    }

    /// Vector length fixed by the configuration or the first response.
    pub fn dimension(&self) -> Option<usize> {
        self.dimension.get().copied()
    }

    /// Get the base URL (for testing)
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn check_dimension(&self, vector: &[f32]) -> EmbeddingResult<()> {
        let expected = *self.dimension.get_or_init(|| {
            info!(
                model = %self.model,
                dimension = vector.len(),
                "Embedding dimension established"
            );
            vector.len()
        });

        if expected != vector.len() {
            return Err(EmbeddingError::DimensionMismatch {
                expected,
                actual: vector.len(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl Embedder for EmbeddingClient {
    async fn embed(&self, text: &str) -> EmbeddingResult<Vec<f32>> {
        let url = format!("{}/v1/embeddings", self.base_url);
        let start = Instant::now();

        debug!(model = %self.model, chars = text.chars().count(), "Requesting embedding");

        let mut request = self.client.post(&url).json(&EmbeddingRequest {
            model: &self.model,
            input: text,
        });
        if let Some(key) = &self.api_key {
            request = request.header("Authorization", format!("Bearer {}", key));
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                EmbeddingError::Timeout {
                    timeout_ms: self.timeout_ms,
                }
            } else {
                EmbeddingError::Http(e)
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(EmbeddingError::Api {
                status: status.as_u16(),
                message: error_body,
            });
        }

        let body: EmbeddingResponse =
            response
                .json()
                .await
                .map_err(|e| EmbeddingError::InvalidResponse {
                    message: format!("Failed to parse response: {}", e),
                })?;

        let vector = body
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| EmbeddingError::InvalidResponse {
                message: "Response contained no embedding".to_string(),
            })?;

        self.check_dimension(&vector)?;

        debug!(
            dimension = vector.len(),
            latency_ms = start.elapsed().as_millis(),
            "Embedding generated"
        );

        Ok(vector)
    }
}
