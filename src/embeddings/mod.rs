//! Embedding adapter: text in, fixed-length vector out.
//!
//! The [`Embedder`] trait is the seam the creation pipeline and the ranking
//! engine depend on. [`EmbeddingClient`] implements it against an
//! OpenAI-compatible `/v1/embeddings` endpoint.

mod client;

pub use client::EmbeddingClient;

use async_trait::async_trait;

use crate::error::EmbeddingResult;

/// Turns text into an embedding vector.
///
/// Implementations must be deterministic for a fixed model version and must
/// never hand back a placeholder vector on failure.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed a single text.
    async fn embed(&self, text: &str) -> EmbeddingResult<Vec<f32>>;
}

/// Cosine similarity between two vectors.
///
/// Returns 0.0 when either vector has zero magnitude or the lengths differ,
/// since vectors from different models are not comparable.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let (mut dot, mut norm_a, mut norm_b) = (0.0_f64, 0.0_f64, 0.0_f64);
    for (x, y) in a.iter().zip(b.iter()) {
        let (x, y) = (f64::from(*x), f64::from(*y));
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    (dot / (norm_a.sqrt() * norm_b.sqrt())).clamp(-1.0, 1.0)
}
