//! Hybrid search and paginated listing over root thoughts.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

use crate::embeddings::{cosine_similarity, Embedder};
use crate::error::{AppResult, ThoughtError};
use crate::storage::{Storage, Thought};

/// Weight of the semantic component in the hybrid score.
pub const VECTOR_WEIGHT: f64 = 0.7;
/// Weight of the keyword component in the hybrid score.
pub const KEYWORD_WEIGHT: f64 = 0.3;

pub const DEFAULT_SEARCH_LIMIT: u32 = 10;
pub const DEFAULT_LIST_LIMIT: u32 = 9;
pub const MAX_LIMIT: u32 = 100;

/// A root thought with its search scores.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    pub thought: Thought,
    pub vector_score: f64,
    pub keyword_score: f64,
    pub hybrid_score: f64,
}

/// One page of root thoughts, newest first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginatedThoughts {
    pub nodes: Vec<Thought>,
    pub total: u64,
    pub skip: u32,
    pub limit: u32,
    pub has_more: bool,
}

/// 1.0 when `text` contains `query` ignoring case, else 0.0.
pub fn keyword_score(text: &str, query: &str) -> f64 {
    if text.to_lowercase().contains(&query.to_lowercase()) {
        1.0
    } else {
        0.0
    }
}

/// Weighted sum of the semantic and keyword scores.
pub fn hybrid_score(vector_score: f64, keyword_score: f64) -> f64 {
    VECTOR_WEIGHT * vector_score + KEYWORD_WEIGHT * keyword_score
}

fn bounded_limit(limit: Option<u32>, default: u32) -> u32 {
    limit.unwrap_or(default).clamp(1, MAX_LIMIT)
}

/// Search and listing over root thoughts.
#[derive(Clone)]
pub struct RankingEngine {
    storage: Arc<dyn Storage>,
    embedder: Arc<dyn Embedder>,
}

impl RankingEngine {
    /// Create a new ranking engine
    pub fn new(storage: Arc<dyn Storage>, embedder: Arc<dyn Embedder>) -> Self {
        Self { storage, embedder }
    }

    /// Rank root thoughts against `query`, best first.
    ///
    /// Roots without an embedding are not candidates.
    pub async fn search(&self, query: &str, limit: Option<u32>) -> AppResult<Vec<SearchHit>> {
        let start = Instant::now();
        let query = query.trim();
        if query.is_empty() {
            return Err(ThoughtError::validation("query", "Query cannot be empty").into());
        }
        let limit = bounded_limit(limit, DEFAULT_SEARCH_LIMIT);

        let query_embedding = self.embedder.embed(query).await?;
        let candidates = self.storage.rank_candidates().await?;
        let considered = candidates.len();

        let mut hits: Vec<SearchHit> = candidates
            .into_iter()
            .filter_map(|candidate| {
                let embedding = candidate.embedding?;
                let vector_score = cosine_similarity(&query_embedding, &embedding);
                let keyword_score = keyword_score(&candidate.thought.text, query);
                Some(SearchHit {
                    hybrid_score: hybrid_score(vector_score, keyword_score),
                    vector_score,
                    keyword_score,
                    thought: candidate.thought,
                })
            })
            .collect();

        hits.sort_by(|a, b| {
            b.hybrid_score
                .partial_cmp(&a.hybrid_score)
                .unwrap_or(Ordering::Equal)
        });
        hits.truncate(limit as usize);

        debug!(
            candidates = considered,
            returned = hits.len(),
            latency_ms = start.elapsed().as_millis(),
            "Search completed"
        );
        Ok(hits)
    }

    /// A page of root thoughts, newest first.
    pub async fn list(&self, skip: Option<u32>, limit: Option<u32>) -> AppResult<PaginatedThoughts> {
        let skip = skip.unwrap_or(0);
        let limit = bounded_limit(limit, DEFAULT_LIST_LIMIT);

        let page = self.storage.list_roots(skip, limit).await?;
        let has_more = u64::from(skip) + (page.nodes.len() as u64) < page.total;

        Ok(PaginatedThoughts {
            nodes: page.nodes,
            total: page.total,
            skip,
            limit,
            has_more,
        })
    }
}
